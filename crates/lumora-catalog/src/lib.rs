pub mod cache;
pub mod matcher;
pub mod photometry;
pub mod store;

pub use cache::TtlCache;
pub use matcher::{category_for_space, Matcher, QuerySignals, BROAD_LIMIT, DEFAULT_LIMIT};
pub use photometry::{
    display_lumens, estimate_lumens, fixture_quantity, fixture_quantity_with, DEFAULT_UTILIZATION,
    LUMENS_PER_WATT,
};
pub use store::CatalogStore;
