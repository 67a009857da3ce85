pub mod history;
pub mod store;

pub use history::{HistoryStore, DEFAULT_HISTORY_TURNS};
pub use store::{SessionFetch, SessionState, SessionStore, DEFAULT_SESSION_TTL_SECONDS};
