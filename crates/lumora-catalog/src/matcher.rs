use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use lumora_schema::{Product, Relevance, ScoredProduct, SpaceType};
use regex::Regex;
use tracing::debug;

use crate::cache::TtlCache;
use crate::photometry::display_lumens;
use crate::store::CatalogStore;

/// Single-recommendation flow.
pub const DEFAULT_LIMIT: usize = 3;
/// Broader "show other options" listing.
pub const BROAD_LIMIT: usize = 5;

static POWER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3})\s*(?:вт|w)\b").expect("power pattern"));
static IP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ip\s*(\d{2})").expect("ip pattern"));
static AREA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*(?:м2|м²|кв\.?\s*м)").expect("area pattern"));

/// Token vocabulary mapping space wording to catalog categories.
/// First matching entry wins.
const CATEGORY_VOCAB: &[(&str, &[&str])] = &[
    ("industrial", &["склад", "цех", "завод", "производств", "ангар"]),
    ("street", &["улиц", "уличн", "двор", "парковк", "территор"]),
    ("office", &["офис", "кабинет"]),
    ("retail", &["магазин", "торгов", "витрин"]),
];

const OFFICE_TOKENS: &[&str] = &["офис", "кабинет"];
const STREET_TOKENS: &[&str] = &["улиц", "уличн", "двор"];
const INDUSTRIAL_TOKENS: &[&str] = &["склад", "цех"];

/// Catalog category a space type maps to when used as a matcher hint.
pub fn category_for_space(space: SpaceType) -> Option<&'static str> {
    match space {
        SpaceType::Office => Some("office"),
        SpaceType::Street => Some("street"),
        SpaceType::Workshop | SpaceType::Warehouse => Some("industrial"),
        SpaceType::Custom => None,
    }
}

/// Signals pulled out of a lowercased free-text query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySignals {
    pub power: Option<f64>,
    pub ip_code: Option<String>,
    pub category: Option<String>,
    /// Extracted but unscored; reserved for slot filling.
    pub area: Option<f64>,
}

impl QuerySignals {
    pub fn extract(query_lower: &str, explicit_category: Option<&str>) -> Self {
        let power = POWER_RE
            .captures(query_lower)
            .and_then(|c| c[1].parse().ok());
        let ip_code = IP_RE.captures(query_lower).map(|c| c[1].to_owned());
        let area = AREA_RE
            .captures(query_lower)
            .and_then(|c| c[1].parse().ok());

        let category = match explicit_category {
            Some(c) if !c.trim().is_empty() => Some(c.trim().to_lowercase()),
            _ => CATEGORY_VOCAB
                .iter()
                .find(|(_, tokens)| tokens.iter().any(|t| query_lower.contains(t)))
                .map(|(category, _)| (*category).to_owned()),
        };

        Self {
            power,
            ip_code,
            category,
            area,
        }
    }
}

fn contains_any(haystack: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|t| haystack.contains(t))
}

/// Additive relevance score for one catalog entry. Entries without a
/// numeric rated power are ineligible and score zero.
fn score_product(product: &Product, query_lower: &str, signals: &QuerySignals) -> u32 {
    let Some(power_w) = product.power_w else {
        return 0;
    };

    let mut score = 0;

    if let Some(model) = product.model.as_deref() {
        let model = model.to_lowercase();
        if !model.is_empty() && (query_lower.contains(&model) || model.contains(query_lower)) {
            score += 5;
        }
    }
    if let Some(name) = product.name.as_deref() {
        let name = name.to_lowercase();
        if !name.is_empty() && (query_lower.contains(&name) || name.contains(query_lower)) {
            score += 3;
        }
    }
    if let (Some(wanted), Some(category)) = (signals.category.as_deref(), product.category.as_deref())
    {
        if category.to_lowercase().contains(wanted) {
            score += 4;
        }
    }
    if let Some(wanted_power) = signals.power {
        let diff = (power_w - wanted_power).abs();
        if diff <= 10.0 {
            score += 3;
        } else if diff <= 30.0 {
            score += 2;
        }
    }
    if let (Some(code), Some(rating)) = (signals.ip_code.as_deref(), product.ip_rating.as_deref()) {
        if rating.eq_ignore_ascii_case(&format!("ip{code}")) {
            score += 4;
        }
    }
    if let Some(raw) = product.raw.as_deref() {
        if raw.to_lowercase().contains(query_lower) {
            score += 2;
        }
    }
    if contains_any(query_lower, OFFICE_TOKENS) {
        score += 1;
    }
    if contains_any(query_lower, STREET_TOKENS) {
        score += 1;
    }
    if contains_any(query_lower, INDUSTRIAL_TOKENS) {
        score += 1;
    }

    score
}

/// Keyword-scored relevance search over the catalog snapshot, with a
/// TTL write-through result cache keyed by normalized query + category.
pub struct Matcher {
    catalog: CatalogStore,
    cache: TtlCache<String, Arc<Vec<ScoredProduct>>>,
    scoring_passes: AtomicU64,
}

impl Matcher {
    pub fn new(catalog: CatalogStore, cache_ttl: Duration) -> Self {
        Self {
            catalog,
            cache: TtlCache::new(cache_ttl),
            scoring_passes: AtomicU64::new(0),
        }
    }

    /// Rank catalog entries against a free-text query. Descending score,
    /// catalog order on ties, truncated to `limit`. Empty queries and a
    /// missing catalog both yield an empty list, never an error.
    pub fn find(&self, query: &str, category: Option<&str>, limit: usize) -> Vec<ScoredProduct> {
        let query_lower = query.trim().to_lowercase();
        if query_lower.is_empty() {
            return Vec::new();
        }

        let signals = QuerySignals::extract(&query_lower, category);
        let key = format!(
            "{query_lower}|{}",
            signals.category.as_deref().unwrap_or_default()
        );

        if let Some(cached) = self.cache.get(&key) {
            debug!(%key, "search cache hit");
            return cached.iter().take(limit).cloned().collect();
        }

        self.scoring_passes.fetch_add(1, Ordering::Relaxed);
        let mut scored: Vec<ScoredProduct> = self
            .catalog
            .products()
            .iter()
            .filter_map(|product| {
                let score = score_product(product, &query_lower, &signals);
                if score == 0 {
                    return None;
                }
                Some(ScoredProduct {
                    display_lumens: display_lumens(product.power_w, product.lumens),
                    relevance: if score > 0 {
                        Relevance::High
                    } else {
                        Relevance::Low
                    },
                    score,
                    product: product.clone(),
                })
            })
            .collect();

        // Stable sort keeps catalog order for equal scores.
        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored.truncate(BROAD_LIMIT.max(limit));

        debug!(%key, results = scored.len(), "search scored");
        let scored = Arc::new(scored);
        self.cache.insert(key, Arc::clone(&scored));
        scored.iter().take(limit).cloned().collect()
    }

    /// How many full scoring passes have run; cache hits do not count.
    pub fn scoring_passes(&self) -> u64 {
        self.scoring_passes.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(model: &str, category: &str, power: f64, ip: Option<&str>) -> Product {
        Product {
            model: Some(model.to_owned()),
            name: Some(model.to_owned()),
            category: Some(category.to_owned()),
            power_w: Some(power),
            lumens: None,
            ip_rating: ip.map(str::to_owned),
            image_url: None,
            raw: Some(format!("{model} {power} вт")),
        }
    }

    fn matcher(products: Vec<Product>) -> Matcher {
        Matcher::new(CatalogStore::new(products), Duration::from_secs(600))
    }

    #[test]
    fn model_match_ranks_first() {
        let m = matcher(vec![
            product("NRG-STREET-50", "street", 50.0, Some("IP65")),
            product("NRG-TOP", "industrial", 100.0, Some("IP65")),
        ]);
        let results = m.find("nrg-top", None, DEFAULT_LIMIT);
        assert!(!results.is_empty());
        assert_eq!(results[0].product.model.as_deref(), Some("NRG-TOP"));
        assert!(results[0].score >= 5);
        assert_eq!(results[0].relevance, Relevance::High);
    }

    #[test]
    fn no_matching_tokens_yields_empty() {
        let m = matcher(vec![product("NRG-TOP", "industrial", 100.0, None)]);
        assert!(m.find("шуруповёрт", None, DEFAULT_LIMIT).is_empty());
    }

    #[test]
    fn empty_query_yields_empty() {
        let m = matcher(vec![product("NRG-TOP", "industrial", 100.0, None)]);
        assert!(m.find("", None, DEFAULT_LIMIT).is_empty());
        assert!(m.find("   ", None, DEFAULT_LIMIT).is_empty());
        assert_eq!(m.scoring_passes(), 0);
    }

    #[test]
    fn products_without_power_are_ineligible() {
        let mut no_power = product("NRG-TOP", "industrial", 0.0, None);
        no_power.power_w = None;
        let m = matcher(vec![no_power]);
        assert!(m.find("nrg-top", None, DEFAULT_LIMIT).is_empty());
    }

    #[test]
    fn category_inferred_from_space_vocabulary() {
        let m = matcher(vec![
            product("NRG-OFFICE-36", "office", 36.0, None),
            product("NRG-PROM-100", "industrial", 100.0, None),
        ]);
        let results = m.find("светильники на склад", None, DEFAULT_LIMIT);
        assert_eq!(results[0].product.model.as_deref(), Some("NRG-PROM-100"));
    }

    #[test]
    fn explicit_category_overrides_inference() {
        let signals = QuerySignals::extract("свет на склад", Some("office"));
        assert_eq!(signals.category.as_deref(), Some("office"));
    }

    #[test]
    fn power_and_ip_signals_extracted() {
        let signals = QuerySignals::extract("прожектор 100 вт ip65 на 200 м2", None);
        assert_eq!(signals.power, Some(100.0));
        assert_eq!(signals.ip_code.as_deref(), Some("65"));
        assert_eq!(signals.area, Some(200.0));
    }

    #[test]
    fn power_proximity_scoring_tiers() {
        let m = matcher(vec![
            product("NRG-A", "industrial", 95.0, None),  // diff 5 -> +3
            product("NRG-B", "industrial", 125.0, None), // diff 25 -> +2
            product("NRG-C", "industrial", 200.0, None), // diff 100 -> 0
        ]);
        let results = m.find("нужно 100 вт", None, BROAD_LIMIT);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].product.model.as_deref(), Some("NRG-A"));
        assert_eq!(results[1].product.model.as_deref(), Some("NRG-B"));
    }

    #[test]
    fn ties_keep_catalog_order() {
        let m = matcher(vec![
            product("NRG-OF-1", "office", 36.0, None),
            product("NRG-OF-2", "office", 36.0, None),
            product("NRG-OF-3", "office", 36.0, None),
        ]);
        let results = m.find("офис", None, DEFAULT_LIMIT);
        let models: Vec<_> = results
            .iter()
            .map(|r| r.product.model.clone().unwrap())
            .collect();
        assert_eq!(models, vec!["NRG-OF-1", "NRG-OF-2", "NRG-OF-3"]);
    }

    #[test]
    fn repeated_query_hits_cache() {
        let m = matcher(vec![product("NRG-TOP", "industrial", 100.0, None)]);
        let first = m.find("nrg-top", None, DEFAULT_LIMIT);
        let second = m.find("nrg-top", None, DEFAULT_LIMIT);
        assert_eq!(first, second);
        assert_eq!(m.scoring_passes(), 1);

        // Different category hint is a different cache key.
        m.find("nrg-top", Some("office"), DEFAULT_LIMIT);
        assert_eq!(m.scoring_passes(), 2);
    }

    #[test]
    fn cached_list_serves_both_limits() {
        let products: Vec<Product> = (0..8)
            .map(|i| product(&format!("NRG-OF-{i}"), "office", 36.0, None))
            .collect();
        let m = matcher(products);
        assert_eq!(m.find("офис", None, DEFAULT_LIMIT).len(), 3);
        assert_eq!(m.find("офис", None, BROAD_LIMIT).len(), 5);
        assert_eq!(m.scoring_passes(), 1);
    }

    #[test]
    fn empty_catalog_degrades_to_empty_results() {
        let m = matcher(Vec::new());
        assert!(m.find("офис 36 вт", None, DEFAULT_LIMIT).is_empty());
    }

    #[test]
    fn display_lumens_attached() {
        let m = matcher(vec![product("NRG-TOP", "industrial", 100.0, None)]);
        let results = m.find("nrg-top", None, DEFAULT_LIMIT);
        assert_eq!(results[0].display_lumens, "13000лм");
    }
}
