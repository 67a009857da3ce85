//! Derived lighting calculations: luminous flux estimation and fixture
//! count sizing. Pure functions, no side effects.

/// Luminous efficacy assumed for this fixture family.
pub const LUMENS_PER_WATT: f64 = 130.0;

/// Manufacturer lumen figures below this efficacy are treated as
/// placeholder data (zeros, unit mismatches) and replaced by the estimate.
pub const TRUST_THRESHOLD_LM_PER_W: f64 = 100.0;

/// Typical combined fixture + room utilization factor.
pub const DEFAULT_UTILIZATION: f64 = 0.6;

/// Best-estimate luminous flux for a fixture.
///
/// Returns `None` when rated power is absent or non-positive. A stated
/// manufacturer figure is trusted only when it exceeds 100 lm/W;
/// otherwise the 130 lm/W estimate wins.
pub fn estimate_lumens(power_w: Option<f64>, stated_lumens: Option<f64>) -> Option<i64> {
    let power = power_w.filter(|p| p.is_finite() && *p > 0.0)?;
    let calculated = (power * LUMENS_PER_WATT).round() as i64;
    match stated_lumens {
        Some(stated) if stated > power * TRUST_THRESHOLD_LM_PER_W => Some(stated.round() as i64),
        _ => Some(calculated),
    }
}

/// Required fixture count for a space, with the default utilization factor.
pub fn fixture_quantity(
    area_m2: Option<f64>,
    target_lux: Option<f64>,
    per_fixture_lumens: Option<f64>,
) -> Option<u32> {
    fixture_quantity_with(area_m2, target_lux, per_fixture_lumens, DEFAULT_UTILIZATION)
}

/// Required fixture count for a space.
///
/// `None` when any input is absent or zero. Total demand is
/// `area * lux / utilization`, divided across fixtures and rounded up,
/// never below one fixture.
pub fn fixture_quantity_with(
    area_m2: Option<f64>,
    target_lux: Option<f64>,
    per_fixture_lumens: Option<f64>,
    utilization: f64,
) -> Option<u32> {
    let area = area_m2.filter(|v| v.is_finite() && *v > 0.0)?;
    let lux = target_lux.filter(|v| v.is_finite() && *v > 0.0)?;
    let flux = per_fixture_lumens.filter(|v| v.is_finite() && *v > 0.0)?;
    let utilization = if utilization.is_finite() && utilization > 0.0 {
        utilization
    } else {
        DEFAULT_UTILIZATION
    };

    let total_needed = area * lux / utilization;
    let quantity = (total_needed / flux).ceil() as u32;
    Some(quantity.max(1))
}

/// Flux string shown next to a product: `"<N>лм"` or a sentinel when the
/// estimate is unavailable.
pub fn display_lumens(power_w: Option<f64>, stated_lumens: Option<f64>) -> String {
    match estimate_lumens(power_w, stated_lumens) {
        Some(lumens) => format!("{lumens}лм"),
        None => "не указан".to_owned(),
    }
}
