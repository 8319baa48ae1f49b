use crate::domain::model::Ratio;
use rust_decimal::{Decimal, RoundingStrategy};

/// Ratio as a whole percentage, rounding halves away from zero (0.015 -> 2, 0.125 -> 13).
pub fn percent_label(ratio: Ratio) -> String {
    let pct = (ratio.value() * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    format!("{}%", pct)
}

/// 命名規則：`{COUNTRY}-{PCT}%-{SOURCE_NAME}`，來源名稱不做任何清理
pub fn build_name(country: &str, ratio: Ratio, source_name: &str) -> String {
    format!("{}-{}-{}", country, percent_label(ratio), source_name)
}
