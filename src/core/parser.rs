use crate::domain::model::Ratio;
use crate::utils::error::{LookalikeError, Result};
use rust_decimal::Decimal;
use std::str::FromStr;

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(',').map(str::trim).filter(|t| !t.is_empty())
}

/// Decimal 最多保留 28 位小數，超過的輸入會被悄悄四捨五入
const MAX_FRACTION_DIGITS: usize = 28;

fn parse_decimal(token: &str) -> Option<Decimal> {
    let fraction_digits = token.split_once('.').map_or(0, |(_, f)| f.len());
    if !token.contains(['e', 'E']) && fraction_digits > MAX_FRACTION_DIGITS {
        return None;
    }
    Decimal::from_str(token)
        .or_else(|_| Decimal::from_scientific(token))
        .ok()
}

/// 解析逗號分隔的比例，例如 `0.01,0.02` (0.01 代表 1%)
pub fn parse_ratios(text: &str) -> Result<Vec<Ratio>> {
    let mut ratios = Vec::new();

    for token in tokens(text) {
        let ratio = parse_decimal(token).and_then(Ratio::new).ok_or_else(|| {
            LookalikeError::validation(format!(
                "Invalid ratio: {} (use a decimal in (0, 0.20], e.g. 0.01 for 1%)",
                token
            ))
        })?;
        ratios.push(ratio);
    }

    if ratios.is_empty() {
        return Err(LookalikeError::validation("Enter at least one ratio"));
    }
    Ok(ratios)
}

/// Upper-cases country tokens. Duplicates are kept on purpose.
pub fn parse_countries(text: &str) -> Result<Vec<String>> {
    let countries: Vec<String> = tokens(text).map(str::to_uppercase).collect();

    if countries.is_empty() {
        return Err(LookalikeError::validation("Enter at least one country code"));
    }
    Ok(countries)
}
