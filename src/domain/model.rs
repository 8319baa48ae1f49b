use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::{LookalikeError, Result};

/// 來源受眾（唯讀）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedAudience {
    pub id: String,
    pub name: String,
    pub approximate_count: Option<u64>,
}

impl SeedAudience {
    /// 列表顯示用：`名稱 (人數) — ID`
    pub fn label(&self) -> String {
        let count = match self.approximate_count {
            Some(count) if count > 0 => count.to_string(),
            _ => "N/A".to_string(),
        };
        format!("{} ({}) — {}", self.name, count, self.id)
    }
}

/// Similarity ratio in (0, 0.20], kept as an exact decimal.
///
/// Precision is that of `rust_decimal`: at most 28 fractional digits. The
/// parser rejects longer input instead of letting it round into range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ratio(Decimal);

impl Ratio {
    pub const MAX: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

    pub fn new(value: Decimal) -> Option<Self> {
        (value > Decimal::ZERO && value <= Self::MAX).then_some(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// 廣告帳號 ID，統一為 `act_<數字>` 格式
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccountId {
    type Err = LookalikeError;

    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LookalikeError::validation("Ad account id is required"));
        }
        if trimmed.starts_with("act_") {
            return Ok(Self(trimmed.to_string()));
        }
        if trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Ok(Self(format!("act_{}", trimmed)));
        }
        Err(LookalikeError::validation(format!(
            "Invalid ad account id: {} (expected act_<digits> or digits)",
            trimmed
        )))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 命名重複時的處理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// 自動加尾碼 -2, -3, ...
    #[default]
    Append,
    Skip,
    /// Strict per item: the colliding tuple fails, the batch goes on.
    Fail,
}

impl ConflictPolicy {
    pub const ALL: [ConflictPolicy; 3] = [Self::Append, Self::Skip, Self::Fail];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Skip => "skip",
            Self::Fail => "fail",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Append => "Append suffix (-2, -3, ...)",
            Self::Skip => "Skip duplicates",
            Self::Fail => "Strict (fail the item)",
        }
    }
}

impl FromStr for ConflictPolicy {
    type Err = LookalikeError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "append" => Ok(Self::Append),
            "skip" => Ok(Self::Skip),
            "fail" => Ok(Self::Fail),
            other => Err(LookalikeError::validation(format!(
                "Unknown conflict policy: {} (use append, skip or fail)",
                other
            ))),
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LookalikeRequest {
    pub account_id: AccountId,
    pub source_id: String,
    pub ratio: Ratio,
    pub country: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedAudience {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Success { name: String, id: String },
    Skipped { base_name: String },
    Failure { base_name: String, error: String },
}

/// 單一組合（來源 × 比例 × 國家）的結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeRecord {
    pub seed_id: String,
    pub seed_name: String,
    pub ratio: Ratio,
    pub country: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub policy: ConflictPolicy,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub records: Vec<OutcomeRecord>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn successes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.records.iter().filter_map(|r| match &r.outcome {
            Outcome::Success { name, id } => Some((name.as_str(), id.as_str())),
            _ => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.records.iter().filter_map(|r| match &r.outcome {
            Outcome::Skipped { base_name } => Some(base_name.as_str()),
            _ => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.records.iter().filter_map(|r| match &r.outcome {
            Outcome::Failure { base_name, error } => Some((base_name.as_str(), error.as_str())),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub done: usize,
    pub total: usize,
}

/// 受眾列表篩選條件，0 代表不限
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudienceFilter {
    pub keyword: String,
    pub min_count: u64,
    pub max_count: u64,
}

impl AudienceFilter {
    pub fn matches(&self, audience: &SeedAudience) -> bool {
        let count = audience.approximate_count.unwrap_or(0);
        // 關鍵字不做 trim，照原樣比對子字串
        let keyword = self.keyword.to_lowercase();

        if !keyword.is_empty() && !audience.name.to_lowercase().contains(&keyword) {
            return false;
        }
        if self.min_count > 0 && count < self.min_count {
            return false;
        }
        if self.max_count > 0 && count > self.max_count {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audience(name: &str, count: Option<u64>) -> SeedAudience {
        SeedAudience {
            id: "6001".to_string(),
            name: name.to_string(),
            approximate_count: count,
        }
    }

    #[test]
    fn test_ratio_bounds() {
        assert!(Ratio::new(Decimal::new(1, 2)).is_some());
        assert!(Ratio::new(Decimal::new(20, 2)).is_some());
        assert!(Ratio::new(Decimal::new(21, 2)).is_none());
        assert!(Ratio::new(Decimal::ZERO).is_none());
        assert!(Ratio::new(Decimal::new(-1, 2)).is_none());
    }

    #[test]
    fn test_ratio_display_is_normalized() {
        let ratio = Ratio::new(Decimal::new(100, 4)).unwrap();
        assert_eq!(ratio.to_string(), "0.01");
    }

    #[test]
    fn test_account_id_normalization() {
        assert_eq!("act_123".parse::<AccountId>().unwrap().as_str(), "act_123");
        assert_eq!(" 924798 ".parse::<AccountId>().unwrap().as_str(), "act_924798");
        assert!("".parse::<AccountId>().is_err());
        assert!("abc".parse::<AccountId>().is_err());
    }

    #[test]
    fn test_conflict_policy_parse() {
        assert_eq!("append".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::Append);
        assert_eq!("SKIP".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::Skip);
        assert_eq!("fail".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::Fail);
        assert!("overwrite".parse::<ConflictPolicy>().is_err());
    }

    #[test]
    fn test_label_shows_na_for_unknown_count() {
        assert_eq!(audience("VIP List", None).label(), "VIP List (N/A) — 6001");
        assert_eq!(audience("VIP List", Some(1200)).label(), "VIP List (1200) — 6001");
    }

    #[test]
    fn test_filter_keyword_and_bounds() {
        let filter = AudienceFilter {
            keyword: "vip".to_string(),
            min_count: 1000,
            max_count: 0,
        };
        assert!(filter.matches(&audience("VIP List", Some(1500))));
        assert!(!filter.matches(&audience("VIP List", Some(500))));
        assert!(!filter.matches(&audience("VIP List", None)));
        assert!(!filter.matches(&audience("Cart Abandoners", Some(5000))));

        let spaced = AudienceFilter {
            keyword: " vip".to_string(),
            ..Default::default()
        };
        assert!(!spaced.matches(&audience("VIP List", Some(1500))));
        assert!(spaced.matches(&audience("Gold VIP", Some(1500))));

        let capped = AudienceFilter {
            max_count: 2000,
            ..Default::default()
        };
        assert!(capped.matches(&audience("anything", None)));
        assert!(!capped.matches(&audience("anything", Some(2001))));
    }
}
