use crate::domain::model::{BatchReport, Outcome};
use crate::utils::error::{LookalikeError, Result};

/// Skipped and failed lists only show this many entries.
pub const SUMMARY_LIMIT: usize = 20;

/// 截斷後的清單與剩餘筆數
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncated<T> {
    pub shown: Vec<T>,
    pub remaining: usize,
}

impl<T> Truncated<T> {
    fn collect_limited<I: Iterator<Item = T>>(items: I, limit: usize) -> Self {
        let mut shown = Vec::new();
        let mut remaining = 0;
        for item in items {
            if shown.len() < limit {
                shown.push(item);
            } else {
                remaining += 1;
            }
        }
        Self { shown, remaining }
    }

    pub fn total(&self) -> usize {
        self.shown.len() + self.remaining
    }
}

/// Grouped view of a report, as shown after a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub successes: Vec<(String, String)>,
    pub skipped: Truncated<String>,
    pub failures: Truncated<(String, String)>,
}

impl BatchSummary {
    pub fn from_report(report: &BatchReport) -> Self {
        Self {
            total: report.total(),
            successes: report
                .successes()
                .map(|(name, id)| (name.to_string(), id.to_string()))
                .collect(),
            skipped: Truncated::collect_limited(report.skipped().map(str::to_string), SUMMARY_LIMIT),
            failures: Truncated::collect_limited(
                report
                    .failures()
                    .map(|(name, error)| (name.to_string(), error.to_string())),
                SUMMARY_LIMIT,
            ),
        }
    }
}

/// 匯出 CSV，每個組合一列
pub fn report_to_csv(report: &BatchReport) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "seed_id",
        "seed_name",
        "ratio",
        "country",
        "status",
        "name",
        "audience_id",
        "error",
    ])?;

    for record in &report.records {
        let ratio = record.ratio.to_string();
        let (status, name, id, error) = match &record.outcome {
            Outcome::Success { name, id } => ("success", name.as_str(), id.as_str(), ""),
            Outcome::Skipped { base_name } => ("skipped", base_name.as_str(), "", ""),
            Outcome::Failure { base_name, error } => {
                ("failure", base_name.as_str(), "", error.as_str())
            }
        };
        writer.write_record([
            record.seed_id.as_str(),
            record.seed_name.as_str(),
            ratio.as_str(),
            record.country.as_str(),
            status,
            name,
            id,
            error,
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| LookalikeError::IoError(std::io::Error::other(e.to_string())))
}
