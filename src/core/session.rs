use crate::core::batch::{BatchDriver, BatchPlan};
use crate::core::parser::{parse_countries, parse_ratios};
use crate::domain::model::{
    AccountId, AudienceFilter, BatchProgress, BatchReport, ConflictPolicy, SeedAudience,
};
use crate::domain::ports::{AudienceLister, LookalikeCreator};
use crate::utils::error::{LookalikeError, Result};
use std::collections::HashSet;
use std::time::Duration;

/// 使用者在表單送出的批次參數（原始文字）
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    pub seed_ids: Vec<String>,
    pub ratios: String,
    pub countries: String,
    pub policy: ConflictPolicy,
}

/// 連線後的狀態：帳號、平台 client、受眾列表與現有名稱
///
/// Created by a successful connect and dropped on reconnect. Only
/// [`Session::run_batch`] mutates the name set.
pub struct Session<C> {
    account_id: AccountId,
    client: C,
    audiences: Vec<SeedAudience>,
    existing_names: HashSet<String>,
    last_report: Option<BatchReport>,
}

impl<C: AudienceLister> Session<C> {
    pub async fn open(client: C, account_id: AccountId) -> Result<Self> {
        let mut session = Self {
            account_id,
            client,
            audiences: Vec::new(),
            existing_names: HashSet::new(),
            last_report: None,
        };
        session.refresh().await?;
        tracing::info!(
            "🔌 Connected to {} ({} audiences loaded)",
            session.account_id,
            session.audiences.len()
        );
        Ok(session)
    }

    /// Re-reads audiences and the name set from the platform.
    pub async fn refresh(&mut self) -> Result<()> {
        let mut audiences = self.client.list_audiences(&self.account_id).await?;
        audiences.sort_by_key(|a| a.name.to_lowercase());

        self.existing_names = audiences
            .iter()
            .filter(|a| !a.name.is_empty())
            .map(|a| a.name.clone())
            .collect();
        self.audiences = audiences;
        tracing::debug!("Loaded {} existing names", self.existing_names.len());
        Ok(())
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn audiences(&self) -> &[SeedAudience] {
        &self.audiences
    }

    pub fn existing_names(&self) -> &HashSet<String> {
        &self.existing_names
    }

    pub fn last_report(&self) -> Option<&BatchReport> {
        self.last_report.as_ref()
    }

    pub fn filter(&self, filter: &AudienceFilter) -> Vec<&SeedAudience> {
        self.audiences.iter().filter(|a| filter.matches(a)).collect()
    }

    /// 依選取順序找回來源受眾；找不到時以 ID 當作名稱
    pub fn resolve_seeds(&self, ids: &[String]) -> Vec<SeedAudience> {
        ids.iter()
            .map(|id| {
                self.audiences
                    .iter()
                    .find(|a| &a.id == id)
                    .cloned()
                    .unwrap_or_else(|| SeedAudience {
                        id: id.clone(),
                        name: id.clone(),
                        approximate_count: None,
                    })
            })
            .collect()
    }
}

impl<C: AudienceLister + LookalikeCreator> Session<C> {
    /// Validates the form input, refreshes the name set, then runs the batch.
    /// Nothing remote is touched when the input is invalid.
    pub async fn run_batch<F>(
        &mut self,
        request: &BatchRequest,
        pacing: Duration,
        on_progress: F,
    ) -> Result<&BatchReport>
    where
        F: FnMut(BatchProgress),
    {
        let ratios = parse_ratios(request.ratios.trim())?;
        let countries = parse_countries(&request.countries)?;
        if request.seed_ids.is_empty() {
            return Err(LookalikeError::validation(
                "Select at least one source audience",
            ));
        }

        // 重新抓一次現有名稱，避免外部同時建立造成衝突
        self.refresh().await?;

        let plan = BatchPlan {
            account_id: self.account_id.clone(),
            seeds: self.resolve_seeds(&request.seed_ids),
            ratios,
            countries,
            policy: request.policy,
        };

        let report = BatchDriver::new(&self.client, pacing)
            .run(&plan, &mut self.existing_names, on_progress)
            .await;
        Ok(&*self.last_report.insert(report))
    }
}
