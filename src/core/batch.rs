use crate::core::conflict::{resolve_name, Resolution};
use crate::core::naming::build_name;
use crate::domain::model::{
    AccountId, BatchProgress, BatchReport, ConflictPolicy, LookalikeRequest, Outcome,
    OutcomeRecord, Ratio, SeedAudience,
};
use crate::domain::ports::LookalikeCreator;
use chrono::Utc;
use std::collections::HashSet;
use std::time::Duration;

/// 一次批次建立的全部輸入
#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub account_id: AccountId,
    pub seeds: Vec<SeedAudience>,
    pub ratios: Vec<Ratio>,
    pub countries: Vec<String>,
    pub policy: ConflictPolicy,
}

impl BatchPlan {
    pub fn total(&self) -> usize {
        self.seeds.len() * self.ratios.len() * self.countries.len()
    }
}

/// Sequential batch creation with a fixed pause between remote calls.
pub struct BatchDriver<'a, C: LookalikeCreator> {
    creator: &'a C,
    pacing: Duration,
}

impl<'a, C: LookalikeCreator> BatchDriver<'a, C> {
    pub fn new(creator: &'a C, pacing: Duration) -> Self {
        Self { creator, pacing }
    }

    /// Walks seed → ratio → country. Never aborts: each tuple ends up as one
    /// record, and only successfully created names are added to `existing`.
    pub async fn run<F>(
        &self,
        plan: &BatchPlan,
        existing: &mut HashSet<String>,
        mut on_progress: F,
    ) -> BatchReport
    where
        F: FnMut(BatchProgress),
    {
        let total = plan.total();
        let started_at = Utc::now();
        let mut records = Vec::with_capacity(total);
        let mut called_remote = false;

        tracing::info!(
            "🚀 Creating {} lookalike audiences (policy: {})",
            total,
            plan.policy
        );

        for seed in &plan.seeds {
            for &ratio in &plan.ratios {
                for country in &plan.countries {
                    let base_name = build_name(country, ratio, &seed.name);

                    let outcome = match resolve_name(&base_name, existing, plan.policy) {
                        Ok(Resolution::Use(final_name)) => {
                            if called_remote && !self.pacing.is_zero() {
                                tokio::time::sleep(self.pacing).await;
                            }
                            called_remote = true;

                            let request = LookalikeRequest {
                                account_id: plan.account_id.clone(),
                                source_id: seed.id.clone(),
                                ratio,
                                country: country.clone(),
                                name: final_name,
                            };
                            self.create_one(request, base_name, existing).await
                        }
                        Ok(Resolution::Skip) => {
                            tracing::info!("⏭️ Skipped existing name: {}", base_name);
                            Outcome::Skipped { base_name }
                        }
                        Err(e) => {
                            tracing::warn!("❌ {}", e);
                            Outcome::Failure {
                                base_name,
                                error: e.user_friendly_message(),
                            }
                        }
                    };

                    records.push(OutcomeRecord {
                        seed_id: seed.id.clone(),
                        seed_name: seed.name.clone(),
                        ratio,
                        country: country.clone(),
                        outcome,
                    });
                    on_progress(BatchProgress {
                        done: records.len(),
                        total,
                    });
                }
            }
        }

        let report = BatchReport {
            policy: plan.policy,
            started_at,
            finished_at: Utc::now(),
            records,
        };
        tracing::info!(
            "✅ Batch finished: {} created, {} skipped, {} failed",
            report.successes().count(),
            report.skipped().count(),
            report.failures().count()
        );
        report
    }

    async fn create_one(
        &self,
        request: LookalikeRequest,
        base_name: String,
        existing: &mut HashSet<String>,
    ) -> Outcome {
        match self.creator.create_lookalike(&request).await {
            Ok(created) => {
                tracing::info!("✅ Created {} (ID: {})", request.name, created.id);
                // 立即加入，避免同批次再撞名
                existing.insert(request.name.clone());
                Outcome::Success {
                    name: request.name,
                    id: created.id,
                }
            }
            Err(e) => {
                tracing::warn!("❌ Failed to create {}: {}", request.name, e);
                Outcome::Failure {
                    base_name,
                    error: e.user_friendly_message(),
                }
            }
        }
    }
}
