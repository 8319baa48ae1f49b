pub mod batch;
pub mod conflict;
pub mod naming;
pub mod parser;
pub mod report;
pub mod session;

pub use crate::domain::model::{
    AccountId, AudienceFilter, BatchProgress, BatchReport, ConflictPolicy, Outcome, Ratio,
    SeedAudience,
};
pub use crate::domain::ports::{AudienceLister, ConfigProvider, Connector, LookalikeCreator};
pub use crate::utils::error::Result;
