use crate::domain::model::{
    AccountId, ConflictPolicy, CreatedAudience, LookalikeRequest, SeedAudience,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// 讀取帳號內所有 Custom Audience（分頁由實作處理）
#[async_trait]
pub trait AudienceLister: Send + Sync {
    async fn list_audiences(&self, account_id: &AccountId) -> Result<Vec<SeedAudience>>;
}

#[async_trait]
pub trait LookalikeCreator: Send + Sync {
    async fn create_lookalike(&self, request: &LookalikeRequest) -> Result<CreatedAudience>;
}

/// Binds a credential to a platform client. Chosen once at startup.
pub trait Connector: Send + Sync + 'static {
    type Client: AudienceLister + LookalikeCreator + 'static;

    fn connect(&self, access_token: &str) -> Result<Self::Client>;
}

/// Values pre-filled into the web form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormDefaults {
    pub account_id: String,
    pub countries: String,
    pub ratios: String,
    pub conflict_policy: ConflictPolicy,
}

pub trait ConfigProvider: Send + Sync {
    fn bind_addr(&self) -> &str;
    fn api_base_url(&self) -> &str;
    fn api_version(&self) -> &str;
    fn page_size(&self) -> usize;
    fn pacing_delay(&self) -> Duration;
    fn request_timeout(&self) -> Duration;
    fn form_defaults(&self) -> FormDefaults;
}
