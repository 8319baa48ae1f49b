pub mod toml_config;

use crate::core::parser::{parse_countries, parse_ratios};
use crate::domain::model::{AccountId, ConflictPolicy};
use crate::domain::ports::{ConfigProvider, FormDefaults};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_file_extension, validate_non_empty_string, validate_positive_number, validate_range,
    validate_socket_addr, validate_url, Validate,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use toml_config::TomlConfig;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8501";
pub const DEFAULT_API_BASE_URL: &str = "https://graph.facebook.com";
pub const DEFAULT_API_VERSION: &str = "v19.0";
pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_PACING_MS: u64 = 250;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_COUNTRIES: &str = "TW,US";
pub const DEFAULT_RATIOS: &str = "0.01,0.02,0.05";

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "lookalike-builder")]
#[command(about = "Batch-create Facebook Lookalike Audiences from a local web form")]
pub struct CliConfig {
    #[arg(long, default_value = DEFAULT_BIND_ADDR)]
    pub bind_addr: String,

    #[arg(long, default_value = DEFAULT_API_BASE_URL)]
    pub api_base_url: String,

    #[arg(long, default_value = DEFAULT_API_VERSION)]
    pub api_version: String,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    #[arg(long, default_value_t = DEFAULT_PACING_MS, help = "Pause between create calls")]
    pub pacing_ms: u64,

    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,

    #[arg(long, default_value = "", help = "Ad account pre-filled in the form")]
    pub account_id: String,

    #[arg(long, default_value = DEFAULT_COUNTRIES)]
    pub countries: String,

    #[arg(long, default_value = DEFAULT_RATIOS)]
    pub ratios: String,

    #[arg(long, default_value = "append")]
    pub conflict_policy: ConflictPolicy,

    #[arg(short, long, help = "TOML config file; replaces the flags above")]
    pub config: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

impl ConfigProvider for CliConfig {
    fn bind_addr(&self) -> &str {
        &self.bind_addr
    }

    fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    fn api_version(&self) -> &str {
        &self.api_version
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn form_defaults(&self) -> FormDefaults {
        FormDefaults {
            account_id: self.account_id.clone(),
            countries: self.countries.clone(),
            ratios: self.ratios.clone(),
            conflict_policy: self.conflict_policy,
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(path) = &self.config {
            validate_file_extension("config", path, &["toml"])?;
        }
        validate_provider(self)
    }
}

/// 兩種設定來源共用的檢查
pub fn validate_provider<C: ConfigProvider + ?Sized>(config: &C) -> Result<()> {
    validate_socket_addr("bind_addr", config.bind_addr())?;
    validate_url("api_base_url", config.api_base_url())?;
    validate_non_empty_string("api_version", config.api_version())?;
    validate_range("page_size", config.page_size(), 1, 500)?;
    validate_positive_number("request_timeout", config.request_timeout().as_secs(), 1)?;

    let defaults = config.form_defaults();
    if !defaults.account_id.trim().is_empty() {
        defaults.account_id.parse::<AccountId>()?;
    }
    parse_ratios(&defaults.ratios)?;
    parse_countries(&defaults.countries)?;
    Ok(())
}
