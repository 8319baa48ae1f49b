use crate::config::{
    validate_provider, DEFAULT_API_BASE_URL, DEFAULT_API_VERSION, DEFAULT_BIND_ADDR,
    DEFAULT_COUNTRIES, DEFAULT_PACING_MS, DEFAULT_PAGE_SIZE, DEFAULT_RATIOS,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::domain::model::ConflictPolicy;
use crate::domain::ports::{ConfigProvider, FormDefaults};
use crate::utils::error::{LookalikeError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub graph_api: GraphApiConfig,
    pub batch: BatchConfig,
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphApiConfig {
    pub base_url: String,
    pub version: String,
    pub page_size: usize,
    pub timeout_seconds: u64,
}

impl Default for GraphApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            version: DEFAULT_API_VERSION.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub pacing_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            pacing_ms: DEFAULT_PACING_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub account_id: String,
    pub countries: String,
    pub ratios: String,
    pub conflict_policy: ConflictPolicy,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            account_id: String::new(),
            countries: DEFAULT_COUNTRIES.to_string(),
            ratios: DEFAULT_RATIOS.to_string(),
            conflict_policy: ConflictPolicy::default(),
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| LookalikeError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${FB_AD_ACCOUNT_ID})，未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| LookalikeError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl ConfigProvider for TomlConfig {
    fn bind_addr(&self) -> &str {
        &self.server.bind_addr
    }

    fn api_base_url(&self) -> &str {
        &self.graph_api.base_url
    }

    fn api_version(&self) -> &str {
        &self.graph_api.version
    }

    fn page_size(&self) -> usize {
        self.graph_api.page_size
    }

    fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.batch.pacing_ms)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.graph_api.timeout_seconds)
    }

    fn form_defaults(&self) -> FormDefaults {
        FormDefaults {
            account_id: self.defaults.account_id.clone(),
            countries: self.defaults.countries.clone(),
            ratios: self.defaults.ratios.clone(),
            conflict_policy: self.defaults.conflict_policy,
        }
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_provider(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[server]
bind_addr = "0.0.0.0:9000"

[graph_api]
base_url = "https://graph.facebook.com"
version = "v20.0"
page_size = 50
timeout_seconds = 10

[batch]
pacing_ms = 500

[defaults]
account_id = "act_924798139306112"
countries = "TW,HK,US"
ratios = "0.01,0.03"
conflict_policy = "skip"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
        assert_eq!(config.api_version(), "v20.0");
        assert_eq!(config.page_size(), 50);
        assert_eq!(config.pacing_delay(), Duration::from_millis(500));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        let defaults = config.form_defaults();
        assert_eq!(defaults.countries, "TW,HK,US");
        assert_eq!(defaults.conflict_policy, ConflictPolicy::Skip);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = TomlConfig::from_toml_str("[batch]\npacing_ms = 0\n").unwrap();

        assert_eq!(config.bind_addr(), DEFAULT_BIND_ADDR);
        assert_eq!(config.api_base_url(), DEFAULT_API_BASE_URL);
        assert!(config.pacing_delay().is_zero());
        assert_eq!(config.form_defaults().ratios, DEFAULT_RATIOS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("LOOKALIKE_TEST_ACCOUNT", "act_555");

        let toml_content = r#"
[defaults]
account_id = "${LOOKALIKE_TEST_ACCOUNT}"
countries = "${LOOKALIKE_TEST_UNSET_VAR}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.defaults.account_id, "act_555");
        assert_eq!(config.defaults.countries, "${LOOKALIKE_TEST_UNSET_VAR}");

        std::env::remove_var("LOOKALIKE_TEST_ACCOUNT");
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[graph_api]
base_url = "invalid-url"
"#;
        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());

        let config = TomlConfig::from_toml_str("[defaults]\nratios = \"0.3\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_policy_fails_parsing() {
        let result = TomlConfig::from_toml_str("[defaults]\nconflict_policy = \"overwrite\"\n");
        assert!(matches!(
            result,
            Err(LookalikeError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[server]\nbind_addr = \"127.0.0.1:9100\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:9100");
    }
}
