use crate::domain::model::{AccountId, CreatedAudience, LookalikeRequest, SeedAudience};
use crate::domain::ports::{AudienceLister, ConfigProvider, Connector, LookalikeCreator};
use crate::utils::error::{LookalikeError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const AUDIENCE_FIELDS: &str = "id,name,approximate_count";

/// Upper bound on followed `paging.next` links for one listing.
pub const MAX_PAGES: usize = 500;

/// Graph API error code for an invalid or expired access token.
const INVALID_TOKEN_CODE: i64 = 190;

#[derive(Debug, Deserialize)]
struct GraphPage<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AudienceRow {
    id: String,
    name: Option<String>,
    approximate_count: Option<i64>,
    approximate_count_lower_bound: Option<i64>,
}

impl From<AudienceRow> for SeedAudience {
    fn from(row: AudienceRow) -> Self {
        let count = row
            .approximate_count
            .or(row.approximate_count_lower_bound)
            .and_then(|c| u64::try_from(c).ok());
        Self {
            id: row.id,
            name: row.name.unwrap_or_default(),
            approximate_count: count,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphErrorEnvelope {
    error: GraphErrorBody,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    message: String,
    code: Option<i64>,
    error_user_msg: Option<String>,
}

/// 將平台回傳的錯誤轉成文字，不做更細的分類
fn graph_error(status: u16, body: &str) -> LookalikeError {
    let (message, code) = match serde_json::from_str::<GraphErrorEnvelope>(body) {
        Ok(envelope) => {
            let message = match envelope.error.error_user_msg.filter(|m| !m.is_empty()) {
                Some(user_msg) => format!("{} ({})", envelope.error.message, user_msg),
                None => envelope.error.message,
            };
            (message, envelope.error.code)
        }
        Err(_) if body.trim().is_empty() => (format!("HTTP {}", status), None),
        Err(_) => (body.trim().to_string(), None),
    };

    if status == 401 || code == Some(INVALID_TOKEN_CODE) {
        LookalikeError::AuthenticationError { message }
    } else {
        LookalikeError::RemoteApiError { status, message }
    }
}

async fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    tracing::debug!("Graph API response status: {}", status);
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(graph_error(status.as_u16(), &body))
}

/// Builds clients for the Graph API; one instance is bound at startup.
#[derive(Debug, Clone)]
pub struct GraphApiConnector {
    http: Client,
    api_root: String,
    page_size: usize,
    max_pages: usize,
}

impl GraphApiConnector {
    pub fn new(base_url: &str, api_version: &str, page_size: usize, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lookalike-builder/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api_root: format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                api_version.trim_matches('/')
            ),
            page_size,
            max_pages: MAX_PAGES,
        })
    }

    /// Overrides the [`MAX_PAGES`] cap on followed `paging.next` links.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        Self::new(
            config.api_base_url(),
            config.api_version(),
            config.page_size(),
            config.request_timeout(),
        )
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }
}

impl Connector for GraphApiConnector {
    type Client = GraphApiClient;

    fn connect(&self, access_token: &str) -> Result<GraphApiClient> {
        let token = access_token.trim();
        if token.is_empty() {
            return Err(LookalikeError::AuthenticationError {
                message: "Access token is required".to_string(),
            });
        }
        Ok(GraphApiClient {
            http: self.http.clone(),
            api_root: self.api_root.clone(),
            page_size: self.page_size,
            max_pages: self.max_pages,
            access_token: token.to_string(),
        })
    }
}

/// Graph API client carrying one bearer credential.
#[derive(Clone)]
pub struct GraphApiClient {
    http: Client,
    api_root: String,
    page_size: usize,
    max_pages: usize,
    access_token: String,
}

impl fmt::Debug for GraphApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphApiClient")
            .field("api_root", &self.api_root)
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl GraphApiClient {
    fn audiences_url(&self, account_id: &AccountId) -> String {
        format!("{}/{}/customaudiences", self.api_root, account_id)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.bearer_auth(&self.access_token).send().await?;
        check_response(response).await
    }
}

#[async_trait]
impl AudienceLister for GraphApiClient {
    async fn list_audiences(&self, account_id: &AccountId) -> Result<Vec<SeedAudience>> {
        let limit = self.page_size.to_string();
        let mut request = self
            .http
            .get(self.audiences_url(account_id))
            .query(&[("fields", AUDIENCE_FIELDS), ("limit", limit.as_str())]);
        let mut audiences = Vec::new();

        for page in 1..=self.max_pages {
            let response = self.send(request).await?;
            let body: GraphPage<AudienceRow> = response.json().await?;
            tracing::debug!("Page {}: {} audiences", page, body.data.len());
            audiences.extend(body.data.into_iter().map(SeedAudience::from));

            // 依 paging.next 繼續翻頁，直到沒有下一頁
            match body.paging.and_then(|p| p.next) {
                Some(next) => request = self.http.get(next),
                None => return Ok(audiences),
            }
        }

        tracing::warn!("⚠️ Stopped listing after {} pages", self.max_pages);
        Err(LookalikeError::PaginationLimitError {
            pages: self.max_pages,
        })
    }
}

#[async_trait]
impl LookalikeCreator for GraphApiClient {
    async fn create_lookalike(&self, request: &LookalikeRequest) -> Result<CreatedAudience> {
        let ratio = serde_json::Number::from_str(&request.ratio.to_string())?;
        let spec = serde_json::json!({
            "ratio": ratio,
            "country": request.country,
        })
        .to_string();

        tracing::debug!(
            "Creating lookalike {} from {} ({})",
            request.name,
            request.source_id,
            spec
        );
        let form = [
            ("name", request.name.as_str()),
            ("subtype", "LOOKALIKE"),
            ("origin_audience_id", request.source_id.as_str()),
            ("lookalike_spec", spec.as_str()),
        ];
        let response = self
            .send(self.http.post(self.audiences_url(&request.account_id)).form(&form))
            .await?;
        Ok(response.json::<CreatedAudience>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_error_uses_platform_message() {
        let body = r#"{"error":{"message":"(#100) Invalid parameter","type":"OAuthException","code":100,"fbtrace_id":"A1"}}"#;
        match graph_error(400, body) {
            LookalikeError::RemoteApiError { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "(#100) Invalid parameter");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_graph_error_maps_invalid_token_to_authentication() {
        let body = r#"{"error":{"message":"Error validating access token","code":190}}"#;
        assert!(matches!(
            graph_error(400, body),
            LookalikeError::AuthenticationError { .. }
        ));
        assert!(matches!(
            graph_error(401, ""),
            LookalikeError::AuthenticationError { .. }
        ));
    }

    #[test]
    fn test_graph_error_appends_user_message() {
        let body = r#"{"error":{"message":"Invalid parameter","code":100,"error_user_msg":"Source audience too small"}}"#;
        assert_eq!(
            graph_error(400, body).user_friendly_message(),
            "Invalid parameter (Source audience too small)"
        );
    }

    #[test]
    fn test_graph_error_falls_back_to_raw_body() {
        assert_eq!(
            graph_error(502, "Bad Gateway").user_friendly_message(),
            "Bad Gateway"
        );
        assert_eq!(graph_error(503, "").user_friendly_message(), "HTTP 503");
    }

    #[test]
    fn test_audience_row_count_fallbacks() {
        let row: AudienceRow = serde_json::from_str(
            r#"{"id":"1","approximate_count_lower_bound":1200}"#,
        )
        .unwrap();
        let audience = SeedAudience::from(row);
        assert_eq!(audience.name, "");
        assert_eq!(audience.approximate_count, Some(1200));

        let row: AudienceRow =
            serde_json::from_str(r#"{"id":"2","name":"VIP","approximate_count":-1}"#).unwrap();
        assert_eq!(SeedAudience::from(row).approximate_count, None);
    }

    #[test]
    fn test_connect_requires_token() {
        let connector =
            GraphApiConnector::new("https://graph.facebook.com/", "v19.0", 100, Duration::from_secs(5))
                .unwrap();
        assert_eq!(connector.api_root(), "https://graph.facebook.com/v19.0");
        assert!(matches!(
            connector.connect("  "),
            Err(LookalikeError::AuthenticationError { .. })
        ));
        let client = connector.connect("secret-token").unwrap();
        assert!(!format!("{:?}", client).contains("secret-token"));
    }
}
