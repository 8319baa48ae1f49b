use crate::core::report::{report_to_csv, BatchSummary};
use crate::core::session::{BatchRequest, Session};
use crate::domain::model::{AccountId, AudienceFilter};
use crate::domain::ports::{AudienceLister, Connector};
use crate::utils::error::{ErrorCategory, LookalikeError, Result};
use crate::web::render::{render_page, ConnectedView, Notice, NoticeKind, PageView};
use crate::web::{AppState, ProgressSnapshot, ProgressTracker};
use axum::{
    extract::{Form, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;

#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub q: Option<String>,
    pub min_count: Option<String>,
    pub max_count: Option<String>,
}

impl FilterQuery {
    /// 數字欄位留空或格式錯誤時視為 0（不限）
    pub fn to_filter(&self) -> AudienceFilter {
        let number = |raw: &Option<String>| {
            raw.as_deref()
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(0)
        };
        AudienceFilter {
            keyword: self.q.clone().unwrap_or_default(),
            min_count: number(&self.min_count),
            max_count: number(&self.max_count),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConnectForm {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub account_id: String,
}

/// Reads the batch form. `audience_id` repeats once per selected option.
pub fn parse_batch_form(body: &str) -> Result<BatchRequest> {
    let mut request = BatchRequest::default();
    for (key, value) in url::form_urlencoded::parse(body.as_bytes()) {
        match key.as_ref() {
            "audience_id" => request.seed_ids.push(value.into_owned()),
            "ratios" => request.ratios = value.into_owned(),
            "countries" => request.countries = value.into_owned(),
            "policy" => request.policy = value.parse()?,
            _ => {}
        }
    }
    Ok(request)
}

fn status_for(err: &LookalikeError) -> StatusCode {
    if let LookalikeError::SessionError { .. } = err {
        return StatusCode::CONFLICT;
    }
    match err.category() {
        ErrorCategory::Input => StatusCode::BAD_REQUEST,
        ErrorCategory::Authentication => StatusCode::UNAUTHORIZED,
        ErrorCategory::Conflict => StatusCode::CONFLICT,
        ErrorCategory::Remote => StatusCode::BAD_GATEWAY,
        ErrorCategory::Configuration | ErrorCategory::System => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn not_connected() -> LookalikeError {
    LookalikeError::SessionError {
        message: "Connect to an ad account first".to_string(),
    }
}

struct PageInput<'a> {
    account_input: &'a str,
    form: &'a BatchRequest,
    filter: &'a AudienceFilter,
    notices: Vec<Notice>,
}

fn page_for<C: AudienceLister>(session: Option<&Session<C>>, input: PageInput<'_>) -> String {
    let view = PageView {
        account_input: input.account_input,
        form: input.form,
        filter: input.filter,
        connected: session.map(|s| ConnectedView {
            account_id: s.account_id(),
            loaded: s.audiences().len(),
            filtered: s.filter(input.filter),
        }),
        notices: input.notices,
        summary: session
            .and_then(|s| s.last_report())
            .map(BatchSummary::from_report),
    };
    render_page(&view)
}

fn default_form<C: Connector>(state: &AppState<C>) -> BatchRequest {
    let defaults = &state.settings.defaults;
    BatchRequest {
        seed_ids: Vec::new(),
        ratios: defaults.ratios.clone(),
        countries: defaults.countries.clone(),
        policy: defaults.conflict_policy,
    }
}

pub async fn index<C: Connector>(
    State(state): State<AppState<C>>,
    Query(query): Query<FilterQuery>,
) -> Html<String> {
    let filter = query.to_filter();
    let form = default_form(&state);
    let guard = state.session.lock().await;
    let account_input = guard
        .as_ref()
        .map(|s| s.account_id().to_string())
        .unwrap_or_else(|| state.settings.defaults.account_id.clone());

    Html(page_for(
        guard.as_ref(),
        PageInput {
            account_input: &account_input,
            form: &form,
            filter: &filter,
            notices: Vec::new(),
        },
    ))
}

async fn open_session<C: Connector>(
    state: &AppState<C>,
    form: &ConnectForm,
) -> Result<Session<C::Client>> {
    let account_id: AccountId = form.account_id.parse()?;
    let client = state.connector.connect(&form.access_token)?;
    Session::open(client, account_id).await
}

pub async fn connect<C: Connector>(
    State(state): State<AppState<C>>,
    Form(form): Form<ConnectForm>,
) -> (StatusCode, Html<String>) {
    let batch_form = default_form(&state);
    let filter = AudienceFilter::default();
    let mut guard = state.session.lock().await;
    // 重新連線時先清掉舊的 session
    *guard = None;

    let (status, notice) = match open_session(&state, &form).await {
        Ok(session) => {
            let loaded = session.audiences().len();
            *guard = Some(session);
            (
                StatusCode::OK,
                Notice::new(NoticeKind::Success, format!("✅ Loaded {} audiences", loaded)),
            )
        }
        Err(e) => {
            tracing::error!("❌ Connect failed: {}", e);
            (
                status_for(&e),
                Notice::new(
                    NoticeKind::Error,
                    format!("❌ Connection or loading failed: {}", e.user_friendly_message()),
                ),
            )
        }
    };

    let html = page_for(
        guard.as_ref(),
        PageInput {
            account_input: &form.account_id,
            form: &batch_form,
            filter: &filter,
            notices: vec![notice],
        },
    );
    (status, Html(html))
}

type SessionSlot<C> = OwnedMutexGuard<Option<Session<<C as Connector>::Client>>>;

/// 批次在獨立的 task 裡跑，瀏覽器斷線也會跑完並留下報告
async fn run_locked<C: Connector>(
    mut slot: SessionSlot<C>,
    request: BatchRequest,
    tracker: Arc<ProgressTracker>,
    pacing: Duration,
) -> (SessionSlot<C>, Result<String>) {
    let outcome = match slot.as_mut() {
        None => Err(not_connected()),
        Some(session) => {
            tracker.start();
            let outcome = session
                .run_batch(&request, pacing, |p| tracker.update(p))
                .await
                .map(|report| {
                    format!(
                        "Processed {} combinations (conflict policy: {})",
                        report.total(),
                        report.policy.label()
                    )
                });
            tracker.finish();
            outcome
        }
    };
    (slot, outcome)
}

pub async fn create_batch<C: Connector>(
    State(state): State<AppState<C>>,
    body: String,
) -> (StatusCode, Html<String>) {
    let filter = AudienceFilter::default();
    let parsed = parse_batch_form(&body);
    let form = parsed.as_ref().cloned().unwrap_or_else(|_| default_form(&state));
    let slot = Arc::clone(&state.session).lock_owned().await;

    let (slot, result) = match parsed {
        Err(e) => (slot, Err(e)),
        Ok(request) => {
            let worker = tokio::spawn(run_locked::<C>(
                slot,
                request,
                Arc::clone(&state.progress),
                state.settings.pacing,
            ));
            match worker.await {
                Ok(done) => done,
                Err(e) => {
                    tracing::error!("❌ Batch task aborted: {}", e);
                    state.progress.finish();
                    (
                        Arc::clone(&state.session).lock_owned().await,
                        Err(LookalikeError::IoError(std::io::Error::other(e.to_string()))),
                    )
                }
            }
        }
    };

    let (status, notice) = match result {
        Ok(text) => (StatusCode::OK, Notice::new(NoticeKind::Info, text)),
        Err(e) => {
            tracing::warn!("Batch request failed: {}", e);
            (
                status_for(&e),
                Notice::new(NoticeKind::Error, e.user_friendly_message()),
            )
        }
    };

    let account_input = slot
        .as_ref()
        .map(|s| s.account_id().to_string())
        .unwrap_or_default();
    let html = page_for(
        slot.as_ref(),
        PageInput {
            account_input: &account_input,
            form: &form,
            filter: &filter,
            notices: vec![notice],
        },
    );
    (status, Html(html))
}

pub async fn progress<C: Connector>(State(state): State<AppState<C>>) -> Json<ProgressSnapshot> {
    Json(state.progress.snapshot())
}

pub async fn report_csv<C: Connector>(State(state): State<AppState<C>>) -> Response {
    let guard = state.session.lock().await;
    let Some(report) = guard.as_ref().and_then(|s| s.last_report()) else {
        return (StatusCode::NOT_FOUND, "No batch has been run in this session").into_response();
    };

    match report_to_csv(report) {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"lookalike-report.csv\"",
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("❌ CSV export failed: {}", e);
            (status_for(&e), e.user_friendly_message()).into_response()
        }
    }
}
