//! Local web form: connect, pick seed audiences, run a batch, read the results.

pub mod handlers;
pub mod render;

use crate::core::session::Session;
use crate::domain::model::BatchProgress;
use crate::domain::ports::{ConfigProvider, Connector, FormDefaults};
use axum::{
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

#[derive(Debug, Clone)]
pub struct WebSettings {
    pub pacing: Duration,
    pub defaults: FormDefaults,
}

impl WebSettings {
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self {
            pacing: config.pacing_delay(),
            defaults: config.form_defaults(),
        }
    }
}

/// 批次進度，供 `/progress` 在不鎖 session 的情況下讀取
#[derive(Debug, Default)]
pub struct ProgressTracker {
    done: AtomicUsize,
    total: AtomicUsize,
    running: AtomicBool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub done: usize,
    pub total: usize,
    pub running: bool,
}

impl ProgressTracker {
    pub fn start(&self) {
        self.done.store(0, Ordering::SeqCst);
        self.total.store(0, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
    }

    pub fn update(&self, progress: BatchProgress) {
        self.total.store(progress.total, Ordering::SeqCst);
        self.done.store(progress.done, Ordering::SeqCst);
    }

    pub fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            done: self.done.load(Ordering::SeqCst),
            total: self.total.load(Ordering::SeqCst),
            running: self.running.load(Ordering::SeqCst),
        }
    }
}

/// Shared handler state. The session slot is empty until a connect succeeds.
pub struct AppState<C: Connector> {
    pub connector: Arc<C>,
    pub session: Arc<Mutex<Option<Session<C::Client>>>>,
    pub progress: Arc<ProgressTracker>,
    pub settings: Arc<WebSettings>,
}

impl<C: Connector> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
            session: Arc::clone(&self.session),
            progress: Arc::clone(&self.progress),
            settings: Arc::clone(&self.settings),
        }
    }
}

impl<C: Connector> AppState<C> {
    pub fn new(connector: C, settings: WebSettings) -> Self {
        Self {
            connector: Arc::new(connector),
            session: Arc::new(Mutex::new(None)),
            progress: Arc::new(ProgressTracker::default()),
            settings: Arc::new(settings),
        }
    }
}

pub fn build_app<C: Connector>(state: AppState<C>) -> Router {
    Router::new()
        .route("/", get(handlers::index::<C>))
        .route("/connect", post(handlers::connect::<C>))
        .route("/batches", post(handlers::create_batch::<C>))
        .route("/progress", get(handlers::progress::<C>))
        .route("/report.csv", get(handlers::report_csv::<C>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
