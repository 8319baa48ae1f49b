pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;
pub mod web;

pub use adapters::{GraphApiClient, GraphApiConnector};
pub use config::{CliConfig, TomlConfig};
pub use core::session::{BatchRequest, Session};
pub use web::{build_app, AppState, WebSettings};
pub use utils::error::{LookalikeError, Result};
