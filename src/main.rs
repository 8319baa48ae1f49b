use clap::Parser;
use lookalike_builder::domain::ports::ConfigProvider;
use lookalike_builder::utils::error::{ErrorSeverity, LookalikeError};
use lookalike_builder::utils::logger;
use lookalike_builder::utils::validation::{validate_file_extension, Validate};
use lookalike_builder::{build_app, AppState, CliConfig, GraphApiConnector, TomlConfig, WebSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting lookalike-builder");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let result = match cli.config.as_deref() {
        Some(path) => serve_from_file(path).await,
        None => serve(&cli).await,
    };

    if let Err(e) = result {
        match e.downcast_ref::<LookalikeError>() {
            Some(err) => exit_with(err),
            None => {
                tracing::error!("❌ Server error: {:#}", e);
                eprintln!("❌ {:#}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn serve_from_file(path: &str) -> anyhow::Result<()> {
    tracing::info!("📄 Loading configuration from {}", path);
    validate_file_extension("config", path, &["toml"])?;
    let config = TomlConfig::from_file(path)?;
    serve(&config).await
}

async fn serve<P: ConfigProvider + Validate>(config: &P) -> anyhow::Result<()> {
    config.validate()?;

    let connector = GraphApiConnector::from_config(config)?;
    tracing::info!("🌐 Graph API root: {}", connector.api_root());

    let state = AppState::new(connector, WebSettings::from_config(config));
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!("🚀 Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("👋 Server stopped");
    Ok(())
}

fn exit_with(e: &LookalikeError) -> ! {
    tracing::error!(
        "❌ Startup failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
