//! MCP Server Entry Point
//!
//! Initializes logging, loads configuration, prepares the tool store and
//! starts the configured transport while stored tools load in the background.

use anyhow::Result;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use dynamic_tool_server::core::{Config, McpServer, TransportService};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from environment
    let config = Config::from_env();

    // Initialize logging
    init_logging(&config.logging.level);

    info!("Starting {} v{}", config.server.name, config.server.version);

    start(config).await?;

    info!("Server shutting down");

    Ok(())
}

async fn start(config: Config) -> dynamic_tool_server::Result<()> {
    let server = McpServer::new(config.clone());
    server.failures().install_panic_hook();
    server.prepare().await?;

    info!(
        tools_dir = %config.tools.tools_dir.display(),
        logs_dir = %config.tools.logs_dir.display(),
        "Server initialized"
    );

    // Loading runs alongside the transport; tools appear as they load.
    let initial_load = server.spawn_initial_load();
    tokio::spawn(async move {
        match initial_load.await {
            Ok(report) => info!(
                loaded = report.loaded.len(),
                failed = report.failed.len(),
                "Initial tool load finished"
            ),
            Err(e) => warn!("Initial tool load aborted: {}", e),
        }
    });

    TransportService::new(config.transport).run(server).await?;
    Ok(())
}

/// Initialize the logging subsystem.
///
/// Logs go to stderr so the stdio transport keeps stdout for protocol frames.
fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
