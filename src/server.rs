//! MCP server initialization for stdio and Streamable HTTP transports.
//!
//! Provides [`serve_stdio`] and [`serve_http`] entry points that wire up the
//! database and MCP tool handler into a running server.

use crate::config::TenetConfig;
use crate::db;
use crate::tools::TenetTools;
use anyhow::Result;
use rmcp::ServiceExt;
use std::sync::{Arc, Mutex};

/// Shared setup: open DB and wrap state in Arc for sharing.
fn setup_shared_state(
    config: TenetConfig,
) -> Result<(Arc<Mutex<rusqlite::Connection>>, Arc<TenetConfig>)> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    Ok((Arc::new(Mutex::new(conn)), Arc::new(config)))
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: TenetConfig) -> Result<()> {
    tracing::info!("starting Tenet MCP server on stdio");

    let (db, config) = setup_shared_state(config)?;

    let tools = TenetTools::new(db, config);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running — waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over Streamable HTTP transport.
pub async fn serve_http(config: TenetConfig) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let bind_addr = format!("{host}:{port}");

    tracing::info!(addr = %bind_addr, "starting Tenet MCP server on HTTP");

    let (db, config) = setup_shared_state(config)?;

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(TenetTools::new(db.clone(), config.clone())),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to listen for ctrl-c");
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
