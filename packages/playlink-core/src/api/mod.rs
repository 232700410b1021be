//! HTTP/WebSocket API layer.
//!
//! This module contains thin handlers that delegate to the dispatcher and
//! the session. It provides the router construction and server startup
//! functionality.

use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::clients::{BindPoint, ClientRegistry};
use crate::dispatcher::CommandDispatcher;
use crate::session::SessionHandle;
use crate::state::Config;

pub mod http;
pub mod ws;
pub mod ws_connection;

pub use ws_connection::WsConnectionManager;

/// Number of ports tried after the preferred one is taken.
const PORT_SEARCH_SPAN: u16 = 10;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to a TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),

    /// No available ports in the specified range.
    #[error("No available ports in range {start}-{end}")]
    NoAvailablePort { start: u16, end: u16 },
}

/// Shared application state for the API layer.
///
/// A thin bundle of references; all logic lives behind them.
#[derive(Clone)]
pub struct AppState {
    pub session: SessionHandle,
    pub dispatcher: Arc<CommandDispatcher>,
    pub registry: Arc<ClientRegistry>,
    pub bind_point: Arc<BindPoint>,
    pub ws_manager: Arc<WsConnectionManager>,
    pub config: Arc<Config>,
}

async fn find_available_port(start: u16, end: u16) -> Result<(u16, TcpListener), ServerError> {
    for port in start..=end {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        match TcpListener::bind(&addr).await {
            Ok(listener) => return Ok((port, listener)),
            Err(_) => continue,
        }
    }
    Err(ServerError::NoAvailablePort { start, end })
}

/// Binds the listener for `preferred_port`.
///
/// Port 0 lets the OS choose. Otherwise the preferred port is tried first,
/// followed by the next few ports.
pub async fn bind_listener(preferred_port: u16) -> Result<(u16, TcpListener), ServerError> {
    if preferred_port == 0 {
        let listener = TcpListener::bind(("0.0.0.0", 0)).await?;
        let port = listener.local_addr()?.port();
        return Ok((port, listener));
    }
    find_available_port(
        preferred_port,
        preferred_port.saturating_add(PORT_SEARCH_SPAN),
    )
    .await
}

/// Serves the API on an already-bound listener until the task is dropped.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), ServerError> {
    let app = http::create_router(state);
    axum::serve(listener, app).await?;
    Ok(())
}
