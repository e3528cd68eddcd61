mod config;
mod ecs;
mod network;
mod player;
mod room_loop;
mod state;

use std::path::Path;
use std::sync::Arc;

use config::ServerConfig;
use rtype_auth::AuthService;
use rtype_protocol::Message;
use state::SharedState;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting rtype-server...");

    let config = ServerConfig::load(Path::new("config/server.toml"))?;
    info!(
        bind = %config.bind,
        port = config.port,
        max_clients = config.max_clients,
        tick_rate_hz = config.tick_rate_hz,
        "config loaded"
    );

    let auth = AuthService::new(config.accounts_path.clone())?;
    let listener = TcpListener::bind((config.bind.as_str(), config.port)).await?;
    let state = Arc::new(SharedState::new(config, auth));

    let matchmaking_handle = tokio::spawn(network::run_matchmaking_loop(state.clone()));

    info!(addr = %listener.local_addr()?, "listening for connections");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, addr) = match accepted {
                    Ok(pair) => pair,
                    Err(err) => {
                        error!(%err, "failed to accept connection");
                        continue;
                    }
                };
                if let Err(err) = stream.set_nodelay(true) {
                    error!(%err, %addr, "failed to set TCP_NODELAY");
                }
                let state = state.clone();
                tokio::spawn(async move {
                    network::handle_connection(stream, state).await;
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    shutdown(&state).await;
    matchmaking_handle.abort();
    Ok(())
}

/// Server shutdown (spec.md §5): stop accepting handshakes (the accept loop
/// has already exited by the time this runs), tell every peer why, and stop
/// every room's game loop before the process exits.
async fn shutdown(state: &Arc<SharedState>) {
    state.broadcast(&Message::Kick {
        reason: "server shutting down".to_string(),
    });

    let room_ids: Vec<String> = state.rooms.lock().expect("room table poisoned").keys().cloned().collect();
    for room_id in &room_ids {
        state.stop_room(room_id);
    }

    // Give in-flight writer tasks and room loops a bounded window to drain
    // and exit cleanly before the process tears everything down with them.
    tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    info!(rooms_stopped = room_ids.len(), "shutdown complete");
}
