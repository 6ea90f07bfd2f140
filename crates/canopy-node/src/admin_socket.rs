//! Unix socket server for admin commands.
//!
//! Local IPC for a running node: one JSON command per line, one JSON
//! response per line.

use crate::error::Result;
use crate::events;
use crate::network::TreeNetwork;
use canopy_path::Targets;
use canopy_protocols::Event;
use canopy_topology::Node;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

/// Admin command sent over the socket.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum AdminCommand {
    /// Emit an event into the tree
    Emit {
        event: String,
        #[serde(default)]
        data: String,
        #[serde(default)]
        targets: Targets,
    },
    /// List live connections
    Connections,
    /// Store a node record and reload the topology
    UpdateNode { node: Node },
    /// Reload the topology from the store
    Restart,
    /// Ping (health check)
    Ping,
}

/// Response from admin command.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdminResponse {
    Ok { message: String },
    Error { error: String },
    List { items: Vec<String> },
    Pong,
}

/// Admin socket server.
pub struct AdminSocket {
    network: Arc<TreeNetwork>,
    socket_path: PathBuf,
}

impl AdminSocket {
    /// Create a new admin socket server.
    pub fn new(network: Arc<TreeNetwork>, socket_path: impl Into<PathBuf>) -> Self {
        Self {
            network,
            socket_path: socket_path.into(),
        }
    }

    /// Run the admin socket server.
    pub async fn run(&self) -> Result<()> {
        // Remove existing socket file if present
        let _ = std::fs::remove_file(&self.socket_path);
        if let Some(dir) = self.socket_path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        tracing::info!("Admin socket listening on {}", self.socket_path.display());

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let network = Arc::clone(&self.network);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, network).await {
                            tracing::error!("Admin connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept admin connection: {}", e);
                }
            }
        }
    }

    /// Get the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

async fn handle_connection(stream: UnixStream, network: Arc<TreeNetwork>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let response = match serde_json::from_str::<AdminCommand>(&line) {
            Ok(cmd) => execute_command(cmd, &network).await,
            Err(e) => AdminResponse::Error {
                error: format!("Invalid command: {}", e),
            },
        };

        let response_json = serde_json::to_string(&response)? + "\n";
        writer.write_all(response_json.as_bytes()).await?;
        line.clear();
    }

    Ok(())
}

async fn execute_command(cmd: AdminCommand, network: &TreeNetwork) -> AdminResponse {
    match cmd {
        AdminCommand::Emit {
            event,
            data,
            targets,
        } => {
            if targets.is_empty() {
                return AdminResponse::Error {
                    error: "emit needs at least one target".to_string(),
                };
            }
            match network.emit(Event::new(event.clone(), data), &targets).await {
                Ok(()) => {
                    tracing::info!("Admin emitted {}", event);
                    AdminResponse::Ok {
                        message: format!("Emitted {}", event),
                    }
                }
                Err(e) => AdminResponse::Error {
                    error: e.to_string(),
                },
            }
        }

        AdminCommand::Connections => AdminResponse::List {
            items: network
                .connections()
                .into_iter()
                .map(|c| format!("{}\t{}\t{}\t{}", c.kind, c.name, c.value, c.address))
                .collect(),
        },

        AdminCommand::UpdateNode { node } => {
            let name = node.name.clone();
            let data = match serde_json::to_vec(&node) {
                Ok(data) => data,
                Err(e) => {
                    return AdminResponse::Error {
                        error: e.to_string(),
                    }
                }
            };
            match network.update_node_info(&data) {
                Ok(()) => AdminResponse::Ok {
                    message: format!("Updated node {}", name),
                },
                Err(e) => AdminResponse::Error {
                    error: e.to_string(),
                },
            }
        }

        AdminCommand::Restart => {
            network.bus().trigger(Event::new(events::RESTART_NODE, Vec::new()));
            AdminResponse::Ok {
                message: "Restart requested".to_string(),
            }
        }

        AdminCommand::Ping => AdminResponse::Pong,
    }
}

/// Default socket path.
pub fn default_socket_path() -> PathBuf {
    std::env::var("CANOPY_ADMIN_SOCKET")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./canopy-data/admin.sock"))
}
