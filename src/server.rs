//! Server configuration, identity and the accept loop.
//!
//! `RedisServer` is the single process-wide root: configuration, the
//! replication identity, the keyspace, the stream-wakeup state and the
//! replica registry all hang off it. It is created once in `main` and
//! threaded into every handler as `Arc<RedisServer>`; each subsystem
//! encapsulates its own guard.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use rand::Rng;
use regex::Regex;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::connection::{handle_client_connection, run_replication_client};
use crate::key_value_store::KeyValueStore;
use crate::rdb;
use crate::replication::ReplicaRegistry;
use crate::state::State;

/// Errors that can occur during command-line argument parsing.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum CliError {
    #[error("Invalid command line flag")]
    InvalidCommandLineFlag,
    #[error("Invalid port flag value")]
    InvalidPortFlagValue,
    #[error("Invalid master address")]
    InvalidMasterAddress,
    #[error("Invalid master port")]
    InvalidMasterPort,
}

/// The role a server instance runs in.
///
/// A master accepts writes and fans them out to its replicas; a replica
/// bootstraps from the master at the given coordinates and applies the
/// propagated command stream.
#[derive(Debug, PartialEq, Clone)]
pub enum ServerRole {
    Master,
    Replica { host: String, port: u16 },
}

impl ServerRole {
    /// The role name reported by INFO (Redis wire terminology).
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerRole::Master => "master",
            ServerRole::Replica { .. } => "slave",
        }
    }
}

/// Static configuration assembled from the command line.
#[derive(Debug, PartialEq, Clone)]
pub struct ServerConfig {
    /// Directory holding the RDB snapshot
    pub dir: String,
    /// Snapshot file name inside `dir`
    pub dbfilename: String,
    /// TCP port to listen on (0 lets the OS pick, used by tests)
    pub port: u16,
    pub role: ServerRole,
}

impl ServerConfig {
    /// Parses configuration from command-line arguments.
    ///
    /// Supported flags: `--dir <path>`, `--dbfilename <name>`,
    /// `--port <num>`, `--replicaof "<host> <port>"`. The first argument
    /// (program name) is skipped.
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Result<Self, CliError> {
        let mut iter = args.into_iter().skip(1);

        let mut dir: Option<String> = None;
        let mut dbfilename: Option<String> = None;
        let mut port: Option<u16> = None;
        let mut role: Option<ServerRole> = None;

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--dir" => {
                    let Some(value) = iter.next() else {
                        return Err(CliError::InvalidCommandLineFlag);
                    };
                    dir = Some(value);
                }
                "--dbfilename" => {
                    let Some(value) = iter.next() else {
                        return Err(CliError::InvalidCommandLineFlag);
                    };
                    dbfilename = Some(value);
                }
                "--port" => {
                    let Some(value) = iter.next() else {
                        return Err(CliError::InvalidCommandLineFlag);
                    };
                    port = Some(validate_port(&value, CliError::InvalidPortFlagValue)?);
                }
                "--replicaof" => {
                    let Some(value) = iter.next() else {
                        return Err(CliError::InvalidCommandLineFlag);
                    };
                    let (host, master_port) = validate_master_address(&value)?;
                    role = Some(ServerRole::Replica {
                        host,
                        port: master_port,
                    });
                }
                _ => return Err(CliError::InvalidCommandLineFlag),
            }
        }

        Ok(ServerConfig {
            dir: dir.unwrap_or_else(|| ".".to_string()),
            dbfilename: dbfilename.unwrap_or_else(|| "dump.rdb".to_string()),
            port: port.unwrap_or(6379),
            role: role.unwrap_or(ServerRole::Master),
        })
    }

    /// Path of the RDB snapshot this instance reads at startup.
    pub fn rdb_path(&self) -> PathBuf {
        PathBuf::from(&self.dir).join(&self.dbfilename)
    }
}

/// The process-wide server root.
#[derive(Debug)]
pub struct RedisServer {
    pub config: ServerConfig,
    /// Fixed 40-character hex replication ID for the process lifetime
    pub repl_id: String,
    /// Bytes of master traffic consumed (replica role); masters keep 0
    repl_offset: Mutex<u64>,
    pub replicas: ReplicaRegistry,
    pub store: RwLock<KeyValueStore>,
    pub state: Mutex<State>,
}

impl RedisServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            repl_id: generate_repl_id(),
            repl_offset: Mutex::new(0),
            replicas: ReplicaRegistry::new(),
            store: RwLock::new(HashMap::new()),
            state: Mutex::new(State::new()),
        }
    }

    pub fn is_master(&self) -> bool {
        self.config.role == ServerRole::Master
    }

    /// Loads the startup snapshot into the keyspace. A missing or
    /// unreadable file is logged and ignored.
    pub async fn load_rdb(&self) {
        let path = self.config.rdb_path();

        match rdb::load_rdb_file(&path).await {
            Ok(entries) => {
                if !entries.is_empty() {
                    info!(count = entries.len(), path = %path.display(), "loaded RDB snapshot");
                }
                let mut store = self.store.write().await;
                store.extend(entries);
            }
            Err(e) if e.kind() == tokio::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no RDB snapshot to load");
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load RDB snapshot");
            }
        }
    }

    pub async fn bind(&self) -> tokio::io::Result<TcpListener> {
        TcpListener::bind(format!("0.0.0.0:{}", self.config.port)).await
    }

    /// Runs the server: spawns the replication client when configured as a
    /// replica, then accepts client connections until the listener fails.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) {
        if let ServerRole::Replica { host, port } = &self.config.role {
            let master_address = format!("{}:{}", host, port);
            let server = Arc::clone(&self);

            tokio::spawn(async move {
                if let Err(e) = run_replication_client(&master_address, server).await {
                    error!(master = %master_address, error = %e, "replication link closed");
                }
            });
        }

        loop {
            match listener.accept().await {
                Ok((stream, client_address)) => {
                    let server = Arc::clone(&self);

                    tokio::spawn(async move {
                        handle_client_connection(stream, server, client_address.to_string()).await;
                    });
                }
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    break;
                }
            }
        }
    }

    /// The global replication offset: bytes consumed from the master on a
    /// replica, 0 on a fresh master.
    pub async fn repl_offset(&self) -> u64 {
        *self.repl_offset.lock().await
    }

    pub async fn add_repl_offset(&self, bytes: u64) {
        let mut offset = self.repl_offset.lock().await;
        *offset += bytes;
    }
}

/// A fixed 40-character lowercase hex replication ID.
fn generate_repl_id() -> String {
    const HEX_CHARS: &[u8] = b"0123456789abcdef";
    let mut rng = rand::rng();

    (0..40)
        .map(|_| HEX_CHARS[rng.random_range(0..HEX_CHARS.len())] as char)
        .collect()
}

fn validate_port(port: &str, error: CliError) -> Result<u16, CliError> {
    // Port 0 stays valid here so tests can ask for an ephemeral port.
    port.parse::<u16>().map_err(|_| error.clone())
}

/// Validates a `"<host> <port>"` master address. The host may be an IPv4
/// address or a hostname.
fn validate_master_address(master_address: &str) -> Result<(String, u16), CliError> {
    let ipv4_regex = Regex::new(r"^(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})$").unwrap();
    let hostname_regex = Regex::new(r"^[a-zA-Z0-9\-\.]+$").unwrap();

    let parts = master_address.split_whitespace().collect::<Vec<&str>>();

    if parts.len() != 2 {
        return Err(CliError::InvalidMasterAddress);
    }

    let host = parts[0];

    let valid_host = if let Some(caps) = ipv4_regex.captures(host) {
        caps.iter().skip(1).all(|octet| {
            octet
                .map(|m| m.as_str().parse::<u16>().map(|v| v <= 255).unwrap_or(false))
                .unwrap_or(false)
        })
    } else {
        hostname_regex.is_match(host)
    };

    if !valid_host {
        return Err(CliError::InvalidMasterAddress);
    }

    let port = validate_port(parts[1], CliError::InvalidMasterPort)?;
    if port == 0 {
        return Err(CliError::InvalidMasterPort);
    }

    Ok((host.to_string(), port))
}
