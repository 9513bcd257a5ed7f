//! Per-connection loops.
//!
//! A client connection reads framed commands and writes one reply each,
//! with two twists: `MULTI` turns the connection's local queue on, and a
//! successful `PSYNC` promotes the socket in place to a replica link —
//! from then on the loop only routes inbound `REPLCONF ACK` frames to the
//! replica registry and writes nothing back.
//!
//! A replica additionally runs one loop against its master: every
//! propagated command is applied silently (only `REPLCONF GETACK` gets a
//! reply) while the global offset counts the consumed bytes.

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::commands::{CommandError, CommandHandler, CommandResult};
use crate::handshake::{perform_handshake, HandshakeError};
use crate::rdb::EMPTY_RDB;
use crate::resp::{RespError, RespReader, RespValue};
use crate::server::RedisServer;

pub async fn handle_client_connection(
    stream: TcpStream,
    server: Arc<RedisServer>,
    client_address: String,
) {
    debug!(client = %client_address, "client connected");

    let (read_half, write_half) = stream.into_split();
    let mut reader = RespReader::new(read_half);
    let writer = Arc::new(Mutex::new(write_half));

    let mut tx_queue: Option<Vec<CommandHandler>> = None;
    let mut is_replica_link = false;

    loop {
        let input = match reader.read_value().await {
            Ok(value) => value,
            Err(RespError::ConnectionClosed) => {
                debug!(client = %client_address, "client disconnected");
                break;
            }
            Err(e) => {
                debug!(client = %client_address, error = %e, "closing connection after protocol error");
                break;
            }
        };

        if is_replica_link {
            route_replica_ack(&server, &client_address, &input).await;
            continue;
        }

        let command = match CommandHandler::new(&input) {
            Ok(command) => command,
            Err(e) => {
                debug!(client = %client_address, error = %e, "closing connection after invalid command frame");
                break;
            }
        };

        // Transaction control is connection-local state, handled before
        // the command table.
        let control_reply = match command.name.as_str() {
            "MULTI" => Some(multi(&mut tx_queue)),
            "EXEC" => Some(exec(&server, &client_address, &mut tx_queue).await),
            "DISCARD" => Some(discard(&mut tx_queue)),
            _ => None,
        };

        if let Some(reply) = control_reply {
            if write_to_stream(&writer, reply.as_bytes()).await.is_err() {
                break;
            }
            continue;
        }

        // An open queue swallows every other verb until EXEC or DISCARD.
        if let Some(queue) = tx_queue.as_mut() {
            queue.push(command);

            let queued = RespValue::SimpleString("QUEUED".to_string()).encode();
            if write_to_stream(&writer, queued.as_bytes()).await.is_err() {
                break;
            }
            continue;
        }

        match command.execute(&server, &client_address).await {
            Ok(CommandResult::Response(response)) => {
                // The initiating client gets its reply before fan-out
                // starts.
                if write_to_stream(&writer, response.as_bytes()).await.is_err() {
                    break;
                }

                if server.is_master() && command.is_write_command() {
                    server.replicas.propagate(&command.input).await;
                }
            }
            Ok(CommandResult::FullResync(response)) => {
                let mut reply = response.into_bytes();
                reply.extend_from_slice(format!("${}\r\n", EMPTY_RDB.len()).as_bytes());
                reply.extend_from_slice(EMPTY_RDB);

                if write_to_stream(&writer, &reply).await.is_err() {
                    break;
                }

                server
                    .replicas
                    .register(client_address.clone(), Arc::clone(&writer))
                    .await;
                is_replica_link = true;
                info!(replica = %client_address, "connection promoted to replica link");
            }
            Err(e) => {
                if write_to_stream(&writer, e.to_resp().encode().as_bytes())
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }
    }

    if is_replica_link {
        server.replicas.remove(&client_address).await;
    }
}

fn multi(tx_queue: &mut Option<Vec<CommandHandler>>) -> String {
    if tx_queue.is_some() {
        return CommandError::NestedMulti.to_resp().encode();
    }

    *tx_queue = Some(Vec::new());
    RespValue::SimpleString("OK".to_string()).encode()
}

fn discard(tx_queue: &mut Option<Vec<CommandHandler>>) -> String {
    match tx_queue.take() {
        Some(_) => RespValue::SimpleString("OK".to_string()).encode(),
        None => CommandError::DiscardWithoutMulti.to_resp().encode(),
    }
}

/// Executes the queued commands in FIFO order and replies with one array
/// holding each command's result. Writes propagate as they execute, one
/// command at a time.
async fn exec(
    server: &Arc<RedisServer>,
    client_address: &str,
    tx_queue: &mut Option<Vec<CommandHandler>>,
) -> String {
    let Some(queued) = tx_queue.take() else {
        return CommandError::ExecWithoutMulti.to_resp().encode();
    };

    let mut reply = format!("*{}\r\n", queued.len());

    for command in &queued {
        let result = match command.execute(server, client_address).await {
            Ok(CommandResult::Response(response)) => {
                if server.is_master() && command.is_write_command() {
                    server.replicas.propagate(&command.input).await;
                }
                response
            }
            // Promoting a connection mid-transaction makes no sense.
            Ok(CommandResult::FullResync(_)) => {
                CommandError::UnrecognizedPsyncRequest.to_resp().encode()
            }
            Err(e) => e.to_resp().encode(),
        };

        reply.push_str(&result);
    }

    reply
}

/// On a promoted link the only meaningful inbound traffic is
/// `REPLCONF ACK <offset>`; everything else is dropped.
async fn route_replica_ack(server: &RedisServer, client_address: &str, input: &RespValue) {
    let Ok(command) = CommandHandler::new(input) else {
        return;
    };

    if command.name != "REPLCONF"
        || !command
            .arguments
            .first()
            .is_some_and(|a| a.eq_ignore_ascii_case("ACK"))
    {
        return;
    }

    let Some(offset) = command.arguments.get(1).and_then(|a| a.parse::<u64>().ok()) else {
        return;
    };

    server.replicas.ack_received(client_address, offset).await;
}

pub async fn write_to_stream(
    writer: &Arc<Mutex<OwnedWriteHalf>>,
    bytes: &[u8],
) -> tokio::io::Result<()> {
    let mut writer_guard = writer.lock().await;
    writer_guard.write_all(bytes).await?;
    writer_guard.flush().await
}

/// Connects to the master, performs the handshake and then applies the
/// propagated command stream until the link drops.
pub async fn run_replication_client(
    master_address: &str,
    server: Arc<RedisServer>,
) -> Result<(), HandshakeError> {
    let stream = TcpStream::connect(master_address)
        .await
        .map_err(|e| HandshakeError::Io(e.to_string()))?;

    let (read_half, mut write_half) = stream.into_split();
    let mut reader = RespReader::new(read_half);

    // The bootstrap snapshot is discarded: this replica starts empty.
    let _snapshot = perform_handshake(&mut reader, &mut write_half, server.config.port).await?;
    info!(master = %master_address, "replication handshake complete");

    handle_master_connection(reader, write_half, server).await;
    Ok(())
}

/// The replica's read loop on the master link. Commands are applied
/// without replies (`REPLCONF GETACK` excepted) and the global offset
/// grows by each command's encoded length after it is dispatched.
async fn handle_master_connection(
    mut reader: RespReader<OwnedReadHalf>,
    mut writer: OwnedWriteHalf,
    server: Arc<RedisServer>,
) {
    loop {
        let input = match reader.read_value().await {
            Ok(value) => value,
            Err(RespError::ConnectionClosed) => {
                error!("master link closed");
                break;
            }
            Err(e) => {
                error!(error = %e, "master link failed");
                break;
            }
        };

        let encoded_len = input.encoded_len() as u64;

        match CommandHandler::new(&input) {
            Ok(command) => apply_replicated_command(&server, &command, &mut writer).await,
            Err(e) => debug!(error = %e, "ignoring non-command frame from master"),
        }

        server.add_repl_offset(encoded_len).await;
    }
}

async fn apply_replicated_command(
    server: &Arc<RedisServer>,
    command: &CommandHandler,
    writer: &mut OwnedWriteHalf,
) {
    let is_getack = command.name == "REPLCONF"
        && command
            .arguments
            .first()
            .is_some_and(|a| a.eq_ignore_ascii_case("GETACK"));

    match command.execute(server, "master").await {
        Ok(CommandResult::Response(response)) if is_getack => {
            if let Err(e) = writer.write_all(response.as_bytes()).await {
                warn!(error = %e, "failed to send ack to master");
            } else if let Err(e) = writer.flush().await {
                warn!(error = %e, "failed to flush ack to master");
            }
        }
        Ok(_) => {}
        Err(e) => {
            debug!(command = %command.name, error = %e, "replicated command failed");
        }
    }
}
