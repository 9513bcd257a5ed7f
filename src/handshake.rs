//! The replica side of the replication handshake.

use regex::Regex;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::resp::{RespError, RespReader, RespValue};

#[derive(Error, Debug, PartialEq)]
pub enum HandshakeError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error(transparent)]
    Resp(#[from] RespError),
    #[error("unexpected response from master: {0}")]
    UnexpectedResponse(String),
}

/// Runs the four-step handshake against a freshly connected master:
/// `PING`, `REPLCONF listening-port`, `REPLCONF capa psync2`, then
/// `PSYNC ? -1` answered by `+FULLRESYNC <replid> <offset>` and one RDB
/// bulk. Returns the snapshot payload; this implementation starts
/// replicas empty, so callers discard it.
pub async fn perform_handshake<R, W>(
    reader: &mut RespReader<R>,
    writer: &mut W,
    listening_port: u16,
) -> Result<Vec<u8>, HandshakeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let response = exchange(reader, writer, RespValue::command(&["PING"])).await?;
    expect_simple_string(&response, "PONG")?;

    let response = exchange(
        reader,
        writer,
        RespValue::command(&["REPLCONF", "listening-port", &listening_port.to_string()]),
    )
    .await?;
    expect_simple_string(&response, "OK")?;

    let response = exchange(
        reader,
        writer,
        RespValue::command(&["REPLCONF", "capa", "psync2"]),
    )
    .await?;
    expect_simple_string(&response, "OK")?;

    let response = exchange(reader, writer, RespValue::command(&["PSYNC", "?", "-1"])).await?;
    validate_fullresync(&response)?;

    let payload = reader.read_rdb_payload().await?;
    Ok(payload)
}

async fn exchange<R, W>(
    reader: &mut RespReader<R>,
    writer: &mut W,
    command: RespValue,
) -> Result<RespValue, HandshakeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(command.encode().as_bytes())
        .await
        .map_err(|e| HandshakeError::Io(e.to_string()))?;
    writer
        .flush()
        .await
        .map_err(|e| HandshakeError::Io(e.to_string()))?;

    Ok(reader.read_value().await?)
}

fn expect_simple_string(response: &RespValue, expected: &str) -> Result<(), HandshakeError> {
    if *response != RespValue::SimpleString(expected.to_string()) {
        return Err(HandshakeError::UnexpectedResponse(format!("{:?}", response)));
    }

    Ok(())
}

fn validate_fullresync(response: &RespValue) -> Result<(), HandshakeError> {
    let RespValue::SimpleString(text) = response else {
        return Err(HandshakeError::UnexpectedResponse(format!("{:?}", response)));
    };

    let parts = text.split_whitespace().collect::<Vec<&str>>();
    let valid = parts.len() == 3
        && parts[0] == "FULLRESYNC"
        && is_valid_repl_id(parts[1])
        && parts[2].parse::<u64>().is_ok();

    if !valid {
        return Err(HandshakeError::UnexpectedResponse(text.clone()));
    }

    Ok(())
}

fn is_valid_repl_id(repl_id: &str) -> bool {
    let re = Regex::new(r"^[a-zA-Z0-9]{40}$").unwrap();
    re.is_match(repl_id)
}
