//! Shared helpers for the TCP integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use redis_clone::resp::{RespError, RespReader, RespValue};
use redis_clone::server::{RedisServer, ServerConfig, ServerRole};

/// Boots a server on an ephemeral port and returns its root and the
/// address clients should dial.
pub async fn start_server(config: ServerConfig) -> (Arc<RedisServer>, SocketAddr) {
    let server = Arc::new(RedisServer::new(config));
    server.load_rdb().await;

    let listener = server.bind().await.expect("bind should succeed");
    let port = listener.local_addr().expect("listener has an address").port();

    tokio::spawn(Arc::clone(&server).serve(listener));

    (server, SocketAddr::from(([127, 0, 0, 1], port)))
}

pub fn master_config() -> ServerConfig {
    ServerConfig {
        dir: ".".to_string(),
        dbfilename: "dump.rdb".to_string(),
        port: 0,
        role: ServerRole::Master,
    }
}

pub async fn start_master() -> (Arc<RedisServer>, SocketAddr) {
    start_server(master_config()).await
}

pub async fn start_replica_of(master: SocketAddr) -> (Arc<RedisServer>, SocketAddr) {
    start_server(ServerConfig {
        dir: ".".to_string(),
        dbfilename: "dump.rdb".to_string(),
        port: 0,
        role: ServerRole::Replica {
            host: master.ip().to_string(),
            port: master.port(),
        },
    })
    .await
}

/// A raw RESP client speaking to a server under test.
pub struct TestClient {
    reader: RespReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    pub async fn connect(address: SocketAddr) -> Self {
        let stream = TcpStream::connect(address)
            .await
            .expect("connect should succeed");
        let (read_half, write_half) = stream.into_split();

        Self {
            reader: RespReader::new(read_half),
            writer: write_half,
        }
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        use tokio::io::AsyncWriteExt;

        self.writer
            .write_all(bytes)
            .await
            .expect("write should succeed");
        self.writer.flush().await.expect("flush should succeed");
    }

    pub async fn send(&mut self, parts: &[&str]) {
        self.send_raw(RespValue::command(parts).encode().as_bytes())
            .await;
    }

    pub async fn recv(&mut self) -> Result<RespValue, RespError> {
        self.reader.read_value().await
    }

    pub async fn roundtrip(&mut self, parts: &[&str]) -> RespValue {
        self.send(parts).await;
        self.recv().await.expect("reply should arrive")
    }

    pub async fn read_rdb_payload(&mut self) -> Vec<u8> {
        self.reader
            .read_rdb_payload()
            .await
            .expect("RDB payload should arrive")
    }
}

pub fn simple(text: &str) -> RespValue {
    RespValue::SimpleString(text.to_string())
}

pub fn bulk(text: &str) -> RespValue {
    RespValue::BulkString(text.to_string())
}
