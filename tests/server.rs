//! End-to-end client scenarios over TCP.

mod common;

use std::time::Duration;

use common::{bulk, simple, start_master, TestClient};
use redis_clone::resp::{RespError, RespValue};

#[tokio::test]
async fn test_ping() {
    let (_server, address) = start_master().await;
    let mut client = TestClient::connect(address).await;

    client.send_raw(b"*1\r\n$4\r\nPING\r\n").await;
    assert_eq!(client.recv().await, Ok(simple("PONG")));
}

#[tokio::test]
async fn test_echo() {
    let (_server, address) = start_master().await;
    let mut client = TestClient::connect(address).await;

    assert_eq!(
        client.roundtrip(&["ECHO", "strawberry"]).await,
        simple("strawberry")
    );
}

#[tokio::test]
async fn test_set_get_with_expiry() {
    let (_server, address) = start_master().await;
    let mut client = TestClient::connect(address).await;

    assert_eq!(
        client.roundtrip(&["SET", "foo", "bar", "PX", "100"]).await,
        simple("OK")
    );
    assert_eq!(client.roundtrip(&["GET", "foo"]).await, bulk("bar"));

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(
        client.roundtrip(&["GET", "foo"]).await,
        RespValue::NullBulkString
    );
}

#[tokio::test]
async fn test_incr_sequence() {
    let (_server, address) = start_master().await;
    let mut client = TestClient::connect(address).await;

    assert_eq!(client.roundtrip(&["INCR", "n"]).await, RespValue::Integer(1));
    assert_eq!(client.roundtrip(&["INCR", "n"]).await, RespValue::Integer(2));

    assert_eq!(client.roundtrip(&["SET", "n", "x"]).await, simple("OK"));
    assert_eq!(
        client.roundtrip(&["INCR", "n"]).await,
        RespValue::Error("ERR value is not an integer or out of range".to_string())
    );
}

#[tokio::test]
async fn test_del_removes_keys() {
    let (_server, address) = start_master().await;
    let mut client = TestClient::connect(address).await;

    client.roundtrip(&["SET", "a", "1"]).await;
    client.roundtrip(&["SET", "b", "2"]).await;

    assert_eq!(
        client.roundtrip(&["DEL", "a", "b", "missing"]).await,
        RespValue::Integer(2)
    );
    assert_eq!(
        client.roundtrip(&["GET", "a"]).await,
        RespValue::NullBulkString
    );
}

#[tokio::test]
async fn test_keys_and_type() {
    let (_server, address) = start_master().await;
    let mut client = TestClient::connect(address).await;

    client.roundtrip(&["SET", "user:1", "a"]).await;
    client.roundtrip(&["XADD", "log", "1-1", "a", "1"]).await;

    let RespValue::Array(keys) = client.roundtrip(&["KEYS", "*"]).await else {
        panic!("KEYS should reply an array");
    };
    assert_eq!(keys.len(), 2);

    assert_eq!(client.roundtrip(&["TYPE", "user:1"]).await, simple("string"));
    assert_eq!(client.roundtrip(&["TYPE", "log"]).await, simple("stream"));
    assert_eq!(client.roundtrip(&["TYPE", "nope"]).await, simple("none"));
}

#[tokio::test]
async fn test_unknown_command() {
    let (_server, address) = start_master().await;
    let mut client = TestClient::connect(address).await;

    assert_eq!(
        client.roundtrip(&["FOOBAR", "x"]).await,
        RespValue::Error("ERR unknown command 'FOOBAR'".to_string())
    );
}

#[tokio::test]
async fn test_wrong_arity_error() {
    let (_server, address) = start_master().await;
    let mut client = TestClient::connect(address).await;

    client.send_raw(b"*1\r\n$3\r\nGET\r\n").await;
    assert_eq!(
        client.recv().await,
        Ok(RespValue::Error(
            "ERR wrong number of arguments for 'get' command".to_string()
        ))
    );
}

#[tokio::test]
async fn test_non_array_input_closes_the_connection() {
    let (_server, address) = start_master().await;
    let mut client = TestClient::connect(address).await;

    client.send_raw(b"+PING\r\n").await;
    assert_eq!(client.recv().await, Err(RespError::ConnectionClosed));
}

#[tokio::test]
async fn test_config_get_and_info() {
    let (server, address) = start_master().await;
    let mut client = TestClient::connect(address).await;

    assert_eq!(
        client.roundtrip(&["CONFIG", "GET", "dbfilename"]).await,
        RespValue::Array(vec![bulk("dbfilename"), bulk("dump.rdb")])
    );
    assert_eq!(
        client.roundtrip(&["CONFIG", "GET", "nope"]).await,
        RespValue::NullBulkString
    );

    let RespValue::BulkString(info) = client.roundtrip(&["INFO", "replication"]).await else {
        panic!("INFO should reply a bulk string");
    };
    assert!(info.contains("role:master"));
    assert!(info.contains(&format!("master_replid:{}", server.repl_id)));
    assert!(info.contains("master_repl_offset:0"));
}

#[tokio::test]
async fn test_transactions() {
    let (_server, address) = start_master().await;
    let mut client = TestClient::connect(address).await;

    assert_eq!(client.roundtrip(&["MULTI"]).await, simple("OK"));
    assert_eq!(client.roundtrip(&["INCR", "n"]).await, simple("QUEUED"));
    assert_eq!(client.roundtrip(&["INCR", "n"]).await, simple("QUEUED"));

    client.send(&["EXEC"]).await;
    assert_eq!(
        client.recv().await,
        Ok(RespValue::Array(vec![
            RespValue::Integer(1),
            RespValue::Integer(2),
        ]))
    );

    // The queue is gone once EXEC ran.
    assert_eq!(
        client.roundtrip(&["EXEC"]).await,
        RespValue::Error("ERR EXEC without MULTI".to_string())
    );
}

#[tokio::test]
async fn test_transaction_discard_and_nesting() {
    let (_server, address) = start_master().await;
    let mut client = TestClient::connect(address).await;

    assert_eq!(
        client.roundtrip(&["DISCARD"]).await,
        RespValue::Error("ERR DISCARD without MULTI".to_string())
    );

    client.roundtrip(&["MULTI"]).await;
    assert_eq!(
        client.roundtrip(&["MULTI"]).await,
        RespValue::Error("ERR MULTI calls can not be nested".to_string())
    );

    assert_eq!(client.roundtrip(&["SET", "k", "v"]).await, simple("QUEUED"));
    assert_eq!(client.roundtrip(&["DISCARD"]).await, simple("OK"));

    // The queued SET never executed.
    assert_eq!(
        client.roundtrip(&["GET", "k"]).await,
        RespValue::NullBulkString
    );
}

#[tokio::test]
async fn test_queued_command_errors_do_not_abort_exec() {
    let (_server, address) = start_master().await;
    let mut client = TestClient::connect(address).await;

    client.roundtrip(&["SET", "s", "x"]).await;
    client.roundtrip(&["MULTI"]).await;
    client.roundtrip(&["INCR", "s"]).await;
    client.roundtrip(&["SET", "t", "1"]).await;

    client.send(&["EXEC"]).await;
    assert_eq!(
        client.recv().await,
        Ok(RespValue::Array(vec![
            RespValue::Error("ERR value is not an integer or out of range".to_string()),
            simple("OK"),
        ]))
    );

    assert_eq!(client.roundtrip(&["GET", "t"]).await, bulk("1"));
}

#[tokio::test]
async fn test_xadd_xrange_scenario() {
    let (_server, address) = start_master().await;
    let mut client = TestClient::connect(address).await;

    assert_eq!(
        client.roundtrip(&["XADD", "s", "1-1", "a", "1"]).await,
        bulk("1-1")
    );
    assert_eq!(
        client.roundtrip(&["XADD", "s", "1-1", "a", "2"]).await,
        RespValue::Error(
            "ERR The ID specified in XADD is equal or smaller than the target stream top item"
                .to_string()
        )
    );
    assert_eq!(
        client.roundtrip(&["XADD", "s", "0-0", "a", "2"]).await,
        RespValue::Error("ERR The ID specified in XADD must be greater than 0-0".to_string())
    );
    assert_eq!(
        client.roundtrip(&["XADD", "s", "2-*", "a", "3"]).await,
        bulk("2-0")
    );

    let RespValue::Array(entries) = client.roundtrip(&["XRANGE", "s", "-", "+"]).await else {
        panic!("XRANGE should reply an array");
    };
    assert_eq!(entries.len(), 2);
    assert_eq!(
        entries[0],
        RespValue::Array(vec![
            bulk("1-1"),
            RespValue::Array(vec![bulk("a"), bulk("1")]),
        ])
    );
    assert_eq!(
        entries[1],
        RespValue::Array(vec![
            bulk("2-0"),
            RespValue::Array(vec![bulk("a"), bulk("3")]),
        ])
    );
}

#[tokio::test]
async fn test_xread_over_the_wire() {
    let (_server, address) = start_master().await;
    let mut client = TestClient::connect(address).await;

    client.roundtrip(&["XADD", "s", "1-1", "a", "1"]).await;
    client.roundtrip(&["XADD", "s", "2-0", "a", "2"]).await;

    let reply = client.roundtrip(&["XREAD", "STREAMS", "s", "1-1"]).await;
    assert_eq!(
        reply,
        RespValue::Array(vec![RespValue::Array(vec![
            bulk("s"),
            RespValue::Array(vec![RespValue::Array(vec![
                bulk("2-0"),
                RespValue::Array(vec![bulk("a"), bulk("2")]),
            ])]),
        ])])
    );

    assert_eq!(
        client.roundtrip(&["XREAD", "STREAMS", "s", "9-9"]).await,
        RespValue::NullArray
    );
}

#[tokio::test]
async fn test_blocking_xread_wakes_when_another_client_appends() {
    let (_server, address) = start_master().await;

    let mut blocked_client = TestClient::connect(address).await;
    blocked_client
        .send(&["XREAD", "BLOCK", "0", "STREAMS", "s", "$"])
        .await;

    // Give the read time to park before appending.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut writer_client = TestClient::connect(address).await;
    writer_client.roundtrip(&["XADD", "s", "5-1", "a", "1"]).await;

    let reply = tokio::time::timeout(Duration::from_secs(2), blocked_client.recv())
        .await
        .expect("blocked XREAD should wake up")
        .expect("reply should arrive");

    assert_eq!(
        reply,
        RespValue::Array(vec![RespValue::Array(vec![
            bulk("s"),
            RespValue::Array(vec![RespValue::Array(vec![
                bulk("5-1"),
                RespValue::Array(vec![bulk("a"), bulk("1")]),
            ])]),
        ])])
    );
}

#[tokio::test]
async fn test_blocking_xread_with_timeout_returns_nil() {
    let (_server, address) = start_master().await;
    let mut client = TestClient::connect(address).await;

    client.roundtrip(&["XADD", "s", "1-1", "a", "1"]).await;

    assert_eq!(
        client
            .roundtrip(&["XREAD", "BLOCK", "40", "STREAMS", "s", "$"])
            .await,
        RespValue::NullArray
    );
}

#[tokio::test]
async fn test_reads_observe_prior_writes_on_the_same_connection() {
    let (_server, address) = start_master().await;
    let mut client = TestClient::connect(address).await;

    for i in 0..10 {
        let value = i.to_string();
        assert_eq!(
            client.roundtrip(&["SET", "counter", &value]).await,
            simple("OK")
        );
        assert_eq!(client.roundtrip(&["GET", "counter"]).await, bulk(&value));
    }
}
