use std::time::Duration;

use tokio::sync::mpsc;

use crate::commands::stream_reply::entries_to_resp;
use crate::commands::{CommandError, CommandResult};
use crate::key_value_store::DataType;
use crate::resp::RespValue;
use crate::server::RedisServer;
use crate::state::StreamWaiter;
use crate::stream::StreamId;

pub struct XreadArguments {
    block: Option<u64>,
    /// `(key, raw id)` pairs in request order.
    requests: Vec<(String, String)>,
}

impl XreadArguments {
    /// `XREAD [BLOCK ms] STREAMS key1 … keyN id1 … idN`.
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        let (block, streams_index) = match arguments.first() {
            Some(option) if option.eq_ignore_ascii_case("block") => {
                let millis = arguments
                    .get(1)
                    .and_then(|a| a.parse::<u64>().ok())
                    .ok_or(CommandError::NotAnIntegerOrOutOfRange)?;
                (Some(millis), 2)
            }
            Some(_) => (None, 0),
            None => return Err(CommandError::WrongNumberOfArguments("xread")),
        };

        match arguments.get(streams_index) {
            Some(option) if option.eq_ignore_ascii_case("streams") => {}
            _ => return Err(CommandError::SyntaxError),
        }

        let rest = &arguments[streams_index + 1..];
        if rest.is_empty() || rest.len() % 2 != 0 {
            return Err(CommandError::WrongNumberOfArguments("xread"));
        }

        let half = rest.len() / 2;
        let requests = (0..half)
            .map(|i| (rest[i].clone(), rest[half + i].clone()))
            .collect();

        Ok(Self { block, requests })
    }
}

/// Reads entries strictly greater than each requested ID. Without entries
/// the reply is nil unless BLOCK was given, in which case the call parks
/// on the keys' wakeup channels until an append arrives (or the timeout
/// passes for `BLOCK ms > 0`).
pub async fn xread(
    server: &RedisServer,
    client_address: &str,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    let xread_arguments = XreadArguments::parse(arguments)?;
    let baselines = resolve_baselines(server, &xread_arguments.requests).await?;

    let Some(block_millis) = xread_arguments.block else {
        let streams = read_streams(server, &baselines).await;
        return Ok(CommandResult::Response(reply(streams).encode()));
    };

    // Waiters go in before the first read so an append landing between
    // that read and the wait still signals the channel.
    let (sender, mut receiver) = mpsc::channel(1);
    let keys: Vec<String> = baselines.iter().map(|(key, _)| key.clone()).collect();
    {
        let mut state = server.state.lock().await;
        for key in &keys {
            state.add_stream_waiter(
                key.clone(),
                StreamWaiter {
                    client_address: client_address.to_string(),
                    sender: sender.clone(),
                },
            );
        }
    }
    drop(sender);

    let mut streams = read_streams(server, &baselines).await;
    if streams.is_empty() {
        streams = wait_for_entries(server, &baselines, &mut receiver, block_millis).await;
    }

    let mut state = server.state.lock().await;
    state.remove_stream_waiters(&keys, client_address);
    drop(state);

    Ok(CommandResult::Response(reply(streams).encode()))
}

async fn wait_for_entries(
    server: &RedisServer,
    baselines: &[(String, StreamId)],
    receiver: &mut mpsc::Receiver<()>,
    block_millis: u64,
) -> Vec<RespValue> {
    if block_millis == 0 {
        // Re-arm until one of the watched streams actually grew past its
        // baseline; a signal for a smaller ID keeps waiting.
        loop {
            if receiver.recv().await.is_none() {
                return Vec::new();
            }

            let streams = read_streams(server, baselines).await;
            if !streams.is_empty() {
                return streams;
            }
        }
    }

    match tokio::time::timeout(Duration::from_millis(block_millis), receiver.recv()).await {
        Ok(Some(_)) => read_streams(server, baselines).await,
        _ => Vec::new(),
    }
}

/// Turns each requested ID into a concrete baseline; `$` means the
/// stream's current top (or the zero ID when the key holds nothing yet).
async fn resolve_baselines(
    server: &RedisServer,
    requests: &[(String, String)],
) -> Result<Vec<(String, StreamId)>, CommandError> {
    let store = server.store.read().await;
    let mut baselines = Vec::with_capacity(requests.len());

    for (key, raw_id) in requests {
        let baseline = if raw_id == "$" {
            match store.get(key.as_str()).filter(|value| !value.is_expired()) {
                Some(value) => match &value.data {
                    DataType::Stream(stream) => stream.last_id().unwrap_or(StreamId::new(0, 0)),
                    DataType::String(_) => return Err(CommandError::WrongType),
                },
                None => StreamId::new(0, 0),
            }
        } else {
            StreamId::parse(raw_id, 0)?
        };

        baselines.push((key.clone(), baseline));
    }

    Ok(baselines)
}

/// One `[key, entries]` sub-array per stream holding entries past its
/// baseline.
async fn read_streams(server: &RedisServer, baselines: &[(String, StreamId)]) -> Vec<RespValue> {
    let store = server.store.read().await;
    let mut streams = Vec::new();

    for (key, baseline) in baselines {
        let Some(value) = store.get(key.as_str()).filter(|value| !value.is_expired()) else {
            continue;
        };
        let DataType::Stream(stream) = &value.data else {
            continue;
        };

        let entries = stream.entries_after(*baseline);
        if !entries.is_empty() {
            streams.push(RespValue::Array(vec![
                RespValue::BulkString(key.clone()),
                entries_to_resp(&entries),
            ]));
        }
    }

    streams
}

fn reply(streams: Vec<RespValue>) -> RespValue {
    if streams.is_empty() {
        RespValue::NullArray
    } else {
        RespValue::Array(streams)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::xread;
    use crate::commands::test_support::test_server;
    use crate::commands::xadd::xadd;
    use crate::commands::{CommandError, CommandResult};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_xread_returns_entries_after_the_given_id() {
        let server = test_server();
        xadd(&server, &args(&["s", "1-1", "a", "1"])).await.unwrap();
        xadd(&server, &args(&["s", "2-1", "a", "2"])).await.unwrap();

        let CommandResult::Response(response) =
            xread(&server, "client-1", &args(&["STREAMS", "s", "1-1"]))
                .await
                .unwrap()
        else {
            panic!("expected a response");
        };

        assert_eq!(response.contains("$3\r\n2-1\r\n"), true);
        assert_eq!(response.contains("$3\r\n1-1\r\n"), false);
    }

    #[tokio::test]
    async fn test_xread_without_matches_is_nil() {
        let server = test_server();
        xadd(&server, &args(&["s", "1-1", "a", "1"])).await.unwrap();

        let result = xread(&server, "client-1", &args(&["STREAMS", "s", "5-0"]))
            .await
            .unwrap();
        assert_eq!(result, CommandResult::Response("*-1\r\n".to_string()));
    }

    #[tokio::test]
    async fn test_xread_reads_multiple_streams() {
        let server = test_server();
        xadd(&server, &args(&["s1", "1-1", "a", "1"])).await.unwrap();
        xadd(&server, &args(&["s2", "1-1", "b", "2"])).await.unwrap();

        let CommandResult::Response(response) = xread(
            &server,
            "client-1",
            &args(&["STREAMS", "s1", "s2", "0-0", "0-0"]),
        )
        .await
        .unwrap() else {
            panic!("expected a response");
        };

        assert_eq!(response.starts_with("*2\r\n"), true);
        assert_eq!(response.contains("$2\r\ns1\r\n"), true);
        assert_eq!(response.contains("$2\r\ns2\r\n"), true);
    }

    #[tokio::test]
    async fn test_blocking_xread_wakes_on_xadd() {
        let server = Arc::new(test_server());
        xadd(&server, &args(&["s", "1-1", "a", "1"])).await.unwrap();

        let reader = Arc::clone(&server);
        let read_task = tokio::spawn(async move {
            xread(&reader, "client-1", &args(&["BLOCK", "0", "STREAMS", "s", "$"])).await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        xadd(&server, &args(&["s", "2-0", "a", "2"])).await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(2), read_task)
            .await
            .expect("blocking read should wake up")
            .unwrap()
            .unwrap();

        let CommandResult::Response(response) = result else {
            panic!("expected a response");
        };
        assert_eq!(response.contains("$3\r\n2-0\r\n"), true);
        assert_eq!(response.contains("$3\r\n1-1\r\n"), false);
    }

    #[tokio::test]
    async fn test_blocking_xread_times_out_with_nil() {
        let server = test_server();
        xadd(&server, &args(&["s", "1-1", "a", "1"])).await.unwrap();

        let result = xread(
            &server,
            "client-1",
            &args(&["BLOCK", "30", "STREAMS", "s", "$"]),
        )
        .await
        .unwrap();

        assert_eq!(result, CommandResult::Response("*-1\r\n".to_string()));
    }

    #[tokio::test]
    async fn test_xread_argument_errors() {
        let server = test_server();

        assert_eq!(
            xread(&server, "client-1", &args(&["STREAMS", "s"])).await,
            Err(CommandError::WrongNumberOfArguments("xread"))
        );
        assert_eq!(
            xread(&server, "client-1", &args(&["BLOCK", "abc", "STREAMS", "s", "$"])).await,
            Err(CommandError::NotAnIntegerOrOutOfRange)
        );
        assert_eq!(
            xread(&server, "client-1", &args(&["s", "0-0"])).await,
            Err(CommandError::SyntaxError)
        );
    }
}
