use crate::commands::{remove_if_expired, CommandError, CommandResult};
use crate::resp::RespValue;
use crate::server::RedisServer;

pub async fn type_command(
    server: &RedisServer,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    let [key] = arguments else {
        return Err(CommandError::WrongNumberOfArguments("type"));
    };

    let type_name = {
        let store = server.store.read().await;
        store
            .get(key.as_str())
            .filter(|value| !value.is_expired())
            .map(|value| value.data.type_name())
    };

    match type_name {
        Some(name) => Ok(CommandResult::Response(
            RespValue::SimpleString(name.to_string()).encode(),
        )),
        None => {
            remove_if_expired(server, key).await;
            Ok(CommandResult::Response(
                RespValue::SimpleString("none".to_string()).encode(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use jiff::{SignedDuration, Timestamp};

    use super::type_command;
    use crate::commands::test_support::test_server;
    use crate::commands::CommandResult;
    use crate::key_value_store::Value;
    use crate::stream::Stream;

    #[tokio::test]
    async fn test_type_reports_string_stream_and_none() {
        let server = test_server();
        {
            let mut store = server.store.write().await;
            store.insert("s".to_string(), Value::string("v".to_string(), None));
            store.insert("log".to_string(), Value::stream(Stream::new()));
            store.insert(
                "stale".to_string(),
                Value::string(
                    "v".to_string(),
                    Some(Timestamp::now() - SignedDuration::from_millis(5)),
                ),
            );
        }

        let test_cases = vec![
            ("s", "+string\r\n"),
            ("log", "+stream\r\n"),
            ("missing", "+none\r\n"),
            ("stale", "+none\r\n"),
        ];

        for (key, expected) in test_cases {
            let result = type_command(&server, &[key.to_string()]).await.unwrap();
            assert_eq!(
                result,
                CommandResult::Response(expected.to_string()),
                "key {}",
                key
            );
        }
    }
}
