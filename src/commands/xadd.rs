use crate::commands::{CommandError, CommandResult};
use crate::key_value_store::{DataType, Value};
use crate::resp::RespValue;
use crate::server::RedisServer;
use crate::stream::{EntryFields, EntryIdSpec, Stream};

pub struct XaddArguments {
    key: String,
    id_spec: EntryIdSpec,
    fields: EntryFields,
}

impl XaddArguments {
    /// `XADD key id field value [field value …]`: at least one pair, and
    /// fields and values must line up.
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() < 4 || arguments[2..].len() % 2 != 0 {
            return Err(CommandError::WrongNumberOfArguments("xadd"));
        }

        let fields = arguments[2..]
            .chunks(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();

        Ok(Self {
            key: arguments[0].clone(),
            id_spec: EntryIdSpec::parse(&arguments[1])?,
            fields,
        })
    }
}

/// Appends an entry, creating the stream when the key is absent (or only
/// held an expired value). Replies with the assigned entry ID and wakes
/// any blocked reader of the key.
pub async fn xadd(
    server: &RedisServer,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    let xadd_arguments = XaddArguments::parse(arguments)?;

    let assigned_id = {
        let mut store = server.store.write().await;

        // An expired value gives way to a fresh stream under the key.
        if store
            .get(&xadd_arguments.key)
            .is_some_and(|value| value.is_expired())
        {
            store.remove(&xadd_arguments.key);
        }

        let existed = store.contains_key(&xadd_arguments.key);
        let value = store
            .entry(xadd_arguments.key.clone())
            .or_insert_with(|| Value::stream(Stream::new()));

        let DataType::Stream(stream) = &mut value.data else {
            return Err(CommandError::WrongType);
        };

        match stream.add(xadd_arguments.id_spec, xadd_arguments.fields) {
            Ok(id) => id,
            Err(e) => {
                // A rejected first append must not leave an empty stream
                // behind.
                if !existed {
                    store.remove(&xadd_arguments.key);
                }
                return Err(e.into());
            }
        }
    };

    let state = server.state.lock().await;
    state.notify_stream_waiters(&xadd_arguments.key);

    Ok(CommandResult::Response(
        RespValue::BulkString(assigned_id.to_string()).encode(),
    ))
}
