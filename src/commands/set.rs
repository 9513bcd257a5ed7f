use jiff::{SignedDuration, Timestamp};

use crate::commands::{CommandError, CommandResult};
use crate::key_value_store::Value;
use crate::resp::RespValue;
use crate::server::RedisServer;

pub struct SetArguments {
    key: String,
    value: String,
    expiration: Option<Timestamp>,
}

impl SetArguments {
    /// `SET key value [PX milliseconds]`. The expiration is converted to
    /// an absolute timestamp at parse time.
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        let (key, value) = match arguments {
            [key, value, ..] => (key.clone(), value.clone()),
            _ => return Err(CommandError::WrongNumberOfArguments("set")),
        };

        let expiration = match &arguments[2..] {
            [] => None,
            [option, millis] if option.eq_ignore_ascii_case("px") => {
                let millis = millis
                    .parse::<i64>()
                    .ok()
                    .filter(|ms| *ms > 0)
                    .ok_or(CommandError::NotAnIntegerOrOutOfRange)?;

                let expiration = Timestamp::now()
                    .checked_add(SignedDuration::from_millis(millis))
                    .map_err(|_| CommandError::NotAnIntegerOrOutOfRange)?;

                Some(expiration)
            }
            _ => return Err(CommandError::SyntaxError),
        };

        Ok(Self {
            key,
            value,
            expiration,
        })
    }
}

pub async fn set(server: &RedisServer, arguments: &[String]) -> Result<CommandResult, CommandError> {
    let set_arguments = SetArguments::parse(arguments)?;

    let mut store = server.store.write().await;
    store.insert(
        set_arguments.key,
        Value::string(set_arguments.value, set_arguments.expiration),
    );

    Ok(CommandResult::Response(
        RespValue::SimpleString("OK".to_string()).encode(),
    ))
}
