//! The keyspace: a map of key to typed value with optional expiration.
//!
//! Expirations are absolute wall-clock timestamps. There is no background
//! sweeper; readers treat an expired entry as missing and the command
//! handlers remove it lazily on access.

use std::collections::HashMap;

use jiff::Timestamp;

use crate::stream::Stream;

#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    String(String),
    Stream(Stream),
}

impl DataType {
    /// The type name reported by the TYPE command.
    pub fn type_name(&self) -> &'static str {
        match self {
            DataType::String(_) => "string",
            DataType::Stream(_) => "stream",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub data: DataType,
    pub expiration: Option<Timestamp>,
}

impl Value {
    pub fn string(data: String, expiration: Option<Timestamp>) -> Self {
        Self {
            data: DataType::String(data),
            expiration,
        }
    }

    pub fn stream(stream: Stream) -> Self {
        Self {
            data: DataType::Stream(stream),
            expiration: None,
        }
    }

    /// Whether the entry's TTL has passed. Entries without an expiration
    /// never expire.
    pub fn is_expired(&self) -> bool {
        self.expiration
            .is_some_and(|expiration| expiration <= Timestamp::now())
    }
}

pub type KeyValueStore = HashMap<String, Value>;

#[cfg(test)]
mod tests {
    use jiff::{SignedDuration, Timestamp};

    use super::{DataType, Value};
    use crate::stream::Stream;

    #[test]
    fn test_is_expired() {
        let never = Value::string("v".to_string(), None);
        assert_eq!(never.is_expired(), false);

        let future = Value::string(
            "v".to_string(),
            Some(Timestamp::now() + SignedDuration::from_secs(60)),
        );
        assert_eq!(future.is_expired(), false);

        let past = Value::string(
            "v".to_string(),
            Some(Timestamp::now() - SignedDuration::from_millis(1)),
        );
        assert_eq!(past.is_expired(), true);
    }

    #[test]
    fn test_type_name() {
        assert_eq!(DataType::String("v".to_string()).type_name(), "string");
        assert_eq!(DataType::Stream(Stream::new()).type_name(), "stream");
    }
}
