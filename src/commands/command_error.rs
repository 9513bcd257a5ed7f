//! Command-level errors.
//!
//! The `Display` implementation of each variant is its exact wire text;
//! callers encode it as a RESP error with [`CommandError::to_resp`].

use thiserror::Error;

use crate::resp::RespValue;
use crate::stream::StreamError;

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongNumberOfArguments(&'static str),
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),
    #[error("ERR value is not an integer or out of range")]
    NotAnIntegerOrOutOfRange,
    #[error("ERR syntax error")]
    SyntaxError,
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("ERR invalid glob pattern: {0}")]
    InvalidGlobPattern(String),
    #[error("ERR Protocol error: expected an array of bulk strings")]
    InvalidCommandFrame,
    #[error("ERR MULTI calls can not be nested")]
    NestedMulti,
    #[error("ERR EXEC without MULTI")]
    ExecWithoutMulti,
    #[error("ERR DISCARD without MULTI")]
    DiscardWithoutMulti,
    #[error("ERR Unrecognized PSYNC request")]
    UnrecognizedPsyncRequest,
    #[error("ERR PSYNC is only valid against a master")]
    PsyncAgainstReplica,
    #[error(transparent)]
    Stream(#[from] StreamError),
}

impl CommandError {
    pub fn to_resp(&self) -> RespValue {
        RespValue::Error(self.to_string())
    }
}
