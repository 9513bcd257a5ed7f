//! RESP rendering of stream entries.

use crate::resp::RespValue;
use crate::stream::{EntryFields, StreamId};

/// Renders entries as `[[id, [field, value, …]], …]`.
pub fn entries_to_resp(entries: &[(StreamId, &EntryFields)]) -> RespValue {
    RespValue::Array(
        entries
            .iter()
            .map(|(id, fields)| entry_to_resp(*id, fields))
            .collect(),
    )
}

fn entry_to_resp(id: StreamId, fields: &EntryFields) -> RespValue {
    let mut flat_fields = Vec::with_capacity(fields.len() * 2);

    for (field, value) in fields {
        flat_fields.push(RespValue::BulkString(field.clone()));
        flat_fields.push(RespValue::BulkString(value.clone()));
    }

    RespValue::Array(vec![
        RespValue::BulkString(id.to_string()),
        RespValue::Array(flat_fields),
    ])
}
