//! Append-only stream values: entry IDs, validation and scans.
//!
//! A stream is an ordered log of entries keyed by `(ms, seq)` pairs that
//! must be strictly increasing. The smallest ID a stream can ever hold is
//! `0-1`.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;

use jiff::Timestamp;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum StreamError {
    #[error("ERR The ID specified in XADD must be greater than 0-0")]
    IdBelowMinimum,
    #[error("ERR The ID specified in XADD is equal or smaller than the target stream top item")]
    IdNotGreaterThanTop,
    #[error("ERR Invalid stream ID specified as stream command argument")]
    InvalidIdFormat,
}

/// A stream entry ID, ordered lexicographically by `(ms, seq)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    pub const MIN: StreamId = StreamId { ms: 0, seq: 1 };
    pub const MAX: StreamId = StreamId {
        ms: u64::MAX,
        seq: u64::MAX,
    };

    pub fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }

    /// Parses an explicit `<ms>-<seq>` ID. A bare `<ms>` takes
    /// `default_seq` as its sequence part.
    pub fn parse(input: &str, default_seq: u64) -> Result<Self, StreamError> {
        let (ms_part, seq_part) = split_id(input)?;

        let ms = ms_part
            .parse::<u64>()
            .map_err(|_| StreamError::InvalidIdFormat)?;

        let seq = match seq_part {
            Some(part) => part
                .parse::<u64>()
                .map_err(|_| StreamError::InvalidIdFormat)?,
            None => default_seq,
        };

        Ok(Self { ms, seq })
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

/// The ID argument accepted by XADD.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum EntryIdSpec {
    /// `*` — generate both parts from the current wall clock.
    Auto,
    /// `<ms>-*` (or a bare `<ms>`) — generate the sequence part.
    AutoSeq(u64),
    /// `<ms>-<seq>` — fully explicit.
    Explicit(StreamId),
}

impl EntryIdSpec {
    pub fn parse(input: &str) -> Result<Self, StreamError> {
        if input == "*" {
            return Ok(EntryIdSpec::Auto);
        }

        let (ms_part, seq_part) = split_id(input)?;

        let ms = ms_part
            .parse::<u64>()
            .map_err(|_| StreamError::InvalidIdFormat)?;

        match seq_part {
            Some("*") | None => Ok(EntryIdSpec::AutoSeq(ms)),
            Some(part) => {
                let seq = part
                    .parse::<u64>()
                    .map_err(|_| StreamError::InvalidIdFormat)?;
                Ok(EntryIdSpec::Explicit(StreamId::new(ms, seq)))
            }
        }
    }
}

fn split_id(input: &str) -> Result<(&str, Option<&str>), StreamError> {
    let mut parts = input.split('-');

    let ms_part = parts.next().filter(|p| !p.is_empty());
    let seq_part = parts.next();

    if parts.next().is_some() || seq_part.is_some_and(|p| p.is_empty()) {
        return Err(StreamError::InvalidIdFormat);
    }

    ms_part
        .map(|ms| (ms, seq_part))
        .ok_or(StreamError::InvalidIdFormat)
}

/// An ordered set of field/value pairs. First-seen order is kept;
/// duplicated fields overwrite by last write.
pub type EntryFields = Vec<(String, String)>;

/// An append-only log of `(id, fields)` entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stream {
    entries: BTreeMap<StreamId, EntryFields>,
}

impl Stream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The greatest ID currently stored, if any.
    pub fn last_id(&self) -> Option<StreamId> {
        self.entries.keys().next_back().copied()
    }

    /// Appends an entry, resolving auto-generated ID parts and enforcing
    /// the strictly-increasing invariant. Returns the assigned ID.
    pub fn add(&mut self, id_spec: EntryIdSpec, fields: EntryFields) -> Result<StreamId, StreamError> {
        let id = match id_spec {
            EntryIdSpec::Auto => {
                let now_ms = Timestamp::now().as_millisecond() as u64;
                let seq = match self.last_id() {
                    Some(top) if top.ms == now_ms => top.seq + 1,
                    _ => 0,
                };
                StreamId::new(now_ms, seq)
            }
            EntryIdSpec::AutoSeq(ms) => StreamId::new(ms, self.next_seq_for(ms)),
            EntryIdSpec::Explicit(id) => id,
        };

        if id < StreamId::MIN {
            return Err(StreamError::IdBelowMinimum);
        }

        if self.last_id().is_some_and(|top| id <= top) {
            return Err(StreamError::IdNotGreaterThanTop);
        }

        self.entries.insert(id, dedup_fields(fields));
        Ok(id)
    }

    /// Entries with `start <= id <= end`, in ID order.
    pub fn range(&self, start: StreamId, end: StreamId) -> Vec<(StreamId, &EntryFields)> {
        if start > end {
            return Vec::new();
        }

        self.entries
            .range(start..=end)
            .map(|(id, fields)| (*id, fields))
            .collect()
    }

    /// Entries strictly greater than `after`, in ID order.
    pub fn entries_after(&self, after: StreamId) -> Vec<(StreamId, &EntryFields)> {
        self.entries
            .range((Bound::Excluded(after), Bound::Unbounded))
            .map(|(id, fields)| (*id, fields))
            .collect()
    }

    /// The sequence an auto-generated entry gets for `ms`: one past the
    /// greatest sequence already used for that millisecond, or the floor
    /// value when the millisecond is unused (1 for ms 0 so that `0-0`
    /// stays unreachable, 0 otherwise).
    fn next_seq_for(&self, ms: u64) -> u64 {
        let last_for_ms = self
            .entries
            .range(StreamId::new(ms, 0)..=StreamId::new(ms, u64::MAX))
            .next_back()
            .map(|(id, _)| id.seq);

        match last_for_ms {
            Some(seq) => seq + 1,
            None if ms == 0 => 1,
            None => 0,
        }
    }
}

fn dedup_fields(pairs: EntryFields) -> EntryFields {
    let mut fields: EntryFields = Vec::with_capacity(pairs.len());

    for (field, value) in pairs {
        match fields.iter_mut().find(|(existing, _)| *existing == field) {
            Some(slot) => slot.1 = value,
            None => fields.push((field, value)),
        }
    }

    fields
}
