//! Replay engine for decoding record streams.
//!
//! The reader walks a byte slice looking for header sync bytes, resolves the
//! message id against a [`Catalogue`] and splits the payload by type codes.
//! It keeps no state between records beyond the byte offset, so decoding can
//! be restarted anywhere and a log that is still being appended to can be
//! read at any moment.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use crate::catalogue::Catalogue;
use crate::config::{HEADER_SIZE, HEAD_BYTE1, HEAD_BYTE2};
use crate::schema::SchemaEntry;
use crate::type_code::{FieldValue, TypeCode};

/// Offset of the next complete sync pair at or after `from`.
pub(crate) fn find_header(data: &[u8], from: usize) -> Option<usize> {
    if from >= data.len() {
        return None;
    }
    data[from..]
        .windows(2)
        .position(|w| w[0] == HEAD_BYTE1 && w[1] == HEAD_BYTE2)
        .map(|i| from + i)
}

/// A decoded record, borrowing its schema and raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<'a> {
    schema: &'a SchemaEntry,
    offset: usize,
    payload: &'a [u8],
    values: Vec<FieldValue>,
}

impl<'a> Record<'a> {
    pub fn message_id(&self) -> u8 {
        self.schema.message_id()
    }

    pub fn name(&self) -> &'a str {
        self.schema.name()
    }

    pub fn schema(&self) -> &'a SchemaEntry {
        self.schema
    }

    /// Byte offset of the record's header in the stream.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Payload bytes, header excluded.
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<FieldValue> {
        self.values
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.schema.field_index(field).map(|i| &self.values[i])
    }

    /// Field value in engineering units (scaled codes divided by 100).
    pub fn scaled(&self, field: &str) -> Option<f64> {
        let i = self.schema.field_index(field)?;
        self.values[i].scaled(self.schema.type_codes()[i])
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'a str, TypeCode, &FieldValue)> + '_ {
        self.schema
            .field_names()
            .iter()
            .zip(self.schema.type_codes())
            .zip(&self.values)
            .map(|((name, code), value)| (name.as_str(), *code, value))
    }
}

impl fmt::Display for Record<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.name())?;
        for (i, (name, code, value)) in self.fields().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            match code.scale().and_then(|_| value.scaled(code)) {
                Some(scaled) => write!(f, " {}: {:.2}", name, scaled)?,
                None => write!(f, " {}: {}", name, value)?,
            }
        }
        f.write_str(" }")
    }
}

/// One step of replay.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayEvent<'a> {
    Decoded(Record<'a>),
    /// A header whose id the catalogue does not know. `raw` runs from the
    /// end of the header to the next sync pair or the end of the data.
    UnknownMessage {
        id: u8,
        offset: usize,
        raw: &'a [u8],
    },
    /// The data ends inside a record (or a header). Terminal.
    TruncatedRecord {
        offset: usize,
        needed: usize,
        available: usize,
    },
    /// Clean end of data. Terminal.
    EndOfStream,
}

impl ReplayEvent<'_> {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReplayEvent::TruncatedRecord { .. } | ReplayEvent::EndOfStream
        )
    }
}

/// Lazy iterator of [`ReplayEvent`]s over a byte slice.
///
/// Yields exactly one terminal event, then `None`.
#[derive(Debug, Clone)]
pub struct Replay<'a> {
    catalogue: &'a Catalogue,
    data: &'a [u8],
    pos: usize,
    finished: bool,
}

impl<'a> Replay<'a> {
    pub fn new(catalogue: &'a Catalogue, data: &'a [u8]) -> Self {
        Self::resume_at(catalogue, data, 0)
    }

    /// Starts decoding at `offset`, e.g. where an earlier pass stopped.
    pub fn resume_at(catalogue: &'a Catalogue, data: &'a [u8], offset: usize) -> Self {
        Self {
            catalogue,
            data,
            pos: offset.min(data.len()),
            finished: false,
        }
    }

    /// Offset the next event will be searched from.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn finish(&mut self, event: ReplayEvent<'a>) -> Option<ReplayEvent<'a>> {
        self.finished = true;
        Some(event)
    }

    /// Handles the tail when no complete sync pair is left.
    fn end_of_data(&mut self) -> Option<ReplayEvent<'a>> {
        let len = self.data.len();
        if len > self.pos && self.data[len - 1] == HEAD_BYTE1 {
            let offset = len - 1;
            warn!(offset, "log ends inside a record header");
            self.pos = len;
            return self.finish(ReplayEvent::TruncatedRecord {
                offset,
                needed: HEADER_SIZE,
                available: 1,
            });
        }
        if len > self.pos {
            debug!(skipped = len - self.pos, "trailing bytes without a header");
        }
        self.pos = len;
        self.finish(ReplayEvent::EndOfStream)
    }
}

impl<'a> Iterator for Replay<'a> {
    type Item = ReplayEvent<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let data = self.data;
        let Some(start) = find_header(data, self.pos) else {
            return self.end_of_data();
        };
        if start > self.pos {
            debug!(from = self.pos, skipped = start - self.pos, "resynchronized on header");
        }

        let available = data.len() - start;
        if available < HEADER_SIZE {
            warn!(offset = start, "log ends inside a record header");
            self.pos = data.len();
            return self.finish(ReplayEvent::TruncatedRecord {
                offset: start,
                needed: HEADER_SIZE,
                available,
            });
        }

        let id = data[start + 2];
        let Some(schema) = self.catalogue.lookup(id) else {
            let body = start + HEADER_SIZE;
            let raw_end = find_header(data, body).unwrap_or(data.len());
            debug!(id, offset = start, "unknown message id");
            // The id carries no trustworthy length: step one byte and rescan.
            self.pos = start + 1;
            return Some(ReplayEvent::UnknownMessage {
                id,
                offset: start,
                raw: &data[body..raw_end],
            });
        };

        let needed = usize::from(schema.byte_length());
        if available < needed {
            warn!(
                offset = start,
                msg = schema.name(),
                needed,
                available,
                "log ends inside a record"
            );
            self.pos = data.len();
            return self.finish(ReplayEvent::TruncatedRecord {
                offset: start,
                needed,
                available,
            });
        }

        let payload = &data[start + HEADER_SIZE..start + needed];
        let mut values = Vec::with_capacity(schema.field_count());
        let mut at = 0;
        for code in schema.type_codes() {
            values.push(code.decode(&payload[at..at + code.width()]));
            at += code.width();
        }

        self.pos = start + needed;
        Some(ReplayEvent::Decoded(Record {
            schema,
            offset: start,
            payload,
            values,
        }))
    }
}

/// Consumer of replayed records.
pub trait RecordSink {
    fn record(&mut self, record: &Record<'_>);

    /// Called for each header whose id is not in the catalogue.
    fn unknown(&mut self, _id: u8, _offset: usize, _raw: &[u8]) {}
}

type RecordHandler<'h> = Box<dyn FnMut(&Record<'_>) + 'h>;
type UnknownHandler<'h> = Box<dyn FnMut(u8, usize, &[u8]) + 'h>;

/// Routes records to per-message-id handlers.
///
/// Records with no registered handler go to the fallback, if any; headers
/// with ids missing from the catalogue go to the unknown handler.
#[derive(Default)]
pub struct Dispatcher<'h> {
    handlers: HashMap<u8, RecordHandler<'h>>,
    fallback: Option<RecordHandler<'h>>,
    unknown: Option<UnknownHandler<'h>>,
}

impl<'h> Dispatcher<'h> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(mut self, message_id: u8, handler: F) -> Self
    where
        F: FnMut(&Record<'_>) + 'h,
    {
        self.handlers.insert(message_id, Box::new(handler));
        self
    }

    pub fn otherwise<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&Record<'_>) + 'h,
    {
        self.fallback = Some(Box::new(handler));
        self
    }

    pub fn on_unknown<F>(mut self, handler: F) -> Self
    where
        F: FnMut(u8, usize, &[u8]) + 'h,
    {
        self.unknown = Some(Box::new(handler));
        self
    }
}

impl RecordSink for Dispatcher<'_> {
    fn record(&mut self, record: &Record<'_>) {
        if let Some(handler) = self.handlers.get_mut(&record.message_id()) {
            handler(record);
        } else if let Some(fallback) = self.fallback.as_mut() {
            fallback(record);
        }
    }

    fn unknown(&mut self, id: u8, offset: usize, raw: &[u8]) {
        if let Some(handler) = self.unknown.as_mut() {
            handler(id, offset, raw);
        }
    }
}

/// How a replay stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    EndOfStream,
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub records: usize,
    pub unknown: usize,
    /// Bytes covered by whole records and skipped data; a truncated tail is
    /// not counted.
    pub consumed: usize,
    pub termination: Termination,
}

/// Replays `data` to completion, feeding `sink`.
pub fn replay_into<S>(catalogue: &Catalogue, data: &[u8], sink: &mut S) -> ReplaySummary
where
    S: RecordSink + ?Sized,
{
    let mut records = 0;
    let mut unknown = 0;
    let mut termination = Termination::EndOfStream;
    let mut consumed = data.len();

    for event in Replay::new(catalogue, data) {
        let terminal = event.is_terminal();
        match event {
            ReplayEvent::Decoded(record) => {
                records += 1;
                sink.record(&record);
            }
            ReplayEvent::UnknownMessage { id, offset, raw } => {
                unknown += 1;
                sink.unknown(id, offset, raw);
            }
            ReplayEvent::TruncatedRecord {
                offset,
                needed,
                available,
            } => {
                consumed = offset;
                termination = Termination::Truncated {
                    offset,
                    needed,
                    available,
                };
            }
            ReplayEvent::EndOfStream => {}
        }
        if terminal {
            break;
        }
    }

    ReplaySummary {
        records,
        unknown,
        consumed,
        termination,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode;

    fn catalogue() -> Catalogue {
        Catalogue::build([SchemaEntry::new(1, 17, "ATT", "Qcf", "TimeUS,Roll,Pitch").unwrap()])
            .unwrap()
    }

    fn att(time: u64) -> Vec<u8> {
        encode(
            &catalogue(),
            1,
            &[FieldValue::U64(time), FieldValue::I16(-150), FieldValue::F32(0.5)],
        )
        .unwrap()
    }

    #[test]
    fn test_find_header() {
        assert_eq!(find_header(&[0, HEAD_BYTE1, HEAD_BYTE2, 1], 0), Some(1));
        assert_eq!(find_header(&[HEAD_BYTE1, HEAD_BYTE2], 1), None);
        assert_eq!(find_header(&[], 0), None);
    }

    #[test]
    fn test_record_accessors() {
        let cat = catalogue();
        let data = att(7);
        let mut replay = Replay::new(&cat, &data);
        let Some(ReplayEvent::Decoded(record)) = replay.next() else {
            panic!("expected a record");
        };
        assert_eq!(record.name(), "ATT");
        assert_eq!(record.get("TimeUS"), Some(&FieldValue::U64(7)));
        assert_eq!(record.scaled("Roll"), Some(-1.5));
        assert_eq!(record.payload().len(), 14);
        assert_eq!(
            record.to_string(),
            "ATT { TimeUS: 7, Roll: -1.50, Pitch: 0.5 }"
        );
        assert_eq!(replay.next(), Some(ReplayEvent::EndOfStream));
        assert_eq!(replay.next(), None);
    }

    #[test]
    fn test_lone_sync_byte_at_end_is_truncation() {
        let cat = catalogue();
        let mut data = att(1);
        data.push(HEAD_BYTE1);
        let events: Vec<_> = Replay::new(&cat, &data).collect();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1],
            ReplayEvent::TruncatedRecord {
                offset: 17,
                needed: HEADER_SIZE,
                available: 1
            }
        );
    }

    #[test]
    fn test_garbage_is_skipped() {
        let cat = catalogue();
        let mut data = vec![0x00, 0x42, HEAD_BYTE2];
        data.extend(att(2));
        data.extend([0x11, 0x22]);
        let events: Vec<_> = Replay::new(&cat, &data).collect();
        assert!(matches!(&events[0], ReplayEvent::Decoded(r) if r.offset() == 3));
        assert_eq!(events[1], ReplayEvent::EndOfStream);
    }

    #[test]
    fn test_dispatcher_routes_by_id() {
        let cat = catalogue();
        let mut data = att(1);
        data.extend([HEAD_BYTE1, HEAD_BYTE2, 77, 0, 0]);
        data.extend(att(2));

        let mut times = Vec::new();
        let mut unknown = Vec::new();
        let summary = {
            let mut dispatcher = Dispatcher::new()
                .on(1, |r| times.push(r.get("TimeUS").cloned()))
                .on_unknown(|id, offset, _| unknown.push((id, offset)));
            replay_into(&cat, &data, &mut dispatcher)
        };

        assert_eq!(
            times,
            vec![Some(FieldValue::U64(1)), Some(FieldValue::U64(2))]
        );
        assert_eq!(unknown, vec![(77, 17)]);
        assert_eq!(summary.records, 2);
        assert_eq!(summary.unknown, 1);
        assert_eq!(summary.termination, Termination::EndOfStream);
        assert_eq!(summary.consumed, data.len());
    }
}
