//! The schema catalogue: every message type a log may contain.
//!
//! Built once, validated exhaustively, then shared read-only by the encoder
//! and the replay engine. A catalogue can also be recovered from a log that
//! carries its own format records.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::{FORMAT_MSG_ID, HEADER_SIZE};
use crate::decoder::find_header;
use crate::error::SchemaError;
use crate::schema::SchemaEntry;
use crate::type_code::{FieldValue, TypeCode};

pub const FORMAT_NAME: &str = "FMT";
pub const FORMAT_CODES: &str = "BBnNZ";
pub const FORMAT_LABELS: &str = "Type,Length,Name,Format,Columns";
pub const FORMAT_LENGTH: u16 = 89;

/// The entry describing format records themselves.
pub fn format_entry() -> SchemaEntry {
    SchemaEntry::from_parts(
        FORMAT_MSG_ID,
        FORMAT_LENGTH,
        FORMAT_NAME,
        vec![
            TypeCode::U8,
            TypeCode::U8,
            TypeCode::Char4,
            TypeCode::Char16,
            TypeCode::Char64,
        ],
        FORMAT_LABELS.split(',').map(str::to_string).collect(),
    )
}

/// One row of the catalogue listing: short name, code string, labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing<'a> {
    pub name: &'a str,
    pub codes: String,
    pub labels: String,
}

/// Validated, immutable set of schema entries with O(1) lookup by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalogue {
    entries: Vec<SchemaEntry>,
    index: [Option<u16>; 256],
}

impl Catalogue {
    /// Validates every entry and indexes them by id.
    ///
    /// Entries keep their given order for listing. Nothing is constructed if
    /// any entry fails.
    pub fn build<I>(entries: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = SchemaEntry>,
    {
        let entries: Vec<SchemaEntry> = entries.into_iter().collect();
        let mut index = [None; 256];

        for (pos, entry) in entries.iter().enumerate() {
            let slot = &mut index[usize::from(entry.message_id())];
            if let Some(first) = *slot {
                return Err(SchemaError::DuplicateMessageId {
                    id: entry.message_id(),
                    first: entries[usize::from(first)].name().to_string(),
                    second: entry.name().to_string(),
                });
            }
            entry.validate()?;
            // At most 256 distinct ids can get here.
            *slot = Some(pos as u16);
        }

        debug!(entries = entries.len(), "catalogue built");
        Ok(Self { entries, index })
    }

    pub fn lookup(&self, message_id: u8) -> Option<&SchemaEntry> {
        self.index[usize::from(message_id)].map(|pos| &self.entries[usize::from(pos)])
    }

    pub fn lookup_name(&self, name: &str) -> Option<&SchemaEntry> {
        self.entries.iter().find(|e| e.name() == name)
    }

    /// Entries in declaration order. Calling again starts over.
    pub fn list(&self) -> std::slice::Iter<'_, SchemaEntry> {
        self.entries.iter()
    }

    pub fn listing(&self) -> impl Iterator<Item = Listing<'_>> + '_ {
        self.entries.iter().map(|e| Listing {
            name: e.name(),
            codes: e.codes_string(),
            labels: e.labels_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn header_size(&self) -> usize {
        HEADER_SIZE
    }

    /// Largest declared record length, header included.
    pub fn max_record_len(&self) -> usize {
        self.entries
            .iter()
            .map(|e| usize::from(e.byte_length()))
            .max()
            .unwrap_or(HEADER_SIZE)
    }

    /// Field values of the format record that describes `entry`.
    pub fn format_values(entry: &SchemaEntry) -> [FieldValue; 5] {
        [
            FieldValue::U8(entry.message_id()),
            // Validation caps record lengths at one byte.
            FieldValue::U8(u8::try_from(entry.byte_length()).unwrap_or(u8::MAX)),
            FieldValue::Text(entry.name().to_string()),
            FieldValue::Text(entry.codes_string()),
            FieldValue::Text(entry.labels_string()),
        ]
    }

    /// Rebuilds a catalogue from the format records found in a log.
    ///
    /// Records whose format is already known are skipped whole; anything else
    /// is scanned past one byte at a time. Repeated identical format records
    /// are fine; two different definitions of one id are not.
    pub fn from_log(data: &[u8]) -> Result<Self, SchemaError> {
        let format = format_entry();
        let mut learned: BTreeMap<u8, SchemaEntry> = BTreeMap::new();
        let mut order: Vec<u8> = Vec::new();
        let mut pos = 0;

        while let Some(start) = find_header(data, pos) {
            if start + HEADER_SIZE > data.len() {
                break;
            }
            let id = data[start + 2];

            if id == FORMAT_MSG_ID {
                let end = start + usize::from(FORMAT_LENGTH);
                if end > data.len() {
                    break;
                }
                let entry = parse_format_record(&data[start + HEADER_SIZE..end])?;
                match learned.get(&entry.message_id()) {
                    Some(existing) if *existing == entry => {}
                    Some(existing) => {
                        return Err(SchemaError::DuplicateMessageId {
                            id: entry.message_id(),
                            first: existing.name().to_string(),
                            second: entry.name().to_string(),
                        })
                    }
                    None => {
                        order.push(entry.message_id());
                        learned.insert(entry.message_id(), entry);
                    }
                }
                pos = end;
            } else if let Some(entry) = learned.get(&id) {
                pos = start + usize::from(entry.byte_length()).max(1);
            } else {
                pos = start + 1;
            }
        }

        if !learned.contains_key(&FORMAT_MSG_ID) {
            order.insert(0, FORMAT_MSG_ID);
            learned.insert(FORMAT_MSG_ID, format);
        }

        debug!(formats = order.len(), "catalogue recovered from log");
        Catalogue::build(order.into_iter().filter_map(|id| learned.remove(&id)))
    }
}

/// Payload layout: type (1), length (1), name (4), codes (16), labels (64).
fn parse_format_record(payload: &[u8]) -> Result<SchemaEntry, SchemaError> {
    let text = |code: TypeCode, from: usize| {
        let value = code.decode(&payload[from..from + code.width()]);
        value.as_text().unwrap_or_default().to_string()
    };
    let name = text(TypeCode::Char4, 2);
    let codes = text(TypeCode::Char16, 6);
    let labels = text(TypeCode::Char64, 22);
    SchemaEntry::new(payload[0], u16::from(payload[1]), &name, &codes, &labels)
}
