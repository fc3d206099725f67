//! Declarative description of one message type.

use std::fmt;

use crate::config::{HEADER_SIZE, MAX_CODES_LEN, MAX_LABELS_LEN, MAX_NAME_LEN, MAX_RECORD_LEN};
use crate::error::SchemaError;
use crate::type_code::{parse_codes, TypeCode};

/// Binds a message id to its record length, field type codes and field names.
///
/// An entry is only a description; the cross-field invariants (length equals
/// header plus field widths, one name per code) are enforced when entries
/// are assembled into a [`Catalogue`](crate::Catalogue).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEntry {
    message_id: u8,
    byte_length: u16,
    name: String,
    type_codes: Vec<TypeCode>,
    field_names: Vec<String>,
}

impl SchemaEntry {
    /// Parses the code and label strings of a catalogue row.
    ///
    /// `labels` is comma separated. Fails only on a character outside the
    /// type-code alphabet.
    pub fn new(
        message_id: u8,
        byte_length: u16,
        name: &str,
        codes: &str,
        labels: &str,
    ) -> Result<Self, SchemaError> {
        let type_codes = parse_codes(codes).map_err(|code| SchemaError::UnknownTypeCode {
            name: name.to_string(),
            code,
        })?;
        let field_names = if labels.is_empty() {
            Vec::new()
        } else {
            labels.split(',').map(|s| s.trim().to_string()).collect()
        };

        Ok(Self {
            message_id,
            byte_length,
            name: name.to_string(),
            type_codes,
            field_names,
        })
    }

    pub(crate) fn from_parts(
        message_id: u8,
        byte_length: u16,
        name: &str,
        type_codes: Vec<TypeCode>,
        field_names: Vec<String>,
    ) -> Self {
        Self {
            message_id,
            byte_length,
            name: name.to_string(),
            type_codes,
            field_names,
        }
    }

    /// Like [`SchemaEntry::new`] but derives the byte length from the codes.
    pub fn with_computed_length(
        message_id: u8,
        name: &str,
        codes: &str,
        labels: &str,
    ) -> Result<Self, SchemaError> {
        let mut entry = Self::new(message_id, 0, name, codes, labels)?;
        entry.byte_length = u16::try_from(entry.computed_length()).unwrap_or(u16::MAX);
        Ok(entry)
    }

    pub fn message_id(&self) -> u8 {
        self.message_id
    }

    /// Declared length of a whole record, header included.
    pub fn byte_length(&self) -> u16 {
        self.byte_length
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_codes(&self) -> &[TypeCode] {
        &self.type_codes
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    pub fn field_count(&self) -> usize {
        self.type_codes.len()
    }

    /// Header size plus the sum of the field widths.
    pub fn computed_length(&self) -> usize {
        HEADER_SIZE + self.payload_length()
    }

    pub fn payload_length(&self) -> usize {
        self.type_codes.iter().map(|c| c.width()).sum()
    }

    /// Position of a field by name.
    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.field_names.iter().position(|n| n == field)
    }

    /// The type-code string, e.g. `"Qff"`.
    pub fn codes_string(&self) -> String {
        self.type_codes.iter().map(|c| c.as_char()).collect()
    }

    /// The comma-separated field names, e.g. `"TimeUS,Roll,Pitch"`.
    pub fn labels_string(&self) -> String {
        self.field_names.join(",")
    }

    /// Runs every per-entry check a catalogue requires.
    pub(crate) fn validate(&self) -> Result<(), SchemaError> {
        if self.type_codes.len() != self.field_names.len() {
            return Err(SchemaError::FieldCountMismatch {
                id: self.message_id,
                name: self.name.clone(),
                codes: self.type_codes.len(),
                names: self.field_names.len(),
            });
        }

        let computed = self.computed_length();
        if usize::from(self.byte_length) != computed {
            return Err(SchemaError::SizeMismatch {
                id: self.message_id,
                name: self.name.clone(),
                declared: self.byte_length,
                computed,
            });
        }

        for (index, field) in self.field_names.iter().enumerate() {
            if field.is_empty() {
                return Err(SchemaError::EmptyFieldName {
                    name: self.name.clone(),
                    index,
                });
            }
            if self.field_names[..index].contains(field) {
                return Err(SchemaError::DuplicateFieldName {
                    name: self.name.clone(),
                    field: field.clone(),
                });
            }
        }

        let limits = [
            ("name", self.name.len(), MAX_NAME_LEN),
            ("type-code string", self.type_codes.len(), MAX_CODES_LEN),
            ("label string", self.labels_string().len(), MAX_LABELS_LEN),
            ("record", usize::from(self.byte_length), MAX_RECORD_LEN),
        ];
        for (what, len, max) in limits {
            if len > max {
                return Err(SchemaError::FormatFieldTooLong {
                    name: self.name.clone(),
                    what,
                    len,
                    max,
                });
            }
        }

        Ok(())
    }
}

impl fmt::Display for SchemaEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<4} id={:<3} len={:<3} {:<16} {}",
            self.name,
            self.message_id,
            self.byte_length,
            self.codes_string(),
            self.labels_string()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_entry_length() {
        let entry = SchemaEntry::new(1, 19, "ATT", "Qff", "TimeUS,Roll,Pitch").unwrap();
        assert_eq!(entry.computed_length(), 19);
        assert!(entry.validate().is_ok());
        assert_eq!(entry.field_index("Pitch"), Some(2));
    }

    #[test]
    fn test_unknown_code() {
        let err = SchemaEntry::new(1, 19, "ATT", "Qfx", "TimeUS,Roll,Pitch").unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownTypeCode {
                name: "ATT".into(),
                code: 'x'
            }
        );
    }

    #[test]
    fn test_size_mismatch() {
        let entry = SchemaEntry::new(1, 20, "ATT", "Qff", "TimeUS,Roll,Pitch").unwrap();
        assert!(matches!(
            entry.validate(),
            Err(SchemaError::SizeMismatch {
                declared: 20,
                computed: 19,
                ..
            })
        ));
    }

    #[test]
    fn test_field_names_checked() {
        let entry = SchemaEntry::with_computed_length(1, "ATT", "Qff", "TimeUS,Roll,Roll").unwrap();
        assert!(matches!(
            entry.validate(),
            Err(SchemaError::DuplicateFieldName { .. })
        ));

        let entry = SchemaEntry::with_computed_length(1, "ATT", "Qff", "TimeUS,,Pitch").unwrap();
        assert!(matches!(
            entry.validate(),
            Err(SchemaError::EmptyFieldName { index: 1, .. })
        ));
    }

    #[test]
    fn test_long_name_rejected() {
        let entry = SchemaEntry::with_computed_length(1, "ATTITUDE", "Q", "TimeUS").unwrap();
        assert!(matches!(
            entry.validate(),
            Err(SchemaError::FormatFieldTooLong { what: "name", .. })
        ));
    }

    #[test]
    fn test_record_over_255_bytes_rejected() {
        let entry = SchemaEntry::with_computed_length(1, "BIG", "ZZZZ", "A,B,C,D").unwrap();
        assert_eq!(entry.byte_length(), 259);
        assert!(matches!(
            entry.validate(),
            Err(SchemaError::FormatFieldTooLong {
                what: "record",
                len: 259,
                max: 255,
                ..
            })
        ));
    }

    #[test]
    fn test_strings_roundtrip() {
        let entry = SchemaEntry::with_computed_length(7, "NTUN", "QCfcc", "TimeUS,Yaw,WpDist,A,B")
            .unwrap();
        assert_eq!(entry.codes_string(), "QCfcc");
        assert_eq!(entry.labels_string(), "TimeUS,Yaw,WpDist,A,B");
        assert_eq!(usize::from(entry.byte_length()), 3 + 8 + 4 + 4 + 2 + 2);
    }
}
