//! Error types for catalogue construction, encoding, category control and
//! the logger front-end.

use std::io;

use crate::type_code::TypeCode;

/// Raised while building a [`Catalogue`](crate::Catalogue). Any of these is
/// fatal to startup: a single malformed entry desynchronizes every record
/// that follows it in a log.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("message id {id} is declared twice ({first} and {second})")]
    DuplicateMessageId {
        id: u8,
        first: String,
        second: String,
    },

    #[error("{name} (id {id}) declares {declared} bytes but its fields need {computed}")]
    SizeMismatch {
        id: u8,
        name: String,
        declared: u16,
        computed: usize,
    },

    #[error("{name} (id {id}) has {codes} type codes but {names} field names")]
    FieldCountMismatch {
        id: u8,
        name: String,
        codes: usize,
        names: usize,
    },

    #[error("{name}: unknown type code {code:?}")]
    UnknownTypeCode { name: String, code: char },

    #[error("{name}: {what} is {len} bytes, limit is {max}")]
    FormatFieldTooLong {
        name: String,
        what: &'static str,
        len: usize,
        max: usize,
    },

    #[error("{name}: field name {field:?} appears more than once")]
    DuplicateFieldName { name: String, field: String },

    #[error("{name}: field {index} has an empty name")]
    EmptyFieldName { name: String, index: usize },
}

/// Raised by a single encode call. These point at a producer/schema mismatch
/// rather than bad runtime data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("message id {0} is not in the catalogue")]
    UnknownMessageId(u8),

    #[error("{name} expects {expected} values, got {got}")]
    FieldArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("{name}.{field}: type code {expected} cannot hold a {got} value")]
    TypeMismatch {
        name: String,
        field: String,
        expected: TypeCode,
        got: &'static str,
    },

    #[error("{name}.{field}: text is {len} bytes, code {code} holds {max}")]
    TextTooLong {
        name: String,
        field: String,
        code: TypeCode,
        len: usize,
        max: usize,
    },

    #[error("{name}.{field}: text must be ASCII without NUL, found byte 0x{byte:02x}")]
    InvalidText {
        name: String,
        field: String,
        byte: u8,
    },

    #[error("output buffer holds {available} bytes, record needs {needed}")]
    BufferTooSmall { needed: usize, available: usize },
}

/// Raised by the enable/disable surface. The mask is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CategoryError {
    #[error("unknown log category {0:?}")]
    UnknownCategory(String),
}

/// Failure of the logger front-end: either the record could not be encoded
/// or the storage medium refused it.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("storage write failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{key}: cannot parse {value:?} as a 32-bit mask")]
    InvalidBitmask { key: &'static str, value: String },

    #[error("{key} is set but empty")]
    EmptyValue { key: &'static str },
}

pub type Result<T, E = LogError> = std::result::Result<T, E>;
