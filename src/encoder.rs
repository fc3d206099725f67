//! Record encoder.
//!
//! Format: `[0xA3 | 0x95 | msg_id | field_1 | ... | field_n]`, each field at
//! its type code's width, little-endian, no padding or alignment.

use crate::catalogue::Catalogue;
use crate::config::{HEADER_SIZE, HEAD_BYTE1, HEAD_BYTE2};
use crate::error::EncodeError;
use crate::schema::SchemaEntry;
use crate::type_code::{CodecFault, FieldValue};

/// Encodes one record into `out` and returns the number of bytes written.
///
/// This path never allocates, so it is safe to call from the control loop
/// with a buffer sized to [`Catalogue::max_record_len`]. On error the
/// contents of `out` are unspecified.
pub fn encode_into(
    catalogue: &Catalogue,
    message_id: u8,
    values: &[FieldValue],
    out: &mut [u8],
) -> Result<usize, EncodeError> {
    let entry = catalogue
        .lookup(message_id)
        .ok_or(EncodeError::UnknownMessageId(message_id))?;
    encode_entry(entry, values, out)
}

/// Convenience wrapper returning a freshly allocated record.
pub fn encode(
    catalogue: &Catalogue,
    message_id: u8,
    values: &[FieldValue],
) -> Result<Vec<u8>, EncodeError> {
    let entry = catalogue
        .lookup(message_id)
        .ok_or(EncodeError::UnknownMessageId(message_id))?;
    let mut out = vec![0u8; usize::from(entry.byte_length())];
    let written = encode_entry(entry, values, &mut out)?;
    out.truncate(written);
    Ok(out)
}

pub(crate) fn encode_entry(
    entry: &SchemaEntry,
    values: &[FieldValue],
    out: &mut [u8],
) -> Result<usize, EncodeError> {
    if values.len() != entry.field_count() {
        return Err(EncodeError::FieldArityMismatch {
            name: entry.name().to_string(),
            expected: entry.field_count(),
            got: values.len(),
        });
    }

    let needed = usize::from(entry.byte_length());
    if out.len() < needed {
        return Err(EncodeError::BufferTooSmall {
            needed,
            available: out.len(),
        });
    }

    out[0] = HEAD_BYTE1;
    out[1] = HEAD_BYTE2;
    out[2] = entry.message_id();

    let mut pos = HEADER_SIZE;
    for (index, (code, value)) in entry.type_codes().iter().zip(values).enumerate() {
        let width = code.width();
        code.encode(value, &mut out[pos..pos + width])
            .map_err(|fault| field_error(entry, index, fault))?;
        pos += width;
    }

    debug_assert_eq!(pos, needed);
    Ok(pos)
}

fn field_error(entry: &SchemaEntry, index: usize, fault: CodecFault) -> EncodeError {
    let code = entry.type_codes()[index];
    let field = entry.field_names()[index].clone();
    match fault {
        CodecFault::Mismatch(got) => EncodeError::TypeMismatch {
            name: entry.name().to_string(),
            field,
            expected: code,
            got,
        },
        CodecFault::TextTooLong(len) => EncodeError::TextTooLong {
            name: entry.name().to_string(),
            field,
            code,
            len,
            max: code.width(),
        },
        CodecFault::InvalidText(byte) => EncodeError::InvalidText {
            name: entry.name().to_string(),
            field,
            byte,
        },
    }
}
