//! Single-character field type codes and their fixed-width codecs.
//!
//! Each code maps to exactly one byte width. Widths are never inferred from
//! data, which is what lets a reader split a payload using nothing but the
//! schema's code string. All multi-byte values are little-endian.

use std::fmt;

/// A field type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    /// `Q`: unsigned 64-bit, usually a microsecond timestamp
    U64,
    /// `I`: unsigned 32-bit
    U32,
    /// `i`: signed 32-bit
    I32,
    /// `H`: unsigned 16-bit
    U16,
    /// `h`: signed 16-bit
    I16,
    /// `B`: unsigned 8-bit
    U8,
    /// `b`: signed 8-bit
    I8,
    /// `f`: IEEE-754 single precision
    F32,
    /// `c`: signed 16-bit in hundredths
    CentiI16,
    /// `C`: unsigned 32-bit in hundredths
    CentiU32,
    /// `n`: 4 bytes of zero-padded text
    Char4,
    /// `N`: 16 bytes of zero-padded text
    Char16,
    /// `Z`: 64 bytes of zero-padded text
    Char64,
}

impl TypeCode {
    pub const ALL: [TypeCode; 13] = [
        TypeCode::U64,
        TypeCode::U32,
        TypeCode::I32,
        TypeCode::U16,
        TypeCode::I16,
        TypeCode::U8,
        TypeCode::I8,
        TypeCode::F32,
        TypeCode::CentiI16,
        TypeCode::CentiU32,
        TypeCode::Char4,
        TypeCode::Char16,
        TypeCode::Char64,
    ];

    pub const fn from_char(c: char) -> Option<TypeCode> {
        Some(match c {
            'Q' => TypeCode::U64,
            'I' => TypeCode::U32,
            'i' => TypeCode::I32,
            'H' => TypeCode::U16,
            'h' => TypeCode::I16,
            'B' => TypeCode::U8,
            'b' => TypeCode::I8,
            'f' => TypeCode::F32,
            'c' => TypeCode::CentiI16,
            'C' => TypeCode::CentiU32,
            'n' => TypeCode::Char4,
            'N' => TypeCode::Char16,
            'Z' => TypeCode::Char64,
            _ => return None,
        })
    }

    pub const fn as_char(self) -> char {
        match self {
            TypeCode::U64 => 'Q',
            TypeCode::U32 => 'I',
            TypeCode::I32 => 'i',
            TypeCode::U16 => 'H',
            TypeCode::I16 => 'h',
            TypeCode::U8 => 'B',
            TypeCode::I8 => 'b',
            TypeCode::F32 => 'f',
            TypeCode::CentiI16 => 'c',
            TypeCode::CentiU32 => 'C',
            TypeCode::Char4 => 'n',
            TypeCode::Char16 => 'N',
            TypeCode::Char64 => 'Z',
        }
    }

    /// Encoded width in bytes.
    pub const fn width(self) -> usize {
        match self {
            TypeCode::U64 => 8,
            TypeCode::U32 | TypeCode::I32 | TypeCode::F32 | TypeCode::CentiU32 => 4,
            TypeCode::Char4 => 4,
            TypeCode::U16 | TypeCode::I16 | TypeCode::CentiI16 => 2,
            TypeCode::U8 | TypeCode::I8 => 1,
            TypeCode::Char16 => 16,
            TypeCode::Char64 => 64,
        }
    }

    /// Divisor a consumer applies to get engineering units. The codec itself
    /// never scales.
    pub fn scale(self) -> Option<f64> {
        match self {
            TypeCode::CentiI16 | TypeCode::CentiU32 => Some(100.0),
            _ => None,
        }
    }

    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            TypeCode::I32 | TypeCode::I16 | TypeCode::I8 | TypeCode::F32 | TypeCode::CentiI16
        )
    }

    pub const fn is_float(self) -> bool {
        matches!(self, TypeCode::F32)
    }

    pub const fn is_text(self) -> bool {
        matches!(self, TypeCode::Char4 | TypeCode::Char16 | TypeCode::Char64)
    }

    /// Writes `value` into `out`, which must be exactly `self.width()` bytes.
    ///
    /// Returns the name of the value's kind on a type mismatch, the text
    /// length when text does not fit, and the offending byte when text is not
    /// NUL-free ASCII.
    pub(crate) fn encode(self, value: &FieldValue, out: &mut [u8]) -> Result<(), CodecFault> {
        debug_assert_eq!(out.len(), self.width());
        match (self, value) {
            (TypeCode::U64, FieldValue::U64(v)) => out.copy_from_slice(&v.to_le_bytes()),
            (TypeCode::U32 | TypeCode::CentiU32, FieldValue::U32(v)) => {
                out.copy_from_slice(&v.to_le_bytes())
            }
            (TypeCode::I32, FieldValue::I32(v)) => out.copy_from_slice(&v.to_le_bytes()),
            (TypeCode::U16, FieldValue::U16(v)) => out.copy_from_slice(&v.to_le_bytes()),
            (TypeCode::I16 | TypeCode::CentiI16, FieldValue::I16(v)) => {
                out.copy_from_slice(&v.to_le_bytes())
            }
            (TypeCode::U8, FieldValue::U8(v)) => out[0] = *v,
            (TypeCode::I8, FieldValue::I8(v)) => out[0] = *v as u8,
            (TypeCode::F32, FieldValue::F32(v)) => out.copy_from_slice(&v.to_le_bytes()),
            (TypeCode::Char4 | TypeCode::Char16 | TypeCode::Char64, FieldValue::Text(s)) => {
                let bytes = s.as_bytes();
                if let Some(&byte) = bytes.iter().find(|b| **b == 0 || !b.is_ascii()) {
                    return Err(CodecFault::InvalidText(byte));
                }
                if bytes.len() > out.len() {
                    return Err(CodecFault::TextTooLong(bytes.len()));
                }
                out[..bytes.len()].copy_from_slice(bytes);
                out[bytes.len()..].fill(0);
            }
            (_, other) => return Err(CodecFault::Mismatch(other.kind())),
        }
        Ok(())
    }

    /// Reads one value. `bytes` must be exactly `self.width()` long.
    pub(crate) fn decode(self, bytes: &[u8]) -> FieldValue {
        debug_assert_eq!(bytes.len(), self.width());
        match self {
            TypeCode::U64 => FieldValue::U64(u64::from_le_bytes(le_array(bytes))),
            TypeCode::U32 | TypeCode::CentiU32 => {
                FieldValue::U32(u32::from_le_bytes(le_array(bytes)))
            }
            TypeCode::I32 => FieldValue::I32(i32::from_le_bytes(le_array(bytes))),
            TypeCode::U16 => FieldValue::U16(u16::from_le_bytes(le_array(bytes))),
            TypeCode::I16 | TypeCode::CentiI16 => {
                FieldValue::I16(i16::from_le_bytes(le_array(bytes)))
            }
            TypeCode::U8 => FieldValue::U8(bytes[0]),
            TypeCode::I8 => FieldValue::I8(bytes[0] as i8),
            TypeCode::F32 => FieldValue::F32(f32::from_le_bytes(le_array(bytes))),
            TypeCode::Char4 | TypeCode::Char16 | TypeCode::Char64 => {
                let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                FieldValue::Text(String::from_utf8_lossy(&bytes[..end]).into_owned())
            }
        }
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.as_char())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CodecFault {
    Mismatch(&'static str),
    TextTooLong(usize),
    /// A NUL or non-ASCII byte in a text field.
    InvalidText(u8),
}

fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

/// Parses a code string into type codes, returning the first unknown char on
/// failure.
pub fn parse_codes(codes: &str) -> Result<Vec<TypeCode>, char> {
    codes
        .chars()
        .map(|c| TypeCode::from_char(c).ok_or(c))
        .collect()
}

/// Sum of the widths of a code string, usable in const context.
///
/// Returns `None` if the string contains a character outside the alphabet.
pub const fn payload_width(codes: &str) -> Option<usize> {
    let bytes = codes.as_bytes();
    let mut total = 0;
    let mut i = 0;
    while i < bytes.len() {
        match TypeCode::from_char(bytes[i] as char) {
            Some(code) => total += code.width(),
            None => return None,
        }
        i += 1;
    }
    Some(total)
}

/// Number of comma-separated labels, usable in const context.
pub const fn label_count(labels: &str) -> usize {
    let bytes = labels.as_bytes();
    if bytes.is_empty() {
        return 0;
    }
    let mut count = 1;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b',' {
            count += 1;
        }
        i += 1;
    }
    count
}

/// A decoded or to-be-encoded field value.
///
/// Scaled codes carry their raw integer: `c` holds an `I16`, `C` a `U32`.
#[derive(Debug, Clone)]
pub enum FieldValue {
    U64(u64),
    U32(u32),
    I32(i32),
    U16(u16),
    I16(i16),
    U8(u8),
    I8(i8),
    F32(f32),
    Text(String),
}

impl FieldValue {
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::U64(_) => "u64",
            FieldValue::U32(_) => "u32",
            FieldValue::I32(_) => "i32",
            FieldValue::U16(_) => "u16",
            FieldValue::I16(_) => "i16",
            FieldValue::U8(_) => "u8",
            FieldValue::I8(_) => "i8",
            FieldValue::F32(_) => "f32",
            FieldValue::Text(_) => "text",
        }
    }

    /// Numeric view without scaling; `None` for text.
    pub fn as_f64(&self) -> Option<f64> {
        Some(match *self {
            FieldValue::U64(v) => v as f64,
            FieldValue::U32(v) => v as f64,
            FieldValue::I32(v) => v as f64,
            FieldValue::U16(v) => v as f64,
            FieldValue::I16(v) => v as f64,
            FieldValue::U8(v) => v as f64,
            FieldValue::I8(v) => v as f64,
            FieldValue::F32(v) => v as f64,
            FieldValue::Text(_) => return None,
        })
    }

    /// Engineering value for a field of type `code`.
    pub fn scaled(&self, code: TypeCode) -> Option<f64> {
        let raw = self.as_f64()?;
        Some(match code.scale() {
            Some(div) => raw / div,
            None => raw,
        })
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

// Floats compare by bit pattern so a NaN survives a round-trip comparison.
impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        use FieldValue::*;
        match (self, other) {
            (U64(a), U64(b)) => a == b,
            (U32(a), U32(b)) => a == b,
            (I32(a), I32(b)) => a == b,
            (U16(a), U16(b)) => a == b,
            (I16(a), I16(b)) => a == b,
            (U8(a), U8(b)) => a == b,
            (I8(a), I8(b)) => a == b,
            (F32(a), F32(b)) => a.to_bits() == b.to_bits(),
            (Text(a), Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FieldValue {}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::U64(v) => write!(f, "{}", v),
            FieldValue::U32(v) => write!(f, "{}", v),
            FieldValue::I32(v) => write!(f, "{}", v),
            FieldValue::U16(v) => write!(f, "{}", v),
            FieldValue::I16(v) => write!(f, "{}", v),
            FieldValue::U8(v) => write!(f, "{}", v),
            FieldValue::I8(v) => write!(f, "{}", v),
            FieldValue::F32(v) => write!(f, "{}", v),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_roundtrip() {
        for code in TypeCode::ALL {
            assert_eq!(TypeCode::from_char(code.as_char()), Some(code));
        }
        assert_eq!(TypeCode::from_char('x'), None);
    }

    #[test]
    fn test_widths() {
        assert_eq!(payload_width("QIiHhBbfcC"), Some(8 + 4 + 4 + 2 + 2 + 1 + 1 + 4 + 2 + 4));
        assert_eq!(payload_width("BBnNZ"), Some(86));
        assert_eq!(payload_width(""), Some(0));
        assert_eq!(payload_width("Qx"), None);
    }

    #[test]
    fn test_label_count() {
        assert_eq!(label_count("TimeUS,Roll,Pitch"), 3);
        assert_eq!(label_count("TimeUS"), 1);
        assert_eq!(label_count(""), 0);
    }

    #[test]
    fn test_signed_little_endian() {
        let mut buf = [0u8; 2];
        TypeCode::CentiI16
            .encode(&FieldValue::I16(-2), &mut buf)
            .unwrap();
        assert_eq!(buf, [0xFE, 0xFF]);
        assert_eq!(TypeCode::CentiI16.decode(&buf), FieldValue::I16(-2));
    }

    #[test]
    fn test_mismatch_reports_kind() {
        let mut buf = [0u8; 4];
        let err = TypeCode::U32.encode(&FieldValue::F32(1.0), &mut buf);
        assert_eq!(err, Err(CodecFault::Mismatch("f32")));
    }

    #[test]
    fn test_text_padding() {
        let mut buf = [0xAAu8; 4];
        TypeCode::Char4
            .encode(&FieldValue::Text("PM".into()), &mut buf)
            .unwrap();
        assert_eq!(buf, *b"PM\0\0");
        assert_eq!(TypeCode::Char4.decode(&buf), FieldValue::Text("PM".into()));

        let err = TypeCode::Char4.encode(&FieldValue::Text("TOOLONG".into()), &mut buf);
        assert_eq!(err, Err(CodecFault::TextTooLong(7)));
    }

    #[test]
    fn test_text_must_be_plain_ascii() {
        let mut buf = [0u8; 4];
        let err = TypeCode::Char4.encode(&FieldValue::Text("AB\0".into()), &mut buf);
        assert_eq!(err, Err(CodecFault::InvalidText(0)));

        let err = TypeCode::Char16.encode(&FieldValue::Text("é".into()), &mut [0u8; 16]);
        assert_eq!(err, Err(CodecFault::InvalidText(0xC3)));
    }

    #[test]
    fn test_attribute_table() {
        use TypeCode::*;
        // (code, signed, float, text)
        let expected = [
            (U64, false, false, false),
            (U32, false, false, false),
            (I32, true, false, false),
            (U16, false, false, false),
            (I16, true, false, false),
            (U8, false, false, false),
            (I8, true, false, false),
            (F32, true, true, false),
            (CentiI16, true, false, false),
            (CentiU32, false, false, false),
            (Char4, false, false, true),
            (Char16, false, false, true),
            (Char64, false, false, true),
        ];
        assert_eq!(expected.len(), TypeCode::ALL.len());
        for (code, signed, float, text) in expected {
            assert_eq!(code.is_signed(), signed, "{code}");
            assert_eq!(code.is_float(), float, "{code}");
            assert_eq!(code.is_text(), text, "{code}");
        }
    }

    #[test]
    fn test_nan_bits_preserved() {
        let nan = f32::from_bits(0x7fc0_1234);
        let mut buf = [0u8; 4];
        TypeCode::F32.encode(&FieldValue::F32(nan), &mut buf).unwrap();
        assert_eq!(TypeCode::F32.decode(&buf), FieldValue::F32(nan));
    }

    #[test]
    fn test_scaling() {
        assert_eq!(FieldValue::I16(-1234).scaled(TypeCode::CentiI16), Some(-12.34));
        assert_eq!(FieldValue::I16(-1234).scaled(TypeCode::I16), Some(-1234.0));
        assert_eq!(FieldValue::Text("x".into()).scaled(TypeCode::Char4), None);
    }
}
