//! Typed record shapes.
//!
//! A [`Message`] is a plain Rust struct bound to one catalogue row. The
//! [`log_message!`](crate::log_message) macro generates the struct, its
//! [`Message`] impl and a compile-time check that the declared length
//! matches the type codes.

use crate::catalogue::Catalogue;
use crate::category::Category;
use crate::decoder::Record;
use crate::error::{EncodeError, SchemaError};
use crate::schema::SchemaEntry;
use crate::type_code::FieldValue;

pub trait Message: Sized {
    const ID: u8;
    const NAME: &'static str;
    const CODES: &'static str;
    const LABELS: &'static str;
    /// Record length, header included.
    const LENGTH: u16;
    /// Gate for optional records; `None` means the record is always written.
    const CATEGORY: Option<Category>;

    fn schema() -> Result<SchemaEntry, SchemaError> {
        SchemaEntry::new(Self::ID, Self::LENGTH, Self::NAME, Self::CODES, Self::LABELS)
    }

    fn to_values(&self) -> Vec<FieldValue>;

    /// Encodes without allocating (text fields aside).
    fn encode_into(&self, catalogue: &Catalogue, out: &mut [u8]) -> Result<usize, EncodeError>;

    /// Rebuilds the struct from a decoded record. `None` if the record is a
    /// different message or its fields have other kinds.
    fn from_record(record: &Record<'_>) -> Option<Self>;
}

/// Declares a typed message.
///
/// ```
/// use flight_log::{log_message, Message};
///
/// log_message! {
///     /// Attitude sample.
///     Attitude {
///         id: 1,
///         name: "ATT",
///         codes: "Qff",
///         labels: "TimeUS,Roll,Pitch",
///         length: 19,
///         category: None,
///         fields { time_us: u64, roll: f32, pitch: f32 }
///     }
/// }
///
/// assert_eq!(Attitude::LENGTH, 19);
/// ```
#[macro_export]
macro_rules! log_message {
    (
        $(#[$meta:meta])*
        $ty:ident {
            id: $id:expr,
            name: $name:literal,
            codes: $codes:literal,
            labels: $labels:literal,
            length: $len:expr,
            category: $category:expr,
            fields { $( $field:ident : $fty:ty ),* $(,)? }
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $ty {
            $( pub $field: $fty, )*
        }

        const _: () = {
            assert!(
                match $crate::type_code::payload_width($codes) {
                    Some(width) => width + $crate::config::HEADER_SIZE == $len as usize,
                    None => false,
                },
                concat!($name, ": length does not match type codes")
            );
            assert!(
                $codes.len() == $crate::type_code::label_count($labels),
                concat!($name, ": one label per type code")
            );
            assert!(
                $codes.len() == [$( stringify!($field) ),*].len(),
                concat!($name, ": one struct field per type code")
            );
        };

        impl $crate::message::Message for $ty {
            const ID: u8 = $id;
            const NAME: &'static str = $name;
            const CODES: &'static str = $codes;
            const LABELS: &'static str = $labels;
            const LENGTH: u16 = $len;
            const CATEGORY: Option<$crate::category::Category> = $category;

            fn to_values(&self) -> Vec<$crate::type_code::FieldValue> {
                vec![$(
                    $crate::loggable::LogField::into_value(::std::clone::Clone::clone(&self.$field))
                ),*]
            }

            fn encode_into(
                &self,
                catalogue: &$crate::catalogue::Catalogue,
                out: &mut [u8],
            ) -> Result<usize, $crate::error::EncodeError> {
                // A different row under the same id is a different message.
                match catalogue.lookup($id) {
                    Some(entry) if entry.name() == $name => {}
                    _ => return Err($crate::error::EncodeError::UnknownMessageId($id)),
                }
                let values: &[$crate::type_code::FieldValue] = &[$(
                    $crate::loggable::LogField::into_value(::std::clone::Clone::clone(&self.$field))
                ),*];
                $crate::encoder::encode_into(catalogue, $id, values, out)
            }

            fn from_record(record: &$crate::decoder::Record<'_>) -> Option<Self> {
                if record.message_id() != $id || record.name() != $name {
                    return None;
                }
                let mut values = record.values().iter();
                let message = Self {
                    $( $field: <$fty as $crate::loggable::LogField>::from_value(values.next()?)?, )*
                };
                if values.next().is_some() {
                    return None;
                }
                Some(message)
            }
        }
    };
}
