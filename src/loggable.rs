use crate::type_code::FieldValue;

/// Conversion between Rust primitives and [`FieldValue`]s.
///
/// Typed message structs are built from these, so a struct field's Rust type
/// decides which value variant it produces. Scaled codes use the same
/// integer types as their unscaled counterparts (`c` is `i16`, `C` is `u32`).
pub trait LogField: Sized {
    fn into_value(self) -> FieldValue;

    /// Returns `None` when the value is of a different kind.
    fn from_value(value: &FieldValue) -> Option<Self>;
}

macro_rules! impl_log_field {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl LogField for $ty {
                #[inline]
                fn into_value(self) -> FieldValue {
                    FieldValue::$variant(self)
                }

                #[inline]
                fn from_value(value: &FieldValue) -> Option<Self> {
                    match value {
                        FieldValue::$variant(v) => Some(*v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_log_field! {
    u64 => U64,
    u32 => U32,
    i32 => I32,
    u16 => U16,
    i16 => I16,
    u8 => U8,
    i8 => I8,
    f32 => F32,
}

impl LogField for String {
    fn into_value(self) -> FieldValue {
        FieldValue::Text(self)
    }

    fn from_value(value: &FieldValue) -> Option<Self> {
        value.as_text().map(str::to_string)
    }
}
