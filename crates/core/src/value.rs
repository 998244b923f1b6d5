use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::id::EntityId;
use crate::record::FieldAccessError;

/// A closed sum of the concrete types the query engine knows how to compare.
///
/// This replaces the original's `interface{}` + runtime type switch: Rust has
/// no equivalent to Go's dynamic `switch t := value.(type)`, so every
/// comparable shape a [`crate::Record::get_field`] implementation can produce
/// must be representable here (or routed through [`Comparable`] for bespoke
/// types the engine doesn't know about).
#[derive(Debug, Clone)]
pub enum TypedValue {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
    DateTime(DateTime<Utc>),
    Decimal(Decimal),
    /// Escape hatch for record fields of a bespoke type. The type must supply
    /// its own comparator via [`Comparable`].
    Custom(std::sync::Arc<dyn Comparable>),
}

impl TypedValue {
    fn type_name(&self) -> &'static str {
        match self {
            TypedValue::Null => "null",
            TypedValue::Bool(_) => "bool",
            TypedValue::I8(_) => "i8",
            TypedValue::I16(_) => "i16",
            TypedValue::I32(_) => "i32",
            TypedValue::I64(_) => "i64",
            TypedValue::U8(_) => "u8",
            TypedValue::U16(_) => "u16",
            TypedValue::U32(_) => "u32",
            TypedValue::U64(_) => "u64",
            TypedValue::F32(_) => "f32",
            TypedValue::F64(_) => "f64",
            TypedValue::Str(_) => "string",
            TypedValue::DateTime(_) => "datetime",
            TypedValue::Decimal(_) => "decimal",
            TypedValue::Custom(v) => v.type_tag(),
        }
    }
}

/// Capability for record field types the engine doesn't know natively.
///
/// Mirrors the original's `Comparer` interface: a type that knows how to
/// order itself against another instance of the same (dynamic) type.
pub trait Comparable: core::fmt::Debug + Send + Sync {
    /// Stable tag identifying this comparator's dynamic type, used to reject
    /// mismatched comparisons before calling [`Self::compare_dyn`].
    fn type_tag(&self) -> &'static str;

    /// Compare against another value already known to share `type_tag()`.
    fn compare_dyn(&self, other: &dyn Comparable) -> Ordering;
}

/// Compare two typed values, mirroring `store/compare.go`'s type switch.
///
/// Returns [`FieldAccessError::TypeMismatch`] when the two values are of
/// different concrete kinds and fall back to neither a native numeric/string
/// comparison nor a shared [`Comparable`] tag.
pub fn compare(a: &TypedValue, b: &TypedValue) -> Result<Ordering, FieldAccessError> {
    use TypedValue::*;

    let mismatch = || FieldAccessError::TypeMismatch {
        left: a.type_name(),
        right: b.type_name(),
    };

    match (a, b) {
        (Null, Null) => Ok(Ordering::Equal),
        (Bool(x), Bool(y)) => Ok(x.cmp(y)),
        (I8(x), I8(y)) => Ok(x.cmp(y)),
        (I16(x), I16(y)) => Ok(x.cmp(y)),
        (I32(x), I32(y)) => Ok(x.cmp(y)),
        (I64(x), I64(y)) => Ok(x.cmp(y)),
        (U8(x), U8(y)) => Ok(x.cmp(y)),
        (U16(x), U16(y)) => Ok(x.cmp(y)),
        (U32(x), U32(y)) => Ok(x.cmp(y)),
        (U64(x), U64(y)) => Ok(x.cmp(y)),
        (F32(x), F32(y)) => x.partial_cmp(y).ok_or_else(mismatch),
        (F64(x), F64(y)) => x.partial_cmp(y).ok_or_else(mismatch),
        (Str(x), Str(y)) => Ok(x.cmp(y)),
        (DateTime(x), DateTime(y)) => Ok(x.cmp(y)),
        (Decimal(x), Decimal(y)) => Ok(x.cmp(y)),
        (Custom(x), Custom(y)) => {
            if x.type_tag() != y.type_tag() {
                return Err(mismatch());
            }
            Ok(x.compare_dyn(y.as_ref()))
        }
        // Fallback: stringify and compare lexicographically, as the original
        // does for any type it doesn't special-case.
        _ => {
            let sa = stringify(a);
            let sb = stringify(b);
            match (sa, sb) {
                (Some(sa), Some(sb)) => Ok(sa.cmp(&sb)),
                _ => Err(mismatch()),
            }
        }
    }
}

macro_rules! impl_from_for_typed_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for TypedValue {
                fn from(v: $ty) -> Self {
                    TypedValue::$variant(v)
                }
            }
        )*
    };
}

impl_from_for_typed_value! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => Str,
    DateTime<Utc> => DateTime,
    Decimal => Decimal,
}

impl From<&str> for TypedValue {
    fn from(v: &str) -> Self {
        TypedValue::Str(v.to_string())
    }
}

impl From<EntityId> for TypedValue {
    fn from(v: EntityId) -> Self {
        TypedValue::Str(v.to_string())
    }
}

impl From<&EntityId> for TypedValue {
    fn from(v: &EntityId) -> Self {
        TypedValue::Str(v.to_string())
    }
}

fn stringify(v: &TypedValue) -> Option<String> {
    use TypedValue::*;
    match v {
        Null => Some(String::new()),
        Bool(x) => Some(x.to_string()),
        I8(x) => Some(x.to_string()),
        I16(x) => Some(x.to_string()),
        I32(x) => Some(x.to_string()),
        I64(x) => Some(x.to_string()),
        U8(x) => Some(x.to_string()),
        U16(x) => Some(x.to_string()),
        U32(x) => Some(x.to_string()),
        U64(x) => Some(x.to_string()),
        F32(x) => Some(x.to_string()),
        F64(x) => Some(x.to_string()),
        Str(x) => Some(x.clone()),
        DateTime(x) => Some(x.to_rfc3339()),
        Decimal(x) => Some(x.to_string()),
        Custom(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_numeric_values() {
        assert_eq!(compare(&TypedValue::I32(5), &TypedValue::I32(5)), Ok(Ordering::Equal));
    }

    #[test]
    fn ordered_strings() {
        assert_eq!(
            compare(&TypedValue::Str("a".into()), &TypedValue::Str("b".into())),
            Ok(Ordering::Less)
        );
    }

    #[test]
    fn mismatched_types_error() {
        assert!(compare(&TypedValue::I32(1), &TypedValue::Bool(true)).is_err());
    }

    #[test]
    fn fallback_stringifies_mixed_numeric_kinds() {
        // u8 vs i64 aren't handled natively; compare falls back to string form.
        let r = compare(&TypedValue::U8(5), &TypedValue::I64(5));
        assert_eq!(r, Ok(Ordering::Equal));
    }
}
