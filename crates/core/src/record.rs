use thiserror::Error;

use crate::id::EntityId;
use crate::value::TypedValue;

pub use crate::value::Comparable;

/// Errors raised while traversing a dotted field path on a [`Record`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldAccessError {
    #[error("no such field on path: {0}")]
    InvalidField(String),

    #[error("cannot compare {left} with {right}")]
    TypeMismatch {
        left: &'static str,
        right: &'static str,
    },
}

/// Static capability every registered model type must implement.
///
/// This is the statically-typed replacement for the original's runtime
/// reflection: instead of inspecting a Go struct tag at runtime to find the
/// `ID` field, or walking `reflect.Value` to resolve a dotted query path,
/// every record type here implements `id`/`set_id`/`get_field` directly (in
/// practice, generated by `#[derive(Record)]` from `objectstore-macros`).
pub trait Record {
    /// Stable type tag used as the event's `entityType` / schema `ref`.
    fn entity_type() -> &'static str
    where
        Self: Sized;

    fn id(&self) -> &EntityId;

    fn set_id(&mut self, id: EntityId);

    /// Resolve a dotted field path (`"address.city"`) to a [`TypedValue`] for
    /// the query engine. Implementations should transparently deref
    /// `Option`/`Box` fields along the path, per the spec's traversal rule.
    fn get_field(&self, path: &str) -> Result<TypedValue, FieldAccessError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Person {
        id: EntityId,
        name: String,
        age: i32,
    }

    impl Record for Person {
        fn entity_type() -> &'static str {
            "test.person"
        }

        fn id(&self) -> &EntityId {
            &self.id
        }

        fn set_id(&mut self, id: EntityId) {
            self.id = id;
        }

        fn get_field(&self, path: &str) -> Result<TypedValue, FieldAccessError> {
            match path {
                "name" => Ok(TypedValue::Str(self.name.clone())),
                "age" => Ok(TypedValue::I32(self.age)),
                other => Err(FieldAccessError::InvalidField(other.to_string())),
            }
        }
    }

    #[test]
    fn resolves_known_fields() {
        let p = Person {
            id: EntityId::new(),
            name: "Alice".into(),
            age: 30,
        };
        assert!(matches!(p.get_field("name"), Ok(TypedValue::Str(s)) if s == "Alice"));
        assert!(p.get_field("unknown").is_err());
    }
}
