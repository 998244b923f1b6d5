use objectstore_core::Record;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// A type's schema identity: just a stable `ref` string for now. The
/// original reflects a full JSON schema document via `jsonschema.Reflect`;
/// Rust's static types already guarantee shape, so all that's left worth
/// keeping is the stable name events and the view key space are tagged with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub reference: String,
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to serialize candidate for schema validation: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Reflects a [`Schema`] for `T` and validates a candidate instance against
/// it. Rust has no runtime counterpart to reflecting over a live struct
/// value, so implementations work from the type alone.
pub trait SchemaReflector<T>: Send + Sync {
    fn reflect(&self) -> Schema;

    /// Does `candidate` conform to `schema`? The shipped default treats "is
    /// representable as this type" as the whole of conformance.
    fn validate(&self, schema: &Schema, candidate: &T) -> Result<bool, SchemaError>;
}

/// Default reflector: the schema `ref` is [`Record::entity_type`], and
/// validation just confirms the candidate survives a round trip through its
/// own `Serialize`/`Deserialize` implementation. This catches the practical
/// failure mode (a hand-rolled `Serialize` impl that produces something its
/// own `Deserialize` can't read back) without reimplementing a schema
/// language nothing else in the crate needs.
pub struct DefaultSchemaReflector<T> {
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> Default for DefaultSchemaReflector<T> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T> SchemaReflector<T> for DefaultSchemaReflector<T>
where
    T: Record + Serialize + DeserializeOwned,
{
    fn reflect(&self) -> Schema {
        Schema {
            reference: T::entity_type().to_string(),
        }
    }

    fn validate(&self, _schema: &Schema, candidate: &T) -> Result<bool, SchemaError> {
        let value = serde_json::to_value(candidate)?;
        Ok(serde_json::from_value::<T>(value).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objectstore_core::{EntityId, TypedValue};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Widget {
        id: EntityId,
        label: String,
    }

    impl Record for Widget {
        fn entity_type() -> &'static str {
            "test.widget"
        }
        fn id(&self) -> &EntityId {
            &self.id
        }
        fn set_id(&mut self, id: EntityId) {
            self.id = id;
        }
        fn get_field(&self, path: &str) -> Result<TypedValue, objectstore_core::FieldAccessError> {
            match path {
                "label" => Ok(TypedValue::Str(self.label.clone())),
                other => Err(objectstore_core::FieldAccessError::InvalidField(other.to_string())),
            }
        }
    }

    #[test]
    fn reflects_entity_type_as_ref() {
        let reflector = DefaultSchemaReflector::<Widget>::default();
        assert_eq!(reflector.reflect().reference, "test.widget");
    }

    #[test]
    fn validates_any_well_formed_instance() {
        let reflector = DefaultSchemaReflector::<Widget>::default();
        let schema = reflector.reflect();
        let w = Widget { id: EntityId::new(), label: "a".into() };
        assert!(reflector.validate(&schema, &w).unwrap());
    }
}
