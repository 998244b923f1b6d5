use objectstore_core::{compare, Record, TypedValue};
use std::cmp::Ordering;

use crate::error::QueryError;
use crate::query::Query;

/// A single leaf test: does `fieldPath` equal `value`?
///
/// Only equality is implemented, matching the original; the shape leaves
/// room for ordering operators (`Gt`/`Lt`) without changing the tree
/// structure.
#[derive(Debug, Clone)]
pub struct Criterion {
    field_path: String,
    value: Option<TypedValue>,
}

impl Criterion {
    /// Close the criterion with an equality test, producing a [`Query`] that
    /// can be further extended with `.and(..)`/`.or(..)`.
    pub fn eq(self, value: impl Into<TypedValue>) -> Query {
        Query::from_criterion(self.with_value(value.into()))
    }

    pub(crate) fn with_value(mut self, value: TypedValue) -> Self {
        self.value = Some(value);
        self
    }

    pub(crate) fn eval<R: Record>(&self, record: &R) -> Result<bool, QueryError> {
        let field = record.get_field(&self.field_path)?;
        let expected = self
            .value
            .as_ref()
            .expect("Criterion::eval called before eq() set a value");
        Ok(compare(&field, expected)? == Ordering::Equal)
    }

    pub(crate) fn new(field_path: impl Into<String>) -> Self {
        Self {
            field_path: field_path.into(),
            value: None,
        }
    }
}

/// Start a query: `where_field("author").eq("A1")`.
pub fn where_field(field_path: impl Into<String>) -> Criterion {
    Criterion::new(field_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use objectstore_core::EntityId;

    struct Doc {
        id: EntityId,
        author: String,
    }

    impl Record for Doc {
        fn entity_type() -> &'static str {
            "test.doc"
        }
        fn id(&self) -> &EntityId {
            &self.id
        }
        fn set_id(&mut self, id: EntityId) {
            self.id = id;
        }
        fn get_field(&self, path: &str) -> Result<TypedValue, objectstore_core::FieldAccessError> {
            match path {
                "author" => Ok(TypedValue::Str(self.author.clone())),
                other => Err(objectstore_core::FieldAccessError::InvalidField(other.to_string())),
            }
        }
    }

    #[test]
    fn eq_matches_equal_field() {
        let doc = Doc {
            id: EntityId::new(),
            author: "A1".into(),
        };
        let q = where_field("author").eq("A1");
        assert!(q.matches(&doc).unwrap());
    }

    #[test]
    fn eq_rejects_unequal_field() {
        let doc = Doc {
            id: EntityId::new(),
            author: "A2".into(),
        };
        let q = where_field("author").eq("A1");
        assert!(!q.matches(&doc).unwrap());
    }

    #[test]
    fn invalid_field_path_errors() {
        let doc = Doc {
            id: EntityId::new(),
            author: "A1".into(),
        };
        let q = where_field("missing").eq("A1");
        assert!(q.matches(&doc).is_err());
    }
}
