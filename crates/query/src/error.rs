use objectstore_core::FieldAccessError;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("no such field on path: {0}")]
    InvalidField(String),

    #[error("sorting field doesn't correspond to the instance type: {0}")]
    InvalidSortingField(String),

    #[error("can't compare while sorting")]
    CantCompare,

    #[error("cannot compare {left} with {right}")]
    TypeMismatch {
        left: &'static str,
        right: &'static str,
    },
}

impl From<FieldAccessError> for QueryError {
    fn from(e: FieldAccessError) -> Self {
        match e {
            FieldAccessError::InvalidField(path) => QueryError::InvalidField(path),
            FieldAccessError::TypeMismatch { left, right } => QueryError::TypeMismatch { left, right },
        }
    }
}
