use std::cmp::Ordering;

use objectstore_core::{compare, Record};

use crate::criterion::Criterion;
use crate::error::QueryError;

#[derive(Debug, Clone)]
struct Sort {
    field_path: String,
    desc: bool,
}

/// An AND/OR tree of [`Criterion`] leaves, plus an optional sort.
///
/// `matches`: `(∀c ∈ ands: eval(c, r)) ∨ (∃q ∈ ors: match(q, r))`. An
/// all-empty query (no ands, no ors) matches everything, since the ands
/// conjunction over an empty set is vacuously true.
#[derive(Debug, Clone, Default)]
pub struct Query {
    ands: Vec<Criterion>,
    ors: Vec<Query>,
    sort: Option<Sort>,
}

impl Query {
    pub(crate) fn from_criterion(criterion: Criterion) -> Self {
        Self {
            ands: vec![criterion],
            ors: Vec::new(),
            sort: None,
        }
    }

    /// AND a further criterion onto this query: `q.and("title").eq("T2")`.
    pub fn and(self, field_path: impl Into<String>) -> AndBuilder {
        AndBuilder {
            query: self,
            field_path: field_path.into(),
        }
    }

    /// OR this query with an alternative: either may match.
    pub fn or(mut self, alternative: Query) -> Query {
        self.ors.push(alternative);
        self
    }

    pub fn order_by(mut self, field_path: impl Into<String>) -> Query {
        self.sort = Some(Sort {
            field_path: field_path.into(),
            desc: false,
        });
        self
    }

    pub fn order_by_desc(mut self, field_path: impl Into<String>) -> Query {
        self.sort = Some(Sort {
            field_path: field_path.into(),
            desc: true,
        });
        self
    }

    pub fn matches<R: Record>(&self, record: &R) -> Result<bool, QueryError> {
        let mut and_ok = true;
        for criterion in &self.ands {
            if !criterion.eval(record)? {
                and_ok = false;
                break;
            }
        }
        if and_ok {
            return Ok(true);
        }
        for alt in &self.ors {
            if alt.matches(record)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Intermediate builder for `query.and(path).eq(value)`.
pub struct AndBuilder {
    query: Query,
    field_path: String,
}

impl AndBuilder {
    pub fn eq(mut self, value: impl Into<objectstore_core::TypedValue>) -> Query {
        let criterion = Criterion::new(self.field_path).with_value(value.into());
        self.query.ands.push(criterion);
        self.query
    }
}

/// Filter `records` by `query`, then stably sort by `query`'s sort field (if
/// any). This is the only place the crate compares whole record sets; it
/// never reads the view KV or the event log — callers decode view entries
/// into `R` first.
pub fn find<R: Record>(records: Vec<R>, query: &Query) -> Result<Vec<R>, QueryError> {
    let mut matched = Vec::with_capacity(records.len());
    for record in records {
        if query.matches(&record)? {
            matched.push(record);
        }
    }

    if let Some(sort) = &query.sort {
        let mut sort_err = None;
        matched.sort_by(|a, b| {
            if sort_err.is_some() {
                return Ordering::Equal;
            }
            let fa = a.get_field(&sort.field_path);
            let fb = b.get_field(&sort.field_path);
            match (fa, fb) {
                (Ok(fa), Ok(fb)) => match compare(&fa, &fb) {
                    Ok(ord) => {
                        if sort.desc {
                            ord.reverse()
                        } else {
                            ord
                        }
                    }
                    Err(_) => {
                        sort_err = Some(QueryError::CantCompare);
                        Ordering::Equal
                    }
                },
                _ => {
                    sort_err = Some(QueryError::InvalidSortingField(sort.field_path.clone()));
                    Ordering::Equal
                }
            }
        });
        if let Some(err) = sort_err {
            return Err(err);
        }
    }

    Ok(matched)
}
