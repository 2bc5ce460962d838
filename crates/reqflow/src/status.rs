//! Status predicates
//!
//! A [`StatusPredicate`] classifies a response status code. Requests hold
//! ordered lists of predicates (success, retry, not-found, exists) and a list
//! matches when any one of its predicates does.

use std::fmt;
use std::sync::Arc;

/// A condition on a response status code.
#[derive(Clone)]
pub enum StatusPredicate {
    /// Exactly this status
    Is(u16),
    /// Any of these statuses
    OneOf(Vec<u16>),
    /// Inclusive range
    Range {
        /// Lowest matching status
        low: u16,
        /// Highest matching status
        high: u16,
    },
    /// Anything but this status
    Not(u16),
    /// None of these statuses
    NotIn(Vec<u16>),
    /// Caller-defined condition
    Custom(Arc<dyn Fn(u16) -> bool + Send + Sync>),
}

impl StatusPredicate {
    /// Whether `status` satisfies this predicate.
    pub fn matches(&self, status: u16) -> bool {
        match self {
            StatusPredicate::Is(code) => *code == status,
            StatusPredicate::OneOf(codes) => codes.contains(&status),
            StatusPredicate::Range { low, high } => (*low..=*high).contains(&status),
            StatusPredicate::Not(code) => *code != status,
            StatusPredicate::NotIn(codes) => !codes.contains(&status),
            StatusPredicate::Custom(f) => f(status),
        }
    }
}

impl fmt::Debug for StatusPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusPredicate::Is(code) => f.debug_tuple("Is").field(code).finish(),
            StatusPredicate::OneOf(codes) => f.debug_tuple("OneOf").field(codes).finish(),
            StatusPredicate::Range { low, high } => f
                .debug_struct("Range")
                .field("low", low)
                .field("high", high)
                .finish(),
            StatusPredicate::Not(code) => f.debug_tuple("Not").field(code).finish(),
            StatusPredicate::NotIn(codes) => f.debug_tuple("NotIn").field(codes).finish(),
            StatusPredicate::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// True when at least one predicate matches. An empty list never matches.
pub fn matches_any(status: u16, predicates: &[StatusPredicate]) -> bool {
    predicates.iter().any(|p| p.matches(status))
}

/// Matches exactly `code`.
pub fn is(code: u16) -> StatusPredicate {
    StatusPredicate::Is(code)
}

/// Matches any of `codes`.
pub fn one_of(codes: impl IntoIterator<Item = u16>) -> StatusPredicate {
    StatusPredicate::OneOf(codes.into_iter().collect())
}

/// Matches `low..=high`.
pub fn in_range(low: u16, high: u16) -> StatusPredicate {
    StatusPredicate::Range { low, high }
}

/// Matches everything except `code`.
pub fn not(code: u16) -> StatusPredicate {
    StatusPredicate::Not(code)
}

/// Matches everything except `codes`.
pub fn not_in(codes: impl IntoIterator<Item = u16>) -> StatusPredicate {
    StatusPredicate::NotIn(codes.into_iter().collect())
}

/// Wraps an arbitrary condition.
pub fn from_fn<F>(f: F) -> StatusPredicate
where
    F: Fn(u16) -> bool + Send + Sync + 'static,
{
    StatusPredicate::Custom(Arc::new(f))
}

/// 200 OK
pub fn ok() -> StatusPredicate {
    is(200)
}

/// 201 Created
pub fn created() -> StatusPredicate {
    is(201)
}

/// 202 Accepted
pub fn accepted() -> StatusPredicate {
    is(202)
}

/// 204 No Content
pub fn no_content() -> StatusPredicate {
    is(204)
}

/// 404 Not Found
pub fn not_found() -> StatusPredicate {
    is(404)
}

/// 409 Conflict
pub fn conflict() -> StatusPredicate {
    is(409)
}

/// 422 Unprocessable Entity
pub fn unprocessable_entity() -> StatusPredicate {
    is(422)
}

/// 500 Internal Server Error
pub fn internal_server_error() -> StatusPredicate {
    is(500)
}

/// Any 2xx
pub fn success() -> StatusPredicate {
    in_range(200, 299)
}
