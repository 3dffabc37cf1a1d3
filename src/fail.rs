//! Fail/Result model: the single-error currency of the whole engine.
//!
//! Every parse attempt surfaces at most one [`Fail`] — the first one
//! encountered in schema field order. Nested parses bubble their fail up
//! through [`Fail::prefixed`], which rebases the dotted path.

use thiserror::Error;

/// What went wrong, by category.
///
/// The fixed variants mirror the built-in checks; user checkers and
/// user-registered kinds report through `Custom`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Code {
    /// Shape mismatch against the field's resolved kind.
    Type,
    /// Bound violation, value- or size-based.
    Min,
    /// Bound violation, value- or size-based.
    Max,
    /// Missing required field.
    Req,
    /// Not in the enumerated set and no fallback configured.
    Allowed,
    /// Stringified value did not match the pattern.
    Regex,
    /// Numeric value is not an exact (safe) integer.
    Integer,
    /// Internal anomaly: undeclared field, non-finite comparison.
    Unknown,
    /// Application-defined code from a custom checker or kind.
    Custom(String),
}

/// One located validation failure.
///
/// `path` is dotted (`order.items[2].price`); array elements use
/// `field[index]` with the index of the element in the *original* input.
#[derive(Debug, Clone, PartialEq)]
pub struct Fail {
    pub path: String,
    pub code: Code,
    pub message: String,
}

impl Fail {
    pub fn new(path: impl Into<String>, code: Code, message: impl Into<String>) -> Self {
        Fail { path: path.into(), code, message: message.into() }
    }

    /// A new Fail with `prefix` prepended to the path. Identity when the
    /// prefix is empty, `prefix` alone when the path is empty (the fail is
    /// about the prefixed unit itself).
    pub fn prefixed(&self, prefix: &str) -> Self {
        Fail {
            path: join_path(prefix, &self.path),
            code: self.code.clone(),
            message: self.message.clone(),
        }
    }
}

impl std::fmt::Display for Fail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Join a dotted path prefix and a segment. Either side may be empty.
pub fn join_path(prefix: &str, segment: &str) -> String {
    match (prefix.is_empty(), segment.is_empty()) {
        (true, _) => segment.to_string(),
        (_, true) => prefix.to_string(),
        _ => format!("{prefix}.{segment}"),
    }
}

/// Path of element `index` inside the array/collection at `path`.
pub fn element_path(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}

/// Raised (returned as `Err`) by the `raise`/`parse` entry-point family.
/// Displays as `"<dotted.path>: <human message>"`.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{0}")]
pub struct CheckError(pub Fail);

/// Error surface of the JSON-text entry points.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The text was not valid JSON; the message carries the JSON path at
    /// which deserialization gave up.
    #[error("invalid JSON: {0}")]
    Json(String),
    /// `parse_array_str` input was valid JSON but not an array. A hard
    /// error, not a validation Failure.
    #[error("expected a JSON array")]
    NotAnArray,
    /// The decoded value failed validation.
    #[error(transparent)]
    Check(#[from] CheckError),
}

/// Schema compilation errors. Parse-time problems are always `Fail`s;
/// these are programming errors in the schema declaration itself.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("field {field}: invalid regex: {source}")]
    BadRegex {
        field: String,
        #[source]
        source: regex::Error,
    },
    #[error("field {field}: size bound {bound} is not a non-negative integer")]
    BadBound { field: String, bound: f64 },
    #[error("no such field: {0}")]
    UnknownField(String),
}

// ------------------------------- Tests ------------------------------------ //
