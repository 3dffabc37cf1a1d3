//! Compiled constraint checks.
//!
//! A field's declared constraints compile once, against the field's *sample*,
//! into an ordered chain of [`Check`]s. The min/max comparison strategy
//! (size vs. value) is fixed at compile time by the sample's shape, never
//! re-derived from runtime values. Inapplicable checks are omitted from the
//! chain entirely.
//!
//! Chain order is fixed: min, max, allowed, regex, integer, custom. The
//! engine stops at the first failing check per field.

use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::fail::{Code, CompileError, Fail};
use crate::kind::{CollectionSpec, Sample};
use crate::schema::Property;

/// Largest integer exactly representable in an IEEE-754 double (2^53 − 1);
/// mirrors the safe-integer range of JSON's number model.
const SAFE_INTEGER_MAX: f64 = 9_007_199_254_740_991.0;

/// User-supplied checker; runs last in the chain. Returns a [`Fail`] (path
/// is rebased by the engine, so the field name alone is fine) or `None`.
pub type CustomFn = dyn Fn(&Value) -> Option<Fail> + Send + Sync;

/// How a size bound measures its subject. Decided once from the sample.
#[derive(Clone)]
pub enum LenOf {
    /// Unicode scalar count of a string.
    Chars,
    /// Literal element count of an array.
    Elements,
    /// Logical element count under a collection spec (e.g. distinct count
    /// for a set), measured on the raw array input.
    Collection(Arc<CollectionSpec>),
}

impl std::fmt::Debug for LenOf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LenOf::Chars => f.write_str("Chars"),
            LenOf::Elements => f.write_str("Elements"),
            LenOf::Collection(spec) => f.debug_tuple("Collection").field(&spec.name).finish(),
        }
    }
}

impl LenOf {
    fn measure(&self, value: &Value) -> Option<usize> {
        match (self, value) {
            (LenOf::Chars, Value::String(s)) => Some(s.chars().count()),
            (LenOf::Elements, Value::Array(items)) => Some(items.len()),
            (LenOf::Collection(spec), Value::Array(items)) => Some((spec.logical_len)(items)),
            _ => None,
        }
    }
}

/// One compiled constraint.
#[derive(Clone)]
pub enum Check {
    MinSize { bound: usize, len_of: LenOf },
    MaxSize { bound: usize, len_of: LenOf },
    MinValue(f64),
    MaxValue(f64),
    Allowed(Vec<Value>),
    Pattern(Regex),
    Integer,
    Custom(Arc<CustomFn>),
}

impl std::fmt::Debug for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Check::MinSize { bound, len_of } => f
                .debug_struct("MinSize")
                .field("bound", bound)
                .field("len_of", len_of)
                .finish(),
            Check::MaxSize { bound, len_of } => f
                .debug_struct("MaxSize")
                .field("bound", bound)
                .field("len_of", len_of)
                .finish(),
            Check::MinValue(v) => f.debug_tuple("MinValue").field(v).finish(),
            Check::MaxValue(v) => f.debug_tuple("MaxValue").field(v).finish(),
            Check::Allowed(vs) => f.debug_tuple("Allowed").field(vs).finish(),
            Check::Pattern(re) => f.debug_tuple("Pattern").field(re).finish(),
            Check::Integer => f.write_str("Integer"),
            Check::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Check {
    /// Run against the raw, pre-parse value. `field` names the failing unit
    /// in the returned fail's path; the engine rebases it.
    pub fn run(&self, field: &str, value: &Value) -> Option<Fail> {
        match self {
            Check::MinSize { bound, len_of } => {
                let len = len_of.measure(value)?;
                (len < *bound).then(|| {
                    Fail::new(
                        field,
                        Code::Min,
                        format!("length of {len} < minimum length of {bound}"),
                    )
                })
            }
            Check::MaxSize { bound, len_of } => {
                let len = len_of.measure(value)?;
                (len > *bound).then(|| {
                    Fail::new(
                        field,
                        Code::Max,
                        format!("length of {len} > maximum length of {bound}"),
                    )
                })
            }
            Check::MinValue(bound) => {
                let v = value.as_f64()?;
                (v < *bound).then(|| {
                    Fail::new(field, Code::Min, format!("value of {} < minimum of {bound}", value))
                })
            }
            Check::MaxValue(bound) => {
                let v = value.as_f64()?;
                (v > *bound).then(|| {
                    Fail::new(field, Code::Max, format!("value of {} > maximum of {bound}", value))
                })
            }
            Check::Allowed(set) => (!set.contains(value)).then(|| {
                Fail::new(field, Code::Allowed, format!("{} is not an allowed value", text_of(value)))
            }),
            Check::Pattern(re) => {
                let text = text_of(value);
                (!re.is_match(&text)).then(|| {
                    Fail::new(
                        field,
                        Code::Regex,
                        format!("\"{text}\" does not match pattern {re}"),
                    )
                })
            }
            Check::Integer => {
                let v = value.as_f64()?;
                let safe = v.fract() == 0.0 && v.abs() <= SAFE_INTEGER_MAX;
                (!safe).then(|| {
                    Fail::new(field, Code::Integer, format!("{} is not a safe integer", value))
                })
            }
            Check::Custom(f) => f(value),
        }
    }
}

/// String form used by the regex check and diagnostics: strings verbatim,
/// everything else in JSON notation.
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Size strategy for this sample shape, or `None` for value-ordering shapes.
fn size_strategy(sample: &Sample) -> Option<LenOf> {
    match sample {
        Sample::Json(Value::String(_)) => Some(LenOf::Chars),
        Sample::Json(Value::Array(_)) | Sample::Array(_) => Some(LenOf::Elements),
        Sample::Collection(spec, _) => Some(LenOf::Collection(spec.clone())),
        _ => None,
    }
}

/// Size bounds must be whole and non-negative; `as usize` would otherwise
/// truncate `2.5` to `2` and clamp negatives to `0` without a word.
fn size_bound(field: &str, bound: f64) -> Result<usize, CompileError> {
    if bound.fract() != 0.0 || bound < 0.0 || bound > SAFE_INTEGER_MAX {
        return Err(CompileError::BadBound { field: field.to_string(), bound });
    }
    Ok(bound as usize)
}

fn is_integral_number(sample: &Sample) -> bool {
    match sample {
        Sample::Json(Value::Number(n)) => n.as_f64().is_some_and(|v| v.fract() == 0.0),
        _ => false,
    }
}

/// Compile a property's declared constraints against its sample.
pub fn compile_checks(
    field: &str,
    sample: &Sample,
    prop: &Property,
) -> Result<Vec<Check>, CompileError> {
    let mut chain = Vec::new();
    let sized = size_strategy(sample);
    let numeric = matches!(sample, Sample::Json(Value::Number(_)));

    if let Some(min) = prop.min {
        match &sized {
            Some(len_of) => chain.push(Check::MinSize {
                bound: size_bound(field, min)?,
                len_of: len_of.clone(),
            }),
            None if numeric => chain.push(Check::MinValue(min)),
            None => {}
        }
    }
    if let Some(max) = prop.max {
        match &sized {
            Some(len_of) => chain.push(Check::MaxSize {
                bound: size_bound(field, max)?,
                len_of: len_of.clone(),
            }),
            None if numeric => chain.push(Check::MaxValue(max)),
            None => {}
        }
    }
    if let Some(allowed) = &prop.allowed {
        chain.push(Check::Allowed(allowed.clone()));
    }
    if let Some(pattern) = &prop.regex {
        let re = Regex::new(pattern).map_err(|source| CompileError::BadRegex {
            field: field.to_string(),
            source,
        })?;
        chain.push(Check::Pattern(re));
    }
    // integer defaults on only for integral numeric samples; a fractional
    // sample must keep validating its own sample instance
    let integer = prop.integer.unwrap_or_else(|| is_integral_number(sample));
    if integer && numeric {
        chain.push(Check::Integer);
    }
    if let Some(custom) = &prop.custom {
        chain.push(Check::Custom(custom.clone()));
    }

    Ok(chain)
}

// ------------------------------- Tests ------------------------------------ //
