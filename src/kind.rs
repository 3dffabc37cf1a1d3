//! Pluggable type matchers ("kinds") and the priority-ordered registry.
//!
//! A [`Kind`] decides, from a field's declared *sample*, how input for that
//! field is matched, defaulted, and converted. Resolution happens once at
//! schema-compile time: the registry walks its kinds in descending priority
//! and the first `applies_to` hit wins. Built-ins, highest first: array,
//! generic collection, checked object (nested schema), plain JSON fallback
//! (always matches).
//!
//! User kinds are *inserted* into the priority order, not appended, so a
//! higher-priority registration can shadow a built-in for the shapes it
//! claims.

pub mod array;
pub mod checked;
pub mod collection;
pub mod plain;

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::config::Config;
use crate::fail::{element_path, Code, Fail};
use crate::schema::Compiled;

// ------------------------------- Sample ----------------------------------- //

/// A field's declared shape: its default value and the evidence the registry
/// matches kinds against.
///
/// Plain JSON cannot express "an instance of schema S", and it cannot form
/// the cycles self-referential schemas need, so samples are an explicit
/// graph rather than a bare [`Value`].
#[derive(Clone)]
pub enum Sample {
    /// Plain JSON default; its runtime shape drives kind resolution.
    Json(Value),
    /// Array whose first element (if any) is the representative element
    /// shape. Elements may themselves be schema samples.
    Array(Vec<Sample>),
    /// Custom collection (e.g. a set): conversion behavior described by a
    /// [`CollectionSpec`], representative elements alongside.
    Collection(Arc<CollectionSpec>, Vec<Sample>),
    /// Instance of a compiled schema; the default is that schema's sample
    /// instance. Self-reference installs an `Arc` back to the owning schema.
    Schema(Arc<Compiled>),
}

impl Sample {
    /// Representative element shape for array/collection samples.
    pub fn element(&self) -> Option<&Sample> {
        match self {
            Sample::Array(elems) | Sample::Collection(_, elems) => elems.first(),
            _ => None,
        }
    }

    /// Materialize the default value this sample stands for. Schema samples
    /// expand to their sample instance; cycles are cut to `null` (a JSON
    /// value cannot be cyclic).
    pub fn to_value(&self) -> Value {
        self.to_value_seen(&mut Vec::new())
    }

    pub(crate) fn to_value_seen(&self, seen: &mut Vec<*const Compiled>) -> Value {
        match self {
            Sample::Json(v) => v.clone(),
            Sample::Array(elems) => {
                Value::Array(elems.iter().map(|s| s.to_value_seen(seen)).collect())
            }
            Sample::Collection(spec, elems) => {
                let mut out = (spec.empty)();
                for elem in elems {
                    (spec.insert)(&mut out, elem.to_value_seen(seen));
                }
                out
            }
            Sample::Schema(compiled) => {
                let ptr = Arc::as_ptr(compiled);
                if seen.contains(&ptr) {
                    return Value::Null;
                }
                seen.push(ptr);
                let out = compiled.sample_value_seen(seen);
                seen.pop();
                out
            }
        }
    }
}

impl From<Value> for Sample {
    fn from(v: Value) -> Self {
        Sample::Json(v)
    }
}

impl From<Arc<Compiled>> for Sample {
    fn from(compiled: Arc<Compiled>) -> Self {
        Sample::Schema(compiled)
    }
}

impl fmt::Debug for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sample::Json(v) => write!(f, "Json({v})"),
            Sample::Array(elems) => f.debug_tuple("Array").field(&elems.len()).finish(),
            Sample::Collection(spec, elems) => {
                f.debug_tuple("Collection").field(&spec.name).field(&elems.len()).finish()
            }
            Sample::Schema(compiled) => f.debug_tuple("Schema").field(&compiled.name()).finish(),
        }
    }
}

// ------------------------------ Mismatch ---------------------------------- //

/// Outcome of a kind's cheap shape test, run before conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// Hard type error; the text is the complete human message
    /// (e.g. `"expected a string, got a number"`).
    Expected(String),
    /// Shape is fine, proceed to constraint checks and `parse`.
    Parse,
    /// Value is already a fully valid instance of the target shape; use it
    /// as-is, skipping constraint checks and conversion. Lets coercing kinds
    /// make re-validation of already-converted values a no-op.
    AlreadyValid,
}

// -------------------------------- Kind ------------------------------------ //

/// One pluggable type matcher.
///
/// `parse` receives the governing [`Config`] so recursive descent (nested
/// schemas, collection elements) inherits the outermost caller's policy,
/// sinks, and registry.
pub trait Kind: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Position in the registry's total order; higher wins.
    fn priority(&self) -> i32;

    /// Does this kind govern fields declared with this sample shape?
    fn applies_to(&self, sample: &Sample) -> bool;

    /// Value for a missing field in `DefaultOnMissing` mode. The sample *is*
    /// the default; coercing kinds override to return converted form.
    fn default_to(&self, sample: &Sample) -> Value {
        sample.to_value()
    }

    /// Cheap shape test against the raw input value.
    fn mismatch(&self, input: &Value, sample: &Sample) -> Mismatch;

    /// Convert raw input into the final value, recursing as needed. `path`
    /// is the absolute dotted path of the unit being parsed.
    fn parse(&self, cx: &Config, path: &str, sample: &Sample, input: Value)
        -> Result<Value, Fail>;
}

/// Human name of a JSON value's runtime shape, article included.
pub fn json_shape(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------- CollectionSpec ------------------------------ //

/// Defines one generic collection shape: how to build an empty instance, how
/// to insert an element, and how to count the logical elements of raw array
/// input (size bounds use the logical count, not the literal array length).
///
/// Input is always accepted as a JSON array and converted element by element.
pub struct CollectionSpec {
    pub name: String,
    pub empty: Box<dyn Fn() -> Value + Send + Sync>,
    pub insert: Box<dyn Fn(&mut Value, Value) + Send + Sync>,
    pub logical_len: Box<dyn Fn(&[Value]) -> usize + Send + Sync>,
}

/// A set: inserts dedup on value equality, logical size is the distinct
/// element count. Materializes as a duplicate-free JSON array.
pub fn set_spec() -> Arc<CollectionSpec> {
    Arc::new(CollectionSpec {
        name: "set".to_string(),
        empty: Box::new(|| Value::Array(Vec::new())),
        insert: Box::new(|out, elem| {
            if let Value::Array(items) = out {
                if !items.contains(&elem) {
                    items.push(elem);
                }
            }
        }),
        logical_len: Box::new(|raw| {
            let mut distinct: Vec<&Value> = Vec::new();
            for v in raw {
                if !distinct.contains(&v) {
                    distinct.push(v);
                }
            }
            distinct.len()
        }),
    })
}

// ------------------------------- Registry --------------------------------- //

static BUILTINS: Lazy<Vec<Arc<dyn Kind>>> = Lazy::new(|| {
    vec![
        Arc::new(array::ArrayKind) as Arc<dyn Kind>,
        Arc::new(collection::CollectionKind) as Arc<dyn Kind>,
        Arc::new(checked::CheckedKind) as Arc<dyn Kind>,
        Arc::new(plain::PlainKind) as Arc<dyn Kind>,
    ]
});

/// Priority-ordered kind registry; resolution is first-match in descending
/// priority. Registration is a configuration-time operation: finalize the
/// registry before sharing compiled schemas across threads.
#[derive(Clone)]
pub struct Registry {
    kinds: Vec<Arc<dyn Kind>>,
    fallback: Arc<dyn Kind>,
}

impl Registry {
    /// Registry seeded with the built-in kinds.
    pub fn new() -> Self {
        Registry { kinds: BUILTINS.clone(), fallback: Arc::new(plain::PlainKind) }
    }

    /// Insert a kind into the priority order. Among equal priorities the
    /// newest registration comes first, so it wins ties against built-ins.
    pub fn register(&mut self, kind: Arc<dyn Kind>) {
        let at = self
            .kinds
            .iter()
            .position(|k| k.priority() <= kind.priority())
            .unwrap_or(self.kinds.len());
        self.kinds.insert(at, kind);
    }

    /// First kind whose `applies_to` accepts the sample. The plain fallback
    /// accepts everything, so resolution always lands somewhere.
    pub fn resolve(&self, sample: &Sample) -> Arc<dyn Kind> {
        self.kinds
            .iter()
            .find(|k| k.applies_to(sample))
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

// --------------------------- Element conversion --------------------------- //

/// Shared element loop for array/collection kinds: resolve the element kind
/// once against the representative sample, then convert each input element,
/// honoring the skip-invalid policy.
///
/// Diagnostics always name the element's position in the *original* input,
/// even after earlier elements were dropped.
pub(crate) fn convert_elements(
    cx: &Config,
    path: &str,
    rep: Option<&Sample>,
    input: Vec<Value>,
    mut accept: impl FnMut(Value),
) -> Result<(), Fail> {
    let rep = rep.cloned().unwrap_or(Sample::Json(Value::Null));
    let kind = cx.registry.resolve(&rep);

    for (index, elem) in input.into_iter().enumerate() {
        let at = element_path(path, index);
        let parsed = match kind.mismatch(&elem, &rep) {
            Mismatch::Expected(message) => Err(Fail::new(at.clone(), Code::Type, message)),
            Mismatch::AlreadyValid => Ok(elem),
            Mismatch::Parse => kind.parse(cx, &at, &rep, elem),
        };
        match parsed {
            Ok(v) => accept(v),
            Err(fail) if cx.skip_invalid => cx.warn(&fail),
            Err(fail) => return Err(fail),
        }
    }
    Ok(())
}

// ------------------------------- Tests ------------------------------------ //
