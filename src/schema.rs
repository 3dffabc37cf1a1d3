//! Schema declaration and compilation.
//!
//! A [`Schema`] is an ordered field-name → [`Property`] mapping; insertion
//! order is the authoritative validation order and failure-precedence order.
//! Compilation resolves each field's kind against the registry, compiles its
//! constraint chain, and produces an immutable [`Compiled`] — immutable
//! except for [`Compiled::recurse`], the one sanctioned patch that installs
//! a forward/self reference into an index-addressed field slot.

use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use serde_json::Value;

use crate::check::{compile_checks, Check, CustomFn};
use crate::config::Config;
use crate::fail::{CompileError, Fail};
use crate::kind::{Kind, Sample};

/// Required mode of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Required {
    /// Missing input fails with `Code::Req`. The default.
    #[default]
    Required,
    /// Missing input omits the field from the result entirely.
    Optional,
    /// Missing input takes the kind's default for the sample.
    Default,
}

/// One field's declaration: sample/default value plus constraints.
#[derive(Clone)]
pub struct Property {
    pub sample: Sample,
    pub required: Required,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub allowed: Option<Vec<Value>>,
    pub fallback: Option<Value>,
    pub integer: Option<bool>,
    pub regex: Option<String>,
    pub custom: Option<Arc<CustomFn>>,
}

impl Property {
    /// Declare a field by its sample value. The sample is the field's
    /// default and the shape its kind is resolved from.
    pub fn new(sample: impl Into<Sample>) -> Self {
        Property {
            sample: sample.into(),
            required: Required::Required,
            min: None,
            max: None,
            allowed: None,
            fallback: None,
            integer: None,
            regex: None,
            custom: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = Required::Optional;
        self
    }

    /// Missing input takes the field's default instead of failing.
    pub fn default_on_missing(mut self) -> Self {
        self.required = Required::Default;
        self
    }

    /// Lower bound: length/size for strings, arrays and collections, value
    /// for numbers.
    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn allowed(mut self, allowed: Vec<Value>) -> Self {
        self.allowed = Some(allowed);
        self
    }

    /// Silent replacement for values outside the allowed set. The fallback
    /// is trusted to satisfy the field's own type and constraints.
    pub fn fallback(mut self, fallback: Value) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn integer(mut self, integer: bool) -> Self {
        self.integer = Some(integer);
        self
    }

    /// Pattern the value's string form must match. Compiled at schema
    /// compile time; bad patterns are compile errors.
    pub fn regex(mut self, pattern: impl Into<String>) -> Self {
        self.regex = Some(pattern.into());
        self
    }

    /// Arbitrary checker, run after all built-in checks.
    pub fn custom(mut self, f: impl Fn(&Value) -> Option<Fail> + Send + Sync + 'static) -> Self {
        self.custom = Some(Arc::new(f));
        self
    }
}

impl From<Value> for Property {
    fn from(sample: Value) -> Self {
        Property::new(sample)
    }
}

/// Declarative schema: named, ordered field declarations.
pub struct Schema {
    name: String,
    fields: IndexMap<String, Property>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Schema { name: name.into(), fields: IndexMap::new() }
    }

    /// Declare a field. Declaration order is validation order.
    pub fn field(mut self, name: impl Into<String>, prop: impl Into<Property>) -> Self {
        self.fields.insert(name.into(), prop.into());
        self
    }

    /// Resolve every field's kind, compile every constraint chain, and
    /// freeze the result. The `Config` governs this schema for all later
    /// parses.
    pub fn compile(self, config: &Arc<Config>) -> Result<Arc<Compiled>, CompileError> {
        let mut index = IndexMap::with_capacity(self.fields.len());
        let mut slots = Vec::with_capacity(self.fields.len());

        for (slot, (name, property)) in self.fields.into_iter().enumerate() {
            let kind = config.registry.resolve(&property.sample);
            let checks = compile_checks(&name, &property.sample, &property)?;
            tracing::trace!(schema = %self.name, field = %name, kind = kind.name(), "compiled field");
            index.insert(name.clone(), slot);
            slots.push(RwLock::new(Arc::new(Field { name, property, kind, checks })));
        }

        tracing::debug!(schema = %self.name, fields = slots.len(), "schema compiled");
        Ok(Arc::new(Compiled { name: self.name, config: config.clone(), index, slots }))
    }
}

/// One compiled field: its declaration, resolved kind, and check chain.
pub struct Field {
    pub name: String,
    pub property: Property,
    pub kind: Arc<dyn Kind>,
    pub checks: Vec<Check>,
}

/// Compiled schema metadata: index-addressed field slots plus the identity
/// needed for diagnostics. Read-only after compilation — safe to share
/// across concurrent parses — except for [`Compiled::recurse`], which is a
/// configuration-time operation.
pub struct Compiled {
    name: String,
    config: Arc<Config>,
    index: IndexMap<String, usize>,
    slots: Vec<RwLock<Arc<Field>>>,
}

impl Compiled {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    /// Snapshot of the field slots in declaration order. Slots are read
    /// behind their locks and handed out as `Arc`s so no lock is held while
    /// the engine recurses.
    pub(crate) fn slots(&self) -> impl Iterator<Item = Arc<Field>> + '_ {
        self.slots
            .iter()
            .map(|slot| slot.read().expect("field slot lock poisoned").clone())
    }

    pub(crate) fn slot(&self, field: &str) -> Option<Arc<Field>> {
        let at = *self.index.get(field)?;
        Some(self.slots[at].read().expect("field slot lock poisoned").clone())
    }

    /// The declared sample of one field. After `recurse`, a self-referential
    /// field's sample is a `Sample::Schema` pointing back at this value
    /// (compare with `Arc::ptr_eq`).
    pub fn sample_of(&self, field: &str) -> Option<Sample> {
        self.slot(field).map(|f| f.property.sample.clone())
    }

    /// Replace one field's sample and recompile that slot in place. This is
    /// the only post-compile mutation, and exists so a field's sample can
    /// point back at its own schema (self-referential/linked shapes) without
    /// infinite compile-time recursion. Call before parsing begins.
    pub fn recurse(&self, field: &str, sample: impl Into<Sample>) -> Result<(), CompileError> {
        let at = *self
            .index
            .get(field)
            .ok_or_else(|| CompileError::UnknownField(field.to_string()))?;

        let mut property = {
            let slot = self.slots[at].read().expect("field slot lock poisoned");
            slot.property.clone()
        };
        property.sample = sample.into();
        let kind = self.config.registry.resolve(&property.sample);
        let checks = compile_checks(field, &property.sample, &property)?;
        tracing::debug!(schema = %self.name, field = %field, kind = kind.name(), "field re-pointed");

        let mut slot = self.slots[at].write().expect("field slot lock poisoned");
        *slot = Arc::new(Field { name: field.to_string(), property, kind, checks });
        Ok(())
    }

    /// The default, always-valid instance: every field materialized from its
    /// sample. Never runs validation — the sample is trusted by definition.
    ///
    /// After [`recurse`](Compiled::recurse), the self-referential back-edge
    /// materializes as `null`. A re-parse treats that `null` as missing, so
    /// an optional self-referential field comes back absent rather than
    /// `null`: the instance still validates, but the round trip is not
    /// deep-equal.
    pub fn sample_value(&self) -> Value {
        let mut seen = vec![self as *const Compiled];
        self.sample_value_seen(&mut seen)
    }

    pub(crate) fn sample_value_seen(&self, seen: &mut Vec<*const Compiled>) -> Value {
        let mut out = serde_json::Map::new();
        for field in self.slots() {
            out.insert(field.name.clone(), field.property.sample.to_value_seen(seen));
        }
        Value::Object(out)
    }
}

// ------------------------------- Tests ------------------------------------ //
