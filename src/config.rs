//! Engine configuration: an explicit object instead of ambient process-wide
//! state. A `Config` is handed to `Schema::compile` and governs every parse
//! made through the resulting compiled schema.
//!
//! Registry mutation, the skip policy, and the sinks are configuration-time
//! concerns: finalize the `Config` before sharing compiled schemas across
//! threads, and parsing needs no further synchronization.

use std::sync::Arc;

use crate::fail::Fail;
use crate::kind::Registry;
use serde_json::Value;

/// Receives demoted failures when the skip-invalid policy prunes an element
/// or omits an optional nested object.
pub type WarnSink = dyn Fn(&Fail) + Send + Sync;

/// Maps a declared field name to the key looked up in the input object
/// (e.g. snake_case declarations reading camelCase payloads).
pub type RenameFn = dyn Fn(&str) -> String + Send + Sync;

/// Post-construction hook, applied to every object the engine builds
/// (nested objects included) — e.g. to wrap results for observability.
pub type AugmentFn = dyn Fn(Value) -> Value + Send + Sync;

#[derive(Clone)]
pub struct Config {
    /// Kind registry consulted at compile time (field resolution) and parse
    /// time (collection element resolution).
    pub registry: Registry,
    /// When set, invalid collection elements are dropped and invalid
    /// optional nested objects omitted, each demoted to a warning, instead
    /// of failing the whole parse.
    pub skip_invalid: bool,
    pub warn_sink: Option<Arc<WarnSink>>,
    pub rename: Option<Arc<RenameFn>>,
    pub augment: Option<Arc<AugmentFn>>,
}

impl Config {
    pub fn new() -> Self {
        Config {
            registry: Registry::new(),
            skip_invalid: false,
            warn_sink: None,
            rename: None,
            augment: None,
        }
    }

    pub fn skip_invalid(mut self, on: bool) -> Self {
        self.skip_invalid = on;
        self
    }

    pub fn warn_sink(mut self, sink: impl Fn(&Fail) + Send + Sync + 'static) -> Self {
        self.warn_sink = Some(Arc::new(sink));
        self
    }

    pub fn rename(mut self, rename: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.rename = Some(Arc::new(rename));
        self
    }

    pub fn augment(mut self, augment: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.augment = Some(Arc::new(augment));
        self
    }

    /// Input key for a declared field name.
    pub(crate) fn input_key(&self, field: &str) -> String {
        match &self.rename {
            Some(rename) => rename(field),
            None => field.to_string(),
        }
    }

    /// Route a demoted failure to the sink, or to `tracing::warn!` when no
    /// sink is installed.
    pub(crate) fn warn(&self, fail: &Fail) {
        match &self.warn_sink {
            Some(sink) => sink(fail),
            None => tracing::warn!(path = %fail.path, "skipped invalid value: {}", fail.message),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

/// `snake_case` → `camelCase`, for schemas declared in Rust naming reading
/// JavaScript-shaped payloads.
pub fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_maps_snake_names() {
        assert_eq!(camel_case("user_name"), "userName");
        assert_eq!(camel_case("a_b_c"), "aBC");
        assert_eq!(camel_case("plain"), "plain");
    }

    #[test]
    fn input_key_defaults_to_the_field_name() {
        let cx = Config::new();
        assert_eq!(cx.input_key("user_name"), "user_name");
        let cx = Config::new().rename(camel_case);
        assert_eq!(cx.input_key("user_name"), "userName");
    }
}
