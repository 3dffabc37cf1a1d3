//! Checked-object kind: a field whose sample is another compiled schema.
//! Parsing recursively invokes the engine with that schema.

use serde_json::Value;

use crate::config::Config;
use crate::engine;
use crate::fail::Fail;
use crate::kind::{json_shape, Kind, Mismatch, Sample};

pub struct CheckedKind;

impl Kind for CheckedKind {
    fn name(&self) -> &str {
        "checked"
    }

    fn priority(&self) -> i32 {
        20
    }

    fn applies_to(&self, sample: &Sample) -> bool {
        matches!(sample, Sample::Schema(_))
    }

    fn mismatch(&self, input: &Value, sample: &Sample) -> Mismatch {
        if input.is_object() {
            Mismatch::Parse
        } else {
            let name = match sample {
                Sample::Schema(compiled) => compiled.name().to_string(),
                _ => "object".to_string(),
            };
            Mismatch::Expected(format!("expected a {name} object, got {}", json_shape(input)))
        }
    }

    fn parse(
        &self,
        cx: &Config,
        path: &str,
        sample: &Sample,
        input: Value,
    ) -> Result<Value, Fail> {
        match sample {
            Sample::Schema(compiled) => engine::parse_fields(cx, compiled, path, &input),
            _ => Ok(input),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Property, Schema};
    use serde_json::json;
    use std::sync::Arc;

    fn point() -> Arc<crate::schema::Compiled> {
        Schema::new("point")
            .field("x", Property::new(json!(0)))
            .field("y", Property::new(json!(0)))
            .compile(&Arc::new(Config::new()))
            .unwrap()
    }

    #[test]
    fn non_object_input_names_the_schema() {
        let sample = Sample::Schema(point());
        let m = CheckedKind.mismatch(&json!(7), &sample);
        assert_eq!(
            m,
            Mismatch::Expected("expected a point object, got a number".to_string())
        );
    }

    #[test]
    fn parse_descends_into_the_nested_schema() {
        let cx = Config::new();
        let sample = Sample::Schema(point());
        let out = CheckedKind
            .parse(&cx, "p", &sample, json!({"x": 1, "y": 2}))
            .unwrap();
        assert_eq!(out, json!({"x": 1, "y": 2}));

        let err = CheckedKind
            .parse(&cx, "p", &sample, json!({"x": 1}))
            .unwrap_err();
        assert_eq!(err.path, "p.y");
    }
}
