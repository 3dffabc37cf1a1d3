//! Fallback kind for plain JSON values. Always applies; matches input shape
//! against the sample's shape and passes the value through unchanged.

use serde_json::Value;

use crate::config::Config;
use crate::fail::Fail;
use crate::kind::{json_shape, Kind, Mismatch, Sample};

pub struct PlainKind;

impl Kind for PlainKind {
    fn name(&self) -> &str {
        "plain"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn applies_to(&self, _sample: &Sample) -> bool {
        true
    }

    fn mismatch(&self, input: &Value, sample: &Sample) -> Mismatch {
        let want = match sample {
            // a null sample carries no shape evidence: accept anything
            Sample::Json(Value::Null) => return Mismatch::Parse,
            Sample::Json(v) => json_shape(v),
            // non-JSON samples only reach the fallback in hand-built
            // registries; treat them as shapeless
            _ => return Mismatch::Parse,
        };
        let got = json_shape(input);
        if want == got {
            Mismatch::Parse
        } else {
            Mismatch::Expected(format!("expected {want}, got {got}"))
        }
    }

    fn parse(
        &self,
        _cx: &Config,
        _path: &str,
        _sample: &Sample,
        input: Value,
    ) -> Result<Value, Fail> {
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn same_shape_proceeds() {
        let sample = Sample::Json(json!("anon"));
        assert_eq!(PlainKind.mismatch(&json!("alice"), &sample), Mismatch::Parse);
    }

    #[test]
    fn different_shape_is_a_type_error() {
        let sample = Sample::Json(json!(0));
        let m = PlainKind.mismatch(&json!("x"), &sample);
        assert_eq!(
            m,
            Mismatch::Expected("expected a number, got a string".to_string())
        );
    }

    #[test]
    fn null_sample_accepts_anything() {
        let sample = Sample::Json(json!(null));
        assert_eq!(PlainKind.mismatch(&json!({"k": 1}), &sample), Mismatch::Parse);
    }
}
