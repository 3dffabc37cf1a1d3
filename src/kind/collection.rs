//! Generic collection kind: accepts JSON-array input and rebuilds it through
//! a [`CollectionSpec`]'s empty/insert operations (e.g. a dedup'ing set).

use serde_json::Value;

use crate::config::Config;
use crate::fail::Fail;
use crate::kind::{convert_elements, json_shape, Kind, Mismatch, Sample};

pub struct CollectionKind;

impl Kind for CollectionKind {
    fn name(&self) -> &str {
        "collection"
    }

    fn priority(&self) -> i32 {
        25
    }

    fn applies_to(&self, sample: &Sample) -> bool {
        matches!(sample, Sample::Collection(..))
    }

    fn mismatch(&self, input: &Value, sample: &Sample) -> Mismatch {
        let name = match sample {
            Sample::Collection(spec, _) => spec.name.as_str(),
            _ => "collection",
        };
        if input.is_array() {
            Mismatch::Parse
        } else {
            Mismatch::Expected(format!(
                "expected an array (for {name}), got {}",
                json_shape(input)
            ))
        }
    }

    fn parse(
        &self,
        cx: &Config,
        path: &str,
        sample: &Sample,
        input: Value,
    ) -> Result<Value, Fail> {
        let Sample::Collection(spec, samples) = sample else {
            return plainly(input);
        };
        let Value::Array(elems) = input else {
            return plainly(input);
        };

        let mut out = (spec.empty)();
        let spec = spec.clone();
        convert_elements(cx, path, samples.first(), elems, |v| (spec.insert)(&mut out, v))?;
        Ok(out)
    }
}

// applies_to/mismatch gate parse; off-contract calls pass through
fn plainly(input: Value) -> Result<Value, Fail> {
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::set_spec;
    use serde_json::json;

    #[test]
    fn set_input_dedups_on_insert() {
        let cx = Config::new();
        let sample = Sample::Collection(set_spec(), vec![Sample::Json(json!(""))]);
        let out = CollectionKind
            .parse(&cx, "tags", &sample, json!(["a", "b", "a"]))
            .unwrap();
        assert_eq!(out, json!(["a", "b"]));
    }

    #[test]
    fn mismatch_names_the_collection() {
        let sample = Sample::Collection(set_spec(), vec![]);
        let m = CollectionKind.mismatch(&json!(5), &sample);
        assert_eq!(
            m,
            Mismatch::Expected("expected an array (for set), got a number".to_string())
        );
    }
}
