//! Array kind: element-by-element conversion against a representative
//! sample element, with per-element paths (`field[index]`).

use serde_json::Value;

use crate::config::Config;
use crate::fail::{Code, Fail};
use crate::kind::{convert_elements, json_shape, Kind, Mismatch, Sample};

pub struct ArrayKind;

impl Kind for ArrayKind {
    fn name(&self) -> &str {
        "array"
    }

    fn priority(&self) -> i32 {
        30
    }

    fn applies_to(&self, sample: &Sample) -> bool {
        matches!(sample, Sample::Array(_) | Sample::Json(Value::Array(_)))
    }

    fn mismatch(&self, input: &Value, _sample: &Sample) -> Mismatch {
        if input.is_array() {
            Mismatch::Parse
        } else {
            Mismatch::Expected(format!("expected an array, got {}", json_shape(input)))
        }
    }

    fn parse(
        &self,
        cx: &Config,
        path: &str,
        sample: &Sample,
        input: Value,
    ) -> Result<Value, Fail> {
        let Value::Array(elems) = input else {
            // mismatch() gates parse; reaching here with a non-array means a
            // caller skipped the gate
            return Err(Fail::new(
                path,
                Code::Type,
                format!("expected an array, got {}", json_shape(&input)),
            ));
        };

        // promote a plain JSON array sample's first element to a Sample
        let rep_owned;
        let rep = match sample {
            Sample::Json(Value::Array(values)) => match values.first() {
                Some(v) => {
                    rep_owned = Sample::Json(v.clone());
                    Some(&rep_owned)
                }
                None => None,
            },
            other => other.element(),
        };

        let mut out = Vec::new();
        convert_elements(cx, path, rep, elems, |v| out.push(v))?;
        Ok(Value::Array(out))
    }
}
