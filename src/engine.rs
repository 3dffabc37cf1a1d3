//! The recursive parse/validate engine.
//!
//! `parse_fields` walks a compiled schema's fields in declaration order
//! against an input object and either assembles the fully parsed result or
//! stops at the first [`Fail`]. Per field: required/default resolution, then
//! allowed+fallback substitution, then the kind's shape test, then the
//! constraint chain on the raw value, then the kind's (possibly recursive)
//! conversion.
//!
//! Tie-breaks: fallback substitution precedes type and constraint checks;
//! constraint checks run on the raw pre-parse value (nested values are
//! validated by their own schema during descent); the first fail in field
//! order is the one reported.

use serde_json::Value;

use crate::config::Config;
use crate::de;
use crate::fail::{join_path, CheckError, Code, Fail, ParseError};
use crate::kind::{json_shape, Mismatch};
use crate::schema::{Compiled, Required};

/// Recursive core: parse `input` against `compiled`, reporting fails under
/// `path`. Result construction is pure assembly — it never re-enters
/// validation.
pub(crate) fn parse_fields(
    cx: &Config,
    compiled: &Compiled,
    path: &str,
    input: &Value,
) -> Result<Value, Fail> {
    let Value::Object(map) = input else {
        return Err(Fail::new(
            path,
            Code::Type,
            format!("expected a {} object, got {}", compiled.name(), json_shape(input)),
        ));
    };

    let mut out = serde_json::Map::new();
    for field in compiled.slots() {
        let key = cx.input_key(&field.name);

        // missing = absent or null
        let mut value = match map.get(&key) {
            Some(v) if !v.is_null() => v.clone(),
            _ => match field.property.required {
                Required::Optional => continue,
                Required::Required => {
                    return Err(Fail::new(join_path(path, &field.name), Code::Req, "is required"));
                }
                Required::Default => field.kind.default_to(&field.property.sample),
            },
        };

        // allowed+fallback substitution, before type and constraint checks;
        // the fallback is trusted to satisfy both
        if let (Some(allowed), Some(fallback)) = (&field.property.allowed, &field.property.fallback)
        {
            if !allowed.contains(&value) {
                value = fallback.clone();
            }
        }

        match field.kind.mismatch(&value, &field.property.sample) {
            Mismatch::Expected(message) => {
                return Err(Fail::new(join_path(path, &field.name), Code::Type, message));
            }
            Mismatch::AlreadyValid => {
                out.insert(field.name.clone(), value);
                continue;
            }
            Mismatch::Parse => {}
        }

        for check in &field.checks {
            if let Some(fail) = check.run(&field.name, &value) {
                return Err(fail.prefixed(path));
            }
        }

        let at = join_path(path, &field.name);
        match field.kind.parse(cx, &at, &field.property.sample, value) {
            Ok(v) => {
                out.insert(field.name.clone(), v);
            }
            Err(fail) if cx.skip_invalid && field.property.required == Required::Optional => {
                // demote to a warning and omit the field
                cx.warn(&fail);
            }
            Err(fail) => return Err(fail),
        }
    }

    let mut result = Value::Object(out);
    if let Some(augment) = &cx.augment {
        result = augment(result);
    }
    Ok(result)
}

impl Compiled {
    /// Parse an input object, returning the typed result or the first
    /// [`Fail`] encountered in field order.
    pub fn run(&self, input: &Value) -> Result<Value, Fail> {
        tracing::trace!(schema = %self.name(), "parse");
        parse_fields(self.config(), self, "", input)
    }

    /// Like [`run`](Compiled::run), but the failure arrives as a raiseable
    /// error displaying `"<dotted.path>: <message>"`.
    pub fn raise(&self, input: &Value) -> Result<Value, CheckError> {
        self.run(input).map_err(CheckError)
    }

    /// Parse JSON text. Malformed JSON is reported with the JSON path at
    /// which decoding failed; validation failures raise like
    /// [`raise`](Compiled::raise).
    pub fn parse_str(&self, src: &str) -> Result<Value, ParseError> {
        let input: Value = de::from_str_with_path(src)?;
        Ok(self.raise(&input)?)
    }

    /// Parse JSON text that must be an array of inputs; each element is
    /// parsed with this schema. Non-array input is a hard error, not a
    /// validation failure.
    pub fn parse_array_str(&self, src: &str) -> Result<Vec<Value>, ParseError> {
        let input: Value = de::from_str_with_path(src)?;
        let Value::Array(items) = input else {
            return Err(ParseError::NotAnArray);
        };
        items.iter().map(|item| Ok(self.raise(item)?)).collect()
    }

    /// Ad hoc single-field check (interactive form validation): every fail
    /// for this value, not just the first. Unknown fields yield one
    /// `Code::Unknown` fail.
    pub fn run_one(&self, field: &str, value: &Value) -> Vec<Fail> {
        let Some(slot) = self.slot(field) else {
            return vec![Fail::new(field, Code::Unknown, "no such field")];
        };

        let mut fails = Vec::new();
        match slot.kind.mismatch(value, &slot.property.sample) {
            Mismatch::Expected(message) => fails.push(Fail::new(field, Code::Type, message)),
            Mismatch::AlreadyValid => return fails,
            Mismatch::Parse => {}
        }
        for check in &slot.checks {
            if let Some(fail) = check.run(field, value) {
                fails.push(fail);
            }
        }
        fails
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::camel_case;
    use crate::fail::Code;
    use crate::kind::{Kind, Sample};
    use crate::schema::{Property, Schema};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn config() -> Arc<Config> {
        Arc::new(Config::new())
    }

    fn user(config: &Arc<Config>) -> Arc<Compiled> {
        Schema::new("user")
            .field("name", Property::new(json!("anon")).min(1.0))
            .field("age", Property::new(json!(0)).min(0.0).max(150.0))
            .field("role", Property::new(json!("guest")).optional())
            .compile(config)
            .unwrap()
    }

    #[test]
    fn sample_instance_always_parses_to_itself() {
        let user = user(&config());
        let sample = user.sample_value();
        assert_eq!(user.run(&sample).unwrap(), sample);
    }

    #[test]
    fn first_fail_in_field_order_wins() {
        let user = user(&config());
        // both name and age invalid; name is declared first
        let fail = user.run(&json!({"name": "", "age": -1})).unwrap_err();
        assert_eq!(fail.path, "name");
        assert_eq!(fail.code, Code::Min);
    }

    #[test]
    fn max_bound_fails_over_the_limit() {
        let user = user(&config());
        let fail = user.run(&json!({"name": "a", "age": 151})).unwrap_err();
        assert_eq!(fail.path, "age");
        assert_eq!(fail.code, Code::Max);
        assert!(fail.message.contains("150"));
        assert!(user.run(&json!({"name": "a", "age": 150})).is_ok());
    }

    #[test]
    fn required_mode_laws() {
        let cx = config();
        let schema = Schema::new("modes")
            .field("must", Property::new(json!(1)))
            .field("maybe", Property::new(json!(2)).optional())
            .field("deflt", Property::new(json!(3)).default_on_missing())
            .compile(&cx)
            .unwrap();

        // required + missing → REQ
        let fail = schema.run(&json!({})).unwrap_err();
        assert_eq!((fail.path.as_str(), fail.code), ("must", Code::Req));

        // optional missing → absent; default missing → the sample value
        let out = schema.run(&json!({"must": 9})).unwrap();
        assert_eq!(out, json!({"must": 9, "deflt": 3}));
        assert!(out.get("maybe").is_none());

        // null counts as missing
        let out = schema.run(&json!({"must": 9, "maybe": null, "deflt": null})).unwrap();
        assert_eq!(out, json!({"must": 9, "deflt": 3}));
    }

    #[test]
    fn allowed_without_fallback_fails() {
        let cx = config();
        let schema = Schema::new("s")
            .field("color", Property::new(json!("red")).allowed(vec![json!("red"), json!("blue")]))
            .compile(&cx)
            .unwrap();
        let fail = schema.run(&json!({"color": "green"})).unwrap_err();
        assert_eq!(fail.code, Code::Allowed);
    }

    #[test]
    fn allowed_with_fallback_substitutes_silently() {
        let cx = config();
        let schema = Schema::new("s")
            .field(
                "color",
                Property::new(json!("red"))
                    .allowed(vec![json!("red"), json!("blue")])
                    .fallback(json!("red")),
            )
            .compile(&cx)
            .unwrap();
        let out = schema.run(&json!({"color": "green"})).unwrap();
        assert_eq!(out, json!({"color": "red"}));
    }

    #[test]
    fn type_mismatch_reports_the_field_path() {
        let user = user(&config());
        let fail = user.run(&json!({"name": 5, "age": 1})).unwrap_err();
        assert_eq!(fail.path, "name");
        assert_eq!(fail.code, Code::Type);
        assert_eq!(fail.message, "expected a string, got a number");
    }

    #[test]
    fn nested_failures_carry_dotted_paths() {
        let cx = config();
        let point = Schema::new("point")
            .field("x", Property::new(json!(0)))
            .field("y", Property::new(json!(0)))
            .compile(&cx)
            .unwrap();
        let shape = Schema::new("shape")
            .field("origin", Property::new(point))
            .compile(&cx)
            .unwrap();
        let fail = shape.run(&json!({"origin": {"x": 1, "y": "no"}})).unwrap_err();
        assert_eq!(fail.path, "origin.y");
        assert_eq!(fail.code, Code::Type);
    }

    #[test]
    fn array_element_failures_use_original_indices() {
        let cx = config();
        let schema = Schema::new("s")
            .field("xs", Property::new(json!([0])))
            .compile(&cx)
            .unwrap();
        let fail = schema.run(&json!({"xs": [1, 2, "three"]})).unwrap_err();
        assert_eq!(fail.path, "xs[2]");
    }

    #[test]
    fn skip_policy_prunes_bad_elements_and_warns_with_original_indices() {
        let warned: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = warned.clone();
        let cx = Arc::new(
            Config::new()
                .skip_invalid(true)
                .warn_sink(move |fail| sink.lock().unwrap().push(fail.path.clone())),
        );

        let item = Schema::new("item")
            .field("n", Property::new(json!(0)).min(0.0))
            .compile(&cx)
            .unwrap();
        let schema = Schema::new("s")
            .field("a", Property::new(Sample::Array(vec![Sample::Schema(item)])))
            .compile(&cx)
            .unwrap();

        let out = schema
            .run(&json!({"a": [{"n": -1}, {"n": 2}, {"n": -3}, {"n": 4}, {"n": -5}]}))
            .unwrap();
        assert_eq!(out, json!({"a": [{"n": 2}, {"n": 4}]}));
        assert_eq!(*warned.lock().unwrap(), vec!["a[0].n", "a[2].n", "a[4].n"]);
    }

    #[test]
    fn skip_policy_omits_invalid_optional_nested_objects() {
        let warned: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = warned.clone();
        let cx = Arc::new(
            Config::new()
                .skip_invalid(true)
                .warn_sink(move |fail| sink.lock().unwrap().push(fail.to_string())),
        );

        let inner = Schema::new("inner")
            .field("n", Property::new(json!(0)))
            .compile(&cx)
            .unwrap();
        let schema = Schema::new("s")
            .field("opt", Property::new(inner.clone()).optional())
            .field("req", Property::new(inner))
            .compile(&cx)
            .unwrap();

        // invalid optional nested object → omitted with a warning
        let out = schema
            .run(&json!({"opt": {"n": "bad"}, "req": {"n": 1}}))
            .unwrap();
        assert_eq!(out, json!({"req": {"n": 1}}));
        assert_eq!(warned.lock().unwrap().len(), 1);

        // invalid required nested object still fails the parse
        let fail = schema
            .run(&json!({"opt": {"n": 1}, "req": {"n": "bad"}}))
            .unwrap_err();
        assert_eq!(fail.path, "req.n");
    }

    #[test]
    fn parsing_is_idempotent() {
        let cx = config();
        let point = Schema::new("point")
            .field("x", Property::new(json!(0)))
            .field("y", Property::new(json!(0)))
            .compile(&cx)
            .unwrap();
        let shape = Schema::new("shape")
            .field("origin", Property::new(point))
            .field("tags", Property::new(json!([""])).default_on_missing())
            .compile(&cx)
            .unwrap();

        let once = shape.run(&json!({"origin": {"x": 3, "y": 4}})).unwrap();
        let twice = shape.run(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn self_referential_schema_parses_a_chain() {
        let cx = config();
        let node = Schema::new("node")
            .field("value", Property::new(json!("")))
            .field("next", Property::new(json!(null)).optional())
            .compile(&cx)
            .unwrap();
        node.recurse("next", node.clone()).unwrap();

        let out = node.run(&json!({"value": "a", "next": {"value": "b"}})).unwrap();
        assert_eq!(out, json!({"value": "a", "next": {"value": "b"}}));
        assert!(out.pointer("/next/next").is_none());

        // the chain is validated all the way down
        let fail = node
            .run(&json!({"value": "a", "next": {"value": 5}}))
            .unwrap_err();
        assert_eq!(fail.path, "next.value");
    }

    #[test]
    fn recursed_sample_revalidates_with_the_back_edge_omitted() {
        let cx = config();
        let node = Schema::new("node")
            .field("value", Property::new(json!("")))
            .field("next", Property::new(json!(null)).optional())
            .compile(&cx)
            .unwrap();
        node.recurse("next", node.clone()).unwrap();

        let sample = node.sample_value();
        assert_eq!(sample, json!({"value": "", "next": null}));
        // null counts as missing, so the optional back-edge comes back
        // absent rather than null: valid, but not deep-equal to the sample
        let out = node.run(&sample).unwrap();
        assert_eq!(out, json!({"value": ""}));
    }

    #[test]
    fn rename_strategy_reads_camel_case_input() {
        let cx = Arc::new(Config::new().rename(camel_case));
        let schema = Schema::new("s")
            .field("user_name", Property::new(json!("anon")))
            .compile(&cx)
            .unwrap();
        let out = schema.run(&json!({"userName": "alice"})).unwrap();
        // output keys stay as declared
        assert_eq!(out, json!({"user_name": "alice"}));
    }

    #[test]
    fn augment_hook_wraps_every_constructed_object() {
        let cx = Arc::new(Config::new().augment(|mut v| {
            if let Value::Object(map) = &mut v {
                map.insert("checked".to_string(), json!(true));
            }
            v
        }));
        let point = Schema::new("point")
            .field("x", Property::new(json!(0)))
            .compile(&cx)
            .unwrap();
        let shape = Schema::new("shape")
            .field("origin", Property::new(point))
            .compile(&cx)
            .unwrap();
        let out = shape.run(&json!({"origin": {"x": 1}})).unwrap();
        assert_eq!(
            out,
            json!({"origin": {"x": 1, "checked": true}, "checked": true})
        );
    }

    #[test]
    fn raise_message_is_path_colon_message() {
        let user = user(&config());
        let err = user.raise(&json!({"age": 1})).unwrap_err();
        assert_eq!(err.to_string(), "name: is required");
    }

    #[test]
    fn parse_str_reports_json_errors_with_a_path() {
        let user = user(&config());
        let err = user.parse_str("{\"name\": \"a\", \"age\": }").unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));

        let out = user.parse_str("{\"name\": \"a\", \"age\": 7}").unwrap();
        assert_eq!(out, json!({"name": "a", "age": 7}));
    }

    #[test]
    fn parse_array_str_requires_an_array() {
        let user = user(&config());
        assert!(matches!(
            user.parse_array_str("{\"name\": \"a\"}"),
            Err(ParseError::NotAnArray)
        ));
        let out = user
            .parse_array_str("[{\"name\": \"a\", \"age\": 1}, {\"name\": \"b\", \"age\": 2}]")
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1], json!({"name": "b", "age": 2}));
    }

    #[test]
    fn parse_array_str_raises_on_a_failing_element() {
        let user = user(&config());
        let err = user
            .parse_array_str("[{\"name\": \"a\", \"age\": 1}, {\"name\": \"b\", \"age\": -1}]")
            .unwrap_err();
        let ParseError::Check(CheckError(fail)) = err else {
            panic!("expected a validation failure, got {err:?}");
        };
        assert_eq!(fail.path, "age");
        assert_eq!(fail.code, Code::Min);
    }

    #[test]
    fn run_one_collects_every_fail_for_the_field() {
        let cx = config();
        let schema = Schema::new("form")
            .field(
                "code",
                Property::new(json!("00")).min(2.0).max(4.0).regex(r"^\d+$"),
            )
            .compile(&cx)
            .unwrap();

        let fails = schema.run_one("code", &json!("x"));
        let codes: Vec<&Code> = fails.iter().map(|f| &f.code).collect();
        assert_eq!(codes, [&Code::Min, &Code::Regex]);

        assert!(schema.run_one("code", &json!("1234")).is_empty());

        let fails = schema.run_one("missing", &json!(1));
        assert_eq!(fails[0].code, Code::Unknown);
    }

    #[test]
    fn non_object_input_is_a_type_fail() {
        let user = user(&config());
        let fail = user.run(&json!([1, 2])).unwrap_err();
        assert_eq!(fail.code, Code::Type);
        assert_eq!(fail.message, "expected a user object, got an array");
    }

    // a user-registered kind: big integers encoded as numeric strings
    struct BigIntKind;

    impl Kind for BigIntKind {
        fn name(&self) -> &str {
            "bigint"
        }
        fn priority(&self) -> i32 {
            10 // above plain, below the structured built-ins
        }
        fn applies_to(&self, sample: &Sample) -> bool {
            matches!(sample, Sample::Json(Value::String(s))
                if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        }
        fn default_to(&self, sample: &Sample) -> Value {
            match sample {
                Sample::Json(Value::String(s)) => {
                    s.parse::<u64>().map(Value::from).unwrap_or(Value::Null)
                }
                _ => Value::Null,
            }
        }
        fn mismatch(&self, input: &Value, _sample: &Sample) -> Mismatch {
            match input {
                // already converted: re-validation is a no-op
                Value::Number(_) => Mismatch::AlreadyValid,
                Value::String(_) => Mismatch::Parse,
                other => Mismatch::Expected(format!(
                    "expected a numeric string, got {}",
                    json_shape(other)
                )),
            }
        }
        fn parse(
            &self,
            _cx: &Config,
            path: &str,
            _sample: &Sample,
            input: Value,
        ) -> Result<Value, Fail> {
            let Value::String(s) = &input else {
                return Ok(input);
            };
            s.parse::<u64>().map(Value::from).map_err(|_| {
                Fail::new(
                    path,
                    Code::Custom("BIGINT".to_string()),
                    format!("\"{s}\" is not a big integer"),
                )
            })
        }
    }

    #[test]
    fn registered_kind_shadows_the_plain_fallback() {
        let mut cx = Config::new();
        cx.registry.register(Arc::new(BigIntKind));
        let cx = Arc::new(cx);

        let schema = Schema::new("ledger")
            .field("balance", Property::new(json!("0")))
            .compile(&cx)
            .unwrap();

        // valid numeric string converts
        let out = schema.run(&json!({"balance": "18446744073709551615"})).unwrap();
        assert_eq!(out, json!({"balance": 18446744073709551615u64}));

        // invalid input fails with the kind's own code
        let fail = schema.run(&json!({"balance": "12a3"})).unwrap_err();
        assert_eq!(fail.path, "balance");
        assert_eq!(fail.code, Code::Custom("BIGINT".to_string()));

        // an already-converted number is used as-is (AlreadyValid arm)
        let out = schema.run(&json!({"balance": 42})).unwrap();
        assert_eq!(out, json!({"balance": 42}));

        // default_on_missing goes through the kind's converted default
        let schema = Schema::new("ledger")
            .field("balance", Property::new(json!("7")).default_on_missing())
            .compile(&cx)
            .unwrap();
        assert_eq!(schema.run(&json!({})).unwrap(), json!({"balance": 7}));
    }

    #[test]
    fn custom_checker_runs_last_and_uses_its_own_code() {
        let cx = config();
        let schema = Schema::new("s")
            .field(
                "port",
                Property::new(json!(80)).min(1.0).custom(|v| {
                    let n = v.as_u64()?;
                    (n == 666).then(|| {
                        Fail::new("port", Code::Custom("CURSED".to_string()), "not that one")
                    })
                }),
            )
            .compile(&cx)
            .unwrap();

        assert!(schema.run(&json!({"port": 8080})).is_ok());
        // min fires before custom
        let fail = schema.run(&json!({"port": 0})).unwrap_err();
        assert_eq!(fail.code, Code::Min);
        let fail = schema.run(&json!({"port": 666})).unwrap_err();
        assert_eq!(fail.code, Code::Custom("CURSED".to_string()));
    }
}
