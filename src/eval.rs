//! Parses the tagged JSON produced by `Runtime.evaluate`'s custom
//! serializer into a structured value.
//!
//! Tags: `ref`, `v`, `d`, `u`, `bi`, `e`, `r`, `a`, `o`, `h`, `ta`. `a`/`o`
//! nodes register their id before recursing into their children, so a
//! `ref` can backreference a sibling or itself.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;

use crate::error::{CdpError, Result};

pub type Shared<T> = Rc<RefCell<T>>;

/// A parsed evaluation result. `Array`/`Object` are reference-counted so
/// that a `ref` backreference observed later in the tree shares identity
/// with the node it points at, instead of being deep-copied.
#[derive(Debug, Clone)]
pub enum ParsedValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    NaN,
    Infinity,
    NegInfinity,
    NegZero,
    DateTime(String),
    Url(url::Url),
    BigInt(String),
    Exception {
        name: String,
        message: String,
        stack: String,
    },
    Regex {
        pattern: String,
        flags: String,
    },
    Array(Shared<Vec<ParsedValue>>),
    Object(Shared<Vec<(String, ParsedValue)>>),
    /// An index into the caller-supplied handle table (`h` tag); the
    /// core resolves this separately, it is not inlined here.
    Handle(usize),
    TypedArray {
        kind: String,
        bytes: Vec<u8>,
    },
}

/// Parses a `Runtime.evaluate` result value. `handles` is the handle
/// table the `h` tag indexes into; this function only validates the
/// index is in range, it does not resolve it.
pub fn parse(value: &Value, handles: &[Value]) -> Result<ParsedValue> {
    let mut refs = HashMap::new();
    parse_inner(value, handles, &mut refs)
}

fn parse_inner(
    value: &Value,
    handles: &[Value],
    refs: &mut HashMap<i64, ParsedValue>,
) -> Result<ParsedValue> {
    match value {
        Value::Null => Ok(ParsedValue::Null),
        Value::Bool(b) => Ok(ParsedValue::Bool(*b)),
        Value::Number(n) => Ok(ParsedValue::Number(n.as_f64().unwrap_or(0.0))),
        Value::String(s) => Ok(ParsedValue::String(s.clone())),
        Value::Object(map) => parse_tagged(map, handles, refs),
        Value::Array(_) => Err(CdpError::Usage(
            "evaluation result value cannot be a bare JSON array".to_string(),
        )),
    }
}

fn parse_tagged(
    map: &serde_json::Map<String, Value>,
    handles: &[Value],
    refs: &mut HashMap<i64, ParsedValue>,
) -> Result<ParsedValue> {
    if let Some(r) = map.get("ref") {
        let id = r
            .as_i64()
            .ok_or_else(|| CdpError::Usage("`ref` id was not an integer".to_string()))?;
        return Ok(refs.get(&id).cloned().unwrap_or(ParsedValue::Null));
    }

    if let Some(v) = map.get("v") {
        let tag = v.as_str().unwrap_or_default();
        return Ok(match tag {
            "NaN" => ParsedValue::NaN,
            "Infinity" => ParsedValue::Infinity,
            "-Infinity" => ParsedValue::NegInfinity,
            "-0" => ParsedValue::NegZero,
            _ => ParsedValue::Null, // "undefined" | "null" | unrecognized
        });
    }

    if let Some(d) = map.get("d") {
        return Ok(ParsedValue::DateTime(
            d.as_str().unwrap_or_default().to_string(),
        ));
    }

    if let Some(u) = map.get("u") {
        let raw = u.as_str().unwrap_or_default();
        let parsed = url::Url::parse(raw)
            .map_err(|err| CdpError::Usage(format!("`u` tag was not a valid URL: {err}")))?;
        return Ok(ParsedValue::Url(parsed));
    }

    if let Some(bi) = map.get("bi") {
        let raw = match bi {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Ok(ParsedValue::BigInt(raw));
    }

    if let Some(e) = map.get("e") {
        return Ok(ParsedValue::Exception {
            name: e.get("n").and_then(Value::as_str).unwrap_or_default().to_string(),
            message: e.get("m").and_then(Value::as_str).unwrap_or_default().to_string(),
            stack: e.get("s").and_then(Value::as_str).unwrap_or_default().to_string(),
        });
    }

    if let Some(r) = map.get("r") {
        return Ok(ParsedValue::Regex {
            pattern: r.get("p").and_then(Value::as_str).unwrap_or_default().to_string(),
            flags: r.get("f").and_then(Value::as_str).unwrap_or_default().to_string(),
        });
    }

    if let Some(Value::Array(items)) = map.get("a") {
        let id = map.get("id").and_then(Value::as_i64);
        let shared: Shared<Vec<ParsedValue>> = Rc::new(RefCell::new(Vec::with_capacity(items.len())));
        if let Some(id) = id {
            refs.insert(id, ParsedValue::Array(shared.clone()));
        }
        for item in items {
            let parsed = parse_inner(item, handles, refs)?;
            shared.borrow_mut().push(parsed);
        }
        return Ok(ParsedValue::Array(shared));
    }

    if let Some(Value::Array(pairs)) = map.get("o") {
        let id = map.get("id").and_then(Value::as_i64);
        let shared: Shared<Vec<(String, ParsedValue)>> =
            Rc::new(RefCell::new(Vec::with_capacity(pairs.len())));
        if let Some(id) = id {
            refs.insert(id, ParsedValue::Object(shared.clone()));
        }
        for pair in pairs {
            let key = pair.get("k").and_then(Value::as_str).unwrap_or_default();
            if key == "__proto__" {
                continue;
            }
            let v = pair.get("v").cloned().unwrap_or(Value::Null);
            let parsed = parse_inner(&v, handles, refs)?;
            shared.borrow_mut().push((key.to_string(), parsed));
        }
        return Ok(ParsedValue::Object(shared));
    }

    if let Some(h) = map.get("h") {
        let idx = h
            .as_u64()
            .ok_or_else(|| CdpError::Usage("`h` handle index was not an integer".to_string()))?
            as usize;
        if handles.get(idx).is_none() {
            return Err(CdpError::Usage(format!("handle index {idx} out of range")));
        }
        return Ok(ParsedValue::Handle(idx));
    }

    if let Some(ta) = map.get("ta") {
        let b64 = ta.get("b").and_then(Value::as_str).unwrap_or_default();
        let kind = ta.get("k").and_then(Value::as_str).unwrap_or_default().to_string();
        let bytes = BASE64
            .decode(b64)
            .map_err(|err| CdpError::Usage(format!("invalid typed array payload: {err}")))?;
        return Ok(ParsedValue::TypedArray { kind, bytes });
    }

    Ok(ParsedValue::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn passes_through_primitives() {
        assert!(matches!(parse(&json!(null), &[]).unwrap(), ParsedValue::Null));
        assert!(matches!(parse(&json!(true), &[]).unwrap(), ParsedValue::Bool(true)));
        assert!(matches!(parse(&json!(3.5), &[]).unwrap(), ParsedValue::Number(n) if n == 3.5));
    }

    #[test]
    fn decodes_v_tag_variants() {
        assert!(matches!(parse(&json!({"v": "NaN"}), &[]).unwrap(), ParsedValue::NaN));
        assert!(matches!(
            parse(&json!({"v": "-Infinity"}), &[]).unwrap(),
            ParsedValue::NegInfinity
        ));
        assert!(matches!(parse(&json!({"v": "undefined"}), &[]).unwrap(), ParsedValue::Null));
    }

    #[test]
    fn decodes_exception() {
        let v = json!({"e": {"n": "TypeError", "m": "oops", "s": "at <anonymous>"}});
        let parsed = parse(&v, &[]).unwrap();
        match parsed {
            ParsedValue::Exception { name, message, .. } => {
                assert_eq!(name, "TypeError");
                assert_eq!(message, "oops");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn array_skips_proto_and_resolves_self_ref() {
        let v = json!({
            "o": [
                {"k": "__proto__", "v": {"v": "undefined"}},
                {"k": "self", "v": {"ref": 1}},
                {"k": "n", "v": 42},
            ],
            "id": 1,
        });
        let parsed = parse(&v, &[]).unwrap();
        let ParsedValue::Object(obj) = parsed else {
            panic!("expected object");
        };
        let obj = obj.borrow();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj[0].0, "self");
        assert!(matches!(obj[0].1, ParsedValue::Object(_)));
        assert_eq!(obj[1].0, "n");
    }

    #[test]
    fn typed_array_decodes_base64() {
        let b64 = BASE64.encode([1u8, 2, 3, 4]);
        let v = json!({"ta": {"b": b64, "k": "ui8"}});
        let ParsedValue::TypedArray { kind, bytes } = parse(&v, &[]).unwrap() else {
            panic!("expected typed array");
        };
        assert_eq!(kind, "ui8");
        assert_eq!(bytes, vec![1, 2, 3, 4]);
    }
}
