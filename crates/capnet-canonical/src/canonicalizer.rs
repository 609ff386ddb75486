// canonicalizer.rs — Stable JSON rendering with domain prefixes.
//
// The canonical form is the only interoperable signing surface: object
// keys sorted byte-wise at every depth, arrays kept in order, no
// whitespace, UTF-8. Anything that would render ambiguously across JSON
// implementations is rejected instead of coerced, so a signature can
// never be computed over bytes a peer would reproduce differently.

use serde_json::Value;

use crate::domain::Domain;

/// Largest integer magnitude that round-trips through every mainstream
/// JSON implementation (2^53 - 1).
pub const MAX_SAFE_INTEGER: i128 = 9_007_199_254_740_991;

/// Error returned when a value cannot be canonicalized.
#[derive(Debug, thiserror::Error)]
pub enum CanonicalError {
    /// An integer outside the safe range was encountered.
    #[error("integer at '{path}' outside safe range: {value}")]
    UnsafeInteger { path: String, value: String },
    /// A non-finite number was encountered.
    #[error("non-finite number at '{path}'")]
    NonFiniteNumber { path: String },
    /// The input could not be converted to a plain JSON value.
    #[error("value is not JSON-representable: {0}")]
    NotRepresentable(String),
}

/// Canonicalize `value` under `domain`: domain prefix + stable JSON bytes.
pub fn canonicalize(domain: Domain, value: &Value) -> Result<Vec<u8>, CanonicalError> {
    let mut out = domain.prefix();
    write_value(value, &mut out, "")?;
    Ok(out.into_bytes())
}

/// Render `value` as stable JSON (no domain prefix). Exposed for tests
/// and for callers that hash rather than sign.
pub fn stable_json(value: &Value) -> Result<String, CanonicalError> {
    let mut out = String::new();
    write_value(value, &mut out, "")?;
    Ok(out)
}

fn write_value(value: &Value, out: &mut String, path: &str) -> Result<(), CanonicalError> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            check_number(n, path)?;
            out.push_str(&n.to_string());
        }
        Value::String(s) => {
            // serde_json's string rendering handles escaping; it is
            // deterministic for a given input.
            out.push_str(&serde_json::to_string(s).map_err(|e| {
                CanonicalError::NotRepresentable(e.to_string())
            })?);
        }
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                let item_path = format!("{}[{}]", path, idx);
                write_value(item, out, &item_path)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            // Sort keys byte-wise rather than trusting the map's own
            // iteration order; serde_json's order is a feature flag away
            // from insertion order.
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push('{');
            for (idx, key) in keys.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key).map_err(|e| {
                    CanonicalError::NotRepresentable(e.to_string())
                })?);
                out.push(':');
                let child_path = if path.is_empty() {
                    (*key).clone()
                } else {
                    format!("{}.{}", path, key)
                };
                write_value(&map[*key], out, &child_path)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

/// Reject numbers that would render ambiguously: integers beyond the
/// safe range and non-finite floats.
fn check_number(n: &serde_json::Number, path: &str) -> Result<(), CanonicalError> {
    if let Some(i) = n.as_i64() {
        if (i as i128).abs() > MAX_SAFE_INTEGER {
            return Err(CanonicalError::UnsafeInteger {
                path: path.to_string(),
                value: n.to_string(),
            });
        }
        return Ok(());
    }
    if let Some(u) = n.as_u64() {
        if (u as i128) > MAX_SAFE_INTEGER {
            return Err(CanonicalError::UnsafeInteger {
                path: path.to_string(),
                value: n.to_string(),
            });
        }
        return Ok(());
    }
    match n.as_f64() {
        Some(f) if f.is_finite() => {
            // Integer-valued floats beyond the safe range are the same
            // hazard as big integers.
            if f.fract() == 0.0 && f.abs() > MAX_SAFE_INTEGER as f64 {
                return Err(CanonicalError::UnsafeInteger {
                    path: path.to_string(),
                    value: n.to_string(),
                });
            }
            Ok(())
        }
        _ => Err(CanonicalError::NonFiniteNumber {
            path: path.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_sorted_at_every_depth() {
        let v = json!({"z": {"b": 1, "a": 2}, "a": [{"y": 1, "x": 2}]});
        let s = stable_json(&v).unwrap();
        assert_eq!(s, r#"{"a":[{"x":2,"y":1}],"z":{"a":2,"b":1}}"#);
    }

    #[test]
    fn deep_equal_values_canonicalize_identically() {
        // Same logical object built with different key order.
        let a: Value = serde_json::from_str(r#"{"x": 1, "y": {"p": true, "q": null}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"y": {"q": null, "p": true}, "x": 1}"#).unwrap();
        assert_eq!(
            canonicalize(Domain::Capdoc, &a).unwrap(),
            canonicalize(Domain::Capdoc, &b).unwrap()
        );
    }

    #[test]
    fn array_order_preserved() {
        let v = json!([3, 1, 2]);
        assert_eq!(stable_json(&v).unwrap(), "[3,1,2]");
    }

    #[test]
    fn domain_prefix_prepended() {
        let v = json!({});
        let bytes = canonicalize(Domain::Receipt, &v).unwrap();
        assert!(bytes.starts_with(b"capnet:receipt/0.1:"));
    }

    #[test]
    fn same_body_different_domain_differs() {
        let v = json!({"k": "v"});
        let a = canonicalize(Domain::Capdoc, &v).unwrap();
        let b = canonicalize(Domain::ActionRequest, &v).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn no_insignificant_whitespace() {
        let v = json!({"a": [1, 2], "b": "x"});
        let s = stable_json(&v).unwrap();
        assert!(!s.contains(' '));
        assert!(!s.contains('\n'));
    }

    #[test]
    fn max_safe_integer_accepted() {
        let v = json!(9_007_199_254_740_991u64);
        assert_eq!(stable_json(&v).unwrap(), "9007199254740991");
    }

    #[test]
    fn integer_beyond_safe_range_rejected() {
        let v = json!({"amount": 9_007_199_254_740_992u64});
        let err = stable_json(&v).unwrap_err();
        match err {
            CanonicalError::UnsafeInteger { path, .. } => assert_eq!(path, "amount"),
            other => panic!("expected UnsafeInteger, got {:?}", other),
        }
    }

    #[test]
    fn negative_integer_beyond_safe_range_rejected() {
        let v = json!(-9_007_199_254_740_992i64);
        assert!(matches!(
            stable_json(&v),
            Err(CanonicalError::UnsafeInteger { .. })
        ));
    }

    #[test]
    fn huge_integer_valued_float_rejected() {
        let v = json!(1.0e300);
        assert!(matches!(
            stable_json(&v),
            Err(CanonicalError::UnsafeInteger { .. })
        ));
    }

    #[test]
    fn ordinary_float_accepted() {
        let v = json!(1.5);
        assert_eq!(stable_json(&v).unwrap(), "1.5");
    }

    #[test]
    fn error_path_points_into_nested_value() {
        let v = json!({"outer": {"inner": [1, 9_007_199_254_740_992u64]}});
        match stable_json(&v).unwrap_err() {
            CanonicalError::UnsafeInteger { path, .. } => {
                assert_eq!(path, "outer.inner[1]");
            }
            other => panic!("expected UnsafeInteger, got {:?}", other),
        }
    }

    #[test]
    fn string_escaping_is_stable() {
        let v = json!({"s": "line\nbreak \"quoted\""});
        let s = stable_json(&v).unwrap();
        assert_eq!(s, r#"{"s":"line\nbreak \"quoted\""}"#);
    }

    #[test]
    fn canonical_bytes_are_utf8() {
        let v = json!({"vendor": "café"});
        let bytes = canonicalize(Domain::Capdoc, &v).unwrap();
        assert!(std::str::from_utf8(&bytes).is_ok());
    }
}
