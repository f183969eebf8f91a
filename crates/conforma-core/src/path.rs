//! Typed dotted-path resolution over finding data.
//!
//! Rules address finding values by dotted paths such as
//! `color_contrast.minimum_ratio`. Resolution is an explicit walk over the
//! JSON tree returning `Option`, never reflection: an absent segment simply
//! yields `None`, which the evaluator maps to `not_applicable`.

use serde_json::Value;

/// Resolve a dotted path against a finding bag.
///
/// Object segments are looked up by key; a segment that parses as an index
/// descends into arrays. Returns `None` as soon as any segment is missing.
pub fn resolve<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => {
                let index: usize = segment.parse().ok()?;
                items.get(index)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Resolve a path to a numeric value.
pub fn resolve_number(root: &Value, path: &str) -> Option<f64> {
    resolve(root, path).and_then(Value::as_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "color_contrast": {
                "minimum_ratio": 3.2,
                "failures": [
                    { "selector": ".btn", "ratio": 2.1 },
                    { "selector": "nav a", "ratio": 3.9 }
                ]
            },
            "headings": { "has_h1": true }
        })
    }

    #[test]
    fn resolves_nested_number() {
        assert_eq!(
            resolve_number(&sample(), "color_contrast.minimum_ratio"),
            Some(3.2)
        );
    }

    #[test]
    fn resolves_array_index() {
        let data = sample();
        let ratio = resolve(&data, "color_contrast.failures.1.ratio");
        assert_eq!(ratio, Some(&json!(3.9)));
    }

    #[test]
    fn missing_segment_is_none() {
        assert!(resolve(&sample(), "color_contrast.maximum_ratio").is_none());
        assert!(resolve(&sample(), "forms.labels").is_none());
    }

    #[test]
    fn scalar_cannot_be_descended() {
        assert!(resolve(&sample(), "headings.has_h1.deeper").is_none());
    }

}
