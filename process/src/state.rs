//! Derive the genesis state of a process from its tags.
//!
//! A process carries its initial state in the tags of the transaction that created it: each tag
//! name is a key and each tag value is that key's serialized (JSON) value. Values that do not
//! parse as JSON are kept as plain strings, so a tag like `Contract-Src=foobar` yields
//! `"Contract-Src": "foobar"`.

use cu_gateway::Tag;
use serde_json::{Map, Value};

/// Fold `tags` into a state object.
///
/// Keys keep the order in which their names first appear. When a name appears more than once,
/// the last occurrence wins.
pub fn synthesize(tags: &[Tag]) -> Value {
    let mut state = Map::new();
    for tag in tags {
        let value = serde_json::from_str(&tag.value)
            .unwrap_or_else(|_| Value::String(tag.value.clone()));
        state.insert(tag.name.clone(), value);
    }
    Value::Object(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_synthesize() {
        let tags = vec![
            Tag::new("Contract-Src", "foobar"),
            Tag::new("Data-Protocol", "ao"),
            Tag::new("ao-type", "process"),
            Tag::new("inbox", "[]"),
            Tag::new(
                "balances",
                r#"{"myOVEwyX7QKFaPkXo3Wlib-Q80MOf5xyjL9ZyvYSVYc":1000}"#,
            ),
        ];
        assert_eq!(
            synthesize(&tags),
            json!({
                "Contract-Src": "foobar",
                "Data-Protocol": "ao",
                "ao-type": "process",
                "inbox": [],
                "balances": { "myOVEwyX7QKFaPkXo3Wlib-Q80MOf5xyjL9ZyvYSVYc": 1000 },
            })
        );
    }

    #[test]
    fn test_synthesize_scalars() {
        let tags = vec![
            Tag::new("count", "42"),
            Tag::new("ratio", "0.5"),
            Tag::new("enabled", "true"),
            Tag::new("owner", "null"),
            Tag::new("quoted", r#""ao""#),
            Tag::new("empty", ""),
        ];
        assert_eq!(
            synthesize(&tags),
            json!({
                "count": 42,
                "ratio": 0.5,
                "enabled": true,
                "owner": null,
                "quoted": "ao",
                "empty": "",
            })
        );
    }

    #[test]
    fn test_synthesize_duplicates() {
        let tags = vec![
            Tag::new("Nonce", "1"),
            Tag::new("Other", "x"),
            Tag::new("Nonce", "2"),
        ];
        assert_eq!(synthesize(&tags), json!({ "Nonce": 2, "Other": "x" }));
    }

    #[test]
    fn test_synthesize_preserves_tag_order() {
        let tags = vec![
            Tag::new("zeta", "1"),
            Tag::new("Contract-Src", "foobar"),
            Tag::new("alpha", "2"),
            Tag::new("zeta", "3"),
        ];
        let state = synthesize(&tags);
        let keys = state.as_object().unwrap().keys().collect::<Vec<_>>();
        assert_eq!(keys, ["zeta", "Contract-Src", "alpha"]);
        assert_eq!(state["zeta"], json!(3));
    }

    #[test]
    fn test_synthesize_empty() {
        assert_eq!(synthesize(&[]), json!({}));
    }
}
