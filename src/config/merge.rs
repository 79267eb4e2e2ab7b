//! Layer merge for builtin, user, repo and CLI config.
//!
//! Tables merge key by key and scalars take the last layer's value. Arrays
//! are replaced as a whole: `pom.developers` is the list published in every
//! POM, so a repo that names its own maintainers must end up with exactly
//! that list. Appending would keep the builtin Coditory developer in the
//! POMs of every downstream project with no way to remove it.

use serde_json::Value;

/// Deep merge `overlay` onto `base`.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Merge layers in precedence order (first is base, last wins).
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_override_keeps_siblings() {
        let base = json!({"pom": {"organization": {"name": "Coditory", "url": "https://coditory.com"}}});
        let overlay = json!({"pom": {"organization": {"name": "Acme"}}});
        let result = deep_merge(base, overlay);

        assert_eq!(result["pom"]["organization"]["name"], "Acme");
        assert_eq!(result["pom"]["organization"]["url"], "https://coditory.com");
    }

    #[test]
    fn test_developers_array_replaced() {
        let base = json!({"developers": [{"id": "a"}, {"id": "b"}]});
        let overlay = json!({"developers": [{"id": "c"}]});
        let result = deep_merge(base, overlay);

        let devs = result["developers"].as_array().unwrap();
        assert_eq!(devs.len(), 1);
        assert_eq!(devs[0]["id"], "c");
    }

    #[test]
    fn test_null_clears_value() {
        let result = deep_merge(json!({"java-api": "runtimeClasspath"}), json!({"java-api": null}));
        assert!(result["java-api"].is_null());
    }

    #[test]
    fn test_merge_layers_precedence() {
        let builtin = json!({"repository": {"nexus_url": "a", "snapshot_url": "s"}});
        let user = json!({"repository": {"nexus_url": "b"}});
        let repo = json!({"repository": {"snapshot_url": "t"}});
        let cli = json!({"repository": {"nexus_url": "c"}});

        let result = merge_layers(vec![builtin, user, repo, cli]);

        assert_eq!(result["repository"]["nexus_url"], "c");
        assert_eq!(result["repository"]["snapshot_url"], "t");
    }

    #[test]
    fn test_merge_no_layers_is_null() {
        assert!(merge_layers(vec![]).is_null());
    }
}
