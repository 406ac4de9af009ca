//! Untyped config map → typed plugin config.
//!
//! Recipes carry plugin configuration as an open YAML map. Each plugin
//! declares a deserializable config struct and funnels the map through
//! [`build_config`]; every shape mismatch surfaces as
//! [`PluginError::InvalidConfig`] so validation output stays uniform
//! across plugins.

use serde::de::DeserializeOwned;
use serde_yaml::Value;

use crate::errors::PluginError;
use crate::traits::ConfigMap;

/// Deserializes a recipe config map into a plugin's typed config.
pub fn build_config<T: DeserializeOwned>(config: &ConfigMap) -> Result<T, PluginError> {
    let mut mapping = serde_yaml::Mapping::new();
    for (key, value) in config {
        mapping.insert(Value::String(key.clone()), value.clone());
    }
    serde_yaml::from_value(Value::Mapping(mapping))
        .map_err(|err| PluginError::InvalidConfig(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct SampleConfig {
        path: String,
        #[serde(default)]
        overwrite: bool,
    }

    fn config_with(entries: &[(&str, Value)]) -> ConfigMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn builds_typed_config_from_map() {
        let map = config_with(&[("path", Value::String("/tmp/out.ndjson".into()))]);
        let cfg: SampleConfig = build_config(&map).unwrap();
        assert_eq!(
            cfg,
            SampleConfig {
                path: "/tmp/out.ndjson".into(),
                overwrite: false,
            }
        );
    }

    #[test]
    fn missing_required_key_is_invalid_config() {
        let map = ConfigMap::new();
        let err = build_config::<SampleConfig>(&map).unwrap_err();
        assert!(err.is_invalid_config());
        assert!(err.to_string().contains("path"));
    }

    #[test]
    fn wrong_type_is_invalid_config() {
        let map = config_with(&[("path", Value::Bool(true))]);
        let err = build_config::<SampleConfig>(&map).unwrap_err();
        assert!(err.is_invalid_config());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let map = config_with(&[
            ("path", Value::String("x".into())),
            ("batch_size", Value::Number(10.into())),
        ]);
        assert!(build_config::<SampleConfig>(&map).is_ok());
    }
}
