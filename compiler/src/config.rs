use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::DealError;
use crate::error_code::is_error_code_valid;

lazy_static! {
    static ref GO_IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Knobs of the Go mock generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratorConfig {
    /// Go package of the generated file. `None` places the mocks in the
    /// package of the protobuf types.
    pub package_name:   Option<String>,
    /// Prepended to `<Service>Server` to name each mock type.
    pub stub_prefix:    String,
    /// Status code returned when no contract case matches a request.
    pub unmatched_code: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            package_name:   None,
            stub_prefix:    "Stub".to_string(),
            unmatched_code: "Unimplemented".to_string(),
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), DealError> {
        if let Some(name) = &self.package_name {
            if !GO_IDENTIFIER.is_match(name) {
                return Err(DealError::InvalidConfig(format!(
                    "package name \"{}\" is not a Go identifier",
                    name
                )));
            }
        }
        if !GO_IDENTIFIER.is_match(&self.stub_prefix) {
            return Err(DealError::InvalidConfig(format!(
                "stub prefix \"{}\" is not a Go identifier",
                self.stub_prefix
            )));
        }
        if !is_error_code_valid(&self.unmatched_code) {
            return Err(DealError::InvalidErrorCode(self.unmatched_code.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = GeneratorConfig::default();
        assert_eq!(config.stub_prefix, "Stub");
        assert_eq!(config.unmatched_code, "Unimplemented");
        assert!(config.package_name.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn rejects_bad_values() {
        let config = GeneratorConfig { unmatched_code: "Nope".into(), ..Default::default() };
        assert!(matches!(config.validate(), Err(DealError::InvalidErrorCode(ref code)) if code == "Nope"));

        let config = GeneratorConfig { stub_prefix: "1Stub".into(), ..Default::default() };
        assert!(matches!(config.validate(), Err(DealError::InvalidConfig(_))));

        let config = GeneratorConfig { package_name: Some("my-mocks".into()), ..Default::default() };
        assert!(matches!(config.validate(), Err(DealError::InvalidConfig(_))));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: GeneratorConfig = serde_json::from_str(r#"{"packageName": "mocks"}"#).unwrap();
        assert_eq!(config.package_name.as_deref(), Some("mocks"));
        assert_eq!(config.stub_prefix, "Stub");
    }
}
