//! Contract entities and the JSON/YAML loader.
//!
//! A contract lists, per service method, example calls that succeed and
//! example calls that fail with a gRPC status. Payloads stay as raw JSON
//! until the generator decodes them against the method's message types.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::DealError;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Contract {
    pub name:     String,
    #[serde(default)]
    pub services: BTreeMap<String, Service>,
}

/// Methods of one service, keyed by method name.
pub type Service = BTreeMap<String, Method>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Method {
    #[serde(default)]
    pub success_cases: Vec<SuccessCase>,
    #[serde(default)]
    pub failure_cases: Vec<FailureCase>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SuccessCase {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub request:     JsonValue,
    #[serde(default)]
    pub response:    JsonValue,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FailureCase {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub request:     JsonValue,
    pub error:       GrpcError,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrpcError {
    pub error_code: String,
    #[serde(default)]
    pub message:    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractFormat {
    Json,
    Yaml,
}

impl ContractFormat {
    /// Picks the decoder from the file extension.
    pub fn from_path(path: &Path) -> Result<ContractFormat, DealError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(ContractFormat::Json),
            Some("yaml") | Some("yml") => Ok(ContractFormat::Yaml),
            _ => Err(DealError::InvalidContract(
                "invalid contract extension, supported formats are json and yaml".to_string(),
            )),
        }
    }
}

/// Decodes a contract from text in the given format.
pub fn parse_contract(text: &str, format: ContractFormat) -> Result<Contract, DealError> {
    let contract = match format {
        ContractFormat::Json => serde_json::from_str(text)?,
        ContractFormat::Yaml => serde_yaml::from_str(text)?,
    };
    Ok(contract)
}

/// Reads and decodes a contract file, choosing JSON or YAML by extension.
pub fn read_contract_file(path: impl AsRef<Path>) -> Result<Contract, DealError> {
    let path = path.as_ref();
    let format = ContractFormat::from_path(path)?;
    let text = fs::read_to_string(path)?;
    let contract = parse_contract(&text, format)?;
    debug!(
        path = %path.display(),
        services = contract.services.len(),
        "loaded contract {}",
        contract.name
    );
    Ok(contract)
}

impl Contract {
    /// Total number of success and failure cases.
    pub fn case_count(&self) -> usize {
        self.services
            .values()
            .flat_map(|service| service.values())
            .map(|method| method.success_cases.len() + method.failure_cases.len())
            .sum()
    }
}
