//! deal
//!
//! Generates Go gRPC mock servers from a `.proto` schema and a contract of
//! example calls.
//!
//! - `generate_from_files`: schema + contract files → Go source
//! - `describe_schema`: the parsed `.proto` AST as pretty JSON
//! - the schema model and the value-to-literal compiler, re-exported

use std::fs;
use std::path::Path;

use tracing::info;

pub use deal_compiler::error::DealError;
pub use deal_compiler::{
    compile_literal, compile_message, compile_schema, generate_mocks, message_from_json,
    read_contract_file, Contract, GeneratorConfig, GoImports, IdentResolver,
};
pub use deal_schema::{FieldKind, FieldSchema, MessageSchema, MessageValue, Package, Value};

/// Compiles `proto_path`, loads `contract_path` and returns the generated Go file.
pub fn generate_from_files(
    proto_path: impl AsRef<Path>,
    contract_path: impl AsRef<Path>,
    config: &GeneratorConfig,
) -> Result<String, DealError> {
    let text = fs::read_to_string(proto_path.as_ref())?;
    let (_file, package) = compile_schema(&text)?;
    let contract = read_contract_file(contract_path)?;
    info!(
        contract = %contract.name,
        cases = contract.case_count(),
        "generating mocks for {}",
        proto_path.as_ref().display()
    );
    generate_mocks(&package, &contract, config)
}

/// Parses and verifies `.proto` text and pretty-prints its AST as JSON.
pub fn describe_schema(text: &str) -> Result<String, DealError> {
    let (file, _package) = compile_schema(text)?;
    Ok(serde_json::to_string_pretty(&file)?)
}

pub mod error {
    pub use deal_compiler::error::DealError;
}

pub mod schema {
    pub use deal_schema::*;
}
