//! deal-compiler
//!
//! This crate implements:
//!  1) A tokenizer + parser for the `.proto` subset deal understands,
//!  2) A schema verifier (duplicate names, unresolved types, field numbers, recursive messages, etc.),
//!  3) A linker producing the shared `deal_schema::Package` graph (`compile_schema`),
//!  4) The value-to-Go-literal compiler (`compile_literal` / `compile_message`),
//!  5) The contract loader and the protobuf JSON value decoder,
//!  6) Go mock server generation (`generate_mocks` → `String`),
//!  7) Error types (`DealError`) and the generator configuration.

pub mod error;
pub mod types;
pub mod utils;
pub mod tokenizer;
pub mod parser;
pub mod verifier;
pub mod compiler;
pub mod literal;
pub mod error_code;
pub mod contract;
pub mod decode;
pub mod imports;
pub mod config;
pub mod gen_go;

pub use compiler::compile_schema;
pub use compiler::link_schema;
pub use config::GeneratorConfig;
pub use contract::{read_contract_file, parse_contract, Contract, ContractFormat};
pub use decode::message_from_json;
pub use error::DealError;
pub use gen_go::generate_mocks;
pub use imports::GoImports;
pub use literal::{compile_literal, compile_message, IdentResolver};
