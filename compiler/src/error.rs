use deal_schema::FieldNumber;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DealError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}, column {column}: {msg}")]
    ParseError {
        msg:    String,
        line:   usize,
        column: usize,
    },

    #[error("Verifier error: {0}")]
    VerifierError(String),

    #[error("field not found {field} while inspecting message {message}")]
    FieldNotFound {
        field:   FieldNumber,
        message: String,
    },

    #[error("enum value {ordinal} is out of range for enum {enum_name} ({count} members)")]
    EnumOutOfRange {
        enum_name: String,
        ordinal:   i32,
        count:     usize,
    },

    #[error("unsupported group kind in field \"{0}\"")]
    UnsupportedGroup(String),

    #[error("field \"{field}\" has no {expected} schema")]
    MissingSchema {
        field:    String,
        expected: &'static str,
    },

    #[error("invalid value at {path}: {reason}")]
    InvalidValue {
        path:   String,
        reason: String,
    },

    #[error("invalid error code \"{0}\"")]
    InvalidErrorCode(String),

    #[error("service \"{0}\" is not declared in the schema")]
    UnknownService(String),

    #[error("method \"{method}\" is not declared in service \"{service}\"")]
    UnknownMethod {
        service: String,
        method:  String,
    },

    #[error("invalid contract: {0}")]
    InvalidContract(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{service}.{method} case \"{case}\": {source}")]
    Case {
        service: String,
        method:  String,
        case:    String,
        #[source]
        source:  Box<DealError>,
    },
}

impl DealError {
    /// Attaches the service, method and case that were being generated.
    pub fn in_case(self, service: &str, method: &str, case: &str) -> DealError {
        DealError::Case {
            service: service.to_string(),
            method:  method.to_string(),
            case:    case.to_string(),
            source:  Box::new(self),
        }
    }
}
