/// Names of the constants in Go's `google.golang.org/grpc/codes` package.
pub const ERROR_CODE_NAMES: [&str; 17] = [
    "OK",
    "Canceled", // single "l", as spelled by grpc-go
    "Unknown",
    "InvalidArgument",
    "DeadlineExceeded",
    "NotFound",
    "AlreadyExists",
    "PermissionDenied",
    "ResourceExhausted",
    "FailedPrecondition",
    "Aborted",
    "OutOfRange",
    "Unimplemented",
    "Internal",
    "Unavailable",
    "DataLoss",
    "Unauthenticated",
];

pub const GRPC_CODES_PACKAGE: &str = "google.golang.org/grpc/codes";

/// Returns true when `code` names a gRPC status code.
pub fn is_error_code_valid(code: &str) -> bool {
    ERROR_CODE_NAMES.contains(&code)
}
