use std::path::PathBuf;

use deal_compiler::error::DealError;
use deal_compiler::{compile_schema, generate_mocks, read_contract_file, GeneratorConfig};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn generate(contract: &str) -> Result<String, DealError> {
    let text = std::fs::read_to_string(fixture("users.proto"))?;
    let (_file, package) = compile_schema(&text)?;
    let contract = read_contract_file(fixture(contract))?;
    generate_mocks(&package, &contract, &GeneratorConfig::default())
}

const EXPECTED: &str = r#"// Code generated by deal. DO NOT EDIT.
// contract: users

package userspb

import (
	context "context"
	codes "google.golang.org/grpc/codes"
	status "google.golang.org/grpc/status"
	proto "google.golang.org/protobuf/proto"
	math "math"
)

// StubUserServiceServer answers example.users.UserService calls from contract "users".
type StubUserServiceServer struct {
	UnimplementedUserServiceServer
}

func (s *StubUserServiceServer) GetUser(ctx context.Context, req *GetUserRequest) (*User, error) {
	// admin with every field set
	if proto.Equal(req, &GetUserRequest{Id: 1}) {
		return &User{Id: 1, DisplayName: "Ada", Role: User_ROLE_ADMIN, Tags: []string{"ops", "on-call"}, Quotas: map[string]int32{"cpu": 2, "storage": 10}, Address: &Address{Street: "1 Main St", City: "London"}, Avatar: []byte{0x68, 0x69}, Score: 9.500000}, nil
	}
	// unknown user
	if proto.Equal(req, &GetUserRequest{Id: 404}) {
		return nil, status.Error(codes.NotFound, "user 404 does not exist")
	}
	return nil, status.Error(codes.Unimplemented, "no case of UserService.GetUser matches the request")
}

func (s *StubUserServiceServer) ListUsers(ctx context.Context, req *ListUsersRequest) (*ListUsersResponse, error) {
	if proto.Equal(req, &ListUsersRequest{PageSize: 2, Roles: []User_Role{User_ROLE_MEMBER, User_ROLE_ADMIN}}) {
		return &ListUsersResponse{Users: []*User{&User{Id: 1}, &User{Id: 2, Score: math.NaN()}}}, nil
	}
	return nil, status.Error(codes.Unimplemented, "no case of UserService.ListUsers matches the request")
}
"#;

#[test]
fn yaml_contract_generates_expected_file() {
    assert_eq!(generate("contract.yaml").unwrap(), EXPECTED);
}

#[test]
fn json_and_yaml_contracts_agree() {
    assert_eq!(generate("contract.json").unwrap(), generate("contract.yaml").unwrap());
}

#[test]
fn generation_is_deterministic() {
    let first = generate("contract.yaml").unwrap();
    for _ in 0..5 {
        assert_eq!(generate("contract.yaml").unwrap(), first);
    }
}

#[test]
fn unsupported_contract_extension() {
    let err = generate("users.proto").unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid contract: invalid contract extension, supported formats are json and yaml"
    );
}

#[test]
fn missing_contract_is_an_io_error() {
    assert!(matches!(generate("missing.yaml"), Err(DealError::Io(_))));
}
