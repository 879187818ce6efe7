use deal_schema::{GoIdent, MethodSchema, Package, ServiceSchema};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::{
    config::GeneratorConfig,
    contract::{Contract, FailureCase, Method, SuccessCase},
    decode::message_from_json,
    error::DealError,
    error_code::{is_error_code_valid, GRPC_CODES_PACKAGE},
    imports::GoImports,
    literal::{compile_message, IdentResolver, GO_PROTO_PACKAGE},
    utils::quote,
};

pub const GENERATED_HEADER: &str = "// Code generated by deal. DO NOT EDIT.";
pub const GO_CONTEXT_PACKAGE: &str = "context";
pub const GRPC_STATUS_PACKAGE: &str = "google.golang.org/grpc/status";

/// Generates one Go file holding a mock server per contract service.
///
/// Every contract service and method must be declared by `package`. A case
/// that cannot be compiled fails the whole file with an error naming the
/// service, method and case.
pub fn generate_mocks(
    package: &Package,
    contract: &Contract,
    config: &GeneratorConfig,
) -> Result<String, DealError> {
    config.validate()?;

    let package_name = config
        .package_name
        .clone()
        .unwrap_or_else(|| package.go_package.name.clone());
    let local_path = if package_name == package.go_package.name {
        package.go_package.import_path.as_str()
    } else {
        ""
    };
    let imports = GoImports::new(local_path);

    let mut body: Vec<String> = Vec::new();
    for (service_name, methods) in &contract.services {
        let service = package
            .service(service_name)
            .ok_or_else(|| DealError::UnknownService(service_name.clone()))?;
        info!(service = %service.full_name, methods = methods.len(), "generating mock server");

        body.push(generate_server_type(&imports, package, service, &config.stub_prefix, &contract.name));

        for (method_name, cases) in methods {
            let method = service.method(method_name).ok_or_else(|| DealError::UnknownMethod {
                service: service_name.clone(),
                method:  method_name.clone(),
            })?;
            body.push(generate_handler(&imports, service, method, cases, config)?);
        }
    }

    let mut go_code: Vec<String> = Vec::new();
    go_code.push(GENERATED_HEADER.to_string());
    go_code.push(format!("// contract: {}", single_line(&contract.name)));
    go_code.push("".to_string());
    go_code.push(format!("package {}", package_name));
    go_code.push("".to_string());
    if !imports.is_empty() {
        go_code.push(imports.render());
    }
    go_code.extend(body);

    Ok(go_code.join("\n"))
}

fn stub_name(prefix: &str, service: &ServiceSchema) -> String {
    format!("{}{}Server", prefix, service.go_name)
}

fn generate_server_type(
    imports: &GoImports,
    package: &Package,
    service: &ServiceSchema,
    prefix: &str,
    contract_name: &str,
) -> String {
    let embedded = GoIdent::new(
        format!("Unimplemented{}Server", service.go_name),
        package.go_package.import_path.clone(),
    );
    let name = stub_name(prefix, service);
    format!(
        "// {} answers {} calls from contract {}.\ntype {} struct {{\n\t{}\n}}\n",
        name,
        service.full_name,
        quote(contract_name),
        name,
        imports.qualified_name(&embedded)
    )
}

fn generate_handler(
    imports: &GoImports,
    service: &ServiceSchema,
    method: &MethodSchema,
    cases: &Method,
    config: &GeneratorConfig,
) -> Result<String, DealError> {
    let context = imports.qualified_name(&GoIdent::new("Context", GO_CONTEXT_PACKAGE));
    let input = imports.qualified_name(&method.input.go_ident);
    let output = imports.qualified_name(&method.output.go_ident);

    let mut lines = Vec::new();
    lines.push(format!(
        "func (s *{}) {}(ctx {}, req *{}) (*{}, error) {{",
        stub_name(&config.stub_prefix, service),
        method.go_name,
        context,
        input,
        output
    ));

    for (index, case) in cases.success_cases.iter().enumerate() {
        let label = case_label(&case.description, "success", index);
        let branch = generate_success_case(imports, method, case)
            .map_err(|err| err.in_case(&service.name, &method.name, &label))?;
        debug!(method = %method.name, case = %label, "compiled success case");
        lines.push(branch);
    }

    for (index, case) in cases.failure_cases.iter().enumerate() {
        let label = case_label(&case.description, "failure", index);
        let branch = generate_failure_case(imports, method, case)
            .map_err(|err| err.in_case(&service.name, &method.name, &label))?;
        debug!(method = %method.name, case = %label, "compiled failure case");
        lines.push(branch);
    }

    lines.push(format!(
        "\treturn nil, {}",
        status_error(
            imports,
            &config.unmatched_code,
            &format!("no case of {}.{} matches the request", service.name, method.name)
        )
    ));
    lines.push("}\n".to_string());

    Ok(lines.join("\n"))
}

fn case_label(description: &str, kind: &str, index: usize) -> String {
    if description.is_empty() {
        format!("{} case #{}", kind, index + 1)
    } else {
        description.to_string()
    }
}

fn generate_success_case(imports: &GoImports, method: &MethodSchema, case: &SuccessCase) -> Result<String, DealError> {
    let matcher = request_matcher(imports, method, &case.request)?;
    let response = message_from_json(&method.output, &case.response, "response")?;
    let response = compile_message(imports, &method.output, &response)?;

    Ok(format!(
        "{}\t{} {{\n\t\treturn &{}, nil\n\t}}",
        description_comment(&case.description),
        matcher,
        response
    ))
}

fn generate_failure_case(imports: &GoImports, method: &MethodSchema, case: &FailureCase) -> Result<String, DealError> {
    if !is_error_code_valid(&case.error.error_code) {
        return Err(DealError::InvalidErrorCode(case.error.error_code.clone()));
    }
    let matcher = request_matcher(imports, method, &case.request)?;

    Ok(format!(
        "{}\t{} {{\n\t\treturn nil, {}\n\t}}",
        description_comment(&case.description),
        matcher,
        status_error(imports, &case.error.error_code, &case.error.message)
    ))
}

/// `if proto.Equal(req, &Req{...})`
fn request_matcher(imports: &GoImports, method: &MethodSchema, request: &JsonValue) -> Result<String, DealError> {
    let request = message_from_json(&method.input, request, "request")?;
    let request = compile_message(imports, &method.input, &request)?;
    Ok(format!(
        "if {}(req, &{})",
        imports.qualified_name(&GoIdent::new("Equal", GO_PROTO_PACKAGE)),
        request
    ))
}

fn status_error(imports: &GoImports, code: &str, message: &str) -> String {
    format!(
        "{}({}, {})",
        imports.qualified_name(&GoIdent::new("Error", GRPC_STATUS_PACKAGE)),
        imports.qualified_name(&GoIdent::new(code, GRPC_CODES_PACKAGE)),
        quote(message)
    )
}

fn description_comment(description: &str) -> String {
    if description.is_empty() {
        return String::new();
    }
    format!("\t// {}\n", single_line(description))
}

/// Line comments end at the first newline, so embedded ones are collapsed.
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
