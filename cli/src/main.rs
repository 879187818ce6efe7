use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

use deal::{describe_schema, generate_from_files, GeneratorConfig};
use deal_compiler::error::DealError;
use deal_compiler::{compile_schema, generate_mocks, read_contract_file};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "deal")]
#[command(about = "Generate Go gRPC mock servers from a protobuf schema and a contract", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the Go mock servers for every service in the contract
    Generate {
        /// Input `.proto` schema file
        #[arg(short, long)]
        proto: PathBuf,

        /// Contract file (`.json`, `.yaml` or `.yml`)
        #[arg(short, long)]
        contract: PathBuf,

        /// Output `.go` file (if omitted, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Go package of the generated file (defaults to the schema's go_package name)
        #[arg(long, env = "DEAL_PACKAGE")]
        package: Option<String>,

        /// Prefix of the generated server types
        #[arg(long, env = "DEAL_STUB_PREFIX", default_value = "Stub")]
        stub_prefix: String,

        /// gRPC code returned when no case matches a request
        #[arg(long, env = "DEAL_UNMATCHED_CODE", default_value = "Unimplemented")]
        unmatched_code: String,
    },

    /// Run the whole pipeline without writing anything and report case counts
    Check {
        /// Input `.proto` schema file
        #[arg(short, long)]
        proto: PathBuf,

        /// Contract file (`.json`, `.yaml` or `.yml`)
        #[arg(short, long)]
        contract: PathBuf,
    },

    /// Print the parsed `.proto` schema as JSON
    Inspect {
        /// Input `.proto` schema file
        #[arg(short, long)]
        proto: PathBuf,
    },
}

fn main() -> Result<(), DealError> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Generate { proto, contract, output, package, stub_prefix, unmatched_code } => {
            let config = GeneratorConfig {
                package_name: package,
                stub_prefix,
                unmatched_code,
            };
            let go_code = generate_from_files(&proto, &contract, &config)?;
            if let Some(out_path) = output {
                fs::write(&out_path, &go_code)?;
                info!("Generated mocks written to {}", out_path.display());
            } else {
                print!("{}", go_code);
            }
            Ok(())
        }

        Commands::Check { proto, contract } => {
            let text = fs::read_to_string(&proto)?;
            let (_file, package) = compile_schema(&text)?;
            let loaded = read_contract_file(&contract)?;
            generate_mocks(&package, &loaded, &GeneratorConfig::default())?;
            println!(
                "{}: {} services, {} cases OK against {}",
                contract.display(),
                loaded.services.len(),
                loaded.case_count(),
                proto.display()
            );
            Ok(())
        }

        Commands::Inspect { proto } => {
            let text = fs::read_to_string(&proto)?;
            println!("{}", describe_schema(&text)?);
            Ok(())
        }
    }
}
