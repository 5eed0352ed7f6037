//! staffsync CLI - command-line access to the HR backend
//!
//! Signs in, stores the session credential on disk, and lists employees,
//! courses and projects through the authenticated gateway.
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::debug;
use secrecy::SecretString;
use serde::Serialize;

use staffsync_client::{AuthGateway, GatewayOutcome, HrApi, Session};
use staffsync_common::{CredentialProvider, EntityId, FileCredentialStore, GatewayConfig};

mod display;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the HR backend (overrides the config file)
    #[arg(long, env = "STAFFSYNC_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Path to a TOML configuration file
    /// Defaults to ~/.config/staffsync/config.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the credential file
    #[arg(long, env = "STAFFSYNC_CREDENTIALS", global = true)]
    credentials: Option<PathBuf>,

    /// Report malformed responses instead of substituting empty collections
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,

        /// Password (or set STAFFSYNC_PASSWORD env var)
        #[arg(long, env = "STAFFSYNC_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Store a token obtained elsewhere
    Token {
        #[arg(long)]
        token: String,

        #[arg(long)]
        role: Option<String>,
    },
    /// Remove the stored token and role
    Logout,
    /// Show the stored session state
    Whoami,
    /// List employees
    Employees,
    /// List courses
    Courses,
    /// List projects
    Projects,
    /// List the courses an employee is enrolled in
    EmployeeCourses { employee_id: String },
    /// GET any path and print the JSON response
    Get {
        path: String,

        /// Collection name for the empty-response fallback
        #[arg(long)]
        collection: Option<String>,
    },
    /// POST a multipart form
    Upload {
        path: String,

        /// File part as field=path
        #[arg(long, value_parser = parse_key_value)]
        file: (String, String),

        /// Extra text field as name=value
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))
}

fn load_config(args: &Args) -> Result<GatewayConfig> {
    let mut config = match &args.config {
        Some(path) => GatewayConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => GatewayConfig::load_or_default().context("Failed to load config")?,
    };

    if let Some(base_url) = &args.base_url {
        config.base_url.clone_from(base_url);
    }
    if let Some(path) = &args.credentials {
        config.credential_file = Some(path.clone());
    }
    if args.strict {
        config.strict_decoding = true;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn open_credentials(config: &GatewayConfig) -> Result<CredentialProvider> {
    let store = match &config.credential_file {
        Some(path) => FileCredentialStore::new(path),
        None => FileCredentialStore::open_default().context("Failed to locate credential file")?,
    };
    debug!("Using credential file {}", store.path().display());
    Ok(CredentialProvider::new(Arc::new(store)))
}

fn report<T: Serialize>(outcome: GatewayOutcome<T>) -> Result<ExitCode> {
    match outcome {
        GatewayOutcome::Success(payload) => {
            display::display_payload(&payload)?;
            Ok(ExitCode::SUCCESS)
        }
        failure => {
            if let Some(kind) = failure.failure_kind() {
                display::display_failure(kind);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn report_list<T: Serialize>(
    label: &str,
    outcome: GatewayOutcome<T>,
    count: impl FnOnce(&T) -> usize,
) -> Result<ExitCode> {
    if let Some(payload) = outcome.success() {
        display::display_count(label, count(payload));
    }
    report(outcome)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    env_logger::init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let credentials = open_credentials(&config)?;

    let gateway = AuthGateway::new(config, credentials).context("Failed to build HTTP client")?;
    let session = Session::from_gateway(&gateway);
    let api = HrApi::new(gateway);

    match args.command {
        Command::Login { email, password } => {
            let password = SecretString::new(password.into());
            let role = session
                .login(&email, &password)
                .await
                .context("Login failed")?;
            display::display_ok(&format!("Signed in as {email}"));
            display::display_session(true, role.as_deref());
            Ok(ExitCode::SUCCESS)
        }
        Command::Token { token, role } => {
            session.establish(&token, role.as_deref()).await?;
            display::display_ok("Token stored");
            Ok(ExitCode::SUCCESS)
        }
        Command::Logout => {
            session.logout().await;
            display::display_ok("Signed out");
            Ok(ExitCode::SUCCESS)
        }
        Command::Whoami => {
            let role = session.role().await;
            display::display_session(session.is_authenticated().await, role.as_deref());
            Ok(ExitCode::SUCCESS)
        }
        Command::Employees => {
            report_list("employees", api.employees().await, |l| l.employees.len())
        }
        Command::Courses => report_list("courses", api.courses().await, |l| l.courses.len()),
        Command::Projects => report_list("projects", api.projects().await, |l| l.projects.len()),
        Command::EmployeeCourses { employee_id } => {
            let outcome = api.employee_courses(&EntityId::from(employee_id)).await;
            report_list("enrollments", outcome, |l| l.employee_courses.len())
        }
        Command::Get { path, collection } => {
            report(api.get_json(&path, collection.as_deref()).await)
        }
        Command::Upload {
            path,
            file: (field, file_path),
            fields,
        } => {
            let outcome = api
                .upload_file(&path, &field, file_path.as_ref(), &fields)
                .await
                .with_context(|| format!("Failed to upload {file_path}"))?;
            report(outcome)
        }
    }
}
