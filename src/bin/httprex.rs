//! httprex command-line front-end
//!
//! Parses a request document, resolves its placeholders with the configured
//! environments and secret providers, and prints the resolved requests as
//! JSON on stdout. Diagnostics go to stderr; set `RUST_LOG` or pass
//! `--debug` for more logging.

use clap::Parser;
use httprex::config::{load_config_file, HttprexConfig};
use httprex::parser::{self, error::ParserError};
use httprex::session::Session;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "httprex")]
#[command(about = "Parse a .http request document and resolve its variables")]
#[command(version)]
struct Args {
    /// Request document to resolve
    #[arg(required_unless_present = "list_envs")]
    file: Option<PathBuf>,

    /// Environment to select
    #[arg(short, long, env = "HTTPREX_ENV")]
    env: Option<String>,

    /// Environment file, instead of searching next to FILE
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long, env = "HTTPREX_CONFIG")]
    config: Option<PathBuf>,

    /// Print the unresolved variable names of each request instead
    #[arg(short, long)]
    unresolved: bool,

    /// List the available environments and exit
    #[arg(long)]
    list_envs: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => load_config_file(path)?,
        None => HttprexConfig::default(),
    };
    if let Some(env_file) = &args.env_file {
        config.environment_file = Some(env_file.to_string_lossy().into_owned());
    }
    if let Some(env) = &args.env {
        config.default_environment = Some(env.clone());
    }

    let workspace = match &args.file {
        Some(file) => file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
        None => std::env::current_dir()?,
    };
    // An explicit --env-file is relative to the current directory, not the workspace
    let session_root = if args.env_file.is_some() { None } else { Some(workspace.as_path()) };
    let session = Session::from_config(config, session_root)?;

    if args.list_envs {
        print_environments(&session);
        return Ok(ExitCode::SUCCESS);
    }

    let Some(file) = &args.file else {
        return Ok(ExitCode::FAILURE);
    };
    let text = std::fs::read_to_string(file)?;

    let (success, errors, output) = if args.unresolved {
        unresolved_report(&session, &text).await
    } else {
        let result = session.resolve_document(&text).await;
        let requests = result.data.map(|f| f.requests).unwrap_or_default();
        (result.success, result.errors, serde_json::to_value(&requests)?)
    };

    for error in &errors {
        print_error(file, error);
    }
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(if success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Unresolved names keyed by request name, or `#<index>` for unnamed requests.
async fn unresolved_report(session: &Session, text: &str) -> (bool, Vec<ParserError>, Value) {
    let result = parser::parse_file(text);
    let mut report = Map::new();

    if let Some(file) = &result.data {
        let mut resolver = session.resolver_for(file);
        resolver.load_global_variables().await;

        for (index, request) in file.requests.iter().enumerate() {
            let key = request
                .name
                .clone()
                .unwrap_or_else(|| format!("#{}", index + 1));
            let names = resolver.get_unresolved_variables_async(request).await;
            report.insert(key, json!(names));
        }
    }

    (result.success, result.errors, Value::Object(report))
}

fn print_environments(session: &Session) {
    let current = session.environments().current_environment_name();
    let names = session.environments().list_environments();

    if names.is_empty() {
        eprintln!("No environments loaded");
        return;
    }
    for name in names {
        let marker = if current.as_deref() == Some(name.as_str()) { "*" } else { " " };
        println!("{} {}", marker, name);
    }
}

fn print_error(file: &Path, error: &ParserError) {
    match error.line {
        Some(line) => eprintln!(
            "{}:{}: {}: {}",
            file.display(),
            line,
            error.kind.as_str(),
            error.message
        ),
        None => eprintln!("{}: {}: {}", file.display(), error.kind.as_str(), error.message),
    }
}
