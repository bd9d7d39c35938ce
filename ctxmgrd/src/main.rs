//! # Context Manager Daemon
//!
//! Main entry point for the context manager.

use ctxmgrd::{
    init_tracing, start_context_manager, Collaborators, DaemonConfig, FailurePolicy,
    PropertyStore,
};
use reactor::PlatformPoller;
use services_registry::ServiceManager;
use services_token::TokenManager;
use std::env;
use std::path::PathBuf;
use std::process;
use std::rc::Rc;
use tracing::{error, info};
use transport::UnixSocketTransport;

/// Command-line overrides applied on top of the configuration file
#[derive(Debug, Default)]
struct Options {
    config: Option<PathBuf>,
    socket: Option<PathBuf>,
    properties: Option<PathBuf>,
    log: Option<String>,
    soft_context_manager: bool,
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("ctxmgrd");

    let options = parse_args(&args).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        print_usage(program);
        process::exit(1);
    });

    let config = load_config(&options).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        process::exit(1);
    });

    init_tracing(&config.log_filter);
    info!(
        socket = %config.socket_path.display(),
        properties = %config.property_dir.display(),
        service = %config.service_name,
        "Starting context manager"
    );

    let poller = PlatformPoller::new().unwrap_or_else(|e| {
        error!(error = %e, "Failed to create poller");
        process::abort();
    });

    let transport = UnixSocketTransport::new(&config.socket_path)
        .with_request_timeout(config.request_timeout());
    let collaborators = Collaborators {
        transport: Rc::new(transport),
        registry: Rc::new(ServiceManager::new()),
        helper: Rc::new(TokenManager::new()),
        publisher: Box::new(PropertyStore::new(&config.property_dir)),
    };

    start_context_manager(&config.bootstrap(), collaborators, poller)
}

fn load_config(options: &Options) -> Result<DaemonConfig, String> {
    let mut config = match &options.config {
        Some(path) => DaemonConfig::load(path).map_err(|e| e.to_string())?,
        None => DaemonConfig::default(),
    };

    if let Some(socket) = &options.socket {
        config.socket_path = socket.clone();
    }
    if let Some(properties) = &options.properties {
        config.property_dir = properties.clone();
    }
    if let Some(log) = &options.log {
        config.log_filter = log.clone();
    }
    if options.soft_context_manager {
        config.context_manager_failure = FailurePolicy::Log;
    }
    Ok(config)
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --config".to_string());
                }
                options.config = Some(PathBuf::from(&args[i]));
            }
            "--socket" | "-s" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --socket".to_string());
                }
                options.socket = Some(PathBuf::from(&args[i]));
            }
            "--properties" | "-p" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --properties".to_string());
                }
                options.properties = Some(PathBuf::from(&args[i]));
            }
            "--log" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --log".to_string());
                }
                options.log = Some(args[i].clone());
            }
            "--soft-context-manager" => {
                options.soft_context_manager = true;
            }
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other => {
                return Err(format!("Unknown option: {}", other));
            }
        }
        i += 1;
    }

    Ok(options)
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <FILE>       TOML configuration file");
    eprintln!("  -s, --socket <PATH>       Socket clients connect to");
    eprintln!("  -p, --properties <DIR>    Directory the readiness property is written to");
    eprintln!("      --log <FILTER>        Log filter (RUST_LOG takes precedence)");
    eprintln!("      --soft-context-manager");
    eprintln!("                            Keep running if another process is already");
    eprintln!("                            the context manager. The socket transport cannot");
    eprintln!("                            serve without the role and still exits");
    eprintln!("  -h, --help                Print this help");
}
