//! # IPC Host
//!
//! Main entry point: hosts the book manager and drives it with clients.

use ipc_host::{HostRuntime, HostRuntimeConfig};
use remote_ipc::IpcConfig;
use std::env;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    let config = parse_args(&args).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        print_usage(program_name(&args));
        process::exit(1);
    });

    let runtime = HostRuntime::new(config).unwrap_or_else(|e| {
        eprintln!("Failed to create runtime: {}", e);
        process::exit(1);
    });

    match runtime.run() {
        Ok(report) => {
            println!("{} books:", report.books.len());
            for book in &report.books {
                println!("  {}", book);
            }
            println!("duplicates refused: {}", report.duplicate_rejections);
            println!(
                "stub: {} dispatched, {} rejected, {} exceptions",
                report.stub.dispatched, report.stub.rejected, report.stub.application_failures
            );
            println!(
                "parcels: {} acquired, {} released",
                report.pool.acquired, report.pool.released
            );
        }
        Err(e) => {
            eprintln!("Runtime error: {}", e);
            process::exit(1);
        }
    }
}

fn parse_args(args: &[String]) -> Result<HostRuntimeConfig, String> {
    let mut config = HostRuntimeConfig::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --config".to_string());
                }
                config.ipc = IpcConfig::from_json_file(&args[i])
                    .map_err(|e| format!("Failed to load config: {}", e))?;
            }
            "--books" | "-b" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --books".to_string());
                }
                config.books_per_client = args[i]
                    .parse()
                    .map_err(|_| format!("Invalid books value: {}", args[i]))?;
            }
            "--threads" | "-t" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --threads".to_string());
                }
                config.clients = args[i]
                    .parse()
                    .map_err(|_| format!("Invalid threads value: {}", args[i]))?;
            }
            "--help" | "-h" => {
                print_usage(program_name(&args));
                process::exit(0);
            }
            other => {
                return Err(format!("Unknown option: {}", other));
            }
        }
        i += 1;
    }

    Ok(config)
}

/// argv[0], which the OS may leave out
fn program_name(args: &[String]) -> &str {
    args.first().map_or("ipc_host", String::as_str)
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <FILE>      JSON transport config");
    eprintln!("  -b, --books <N>          Books each client adds (default 3)");
    eprintln!("  -t, --threads <N>        Concurrent client threads (default 2)");
    eprintln!("  -h, --help               Show this help message");
    eprintln!();
    eprintln!("Set RUST_LOG (e.g. RUST_LOG=remote_ipc=trace) to see transactions.");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} --threads 4 --books 10", program);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_program_name_without_argv() {
        assert_eq!(program_name(&[]), "ipc_host");
        assert_eq!(program_name(&args(&["/bin/host"])), "/bin/host");
    }

    #[test]
    fn test_parse_empty_argv() {
        let config = parse_args(&[]).unwrap();
        assert_eq!(config.clients, 2);
        assert_eq!(config.books_per_client, 3);
    }

    #[test]
    fn test_parse_counts() {
        let config = parse_args(&args(&["host", "-t", "4", "--books", "7"])).unwrap();
        assert_eq!(config.clients, 4);
        assert_eq!(config.books_per_client, 7);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&args(&["host", "--books"])).is_err());
        assert!(parse_args(&args(&["host", "--threads", "many"])).is_err());
        assert!(parse_args(&args(&["host", "--verbose"])).is_err());
    }
}
