//!
//! todo-multi server binary
//! ------------------------
//! Command-line entry point. Settings come from defaults, `todo.toml`,
//! `TODO_*` environment variables and the flags below, in that order.

use std::env;

use anyhow::{Context, Result};
use tracing::info;

use todo_multi::config::{CliOverrides, Settings};

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn parse_cli(args: &[String]) -> Result<CliOverrides> {
    let port = match arg_value(args, "--port") {
        Some(p) => Some(p.parse::<u16>().with_context(|| format!("invalid --port value '{p}'"))?),
        None => None,
    };
    Ok(CliOverrides {
        config_file: arg_value(args, "--config"),
        host: arg_value(args, "--host"),
        port,
        database_url: arg_value(args, "--database-url"),
        memory: if has_flag(args, "--memory") { Some(true) } else { None },
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("todo-multi\n\nUSAGE:\n  todo-multi [--host H] [--port N] [--database-url URL] [--memory] [--config PATH]\n\nOPTIONS:\n  --host H              Listen address (env: TODO_SERVER__HOST, default 0.0.0.0)\n  --port N              HTTP port (env: TODO_SERVER__PORT, default 8000)\n  --database-url URL    PostgreSQL connection string (env: TODO_DATABASE__URL)\n  --memory              Use the in-memory store instead of PostgreSQL\n  --config PATH         Settings file (default ./todo.toml, optional)\n");
        return Ok(());
    }

    let cli = parse_cli(&args)?;
    let settings = Settings::load(&cli).context("While loading settings")?;
    todo_multi::logging::init(settings.log.format);

    let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "startup",
        "todo-multi starting: RUST_LOG='{}', host={}, port={}, memory_store={}, session_ttl_secs={}",
        rust_log, settings.server.host, settings.server.port, settings.database.memory, settings.session.ttl_secs
    );

    todo_multi::server::run(settings).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> { list.iter().map(|s| s.to_string()).collect() }

    #[test]
    fn flags_become_overrides() {
        let cli = parse_cli(&args(&["todo-multi", "--port", "9000", "--memory", "--config", "x.toml"])).unwrap();
        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.memory, Some(true));
        assert_eq!(cli.config_file.as_deref(), Some("x.toml"));
        assert_eq!(cli.host, None);
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(parse_cli(&args(&["todo-multi", "--port", "http"])).is_err());
    }
}
