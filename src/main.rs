use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::Notify;

mod config;
mod error;
mod handler;
mod http;
mod logger;
mod server;

use error::ServerError;

const USAGE: &str = "usage: coi_serve [--config <path>] [PORT]";

/// Command line options; everything else lives in the config file
#[derive(Debug, PartialEq, Eq)]
struct CliArgs {
    config_path: String,
    port: Option<u16>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs, ServerError> {
    let mut config_path = config::DEFAULT_CONFIG_PATH.to_string();
    let mut port = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                config_path = args
                    .next()
                    .ok_or_else(|| ServerError::Usage(format!("{arg} needs a path\n{USAGE}")))?;
            }
            "-h" | "--help" => return Err(ServerError::Usage(USAGE.to_string())),
            value if port.is_none() => {
                let parsed = value.parse::<u16>().map_err(|_| {
                    ServerError::Usage(format!("invalid port '{value}'\n{USAGE}"))
                })?;
                port = Some(parsed);
            }
            value => {
                return Err(ServerError::Usage(format!(
                    "unexpected argument '{value}'\n{USAGE}"
                )))
            }
        }
    }

    Ok(CliArgs { config_path, port })
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[ERROR] {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), ServerError> {
    let args = parse_args(std::env::args().skip(1))?;
    let cfg = config::Config::load_from(&args.config_path, args.port)?;
    logger::init(&cfg).map_err(ServerError::Logger)?;

    // Connections run as local tasks, so one thread drives everything
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(ServerError::Runtime)?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), ServerError> {
    let addr = cfg.get_socket_addr()?;
    let state = Arc::new(config::AppState::new(cfg)?);
    let listener = server::create_listener(addr)?;

    let shutdown = Arc::new(Notify::new());
    server::start_signal_handler(Arc::clone(&shutdown))?;

    logger::log_server_start(&addr, &state.root, &state.config);

    // Connections are served with spawn_local
    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::start_server_loop(listener, state, shutdown))
        .await;

    logger::log_server_stopped();
    Ok(())
}
