//! charwatch - live character status dashboard
//!
//! Connects to the character status server and shows the selected
//! characters as cards in the terminal.
//!
//! ## Usage
//!
//! ```bash
//! # Connect to ws://localhost:8080/ws
//! charwatch
//!
//! # Another server, four cards
//! charwatch --host game.example --port 9000 --slots 4
//!
//! # Log slot changes to stderr instead of drawing the UI
//! charwatch --headless -v
//! ```

use std::io::Write;
use std::panic;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use charwatch_core::{DashboardConfig, LogGuard, LogOutput, PreferenceStore, init_logging};
use charwatch_tui::App;
use clap::Parser;
use tracing::{error, info, warn};

/// Live dashboard for multiple game character sessions.
#[derive(Parser, Debug)]
#[command(name = "charwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging (increases log level)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory for log files (defaults to ~/.charwatch/logs/)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Configuration file (defaults to ~/.charwatch/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Status server URL
    #[arg(long, conflicts_with_all = ["host", "port"])]
    url: Option<String>,

    /// Status server host (ws://HOST:PORT/ws)
    #[arg(long)]
    host: Option<String>,

    /// Status server port
    #[arg(long)]
    port: Option<u16>,

    /// Number of character cards
    #[arg(long)]
    slots: Option<usize>,

    /// Info bar fields, comma separated (saved as a preference)
    #[arg(long, value_delimiter = ',')]
    info_bar: Option<Vec<String>>,

    /// Run without the terminal UI, logging slot changes to stderr
    #[arg(long)]
    headless: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::from(1);
        }
    };

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "configuration error");
            eprintln!("Error: {}", e);
            if let Some(hint) = e.guidance() {
                eprintln!("{}", hint);
            }
            return ExitCode::from(startup_exit_code(&e));
        }
    };

    let prefs = PreferenceStore::open_default();

    let result = if cli.headless {
        run_headless(config, prefs, cli.info_bar)
    } else {
        // Install panic hook to ensure terminal cleanup
        install_panic_hook();
        run_app(config, prefs, cli.info_bar)
    };

    match result {
        Ok(()) => {
            info!("charwatch exited normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("charwatch error: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

/// Install a panic hook that restores the terminal before printing the panic message.
fn install_panic_hook() {
    let original_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        original_hook(panic_info);
    }));
}

/// Restore terminal to its normal state.
fn restore_terminal() -> std::io::Result<()> {
    let mut stdout = std::io::stdout();

    let _ = crossterm::terminal::disable_raw_mode();
    crossterm::execute!(
        stdout,
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::cursor::Show
    )?;
    stdout.flush()?;

    Ok(())
}

/// Set up logging based on CLI arguments.
fn setup_logging(cli: &Cli) -> charwatch_core::Result<LogGuard> {
    let output = if cli.headless {
        LogOutput::FileAndConsole
    } else {
        LogOutput::FileOnly
    };
    init_logging(cli.log_dir.clone(), cli.verbose > 0, output)
}

/// Config file, then command-line overrides.
fn load_config(cli: &Cli) -> charwatch_core::Result<DashboardConfig> {
    let config = match &cli.config {
        Some(path) => DashboardConfig::load_from(path)?,
        None => DashboardConfig::load_default()?,
    };
    let config = apply_overrides(config, cli);
    config.validate()?;
    Ok(config)
}

/// 2 for a bad configuration, 1 for anything else (unreadable file, no home).
fn startup_exit_code(error: &charwatch_core::CharwatchError) -> u8 {
    if error.is_config_error() { 2 } else { 1 }
}

fn apply_overrides(mut config: DashboardConfig, cli: &Cli) -> DashboardConfig {
    if let Some(url) = &cli.url {
        config = config.with_server_url(url.as_str());
    } else if cli.host.is_some() || cli.port.is_some() {
        let host = cli.host.as_deref().unwrap_or("localhost");
        config = config.with_host_port(host, cli.port.unwrap_or(8080));
    }
    if let Some(slots) = cli.slots {
        config = config.with_max_slots(slots);
    }
    config
}

fn build_app(
    config: DashboardConfig,
    prefs: PreferenceStore,
    info_bar: Option<Vec<String>>,
) -> charwatch_tui::AppResult<App> {
    let mut app = App::from_config(config, prefs)?;
    if let Some(items) = info_bar {
        let items: Vec<String> = items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();
        info!(?items, "info bar set from command line");
        app.set_info_bar_items(items);
    }
    Ok(app)
}

/// Run the TUI application.
fn run_app(
    config: DashboardConfig,
    prefs: PreferenceStore,
    info_bar: Option<Vec<String>>,
) -> charwatch_tui::AppResult<()> {
    let mut app = build_app(config, prefs, info_bar)?;
    let result = app.run();
    app.shutdown();
    result
}

/// Run without a terminal until Ctrl+C.
fn run_headless(
    config: DashboardConfig,
    prefs: PreferenceStore,
    info_bar: Option<Vec<String>>,
) -> charwatch_tui::AppResult<()> {
    let stop = Arc::new(AtomicBool::new(false));
    let signal_stop = Arc::clone(&stop);
    std::thread::Builder::new()
        .name("charwatch-signal".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!(error = %e, "no signal handler, stop with SIGTERM");
                    return;
                }
            };
            if let Err(e) = runtime.block_on(tokio::signal::ctrl_c()) {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("interrupted");
            signal_stop.store(true, Ordering::Relaxed);
        })?;

    let mut app = build_app(config, prefs, info_bar)?;
    app.run_headless(&stop);
    app.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("charwatch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_leave_config_alone() {
        let cli = parse(&[]);
        let config = apply_overrides(DashboardConfig::default(), &cli);
        assert_eq!(config.server_url, "ws://localhost:8080/ws");
        assert_eq!(config.max_slots, 8);
        assert!(!cli.headless);
    }

    #[test]
    fn test_host_and_port_build_url() {
        let cli = parse(&["--host", "game.example", "--port", "9000"]);
        let config = apply_overrides(DashboardConfig::default(), &cli);
        assert_eq!(config.server_url, "ws://game.example:9000/ws");

        let cli = parse(&["--port", "9001"]);
        let config = apply_overrides(DashboardConfig::default(), &cli);
        assert_eq!(config.server_url, "ws://localhost:9001/ws");
    }

    #[test]
    fn test_url_conflicts_with_host() {
        let result = Cli::try_parse_from(["charwatch", "--url", "ws://a/ws", "--host", "b"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_slots_and_info_bar() {
        let cli = parse(&["--slots", "3", "--info-bar", "STYLE,FAVOR,LEVEL"]);
        let config = apply_overrides(DashboardConfig::default(), &cli);
        assert_eq!(config.max_slots, 3);
        assert_eq!(
            cli.info_bar,
            Some(vec!["STYLE".to_string(), "FAVOR".to_string(), "LEVEL".to_string()])
        );
    }

    #[test]
    fn test_zero_slots_fail_validation() {
        let cli = parse(&["--slots", "0"]);
        let config = apply_overrides(DashboardConfig::default(), &cli);
        let err = config.validate().unwrap_err();
        assert_eq!(startup_exit_code(&err), 2);
    }

    #[test]
    fn test_missing_explicit_config_exits_with_config_code() {
        let cli = parse(&["--config", "/nonexistent/charwatch/config.yaml"]);
        let err = load_config(&cli).unwrap_err();
        assert_eq!(startup_exit_code(&err), 2);
    }
}
