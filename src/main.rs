mod cli;

use car_scanner::config::Config;
use clap::Parser;
use cli::{Args, CliError, Command};

/// Log filter used when RUST_LOG is not set.
fn default_log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

fn init_logging(verbose: u8) {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_log_filter(verbose)),
    )
    .init();
}

async fn run(args: Args) -> Result<(), CliError> {
    let config_path = args.config.as_deref();
    match args.command {
        Command::Config { action } => cli::handle_config_action(action, config_path),
        Command::ListCameras => {
            let config = Config::load(config_path)?;
            cli::list_cameras(&config)
        }
        Command::Scan(scan) => {
            let config = Config::load(config_path)?;
            cli::run_scan(scan, config).await
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env before anything reads the environment; a missing file is fine
    let _ = dotenv::dotenv();

    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_filter() {
        assert_eq!(default_log_filter(0), "warn");
        assert_eq!(default_log_filter(1), "info");
        assert_eq!(default_log_filter(2), "debug");
        assert_eq!(default_log_filter(5), "debug");
    }

    #[test]
    fn test_env_var_not_overridden_by_dotenv() {
        std::env::set_var("CAR_SCANNER_TEST_EXISTING", "original_value");

        let _ = dotenv::dotenv();

        assert_eq!(
            std::env::var("CAR_SCANNER_TEST_EXISTING").unwrap(),
            "original_value",
            "Existing env vars should not be overridden by dotenv"
        );
        std::env::remove_var("CAR_SCANNER_TEST_EXISTING");
    }
}
