//! CLI argument parsing with clap.

use clap::{ArgAction, ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

/// Identify a car from a photo or a live camera
#[derive(Parser, Debug)]
#[command(name = "car-scanner")]
#[command(version, about = "Identify a car from a photo or the camera", long_about = None)]
#[command(after_help = "EXAMPLES:
    car-scanner scan --upload ~/Pictures/car.jpg
    car-scanner scan --camera
    car-scanner scan --camera --replay still.jpg --capture-after 2 --mock
    car-scanner list-cameras
    car-scanner config init")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Log more (-v info, -vv debug); RUST_LOG overrides
    #[arg(long, short, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a car from an image file or the camera
    Scan(ScanArgs),
    /// List available cameras
    ListCameras,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug)]
#[command(group(ArgGroup::new("input").required(true).args(["upload", "camera"])))]
pub struct ScanArgs {
    /// Image file to identify
    #[arg(long, value_name = "FILE")]
    pub upload: Option<PathBuf>,

    /// MIME type of the upload (guessed from the extension by default)
    #[arg(long, requires = "upload")]
    pub mime: Option<String>,

    /// Capture from the camera; press Enter to take the shot
    #[arg(long)]
    pub camera: bool,

    /// Serve this still image as the camera feed
    #[arg(long, value_name = "FILE", requires = "camera")]
    pub replay: Option<PathBuf>,

    /// Capture automatically after this many seconds
    #[arg(long, value_name = "SECS", requires = "camera")]
    pub capture_after: Option<u64>,

    /// Use the built-in offline recognizer
    #[arg(long)]
    pub mock: bool,

    /// Print the result as a JSON record
    #[arg(long)]
    pub json: bool,

    /// Also print a shareable one-line summary
    #[arg(long)]
    pub share: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_upload() {
        let args = Args::parse_from(["car-scanner", "scan", "--upload", "car.jpg"]);
        match args.command {
            Command::Scan(scan) => {
                assert_eq!(scan.upload, Some(PathBuf::from("car.jpg")));
                assert!(!scan.camera);
                assert!(scan.mime.is_none());
                assert!(!scan.mock);
            }
            _ => panic!("Expected Scan subcommand"),
        }
        assert_eq!(args.verbose, 0);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_scan_camera_with_replay() {
        let args = Args::parse_from([
            "car-scanner",
            "scan",
            "--camera",
            "--replay",
            "still.png",
            "--capture-after",
            "2",
            "--mock",
            "--json",
            "--share",
        ]);
        match args.command {
            Command::Scan(scan) => {
                assert!(scan.camera);
                assert_eq!(scan.replay, Some(PathBuf::from("still.png")));
                assert_eq!(scan.capture_after, Some(2));
                assert!(scan.mock);
                assert!(scan.json);
                assert!(scan.share);
            }
            _ => panic!("Expected Scan subcommand"),
        }
    }

    #[test]
    fn test_scan_requires_an_input() {
        assert!(Args::try_parse_from(["car-scanner", "scan"]).is_err());
    }

    #[test]
    fn test_scan_inputs_are_exclusive() {
        let result =
            Args::try_parse_from(["car-scanner", "scan", "--upload", "a.jpg", "--camera"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_replay_requires_camera() {
        let result =
            Args::try_parse_from(["car-scanner", "scan", "--upload", "a.jpg", "--replay", "b.jpg"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let args = Args::parse_from(["car-scanner", "list-cameras", "-vv", "-c", "/tmp/c.toml"]);
        assert!(matches!(args.command, Command::ListCameras));
        assert_eq!(args.verbose, 2);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[test]
    fn test_config_subcommands() {
        let args = Args::parse_from(["car-scanner", "config", "show"]);
        assert!(matches!(
            args.command,
            Command::Config {
                action: ConfigAction::Show
            }
        ));

        let args = Args::parse_from(["car-scanner", "config", "init"]);
        assert!(matches!(
            args.command,
            Command::Config {
                action: ConfigAction::Init
            }
        ));
    }
}
