//! Subcommand handlers for scan, list-cameras and config actions.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};

use car_scanner::camera::{CameraBackend, ReplayBackend};
use car_scanner::config::{self, Config};
use car_scanner::recognition::{FixedRecognizer, RecognitionClient, Recognizer};
use car_scanner::scan::{
    ConsoleCollaborator, ScanIntent, ScanState, ScanStateMachine, ScanView,
};

use super::args::{ConfigAction, ScanArgs};
use super::error::CliError;

/// List available cameras and print them to stdout.
pub fn list_cameras(config: &Config) -> Result<(), CliError> {
    let backend = camera_backend(config, None)?;
    let devices = backend.list_devices()?;

    if devices.is_empty() {
        println!("No cameras found.");
        println!();
        println!("Make sure your camera is connected and permissions are granted.");
    } else {
        println!("Available cameras ({}):", backend.name());
        for device in devices {
            println!("  {}", device);
        }
        println!();
        println!("Set [camera] device = <index> in the config to select a camera.");
    }
    Ok(())
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: ConfigAction, path: Option<&Path>) -> Result<(), CliError> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_path);

    match action {
        ConfigAction::Show => {
            let config = Config::load(path)?;
            if config_path.exists() {
                println!("# Config file: {} (exists)", config_path.display());
            } else {
                println!("# Config file: {} (not found, using defaults)", config_path.display());
            }
            println!();
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Init => {
            config::init(&config_path)?;
            println!("Created config file: {}", config_path.display());
        }
    }
    Ok(())
}

/// Replay file wins over a real camera.
fn camera_backend(
    config: &Config,
    replay: Option<&Path>,
) -> Result<Arc<dyn CameraBackend>, CliError> {
    if let Some(path) = replay.or(config.camera.replay.as_deref()) {
        return Ok(Arc::new(ReplayBackend::new(path)));
    }
    native_backend()
}

#[cfg(feature = "camera")]
fn native_backend() -> Result<Arc<dyn CameraBackend>, CliError> {
    Ok(Arc::new(car_scanner::camera::NokhwaBackend))
}

#[cfg(not(feature = "camera"))]
fn native_backend() -> Result<Arc<dyn CameraBackend>, CliError> {
    Err(CliError::NoCameraBackend)
}

fn recognizer(config: &Config, mock: bool) -> Result<Arc<dyn Recognizer>, CliError> {
    if mock || config.recognition.mock {
        log::info!("using the offline recognizer");
        return Ok(Arc::new(FixedRecognizer::default()));
    }

    let client = RecognitionClient::from_env(
        config.recognition.base_url.as_str(),
        &config.recognition.api_key_env,
    )?
    .with_timeout(config.timeout());
    if client.api_key().is_none() {
        log::warn!(
            "{} is not set; calling {} without credentials",
            config.recognition.api_key_env,
            client.endpoint()
        );
    }
    Ok(Arc::new(client))
}

/// MIME type for an upload, from its extension.
pub fn guess_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("tif" | "tiff") => "image/tiff",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Run one scan to completion and print the outcome.
pub async fn run_scan(args: ScanArgs, config: Config) -> Result<(), CliError> {
    let backend: Arc<dyn CameraBackend> = if args.camera {
        camera_backend(&config, args.replay.as_deref())?
    } else {
        // Never opened on the upload path
        Arc::new(ReplayBackend::new(""))
    };
    let recognizer = recognizer(&config, args.mock)?;

    let mut machine =
        ScanStateMachine::new(backend, recognizer, config.codec(), config.scan_settings());
    let progress = tokio::spawn(report_progress(machine.subscribe()));

    let (interrupt_tx, mut interrupts) = mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.send(());
    })?;

    if let Some(path) = &args.upload {
        let bytes = tokio::fs::read(path).await.map_err(|e| CliError::Read {
            path: path.clone(),
            source: e,
        })?;
        let mime = args
            .mime
            .clone()
            .unwrap_or_else(|| guess_mime(path).to_string());
        machine.dispatch(ScanIntent::UploadFile { bytes, mime }).await?;
    } else {
        machine.dispatch(ScanIntent::StartCamera).await?;
        if machine.state() == ScanState::DeviceActive {
            let intent = tokio::select! {
                _ = interrupts.recv() => ScanIntent::Cancel,
                _ = capture_trigger(args.capture_after) => ScanIntent::Capture,
            };
            machine.dispatch(intent).await?;
        }
    }

    if machine.has_request_in_flight() {
        tokio::select! {
            _ = machine.settle() => {}
            _ = interrupts.recv() => {
                machine.dispatch(ScanIntent::Retry).await?;
            }
        }
    }

    let outcome = print_outcome(&machine, &args).await;
    drop(machine);
    let _ = progress.await;
    outcome
}

async fn capture_trigger(capture_after: Option<u64>) {
    match capture_after {
        Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        None => {
            // Detached: a blocked stdin read must not keep the runtime alive
            let (enter_tx, enter_rx) = oneshot::channel();
            std::thread::spawn(move || {
                let mut line = String::new();
                // EOF counts as Enter
                let _ = std::io::stdin().read_line(&mut line);
                let _ = enter_tx.send(());
            });
            let _ = enter_rx.await;
        }
    }
}

async fn report_progress(mut views: broadcast::Receiver<ScanView>) {
    loop {
        match views.recv().await {
            Ok(view) => match view {
                ScanView::DeviceActive { preview } => eprintln!(
                    "Camera ready ({}). Press Enter to capture, Ctrl-C to cancel.",
                    preview.stream_info().resolution
                ),
                ScanView::Analyzing { image } => eprintln!(
                    "Analyzing {}x{} image...",
                    image.width(),
                    image.height()
                ),
                _ => {}
            },
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn print_outcome(machine: &ScanStateMachine, args: &ScanArgs) -> Result<(), CliError> {
    match machine.view() {
        ScanView::Result { result, .. } => {
            let console = ConsoleCollaborator::stdout();
            if args.json {
                machine.save_result(&console).await?;
            } else {
                println!("{}", result.title());
                println!(
                    "  Confidence: {}% ({})",
                    result.confidence_percent(),
                    result.confidence_level()
                );
                println!("  Type: {}", result.vehicle_type);
                for (label, value) in result.specs() {
                    println!("  {}: {}", label, value);
                }
            }
            if args.share {
                machine.share_result(&console).await?;
            }
            Ok(())
        }
        ScanView::Error { error, .. } => Err(CliError::Scan(error.clone())),
        _ => {
            eprintln!("Scan cancelled.");
            Ok(())
        }
    }
}
