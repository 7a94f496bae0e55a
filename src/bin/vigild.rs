//! vigild - annotated stream daemon
//!
//! This daemon:
//! 1. Loads configuration (JSON file + environment overrides)
//! 2. Builds the detector backend shared by all detection streams
//! 3. Serves one multipart JPEG feed per configured stream
//! 4. Exposes the alert status and alert-log endpoints

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use vigil::api::ApiServer;
use vigil::config::VigildConfig;
use vigil::pipeline::CancelToken;

#[derive(Parser, Debug)]
#[command(name = "vigild", about = "annotated MJPEG streaming daemon")]
struct Args {
    /// Path to the JSON config file.
    #[arg(long, env = "VIGIL_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured listen address.
    #[arg(long)]
    listen: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = VigildConfig::load_with(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }

    log::info!("vigild {} starting", env!("CARGO_PKG_VERSION"));
    for stream in &config.streams {
        log::info!(
            "stream '{}': {:?} source={} threshold={:.2}",
            stream.id,
            stream.kind,
            stream.path,
            stream.confidence_threshold
        );
    }

    let cancel = CancelToken::new();
    let ctrlc_cancel = cancel.clone();
    ctrlc::set_handler(move || {
        log::info!("shutdown requested");
        ctrlc_cancel.cancel();
    })?;

    let server = ApiServer::new(config, cancel)?;
    server.serve()
}
