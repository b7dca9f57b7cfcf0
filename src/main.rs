//! Lensloader - course and lens video downloader
//!
//! Resolves a page URL or video id to a playable stream and saves it locally.

use anyhow::Result;
use clap::Parser;
use lensloader::downloader::ProgressEvent;
use lensloader::transport::SessionCookie;
use lensloader::{AuthMode, DownloadOrchestrator, DownloadRequest, DownloaderSettings, HttpTransport, Quality};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Download videos from a page URL or video id")]
struct Args {
    /// Page URL or video id
    reference: String,

    /// Output directory (defaults to the settings file, then the current directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Preferred quality: uhd, fhd, hd, sd or ld
    #[arg(short, long)]
    quality: Option<Quality>,

    /// JSON cookie file exported from a logged-in browser
    #[arg(short, long, conflicts_with_all = ["cookie", "no_cookies"])]
    cookies: Option<PathBuf>,

    /// Session cookie as NAME=VALUE (repeatable)
    #[arg(long, conflicts_with = "no_cookies")]
    cookie: Vec<String>,

    /// Do not send any cookies (free public videos only)
    #[arg(long)]
    no_cookies: bool,

    /// JSON settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Remux program to use for playlist streams
    #[arg(long)]
    muxer: Option<String>,

    /// Give up on the remux tool after this many seconds
    #[arg(long)]
    deadline: Option<u64>,
}

impl Args {
    fn settings(&self) -> Result<DownloaderSettings> {
        let mut settings = match &self.config {
            Some(path) => DownloaderSettings::load(path)?,
            None => DownloaderSettings::default(),
        };

        if let Some(output) = &self.output {
            settings.output_dir = output.clone();
        }
        if let Some(quality) = self.quality {
            settings.quality = quality;
        }
        if let Some(muxer) = &self.muxer {
            settings.muxer_program = muxer.clone();
        }
        if self.deadline.is_some() {
            settings.muxer_deadline_secs = self.deadline;
        }

        if self.no_cookies {
            settings.auth = AuthMode::None;
        } else if let Some(path) = &self.cookies {
            settings.auth = AuthMode::CookieFile(path.clone());
        } else if !self.cookie.is_empty() {
            let cookies = self
                .cookie
                .iter()
                .map(|pair| SessionCookie::parse_pair(pair))
                .collect::<Result<Vec<_>, _>>()?;
            settings.auth = AuthMode::Supplied(cookies);
        }

        settings.validate()?;
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let settings = args.settings()?;
    if settings.auth == AuthMode::None && !args.no_cookies {
        tracing::warn!("No cookies supplied; paid lessons will not resolve. Use -c cookies.json");
    }

    let transport = HttpTransport::new(&settings.auth)?.into_shared();
    let orchestrator = DownloadOrchestrator::new(transport, &settings)?;

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<ProgressEvent>(64);
    let printer = tokio::spawn(async move {
        while let Some(event) = progress_rx.recv().await {
            match event {
                ProgressEvent::Percent(p) => eprint!("\rProgress: {:.1}%", p),
                ProgressEvent::ElapsedSeconds(s) => eprint!("\rDownloaded {} s of media", s),
            }
        }
        eprintln!();
    });

    let request = DownloadRequest::new(&args.reference, &settings.output_dir, settings.quality)
        .with_progress(progress_tx);
    let result = orchestrator.run(request).await;
    let _ = printer.await;

    match result {
        Ok(path) => {
            println!("Saved to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Download failed: {}", e);
            if let lensloader::LensError::ExternalToolFailure { diagnostics, .. } = &e {
                for line in diagnostics {
                    eprintln!("  {}", line);
                }
            }
            eprintln!("Hint: {}", e.hint());
            Ok(ExitCode::FAILURE)
        }
    }
}
