//! Segmented playlist transfer through an external remux tool
//!
//! The tool is run once, non-interactively, copying audio and video without
//! re-encoding. Its diagnostic stream is read line by line while it runs;
//! `time=HH:MM:SS` status lines become elapsed-seconds progress.

use crate::downloader::progress::{ProgressEvent, ProgressReporter};
use crate::utils::error::{LensError, ToolFailureKind};
use bytes::BytesMut;
use futures::StreamExt;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::codec::{Decoder, FramedRead};
use tracing::{debug, error, info, warn};

/// Diagnostic marker for a refused request
pub const ACCESS_DENIED_MARKER: &str = "403 Forbidden";

/// Diagnostic marker for a vanished stream
pub const NOT_FOUND_MARKER: &str = "404 Not Found";

const DIAGNOSTIC_TAIL_LINES: usize = 5;

/// Splits the tool's diagnostic output into lines.
///
/// Status lines end in `\r` rather than `\n`, so both terminate a line.
/// Blank lines are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiagnosticLineCodec;

impl Decoder for DiagnosticLineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, io::Error> {
        while let Some(pos) = src.iter().position(|b| *b == b'\n' || *b == b'\r') {
            let raw = src.split_to(pos + 1);
            let line = String::from_utf8_lossy(&raw[..pos]).trim().to_string();
            if !line.is_empty() {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, io::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let rest = src.split();
        let line = String::from_utf8_lossy(&rest).trim().to_string();
        Ok((!line.is_empty()).then_some(line))
    }
}

/// Elapsed seconds from a `time=HH:MM:SS` status line
pub fn parse_elapsed(line: &str) -> Option<u64> {
    let start = line.find("time=")? + "time=".len();
    let stamp = line.get(start..start + 8)?;

    let mut total = 0u64;
    let mut fields = 0;
    for field in stamp.split(':') {
        if field.len() != 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        total = total * 60 + field.parse::<u64>().ok()?;
        fields += 1;
    }
    (fields == 3).then_some(total)
}

/// What is kept of the tool's diagnostic stream: whether either failure
/// marker was seen, and the last few non-empty lines
#[derive(Debug, Default, Clone)]
pub struct DiagnosticTail {
    access_denied: bool,
    not_found: bool,
    lines: VecDeque<String>,
}

impl DiagnosticTail {
    pub fn push(&mut self, line: String) {
        if line.trim().is_empty() {
            return;
        }
        self.access_denied |= line.contains(ACCESS_DENIED_MARKER);
        self.not_found |= line.contains(NOT_FOUND_MARKER);
        if self.lines.len() == DIAGNOSTIC_TAIL_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// Classify a non-zero exit
    pub fn into_failure(self, exit_code: i32) -> LensError {
        let kind = if self.access_denied {
            ToolFailureKind::PermissionDenied
        } else if self.not_found {
            ToolFailureKind::ResourceMissing
        } else {
            ToolFailureKind::Generic
        };

        LensError::ExternalToolFailure {
            kind,
            exit_code,
            diagnostics: self.lines.into(),
        }
    }
}

impl FromIterator<String> for DiagnosticTail {
    fn from_iter<I: IntoIterator<Item = String>>(lines: I) -> Self {
        let mut tail = Self::default();
        for line in lines {
            tail.push(line);
        }
        tail
    }
}

/// The remux executable, located on the host
#[derive(Debug, Clone)]
pub struct Muxer {
    program: PathBuf,
}

impl Muxer {
    /// Find the executable without running it
    pub fn locate(program: &str) -> Result<Self, LensError> {
        match which::which(program) {
            Ok(path) => {
                debug!("Using remux tool at {}", path.display());
                Ok(Self { program: path })
            }
            Err(e) => {
                error!("{} not found: {}", program, e);
                Err(LensError::ExternalToolMissing(program.to_string()))
            }
        }
    }

    /// Arguments for one remux run
    pub fn remux_args(url: &str, destination: &Path, user_agent: &str, referer: &str) -> Vec<OsString> {
        // The origin rejects the tool's default identification
        let headers = format!("User-Agent: {}\r\nReferer: {}\r\n", user_agent, referer);
        vec![
            "-nostdin".into(),
            "-headers".into(),
            headers.into(),
            "-i".into(),
            url.into(),
            "-c".into(),
            "copy".into(),
            // ADTS audio cannot be copied into MP4 as-is
            "-bsf:a".into(),
            "aac_adtstoasc".into(),
            "-y".into(),
            destination.as_os_str().to_os_string(),
        ]
    }

    /// Run the tool to completion, or until `deadline` passes
    pub async fn remux(
        &self,
        url: &str,
        destination: &Path,
        user_agent: &str,
        referer: &str,
        reporter: &mut ProgressReporter,
        deadline: Option<Duration>,
    ) -> Result<(), LensError> {
        info!("Remuxing {} into {}", url, destination.display());

        let mut child = Command::new(&self.program)
            .args(Self::remux_args(url, destination, user_agent, referer))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => {
                    LensError::ExternalToolMissing(self.program.display().to_string())
                }
                _ => LensError::ExternalToolFailure {
                    kind: ToolFailureKind::Generic,
                    exit_code: -1,
                    diagnostics: vec![format!("failed to start: {}", e)],
                },
            })?;

        // Drained separately so a full stdout pipe cannot stall the tool
        let stdout_drain = child.stdout.take().map(|mut stdout| {
            tokio::spawn(async move {
                let _ = tokio::io::copy(&mut stdout, &mut tokio::io::sink()).await;
            })
        });

        let stderr = child.stderr.take().ok_or_else(|| LensError::ExternalToolFailure {
            kind: ToolFailureKind::Generic,
            exit_code: -1,
            diagnostics: vec!["diagnostic stream unavailable".to_string()],
        })?;

        let mut diagnostics = DiagnosticTail::default();
        let supervise = async {
            let mut lines = FramedRead::new(stderr, DiagnosticLineCodec);
            while let Some(line) = lines.next().await {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("Failed to read remux diagnostics: {}", e);
                        break;
                    }
                };
                if let Some(elapsed) = parse_elapsed(&line) {
                    reporter.report(ProgressEvent::ElapsedSeconds(elapsed));
                }
                diagnostics.push(line);
            }
            child.wait().await
        };

        let outcome = match deadline {
            Some(limit) => tokio::time::timeout(limit, supervise)
                .await
                .map_err(|_| limit),
            None => Ok(supervise.await),
        };

        let status = match outcome {
            Ok(status) => status?,
            Err(limit) => {
                warn!("Remux tool exceeded {:?}; terminating", limit);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill remux tool: {}", e);
                }
                return Err(LensError::ExternalToolTimeout { after: limit });
            }
        };

        if let Some(handle) = stdout_drain {
            let _ = handle.await;
        }

        if status.success() {
            info!("Remux finished: {}", destination.display());
            return Ok(());
        }

        let exit_code = status.code().unwrap_or(-1);
        error!("Remux tool exited with code {}", exit_code);
        Err(diagnostics.into_failure(exit_code))
    }
}
