//! Progress tracking for transfers

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// One progress report
///
/// Direct transfers report a percentage of bytes received; segmented
/// transfers only know how much media time has been written so far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressEvent {
    /// 0.0 to 100.0
    Percent(f64),
    /// Seconds of media written
    ElapsedSeconds(u64),
}

impl ProgressEvent {
    pub fn value(&self) -> f64 {
        match self {
            ProgressEvent::Percent(p) => *p,
            ProgressEvent::ElapsedSeconds(s) => *s as f64,
        }
    }
}

/// Caller side of the progress channel
pub type ProgressSink = mpsc::Sender<ProgressEvent>;

/// Forwards progress to an optional sink, never letting the value go backwards.
///
/// Reporting never waits on the receiver: when the channel is full the
/// event is dropped and the transfer carries on.
#[derive(Debug)]
pub struct ProgressReporter {
    sink: Option<ProgressSink>,
    last: Option<f64>,
}

impl ProgressReporter {
    pub fn new(sink: Option<ProgressSink>) -> Self {
        Self { sink, last: None }
    }

    pub fn report(&mut self, event: ProgressEvent) {
        let value = event.value();
        if self.last.is_some_and(|last| value <= last) {
            return;
        }
        self.last = Some(value);

        let Some(sink) = &self.sink else {
            return;
        };
        match sink.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!("Progress channel full, dropping {:?}", event);
            }
            Err(TrySendError::Closed(_)) => {
                // Receiver gone; keep transferring without reports
                warn!("Progress receiver closed, no further updates will be sent");
                self.sink = None;
            }
        }
    }

    /// Last value forwarded, if any
    pub fn last(&self) -> Option<f64> {
        self.last
    }
}
