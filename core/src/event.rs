//! Progress reporting from the pipeline to whoever is watching it.
//!
//! Stages run on many worker threads at once, so events are delivered through an
//! [`EventSink`]. The provided implementations hand events to a channel, which
//! serializes delivery for the consumer on the other end.

use std::sync::mpsc;

use cfst_common::network::candidate::FinalResult;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// A TCP probe finished. `valid` counts reachable candidates so far.
    ScanProgress { done: usize, total: usize, valid: usize },
    /// Free-form status line.
    Status(String),
    /// A point-of-presence lookup finished.
    ColoProgress { done: usize, total: usize },
    /// A candidate finished testing and was kept.
    Row(FinalResult),
    /// Enough fast endpoints were found; testing stops early.
    FastExit,
    /// Terminal: the run produced `results` ranked endpoints.
    Complete { results: usize },
    /// Terminal: the run ended without a usable result.
    Error(String),
}

impl PipelineEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineEvent::Complete { .. } | PipelineEvent::Error(_))
    }
}

/// Receives pipeline events. Called concurrently from worker threads.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: PipelineEvent) {}
}

impl EventSink for UnboundedSender<PipelineEvent> {
    fn emit(&self, event: PipelineEvent) {
        // A closed receiver means nobody is watching anymore.
        let _ = self.send(event);
    }
}

impl EventSink for mpsc::Sender<PipelineEvent> {
    fn emit(&self, event: PipelineEvent) {
        let _ = self.send(event);
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_channel_preserves_events_from_many_threads() {
        let (tx, rx) = mpsc::channel::<PipelineEvent>();

        std::thread::scope(|s| {
            for i in 0..4 {
                let tx = &tx;
                s.spawn(move || tx.emit(PipelineEvent::Status(format!("worker {i}"))));
            }
        });
        drop(tx);

        let received: Vec<PipelineEvent> = rx.iter().collect();
        assert_eq!(received.len(), 4);
    }

    #[test]
    fn closed_tokio_channel_is_ignored() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<PipelineEvent>();
        drop(rx);
        tx.emit(PipelineEvent::FastExit);
    }

    #[test]
    fn only_complete_and_error_are_terminal() {
        assert!(PipelineEvent::Complete { results: 0 }.is_terminal());
        assert!(PipelineEvent::Error("x".into()).is_terminal());
        assert!(!PipelineEvent::FastExit.is_terminal());
    }
}
