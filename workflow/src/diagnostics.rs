use std::sync::{Mutex, PoisonError};

use tracing::Level;

/// Receiver of the workflow's progress and problem reports
///
/// Injected into [`run_training`](crate::run_training), so the caller decides where messages
/// go instead of relying on process-wide logging state.
pub trait Diagnostics {
    fn emit(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.emit(Level::INFO, message);
    }

    fn warn(&self, message: &str) {
        self.emit(Level::WARN, message);
    }
}

/// Forward every message to the installed `tracing` subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn emit(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => tracing::error!("{}", message),
            Level::WARN => tracing::warn!("{}", message),
            Level::INFO => tracing::info!("{}", message),
            Level::DEBUG => tracing::debug!("{}", message),
            _ => tracing::trace!("{}", message),
        }
    }
}

/// Keep messages in memory
#[derive(Debug, Default)]
pub struct CapturedDiagnostics {
    messages: Mutex<Vec<(Level, String)>>,
}

impl CapturedDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages, oldest first
    pub fn messages(&self) -> Vec<(Level, String)> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages emitted at `WARN` level or above
    pub fn warnings(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(level, _)| *level <= Level::WARN)
            .map(|(_, message)| message)
            .collect()
    }
}

impl Diagnostics for CapturedDiagnostics {
    fn emit(&self, level: Level, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::{CapturedDiagnostics, Diagnostics};
    use tracing::Level;

    #[test]
    fn captures_in_order() {
        let diagnostics = CapturedDiagnostics::new();
        diagnostics.info("loading");
        diagnostics.warn("slow download");
        diagnostics.emit(Level::ERROR, "gave up");

        assert_eq!(diagnostics.messages().len(), 3);
        assert_eq!(diagnostics.messages()[0], (Level::INFO, "loading".to_string()));
        assert_eq!(diagnostics.warnings(), vec!["slow download", "gave up"]);
    }
}
