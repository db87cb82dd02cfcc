//! Progress reporting

use tracing::info;

/// Receives human readable progress messages between cleanup phases
pub trait ProgressReporter {
    fn report(&mut self, message: &str);
}

/// Forwards progress messages to the `tracing` subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&mut self, message: &str) {
        info!("[Cleanup] {}", message);
    }
}

/// Collects messages, mostly for tests
impl ProgressReporter for Vec<String> {
    fn report(&mut self, message: &str) {
        self.push(message.to_string());
    }
}
