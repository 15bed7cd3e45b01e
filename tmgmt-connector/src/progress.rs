//! Progress reporting for interactive submissions

use tracing::{error, info};

/// Receives progress of a multi-step interactive submission
pub trait ProgressReporter: Send + Sync {
    /// Step `current` of `total` (1-based) has completed
    fn step(&self, current: usize, total: usize, message: &str);

    fn finished(&self, success: bool, message: &str);
}

/// Reports progress through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn step(&self, current: usize, total: usize, message: &str) {
        info!("Processed {} out of {}. {}", current, total, message);
    }

    fn finished(&self, success: bool, message: &str) {
        if success {
            info!("{}", message);
        } else {
            error!("{}", message);
        }
    }
}
