//! Logging for optimization runs.

/// Verbosity level for run output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// No output.
    Silent,
    /// New incumbents and run summary.
    #[default]
    Info,
    /// Per-iteration detail.
    Debug,
}

/// Emits run progress through the `log` facade, gated by [`Verbosity`].
#[derive(Debug)]
pub(crate) struct RunLogger {
    verbosity: Verbosity,
}

impl RunLogger {
    pub(crate) fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    pub(crate) fn iteration(&self, iteration: usize, target: f64) {
        if self.verbosity >= Verbosity::Debug {
            log::debug!("iteration {iteration}: evaluated target {target:.6}");
        }
    }

    pub(crate) fn new_best(&self, iteration: usize, value: f64) {
        if self.verbosity >= Verbosity::Info {
            log::info!("iteration {iteration}: new best {value:.6}");
        }
    }

    pub(crate) fn exhausted(&self, iterations: usize) {
        if self.verbosity >= Verbosity::Info {
            log::info!("candidate pool exhausted after {iterations} iterations");
        }
    }
}
