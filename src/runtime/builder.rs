use super::Runtime;
use crate::error::Error;

/// Builder for configuring and creating a [`Runtime`].
///
/// # Examples
///
/// ```rust,ignore
/// let rt = RuntimeBuilder::new()
///     .resolver_threads(4)
///     .isolate_faults(true)
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    /// Number of worker threads performing blocking name lookups.
    resolver_threads: usize,

    /// Whether a task fault is logged and discarded instead of aborting
    /// the loop.
    isolate_faults: bool,
}

impl RuntimeBuilder {
    /// Creates a builder with default configuration: two resolver
    /// workers, faults propagate to the caller of `run()`.
    pub fn new() -> Self {
        Self {
            resolver_threads: 2,
            isolate_faults: false,
        }
    }

    /// Sets the number of resolver worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn resolver_threads(mut self, n: usize) -> Self {
        assert!(n > 0, "resolver_threads must be > 0");

        self.resolver_threads = n;
        self
    }

    /// Isolates per-task faults: a faulting task is logged and
    /// discarded, and the loop keeps running the others.
    pub fn isolate_faults(mut self, isolate: bool) -> Self {
        self.isolate_faults = isolate;
        self
    }

    /// Builds the runtime, creating the multiplexer instance and the
    /// resolver pool.
    pub fn build(self) -> Result<Runtime, Error> {
        Runtime::with_options(self.resolver_threads, self.isolate_faults)
    }
}

impl Default for RuntimeBuilder {
    /// Creates a default `RuntimeBuilder`.
    fn default() -> Self {
        Self::new()
    }
}
