use std::time::{Duration, Instant};

/// Wall-clock timer around a whole run. Purely diagnostic.
#[derive(Debug)]
pub struct Stopwatch {
    label: &'static str,
    started: Instant,
}

impl Stopwatch {
    pub fn start(label: &'static str) -> Self {
        tracing::debug!(label, "timer started");
        Self {
            label,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Stop the timer and log the elapsed time.
    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        tracing::info!(
            label = self.label,
            "finished in {:.3}s",
            elapsed.as_secs_f64()
        );
        elapsed
    }
}
