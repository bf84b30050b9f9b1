//! Progress bars for long-running exports

use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}";

pub struct ProgressTracker {
    bar: ProgressBar,
}

impl ProgressTracker {
    /// Creates a bar counting to `total` planes
    pub fn new(total: u64, description: &str) -> Self {
        let style = ProgressStyle::default_bar()
            .template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        let bar = ProgressBar::new(total);
        bar.set_style(style);
        bar.set_message(description.to_string());

        ProgressTracker { bar }
    }

    /// Creates a tracker that draws nothing
    pub fn hidden(total: u64) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total);
        ProgressTracker { bar }
    }

    pub fn increment(&self, amount: u64) {
        self.bar.inc(amount);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("Completed");
    }

    pub fn set_message(&self, msg: &str) {
        self.bar.set_message(msg.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_tracker_counts() {
        let tracker = ProgressTracker::hidden(4);
        tracker.increment(1);
        tracker.increment(2);
        assert_eq!(tracker.position(), 3);
        tracker.finish();
    }
}
