//! Terminal progress bar for transfer batches

use bkt_core::ProgressSink;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const TEMPLATE: &str =
    "{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

/// Byte-based progress bar drawn on stderr
pub struct BarSink {
    bar: ProgressBar,
}

impl BarSink {
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
        bar.set_style(
            ProgressStyle::default_bar()
                .template(TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        bar.set_message(message.to_string());
        Self { bar }
    }
}

impl ProgressSink for BarSink {
    fn on_start(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
    }

    fn on_advance(&self, completed: u64, _total: u64) {
        // Workers report concurrently, so a smaller value may arrive late
        if completed > self.bar.position() {
            self.bar.set_position(completed);
        }
    }

    fn on_finish(&self, _completed: u64, _total: u64) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_tracks_largest_position() {
        let sink = BarSink::new("test");
        sink.bar.set_draw_target(ProgressDrawTarget::hidden());

        sink.on_start(100);
        sink.on_advance(40, 100);
        sink.on_advance(30, 100);
        assert_eq!(sink.bar.position(), 40);
        assert_eq!(sink.bar.length(), Some(100));

        sink.on_advance(100, 100);
        sink.on_finish(100, 100);
        assert!(sink.bar.is_finished());
    }
}
