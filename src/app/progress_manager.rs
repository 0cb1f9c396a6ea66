//! Progress UI for the media download.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use streamgrab_core::DownloadProgress;

const BYTES_TEMPLATE: &str =
    "{spinner} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {bytes_per_sec}";
const SPINNER_TEMPLATE: &str = "{spinner} {msg} {bytes} {bytes_per_sec}";

/// Byte progress bar once `Content-Length` is known, spinner until then.
///
/// A disabled reporter ignores every update.
pub(crate) struct ProgressReporter {
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    pub(crate) fn new(enabled: bool, label: &str) -> Self {
        if !enabled {
            return Self { bar: None };
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template(SPINNER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar: Some(bar) }
    }

    #[cfg(test)]
    pub(crate) fn is_enabled(&self) -> bool {
        self.bar.is_some()
    }

    pub(crate) fn update(&self, progress: DownloadProgress) {
        let Some(bar) = &self.bar else {
            return;
        };
        if let Some(total) = progress.total
            && bar.length() != Some(total)
        {
            bar.set_length(total);
            bar.set_style(
                ProgressStyle::with_template(BYTES_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );
        }
        bar.set_position(progress.downloaded);
    }

    pub(crate) fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}
