//! Terminal rendering of engine progress events.
//!
//! One indicatif bar per in-flight transfer inside a `MultiProgress`; skip,
//! size-mismatch and retry notices are printed above the bars.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use myrient_dl::download::{DownloadError, ProgressObserver, TransferProgress};
use myrient_dl::FileDescriptor;

use crate::output::{format_bytes, truncate_to_width};

/// Maximum width of the file label shown next to a bar.
const MAX_LABEL_WIDTH: usize = 48;

/// Observer drawing progress bars on stderr.
pub(crate) struct TerminalProgress {
    multi: MultiProgress,
    labels: Labels,
}

/// `[current/total] name` labels keyed by file name.
///
/// A label lives from `on_start` until the file is skipped or its transfer
/// finishes, so retried attempts keep their index.
type Labels = Arc<Mutex<HashMap<String, String>>>;

impl TerminalProgress {
    /// Creates the observer. Bars are drawn only when `draw_bars` is set;
    /// notices are printed either way.
    pub(crate) fn new(draw_bars: bool) -> Self {
        let target = if draw_bars {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        Self {
            multi: MultiProgress::with_draw_target(target),
            labels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn notice(&self, line: String) {
        if self.multi.is_hidden() {
            println!("{line}");
        } else {
            let _ = self.multi.println(line);
        }
    }

    fn label_for(&self, file: &FileDescriptor) -> String {
        self.labels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&file.name)
            .cloned()
            .unwrap_or_else(|| truncate_to_width(&file.name, MAX_LABEL_WIDTH))
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} @ {binary_bytes_per_sec} ETA {eta}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner} {msg} {bytes} @ {binary_bytes_per_sec}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }
}

impl ProgressObserver for TerminalProgress {
    fn on_start(&self, file: &FileDescriptor, current: usize, total: usize) {
        let label = format!(
            "[{current}/{total}] {}",
            truncate_to_width(&file.name, MAX_LABEL_WIDTH)
        );
        self.labels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(file.name.clone(), label);
    }

    fn on_skip(&self, file: &FileDescriptor) {
        forget_label(&self.labels, &file.name);
        self.notice(format!("  ✓ Already downloaded (skipping): {}", file.name));
    }

    fn on_size_mismatch(&self, file: &FileDescriptor, local: u64, remote: u64) {
        self.notice(format!(
            "  ⚠ {}: size mismatch (local: {}, remote: {}), re-downloading",
            file.name,
            format_bytes(local),
            format_bytes(remote)
        ));
    }

    fn on_retry(&self, file: &FileDescriptor, attempt: u32, delay: Duration, error: &DownloadError) {
        self.notice(format!(
            "  ⚠ {}: attempt {attempt} failed ({error}), retrying in {:.1}s...",
            file.name,
            delay.as_secs_f64()
        ));
    }

    fn begin_transfer(
        &self,
        file: &FileDescriptor,
        content_length: Option<u64>,
    ) -> Box<dyn TransferProgress> {
        let bar = match content_length {
            Some(length) => {
                let bar = ProgressBar::new(length);
                bar.set_style(Self::bar_style());
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(Self::spinner_style());
                bar.enable_steady_tick(Duration::from_millis(120));
                bar
            }
        };
        let bar = self.multi.add(bar);
        bar.set_message(self.label_for(file));
        Box::new(BarProgress {
            bar,
            labels: Arc::clone(&self.labels),
            name: file.name.clone(),
        })
    }
}

fn forget_label(labels: &Labels, name: &str) {
    labels
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(name);
}

struct BarProgress {
    bar: ProgressBar,
    labels: Labels,
    name: String,
}

impl TransferProgress for BarProgress {
    fn advance(&self, bytes: u64) {
        self.bar.inc(bytes);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
        forget_label(&self.labels, &self.name);
    }

    fn abandon(&self) {
        self.bar.finish_and_clear();
    }
}
