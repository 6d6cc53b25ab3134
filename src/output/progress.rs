use std::io::{self, IsTerminal};
use std::time::{Duration, Instant};

use indicatif::{HumanDuration, ProgressBar, ProgressStyle};

use crate::models::FileSize;

/// Time left, extrapolated from the bytes moved so far. Recording files range
/// from a few kB of chat to gigabytes of video, so a per-file average says
/// little. Falls back to files when no sizes are known.
fn estimate_remaining(elapsed: Duration, done: (u64, u64), total: (u64, u64)) -> Option<Duration> {
    let (done_files, done_bytes) = done;
    let (total_files, total_bytes) = total;

    let fraction = if total_bytes > 0 && done_bytes > 0 {
        done_bytes as f64 / total_bytes as f64
    } else if total_files > 0 && done_files > 0 {
        done_files as f64 / total_files as f64
    } else {
        return None;
    };
    if fraction >= 1.0 {
        return None;
    }
    Some(elapsed.mul_f64((1.0 - fraction) / fraction))
}

/// Spinner for waits of unknown length (listing recordings, waiting on the browser).
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("[recsync] {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Files and bytes of a sync pass. Draws a bar on a terminal; elsewhere the
/// per-record lines go to stderr as plain text, or nowhere when hidden.
pub struct SyncProgress {
    bar: Option<ProgressBar>,
    quiet: bool,
    started: Instant,
    total: (u64, u64),
    done: (u64, u64),
}

impl SyncProgress {
    pub fn new() -> Self {
        let bar = io::stderr().is_terminal().then(|| {
            let pb = ProgressBar::new(0);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[recsync] {pos}/{len} files [{bar:30}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );
            pb
        });
        Self::with_bar(bar, false)
    }

    /// Never draws or prints. For tests and dry runs.
    pub fn hidden() -> Self {
        Self::with_bar(None, true)
    }

    fn with_bar(bar: Option<ProgressBar>, quiet: bool) -> Self {
        Self {
            bar,
            quiet,
            started: Instant::now(),
            total: (0, 0),
            done: (0, 0),
        }
    }

    /// Size of the work, once the candidates are known. Restarts the clock.
    pub fn start(&mut self, files: u64, bytes: u64) {
        self.total = (files, bytes);
        self.done = (0, 0);
        self.started = Instant::now();
        if let Some(pb) = &self.bar {
            pb.set_length(files);
            pb.set_message(format!("0B/{}", FileSize(bytes)));
        }
    }

    pub fn println(&self, msg: &str) {
        match &self.bar {
            Some(pb) => pb.println(msg),
            None if !self.quiet => eprintln!("{}", msg),
            None => {}
        }
    }

    /// One record finished (synced or given up on) after moving `bytes`.
    pub fn record_done(&mut self, bytes: u64) {
        self.done.0 += 1;
        self.done.1 += bytes;

        if let Some(pb) = &self.bar {
            pb.inc(1);
            let eta = estimate_remaining(self.started.elapsed(), self.done, self.total)
                .map(|left| format!(", ~{} left", HumanDuration(left)))
                .unwrap_or_default();
            pb.set_message(format!("{}/{}{}", FileSize(self.done.1), FileSize(self.total.1), eta));
        }
    }

    pub fn finish(&self) {
        if let Some(pb) = &self.bar {
            pb.finish_and_clear();
        }
    }
}
