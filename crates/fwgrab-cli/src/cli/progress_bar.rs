//! One-line progress bar on stderr while a firmware file downloads.

use fwgrab_core::fetch::{FetchError, FetchObserver, FetchedFile, ProgressStats};
use fwgrab_core::plan::DownloadPlan;
use std::io::Write;
use std::time::{Duration, Instant};

const BAR_WIDTH: usize = 50;
const REDRAW_EVERY: Duration = Duration::from_millis(100);
const MIB: f64 = 1024.0 * 1024.0;

/// Renders `[label] █████.....  42.00% (1.23 MB / 2.92 MB)`.
/// Without a known total only the byte count is shown.
pub fn render_bar(label: &str, stats: &ProgressStats) -> String {
    let done_mb = stats.bytes_done as f64 / MIB;
    match (stats.fraction(), stats.total_bytes) {
        (Some(fraction), Some(total)) => {
            let filled = ((fraction * BAR_WIDTH as f64) as usize).min(BAR_WIDTH);
            format!(
                "[{}] {}{} {:6.2}% ({:.2} MB / {:.2} MB)",
                label,
                "█".repeat(filled),
                ".".repeat(BAR_WIDTH - filled),
                fraction * 100.0,
                done_mb,
                total as f64 / MIB
            )
        }
        _ => format!("[{}] {:.2} MB", label, done_mb),
    }
}

pub struct ConsoleProgress<W: Write> {
    out: W,
    label: String,
    last_draw: Option<Instant>,
}

impl<W: Write> ConsoleProgress<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            label: String::new(),
            last_draw: None,
        }
    }
}

impl<W: Write> FetchObserver for ConsoleProgress<W> {
    fn on_start(&mut self, index: usize, count: usize, plan: &DownloadPlan) {
        self.label = format!("{} - {}", plan.entry.section, plan.entry.version);
        self.last_draw = None;
        let _ = writeln!(
            self.out,
            "({}/{}) {} -> {}",
            index + 1,
            count,
            plan.entry.url,
            plan.file_path().display()
        );
    }

    fn on_progress(&mut self, _plan: &DownloadPlan, stats: &ProgressStats) {
        let now = Instant::now();
        if self
            .last_draw
            .map_or(false, |t| now.duration_since(t) < REDRAW_EVERY)
        {
            return;
        }
        self.last_draw = Some(now);
        let _ = write!(self.out, "\r{}", render_bar(&self.label, stats));
        let _ = self.out.flush();
    }

    fn on_finish(&mut self, _plan: &DownloadPlan, result: &Result<FetchedFile, FetchError>) {
        if self.last_draw.is_some() {
            let _ = writeln!(self.out);
        }
        let _ = match result {
            Ok(file) => writeln!(self.out, "[{}] done, md5 {}", self.label, file.md5),
            Err(e) => writeln!(self.out, "[{}] failed: {}", self.label, e),
        };
    }
}
