use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tf2idle_core::{BatchReporter, Error};

/// One spinner per account while its operation is in flight.
pub struct CliReporter {
    action: &'static str,
    multi: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl CliReporter {
    pub fn new(action: &'static str) -> Self {
        Self {
            action,
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }
}

impl BatchReporter for CliReporter {
    fn on_task_start(&self, username: &str) {
        let pb = self.multi.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} [{elapsed}] {msg}") {
            pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        }
        pb.set_message(format!("{} {}...", self.action, username));
        pb.enable_steady_tick(Duration::from_millis(80));

        let mut bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(old) = bars.insert(username.to_string(), pb) {
            old.finish_and_clear();
        }
    }

    fn on_task_complete(&self, username: &str, _error: Option<&Error>) {
        let mut bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pb) = bars.remove(username) {
            pb.finish_and_clear();
        }
    }

    fn on_batch_complete(&self) {
        let mut bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());
        for (_, pb) in bars.drain() {
            pb.finish_and_clear();
        }
    }
}
