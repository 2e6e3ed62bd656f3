use indicatif::{ProgressBar, ProgressStyle};
use kb_upload_core::progress::ProgressReporter;

const TEMPLATE: &str = "{msg} {wide_bar} {pos}/{len} files [{elapsed_precise}<{eta_precise}]";

/// Terminal progress bar on stderr. Hidden automatically when stderr is not a TTY.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(TEMPLATE).unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_message("File Upload Progress");
        BarProgress { bar }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for BarProgress {
    fn start(&self, total: u64) {
        self.bar.set_length(total);
    }

    fn advance(&self) {
        self.bar.inc(1);
    }

    fn finish(&self) {
        self.bar.finish();
    }
}
