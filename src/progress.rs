use std::io::{self, Write};
use std::time::Instant;

pub struct ConsoleProgress {
    enabled: bool,
    verbose: bool,
    t0: Instant,
}

impl ConsoleProgress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            verbose: false,
            t0: Instant::now(),
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        if !self.enabled {
            return;
        }
        self.emit(msg.as_ref());
    }

    // Printed even when `enabled` is false.
    pub fn warn(&self, msg: impl AsRef<str>) {
        self.emit(&format!("warning: {}", msg.as_ref()));
    }

    pub fn debug(&self, msg: impl AsRef<str>) {
        if !self.enabled || !self.verbose {
            return;
        }
        self.emit(msg.as_ref());
    }

    fn emit(&self, line: &str) {
        let ts = fmt_elapsed(self.t0.elapsed().as_secs_f64());
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "[{ts}] {line}");
    }
}

fn fmt_elapsed(seconds: f64) -> String {
    let seconds = seconds.max(0.0) as u64;
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::fmt_elapsed;

    #[test]
    fn elapsed_switches_to_hours() {
        assert_eq!(fmt_elapsed(59.4), "00:59");
        assert_eq!(fmt_elapsed(3725.0), "01:02:05");
    }
}
