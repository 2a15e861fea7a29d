//! Throttled transfer progress rendering.
//!
//! Status-message edits are API calls; the reporter spaces them at least
//! ten seconds apart no matter how often the transfer loop ticks.

use std::time::{Duration, Instant};

use crate::limits::{human_duration, human_size};

/// Minimum spacing between emitted status updates.
const EMIT_INTERVAL: Duration = Duration::from_secs(10);

/// Tracks one transfer and renders rate-limited status lines.
pub struct Progress {
    action: &'static str,
    started: Instant,
    last_emit: Option<Instant>,
}

impl Progress {
    pub fn new(action: &'static str) -> Self {
        Self::starting_at(action, Instant::now())
    }

    fn starting_at(action: &'static str, now: Instant) -> Self {
        Progress {
            action,
            started: now,
            last_emit: None,
        }
    }

    /// Feed the current transfer position. Returns a rendered status line
    /// when an update is due, at most once per ten-second window.
    pub fn tick(&mut self, current: u64, total: u64) -> Option<String> {
        self.tick_at(Instant::now(), current, total)
    }

    fn tick_at(&mut self, now: Instant, current: u64, total: u64) -> Option<String> {
        let since_last = match self.last_emit {
            Some(t) => now.duration_since(t),
            None => now.duration_since(self.started),
        };
        if since_last < EMIT_INTERVAL {
            return None;
        }
        self.last_emit = Some(now);
        Some(self.render(now, current, total))
    }

    fn render(&self, now: Instant, current: u64, total: u64) -> String {
        let elapsed = now.duration_since(self.started).as_secs_f64();
        let speed = if elapsed > 0.0 {
            current as f64 / elapsed
        } else {
            0.0
        };
        let percent = if total > 0 {
            current as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        let eta = if speed > 0.0 && total > current {
            human_duration(((total - current) as f64 / speed) as u64)
        } else {
            "-".to_string()
        };

        format!(
            "{}...\nProgress: {:.1}%\n{} / {}\nSpeed: {}/s\nETA: {}",
            self.action,
            percent,
            human_size(current),
            human_size(total),
            human_size(speed as u64),
            eta,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(start: Instant, secs: u64) -> Instant {
        start + Duration::from_secs(secs)
    }

    #[test]
    fn test_no_emission_before_ten_seconds() {
        let start = Instant::now();
        let mut progress = Progress::starting_at("Downloading", start);
        assert!(progress.tick_at(at(start, 1), 10, 100).is_none());
        assert!(progress.tick_at(at(start, 5), 50, 100).is_none());
        assert!(progress.tick_at(at(start, 9), 90, 100).is_none());
    }

    #[test]
    fn test_at_most_one_emission_per_window() {
        let start = Instant::now();
        let mut progress = Progress::starting_at("Downloading", start);

        // Arbitrary chunk pattern over 35 seconds: only the first tick in
        // each ten-second window may emit.
        let mut emitted = 0;
        for (secs, current) in [
            (2, 10),
            (10, 30),
            (11, 35),
            (14, 50),
            (20, 70),
            (25, 80),
            (31, 95),
            (33, 99),
        ] {
            if progress.tick_at(at(start, secs), current, 100).is_some() {
                emitted += 1;
            }
        }
        assert_eq!(emitted, 3); // at 10s, 20s and 31s
    }

    #[test]
    fn test_rendered_fields() {
        let start = Instant::now();
        let mut progress = Progress::starting_at("Downloading", start);
        let line = progress
            .tick_at(at(start, 10), 50 * 1024 * 1024, 100 * 1024 * 1024)
            .unwrap();
        assert!(line.contains("Downloading"));
        assert!(line.contains("50.0%"));
        assert!(line.contains("50.00 MiB / 100.00 MiB"));
        // 50 MiB over 10s is 5 MiB/s, leaving 10s for the rest.
        assert!(line.contains("5.00 MiB/s"));
        assert!(line.contains("ETA: 10s"));
    }

    #[test]
    fn test_unknown_speed_has_no_eta() {
        let start = Instant::now();
        let mut progress = Progress::starting_at("Downloading", start);
        let line = progress.tick_at(at(start, 10), 0, 100).unwrap();
        assert!(line.contains("ETA: -"));
    }
}
