//! Transfer size policy and human-readable units.

/// Default transfer ceiling for ordinary (non-premium) accounts: 2 GiB.
pub const DEFAULT_SIZE_LIMIT: u64 = 2 * 1024 * 1024 * 1024;

/// Policy gate applied before transferring a file.
#[derive(Debug, Clone, Copy)]
pub struct SizeGuard {
    limit: u64,
}

/// A rejected transfer, carrying the notice shown to the requester.
/// Rejection is a policy no-op, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeRejection {
    pub size: u64,
    pub limit: u64,
}

impl SizeRejection {
    pub fn notice(&self) -> String {
        format!(
            "File size {} exceeds the {} limit.",
            human_size(self.size),
            human_size(self.limit)
        )
    }
}

impl SizeGuard {
    pub fn new(limit: u64) -> Self {
        SizeGuard { limit }
    }

    /// Size 0 means "no definite size applies" (text-only content) and always
    /// passes. Privileged (premium) sessions are exempt from the ceiling.
    pub fn check(&self, size: u64, privileged: bool) -> Result<(), SizeRejection> {
        if size == 0 || privileged || size <= self.limit {
            Ok(())
        } else {
            Err(SizeRejection {
                size,
                limit: self.limit,
            })
        }
    }
}

const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

pub fn human_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

pub fn human_duration(secs: u64) -> String {
    let (h, rem) = (secs / 3600, secs % 3600);
    let (m, s) = (rem / 60, rem % 60);
    if h > 0 {
        format!("{h}h {m}m {s}s")
    } else if m > 0 {
        format!("{m}m {s}s")
    } else {
        format!("{s}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_size_always_permitted() {
        let guard = SizeGuard::new(DEFAULT_SIZE_LIMIT);
        assert!(guard.check(0, false).is_ok());
        assert!(guard.check(0, true).is_ok());
    }

    #[test]
    fn test_over_limit_rejected_unless_privileged() {
        let guard = SizeGuard::new(100);
        assert!(guard.check(101, false).is_err());
        assert!(guard.check(101, true).is_ok());
        assert!(guard.check(100, false).is_ok());
    }

    #[test]
    fn test_rejection_notice_mentions_both_sizes() {
        let guard = SizeGuard::new(1024);
        let rejection = guard.check(4096, false).unwrap_err();
        let notice = rejection.notice();
        assert!(notice.contains("4.00 KiB"));
        assert!(notice.contains("1.00 KiB"));
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(1024), "1.00 KiB");
        assert_eq!(human_size(1536), "1.50 KiB");
        assert_eq!(human_size(2 * 1024 * 1024 * 1024), "2.00 GiB");
    }

    #[test]
    fn test_human_duration() {
        assert_eq!(human_duration(5), "5s");
        assert_eq!(human_duration(65), "1m 5s");
        assert_eq!(human_duration(3661), "1h 1m 1s");
    }
}
