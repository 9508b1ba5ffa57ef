use std::time::SystemTime;

pub trait SystemTimeExt {
    /// Whole seconds since the Unix epoch, clamped to zero for pre-epoch times.
    fn epoch_seconds(&self) -> u64;
}

impl SystemTimeExt for SystemTime {
    fn epoch_seconds(&self) -> u64 {
        self.duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Current wall-clock time in epoch seconds.
pub fn now_epoch_seconds() -> u64 {
    SystemTime::now().epoch_seconds()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn epoch_seconds_of_unix_epoch_is_zero() {
        assert_eq!(SystemTime::UNIX_EPOCH.epoch_seconds(), 0);
    }

    #[test]
    fn epoch_seconds_truncates_subsecond_part() {
        let time = SystemTime::UNIX_EPOCH + Duration::from_millis(42_999);
        assert_eq!(time.epoch_seconds(), 42);
    }

    #[test]
    fn pre_epoch_time_clamps_to_zero() {
        let time = SystemTime::UNIX_EPOCH - Duration::from_secs(10);
        assert_eq!(time.epoch_seconds(), 0);
    }
}
