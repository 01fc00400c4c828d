use chrono::{DateTime, Duration, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// `start + count * seconds`, saturating instead of overflowing on absurd inputs.
pub fn add_seconds_per_item(start: DateTime<Utc>, count: i64, seconds: i64) -> DateTime<Utc> {
    let total = count.max(0).saturating_mul(seconds.max(0));
    Duration::try_seconds(total)
        .and_then(|d| start.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_count_times_seconds() {
        let start = Utc::now();
        assert_eq!(add_seconds_per_item(start, 10, 60), start + Duration::seconds(600));
        assert_eq!(add_seconds_per_item(start, 0, 60), start);
    }

    #[test]
    fn saturates_on_overflow() {
        let start = Utc::now();
        assert_eq!(
            add_seconds_per_item(start, i64::MAX, i64::MAX),
            DateTime::<Utc>::MAX_UTC
        );
    }
}
