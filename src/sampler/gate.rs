/// Minimum-interval gate. Accepts an offer when at least `interval` has passed
/// since the last accepted one; the very first offer is always accepted.
#[derive(Debug, Clone)]
pub struct Gate {
    interval_ms: i64,
    last_accepted_ms: Option<i64>,
}

impl Gate {
    pub fn new(interval_secs: u64) -> Self {
        Self {
            interval_ms: i64::try_from(interval_secs.saturating_mul(1000)).unwrap_or(i64::MAX),
            last_accepted_ms: None,
        }
    }

    pub fn offer(&mut self, now_ms: i64) -> bool {
        let open = match self.last_accepted_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.interval_ms,
        };
        if open {
            self.last_accepted_ms = Some(now_ms);
        }
        open
    }
}
