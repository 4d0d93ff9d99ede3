use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};

/// Start and end timestamps of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    /// When the handler accepted the batch.
    pub started_at: Timestamp,
    /// When the response was produced.
    pub ended_at: Timestamp,
}

impl Timing {
    pub fn new(started_at: Timestamp, ended_at: Timestamp) -> Self {
        Self {
            started_at,
            ended_at,
        }
    }

    /// Timing of a batch started at `started_at` and ending now.
    pub fn since(started_at: Timestamp) -> Self {
        Self::new(started_at, Timestamp::now())
    }

    pub fn duration(&self) -> SignedDuration {
        self.ended_at.duration_since(self.started_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_is_end_minus_start() {
        let start = Timestamp::now();
        let timing = Timing::new(start, start + SignedDuration::from_millis(250));

        assert_eq!(timing.duration().as_millis(), 250);
    }
}
