use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use domains::SubmissionLog;

/// Process-local record of each author's latest submission.
///
/// Without a retention window the map grows with every distinct author.
#[derive(Debug, Default)]
pub struct DashMapSubmissionLog {
    last: DashMap<String, DateTime<Utc>>,
    retention: Option<Duration>,
}

impl DashMapSubmissionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets authors whose latest submission is older than `retention`.
    /// Pass the antiflood cooldown: older entries can no longer block anyone.
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            last: DashMap::new(),
            retention: Some(retention),
        }
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}

#[async_trait]
impl SubmissionLog for DashMapSubmissionLog {
    async fn last_submission_at(&self, author: &str) -> Option<DateTime<Utc>> {
        self.last.get(author).map(|entry| *entry.value())
    }

    async fn record(&self, author: &str, at: DateTime<Utc>) {
        // Keep the latest time even if records arrive out of order.
        self.last
            .entry(author.to_string())
            .and_modify(|previous| *previous = (*previous).max(at))
            .or_insert(at);

        if let Some(retention) = self.retention {
            let horizon = at - retention;
            self.last.retain(|_, latest| *latest >= horizon);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[tokio::test]
    async fn remembers_latest_submission_per_author() {
        let log = DashMapSubmissionLog::new();
        let t0 = Utc.with_ymd_and_hms(2019, 7, 16, 10, 0, 0).unwrap();

        assert_eq!(log.last_submission_at("Jean").await, None);
        log.record("Jean", t0).await;
        log.record("Jean", t0 - Duration::seconds(30)).await;
        log.record("Marine", t0 + Duration::seconds(5)).await;

        assert_eq!(log.last_submission_at("Jean").await, Some(t0));
        assert_eq!(
            log.last_submission_at("Marine").await,
            Some(t0 + Duration::seconds(5))
        );
    }

    #[tokio::test]
    async fn entries_past_the_retention_window_are_dropped() {
        let log = DashMapSubmissionLog::with_retention(Duration::seconds(15));
        let t0 = Utc.with_ymd_and_hms(2019, 7, 16, 10, 0, 0).unwrap();

        log.record("Jean", t0).await;
        log.record("Marine", t0 + Duration::seconds(10)).await;
        assert_eq!(log.len(), 2);

        log.record("Alexandre", t0 + Duration::seconds(20)).await;
        assert_eq!(log.last_submission_at("Jean").await, None);
        assert_eq!(
            log.last_submission_at("Marine").await,
            Some(t0 + Duration::seconds(10))
        );
        assert_eq!(log.len(), 2);
    }
}
