use std::fmt;

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::registry::Registry;

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Business counters exported at `/metrics`.
#[derive(Debug)]
pub struct BoardMetrics {
    registry: Registry,
    pub adverts_created: Counter,
    pub adverts_updated: Counter,
    pub adverts_deleted: Counter,
    pub applications_recorded: Counter,
    pub applications_withdrawn: Counter,
}

impl Default for BoardMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("advert_board");
        let adverts_created = Counter::default();
        let adverts_updated = Counter::default();
        let adverts_deleted = Counter::default();
        let applications_recorded = Counter::default();
        let applications_withdrawn = Counter::default();

        registry.register("adverts_created", "Adverts created", adverts_created.clone());
        registry.register("adverts_updated", "Adverts edited", adverts_updated.clone());
        registry.register("adverts_deleted", "Adverts deleted", adverts_deleted.clone());
        registry.register(
            "applications_recorded",
            "Applications submitted",
            applications_recorded.clone(),
        );
        registry.register(
            "applications_withdrawn",
            "Applications withdrawn",
            applications_withdrawn.clone(),
        );

        Self {
            registry,
            adverts_created,
            adverts_updated,
            adverts_deleted,
            applications_recorded,
            applications_withdrawn,
        }
    }

    pub fn render(&self) -> Result<String, fmt::Error> {
        let mut body = String::new();
        encode(&mut body, &self.registry)?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_appear_in_exposition() {
        let metrics = BoardMetrics::new();
        metrics.adverts_created.inc();
        metrics.adverts_created.inc();

        let body = metrics.render().unwrap();
        assert!(body.contains("advert_board_adverts_created_total 2"));
        assert!(body.contains("advert_board_applications_recorded_total 0"));
        assert!(body.ends_with("# EOF\n"));
    }
}
