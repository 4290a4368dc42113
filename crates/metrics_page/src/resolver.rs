use std::sync::Arc;

use client_core::ConsoleApi;
use shared::{error::ApiError, protocol::MetricsList};
use tracing::debug;

use crate::routing::RouteSnapshot;

/// Pre-fetches the first page of metrics for a route before the page renders. Hosts
/// hand the result to the page before calling [`crate::MetricsPage::init`].
///
/// Reads `filter` and `tombstones` from the target route. The page itself reads
/// `filter_type` instead of `tombstones`; the two keys are kept separate.
#[derive(Clone)]
pub struct MetricsResolver {
    api: Arc<dyn ConsoleApi>,
}

impl MetricsResolver {
    pub fn new(api: Arc<dyn ConsoleApi>) -> Self {
        Self { api }
    }

    pub async fn resolve(&self, route: &RouteSnapshot) -> Result<MetricsList, ApiError> {
        let filter = route.query.get("filter");
        let tombstones = route.query.get("tombstones") == Some("true");
        debug!(?filter, tombstones, "resolving metrics route data");
        self.api.list_metrics("", filter, tombstones, None).await
    }
}

#[cfg(test)]
#[path = "tests/resolver_tests.rs"]
mod tests;
