use std::sync::Arc;

use client_core::{ConsoleApi, SessionRole};
use shared::{
    domain::{FilterType, SearchCriteria, UserRole, SYSTEM_USER_ID},
    error::ApiError,
    protocol::{MetricRecord, MetricResponse, MetricsList},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
    drill_down::{MetricsView, ToggleLabel},
    events::{EventOutcome, PageError, PageErrorContext, PageEvent},
};
use crate::routing::{Navigation, NavigationError, Navigator, QueryParamMap, RouteSnapshot};

pub const FILTER_PARAM: &str = "filter";
pub const FILTER_TYPE_PARAM: &str = "filter_type";
pub const CURSOR_PARAM: &str = "cursor";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    Previous,
    Fresh,
    Next,
}

impl SearchDirection {
    /// `-1` previous page, `0` fresh search, `1` next page.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::Previous),
            0 => Some(Self::Fresh),
            1 => Some(Self::Next),
            _ => None,
        }
    }
}

/// Handle through which the host hands resolver output to a page.
#[derive(Clone)]
pub struct RouteDataSink {
    tx: mpsc::UnboundedSender<PageEvent>,
}

impl RouteDataSink {
    /// Returns false once the page is gone.
    pub fn deliver(&self, result: Result<MetricsList, ApiError>) -> bool {
        self.tx.send(PageEvent::RouteData(result)).is_ok()
    }
}

struct ActiveQuery {
    generation: u64,
    cancel: CancellationToken,
}

/// Controller for the metrics listing page.
///
/// Listing requests run as spawned tasks and report back through the page's event channel;
/// the host feeds those events to [`MetricsPage::handle_event`]. Only the query started last
/// may change the page: starting another search, [`MetricsPage::cancel_query`], and
/// [`MetricsPage::teardown`] all cancel the outstanding one, and a late event for it is
/// discarded on arrival.
pub struct MetricsPage {
    api: Arc<dyn ConsoleApi>,
    navigator: Arc<dyn Navigator>,
    session: Arc<dyn SessionRole>,
    events_tx: mpsc::UnboundedSender<PageEvent>,
    events_rx: mpsc::UnboundedReceiver<PageEvent>,
    lifetime: CancellationToken,
    active_query: Option<ActiveQuery>,
    generation: u64,
    criteria: SearchCriteria,
    view: MetricsView,
    metrics_count: usize,
    next_cursor: String,
    prev_cursor: String,
    error: String,
    ongoing_query: bool,
}

impl MetricsPage {
    pub fn new(
        api: Arc<dyn ConsoleApi>,
        navigator: Arc<dyn Navigator>,
        session: Arc<dyn SessionRole>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            api,
            navigator,
            session,
            events_tx,
            events_rx,
            lifetime: CancellationToken::new(),
            active_query: None,
            generation: 0,
            criteria: SearchCriteria::default(),
            view: MetricsView::default(),
            metrics_count: 0,
            next_cursor: String::new(),
            prev_cursor: String::new(),
            error: String::new(),
            ongoing_query: false,
        }
    }

    /// Seeds the search form and cursor from the current route and issues the initial
    /// query if the route asks for one. Must run inside a tokio runtime.
    pub fn init(&mut self) -> Option<u64> {
        let route = self.navigator.snapshot();
        let query = &route.query;

        self.criteria.filter = query.get(FILTER_PARAM).unwrap_or_default().to_string();
        self.criteria.filter_type = FilterType::from_query_value(query.get(FILTER_TYPE_PARAM));
        self.next_cursor = query.get(CURSOR_PARAM).unwrap_or_default().to_string();
        info!(
            url = %route.to_url(),
            filter = %self.criteria.filter,
            filter_type = self.criteria.filter_type.code(),
            "metrics page entered"
        );

        if !self.next_cursor.is_empty() {
            self.search(SearchDirection::Next)
        } else if !self.criteria.is_default() {
            self.search(SearchDirection::Fresh)
        } else {
            None
        }
    }

    pub fn route_data_sink(&self) -> RouteDataSink {
        RouteDataSink {
            tx: self.events_tx.clone(),
        }
    }

    /// Starts a listing query, cancelling the one in flight. Returns the query's generation,
    /// or `None` if the page has been torn down.
    pub fn search(&mut self, direction: SearchDirection) -> Option<u64> {
        if self.lifetime.is_cancelled() {
            debug!(?direction, "metrics page torn down; search ignored");
            return None;
        }

        if let Some(previous) = self.active_query.take() {
            previous.cancel.cancel();
            debug!(generation = previous.generation, "superseded in-flight metrics query");
        }
        self.ongoing_query = true;

        let cursor = match direction {
            SearchDirection::Previous => self.prev_cursor.clone(),
            SearchDirection::Fresh => String::new(),
            SearchDirection::Next => self.next_cursor.clone(),
        };
        let tombstones = self.criteria.filter_type.tombstones_only();
        let filter = self.criteria.filter.clone();

        self.generation += 1;
        let generation = self.generation;
        let cancel = self.lifetime.child_token();
        self.active_query = Some(ActiveQuery {
            generation,
            cancel: cancel.clone(),
        });

        debug!(generation, ?direction, %cursor, tombstones, "dispatching metrics query");
        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let sent_cursor = cursor.clone();
            let filter = Some(filter.as_str()).filter(|f| !f.is_empty());
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(generation, "metrics query cancelled before completion");
                }
                result = api.list_metrics("", filter, tombstones, Some(cursor.as_str())) => {
                    if cancel.is_cancelled() {
                        debug!(generation, "metrics query completed after cancellation; dropped");
                        return;
                    }
                    let _ = tx.send(PageEvent::SearchFinished {
                        generation,
                        cursor: sent_cursor,
                        result,
                    });
                }
            }
        });

        Some(generation)
    }

    /// Cancels the in-flight query, if any. List and cursors are left alone.
    pub fn cancel_query(&mut self) {
        if let Some(active) = self.active_query.take() {
            active.cancel.cancel();
            debug!(generation = active.generation, "metrics query cancelled");
        }
        self.ongoing_query = false;
    }

    /// Waits for the next event from a query or the resolver.
    pub async fn next_event(&mut self) -> Option<PageEvent> {
        self.events_rx.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<PageEvent> {
        self.events_rx.try_recv().ok()
    }

    pub fn handle_event(&mut self, event: PageEvent) -> EventOutcome {
        match event {
            PageEvent::SearchFinished {
                generation,
                cursor,
                result,
            } => self.finish_search(generation, cursor, result),
            PageEvent::RouteData(result) => self.apply_route_data(result),
        }
    }

    fn finish_search(
        &mut self,
        generation: u64,
        cursor: String,
        result: Result<MetricsList, ApiError>,
    ) -> EventOutcome {
        let is_current = self
            .active_query
            .as_ref()
            .is_some_and(|q| q.generation == generation && !q.cancel.is_cancelled());
        if !is_current {
            debug!(generation, "discarding result of stale metrics query");
            return EventOutcome::Discarded;
        }
        self.active_query = None;
        self.ongoing_query = false;

        match result {
            Ok(list) => {
                self.error.clear();
                self.metrics_count = list.items.len();
                self.view.replace(list.items);
                self.next_cursor = list.next_cursor;
                self.record_query_in_url(cursor);
                EventOutcome::Applied
            }
            Err(err) => {
                warn!(generation, error = %err, "metrics query failed");
                self.error = err.to_string();
                EventOutcome::Failed(PageError::from_api(PageErrorContext::Search, &err))
            }
        }
    }

    fn apply_route_data(&mut self, result: Result<MetricsList, ApiError>) -> EventOutcome {
        match result {
            Ok(list) => {
                self.metrics_count = list.items.len();
                self.view.replace(list.items);
                self.next_cursor = list.next_cursor;
                self.prev_cursor = list.prev_cursor;
                EventOutcome::Applied
            }
            Err(err) => {
                warn!(error = %err, "resolved metrics route data failed");
                self.error = err.to_string();
                EventOutcome::Failed(PageError::from_api(PageErrorContext::RouteData, &err))
            }
        }
    }

    fn record_query_in_url(&self, cursor: String) {
        let params = QueryParamMap::new()
            .with(FILTER_PARAM, self.criteria.filter.clone())
            .with(
                FILTER_TYPE_PARAM,
                self.criteria.filter_type.code().to_string(),
            )
            .with(CURSOR_PARAM, cursor);
        if let Err(err) = self.navigator.navigate(Navigation::MergeQuery(params)) {
            warn!(%err, "failed to record metrics query in the url");
        }
    }

    /// Shows only the record `id` with its responses, or restores the full list if a
    /// record is already shown.
    pub fn set_current_responses(&mut self, id: &str, responses: Vec<MetricResponse>) {
        self.view.toggle(id, responses);
        debug!(id, label = self.view.label().as_str(), "toggled metric responses");
    }

    /// Admin and developer roles may delete. An unknown role (code `0`) is refused even
    /// though it compares below the developer code.
    pub fn delete_allowed(&self) -> bool {
        self.session.session_role().is_at_least(UserRole::Developer)
    }

    pub fn view_account(&self, record: &MetricRecord) -> Result<RouteSnapshot, NavigationError> {
        self.navigator
            .navigate(Navigation::To(format!("/accounts/{}", record.id)))
    }

    /// Cancels any outstanding query for good. Later searches are ignored.
    pub fn teardown(&mut self) {
        self.cancel_query();
        self.lifetime.cancel();
        info!("metrics page left");
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.criteria.filter = filter.into();
    }

    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        self.criteria.filter_type = filter_type;
    }

    pub fn criteria(&self) -> &SearchCriteria {
        &self.criteria
    }

    pub fn metrics(&self) -> &[MetricRecord] {
        self.view.shown()
    }

    pub fn metrics_hidden(&self) -> &[MetricRecord] {
        self.view.hidden()
    }

    pub fn current_responses(&self) -> Option<&[MetricResponse]> {
        self.view.responses()
    }

    pub fn button_label(&self) -> ToggleLabel {
        self.view.label()
    }

    pub fn metrics_count(&self) -> usize {
        self.metrics_count
    }

    pub fn next_cursor(&self) -> &str {
        &self.next_cursor
    }

    pub fn prev_cursor(&self) -> &str {
        &self.prev_cursor
    }

    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn ongoing_query(&self) -> bool {
        self.ongoing_query
    }

    pub fn system_user_id(&self) -> String {
        SYSTEM_USER_ID.to_string()
    }
}

impl Drop for MetricsPage {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}

#[cfg(test)]
#[path = "../tests/page_tests.rs"]
mod tests;
