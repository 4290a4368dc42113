use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use client_core::ConsoleApi;
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{MetricRecord, MetricsList},
};
use tokio::sync::oneshot;

use crate::{MetricsPage, PageEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListCall {
    pub id_scope: String,
    pub filter: Option<String>,
    pub tombstones: bool,
    pub cursor: Option<String>,
}

impl ListCall {
    pub(crate) fn new(filter: Option<&str>, tombstones: bool, cursor: Option<&str>) -> Self {
        Self {
            id_scope: String::new(),
            filter: filter.map(str::to_string),
            tombstones,
            cursor: cursor.map(str::to_string),
        }
    }
}

type Reply = Result<MetricsList, ApiError>;

enum Scripted {
    Ready(Reply),
    Gated(oneshot::Receiver<Reply>),
}

/// Console API double that records calls and answers from a script, in call order.
/// Unscripted calls get an empty page.
#[derive(Default)]
pub(crate) struct ScriptedApi {
    calls: Mutex<Vec<ListCall>>,
    script: Mutex<VecDeque<Scripted>>,
}

impl ScriptedApi {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn reply(&self, reply: Reply) {
        self.script
            .lock()
            .expect("script lock")
            .push_back(Scripted::Ready(reply));
    }

    /// Queues a reply that is held back until the returned sender fires.
    pub(crate) fn gate(&self) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.script
            .lock()
            .expect("script lock")
            .push_back(Scripted::Gated(rx));
        tx
    }

    pub(crate) fn calls(&self) -> Vec<ListCall> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl ConsoleApi for ScriptedApi {
    async fn list_metrics(
        &self,
        id_scope: &str,
        filter: Option<&str>,
        tombstones: bool,
        cursor: Option<&str>,
    ) -> Result<MetricsList, ApiError> {
        self.calls.lock().expect("calls lock").push(ListCall {
            id_scope: id_scope.to_string(),
            filter: filter.map(str::to_string),
            tombstones,
            cursor: cursor.map(str::to_string),
        });
        let next = self.script.lock().expect("script lock").pop_front();
        match next {
            None => Ok(MetricsList::default()),
            Some(Scripted::Ready(reply)) => reply,
            Some(Scripted::Gated(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(ApiError::new(ErrorCode::Internal, "gate dropped"))),
        }
    }
}

pub(crate) fn page_of(ids: &[&str], next_cursor: &str, prev_cursor: &str) -> MetricsList {
    MetricsList {
        items: ids.iter().map(|id| MetricRecord::new(*id)).collect(),
        next_cursor: next_cursor.to_string(),
        prev_cursor: prev_cursor.to_string(),
    }
}

pub(crate) async fn wait_event(page: &mut MetricsPage) -> PageEvent {
    tokio::time::timeout(Duration::from_secs(2), page.next_event())
        .await
        .expect("page event in time")
        .expect("page event channel open")
}

pub(crate) async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
