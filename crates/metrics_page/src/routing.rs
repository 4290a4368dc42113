//! Route snapshots, query parameter maps, and the navigation seam.

use std::{
    collections::BTreeMap,
    sync::{Arc, PoisonError, RwLock},
};

use thiserror::Error;
use tracing::debug;
use url::form_urlencoded;

/// Query parameters of a route: one string value per key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParamMap {
    params: BTreeMap<String, String>,
}

impl QueryParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `a=1&b=2`, with or without a leading `?`. Repeated keys keep the first value.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        let mut params = BTreeMap::new();
        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            params
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
        Self { params }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Overlays `other` onto this map; keys absent from `other` are kept.
    pub fn merge(&mut self, other: &QueryParamMap) {
        for (key, value) in &other.params {
            self.params.insert(key.clone(), value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Renders `?a=1&b=2`, or an empty string when there are no parameters.
    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            return String::new();
        }
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter())
            .finish();
        format!("?{encoded}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSnapshot {
    pub path: String,
    pub query: QueryParamMap,
}

impl RouteSnapshot {
    pub fn new(path: impl Into<String>, query: QueryParamMap) -> Self {
        Self {
            path: path.into(),
            query,
        }
    }

    /// Splits `/path?query` into its parts.
    pub fn parse(url: &str) -> Self {
        match url.split_once('?') {
            Some((path, query)) => Self::new(path, QueryParamMap::parse(query)),
            None => Self::new(url, QueryParamMap::new()),
        }
    }

    pub fn to_url(&self) -> String {
        format!("{}{}", self.path, self.query.to_query_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Stay on the current path, overlaying these parameters onto the current query.
    MergeQuery(QueryParamMap),
    /// Go to an absolute path with no query.
    To(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("navigation target '{0}' is not an absolute path")]
    RelativePath(String),
}

pub trait Navigator: Send + Sync {
    fn snapshot(&self) -> RouteSnapshot;
    fn navigate(&self, navigation: Navigation) -> Result<RouteSnapshot, NavigationError>;
}

#[derive(Debug)]
struct MemoryRouterState {
    current: RouteSnapshot,
    history: Vec<RouteSnapshot>,
}

/// Navigator that keeps the current route and a navigation history in memory.
#[derive(Debug, Clone)]
pub struct MemoryRouter {
    inner: Arc<RwLock<MemoryRouterState>>,
}

impl MemoryRouter {
    pub fn new(initial_url: &str) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryRouterState {
                current: RouteSnapshot::parse(initial_url),
                history: Vec::new(),
            })),
        }
    }

    /// Routes navigated to so far, oldest first. The initial route is not included.
    pub fn history(&self) -> Vec<RouteSnapshot> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .history
            .clone()
    }
}

impl Navigator for MemoryRouter {
    fn snapshot(&self) -> RouteSnapshot {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }

    fn navigate(&self, navigation: Navigation) -> Result<RouteSnapshot, NavigationError> {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let next = match navigation {
            Navigation::MergeQuery(params) => {
                let mut next = state.current.clone();
                next.query.merge(&params);
                next
            }
            Navigation::To(path) => {
                if !path.starts_with('/') {
                    return Err(NavigationError::RelativePath(path));
                }
                RouteSnapshot::new(path, QueryParamMap::new())
            }
        };
        debug!(url = %next.to_url(), "navigated");
        state.current = next.clone();
        state.history.push(next.clone());
        Ok(next)
    }
}
