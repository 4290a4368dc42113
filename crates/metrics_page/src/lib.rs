//! Metrics listing page: controller state machine, route resolver, and the routing
//! contract they share with their host.

pub mod controller;
pub mod resolver;
pub mod routing;

#[cfg(test)]
mod test_support;

pub use controller::{
    events::{EventOutcome, PageError, PageErrorCategory, PageErrorContext, PageEvent},
    MetricsPage, RouteDataSink, SearchDirection, ToggleLabel,
};
pub use resolver::MetricsResolver;
pub use routing::{MemoryRouter, Navigation, NavigationError, Navigator, QueryParamMap, RouteSnapshot};
