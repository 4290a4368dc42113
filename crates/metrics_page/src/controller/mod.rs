//! Controller layer: page state, search orchestration with cancellation, and the drill-down toggle.

mod drill_down;
pub mod events;
mod page;

pub use drill_down::ToggleLabel;
pub use page::{MetricsPage, RouteDataSink, SearchDirection};
