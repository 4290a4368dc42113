//! Events delivered to the page controller and error modeling for the page.

use shared::{
    error::{ApiError, ErrorCode},
    protocol::MetricsList,
};

#[derive(Debug)]
pub enum PageEvent {
    /// A listing request issued by `search` completed. `cursor` is the cursor that was sent.
    SearchFinished {
        generation: u64,
        cursor: String,
        result: Result<MetricsList, ApiError>,
    },
    /// Pre-fetched first page delivered by the route resolver.
    RouteData(Result<MetricsList, ApiError>),
}

/// What applying an event did to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Applied,
    Failed(PageError),
    /// The event belonged to a cancelled or superseded query and was dropped.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageErrorCategory {
    Auth,
    Transport,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageErrorContext {
    Search,
    RouteData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageError {
    category: PageErrorCategory,
    context: PageErrorContext,
    message: String,
}

impl PageError {
    pub fn from_api(context: PageErrorContext, err: &ApiError) -> Self {
        let category = match err.code {
            ErrorCode::Unauthorized | ErrorCode::Forbidden => PageErrorCategory::Auth,
            ErrorCode::Unavailable => PageErrorCategory::Transport,
            ErrorCode::Validation => PageErrorCategory::Validation,
            ErrorCode::NotFound | ErrorCode::RateLimited | ErrorCode::Internal => {
                categorize_message(&err.message)
            }
        };
        Self {
            category,
            context,
            message: err.to_string(),
        }
    }

    pub fn requires_reauth(&self) -> bool {
        self.category == PageErrorCategory::Auth
    }

    pub fn category(&self) -> PageErrorCategory {
        self.category
    }

    pub fn context(&self) -> PageErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

fn categorize_message(message: &str) -> PageErrorCategory {
    let lower = message.to_ascii_lowercase();
    if lower.contains("401")
        || lower.contains("403")
        || lower.contains("unauthorized")
        || lower.contains("forbidden")
        || lower.contains("session expired")
        || lower.contains("invalid token")
    {
        PageErrorCategory::Auth
    } else if lower.contains("invalid")
        || lower.contains("missing")
        || lower.contains("malformed")
    {
        PageErrorCategory::Validation
    } else if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection")
        || lower.contains("network")
        || lower.contains("unavailable")
    {
        PageErrorCategory::Transport
    } else {
        PageErrorCategory::Unknown
    }
}
