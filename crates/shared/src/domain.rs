use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Owner id of records created by the server itself rather than a user.
pub const SYSTEM_USER_ID: Uuid = Uuid::nil();

/// Console operator role. Lower discriminants carry more privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Unknown = 0,
    Admin = 1,
    Developer = 2,
    Maintainer = 3,
    Readonly = 4,
}

impl UserRole {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Admin,
            2 => Self::Developer,
            3 => Self::Maintainer,
            4 => Self::Readonly,
            _ => Self::Unknown,
        }
    }

    /// True when this role is `threshold` or more privileged. `Unknown` never qualifies.
    pub fn is_at_least(self, threshold: UserRole) -> bool {
        self != Self::Unknown && threshold != Self::Unknown && self <= threshold
    }
}

/// Filter selector from the search form: `0` for everything, `1` for tombstones only.
/// Any other code is carried through unchanged and lists everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    #[default]
    All,
    Tombstones,
    Other(i64),
}

impl FilterType {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::All,
            1 => Self::Tombstones,
            other => Self::Other(other),
        }
    }

    /// Query-string form. Absent or unparsable values fall back to `All`.
    pub fn from_query_value(raw: Option<&str>) -> Self {
        raw.and_then(|v| v.trim().parse::<i64>().ok())
            .map(Self::from_code)
            .unwrap_or_default()
    }

    pub fn code(self) -> i64 {
        match self {
            Self::All => 0,
            Self::Tombstones => 1,
            Self::Other(code) => code,
        }
    }

    pub fn tombstones_only(self) -> bool {
        self == Self::Tombstones
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchCriteria {
    pub filter: String,
    pub filter_type: FilterType,
}

impl SearchCriteria {
    pub fn is_default(&self) -> bool {
        self.filter.is_empty() && self.filter_type == FilterType::All
    }
}
