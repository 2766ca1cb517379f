/// Frontier status definitions for tracking crawl progress
///
/// The status lives in the `crawl_queue` table, so transitions are store-side
/// compare-and-set operations rather than in-process locks.
use std::fmt;

/// Represents the current status of a URL in the crawl queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontierStatus {
    // ===== Active States =====
    /// Discovered and waiting to be handed to a worker
    Pending,

    /// Claimed by a refill and assigned to a worker
    InFlight,

    // ===== Terminal States =====
    /// Worker finished with this URL (fetched, skipped, or duplicate)
    Completed,

    /// Fetch failed on every allowed attempt
    Failed,

    /// Claimed by a refill but deeper than the crawl's max depth
    DepthExceeded,
}

impl FrontierStatus {
    /// Returns true if this is a terminal status (never re-dispatched)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::InFlight)
    }

    /// Returns true if a refill may still hand this URL out
    pub fn is_dispatchable(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InFlight => "in_flight",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::DepthExceeded => "depth_exceeded",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_flight" => Some(Self::InFlight),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "depth_exceeded" => Some(Self::DepthExceeded),
            _ => None,
        }
    }

    /// Returns all statuses
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::InFlight,
            Self::Completed,
            Self::Failed,
            Self::DepthExceeded,
        ]
    }
}

impl fmt::Display for FrontierStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
