//! Lifecycle phases of a walk
//!
//! ```text
//! Init -> Active <-> Restarting
//!           |            |
//!           v            v
//!         Terminated <---+
//! ```
use std::fmt;

use crate::{Result, WalkerError};

/// Represents where a walk is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Configuration and driver ready, nothing visited yet
    Init,

    /// Running steps
    Active,

    /// Session reset in progress
    Restarting,

    /// Finished; the driver has been released
    Terminated,
}

impl CrawlPhase {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    /// Returns true if `next` may follow this phase
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        matches!(
            (self, next),
            (Self::Init, Self::Active)
                | (Self::Init, Self::Terminated)
                | (Self::Active, Self::Restarting)
                | (Self::Active, Self::Terminated)
                | (Self::Restarting, Self::Active)
                | (Self::Restarting, Self::Terminated)
        )
    }

    /// Returns `next` if the transition is allowed
    pub fn transition(self, next: CrawlPhase) -> Result<CrawlPhase> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(WalkerError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Lowercase name used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Active => "active",
            Self::Restarting => "restarting",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
