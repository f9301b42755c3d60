//! Load cycle and completion toggles.
//!
//! The [`Orchestrator`] owns the in-memory member and task collections. It
//! loads them through a [`Session`], serves per-viewer views, and applies
//! completion toggles optimistically: the local list changes at once, and is
//! put back if the remote write fails.
//!
//! # Session states
//!
//! ```text
//! Unauthenticated --set_principal(Some)--> Loading --ok--> Ready(Live)
//!        |                                    |
//!        +--set_principal(None)--> Ready(Demo) +--err--> Error(detail)
//! ```

pub mod demo;
mod orchestrator;

pub use orchestrator::Orchestrator;

use std::fmt;
use std::sync::Arc;

use crate::auth::CredentialProvider;
use crate::config::PacerConfig;
use crate::gateway::TableGateway;

pub use crate::config::WritePolicy;

/// Collaborators of one orchestrator.
#[derive(Clone)]
pub struct Session {
    /// Token source.
    pub credentials: Arc<dyn CredentialProvider>,
    /// Remote tables.
    pub gateway: Arc<dyn TableGateway>,
    /// Workbook and layout settings.
    pub config: PacerConfig,
}

impl Session {
    /// Bundles the collaborators.
    pub fn new(
        credentials: Arc<dyn CredentialProvider>,
        gateway: Arc<dyn TableGateway>,
        config: PacerConfig,
    ) -> Self {
        Self {
            credentials,
            gateway,
            config,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Where the current collections came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Built-in demo dataset.
    Demo,
    /// The remote workbook.
    Live,
}

/// Lifecycle of the loaded data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing loaded yet.
    Unauthenticated,
    /// A remote load is in flight.
    Loading,
    /// Collections are available.
    Ready(DataSource),
    /// The last load failed; earlier collections are still served.
    Error(String),
}

impl SessionState {
    /// Returns `true` while a load is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// Progress of the most recent toggle of one task.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ToggleState {
    /// Never toggled since the last load.
    #[default]
    Idle,
    /// Local list changed, remote write in flight.
    Pending {
        /// Completion list before the toggle.
        previous: Vec<String>,
    },
    /// Remote write succeeded (or demo mode).
    Committed,
    /// Remote write failed and the local list was restored.
    RolledBack,
}
