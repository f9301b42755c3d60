//! # limit-pacer
//!
//! Team task-deadline tracking backed by an Excel workbook stored in the
//! signed-in user's cloud drive.
//!
//! The workbook holds two tables: members and tasks. This crate reads both
//! tables into typed records, decides which tasks each member can see, and
//! writes completion changes back to a single cell of the task table.
//!
//! # Module Organization
//!
//! - [`types`] - Domain records ([`Member`], [`Task`]) and raw cell values
//! - [`decode`] - Raw table rows to validated records, column maps
//! - [`policy`] - Task visibility, role groups and cohort aggregation
//! - [`auth`] - Bearer tokens and credential providers
//! - [`gateway`] - Remote table access (Graph over HTTP, in-memory)
//! - [`sync`] - Load cycle and optimistic completion toggles
//! - [`config`] - File and environment configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use limit_pacer::auth::{Principal, StaticCredentialProvider};
//! use limit_pacer::gateway::GraphGateway;
//! use limit_pacer::sync::{Orchestrator, Session};
//! use limit_pacer::PacerConfig;
//!
//! # async fn run() -> limit_pacer::Result<()> {
//! let config = PacerConfig::from_env()?;
//! let gateway = GraphGateway::new(&config)?;
//! let credentials = StaticCredentialProvider::new("access-token");
//! let session = Session::new(Arc::new(credentials), Arc::new(gateway), config);
//!
//! let orchestrator = Orchestrator::new(session);
//! orchestrator
//!     .set_principal(Some(Principal::new("someone@example.com")))
//!     .await?;
//!
//! let today = chrono::Utc::now().date_naive();
//! for task in orchestrator.visible_tasks(today) {
//!     println!("{} {} {:?}", task.task.deadline, task.task.content, task.status);
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod decode;
pub mod error;
pub mod gateway;
#[cfg(feature = "logging")]
pub mod logging;
pub mod policy;
pub mod sync;
pub mod types;

pub use config::PacerConfig;
pub use error::{CredentialError, Error, MalformedRowError, Result, RowDefect};
pub use policy::{RoleGroups, VisibilityPolicy};
pub use types::{Authority, CellValue, Member, RawRow, TableRow, Target, Task, TaskStatus};
