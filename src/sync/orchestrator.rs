use chrono::NaiveDate;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{demo, DataSource, Session, SessionState, ToggleState, WritePolicy};
use crate::auth::{resolve_credential, BearerToken, Principal, TokenRequest};
use crate::decode::{encode_completion_list, sanitize_cell, Decoded, RowDecoder};
use crate::error::{Error, MalformedRowError, Result};
use crate::gateway::FileHandle;
use crate::policy::{self, CohortReport, VisibilityPolicy};
use crate::types::{CellValue, EnrichedTask, Member, Task};

#[derive(Debug)]
struct State {
    principal: Option<Principal>,
    session: SessionState,
    source: DataSource,
    members: Vec<Member>,
    tasks: Vec<Task>,
    toggles: HashMap<String, ToggleState>,
    warnings: Vec<MalformedRowError>,
    /// Bumped on every sign-in or sign-out; loads started earlier are dropped.
    generation: u64,
    /// Bumped whenever the collections are replaced.
    epoch: u64,
}

impl State {
    fn demo() -> Self {
        Self {
            principal: None,
            session: SessionState::Unauthenticated,
            source: DataSource::Demo,
            members: demo::members(),
            tasks: demo::tasks(),
            toggles: HashMap::new(),
            warnings: Vec::new(),
            generation: 0,
            epoch: 0,
        }
    }

    fn reset_to_demo(&mut self) {
        self.session = SessionState::Ready(DataSource::Demo);
        self.source = DataSource::Demo;
        self.members = demo::members();
        self.tasks = demo::tasks();
        self.toggles.clear();
        self.warnings.clear();
        self.epoch += 1;
    }

    /// The task `task_id` of the dataset loaded at `epoch`, if still current.
    fn task_in_epoch(&mut self, epoch: u64, task_id: &str) -> Option<&mut Task> {
        if self.epoch != epoch {
            return None;
        }
        self.tasks.iter_mut().find(|task| task.id == task_id)
    }
}

struct Loaded {
    members: Decoded<Member>,
    tasks: Decoded<Task>,
}

/// Coordinates loads, views and completion toggles for one signed-in user.
///
/// State sits behind a lock that is never held across an `.await`, so views
/// can be read while a load or write is in flight. Toggles on different
/// tasks, and a toggle racing a reload, are not serialized.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use limit_pacer::auth::StaticCredentialProvider;
/// use limit_pacer::gateway::InMemoryGateway;
/// use limit_pacer::sync::{DataSource, Orchestrator, Session, SessionState};
/// use limit_pacer::PacerConfig;
///
/// # #[tokio::main]
/// # async fn main() {
/// let session = Session::new(
///     Arc::new(StaticCredentialProvider::new("token")),
///     Arc::new(InMemoryGateway::new("limit-pacer.xlsx")),
///     PacerConfig::default(),
/// );
/// let orchestrator = Orchestrator::new(session);
/// orchestrator.set_principal(None).await.unwrap();
/// assert_eq!(orchestrator.state(), SessionState::Ready(DataSource::Demo));
///
/// let committed = orchestrator.toggle_completion("101").await.unwrap();
/// assert_eq!(committed, vec!["1"]);
/// # }
/// ```
pub struct Orchestrator {
    session: Session,
    decoder: RowDecoder,
    policy: VisibilityPolicy,
    state: RwLock<State>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("session", &self.session)
            .field("state", &self.state.read().session)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator showing the demo dataset.
    pub fn new(session: Session) -> Self {
        let columns = &session.config.columns;
        let decoder = RowDecoder::new(columns.members.clone(), columns.tasks.clone());
        let policy = VisibilityPolicy::new(session.config.role_groups.clone());
        Self {
            session,
            decoder,
            policy,
            state: RwLock::new(State::demo()),
        }
    }

    /// The session this orchestrator was built with.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Signs in (`Some`) and loads, or signs out (`None`) and shows demo data.
    pub async fn set_principal(&self, principal: Option<Principal>) -> Result<()> {
        {
            let mut state = self.state.write();
            state.generation += 1;
            state.principal = principal;
            if state.principal.is_none() {
                tracing::info!("signed out, showing demo data");
                state.reset_to_demo();
                return Ok(());
            }
        }
        self.reload().await
    }

    /// Loads both tables again for the current principal.
    ///
    /// On failure the state becomes [`SessionState::Error`] and the previous
    /// collections stay in place. Nothing is published unless both tables
    /// loaded.
    pub async fn reload(&self) -> Result<()> {
        let (principal, generation) = {
            let mut state = self.state.write();
            let Some(principal) = state.principal.clone() else {
                state.reset_to_demo();
                return Ok(());
            };
            state.session = SessionState::Loading;
            (principal, state.generation)
        };

        let outcome = self.load_live(&principal).await;

        let mut state = self.state.write();
        if state.generation != generation {
            tracing::debug!("discarding load for a principal that is no longer current");
            return Ok(());
        }
        match outcome {
            Ok(loaded) => {
                let mut warnings = loaded.members.errors;
                warnings.extend(loaded.tasks.errors);
                tracing::info!(
                    members = loaded.members.records.len(),
                    tasks = loaded.tasks.records.len(),
                    skipped = warnings.len(),
                    "workbook loaded"
                );
                state.members = loaded.members.records;
                state.tasks = loaded.tasks.records;
                state.warnings = warnings;
                state.toggles.clear();
                state.epoch += 1;
                state.source = DataSource::Live;
                state.session = SessionState::Ready(DataSource::Live);
                Ok(())
            },
            Err(err) => {
                tracing::warn!("workbook load failed: {err}");
                state.session = SessionState::Error(err.to_string());
                Err(err)
            },
        }
    }

    async fn load_live(&self, principal: &Principal) -> Result<Loaded> {
        let config = &self.session.config;
        let gateway = self.session.gateway.as_ref();
        let token = self.credential(principal).await?;
        let handle = gateway.resolve_file_handle(&token, &config.file_name).await?;

        let member_columns = self.decoder.member_columns();
        let header = if member_columns.has_headers() {
            gateway
                .fetch_header_row(&token, &handle, &config.members_table)
                .await?
        } else {
            Vec::new()
        };
        member_columns.validate_header(&config.members_table, &header)?;
        let rows = gateway
            .fetch_table_rows(&token, &handle, &config.members_table)
            .await?;
        let members = self.decoder.members(&config.members_table, &rows);

        let task_columns = self.decoder.task_columns();
        let header = if task_columns.has_headers() {
            gateway
                .fetch_header_row(&token, &handle, &config.tasks_table)
                .await?
        } else {
            Vec::new()
        };
        task_columns.validate_header(&config.tasks_table, &header)?;
        let rows = gateway
            .fetch_table_rows(&token, &handle, &config.tasks_table)
            .await?;
        let tasks = self.decoder.tasks(&config.tasks_table, &rows);

        Ok(Loaded { members, tasks })
    }

    async fn credential(&self, principal: &Principal) -> Result<BearerToken> {
        let request = TokenRequest::new(principal.clone())
            .with_scopes(self.session.config.scopes.iter().cloned());
        Ok(resolve_credential(self.session.credentials.as_ref(), &request).await?)
    }

    /// Flips the current viewer's completion of `task_id`.
    ///
    /// The local list changes before the remote write starts. On success the
    /// new list is returned; on failure the task's list is restored and the
    /// error is returned. If the collections were replaced while the write was
    /// in flight, the outcome is not applied to the new ones.
    pub async fn toggle_completion(&self, task_id: &str) -> Result<Vec<String>> {
        let viewer = self.current_viewer();
        let (previous, next, row_index, live_principal, epoch) = {
            let mut guard = self.state.write();
            let state = &mut *guard;
            let task = state
                .tasks
                .iter_mut()
                .find(|task| task.id == task_id)
                .ok_or_else(|| Error::TaskNotFound {
                    task_id: task_id.to_string(),
                })?;
            let previous = task.completed_by.clone();
            let next = task.toggled_completion(&viewer.id);
            task.completed_by = next.clone();
            let row_index = task.source_row_index;

            let live_principal = match state.source {
                DataSource::Live => state.principal.clone(),
                DataSource::Demo => None,
            };
            let toggle = if live_principal.is_some() {
                ToggleState::Pending {
                    previous: previous.clone(),
                }
            } else {
                ToggleState::Committed
            };
            state.toggles.insert(task_id.to_string(), toggle);
            (previous, next, row_index, live_principal, state.epoch)
        };

        let Some(principal) = live_principal else {
            tracing::debug!(task_id, "demo toggle applied locally");
            return Ok(next);
        };

        match self.write_completion(&principal, task_id, row_index, &next).await {
            Ok(written_at) => {
                let mut guard = self.state.write();
                let state = &mut *guard;
                match state.task_in_epoch(epoch, task_id) {
                    Some(task) => {
                        task.source_row_index = written_at;
                        state
                            .toggles
                            .insert(task_id.to_string(), ToggleState::Committed);
                    },
                    None => tracing::debug!(task_id, "collections replaced during write"),
                }
                Ok(next)
            },
            Err(err) => {
                tracing::error!(task_id, "completion update failed, reverting: {err}");
                let mut guard = self.state.write();
                let state = &mut *guard;
                match state.task_in_epoch(epoch, task_id) {
                    Some(task) => {
                        task.completed_by = previous;
                        state
                            .toggles
                            .insert(task_id.to_string(), ToggleState::RolledBack);
                    },
                    None => {
                        tracing::debug!(task_id, "collections replaced during write, nothing to revert");
                    },
                }
                Err(err)
            },
        }
    }

    /// Writes `list` to the task's completion cell, returning the row used.
    async fn write_completion(
        &self,
        principal: &Principal,
        task_id: &str,
        row_index: usize,
        list: &[String],
    ) -> Result<usize> {
        let config = &self.session.config;
        let gateway = self.session.gateway.as_ref();
        let token = self.credential(principal).await?;
        let handle = gateway.resolve_file_handle(&token, &config.file_name).await?;

        let row_index = match config.write_policy {
            WritePolicy::Direct => row_index,
            WritePolicy::Revalidate => self.locate_row(&token, &handle, task_id, row_index).await?,
        };

        gateway
            .patch_cell(
                &token,
                &handle,
                &config.tasks_table,
                row_index,
                self.decoder.task_columns().completed_by.index,
                CellValue::Text(encode_completion_list(list)),
            )
            .await?;
        Ok(row_index)
    }

    /// Confirms `task_id` is still at `row_index`, searching the table if not.
    async fn locate_row(
        &self,
        token: &BearerToken,
        handle: &FileHandle,
        task_id: &str,
        row_index: usize,
    ) -> Result<usize> {
        let table = &self.session.config.tasks_table;
        let gateway = self.session.gateway.as_ref();
        let id_column = self.decoder.task_columns().id.index;

        match gateway.fetch_row(token, handle, table, row_index).await {
            Ok(row) if sanitize_cell(row.cell(id_column)) == task_id => return Ok(row_index),
            Ok(row) => {
                tracing::debug!(
                    task_id,
                    row_index,
                    found = %sanitize_cell(row.cell(id_column)),
                    "task moved, searching table"
                );
            },
            // Index past the end of the table; the scan below decides.
            Err(err) if matches!(err.status(), Some(400 | 404)) => {
                tracing::debug!(task_id, row_index, "row lookup failed, searching table: {err}");
            },
            Err(err) => return Err(err),
        }

        let rows = gateway.fetch_table_rows(token, handle, table).await?;
        rows.iter()
            .find(|row| sanitize_cell(row.cell(id_column)) == task_id)
            .map(|row| row.index)
            .ok_or_else(|| Error::StaleRow {
                task_id: task_id.to_string(),
                row_index,
            })
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state.read().session.clone()
    }

    /// Origin of the collections currently served.
    pub fn data_source(&self) -> DataSource {
        self.state.read().source
    }

    /// Signed-in principal, if any.
    pub fn principal(&self) -> Option<Principal> {
        self.state.read().principal.clone()
    }

    /// Loaded members.
    pub fn members(&self) -> Vec<Member> {
        self.state.read().members.clone()
    }

    /// Loaded tasks.
    pub fn tasks(&self) -> Vec<Task> {
        self.state.read().tasks.clone()
    }

    /// Rows skipped by the last successful load.
    pub fn load_warnings(&self) -> Vec<MalformedRowError> {
        self.state.read().warnings.clone()
    }

    /// Progress of the latest toggle of `task_id`.
    pub fn toggle_state(&self, task_id: &str) -> ToggleState {
        self.state
            .read()
            .toggles
            .get(task_id)
            .cloned()
            .unwrap_or_default()
    }

    /// The member the signed-in principal maps to.
    ///
    /// Matches the principal's username against member emails; otherwise the
    /// first loaded member, otherwise the first demo member.
    pub fn current_viewer(&self) -> Member {
        let state = self.state.read();
        let matched = state.principal.as_ref().and_then(|principal| {
            state
                .members
                .iter()
                .find(|member| member.matches_username(&principal.username))
        });
        matched
            .or_else(|| state.members.first())
            .cloned()
            .unwrap_or_else(demo::viewer)
    }

    /// Tasks the current viewer can see, enriched for `today`.
    pub fn visible_tasks(&self, today: NaiveDate) -> Vec<EnrichedTask> {
        let viewer = self.current_viewer();
        let state = self.state.read();
        policy::visible_tasks(&self.policy, &viewer, &state.tasks, today)
    }

    /// `(todo, done)` lists for the current viewer.
    pub fn task_lists(&self, today: NaiveDate) -> (Vec<EnrichedTask>, Vec<EnrichedTask>) {
        policy::split_by_completion(self.visible_tasks(today))
    }

    /// Compliance summary over all loaded members.
    pub fn cohort_report(&self, today: NaiveDate) -> CohortReport {
        let state = self.state.read();
        policy::cohort_report(&self.policy, &state.members, &state.tasks, today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticCredentialProvider;
    use crate::config::PacerConfig;
    use crate::gateway::InMemoryGateway;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn demo_orchestrator() -> Orchestrator {
        Orchestrator::new(Session::new(
            Arc::new(StaticCredentialProvider::new("t")),
            Arc::new(InMemoryGateway::new("limit-pacer.xlsx")),
            PacerConfig::default(),
        ))
    }

    #[tokio::test]
    async fn starts_unauthenticated_with_demo_data() {
        let orchestrator = demo_orchestrator();
        assert_eq!(orchestrator.state(), SessionState::Unauthenticated);
        assert_eq!(orchestrator.members().len(), 3);
        assert_eq!(orchestrator.current_viewer().id, "1");
    }

    #[tokio::test]
    async fn demo_toggle_commits_locally() {
        let orchestrator = demo_orchestrator();
        orchestrator.set_principal(None).await.unwrap();
        assert_eq!(orchestrator.toggle_completion("104").await.unwrap(), vec!["1"]);
        assert_eq!(orchestrator.toggle_state("104"), ToggleState::Committed);
        assert_eq!(orchestrator.toggle_completion("104").await.unwrap(), Vec::<String>::new());
        assert_eq!(orchestrator.toggle_state("101"), ToggleState::Idle);
    }

    #[tokio::test]
    async fn unknown_task_is_rejected() {
        let orchestrator = demo_orchestrator();
        let err = orchestrator.toggle_completion("999").await.unwrap_err();
        assert!(matches!(err, Error::TaskNotFound { ref task_id } if task_id == "999"));
    }

    #[tokio::test]
    async fn missing_workbook_keeps_demo_data() {
        let orchestrator = demo_orchestrator();
        let err = orchestrator
            .set_principal(Some(Principal::new("taro@example.com")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert!(matches!(orchestrator.state(), SessionState::Error(_)));
        assert_eq!(orchestrator.data_source(), DataSource::Demo);
        assert_eq!(orchestrator.tasks().len(), 4);
    }

    #[test]
    fn demo_viewer_sees_group_tasks_for_their_role() {
        let orchestrator = demo_orchestrator();
        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let ids: Vec<String> = orchestrator
            .visible_tasks(today)
            .into_iter()
            .map(|t| t.task.id)
            .collect();
        // Viewer 1 is a leader: everyone tasks and 社員 but not 管理者.
        assert_eq!(ids, vec!["101", "102", "104"]);
    }
}
