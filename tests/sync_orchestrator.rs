//! Integration tests for the load cycle and completion toggles against an
//! in-memory workbook.

use async_trait::async_trait;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::sync::Arc;

use limit_pacer::auth::{
    BearerToken, CachedCredentialProvider, InteractiveLogin, Principal, StaticCredentialProvider,
    TokenRequest,
};
use limit_pacer::config::WritePolicy;
use limit_pacer::decode::{ColumnSpec, MemberColumns, TaskColumns};
use limit_pacer::gateway::{InMemoryGateway, WriteRecord};
use limit_pacer::sync::{DataSource, Orchestrator, Session, SessionState, ToggleState};
use limit_pacer::{CellValue, CredentialError, Error, PacerConfig, RawRow, RowDefect, Target};

const FILE: &str = "limit-pacer.xlsx";
const MEMBERS: &str = "Start_Members";
const TASKS: &str = "Start_Tasks";

fn text_row(cells: &[&str]) -> RawRow {
    cells.iter().map(|c| CellValue::text(*c)).collect()
}

fn task_row(id: &str, content: &str, deadline: &str, target: &str, completed: &str) -> RawRow {
    text_row(&[id, content, deadline, target, "", completed])
}

fn workbook() -> InMemoryGateway {
    InMemoryGateway::new(FILE)
        .with_table(
            MEMBERS,
            text_row(&["No", "氏名", "Group", "役柄", "Email", "権限", "チーム"]),
            vec![
                text_row(&["1", "Yamada Taro", "Development", "L", "yamada@example.com", "admin", "Core"]),
                text_row(&["2", "Suzuki Ichiro", "Sales", "T", "suzuki@example.com", "user"]),
                text_row(&["3", "Sato Hanako", "HR", "AL", "", "user"]),
            ],
        )
        .with_table(
            TASKS,
            text_row(&["No", "内容", "期限", "対象", "リンク", "完了者"]),
            vec![
                vec![
                    CellValue::Number(101.0),
                    CellValue::text("Security Training"),
                    CellValue::Number(45657.0),
                    CellValue::text("全員"),
                    CellValue::text("https://example.com"),
                    CellValue::Empty,
                ],
                task_row("102", "Timesheet", "2025-01-05", "社員", ""),
                task_row("103", "Manager Review", "2025-01-10", "管理者", ""),
                task_row("104", "Goal Setting", "2024-12-15", "ALL", "1,3"),
            ],
        )
}

fn orchestrator(gateway: Arc<InMemoryGateway>, config: PacerConfig) -> Orchestrator {
    Orchestrator::new(Session::new(
        Arc::new(StaticCredentialProvider::new("token")),
        gateway,
        config,
    ))
}

async fn signed_in(gateway: Arc<InMemoryGateway>, config: PacerConfig) -> Orchestrator {
    let orchestrator = orchestrator(gateway, config);
    orchestrator
        .set_principal(Some(Principal::new("Suzuki@Example.com")))
        .await
        .unwrap();
    orchestrator
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 5).unwrap()
}

// ─── Load Cycle ─────────────────────────────────────────────────────────────

mod load {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn live_load_replaces_demo_data() {
        let orchestrator = signed_in(Arc::new(workbook()), PacerConfig::default()).await;

        assert_eq!(orchestrator.state(), SessionState::Ready(DataSource::Live));
        assert_eq!(orchestrator.members().len(), 3);
        let tasks = orchestrator.tasks();
        assert_eq!(tasks.len(), 4);
        assert_eq!(tasks[0].id, "101");
        assert_eq!(tasks[0].deadline, "2024-12-31");
        assert_eq!(tasks[0].target, Target::All);
        assert_eq!(tasks[3].completed_by, vec!["1", "3"]);
        assert!(orchestrator.load_warnings().is_empty());
    }

    #[tokio::test]
    async fn viewer_matched_by_email_case_insensitively() {
        let orchestrator = signed_in(Arc::new(workbook()), PacerConfig::default()).await;
        let viewer = orchestrator.current_viewer();
        assert_eq!(viewer.id, "2");
        assert_eq!(viewer.role, "T");
    }

    #[tokio::test]
    async fn unknown_principal_falls_back_to_first_member() {
        let orchestrator = orchestrator(Arc::new(workbook()), PacerConfig::default());
        orchestrator
            .set_principal(Some(Principal::new("nobody@example.com")))
            .await
            .unwrap();
        assert_eq!(orchestrator.current_viewer().id, "1");
    }

    #[tokio::test]
    async fn visible_tasks_follow_viewer_role() {
        let orchestrator = signed_in(Arc::new(workbook()), PacerConfig::default()).await;
        let visible = orchestrator.visible_tasks(today());
        let ids: Vec<&str> = visible.iter().map(|t| t.task.id.as_str()).collect();
        assert_eq!(ids, vec!["101", "102", "104"]);
        assert!(visible[0].is_red_card());
        assert_eq!(visible[1].status, limit_pacer::TaskStatus::Urgent);
    }

    #[tokio::test]
    async fn malformed_row_is_skipped_not_fatal() {
        let gateway = workbook().with_table(
            TASKS,
            Vec::new(),
            vec![
                task_row("1", "a", "2025-01-01", "ALL", ""),
                task_row("2", "b", "2025-01-02", "ALL", ""),
                text_row(&["3", "c", "2025-01-03"]),
                task_row("4", "d", "2025-01-04", "ALL", ""),
                task_row("5", "e", "2025-01-05", "ALL", ""),
            ],
        );
        let orchestrator = signed_in(Arc::new(gateway), PacerConfig::default()).await;

        let ids: Vec<String> = orchestrator.tasks().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["1", "2", "4", "5"]);
        let warnings = orchestrator.load_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].row_index, 2);
        assert_eq!(
            warnings[0].defect,
            RowDefect::TooShort {
                expected: 4,
                found: 3
            }
        );
    }

    #[tokio::test]
    async fn blank_rows_are_skipped_with_warnings() {
        let mut members = vec![
            text_row(&["1", "Yamada Taro", "Development", "L", "yamada@example.com", "admin", "Core"]),
            text_row(&["", "", "", "", "", "", ""]),
            text_row(&["2", "Suzuki Ichiro", "Sales", "T", "suzuki@example.com", "user"]),
            text_row(&["3", "Sato Hanako", "HR", "AL", "", "user"]),
        ];
        members.push(text_row(&["", "", "", "", "", ""]));
        let mut tasks = workbook().rows(TASKS);
        tasks.insert(2, text_row(&["", "", "", "", "", ""]));
        let gateway = workbook()
            .with_table(MEMBERS, Vec::new(), members)
            .with_table(TASKS, Vec::new(), tasks);
        let orchestrator = signed_in(Arc::new(gateway), PacerConfig::default()).await;

        assert_eq!(orchestrator.members().len(), 3);
        let ids: Vec<String> = orchestrator.tasks().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["101", "102", "103", "104"]);
        let warnings = orchestrator.load_warnings();
        let rows: Vec<(&str, usize)> = warnings
            .iter()
            .map(|w| (w.table.as_str(), w.row_index))
            .collect();
        assert_eq!(rows, vec![(MEMBERS, 1), (MEMBERS, 4), (TASKS, 2)]);
        assert!(warnings
            .iter()
            .all(|w| w.defect == RowDefect::BlankId { column: 0 }));

        let report = orchestrator.cohort_report(today());
        assert_eq!(report.members.len(), 3);
        assert_eq!(report.assignments, 9);
        assert_eq!(report.red_cards, 4);
    }

    #[tokio::test]
    async fn read_failure_keeps_previous_collections() {
        let gateway = Arc::new(workbook());
        let orchestrator = signed_in(gateway.clone(), PacerConfig::default()).await;

        gateway.fail_next_read(Error::RemoteRead {
            resource: "drive root listing".to_string(),
            status: Some(503),
            detail: "serviceUnavailable".to_string(),
        });
        let err = orchestrator.reload().await.unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert!(err.is_retryable_by_user());
        assert!(matches!(orchestrator.state(), SessionState::Error(_)));
        assert_eq!(orchestrator.data_source(), DataSource::Live);
        assert_eq!(orchestrator.tasks().len(), 4);
    }

    #[tokio::test]
    async fn missing_workbook_reports_not_found() {
        let config = PacerConfig::default().with_file_name("other.xlsx");
        let orchestrator = orchestrator(Arc::new(workbook()), config);
        let err = orchestrator
            .set_principal(Some(Principal::new("suzuki@example.com")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { ref file_name } if file_name == "other.xlsx"));
        assert_eq!(orchestrator.data_source(), DataSource::Demo);
    }

    #[tokio::test]
    async fn sign_out_returns_to_demo() {
        let orchestrator = signed_in(Arc::new(workbook()), PacerConfig::default()).await;
        orchestrator.set_principal(None).await.unwrap();
        assert_eq!(orchestrator.state(), SessionState::Ready(DataSource::Demo));
        assert_eq!(orchestrator.tasks()[0].content, "Security Training 2024");
        assert_eq!(orchestrator.principal(), None);
    }

    #[tokio::test]
    async fn cohort_report_over_live_data() {
        let orchestrator = signed_in(Arc::new(workbook()), PacerConfig::default()).await;
        let report = orchestrator.cohort_report(today());
        // L sees 101, 102, 104; T sees 101, 102, 104; AL sees 101, 102, 104.
        assert_eq!(report.assignments, 9);
        assert_eq!(report.completed, 2);
        assert_eq!(report.red_cards, 4);
        assert_eq!(report.members_with_red_card, 3);
    }
}

// ─── Header Validation ──────────────────────────────────────────────────────

mod headers {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config_expecting(header: &str) -> PacerConfig {
        let tasks = TaskColumns {
            completed_by: ColumnSpec::at(5).with_header(header),
            ..TaskColumns::default()
        };
        PacerConfig::default().with_columns(MemberColumns::default(), tasks)
    }

    #[tokio::test]
    async fn matching_header_loads() {
        let orchestrator = signed_in(Arc::new(workbook()), config_expecting("完了者")).await;
        assert_eq!(orchestrator.tasks().len(), 4);
    }

    #[tokio::test]
    async fn shifted_column_fails_the_load() {
        let orchestrator = orchestrator(Arc::new(workbook()), config_expecting("CompletedBy"));
        let err = orchestrator
            .set_principal(Some(Principal::new("suzuki@example.com")))
            .await
            .unwrap_err();

        match err {
            Error::SchemaMismatch {
                table,
                field,
                found,
                ..
            } => {
                assert_eq!(table, TASKS);
                assert_eq!(field, "completed_by");
                assert_eq!(found, "完了者");
            },
            other => panic!("expected schema mismatch, got {other}"),
        }
        assert_eq!(orchestrator.data_source(), DataSource::Demo);
        assert_eq!(orchestrator.members().len(), 3);
        assert_eq!(orchestrator.members()[0].location, "Tokyo");
    }
}

// ─── Completion Toggles ─────────────────────────────────────────────────────

mod toggle {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn toggle_writes_joined_list() {
        let gateway = Arc::new(workbook());
        let orchestrator = signed_in(gateway.clone(), PacerConfig::default()).await;

        let list = orchestrator.toggle_completion("102").await.unwrap();

        assert_eq!(list, vec!["2"]);
        assert_eq!(orchestrator.toggle_state("102"), ToggleState::Committed);
        assert_eq!(
            gateway.writes(),
            vec![WriteRecord {
                table: TASKS.to_string(),
                row_index: 1,
                column_index: 5,
                value: CellValue::text("2"),
            }]
        );
    }

    #[tokio::test]
    async fn double_toggle_returns_to_empty() {
        let gateway = Arc::new(workbook());
        let orchestrator = signed_in(gateway.clone(), PacerConfig::default()).await;

        orchestrator.toggle_completion("102").await.unwrap();
        let list = orchestrator.toggle_completion("102").await.unwrap();

        assert!(list.is_empty());
        assert_eq!(gateway.cell(TASKS, 1, 5), CellValue::text(""));
        assert!(orchestrator.tasks()[1].completed_by.is_empty());
    }

    #[tokio::test]
    async fn toggle_appends_to_existing_list() {
        let gateway = Arc::new(workbook());
        let orchestrator = signed_in(gateway.clone(), PacerConfig::default()).await;

        orchestrator.toggle_completion("104").await.unwrap();
        assert_eq!(gateway.cell(TASKS, 3, 5), CellValue::text("1,3,2"));
    }

    #[tokio::test]
    async fn failed_write_reverts_local_list() {
        let gateway = Arc::new(workbook());
        let orchestrator = signed_in(gateway.clone(), PacerConfig::default()).await;

        gateway.fail_next_write(Error::RemoteWrite {
            resource: "cell".to_string(),
            status: Some(409),
            detail: "conflict".to_string(),
        });
        let err = orchestrator.toggle_completion("102").await.unwrap_err();

        assert!(matches!(err, Error::RemoteWrite { status: Some(409), .. }));
        assert!(orchestrator.tasks()[1].completed_by.is_empty());
        assert_eq!(orchestrator.toggle_state("102"), ToggleState::RolledBack);
        assert!(gateway.writes().is_empty());
    }

    #[tokio::test]
    async fn revert_only_touches_the_failed_task() {
        let gateway = Arc::new(workbook());
        let orchestrator = signed_in(gateway.clone(), PacerConfig::default()).await;

        orchestrator.toggle_completion("101").await.unwrap();
        gateway.fail_next_write(Error::RemoteWrite {
            resource: "cell".to_string(),
            status: None,
            detail: "connection reset".to_string(),
        });
        assert!(orchestrator.toggle_completion("102").await.is_err());

        let tasks = orchestrator.tasks();
        assert_eq!(tasks[0].completed_by, vec!["2"]);
        assert!(tasks[1].completed_by.is_empty());
        assert_eq!(orchestrator.toggle_state("101"), ToggleState::Committed);
    }

    #[tokio::test]
    async fn revalidate_follows_task_after_remote_insert() {
        let gateway = Arc::new(workbook());
        let orchestrator = signed_in(gateway.clone(), PacerConfig::default()).await;

        gateway.insert_row_at(TASKS, 0, task_row("100", "Inserted", "2025-02-01", "ALL", ""));
        orchestrator.toggle_completion("102").await.unwrap();

        assert_eq!(gateway.cell(TASKS, 2, 5), CellValue::text("2"));
        assert_eq!(gateway.cell(TASKS, 1, 5), CellValue::Empty);
        assert_eq!(orchestrator.tasks()[1].source_row_index, 2);
    }

    #[tokio::test]
    async fn direct_policy_writes_cached_index() {
        let gateway = Arc::new(workbook());
        let config = PacerConfig::default().with_write_policy(WritePolicy::Direct);
        let orchestrator = signed_in(gateway.clone(), config).await;

        gateway.insert_row_at(TASKS, 0, task_row("100", "Inserted", "2025-02-01", "ALL", ""));
        orchestrator.toggle_completion("102").await.unwrap();

        // Row 1 now holds task 101: the write lands on the wrong task.
        assert_eq!(gateway.cell(TASKS, 1, 5), CellValue::text("2"));
        assert_eq!(gateway.cell(TASKS, 2, 5), CellValue::text(""));
    }

    #[tokio::test]
    async fn task_removed_remotely_is_stale() {
        let gateway = Arc::new(workbook());
        let orchestrator = signed_in(gateway.clone(), PacerConfig::default()).await;

        gateway.remove_row(TASKS, 3);
        let err = orchestrator.toggle_completion("104").await.unwrap_err();

        assert!(matches!(err, Error::StaleRow { ref task_id, row_index: 3 } if task_id == "104"));
        assert_eq!(orchestrator.tasks()[3].completed_by, vec!["1", "3"]);
        assert_eq!(orchestrator.toggle_state("104"), ToggleState::RolledBack);
    }

    #[tokio::test]
    async fn demo_mode_never_writes() {
        let gateway = Arc::new(workbook());
        let orchestrator = orchestrator(gateway.clone(), PacerConfig::default());
        orchestrator.set_principal(None).await.unwrap();

        let list = orchestrator.toggle_completion("101").await.unwrap();

        assert_eq!(list, vec!["1"]);
        assert!(gateway.writes().is_empty());
    }
}

// ─── Interleaving ───────────────────────────────────────────────────────────

mod interleaving {
    use super::*;
    use pretty_assertions::assert_eq;
    use limit_pacer::gateway::{FileHandle, TableGateway};
    use limit_pacer::TableRow;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    /// Workbook that can park one rows fetch or one patch until released,
    /// and fail the next single-row fetch.
    struct SteppedWorkbook {
        inner: Arc<InMemoryGateway>,
        park_rows: AtomicBool,
        park_patch: AtomicBool,
        row_failure: Mutex<Option<Error>>,
        parked: Notify,
        resume: Notify,
    }

    impl SteppedWorkbook {
        fn new(inner: Arc<InMemoryGateway>) -> Self {
            Self {
                inner,
                park_rows: AtomicBool::new(false),
                park_patch: AtomicBool::new(false),
                row_failure: Mutex::new(None),
                parked: Notify::new(),
                resume: Notify::new(),
            }
        }

        async fn park_if(&self, flag: &AtomicBool) {
            if flag.swap(false, Ordering::SeqCst) {
                self.parked.notify_one();
                self.resume.notified().await;
            }
        }
    }

    #[async_trait]
    impl TableGateway for SteppedWorkbook {
        async fn resolve_file_handle(
            &self,
            credential: &BearerToken,
            display_name: &str,
        ) -> limit_pacer::Result<FileHandle> {
            self.inner.resolve_file_handle(credential, display_name).await
        }

        async fn fetch_table_rows(
            &self,
            credential: &BearerToken,
            handle: &FileHandle,
            table: &str,
        ) -> limit_pacer::Result<Vec<TableRow>> {
            self.park_if(&self.park_rows).await;
            self.inner.fetch_table_rows(credential, handle, table).await
        }

        async fn fetch_header_row(
            &self,
            credential: &BearerToken,
            handle: &FileHandle,
            table: &str,
        ) -> limit_pacer::Result<RawRow> {
            self.inner.fetch_header_row(credential, handle, table).await
        }

        async fn fetch_row(
            &self,
            credential: &BearerToken,
            handle: &FileHandle,
            table: &str,
            index: usize,
        ) -> limit_pacer::Result<TableRow> {
            let failure = self.row_failure.lock().take();
            if let Some(err) = failure {
                return Err(err);
            }
            self.inner.fetch_row(credential, handle, table, index).await
        }

        async fn patch_cell(
            &self,
            credential: &BearerToken,
            handle: &FileHandle,
            table: &str,
            row_index: usize,
            column_index: usize,
            value: CellValue,
        ) -> limit_pacer::Result<()> {
            self.park_if(&self.park_patch).await;
            self.inner
                .patch_cell(credential, handle, table, row_index, column_index, value)
                .await
        }
    }

    fn over(gateway: Arc<SteppedWorkbook>) -> Orchestrator {
        Orchestrator::new(Session::new(
            Arc::new(StaticCredentialProvider::new("token")),
            gateway,
            PacerConfig::default(),
        ))
    }

    async fn signed_in_over(gateway: Arc<SteppedWorkbook>) -> Orchestrator {
        let orchestrator = over(gateway);
        orchestrator
            .set_principal(Some(Principal::new("suzuki@example.com")))
            .await
            .unwrap();
        orchestrator
    }

    fn lookup_failure(status: u16) -> Error {
        Error::RemoteRead {
            resource: "row 1 of 'Start_Tasks'".to_string(),
            status: Some(status),
            detail: "lookup failed".to_string(),
        }
    }

    #[tokio::test]
    async fn sign_out_during_load_discards_it() {
        let gateway = Arc::new(SteppedWorkbook::new(Arc::new(workbook())));
        gateway.park_rows.store(true, Ordering::SeqCst);
        let orchestrator = over(gateway.clone());

        let load = orchestrator.set_principal(Some(Principal::new("suzuki@example.com")));
        let sign_out = async {
            gateway.parked.notified().await;
            assert_eq!(orchestrator.state(), SessionState::Loading);
            orchestrator.set_principal(None).await.unwrap();
            gateway.resume.notify_one();
        };
        let (loaded, ()) = tokio::join!(load, sign_out);

        loaded.unwrap();
        assert_eq!(orchestrator.state(), SessionState::Ready(DataSource::Demo));
        assert_eq!(orchestrator.principal(), None);
        assert_eq!(orchestrator.tasks()[0].content, "Security Training 2024");
    }

    #[tokio::test]
    async fn failed_write_after_sign_out_leaves_demo_data_alone() {
        let inner = Arc::new(workbook());
        let gateway = Arc::new(SteppedWorkbook::new(inner.clone()));
        let orchestrator = signed_in_over(gateway.clone()).await;
        gateway.park_patch.store(true, Ordering::SeqCst);
        inner.fail_next_write(Error::RemoteWrite {
            resource: "cell".to_string(),
            status: Some(503),
            detail: "busy".to_string(),
        });

        let toggle = orchestrator.toggle_completion("104");
        let sign_out = async {
            gateway.parked.notified().await;
            orchestrator.set_principal(None).await.unwrap();
            gateway.resume.notify_one();
        };
        let (toggled, ()) = tokio::join!(toggle, sign_out);

        assert!(matches!(toggled, Err(Error::RemoteWrite { status: Some(503), .. })));
        let demo_task = orchestrator
            .tasks()
            .into_iter()
            .find(|t| t.id == "104")
            .unwrap();
        assert!(demo_task.completed_by.is_empty());
        assert_eq!(orchestrator.toggle_state("104"), ToggleState::Idle);
    }

    #[tokio::test]
    async fn write_finishing_after_reload_keeps_reloaded_state() {
        let inner = Arc::new(workbook());
        let gateway = Arc::new(SteppedWorkbook::new(inner.clone()));
        let orchestrator = signed_in_over(gateway.clone()).await;
        gateway.park_patch.store(true, Ordering::SeqCst);

        let toggle = orchestrator.toggle_completion("102");
        let reload = async {
            gateway.parked.notified().await;
            orchestrator.reload().await.unwrap();
            gateway.resume.notify_one();
        };
        let (toggled, ()) = tokio::join!(toggle, reload);

        assert_eq!(toggled.unwrap(), vec!["2"]);
        assert_eq!(inner.cell(TASKS, 1, 5), CellValue::text("2"));
        assert!(orchestrator.tasks()[1].completed_by.is_empty());
        assert_eq!(orchestrator.toggle_state("102"), ToggleState::Idle);
    }

    #[tokio::test]
    async fn missing_row_index_falls_back_to_scan() {
        let inner = Arc::new(workbook());
        let gateway = Arc::new(SteppedWorkbook::new(inner.clone()));
        let orchestrator = signed_in_over(gateway.clone()).await;

        for status in [400, 404] {
            *gateway.row_failure.lock() = Some(lookup_failure(status));
            orchestrator.toggle_completion("102").await.unwrap();
        }

        assert_eq!(inner.writes().len(), 2);
        assert_eq!(orchestrator.toggle_state("102"), ToggleState::Committed);
    }

    #[tokio::test]
    async fn other_lookup_failures_propagate_without_scan() {
        for status in [401, 403, 500, 503] {
            let inner = Arc::new(workbook());
            let gateway = Arc::new(SteppedWorkbook::new(inner.clone()));
            let orchestrator = signed_in_over(gateway.clone()).await;
            *gateway.row_failure.lock() = Some(lookup_failure(status));

            let err = orchestrator.toggle_completion("102").await.unwrap_err();

            assert_eq!(err.status(), Some(status));
            assert!(inner.writes().is_empty());
            assert_eq!(orchestrator.toggle_state("102"), ToggleState::RolledBack);
            assert!(orchestrator.tasks()[1].completed_by.is_empty());
        }
    }
}

// ─── Credentials ────────────────────────────────────────────────────────────

mod credentials {
    use super::*;
    use pretty_assertions::assert_eq;

    struct RefusingLogin;

    #[async_trait]
    impl InteractiveLogin for RefusingLogin {
        async fn login(&self, request: &TokenRequest) -> Result<BearerToken, CredentialError> {
            Err(CredentialError::InteractiveFailed {
                principal: request.principal.username.clone(),
                reason: "popup blocked".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn failed_sign_in_surfaces_credential_error() {
        let orchestrator = Orchestrator::new(Session::new(
            Arc::new(CachedCredentialProvider::new(Arc::new(RefusingLogin))),
            Arc::new(workbook()),
            PacerConfig::default(),
        ));
        let err = orchestrator
            .set_principal(Some(Principal::new("suzuki@example.com")))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Credential(CredentialError::InteractiveFailed { .. })));
        assert!(err.is_retryable_by_user());
        assert_eq!(orchestrator.data_source(), DataSource::Demo);
    }

    #[tokio::test]
    async fn cached_token_is_used_without_login() {
        let provider = CachedCredentialProvider::new(Arc::new(RefusingLogin));
        provider.insert("suzuki@example.com", BearerToken::new("cached"));
        let orchestrator = Orchestrator::new(Session::new(
            Arc::new(provider),
            Arc::new(workbook()),
            PacerConfig::default(),
        ));
        orchestrator
            .set_principal(Some(Principal::new("suzuki@example.com")))
            .await
            .unwrap();
        assert_eq!(orchestrator.state(), SessionState::Ready(DataSource::Live));
    }
}
