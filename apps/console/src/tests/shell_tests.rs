use super::*;
use std::{sync::Mutex, time::Duration};

use async_trait::async_trait;
use client_core::StaticRole;
use metrics_page::ToggleLabel;
use shared::{
    domain::UserRole,
    error::ApiError,
    protocol::{MetricRecord, MetricResponse, MetricsList},
};

type Call = (Option<String>, bool, Option<String>);

#[derive(Default)]
struct StubApi {
    calls: Mutex<Vec<Call>>,
}

#[async_trait]
impl ConsoleApi for StubApi {
    async fn list_metrics(
        &self,
        _id_scope: &str,
        filter: Option<&str>,
        tombstones: bool,
        cursor: Option<&str>,
    ) -> Result<MetricsList, ApiError> {
        self.calls.lock().expect("calls lock").push((
            filter.map(str::to_string),
            tombstones,
            cursor.map(str::to_string),
        ));
        let mut response = MetricResponse::default();
        response.fields.insert("answer".into(), 42.into());
        let prefix = filter.unwrap_or("all");
        Ok(MetricsList {
            items: vec![
                MetricRecord::new(format!("{prefix}-1")).with_responses(vec![response]),
                MetricRecord::new(format!("{prefix}-2")),
            ],
            next_cursor: format!("{prefix}-next"),
            prev_cursor: String::new(),
        })
    }
}

fn shell(role: UserRole) -> (Shell, Arc<StubApi>) {
    let api = Arc::new(StubApi::default());
    let shell = Shell::new(api.clone(), Arc::new(StaticRole(role)), "/metrics");
    (shell, api)
}

async fn pump(shell: &mut Shell) -> EventOutcome {
    let event = tokio::time::timeout(Duration::from_secs(2), shell.page.next_event())
        .await
        .expect("page event in time")
        .expect("page event channel open");
    shell.page.handle_event(event)
}

async fn dispatch(shell: &mut Shell, command: ShellCommand) -> (Flow, String) {
    let mut out = Vec::new();
    let flow = shell.dispatch(command, &mut out).await.expect("dispatch");
    (flow, String::from_utf8(out).expect("utf8"))
}

#[test]
fn parses_commands_and_arguments() {
    assert_eq!(ShellCommand::parse("   "), Ok(None));
    assert_eq!(
        ShellCommand::parse("search  ada lovelace "),
        Ok(Some(ShellCommand::Search(Some("ada lovelace".into()))))
    );
    assert_eq!(
        ShellCommand::parse("search"),
        Ok(Some(ShellCommand::Search(None)))
    );
    assert_eq!(
        ShellCommand::parse("type tombstones"),
        Ok(Some(ShellCommand::FilterType(FilterType::Tombstones)))
    );
    assert_eq!(ShellCommand::parse("n"), Ok(Some(ShellCommand::Next)));
    assert_eq!(
        ShellCommand::parse("open /metrics?filter=x"),
        Ok(Some(ShellCommand::Open("/metrics?filter=x".into())))
    );
}

#[test]
fn rejects_bad_commands() {
    assert_eq!(
        ShellCommand::parse("frobnicate"),
        Err(CommandError::Unknown("frobnicate".into()))
    );
    assert_eq!(
        ShellCommand::parse("view"),
        Err(CommandError::MissingArgument {
            command: "view",
            what: "a record id"
        })
    );
    assert_eq!(
        ShellCommand::parse("type deleted"),
        Err(CommandError::FilterType("deleted".into()))
    );
}

#[tokio::test]
async fn entering_a_route_resolves_the_first_page() {
    let (mut shell, api) = shell(UserRole::Developer);
    assert_eq!(
        shell.enter("/metrics?tombstones=true").await,
        EventOutcome::Applied
    );
    assert_eq!(
        api.calls.lock().expect("calls lock").clone(),
        vec![(None, true, None)]
    );

    let text = render(&shell.page);
    assert!(text.contains("all-1"));
    assert!(text.contains("next 'all-next'"));
    assert!(text.contains("(delete allowed)"));
}

#[tokio::test]
async fn search_then_view_then_account() {
    let (mut shell, api) = shell(UserRole::Readonly);
    shell.enter("/metrics").await;

    let (flow, _) = dispatch(&mut shell, ShellCommand::Search(Some("grace".into()))).await;
    assert_eq!(flow, Flow::Continue);
    assert_eq!(pump(&mut shell).await, EventOutcome::Applied);
    assert_eq!(
        api.calls.lock().expect("calls lock").last().cloned(),
        Some((Some("grace".to_string()), false, Some(String::new())))
    );
    assert_eq!(shell.router.snapshot().query.get("filter"), Some("grace"));

    let (_, text) = dispatch(&mut shell, ShellCommand::View("grace-1".into())).await;
    assert_eq!(shell.page.button_label(), ToggleLabel::Hide);
    assert!(text.contains("responses (1):"));
    assert!(text.contains("\"answer\":42"));
    assert!(!text.contains("delete allowed"));

    let (_, text) = dispatch(&mut shell, ShellCommand::Account("grace-1".into())).await;
    assert_eq!(text.trim(), "navigated to /accounts/grace-1");

    let (_, text) = dispatch(&mut shell, ShellCommand::Next).await;
    assert!(text.starts_with("not on the metrics page (at /accounts/grace-1)"));
}

#[tokio::test]
async fn account_needs_a_record_on_the_page() {
    let (mut shell, _api) = shell(UserRole::Admin);
    shell.enter("/metrics").await;

    let (_, text) = dispatch(&mut shell, ShellCommand::Account("nobody".into())).await;
    assert_eq!(text.trim(), "no record 'nobody' on this page");
    assert_eq!(shell.router.snapshot().path, "/metrics");
}

#[tokio::test]
async fn quit_stops_the_loop() {
    let (shell, _api) = shell(UserRole::Admin);
    let mut out = Vec::new();
    shell
        .run(&b"help\nquit\n"[..], &mut out)
        .await
        .expect("run");
    let text = String::from_utf8(out).expect("utf8");
    assert!(text.starts_with("commands:"));
}

#[tokio::test]
async fn end_of_input_stops_the_loop() {
    let (shell, _api) = shell(UserRole::Admin);
    let mut out = Vec::new();
    shell.run(&b""[..], &mut out).await.expect("run");
}

/// Answers the first-page (cursor-less) request slowly and every paged or filtered
/// request at once.
#[derive(Default)]
struct SlowFirstPageApi {
    calls: Mutex<Vec<Call>>,
}

#[async_trait]
impl ConsoleApi for SlowFirstPageApi {
    async fn list_metrics(
        &self,
        _id_scope: &str,
        filter: Option<&str>,
        tombstones: bool,
        cursor: Option<&str>,
    ) -> Result<MetricsList, ApiError> {
        self.calls.lock().expect("calls lock").push((
            filter.map(str::to_string),
            tombstones,
            cursor.map(str::to_string),
        ));
        let Some(cursor) = cursor else {
            tokio::time::sleep(Duration::from_millis(50)).await;
            return Ok(MetricsList {
                items: vec![MetricRecord::new("first-page")],
                next_cursor: "page2".into(),
                prev_cursor: "page0".into(),
            });
        };
        let label = if cursor.is_empty() {
            filter.unwrap_or("all")
        } else {
            cursor
        };
        Ok(MetricsList {
            items: vec![MetricRecord::new(format!("after-{label}"))],
            next_cursor: format!("{label}-next"),
            prev_cursor: String::new(),
        })
    }
}

fn slow_first_page_shell() -> (Shell, Arc<SlowFirstPageApi>) {
    let api = Arc::new(SlowFirstPageApi::default());
    let shell = Shell::new(
        api.clone(),
        Arc::new(StaticRole(UserRole::Admin)),
        "/metrics",
    );
    (shell, api)
}

fn shown_ids(shell: &Shell) -> Vec<String> {
    shell.page.metrics().iter().map(|m| m.id.clone()).collect()
}

#[tokio::test]
async fn cursor_search_lands_after_slow_route_data() {
    let (mut shell, api) = slow_first_page_shell();

    assert_eq!(
        shell.enter("/metrics?cursor=abc123").await,
        EventOutcome::Applied
    );
    assert_eq!(shown_ids(&shell), vec!["first-page"]);
    assert!(shell.page.ongoing_query());

    assert_eq!(pump(&mut shell).await, EventOutcome::Applied);
    assert_eq!(shown_ids(&shell), vec!["after-abc123"]);
    assert_eq!(shell.page.next_cursor(), "abc123-next");
    assert_eq!(shell.page.prev_cursor(), "page0");
    assert_eq!(
        shell.router.snapshot().query.get("cursor"),
        Some("abc123")
    );
    assert_eq!(
        api.calls.lock().expect("calls lock").clone(),
        vec![
            (None, false, None),
            (None, false, Some("abc123".to_string())),
        ]
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(shell.page.try_next_event().is_none());
    assert_eq!(shown_ids(&shell), vec!["after-abc123"]);
}

#[tokio::test]
async fn filter_search_lands_after_slow_route_data() {
    let (mut shell, api) = slow_first_page_shell();

    shell.enter("/metrics?filter=x").await;
    assert_eq!(pump(&mut shell).await, EventOutcome::Applied);

    assert_eq!(shown_ids(&shell), vec!["after-x"]);
    assert_eq!(shell.page.next_cursor(), "x-next");
    let query = shell.router.snapshot().query;
    assert_eq!(query.get("filter"), Some("x"));
    assert_eq!(query.get("cursor"), Some(""));
    assert_eq!(
        api.calls.lock().expect("calls lock").clone(),
        vec![
            (Some("x".to_string()), false, None),
            (Some("x".to_string()), false, Some(String::new())),
        ]
    );
}
