//! Line-oriented host for the metrics page: reads commands, feeds page events, renders.

use std::{io::Write, sync::Arc};

use client_core::{ConsoleApi, SessionRole};
use metrics_page::{
    EventOutcome, MemoryRouter, MetricsPage, MetricsResolver, Navigator, PageEvent,
    SearchDirection,
};
use shared::domain::FilterType;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

const HELP: &str = "\
commands:
  search [text]          fresh search, optionally replacing the filter
  type all|tombstones    choose which records to list
  next | prev            page through results
  cancel                 abandon the running query
  view <id>              show one record's responses; again to hide
  account <id>           open the account route for a record
  open <url>             enter a route, e.g. /metrics?filter=ada
  show | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Search(Option<String>),
    FilterType(FilterType),
    Next,
    Previous,
    Cancel,
    View(String),
    Account(String),
    Open(String),
    Show,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}'; try 'help'")]
    Unknown(String),
    #[error("'{command}' needs {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },
    #[error("unknown filter type '{0}'; use 'all' or 'tombstones'")]
    FilterType(String),
}

impl ShellCommand {
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let required = |command: &'static str, what: &'static str| {
            if rest.is_empty() {
                Err(CommandError::MissingArgument { command, what })
            } else {
                Ok(rest.to_string())
            }
        };

        let command = match word {
            "search" | "s" => Self::Search((!rest.is_empty()).then(|| rest.to_string())),
            "type" => Self::FilterType(match rest {
                "all" | "0" => FilterType::All,
                "tombstones" | "1" => FilterType::Tombstones,
                other => return Err(CommandError::FilterType(other.to_string())),
            }),
            "next" | "n" => Self::Next,
            "prev" | "p" => Self::Previous,
            "cancel" => Self::Cancel,
            "view" => Self::View(required("view", "a record id")?),
            "account" => Self::Account(required("account", "a record id")?),
            "open" => Self::Open(required("open", "a route")?),
            "show" | "ls" => Self::Show,
            "help" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Search(_) => "search",
            Self::FilterType(_) => "filter_type",
            Self::Next => "next",
            Self::Previous => "prev",
            Self::Cancel => "cancel",
            Self::View(_) => "view",
            Self::Account(_) => "account",
            Self::Open(_) => "open",
            Self::Show => "show",
            Self::Help => "help",
            Self::Quit => "quit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

enum Input {
    Line(Option<String>),
    Page(PageEvent),
}

pub struct Shell {
    api: Arc<dyn ConsoleApi>,
    session: Arc<dyn SessionRole>,
    resolver: MetricsResolver,
    router: MemoryRouter,
    page: MetricsPage,
    on_page: bool,
}

impl Shell {
    pub fn new(
        api: Arc<dyn ConsoleApi>,
        session: Arc<dyn SessionRole>,
        start_route: &str,
    ) -> Self {
        let router = MemoryRouter::new(start_route);
        let page = MetricsPage::new(api.clone(), Arc::new(router.clone()), session.clone());
        Self {
            resolver: MetricsResolver::new(api.clone()),
            api,
            session,
            router,
            page,
            on_page: false,
        }
    }

    /// Builds a fresh page for `url`, applies the resolver's first page to it, then
    /// initializes it. Any query `init` issues lands on top of the resolved data.
    pub async fn enter(&mut self, url: &str) -> EventOutcome {
        self.page.teardown();
        self.router = MemoryRouter::new(url);
        let mut page = MetricsPage::new(
            self.api.clone(),
            Arc::new(self.router.clone()),
            self.session.clone(),
        );
        let route_data = self.resolver.resolve(&self.router.snapshot()).await;
        let outcome = page.handle_event(PageEvent::RouteData(route_data));
        page.init();
        self.page = page;
        self.on_page = true;
        outcome
    }

    pub async fn run<R, W>(mut self, input: R, mut out: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let start = self.router.snapshot().to_url();
        writeln!(out, "{HELP}")?;
        let outcome = self.enter(&start).await;
        self.report(&outcome, &mut out)?;

        let mut lines = input.lines();
        loop {
            let next = tokio::select! {
                line = lines.next_line() => Input::Line(line?),
                Some(event) = self.page.next_event() => Input::Page(event),
            };
            match next {
                Input::Line(None) => break,
                Input::Line(Some(line)) => match ShellCommand::parse(&line) {
                    Ok(Some(command)) => {
                        if self.dispatch(command, &mut out).await? == Flow::Quit {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(err) => writeln!(out, "{err}")?,
                },
                Input::Page(event) => {
                    let outcome = self.page.handle_event(event);
                    self.report(&outcome, &mut out)?;
                }
            }
        }

        self.page.teardown();
        Ok(())
    }

    pub async fn dispatch<W: Write>(
        &mut self,
        command: ShellCommand,
        out: &mut W,
    ) -> anyhow::Result<Flow> {
        debug!(command = command.name(), "dispatching shell command");
        let allowed_off_page = matches!(
            command,
            ShellCommand::Open(_) | ShellCommand::Help | ShellCommand::Quit
        );
        if !self.on_page && !allowed_off_page {
            writeln!(
                out,
                "not on the metrics page (at {}); use 'open /metrics'",
                self.router.snapshot().to_url()
            )?;
            return Ok(Flow::Continue);
        }

        match command {
            ShellCommand::Search(filter) => {
                if let Some(filter) = filter {
                    self.page.set_filter(filter);
                }
                self.page.search(SearchDirection::Fresh);
            }
            ShellCommand::FilterType(filter_type) => {
                self.page.set_filter_type(filter_type);
                writeln!(out, "filter type set to {}", filter_type.code())?;
            }
            ShellCommand::Next => {
                self.page.search(SearchDirection::Next);
            }
            ShellCommand::Previous => {
                self.page.search(SearchDirection::Previous);
            }
            ShellCommand::Cancel => {
                self.page.cancel_query();
                writeln!(out, "query cancelled")?;
            }
            ShellCommand::View(id) => {
                let responses = self
                    .page
                    .metrics()
                    .iter()
                    .find(|m| m.id == id)
                    .map(|m| m.responses.clone())
                    .unwrap_or_default();
                self.page.set_current_responses(&id, responses);
                write!(out, "{}", render(&self.page))?;
            }
            ShellCommand::Account(id) => {
                let Some(record) = self.page.metrics().iter().find(|m| m.id == id).cloned() else {
                    writeln!(out, "no record '{id}' on this page")?;
                    return Ok(Flow::Continue);
                };
                let route = self.page.view_account(&record)?;
                self.page.teardown();
                self.on_page = false;
                writeln!(out, "navigated to {}", route.to_url())?;
            }
            ShellCommand::Open(url) => {
                let outcome = self.enter(&url).await;
                writeln!(out, "entered {}", self.router.snapshot().to_url())?;
                self.report(&outcome, out)?;
            }
            ShellCommand::Show => write!(out, "{}", render(&self.page))?,
            ShellCommand::Help => writeln!(out, "{HELP}")?,
            ShellCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn report<W: Write>(&self, outcome: &EventOutcome, out: &mut W) -> anyhow::Result<()> {
        match outcome {
            EventOutcome::Applied => write!(out, "{}", render(&self.page))?,
            EventOutcome::Failed(err) => {
                writeln!(out, "error: {}", err.message())?;
                if err.requires_reauth() {
                    writeln!(out, "the console session was rejected; sign in again")?;
                }
            }
            EventOutcome::Discarded => {}
        }
        Ok(())
    }
}

pub fn render(page: &MetricsPage) -> String {
    let mut text = String::new();
    let criteria = page.criteria();
    text.push_str(&format!(
        "metrics: {} shown (last page {}), filter '{}', type {}{}\n",
        page.metrics().len(),
        page.metrics_count(),
        criteria.filter,
        criteria.filter_type.code(),
        if page.ongoing_query() { ", loading" } else { "" },
    ));
    if !page.error().is_empty() {
        text.push_str(&format!("error: {}\n", page.error()));
    }

    for record in page.metrics() {
        let owner = if record.is_system() { " [system]" } else { "" };
        let created = record
            .create_time
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".into());
        text.push_str(&format!(
            "  {}{}  {}  {}  {} responses\n",
            record.id,
            owner,
            record.username.as_deref().unwrap_or("-"),
            created,
            record.responses.len(),
        ));
    }

    if let Some(responses) = page.current_responses() {
        text.push_str(&format!("responses ({}):\n", responses.len()));
        for response in responses {
            let fields = serde_json::Value::Object(response.fields.clone());
            text.push_str(&format!("    {fields}\n"));
        }
    }

    text.push_str(&format!(
        "[{}] prev '{}' next '{}'{}\n",
        page.button_label().as_str(),
        page.prev_cursor(),
        page.next_cursor(),
        if page.delete_allowed() { " (delete allowed)" } else { "" },
    ));
    text
}

#[cfg(test)]
#[path = "tests/shell_tests.rs"]
mod tests;
