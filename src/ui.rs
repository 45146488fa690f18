// UI layer: turns backend records into terminal text. Rendering functions
// return `String`s so the command handlers decide where output goes.

use crossterm::style::Stylize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fmt::Write as _;
use std::io::{IsTerminal, Write};
use std::time::Duration;

use crate::models::{
    Command, JobStatus, Model, Note, Notebook, Podcast, SearchResults, SearchType, Source,
    SourceKind, Transformation,
};
use crate::poll::PollObserver;

const RULE_WIDE: usize = 80;
const RULE: usize = 40;
const PREVIEW_CHARS: usize = 200;

/// Spinner on stderr while a blocking request is in flight. Hidden when
/// stderr is not a terminal.
pub fn spinner(msg: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(msg.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

fn clip(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn or_dash(v: Option<&str>) -> &str {
    v.unwrap_or("-")
}

pub fn notebooks(list: &[Notebook], verbose: bool) -> String {
    if list.is_empty() {
        return "No notebooks found.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "Found {} notebook(s):\n", list.len());
    if verbose {
        for nb in list {
            let _ = writeln!(out, "ID: {}", nb.id);
            let _ = writeln!(out, "Name: {}", nb.name);
            let _ = writeln!(out, "Description: {}", nb.description.as_deref().unwrap_or(""));
            let _ = writeln!(
                out,
                "Sources: {} | Notes: {}",
                nb.source_count.unwrap_or(0),
                nb.note_count.unwrap_or(0)
            );
            let _ = writeln!(out, "Created: {}", or_dash(nb.created_at.as_deref()));
            let _ = writeln!(out, "{}", "-".repeat(RULE));
        }
        return out;
    }
    let _ = writeln!(out, "{:<30} {:<30} {:<10} {:<10}", "ID", "Name", "Sources", "Notes");
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDE));
    for nb in list {
        let _ = writeln!(
            out,
            "{:<30} {:<30} {:<10} {:<10}",
            clip(&nb.id, 28),
            clip(&nb.name, 28),
            nb.source_count.unwrap_or(0),
            nb.note_count.unwrap_or(0)
        );
    }
    out
}

pub fn notebook(nb: &Notebook) -> String {
    notebooks(std::slice::from_ref(nb), true)
        .lines()
        .skip(2)
        .map(|l| format!("{l}\n"))
        .collect()
}

pub fn sources(list: &[Source]) -> String {
    if list.is_empty() {
        return "No sources found.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "Found {} source(s):\n", list.len());
    let _ = writeln!(out, "{:<30} {:<8} {:<40}", "ID", "Type", "Title");
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDE));
    for src in list {
        let kind = src.kind.map(SourceKind::as_str).unwrap_or("-");
        let _ = writeln!(
            out,
            "{:<30} {:<8} {:<40}",
            clip(&src.id, 28),
            kind,
            clip(src.title.as_deref().unwrap_or("Untitled"), 38)
        );
    }
    out
}

pub fn notes(list: &[Note]) -> String {
    if list.is_empty() {
        return "No notes found.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "Found {} note(s):\n", list.len());
    for note in list {
        let _ = writeln!(out, "ID: {}", note.id);
        let _ = writeln!(out, "Title: {}", note.title.as_deref().unwrap_or("Untitled"));
        if let Some(content) = &note.content {
            let _ = writeln!(out, "Content: {}", clip(content, PREVIEW_CHARS));
        }
        let _ = writeln!(out, "{}", "-".repeat(RULE));
    }
    out
}

pub fn transformations(list: &[Transformation]) -> String {
    if list.is_empty() {
        return "No transformations found.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "Found {} transformation(s):\n", list.len());
    for t in list {
        let _ = writeln!(out, "ID: {}", t.id);
        let _ = writeln!(out, "Name: {}", t.name);
        let _ = writeln!(out, "Title: {}", or_dash(t.title.as_deref()));
        let _ = writeln!(out, "Description: {}", or_dash(t.description.as_deref()));
        let _ = writeln!(out, "Default: {}", if t.apply_default { "Yes" } else { "No" });
        let _ = writeln!(out, "{}", "-".repeat(RULE));
    }
    out
}

pub fn models(list: &[Model]) -> String {
    if list.is_empty() {
        return "No models found.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "{:<30} {:<15} {:<35}", "ID", "Provider", "Model");
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDE));
    for m in list {
        let _ = writeln!(
            out,
            "{:<30} {:<15} {:<35}",
            clip(&m.id, 28),
            or_dash(m.provider.as_deref()),
            or_dash(m.model_name.as_deref())
        );
    }
    out
}

pub fn podcasts(list: &[Podcast]) -> String {
    if list.is_empty() {
        return "No podcasts found.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "{:<30} {:<30} {:<15}", "ID", "Name", "Status");
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDE));
    for p in list {
        let _ = writeln!(
            out,
            "{:<30} {:<30} {:<15}",
            clip(or_dash(p.id.as_deref()), 28),
            clip(or_dash(p.name.as_deref()), 28),
            or_dash(p.status.as_deref())
        );
    }
    out
}

pub fn search_results(results: &SearchResults, search_type: SearchType) -> String {
    let total = results.total_count.unwrap_or(results.results.len() as u64);
    let mut out = String::new();
    let _ = writeln!(out, "\nFound {} results:\n", total);
    let _ = writeln!(out, "{}", "-".repeat(60));
    for (i, hit) in results.results.iter().enumerate() {
        let kind = hit.kind.as_deref().unwrap_or("unknown").to_uppercase();
        let _ = writeln!(
            out,
            "{}. [{}] {}",
            i + 1,
            kind,
            hit.title.as_deref().unwrap_or("Untitled")
        );
        if search_type == SearchType::Vector {
            match hit.score {
                Some(score) => {
                    let _ = writeln!(out, "   Score: {score}");
                }
                None => {
                    let _ = writeln!(out, "   Score: N/A");
                }
            }
        }
        if let Some(content) = hit.content.as_deref().filter(|c| !c.is_empty()) {
            let _ = writeln!(out, "   Preview: {}...", clip(content, PREVIEW_CHARS));
        }
        let _ = writeln!(out);
    }
    out
}

/// `Status: running (40%)`; progress is left out when absent.
pub fn status_line(job: &Command, color: bool) -> String {
    let status = if color {
        paint(&job.status)
    } else {
        job.status.to_string()
    };
    match job.progress {
        Some(p) => format!("Status: {status} ({p}%)"),
        None => format!("Status: {status}"),
    }
}

fn paint(status: &JobStatus) -> String {
    let s = status.as_str();
    match status {
        JobStatus::Completed => s.green().to_string(),
        JobStatus::Failed | JobStatus::Cancelled => s.red().to_string(),
        JobStatus::Running => s.cyan().to_string(),
        JobStatus::Pending | JobStatus::Other(_) => s.yellow().to_string(),
    }
}

/// Prints each poll observation as it arrives.
pub struct StatusPrinter<W: Write> {
    out: W,
    color: bool,
}

impl StatusPrinter<std::io::Stdout> {
    pub fn stdout() -> Self {
        let out = std::io::stdout();
        let color = out.is_terminal();
        StatusPrinter { out, color }
    }
}

impl<W: Write> StatusPrinter<W> {
    pub fn new(out: W, color: bool) -> Self {
        StatusPrinter { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> PollObserver for StatusPrinter<W> {
    fn observe(&mut self, job: &Command) {
        let _ = writeln!(self.out, "{}", status_line(job, self.color));
        if let Some(err) = job.error_message.as_deref().filter(|e| !e.is_empty()) {
            let _ = writeln!(self.out, "Error: {err}");
        }
        if job.status.is_terminal() {
            if let Some(result) = job.result.as_ref().filter(|r| !r.is_null()) {
                let _ = writeln!(self.out, "\nResult: {result}");
            }
        }
        let _ = self.out.flush();
    }

    fn waiting(&mut self, interval: Duration) {
        let _ = writeln!(self.out, "Waiting {}s...", interval.as_secs());
        let _ = self.out.flush();
    }
}
