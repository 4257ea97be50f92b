//! `adq shell` – drive the queue from stdin, one command per line:
//! `add <url>`, `cancel <id>`, `remove <id>`, `retry <id>`, `clear`,
//! `status`, `plan <tier>`, `help`, `quit`.
//!
//! Ids may be abbreviated to any unique prefix. On end of input the shell
//! waits for the queue to drain; `quit` and Ctrl-C cancel what is left.

use adq_core::admission::PlanTier;
use adq_core::config::AdqConfig;
use adq_core::job::{JobId, JobOptions, QueueSnapshot};
use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::render::{short_id, status_table};
use crate::cli::session::Session;

const HELP: &str = "commands: add <url> | cancel <id> | remove <id> | retry <id> | clear | status | plan <free|pro|unlimited> | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Add(String),
    Cancel(String),
    Remove(String),
    Retry(String),
    Clear,
    Status,
    Plan(PlanTier),
    Help,
    Quit,
}

/// Parse one input line. Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ShellCommand>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (verb, arg) = match line.split_once(char::is_whitespace) {
        Some((v, rest)) => (v, rest.trim()),
        None => (line, ""),
    };
    let need_arg = |what: &str| -> Result<String, String> {
        if arg.is_empty() {
            Err(format!("{verb}: missing {what}"))
        } else {
            Ok(arg.to_string())
        }
    };
    let cmd = match verb.to_ascii_lowercase().as_str() {
        "add" => ShellCommand::Add(need_arg("url")?),
        "cancel" => ShellCommand::Cancel(need_arg("job id")?),
        "remove" | "rm" => ShellCommand::Remove(need_arg("job id")?),
        "retry" => ShellCommand::Retry(need_arg("job id")?),
        "clear" => ShellCommand::Clear,
        "status" | "ls" => ShellCommand::Status,
        "plan" => ShellCommand::Plan(need_arg("tier")?.parse()?),
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(Some(cmd))
}

/// Resolve a full id or a unique id prefix against the current jobs.
pub fn resolve_id(snap: &QueueSnapshot, token: &str) -> Result<JobId, String> {
    if let Ok(id) = token.parse::<JobId>() {
        return Ok(id);
    }
    let token = token.to_ascii_lowercase();
    let mut matches = snap
        .jobs
        .iter()
        .filter(|j| j.id.to_string().starts_with(&token));
    match (matches.next(), matches.next()) {
        (Some(j), None) => Ok(j.id),
        (None, _) => Err(format!("no job matches {token}")),
        (Some(_), Some(_)) => Err(format!("ambiguous job id {token}")),
    }
}

pub async fn run_shell(
    cfg: &AdqConfig,
    opts: JobOptions,
    plan: Option<PlanTier>,
    json: bool,
) -> Result<()> {
    let session = Session::start(cfg, plan, json);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprintln!("adq shell ({} plan). {}", session.queue.plan(), HELP);

    loop {
        let line = tokio::select! {
            res = lines.next_line() => res?,
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    tracing::warn!("ctrl-c handler: {}", e);
                }
                session.cancel_all();
                break;
            }
        };
        let Some(line) = line else {
            tracing::debug!("stdin closed, waiting for queue to drain");
            break;
        };
        let cmd = match parse_line(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        if cmd == ShellCommand::Quit {
            session.cancel_all();
            break;
        }
        if let Err(e) = execute(&session, &opts, cmd) {
            eprintln!("{e}");
        }
    }

    session.finish().await;
    Ok(())
}

fn execute(session: &Session, opts: &JobOptions, cmd: ShellCommand) -> Result<(), String> {
    let queue = &session.queue;
    let id = |token: &str| resolve_id(&queue.get_state(), token);
    match cmd {
        ShellCommand::Add(url) => {
            let job = queue
                .add(&url, opts.clone())
                .map_err(|e| format!("{e} [{}]", e.code()))?;
            eprintln!("added {}", short_id(&job.id));
        }
        ShellCommand::Cancel(token) => queue.cancel(&id(&token)?),
        ShellCommand::Remove(token) => queue.remove(&id(&token)?),
        ShellCommand::Retry(token) => queue
            .retry(&id(&token)?)
            .map_err(|e| format!("{e} [{}]", e.code()))?,
        ShellCommand::Clear => queue.clear_finished(),
        ShellCommand::Status => {
            for line in status_table(&queue.get_state()) {
                eprintln!("{line}");
            }
        }
        ShellCommand::Plan(tier) => queue.set_plan(tier),
        ShellCommand::Help => eprintln!("{HELP}"),
        ShellCommand::Quit => {}
    }
    Ok(())
}
