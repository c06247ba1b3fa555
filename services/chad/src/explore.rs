//! Interactive command loop over an [`ExploreSession`].

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

use clickhist::{
    ClickHistResult, ExploreSession, MessageLevel, Renderer, SessionEvent, SessionOutcome,
};

use crate::bundle::BundleWriter;
use crate::console::{Command, ConsoleRenderer};
use crate::notebook::CaseNotebook;

/// Totals for a finished command loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub commands: usize,
    pub rejected: usize,
    pub cases_recorded: usize,
}

/// Number for the first case of a new session: one past the highest case
/// already recorded under the same tag, in the notebook or as a manifest.
pub async fn first_case_number(
    bundle: &BundleWriter,
    notebook: &CaseNotebook,
) -> ClickHistResult<usize> {
    let last = bundle.last_case_number().await?.max(notebook.last_case_number());
    if last > 0 {
        info!(last, "Continuing case numbering");
    }
    Ok(last + 1)
}

/// Read commands line by line until `quit` or end of input.
pub async fn run_commands<I, W>(
    session: &mut ExploreSession<ConsoleRenderer<W>>,
    input: I,
) -> std::io::Result<LoopStats>
where
    I: AsyncBufRead + Unpin,
    W: Write,
{
    let mut stats = LoopStats::default();
    let mut lines = input.lines();

    session.renderer_mut().prompt();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            session.renderer_mut().prompt();
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                session
                    .renderer_mut()
                    .show_message(MessageLevel::Warning, &e.to_string());
                stats.rejected += 1;
                session.renderer_mut().prompt();
                continue;
            }
        };
        stats.commands += 1;
        debug!(?command, "Command");

        if command == Command::Quit {
            break;
        }

        if let Some(outcome) = execute(session, command).await {
            match outcome {
                SessionOutcome::CaseRecorded(_) => stats.cases_recorded += 1,
                SessionOutcome::Rejected(_) => stats.rejected += 1,
                _ => {}
            }
        }
        session.renderer_mut().prompt();
    }

    info!(
        commands = stats.commands,
        rejected = stats.rejected,
        cases = stats.cases_recorded,
        "Command loop finished"
    );
    Ok(stats)
}

/// Run one command. Returns the session outcome for commands that are
/// session events.
pub async fn execute<W: Write>(
    session: &mut ExploreSession<ConsoleRenderer<W>>,
    command: Command,
) -> Option<SessionOutcome> {
    let event = match command {
        Command::Cell { ix, iy } => SessionEvent::CellClick { ix, iy },
        Command::Point(index) => SessionEvent::PointClick { index },
        Command::Pick(n) => {
            let index = n
                .checked_sub(1)
                .and_then(|i| session.controller().sample().get(i))
                .map(|p| p.index);
            match index {
                Some(index) => SessionEvent::PointClick { index },
                None => {
                    let shown = session.controller().sample().len();
                    let text = if shown == 0 {
                        "no cell open; use 'cell <ix> <iy>' first".to_string()
                    } else {
                        format!("pick expects 1..={}", shown)
                    };
                    session
                        .renderer_mut()
                        .show_message(MessageLevel::Warning, &text);
                    return None;
                }
            }
        }
        Command::Confirm => SessionEvent::Confirm,
        Command::Clear => SessionEvent::Clear,
        Command::Histogram => {
            session.redraw();
            return None;
        }
        Command::Summary { ix, iy } => {
            match session.summary(ix, iy) {
                Some(summary) => session.renderer_mut().show_summary(&summary),
                None => session.renderer_mut().show_message(
                    MessageLevel::Warning,
                    &format!("no cell ({}, {})", ix, iy),
                ),
            }
            return None;
        }
        Command::Log => {
            let log = session.session_log().clone();
            session.renderer_mut().show_log(&log);
            return None;
        }
        Command::Help => {
            session.renderer_mut().show_help();
            return None;
        }
        Command::Quit => return None,
    };

    Some(session.handle(event).await)
}
