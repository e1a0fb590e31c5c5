//! Line-oriented attendance console.
//!
//! Stands in for a chat transport: reads commands from stdin, prints codes
//! to stdout as they rotate, and commits to the configured SQLite database.
//!
//! ```text
//! ROLLCALL_DATABASE_URL=sqlite:data/demo.db RUST_LOG=rollcall=debug \
//!     cargo run -p rollcall-console
//! ```

mod command;

use std::sync::Arc;

use rollcall::prelude::*;
use rollcall::rollcall_store::CommitError;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use command::{Command, HELP};

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

/// Prints codes to the terminal.
struct ConsoleDisplay;

impl CodeDisplay for ConsoleDisplay {
    async fn show_code(&self, handle: &DisplayHandle, update: &CodeUpdate) -> Result<(), DisplayError> {
        println!(
            "[{handle}] code {}  (valid {}s, {} submitted)",
            update.code,
            update.interval.as_secs(),
            update.submitted
        );
        Ok(())
    }

    async fn show_closed(
        &self,
        handle: &DisplayHandle,
        summary: &CloseSummary,
    ) -> Result<(), DisplayError> {
        println!(
            "[{handle}] session {} closed: {}/{} saved",
            summary.session_id, summary.saved, summary.total
        );
        Ok(())
    }
}

const TERMINAL: DisplayHandle = DisplayHandle {
    channel: 0,
    message: 0,
};

type Desk = AttendanceDesk<ConsoleDisplay, SqliteStore>;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn run(desk: &Desk, cmd: Command) -> Result<(), RollcallError> {
    match cmd {
        Command::Open => {
            let opened = desk.open(vec![TERMINAL]).await?;
            println!("session {} open", opened.session_id);
        }
        Command::Close => print_close(desk.close().await),
        Command::Here { user, name, code } => match desk.submit(user, &name, &code).await? {
            Admission::Accepted { submitted, replaced } => {
                let verb = if replaced { "updated" } else { "recorded" };
                println!("{name}: attendance {verb} ({submitted} so far)");
            }
            Admission::NoSession => println!("{name}: no attendance session is open"),
            Admission::CodeRejected => println!("{name}: code is invalid or has expired"),
        },
        Command::Status => {
            let status = desk.status().await;
            match (status.session_id, status.current_code) {
                (Some(id), Some(code)) => {
                    println!("session {id}: code {code}, {} submitted", status.submitted)
                }
                _ => println!("no session open"),
            }
        }
        Command::Register {
            user,
            student_id,
            name,
        } => {
            let updated = desk.register(user, &student_id, name.as_deref()).await?;
            let verb = if updated { "updated" } else { "registered" };
            println!("{user} {verb} as {student_id}");
        }
        Command::Excuse { student, date } => {
            print_mark(&student, "excused", desk.excuse(&student, date, None).await?)
        }
        Command::Present {
            student,
            date,
            session,
        } => print_mark(
            &student,
            "present",
            desk.mark_present(&student, date, session).await?,
        ),
        Command::Remove {
            student,
            date,
            session,
        } => {
            let removed = desk.remove_attendance(&student, date, session).await?;
            println!("removed {removed} record(s) for {student}");
        }
        Command::Export { session } => {
            for record in desk.export(session).await? {
                match serde_json::to_string(&record) {
                    Ok(line) => println!("{line}"),
                    Err(err) => tracing::warn!(%err, "record not printable"),
                }
            }
        }
        Command::Sessions => {
            for id in desk.sessions().await? {
                println!("{id}");
            }
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

fn print_close(result: Result<CloseReport, RollcallError>) {
    match result {
        Ok(report) => println!(
            "session {} committed: {} record(s)",
            report.session_id, report.saved
        ),
        Err(RollcallError::Commit(CommitError::Partial {
            session_id,
            saved,
            total,
            failed,
        })) => println!(
            "session {session_id}: only {saved} of {total} saved, missing {}",
            failed
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Err(err) => println!("error: {err}"),
    }
}

fn print_mark(student: &str, status: &str, outcome: MarkOutcome) {
    match outcome {
        MarkOutcome::Updated(n) => println!("{student}: {n} record(s) marked {status}"),
        MarkOutcome::Inserted(session) => {
            println!("{student}: marked {status} (session {session})")
        }
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rollcall=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = RollcallConfig::from_env()?;
    let store = Arc::new(SqliteStore::connect(&config.database_url).await?);
    tracing::info!(database_url = %config.database_url, "store ready");

    let desk = AttendanceDesk::builder()
        .config(config)
        .display(Arc::new(ConsoleDisplay))
        .store(store)
        .build()?;

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        match command::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(cmd) => {
                if let Err(err) = run(&desk, cmd).await {
                    println!("error: {err}");
                }
            }
            Err(msg) => println!("{msg}"),
        }
    }

    // Don't lose an open session's submissions on the way out.
    if desk.status().await.is_active() {
        print_close(desk.close().await);
    }
    desk.store().close().await;
    Ok(())
}
