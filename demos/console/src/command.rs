use chrono::NaiveDate;
use rollcall::prelude::{ParticipantId, SessionId};
use rollcall::rollcall_types::DATE_FORMAT;

pub const HELP: &str = "\
commands:
  open                                   open a session
  close                                  close and commit
  here <user> <name> <code>              submit a code as <user>
  status                                 show the open session
  register <user> <student_id> [name]    link a user to a student id
  excuse <student> [date]                mark excused (date YYYY-MM-DD)
  present <student> [date] [session]     mark present
  remove <student> <date|-> [session]    delete attendance
  export [session]                       print records as JSON lines
  sessions                               list stored sessions
  quit";

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Open,
    Close,
    Here {
        user: ParticipantId,
        name: String,
        code: String,
    },
    Status,
    Register {
        user: ParticipantId,
        student_id: String,
        name: Option<String>,
    },
    Excuse {
        student: String,
        date: Option<NaiveDate>,
    },
    Present {
        student: String,
        date: Option<NaiveDate>,
        session: Option<SessionId>,
    },
    Remove {
        student: String,
        date: Option<NaiveDate>,
        session: Option<SessionId>,
    },
    Export {
        session: Option<SessionId>,
    },
    Sessions,
    Help,
    Quit,
}

pub fn parse(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err("empty command".into());
    };
    let rest: Vec<&str> = words.collect();

    let cmd = match (verb.to_ascii_lowercase().as_str(), rest.as_slice()) {
        ("open", []) => Command::Open,
        ("close", []) => Command::Close,
        ("here", [user, name, code]) => Command::Here {
            user: user_id(user)?,
            name: name.to_string(),
            code: code.to_string(),
        },
        ("status", []) => Command::Status,
        ("register", [user, student_id, name @ ..]) => Command::Register {
            user: user_id(user)?,
            student_id: student_id.to_string(),
            name: (!name.is_empty()).then(|| name.join(" ")),
        },
        ("excuse", [student, date @ ..]) if date.len() <= 1 => Command::Excuse {
            student: student.to_string(),
            date: optional_date(date.first().copied())?,
        },
        ("present", [student, more @ ..]) if more.len() <= 2 => Command::Present {
            student: student.to_string(),
            date: optional_date(more.first().copied())?,
            session: more.get(1).map(|s| SessionId::new(*s)),
        },
        ("remove", [student, date, session @ ..]) if session.len() <= 1 => Command::Remove {
            student: student.to_string(),
            date: optional_date(Some(date))?,
            session: session.first().map(|s| SessionId::new(*s)),
        },
        ("export", [session @ ..]) if session.len() <= 1 => Command::Export {
            session: session.first().map(|s| SessionId::new(*s)),
        },
        ("sessions", []) => Command::Sessions,
        ("help", _) => Command::Help,
        ("quit" | "exit", _) => Command::Quit,
        (verb, _) => return Err(format!("bad or incomplete command: {verb} (try `help`)")),
    };
    Ok(cmd)
}

fn user_id(text: &str) -> Result<ParticipantId, String> {
    text.parse().map_err(|_| format!("not a user id: {text}"))
}

/// `-` means "not given".
fn optional_date(text: Option<&str>) -> Result<Option<NaiveDate>, String> {
    match text {
        None | Some("-") => Ok(None),
        Some(text) => NaiveDate::parse_from_str(text, DATE_FORMAT)
            .map(Some)
            .map_err(|_| format!("invalid date {text}, use YYYY-MM-DD")),
    }
}
