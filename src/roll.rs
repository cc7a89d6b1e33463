//! Line-oriented roll call over an [`AttendanceSession`].
//!
//! One command per line; the table is printed after every edit.
use std::io::{BufRead, Write};

use chrono::NaiveDate;

use crate::error::AttendanceError;
use crate::model::{DAY_KEY_FORMAT, PERIOD_COUNT};
use crate::render::{Standing, ViewModel};
use crate::session::{AttendanceRemote, AttendanceSession, LoadOutcome, ScopeMode};

pub const HELP: &str = "\
commands:
  show                      print the table
  add <name>                add a student with every period absent
  toggle <name> <period>    flip one period (1-7)
  reset                     clear every period
  save                      replace the stored roster with this one
  load                      discard local edits and reload
  filter on|off             show only students present at least once
  date YYYY-MM-DD           change the display date
  prev | next               move the display date by one month
  help
  quit";

enum Flow {
    Continue,
    Quit,
}

pub fn write_table<W: Write>(out: &mut W, view: &ViewModel) -> std::io::Result<()> {
    if let Some(date) = &view.header_date {
        writeln!(out, "Attendance for {date}")?;
    }
    if let Some(placeholder) = view.placeholder {
        writeln!(out, "{placeholder}")?;
        return Ok(());
    }

    let width = view
        .rows
        .iter()
        .map(|r| r.student_name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Student".len());
    write!(out, "{:<width$}", "Student")?;
    for p in 1..=PERIOD_COUNT {
        write!(out, "  P{p}")?;
    }
    writeln!(out, "  Total")?;

    for row in view.visible_rows() {
        write!(out, "{:<width$}", row.student_name)?;
        for present in row.periods {
            write!(out, "  {}", if present { " x" } else { " ." })?;
        }
        let mark = match row.standing {
            Standing::Present => "",
            Standing::Absent => " !",
        };
        writeln!(out, "  {}{}", row.total_label, mark)?;
    }
    Ok(())
}

fn report_error<W: Write>(out: &mut W, e: &AttendanceError) -> std::io::Result<()> {
    if e.is_validation() {
        writeln!(out, "{e}")
    } else {
        writeln!(out, "Error: {e}")
    }
}

fn report_load<W: Write>(out: &mut W, outcome: &LoadOutcome) -> std::io::Result<()> {
    match outcome {
        LoadOutcome::Loaded { students } => writeln!(out, "Loaded {students} student(s)"),
        LoadOutcome::FellBackToEmpty(e) => writeln!(out, "Could not load attendance: {e}"),
        LoadOutcome::ReloadFailed(e) => writeln!(out, "Saved, but could not reload: {e}"),
    }
}

fn reload<R: AttendanceRemote, W: Write>(
    session: &mut AttendanceSession<R>,
    out: &mut W,
) -> std::io::Result<()> {
    match session.load() {
        Ok(outcome) => report_load(out, &outcome),
        Err(e) => report_error(out, &e),
    }
}

fn after_date_change<R: AttendanceRemote, W: Write>(
    session: &mut AttendanceSession<R>,
    out: &mut W,
) -> std::io::Result<()> {
    if session.options().scope_mode == ScopeMode::PerDay {
        reload(session, out)?;
    }
    write_table(out, &session.view())
}

fn execute<R: AttendanceRemote, W: Write>(
    session: &mut AttendanceSession<R>,
    line: &str,
    out: &mut W,
) -> std::io::Result<Flow> {
    let line = line.trim();
    let (cmd, rest) = match line.split_once(char::is_whitespace) {
        Some((c, r)) => (c, r.trim()),
        None => (line, ""),
    };

    match cmd {
        "" => {}
        "show" => write_table(out, &session.view())?,
        "add" => match session.add_student(rest) {
            Ok(_) => {
                writeln!(out, "Student added successfully")?;
                write_table(out, &session.view())?;
            }
            Err(e) => report_error(out, &e)?,
        },
        "toggle" => {
            // The period is the last token so names may contain spaces.
            let parsed = rest
                .rsplit_once(char::is_whitespace)
                .and_then(|(name, p)| p.parse::<u8>().ok().map(|p| (name.trim(), p)));
            let Some((name, period)) = parsed else {
                writeln!(out, "usage: toggle <name> <period>")?;
                return Ok(Flow::Continue);
            };
            match session.toggle_period(name, period) {
                Ok(_) => write_table(out, &session.view())?,
                Err(e) => report_error(out, &e)?,
            }
        }
        "reset" => {
            session.reset();
            writeln!(out, "Table reset - all attendance cleared")?;
            write_table(out, &session.view())?;
        }
        "save" => match session.save() {
            Ok(outcome) => {
                writeln!(out, "{}", outcome.message)?;
                if !outcome.confirmed {
                    report_load(out, &outcome.reload)?;
                }
                write_table(out, &session.view())?;
            }
            Err(e) => report_error(out, &e)?,
        },
        "load" => {
            reload(session, out)?;
            write_table(out, &session.view())?;
        }
        "filter" => match rest {
            "on" => {
                session.set_present_only(true);
                write_table(out, &session.view())?;
            }
            "off" => {
                session.set_present_only(false);
                write_table(out, &session.view())?;
            }
            _ => writeln!(out, "usage: filter on|off")?,
        },
        "date" => match NaiveDate::parse_from_str(rest, DAY_KEY_FORMAT) {
            Ok(date) => {
                session.select_date(date);
                after_date_change(session, out)?;
            }
            Err(_) => writeln!(out, "usage: date YYYY-MM-DD")?,
        },
        "prev" => {
            session.previous_month();
            after_date_change(session, out)?;
        }
        "next" => {
            session.next_month();
            after_date_change(session, out)?;
        }
        "help" => writeln!(out, "{HELP}")?,
        "quit" | "exit" => return Ok(Flow::Quit),
        other => writeln!(out, "unknown command: {other} (try help)")?,
    }
    Ok(Flow::Continue)
}

/// Loads the session, then reads commands until `quit` or end of input.
pub fn run_roll<R: AttendanceRemote, I: BufRead, W: Write>(
    session: &mut AttendanceSession<R>,
    input: I,
    out: &mut W,
) -> std::io::Result<()> {
    reload(session, out)?;
    write_table(out, &session.view())?;
    out.flush()?;

    for line in input.lines() {
        let line = line?;
        let flow = execute(session, &line, out)?;
        out.flush()?;
        if let Flow::Quit = flow {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::remote::LocalRemote;
    use crate::session::SessionOptions;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn script(remote: &LocalRemote, mode: ScopeMode, lines: &str) -> String {
        let options = SessionOptions {
            scope_mode: mode,
            ..SessionOptions::default()
        };
        let mut session = AttendanceSession::with_date(remote, options, day(2024, 3, 15));
        let mut out = Vec::new();
        run_roll(&mut session, lines.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn scripted_roll_call_saves_and_reloads() {
        let remote = LocalRemote::new(open_in_memory().unwrap());
        let out = script(
            &remote,
            ScopeMode::Undated,
            "add Alice\nadd Alice\nadd   \ntoggle Alice 1\ntoggle Alice 9\nsave\nquit\nadd Never\n",
        );
        assert!(out.contains("Attendance for 03-15-24"));
        assert!(out.contains("No students added yet."));
        assert!(out.contains("Student added successfully"));
        assert!(out.contains("Student already exists: Alice"));
        assert!(out.contains("Please enter a student name"));
        assert!(out.contains("Period must be between 1 and 7, got 9"));
        assert!(out.contains("Attendance saved successfully"));
        assert!(out.contains("1/7 !"));
        assert!(!out.contains("Never"));

        let again = script(&remote, ScopeMode::Undated, "show\n");
        assert!(again.contains("Loaded 1 student(s)"));
        assert!(again.contains("Alice"));
    }

    #[test]
    fn save_with_empty_roster_is_refused() {
        let remote = LocalRemote::new(open_in_memory().unwrap());
        let out = script(&remote, ScopeMode::Undated, "save\n");
        assert!(out.contains("No attendance records to save"));
    }

    #[test]
    fn reset_and_filter_hide_absent_students() {
        let remote = LocalRemote::new(open_in_memory().unwrap());
        let out = script(
            &remote,
            ScopeMode::Undated,
            "add Bob\nadd Carol\ntoggle Carol 2\nfilter on\n",
        );
        let filtered = out.rsplit("Attendance for").next().unwrap();
        assert!(filtered.contains("Carol"));
        assert!(!filtered.contains("Bob"));

        let out = script(
            &remote,
            ScopeMode::Undated,
            "add Bob\ntoggle Bob 1\nfilter on\nreset\n",
        );
        assert!(out.contains("Table reset - all attendance cleared"));
        let after_reset = out.rsplit("Attendance for").next().unwrap();
        assert!(after_reset.contains("Bob"));
    }

    #[test]
    fn per_day_mode_reloads_on_date_change() {
        let remote = LocalRemote::new(open_in_memory().unwrap());
        script(&remote, ScopeMode::PerDay, "add Dan\nsave\n");
        let out = script(&remote, ScopeMode::PerDay, "next\ndate 2024-03-15\n");
        assert!(out.contains("Attendance for 04-15-24"));
        assert!(out.contains("Loaded 0 student(s)"));
        assert!(out.contains("Loaded 1 student(s)"));
        assert!(out.contains("Dan"));
    }

    #[test]
    fn toggle_accepts_names_with_spaces() {
        let remote = LocalRemote::new(open_in_memory().unwrap());
        let out = script(&remote, ScopeMode::Undated, "add Mary Ann\ntoggle Mary Ann 3\n");
        assert!(out.contains("1/7"));
        assert!(!out.contains("Student not found"));
    }
}
