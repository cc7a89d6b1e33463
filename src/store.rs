//! Durable attendance records.
//!
//! A read returns every record in one scope. A replace deletes every record in
//! that scope and inserts the new roster inside one transaction, so a reader
//! sees either the old roster or the new one and never a mix. Records missing
//! from the new roster are gone afterwards; callers must send the whole roster.
use crate::model::{AttendanceRecord, AttendanceSnapshot, Period, SnapshotScope};
use anyhow::Context;
use rusqlite::{params, Connection};

pub const SAVE_SUCCESS_MESSAGE: &str = "Attendance saved successfully";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceSummary {
    pub deleted: usize,
    pub inserted: usize,
}

pub fn get_all(conn: &Connection, scope: SnapshotScope) -> anyhow::Result<AttendanceSnapshot> {
    let mut stmt = conn
        .prepare(
            "SELECT student_name, period1, period2, period3, period4, period5, period6, period7
             FROM attendance
             WHERE day = ?
             ORDER BY student_name",
        )
        .context("failed to prepare attendance query")?;
    let records = stmt
        .query_map([scope.storage_key()], |r| {
            let mut record = AttendanceRecord::new(r.get::<_, String>(0)?);
            for period in Period::all() {
                let present: bool = r.get(usize::from(period.index()))?;
                record.set(period, present);
            }
            Ok(record)
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .context("failed to read attendance records")?;
    Ok(AttendanceSnapshot::from_records(records))
}

pub fn replace_all(
    conn: &Connection,
    scope: SnapshotScope,
    snapshot: &AttendanceSnapshot,
) -> anyhow::Result<ReplaceSummary> {
    let day = scope.storage_key();
    let updated_at = chrono::Utc::now().to_rfc3339();

    let tx = conn
        .unchecked_transaction()
        .context("failed to begin transaction")?;

    let existing: Vec<String> = {
        let mut stmt = tx.prepare("SELECT student_name FROM attendance WHERE day = ?")?;
        let rows = stmt.query_map([&day], |r| r.get::<_, String>(0))?;
        rows.collect::<Result<Vec<_>, _>>()?
    };

    {
        let mut delete = tx.prepare("DELETE FROM attendance WHERE day = ? AND student_name = ?")?;
        for name in &existing {
            delete
                .execute((&day, name))
                .with_context(|| format!("failed to delete record for {name}"))?;
        }
    }

    {
        let mut insert = tx.prepare(
            "INSERT INTO attendance(day, student_name, period1, period2, period3, period4, period5, period6, period7, updated_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )?;
        for record in snapshot.records() {
            let [p1, p2, p3, p4, p5, p6, p7] = record.periods();
            insert
                .execute(params![
                    &day,
                    &record.student_name,
                    p1,
                    p2,
                    p3,
                    p4,
                    p5,
                    p6,
                    p7,
                    &updated_at
                ])
                .with_context(|| format!("failed to insert record for {}", record.student_name))?;
        }
    }

    tx.commit().context("failed to commit attendance batch")?;

    Ok(ReplaceSummary {
        deleted: existing.len(),
        inserted: snapshot.len(),
    })
}
