use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE_NAME: &str = "attendance.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    // `day` is '' for the undated roster, otherwise YYYY-MM-DD.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance(
            day TEXT NOT NULL DEFAULT '',
            student_name TEXT NOT NULL,
            period1 INTEGER NOT NULL DEFAULT 0,
            period2 INTEGER NOT NULL DEFAULT 0,
            period3 INTEGER NOT NULL DEFAULT 0,
            period4 INTEGER NOT NULL DEFAULT 0,
            period5 INTEGER NOT NULL DEFAULT 0,
            period6 INTEGER NOT NULL DEFAULT 0,
            period7 INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT,
            PRIMARY KEY(day, student_name)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_day ON attendance(day)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}
