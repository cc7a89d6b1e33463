//! Line-delimited JSON sidecar protocol.
//!
//! Each stdin line is `{"id","method","params"}`; each stdout line answers
//! with `{"id","ok":true,"result"}` or `{"id","ok":false,"error":{"code","message"}}`.
mod error;
mod handlers;
mod router;
mod types;

pub use router::handle_request;
pub use types::{AppState, Request};

use std::io::{BufRead, Write};

/// Answers requests until `input` closes.
pub fn run<R: BufRead, W: Write>(state: &mut AppState, input: R, out: &mut W) -> std::io::Result<()> {
    for line in input.lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                writeln!(out, "{resp}")?;
                out.flush()?;
                continue;
            }
        };

        let resp = handle_request(state, req);
        writeln!(
            out,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        )?;
        out.flush()?;
    }
    Ok(())
}
