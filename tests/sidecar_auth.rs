use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_attendanced");
    let mut child = Command::new(exe)
        .arg("sidecar")
        .env("ATTENDANCE_BCRYPT_COST", "4")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn attendanced");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn message(value: &serde_json::Value) -> Option<&str> {
    value
        .get("result")
        .and_then(|r| r.get("message"))
        .and_then(|v| v.as_str())
}

#[test]
fn signup_then_login_over_the_sidecar() {
    let workspace = temp_dir("attendanced-sidecar-auth");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let res = request(
        &mut stdin,
        &mut reader,
        "1",
        "auth.signup",
        json!({ "email": "a@x.io", "password": "secret1" }),
    );
    assert_eq!(
        res.get("error").and_then(|e| e.get("code")).and_then(|v| v.as_str()),
        Some("no_workspace")
    );

    let _ = request(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let signup = json!({ "email": "a@x.io", "password": "secret1" });
    let res = request(&mut stdin, &mut reader, "3", "auth.signup", signup.clone());
    assert_eq!(message(&res), Some("User registered"));
    let res = request(&mut stdin, &mut reader, "4", "auth.signup", signup);
    assert_eq!(message(&res), Some("Email already exists"));

    let res = request(
        &mut stdin,
        &mut reader,
        "5",
        "auth.login",
        json!({ "email": "a@x.io", "password": "secret1" }),
    );
    assert_eq!(message(&res), Some("Login success"));
    let res = request(
        &mut stdin,
        &mut reader,
        "6",
        "auth.login",
        json!({ "email": "a@x.io", "password": "secret2" }),
    );
    assert_eq!(message(&res), Some("Wrong password"));
    let res = request(
        &mut stdin,
        &mut reader,
        "7",
        "auth.login",
        json!({ "email": "b@x.io", "password": "secret1" }),
    );
    assert_eq!(message(&res), Some("User not found"));

    let res = request(&mut stdin, &mut reader, "8", "auth.login", json!({ "email": "a@x.io" }));
    assert_eq!(
        res.get("error").and_then(|e| e.get("code")).and_then(|v| v.as_str()),
        Some("bad_params")
    );
}
