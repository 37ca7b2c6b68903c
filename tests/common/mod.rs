use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

/// Binary preamble length of an nginx cache file header, ahead of the key line.
pub const PREAMBLE_LEN: usize = 0x90;

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_ckf") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "ckf.exe" } else { "ckf" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve ckf binary path for integration test"),
    }
}

/// Bytes of a cache file whose key line reads `key`, followed by a response body.
pub fn cache_file_bytes(key: &str, body: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; PREAMBLE_LEN];
    bytes.extend_from_slice(b"\nKEY: ");
    bytes.extend_from_slice(key.as_bytes());
    bytes.extend_from_slice(b"\nHTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\n");
    bytes.extend_from_slice(body);
    bytes
}

/// Write a cache file at `root/rel`, creating intermediate directories.
pub fn write_cache_file(root: &Path, rel: &str, key: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create cache subdir");
    }
    fs::write(&path, cache_file_bytes(key, b"cached body")).expect("write cache file");
    path
}

pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    run_cli_case_with_env(case_name, args, &[])
}

pub fn run_cli_case_with_env(case_name: &str, args: &[&str], env: &[(&str, &str)]) -> CmdResult {
    let root = std::env::temp_dir().join("ckf-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let mut command = Command::new(&bin_path);
    command
        .args(args)
        .env_remove("CKF_CONFIG")
        .env_remove("CKF_OUTPUT_FORMAT")
        .env_remove("CKF_ACTIVITY_LOG")
        .env_remove("CKF_HEADER_WINDOW_BYTES")
        .env_remove("CKF_HEADER_MIN_FIRST_FILE_BYTES")
        .env("RUST_BACKTRACE", "1");
    for (key, value) in env {
        command.env(key, value);
    }
    let output = command.output().expect("execute ckf command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("env={env:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}
