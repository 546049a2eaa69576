//! Shared test utilities for driving real `sh` processes.

#![allow(dead_code, unused_imports)]

use std::path::Path;
use std::time::{Duration, Instant};

use stagehand::supervisor::{Color, ProcessSpec};

pub const TEST_GRACE: Duration = Duration::from_millis(500);

/// A [`ProcessSpec`] running `script` through `sh -c`.
pub fn sh(name: &str, script: &str) -> ProcessSpec {
    ProcessSpec::new(name, Color::Cyan, "sh").args(["-c", script])
}

/// The label the relay puts in front of every line for `sh(name, ..)`.
pub fn tag(name: &str) -> String {
    format!("\x1b[36m[{}]\x1b[0m", name)
}

/// Poll until `path` exists or `timeout` elapses.
pub async fn wait_for_file(path: &Path, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if path.exists() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Poll until `path` holds at least `lines` lines or `timeout` elapses.
pub async fn wait_for_lines(path: &Path, lines: usize, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        let count = std::fs::read_to_string(path)
            .map(|s| s.lines().count())
            .unwrap_or(0);
        if count >= lines {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Read a pid written by `echo $$ > file`, waiting for it to appear.
pub async fn read_pid(path: &Path) -> i32 {
    assert!(
        wait_for_file(path, Duration::from_secs(10)).await,
        "pid file {} never appeared",
        path.display()
    );
    // The file can exist before `echo` has finished writing.
    let start = Instant::now();
    loop {
        let text = std::fs::read_to_string(path).unwrap_or_default();
        if let Ok(pid) = text.trim().parse() {
            return pid;
        }
        assert!(start.elapsed() < Duration::from_secs(10), "pid file stayed empty");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Whether a process with this pid still exists and has not exited.
///
/// Orphans reparented to a non-reaping init linger as zombies, which still
/// answer signal 0, so on Linux the state letter in `/proc` is checked too.
#[cfg(unix)]
pub fn pid_alive(pid: i32) -> bool {
    // SAFETY: signal 0 only checks for existence.
    if unsafe { libc::kill(pid, 0) } != 0 {
        return false;
    }
    !is_zombie(pid)
}

#[cfg(target_os = "linux")]
fn is_zombie(pid: i32) -> bool {
    // Format: `pid (comm) state ...`; comm may itself contain spaces or parens.
    std::fs::read_to_string(format!("/proc/{pid}/stat"))
        .ok()
        .and_then(|stat| {
            let (_, rest) = stat.rsplit_once(')')?;
            rest.trim_start().chars().next()
        })
        .map_or(true, |state| state == 'Z' || state == 'X')
}

#[cfg(all(unix, not(target_os = "linux")))]
fn is_zombie(_pid: i32) -> bool {
    false
}
