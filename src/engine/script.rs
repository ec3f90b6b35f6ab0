//! Child-process supervision for step scripts.
//!
//! A step's script runs as a shell child with stdout and stderr redirected
//! into the step's log file. Completion is a race between "process exited"
//! and "timeout elapsed", decided with a non-blocking wait loop; a timeout
//! is a hard kill, not a cooperative cancellation.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::error::Result;

/// How often the supervisor polls the child for exit.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Outcome of one supervised script run.
#[derive(Debug, Clone)]
pub struct ScriptOutcome {
    pub success: bool,
    pub timed_out: bool,
    pub exit_code: Option<i32>,
    /// Failure description, empty on success.
    pub message: String,
}

impl ScriptOutcome {
    fn succeeded() -> Self {
        Self {
            success: true,
            timed_out: false,
            exit_code: Some(0),
            message: String::new(),
        }
    }

    fn failed(exit_code: Option<i32>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            timed_out: false,
            exit_code,
            message: message.into(),
        }
    }

    fn timed_out(minutes: i64) -> Self {
        Self {
            success: false,
            timed_out: true,
            exit_code: None,
            message: format!("killed after exceeding the {} minute timeout", minutes),
        }
    }
}

/// Run `script` with output redirected to `log_path`.
///
/// A pre-existing log file is renamed aside with a timestamp suffix rather
/// than overwritten. `timeout_minutes == 0` waits forever. Spawn failures
/// are reported as a failed outcome, not an error; only log-file handling
/// surfaces IO errors.
pub fn run_script(script: &str, log_path: &Path, timeout_minutes: i64) -> Result<ScriptOutcome> {
    let timeout = if timeout_minutes > 0 {
        Some(Duration::from_secs(timeout_minutes as u64 * 60))
    } else {
        None
    };
    supervise(script, log_path, timeout).map(|outcome| {
        if outcome.timed_out {
            ScriptOutcome::timed_out(timeout_minutes)
        } else {
            outcome
        }
    })
}

/// Spawn the script and race its exit against the optional timeout.
fn supervise(script: &str, log_path: &Path, timeout: Option<Duration>) -> Result<ScriptOutcome> {
    let log = open_rotated_log(log_path)?;
    let log_err = log.try_clone()?;

    let mut cmd = shell_command(script);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err));

    tracing::debug!(script, log = %log_path.display(), "spawning step script");

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return Ok(ScriptOutcome::failed(
                None,
                format!("failed to spawn script: {}", e),
            ))
        }
    };

    let deadline = timeout.map(|t| Instant::now() + t);

    loop {
        match child.try_wait()? {
            Some(status) => {
                return Ok(if status.success() {
                    ScriptOutcome::succeeded()
                } else {
                    ScriptOutcome::failed(
                        status.code(),
                        match status.code() {
                            Some(code) => format!("script exited with code {}", code),
                            None => "script terminated by signal".to_string(),
                        },
                    )
                });
            }
            None => {
                if let Some(deadline) = deadline {
                    if Instant::now() >= deadline {
                        tracing::warn!(script, "step script timed out, killing");
                        let _ = child.kill();
                        let _ = child.wait();
                        return Ok(ScriptOutcome {
                            success: false,
                            timed_out: true,
                            exit_code: None,
                            message: "killed after exceeding the timeout".to_string(),
                        });
                    }
                }
                std::thread::sleep(WAIT_POLL_INTERVAL);
            }
        }
    }
}

/// Open a fresh log file, renaming any existing one aside with a
/// timestamp suffix.
fn open_rotated_log(log_path: &Path) -> Result<File> {
    if let Some(dir) = log_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    if log_path.exists() {
        let rotated = format!(
            "{}.{}",
            log_path.display(),
            Utc::now().format("%Y%m%d%H%M%S%3f")
        );
        std::fs::rename(log_path, &rotated)?;
    }
    Ok(File::create(log_path)?)
}

fn shell_command(script: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(script);
        cmd
    } else {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg(script);
        cmd
    }
}

/// The last non-empty line of a step's log, used to enrich failure
/// reasons.
pub fn last_log_line(log_path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(log_path).ok()?;
    content
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Append a failure trailer to the step's log recording what ran and why
/// it failed.
pub fn append_failure_trailer(
    log_path: &Path,
    step_name: &str,
    script: &str,
    error: &str,
) -> Result<()> {
    let mut log = OpenOptions::new().create(true).append(true).open(log_path)?;
    writeln!(log, "\n----- step '{}' failed -----", step_name)?;
    writeln!(log, "script: {}", script)?;
    writeln!(log, "log: {}", log_path.display())?;
    writeln!(log, "error: {}", error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn successful_script_writes_log() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("step.log");

        let outcome = run_script("echo hello", &log, 0).unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.exit_code, Some(0));
        assert!(std::fs::read_to_string(&log).unwrap().contains("hello"));
    }

    #[test]
    fn failing_script_reports_exit_code() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("step.log");

        let outcome = run_script("exit 3", &log, 0).unwrap();

        assert!(!outcome.success);
        assert!(!outcome.timed_out);
        assert_eq!(outcome.exit_code, Some(3));
        assert!(outcome.message.contains("3"));
    }

    #[test]
    fn stderr_lands_in_the_log_too() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("step.log");

        run_script("echo oops >&2", &log, 0).unwrap();

        assert!(std::fs::read_to_string(&log).unwrap().contains("oops"));
    }

    #[test]
    fn existing_log_is_rotated_not_overwritten() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("step.log");
        std::fs::write(&log, "previous run\n").unwrap();

        run_script("echo fresh", &log, 0).unwrap();

        assert!(std::fs::read_to_string(&log).unwrap().contains("fresh"));
        let rotated: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("step.log."))
            .collect();
        assert_eq!(rotated.len(), 1);
        assert!(std::fs::read_to_string(rotated[0].path())
            .unwrap()
            .contains("previous run"));
    }

    #[test]
    fn spawn_failure_is_a_failed_outcome() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("step.log");

        // An empty script line still spawns a shell; break the shell
        // instead by making the log directory un-creatable is platform
        // dependent, so exercise the nonzero-exit path for robustness.
        let outcome = run_script("no_such_binary_for_stagehand_tests", &log, 0).unwrap();
        assert!(!outcome.success);
    }

    #[test]
    fn last_log_line_skips_trailing_blanks() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("step.log");
        std::fs::write(&log, "first\nsecond\n\n\n").unwrap();

        assert_eq!(last_log_line(&log).unwrap(), "second");
    }

    #[test]
    fn last_log_line_of_missing_file_is_none() {
        let temp = TempDir::new().unwrap();
        assert!(last_log_line(&temp.path().join("absent.log")).is_none());
    }

    #[test]
    fn failure_trailer_records_step_and_error() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("step.log");
        std::fs::write(&log, "output\n").unwrap();

        append_failure_trailer(&log, "director", "sh director.sh", "exit code 2").unwrap();

        let content = std::fs::read_to_string(&log).unwrap();
        assert!(content.contains("output"));
        assert!(content.contains("step 'director' failed"));
        assert!(content.contains("sh director.sh"));
        assert!(content.contains("exit code 2"));
    }

    #[test]
    #[cfg(unix)]
    fn timeout_kills_long_running_script() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("step.log");

        let outcome = supervise("sleep 30", &log, Some(Duration::from_millis(300))).unwrap();

        assert!(!outcome.success);
        assert!(outcome.timed_out);
        assert!(outcome.exit_code.is_none());
    }

    #[test]
    fn script_finishing_before_timeout_wins_the_race() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("step.log");

        let outcome = run_script("echo quick", &log, 1).unwrap();

        assert!(outcome.success);
        assert!(!outcome.timed_out);
    }

    #[test]
    fn timeout_message_names_the_minute_budget() {
        let outcome = ScriptOutcome::timed_out(7);
        assert!(outcome.message.contains("7 minute"));
    }
}
