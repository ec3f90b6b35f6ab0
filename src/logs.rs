//! Range reads over step logs.
//!
//! Serves slices of a step's log file by line number or byte offset. Two
//! virtual sources bypass the sequence lookup: [`MOCK_SOURCE`] synthesizes
//! a fixed log for wiring checks, and [`SHARED_SOURCE`] serves a snapshot
//! of the control-plane's own log so a reader paging through it is not
//! chasing a file that is still being appended to.

use std::path::PathBuf;

use crate::error::{Result, StagehandError};
use crate::store::SequenceStore;

/// Virtual source producing a fixed 200-line log.
pub const MOCK_SOURCE: &str = "mock";

/// Virtual source serving a scratch snapshot of the shared control-plane
/// log.
pub const SHARED_SOURCE: &str = "pcm";

const MOCK_LINES: usize = 200;

impl SequenceStore {
    /// Read a slice of a step's log.
    ///
    /// In line mode `position` is a 1-based line number and the result is
    /// lines `[position, position + length)` joined by newlines. In byte
    /// mode the same range is a byte slice, clamped to the file size.
    pub fn read_log(
        &self,
        name: &str,
        position: usize,
        length: usize,
        by_char: bool,
    ) -> Result<Vec<u8>> {
        if name.is_empty() {
            return Err(StagehandError::Validation {
                message: "log source name must not be empty".to_string(),
            });
        }

        let data = match name {
            MOCK_SOURCE => mock_log(),
            SHARED_SOURCE => self.shared_log_snapshot(position)?,
            _ => {
                let step = self.get(name)?;
                if step.log_path.is_empty() {
                    return Err(StagehandError::LogNotFound {
                        name: name.to_string(),
                        message: "step has no log path".to_string(),
                    });
                }
                std::fs::read(&step.log_path).map_err(|e| StagehandError::LogNotFound {
                    name: name.to_string(),
                    message: format!("{}: {}", step.log_path, e),
                })?
            }
        };

        Ok(if by_char {
            slice_bytes(&data, position, length)
        } else {
            slice_lines(&data, position, length)
        })
    }

    /// Snapshot the shared log into the scratch copy on a first read
    /// (`position == 0`) and serve every read from the copy.
    fn shared_log_snapshot(&self, position: usize) -> Result<Vec<u8>> {
        let scratch = self.shared_snapshot_path();
        if position == 0 {
            std::fs::create_dir_all(self.config().scratch_dir.as_path())?;
            std::fs::copy(&self.config().shared_log_path, &scratch).map_err(|e| {
                StagehandError::LogNotFound {
                    name: SHARED_SOURCE.to_string(),
                    message: format!(
                        "{}: {}",
                        self.config().shared_log_path.display(),
                        e
                    ),
                }
            })?;
        }
        std::fs::read(&scratch).map_err(|e| StagehandError::LogNotFound {
            name: SHARED_SOURCE.to_string(),
            message: format!("snapshot {}: {}", scratch.display(), e),
        })
    }

    fn shared_snapshot_path(&self) -> PathBuf {
        self.config().scratch_dir.join("shared-log.snapshot")
    }
}

fn mock_log() -> Vec<u8> {
    let mut out = String::new();
    for i in 1..=MOCK_LINES {
        out.push_str(&format!("mock log line {:03}\n", i));
    }
    out.into_bytes()
}

/// Lines `[position, position + length)`, 1-based, newline-joined.
fn slice_lines(data: &[u8], position: usize, length: usize) -> Vec<u8> {
    let last = position.saturating_add(length);
    let text = String::from_utf8_lossy(data);
    text.lines()
        .enumerate()
        .filter(|(i, _)| {
            let line_no = i + 1;
            line_no >= position && line_no < last
        })
        .map(|(_, line)| line)
        .collect::<Vec<_>>()
        .join("\n")
        .into_bytes()
}

/// Bytes `[position, position + length)`, clamped to the data size.
fn slice_bytes(data: &[u8], position: usize, length: usize) -> Vec<u8> {
    let last = position.saturating_add(length).min(data.len());
    if position >= last {
        return Vec::new();
    }
    data[position..last].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::EmptyCatalog;
    use crate::model::SequenceKind;
    use crate::store::StoreConfig;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn log_store(temp: &TempDir) -> SequenceStore {
        let config = StoreConfig {
            log_dir: temp.path().join("logs"),
            scripts_dir: temp.path().join("scripts"),
            shared_log_path: temp.path().join("logs/shared.log"),
            scratch_dir: temp.path().join("scratch"),
        };
        SequenceStore::open(
            temp.path().join("steps.yml"),
            SequenceKind::Embedded,
            config,
            Arc::new(EmptyCatalog),
        )
    }

    #[test]
    fn empty_name_is_rejected() {
        let temp = TempDir::new().unwrap();
        let store = log_store(&temp);

        let err = store.read_log("", 1, 10, false).unwrap_err();
        assert!(matches!(err, StagehandError::Validation { .. }));
    }

    #[test]
    fn mock_source_has_two_hundred_lines() {
        let temp = TempDir::new().unwrap();
        let store = log_store(&temp);

        let data = store.read_log(MOCK_SOURCE, 1, 1000, false).unwrap();
        let text = String::from_utf8(data).unwrap();
        assert_eq!(text.lines().count(), 200);
    }

    #[test]
    fn line_mode_returns_half_open_range() {
        let temp = TempDir::new().unwrap();
        let store = log_store(&temp);
        fs::write(store.path(), "steps:\n- name: director\n").unwrap();

        let log_path = store.get("director").unwrap().log_path;
        fs::create_dir_all(std::path::Path::new(&log_path).parent().unwrap()).unwrap();
        fs::write(&log_path, "one\ntwo\nthree\nfour\nfive\n").unwrap();

        let data = store.read_log("director", 2, 2, false).unwrap();
        assert_eq!(String::from_utf8(data).unwrap(), "two\nthree");
    }

    #[test]
    fn line_mode_saturates_past_the_end() {
        let temp = TempDir::new().unwrap();
        let store = log_store(&temp);
        fs::write(store.path(), "steps:\n- name: director\n").unwrap();

        let log_path = store.get("director").unwrap().log_path;
        fs::create_dir_all(std::path::Path::new(&log_path).parent().unwrap()).unwrap();
        fs::write(&log_path, "one\ntwo\n").unwrap();

        let data = store.read_log("director", 2, usize::MAX, false).unwrap();
        assert_eq!(String::from_utf8(data).unwrap(), "two");
    }

    #[test]
    fn byte_mode_clamps_to_file_size() {
        let temp = TempDir::new().unwrap();
        let store = log_store(&temp);
        fs::write(store.path(), "steps:\n- name: director\n").unwrap();

        let log_path = store.get("director").unwrap().log_path;
        fs::create_dir_all(std::path::Path::new(&log_path).parent().unwrap()).unwrap();
        fs::write(&log_path, "abcdef").unwrap();

        assert_eq!(store.read_log("director", 2, 3, true).unwrap(), b"cde");
        assert_eq!(store.read_log("director", 4, 100, true).unwrap(), b"ef");
        assert!(store.read_log("director", 10, 5, true).unwrap().is_empty());
    }

    #[test]
    fn unknown_step_is_not_found() {
        let temp = TempDir::new().unwrap();
        let store = log_store(&temp);
        fs::write(store.path(), "steps:\n- name: director\n").unwrap();

        let err = store.read_log("ghost", 1, 10, false).unwrap_err();
        assert!(matches!(err, StagehandError::StepNotFound { .. }));
    }

    #[test]
    fn missing_log_file_is_log_not_found() {
        let temp = TempDir::new().unwrap();
        let store = log_store(&temp);
        fs::write(store.path(), "steps:\n- name: director\n").unwrap();

        let err = store.read_log("director", 1, 10, false).unwrap_err();
        assert!(matches!(err, StagehandError::LogNotFound { .. }));
    }

    #[test]
    fn shared_source_snapshots_on_first_read() {
        let temp = TempDir::new().unwrap();
        let store = log_store(&temp);
        fs::create_dir_all(temp.path().join("logs")).unwrap();
        fs::write(temp.path().join("logs/shared.log"), "alpha\nbeta\n").unwrap();

        let first = store.read_log(SHARED_SOURCE, 0, 100, false).unwrap();
        assert!(String::from_utf8(first).unwrap().contains("alpha"));

        // The shared log grows, but non-zero positions keep reading the
        // snapshot taken at position zero.
        fs::write(
            temp.path().join("logs/shared.log"),
            "alpha\nbeta\ngamma\n",
        )
        .unwrap();
        let paged = store.read_log(SHARED_SOURCE, 1, 100, false).unwrap();
        assert!(!String::from_utf8(paged).unwrap().contains("gamma"));
    }

    #[test]
    fn shared_source_without_shared_log_is_not_found() {
        let temp = TempDir::new().unwrap();
        let store = log_store(&temp);

        let err = store.read_log(SHARED_SOURCE, 0, 10, false).unwrap_err();
        assert!(matches!(err, StagehandError::LogNotFound { .. }));
    }

    #[test]
    fn mock_slice_matches_line_numbers() {
        let temp = TempDir::new().unwrap();
        let store = log_store(&temp);

        let data = store.read_log(MOCK_SOURCE, 5, 2, false).unwrap();
        let text = String::from_utf8(data).unwrap();
        assert_eq!(text, "mock log line 005\nmock log line 006");
    }
}
