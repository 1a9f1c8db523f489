//! JSONL solution logger with file rotation

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::navigation::NavigationSolution;
use crate::ubx::protocol::HardwareGeneration;

const FILE_PREFIX: &str = "solutions_";
const FILE_EXTENSION: &str = "jsonl";

/// One line of the log
#[derive(Debug, Serialize)]
pub struct SolutionRecord<'a> {
    pub timestamp: DateTime<Utc>,
    pub hardware: HardwareGeneration,
    #[serde(flatten)]
    pub solution: &'a NavigationSolution,
}

/// Appends delivered solutions to rotating `solutions_<n>.jsonl` files
#[derive(Debug)]
pub struct SolutionLogger {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    file_index: u64,
}

impl SolutionLogger {
    /// Create a logger writing into `dir`
    ///
    /// The directory is created if missing. Numbering continues after the
    /// highest existing file so earlier runs are never overwritten.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be created or listed
    pub fn new<P: AsRef<Path>>(dir: P, max_records_per_file: usize, max_files_to_keep: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let file_index = existing_logs(&dir)?.last().map_or(0, |(index, _)| *index);

        Ok(Self {
            dir,
            max_records_per_file: max_records_per_file.max(1),
            max_files_to_keep: max_files_to_keep.max(1),
            writer: None,
            records_in_file: 0,
            file_index,
        })
    }

    /// Append one solution
    ///
    /// # Errors
    ///
    /// Returns `Io` on file errors, `Telemetry` if serialization fails
    pub fn log(&mut self, solution: &NavigationSolution, hardware: HardwareGeneration) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let record = SolutionRecord {
            timestamp: Utc::now(),
            hardware,
            solution,
        };

        if let Some(writer) = self.writer.as_mut() {
            serde_json::to_writer(&mut *writer, &record)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            self.records_in_file += 1;
        }
        Ok(())
    }

    /// Path of the file currently written, if any
    pub fn current_path(&self) -> Option<PathBuf> {
        self.writer.as_ref().map(|_| self.path_for(self.file_index))
    }

    fn path_for(&self, index: u64) -> PathBuf {
        self.dir.join(format!("{}{}.{}", FILE_PREFIX, index, FILE_EXTENSION))
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        self.file_index += 1;
        let path = self.path_for(self.file_index);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!("Logging solutions to {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.records_in_file = 0;
        self.prune()
    }

    /// Remove the oldest files beyond the retention limit
    fn prune(&self) -> Result<()> {
        let logs = existing_logs(&self.dir)?;
        let excess = logs.len().saturating_sub(self.max_files_to_keep);

        for (_, path) in logs.into_iter().take(excess) {
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed old telemetry file {}", path.display()),
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
        Ok(())
    }
}

/// Log files in `dir` with their index, oldest first
fn existing_logs(dir: &Path) -> Result<Vec<(u64, PathBuf)>> {
    let mut logs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let index = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_prefix(FILE_PREFIX))
            .and_then(|rest| rest.strip_suffix(FILE_EXTENSION))
            .and_then(|rest| rest.strip_suffix('.'))
            .and_then(|number| number.parse::<u64>().ok());
        if let Some(index) = index {
            logs.push((index, path));
        }
    }
    logs.sort_by_key(|(index, _)| *index);
    Ok(logs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::FixType;
    use tempfile::TempDir;

    fn solution(lat: i32) -> NavigationSolution {
        NavigationSolution {
            fix_type: FixType::Fix3D,
            lat,
            lon: 100,
            num_sat: 9,
            ..NavigationSolution::default()
        }
    }

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_writes_jsonl_records() {
        let dir = TempDir::new().unwrap();
        let mut logger = SolutionLogger::new(dir.path(), 100, 5).unwrap();
        assert!(logger.current_path().is_none());

        logger.log(&solution(1), HardwareGeneration::Ublox8).unwrap();
        logger.log(&solution(2), HardwareGeneration::Ublox8).unwrap();

        let path = logger.current_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "solutions_1.jsonl");

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["lat"], 1);
        assert_eq!(lines[1]["lat"], 2);
        assert_eq!(lines[0]["fix_type"], "3d");
        assert_eq!(lines[0]["hardware"], "ublox8");
        assert!(lines[0]["timestamp"].is_string());
        assert!(lines[0].get("has_new_position").is_none());
    }

    #[test]
    fn test_rotates_after_max_records() {
        let dir = TempDir::new().unwrap();
        let mut logger = SolutionLogger::new(dir.path(), 2, 10).unwrap();

        for lat in 0..5 {
            logger.log(&solution(lat), HardwareGeneration::Unknown).unwrap();
        }

        let logs = existing_logs(dir.path()).unwrap();
        assert_eq!(logs.len(), 3);
        assert_eq!(read_lines(&logs[0].1).len(), 2);
        assert_eq!(read_lines(&logs[2].1).len(), 1);
        assert_eq!(read_lines(&logs[2].1)[0]["lat"], 4);
    }

    #[test]
    fn test_keeps_only_newest_files() {
        let dir = TempDir::new().unwrap();
        let mut logger = SolutionLogger::new(dir.path(), 1, 2).unwrap();

        for lat in 0..4 {
            logger.log(&solution(lat), HardwareGeneration::Unknown).unwrap();
        }

        let indices: Vec<u64> = existing_logs(dir.path()).unwrap().into_iter().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![3, 4]);
    }

    #[test]
    fn test_numbering_continues_across_runs() {
        let dir = TempDir::new().unwrap();
        {
            let mut logger = SolutionLogger::new(dir.path(), 10, 10).unwrap();
            logger.log(&solution(1), HardwareGeneration::Unknown).unwrap();
        }

        let mut logger = SolutionLogger::new(dir.path(), 10, 10).unwrap();
        logger.log(&solution(2), HardwareGeneration::Unknown).unwrap();
        assert_eq!(logger.current_path().unwrap().file_name().unwrap(), "solutions_2.jsonl");
    }

    #[test]
    fn test_ignores_unrelated_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::write(dir.path().join("solutions_x.jsonl"), "x").unwrap();

        let mut logger = SolutionLogger::new(dir.path(), 1, 1).unwrap();
        logger.log(&solution(1), HardwareGeneration::Unknown).unwrap();
        logger.log(&solution(2), HardwareGeneration::Unknown).unwrap();

        assert!(dir.path().join("notes.txt").exists());
        assert!(dir.path().join("solutions_x.jsonl").exists());
        assert_eq!(existing_logs(dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        SolutionLogger::new(&nested, 1, 1).unwrap();
        assert!(nested.is_dir());
    }
}
