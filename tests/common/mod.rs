#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

use table_recon::dataset::Dataset;
use table_recon::schema::Schema;

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes a CSV under the workspace and loads it with an inferred schema.
    pub fn load_csv(&self, name: &str, dataset_name: &str, contents: &str) -> Dataset {
        let path = self.write(name, contents);
        Dataset::from_csv_path(dataset_name, &path, None, b',', encoding_rs::UTF_8)
            .expect("load dataset")
    }
}

/// Builds an in-memory dataset from header names and string rows.
pub fn dataset(name: &str, headers: &[&str], rows: &[&[&str]]) -> Dataset {
    let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();
    Dataset::new(name, Schema::from_headers(&headers), rows)
}
