#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// Scratch working directory plus a data directory inside it.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn tasks_file(&self) -> PathBuf {
        self.data_dir().join("todo-app-tasks.json")
    }

    /// `taskpad` rooted in this workspace with an isolated data dir.
    pub fn cmd(&self) -> Command {
        let mut cmd = taskpad_cmd();
        cmd.current_dir(self.path());
        cmd.arg("--data-dir").arg(self.data_dir());
        cmd
    }

    /// Run a command with `--json` and return the parsed envelope.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("json envelope")
    }

    /// Add a task and return its full id.
    pub fn add(&self, title: &str) -> String {
        let value = self.json(&["add", title]);
        value["data"]["id"].as_str().expect("task id").to_string()
    }
}

pub fn taskpad_cmd() -> Command {
    let mut cmd = Command::cargo_bin("taskpad").expect("binary");
    cmd.env_remove("TASKPAD_DATA_DIR");
    cmd.env_remove("TASKPAD_CONFIG");
    cmd.env_remove("RUST_LOG");
    cmd
}
