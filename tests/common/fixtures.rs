//! Log trees on disk and the extraction commands that read them.
//!
//! A [`LogTree`] lays out the request and access logs the way the rotation job
//! does, under a temp dir. The fixture commands stand in for the production
//! scripts: the request log already holds `"<count> <address>"` lines, so
//! stage 1 is a plain `cat`, and stage 2 is a fixed-string `grep` for the
//! address.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use toptalk_core::LogLocation;
use toptalk_feeds::CommandSpec;

/// The example access-log line used throughout the harnesses.
pub const LOGIN_LINE: &str =
    "101.226.180.132 [08/Jan/2014:11:11:22 +0800] /login?URL=x http://host/page";

pub const DISKALL_LINE: &str =
    "101.226.180.132 [08/Jan/2014:11:11:25 +0800] /diskall/list.php?p=2 http://host/disk";

pub const OTHER_TALKER_LINE: &str =
    "222.73.133.32 [08/Jan/2014:11:12:01 +0800] /home.php http://host/";

pub struct LogTree {
    dir: TempDir,
}

impl LogTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn request_root(&self) -> PathBuf {
        self.dir.path().join("request_log/history_log")
    }

    pub fn detail_root(&self) -> PathBuf {
        self.dir.path().join("F5_log")
    }

    /// Write `lines` to `location`, creating its directory.
    pub fn write(&self, location: &LogLocation, lines: &[&str]) {
        self.write_path(&location.path(), lines);
    }

    /// Write `lines` to a path relative to the tree root.
    pub fn write_relative(&self, relative: &str, lines: &[&str]) -> PathBuf {
        let path = self.dir.path().join(relative);
        self.write_path(&path, lines);
        path
    }

    fn write_path(&self, path: &Path, lines: &[&str]) {
        fs::create_dir_all(path.parent().expect("log path has a parent")).expect("mkdir");
        let mut body = lines.join("\n");
        body.push('\n');
        fs::write(path, body).expect("write log");
    }
}

/// `sh -c <script> sh`: per-call arguments arrive as `$1`, `$2`.
pub fn sh(script: &str) -> CommandSpec {
    CommandSpec::new("sh").arg("-c").arg(script).arg("sh")
}

/// Stage 1 over a pre-ranked request log.
pub fn cat_top_talkers() -> CommandSpec {
    sh(r#"cat "$1""#)
}

/// Stage 2: every access-log line mentioning the address.
pub fn grep_detail_search() -> CommandSpec {
    sh(r#"grep -F -- "$2" "$1""#)
}

/// A command that can never be spawned.
pub fn missing_command() -> CommandSpec {
    CommandSpec::new("/nonexistent/toptalk-fixture-command")
}
