//! Shared fixtures for integration tests.
//!
//! Source repositories are built with the real `git` CLI. Every commit gets
//! a pinned, increasing author and committer date so splits are
//! reproducible across runs.

#![allow(dead_code)]

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use sha2::{Digest, Sha256};
use tempfile::TempDir;

use monosplit::core::config::SplitConfig;
use monosplit::engine::plan::Plan;
use monosplit::engine::runner::{self, RunOptions};
use monosplit::engine::{CancelToken, Observer, RunReport};

/// First pinned commit time (2020-01-01T00:00:00Z).
const EPOCH: i64 = 1_577_836_800;

/// Run a git command in the given directory with pinned dates.
pub fn run_git(dir: &Path, args: &[&str]) -> String {
    run_git_at(dir, args, EPOCH)
}

fn run_git_at(dir: &Path, args: &[&str], when: i64) -> String {
    let date = format!("{} +0000", when);
    let output = Command::new("git")
        .args(["-c", "commit.gpgsign=false", "-c", "tag.gpgsign=false"])
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "Test User")
        .env("GIT_AUTHOR_EMAIL", "test@old.example.com")
        .env("GIT_COMMITTER_NAME", "Build Bot")
        .env("GIT_COMMITTER_EMAIL", "bot@old.example.com")
        .env("GIT_AUTHOR_DATE", &date)
        .env("GIT_COMMITTER_DATE", &date)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A source repository driven through the git CLI.
pub struct SourceRepo {
    dir: TempDir,
    clock: Cell<i64>,
}

impl SourceRepo {
    /// An empty repository on `master`. Nothing is written to the working
    /// tree yet.
    pub fn bare_start() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        run_git(dir.path(), &["init", "-q"]);
        run_git(dir.path(), &["symbolic-ref", "HEAD", "refs/heads/master"]);
        Self {
            dir,
            clock: Cell::new(EPOCH),
        }
    }

    /// An empty repository with both baseline files in its working tree.
    pub fn new() -> Self {
        let repo = Self::bare_start();
        repo.write(".gitignore", "*.tmp\n");
        repo.write(".gitattributes", "* -text\n");
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, path: &str, content: &str) {
        self.write_bytes(path, content.as_bytes());
    }

    pub fn write_bytes(&self, path: &str, content: &[u8]) {
        let full = self.dir.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }

    pub fn remove(&self, path: &str) {
        let full = self.dir.path().join(path);
        if full.is_dir() {
            fs::remove_dir_all(full).unwrap();
        } else {
            fs::remove_file(full).unwrap();
        }
    }

    /// Stage everything and commit, one minute after the previous commit.
    pub fn commit(&self, message: &str) -> String {
        let when = self.clock.get() + 60;
        self.clock.set(when);
        run_git_at(self.path(), &["add", "-A"], when);
        run_git_at(self.path(), &["commit", "-q", "-m", message], when);
        self.git(&["rev-parse", "HEAD"])
    }

    pub fn git(&self, args: &[&str]) -> String {
        run_git_at(self.path(), args, self.clock.get())
    }

    pub fn tag(&self, name: &str, target: &str) {
        self.git(&["tag", name, target]);
    }

    pub fn annotated_tag(&self, name: &str, target: &str, message: &str) {
        self.git(&["tag", "-a", name, "-m", message, target]);
    }

    /// Place an object in this repository's large-file cache and return a
    /// pointer to it.
    pub fn lfs_object(&self, content: &[u8]) -> (String, String) {
        let digest = hex::encode(Sha256::digest(content));
        let path = self
            .path()
            .join(".git/lfs/objects")
            .join(&digest[0..2])
            .join(&digest[2..4])
            .join(&digest);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        let pointer = format!(
            "version https://git-lfs.github.com/spec/v1\noid sha256:{}\nsize {}\n",
            digest,
            content.len()
        );
        (digest, pointer)
    }
}

/// A derived repository produced by a split.
pub struct Derived {
    path: PathBuf,
}

impl Derived {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn git(&self, args: &[&str]) -> String {
        run_git(&self.path, args)
    }

    /// Number of commits on HEAD, 0 for an unborn HEAD.
    pub fn commit_count(&self) -> usize {
        let output = Command::new("git")
            .args(["rev-list", "--count", "HEAD"])
            .current_dir(&self.path)
            .output()
            .expect("git rev-list failed");
        if !output.status.success() {
            return 0;
        }
        String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse()
            .unwrap()
    }

    /// Subjects of HEAD's history, oldest first.
    pub fn subjects(&self) -> Vec<String> {
        if self.commit_count() == 0 {
            return Vec::new();
        }
        let log = self.git(&["log", "--reverse", "--format=%s"]);
        log.lines().map(str::to_string).collect()
    }

    /// Paths in `rev`'s tree, recursively.
    pub fn files(&self, rev: &str) -> Vec<String> {
        let out = self.git(&["ls-tree", "-r", "--name-only", rev]);
        out.lines().map(str::to_string).collect()
    }

    pub fn show(&self, rev: &str, path: &str) -> String {
        self.git(&["show", &format!("{}:{}", rev, path)])
    }

    /// Commit a gitlink at `path` points to in `rev`, if any.
    pub fn gitlink(&self, rev: &str, path: &str) -> Option<String> {
        let out = self.git(&["ls-tree", rev, path]);
        let mut fields = out.split_whitespace();
        match (fields.next(), fields.next(), fields.next()) {
            (Some("160000"), Some("commit"), Some(oid)) => Some(oid.to_string()),
            _ => None,
        }
    }
}

/// Configuration text pointing at `source`, writing into `output`.
pub fn config_text(source: &Path, output: &Path, extra: &str) -> String {
    format!(
        "main_repo = {:?}\noutput = {:?}\norigin_url = \"git@example.com:org/{{name}}.git\"\nmaintenance = \"none\"\njobs = 2\n{}",
        source.display().to_string(),
        output.display().to_string(),
        extra
    )
}

pub fn config(source: &Path, output: &Path, extra: &str) -> SplitConfig {
    let config: SplitConfig = toml::from_str(&config_text(source, output, extra)).unwrap();
    config.validate().unwrap();
    config
}

/// Plan and run a full split, silently.
pub fn split(config: &SplitConfig) -> RunReport {
    split_with(config, CancelToken::new())
}

pub fn split_with(config: &SplitConfig, cancel: CancelToken) -> RunReport {
    let plan = Plan::build(config, &[]).unwrap();
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(runner::run(
        config,
        plan,
        RunOptions::default(),
        Observer::silent(),
        cancel,
    ))
    .unwrap()
}

/// The shared component used by most scenarios.
pub const COMMON: &str = r#"
[[shared]]
name = "Common"
source = "Common"
mounts = ["A/libCommon", "B/libCommon"]
"#;
