//! Integration tests for the Git interface.
//!
//! These tests use real git repositories created with the git CLI to verify
//! that the Git interface reads what git itself writes.

mod common;

use common::SourceRepo;
use monosplit::core::types::{FileMode, Oid};
use monosplit::git::{FileChange, Git, GitError, TreeEntry};

fn oid(s: String) -> Oid {
    Oid::new(s).unwrap()
}

#[test]
fn open_valid_repository() {
    let repo = SourceRepo::new();
    repo.write("a.txt", "a");
    repo.commit("one");
    let git = Git::open(repo.path()).unwrap();
    assert_eq!(
        git.work_dir().unwrap().canonicalize().unwrap(),
        repo.path().canonicalize().unwrap()
    );
    assert!(git.lfs_objects_dir().ends_with(".git/lfs/objects"));
}

#[test]
fn open_non_repository_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = Git::open(dir.path()).unwrap_err();
    assert!(matches!(err, GitError::NotARepo { .. }));
}

#[test]
fn head_oid_matches_git() {
    let repo = SourceRepo::new();
    repo.write("a.txt", "a");
    let head = repo.commit("one");
    let git = Git::open(repo.path()).unwrap();
    assert_eq!(git.head_oid().unwrap(), Some(oid(head)));
}

#[test]
fn unborn_head_has_empty_log() {
    let repo = SourceRepo::new();
    let git = Git::open(repo.path()).unwrap();
    assert_eq!(git.head_oid().unwrap(), None);
    assert!(git.topo_log().unwrap().is_empty());
}

#[test]
fn topo_log_puts_parents_first_across_merges() {
    let repo = SourceRepo::new();
    repo.write("a.txt", "a");
    let base = repo.commit("base");
    repo.git(&["checkout", "-q", "-b", "side"]);
    repo.write("side.txt", "s");
    let side = repo.commit("side");
    repo.git(&["checkout", "-q", "master"]);
    repo.write("main.txt", "m");
    let main = repo.commit("main");
    repo.git(&["merge", "-q", "--no-ff", "-m", "merge", "side"]);
    let merge = repo.git(&["rev-parse", "HEAD"]);

    let git = Git::open(repo.path()).unwrap();
    let log: Vec<String> = git
        .topo_log()
        .unwrap()
        .into_iter()
        .map(|o| o.as_str().to_string())
        .collect();
    assert_eq!(log.len(), 4);
    assert_eq!(log[0], base);
    assert_eq!(log[3], merge);
    assert!(log.contains(&side) && log.contains(&main));

    let commit = git.commit(&oid(merge)).unwrap();
    assert_eq!(commit.parents, vec![oid(main.clone()), oid(side)]);
    assert_eq!(git.first_parent(&commit.oid).unwrap(), Some(oid(main)));
}

#[test]
fn commit_metadata_is_read() {
    let repo = SourceRepo::new();
    repo.write("a.txt", "a");
    let head = repo.commit("subject\n\nbody");
    let git = Git::open(repo.path()).unwrap();
    let commit = git.commit(&oid(head)).unwrap();
    assert_eq!(commit.author.name, "Test User");
    assert_eq!(commit.author.email, "test@old.example.com");
    assert_eq!(commit.committer.name, "Build Bot");
    assert_eq!(commit.message, "subject\n\nbody\n");
    assert!(commit.parents.is_empty());
}

#[cfg(unix)]
#[test]
fn entries_distinguish_trees_blobs_and_executables() {
    use std::os::unix::fs::PermissionsExt;

    let repo = SourceRepo::new();
    repo.write("dir/a.txt", "a");
    repo.write("run.sh", "#!/bin/sh\n");
    std::fs::set_permissions(
        repo.path().join("run.sh"),
        std::fs::Permissions::from_mode(0o755),
    )
    .unwrap();
    let head = repo.commit("one");

    let git = Git::open(repo.path()).unwrap();
    let tree = git.commit(&oid(head)).unwrap().tree;
    assert!(matches!(git.entry_at(&tree, "dir").unwrap(), Some(TreeEntry::Tree { .. })));
    assert!(matches!(
        git.entry_at(&tree, "dir/a.txt").unwrap(),
        Some(TreeEntry::Blob { mode: FileMode::Regular, .. })
    ));
    assert!(matches!(
        git.entry_at(&tree, "run.sh").unwrap(),
        Some(TreeEntry::Blob { mode: FileMode::Executable, .. })
    ));
    assert_eq!(git.entry_at(&tree, "missing").unwrap(), None);
}

#[test]
fn diff_reports_renames() {
    let repo = SourceRepo::new();
    repo.write("A/old.txt", "same content for rename detection\n");
    repo.write("A/gone.txt", "gone");
    let first = repo.commit("one");
    repo.remove("A/old.txt");
    repo.remove("A/gone.txt");
    repo.write("A/new.txt", "same content for rename detection\n");
    let second = repo.commit("two");

    let git = Git::open(repo.path()).unwrap();
    let tree_at = |commit: String| {
        let root = git.commit(&oid(commit)).unwrap().tree;
        git.entry_at(&root, "A").unwrap().unwrap().oid().clone()
    };
    let changes = git.diff_trees(&tree_at(first), &tree_at(second)).unwrap();
    assert!(changes.iter().any(|c| matches!(
        c,
        FileChange::Renamed { from, to, .. } if from == "old.txt" && to == "new.txt"
    )));
    assert!(changes.contains(&FileChange::Deleted {
        path: "gone.txt".into()
    }));
}

#[test]
fn tags_peel_to_commits() {
    let repo = SourceRepo::new();
    repo.write("a.txt", "a");
    let head = repo.commit("one");
    repo.tag("light", &head);
    repo.annotated_tag("heavy", &head, "release notes");

    let git = Git::open(repo.path()).unwrap();
    let mut tags = git.tags().unwrap();
    tags.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0].name, "heavy");
    assert_eq!(tags[0].target, Some(oid(head.clone())));
    assert_eq!(
        tags[0].annotation.as_ref().map(|a| a.message.as_str()),
        Some("release notes\n")
    );
    assert_eq!(tags[1].name, "light");
    assert!(tags[1].annotation.is_none());
    assert_eq!(git.tag_target("light").unwrap(), Some(oid(head)));
}

#[test]
fn staged_gitlink_is_written_as_commit_entry() {
    let dir = tempfile::TempDir::new().unwrap();
    let git = Git::init(dir.path(), "master").unwrap();
    let link = Oid::new("1234567890".repeat(4)).unwrap();
    git.stage_gitlink("lib", &link).unwrap();

    let when = monosplit::core::types::Timestamp {
        seconds: 1_600_000_000,
        offset_minutes: 60,
    };
    let ident = monosplit::git::Identity {
        name: "T".into(),
        email: "t@example.com".into(),
        when,
    };
    git.commit_index("link", &ident, &ident).unwrap();

    let listing = common::run_git(dir.path(), &["ls-tree", "HEAD"]);
    assert_eq!(listing, format!("160000 commit {}\tlib", link));
    let date = common::run_git(dir.path(), &["log", "-1", "--format=%ai"]);
    assert_eq!(date, "2020-09-13 13:26:40 +0100");
}
