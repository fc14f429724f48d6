//! Branch sync against real git repositories in a tempdir.
//!
//! Each test builds a bare `origin`, a working clone with `main` and
//! `Development`, and a second clone used to push upstream changes.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use launcher::io::config::SyncConfig;
use launcher::io::git::Git;
use launcher::sync::{SyncPlan, sync_branches};

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("spawn git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn configure_identity(dir: &Path) {
    git(dir, &["config", "user.email", "dev@example.com"]);
    git(dir, &["config", "user.name", "Dev"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
}

fn commit_file(dir: &Path, name: &str, contents: &str, message: &str) {
    fs::write(dir.join(name), contents).expect("write file");
    git(dir, &["add", name]);
    git(dir, &["commit", "-q", "-m", message]);
}

struct Repos {
    _temp: tempfile::TempDir,
    work: PathBuf,
    upstream: PathBuf,
}

fn setup_repos() -> Repos {
    let temp = tempfile::tempdir().expect("tempdir");
    let origin = temp.path().join("origin.git");
    let work = temp.path().join("work");
    let upstream = temp.path().join("upstream");
    fs::create_dir_all(&origin).expect("mkdir origin");
    fs::create_dir_all(&work).expect("mkdir work");

    git(&origin, &["init", "-q", "--bare"]);
    git(&origin, &["symbolic-ref", "HEAD", "refs/heads/main"]);

    git(&work, &["init", "-q"]);
    git(&work, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    configure_identity(&work);
    commit_file(&work, "app.py", "print('v1')\n", "initial");
    git(&work, &["branch", "Development"]);
    git(&work, &["remote", "add", "origin", origin.to_str().expect("utf-8 path")]);
    git(&work, &["push", "-q", "origin", "main"]);

    git(
        temp.path(),
        &["clone", "-q", origin.to_str().expect("utf-8 path"), "upstream"],
    );
    configure_identity(&upstream);

    Repos {
        _temp: temp,
        work,
        upstream,
    }
}

fn plan() -> SyncPlan {
    SyncPlan::from(&SyncConfig::default())
}

#[test]
fn development_catches_up_with_remote_main() {
    let repos = setup_repos();
    commit_file(&repos.upstream, "app.py", "print('v2')\n", "upstream change");
    git(&repos.upstream, &["push", "-q", "origin", "main"]);
    let upstream_head = git(&repos.upstream, &["rev-parse", "HEAD"]);

    // The untracked environment directory does not block the sync.
    fs::create_dir_all(repos.work.join("venv")).expect("mkdir venv");
    fs::write(repos.work.join("venv/pyvenv.cfg"), "home = /usr/bin\n").expect("write cfg");

    let git_repo = Git::new(&repos.work);
    sync_branches(&git_repo, &plan(), &["venv"]).expect("sync");

    assert_eq!(git_repo.current_branch().expect("branch"), "Development");
    assert_eq!(git(&repos.work, &["rev-parse", "main"]), upstream_head);
    assert!(
        git(&repos.work, &["merge-base", "--is-ancestor", "main", "Development"]).is_empty()
    );
    assert_eq!(
        fs::read_to_string(repos.work.join("app.py")).expect("read app"),
        "print('v2')\n"
    );
}

/// A project living in a subdirectory ignores its own environment, not the root's.
#[test]
fn nested_project_ignores_its_own_environment() {
    let repos = setup_repos();
    let project = repos.work.join("web");
    fs::create_dir_all(project.join("venv/bin")).expect("mkdir nested venv");
    fs::write(project.join("venv/pyvenv.cfg"), "home = /usr/bin\n").expect("write cfg");

    let git_repo = Git::new(&project);
    sync_branches(&git_repo, &plan(), &["venv"]).expect("sync from subdirectory");
    assert_eq!(git_repo.current_branch().expect("branch"), "Development");

    // A same-named directory at the repository root is still a blocker.
    git(&repos.work, &["checkout", "-q", "main"]);
    fs::create_dir_all(repos.work.join("venv")).expect("mkdir root venv");
    fs::write(repos.work.join("venv/stray.txt"), "x\n").expect("write stray");
    let err = sync_branches(&git_repo, &plan(), &["venv"]).unwrap_err();
    assert!(format!("{err:#}").contains("venv/stray.txt"));
}

#[test]
fn dirty_worktree_is_refused() {
    let repos = setup_repos();
    fs::write(repos.work.join("app.py"), "print('local edit')\n").expect("edit app");

    let git_repo = Git::new(&repos.work);
    let err = sync_branches(&git_repo, &plan(), &["venv"]).unwrap_err();

    assert!(format!("{err:#}").contains("app.py"));
    assert_eq!(git_repo.current_branch().expect("branch"), "main");
}

#[test]
fn missing_target_branch_stops_before_checkout() {
    let repos = setup_repos();
    git(&repos.work, &["branch", "-q", "-D", "Development"]);

    let git_repo = Git::new(&repos.work);
    let err = sync_branches(&git_repo, &plan(), &[]).unwrap_err();

    assert!(err.to_string().contains("'Development' does not exist"));
    assert_eq!(git_repo.current_branch().expect("branch"), "main");
}

#[test]
fn merge_conflict_points_at_manual_resolution() {
    let repos = setup_repos();
    git(&repos.work, &["checkout", "-q", "Development"]);
    commit_file(&repos.work, "app.py", "print('dev')\n", "dev change");
    git(&repos.work, &["checkout", "-q", "main"]);
    commit_file(&repos.upstream, "app.py", "print('main')\n", "main change");
    git(&repos.upstream, &["push", "-q", "origin", "main"]);

    let git_repo = Git::new(&repos.work);
    let err = sync_branches(&git_repo, &plan(), &[]).unwrap_err();

    assert!(format!("{err:#}").contains("resolve them and commit the merge manually"));
    assert_eq!(git_repo.current_branch().expect("branch"), "Development");
}
