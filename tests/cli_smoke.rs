use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::tempdir;

fn ndl(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ndl"))
        .args(args)
        .current_dir(dir)
        .env_remove("NDL_LOG")
        .output()
        .expect("failed to run ndl")
}

fn has_native_indexer() -> bool {
    which::which("mdfind").is_ok()
}

#[test]
fn walks_tree_and_renders_matches() {
    if has_native_indexer() {
        return;
    }
    let temp = tempdir().expect("failed to create tempdir");
    fs::create_dir(temp.path().join("src")).unwrap();
    fs::write(temp.path().join("src/lib.rs"), "fn main() {}\n// TODO: fix\n").unwrap();
    fs::write(temp.path().join("README"), "nothing here\n").unwrap();

    let output = ndl(temp.path(), &["TODO"]);

    assert!(output.status.success(), "{output:?}");
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "src/lib.rs\n2: // TODO: fix\n"
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("find . -type f"));
    assert!(stderr.contains("--reformat-grep-output TODO"));
}

#[test]
fn no_matches_exits_zero_with_only_header() {
    if has_native_indexer() {
        return;
    }
    let temp = tempdir().expect("failed to create tempdir");
    fs::write(temp.path().join("a.txt"), "bar\n").unwrap();

    let output = ndl(temp.path(), &["foo"]);

    assert!(output.status.success(), "{output:?}");
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.lines().count(), 1);
    assert!(stderr.contains(" | xargs -0 -n 1000 -P "));
}

#[test]
fn git_checkout_uses_git_grep() {
    if has_native_indexer() || which::which("git").is_err() {
        return;
    }
    let temp = tempdir().expect("failed to create tempdir");
    let init = Command::new("git")
        .args(["init", "-q"])
        .current_dir(temp.path())
        .status()
        .expect("failed to run git init");
    assert!(init.success());
    fs::write(temp.path().join("notes.txt"), "first\nTODO here\n").unwrap();

    let output = ndl(temp.path(), &["TODO"]);

    assert!(output.status.success(), "{output:?}");
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "notes.txt\n2: TODO here\n"
    );
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("git grep --untracked"));
}

#[test]
fn missing_tool_exits_one_with_hint() {
    let temp = tempdir().expect("failed to create tempdir");
    let empty_path = temp.path().join("bin");
    fs::create_dir(&empty_path).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_ndl"))
        .arg("foo")
        .current_dir(temp.path())
        .env("PATH", &empty_path)
        .output()
        .expect("failed to run ndl");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Couldn't find a tool needed by our query plan"));
    assert!(stderr.contains("Perhaps you need to install 'find'"));
}

#[test]
fn explain_prints_plan_without_running() {
    let temp = tempdir().expect("failed to create tempdir");

    let output = ndl(temp.path(), &["--explain", "-l", "go,rust", "foo"]);

    assert!(output.status.success(), "{output:?}");
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["plan"], "generic");
    assert_eq!(json["stages"][1]["role"], "filter");
    assert_eq!(json["stages"][1]["args"][4], r"\.(go|rs)$");
    assert_eq!(json["stages"][2]["program"], "xargs");
    assert_eq!(json["stages"][3]["role"], "renderer");
    assert!(output.stderr.is_empty());
}

#[test]
fn unknown_language_is_a_usage_error() {
    let temp = tempdir().expect("failed to create tempdir");

    let output = ndl(temp.path(), &["-l", "cobol", "foo"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown language 'cobol'"));
}

#[test]
fn renderer_mode_groups_stdin_lines() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_ndl"))
        .args(["--reformat-grep-output", "foo"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to run ndl");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"./x.go\x003:foo()\n./x.go\x007:foo(1)\n")
        .unwrap();

    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "x.go\n3: foo()\n7: foo(1)\n"
    );
}

#[test]
fn needle_starting_with_dashes_reaches_renderer() {
    if has_native_indexer() {
        return;
    }
    let temp = tempdir().expect("failed to create tempdir");
    fs::write(temp.path().join("a.txt"), "use --force here\n").unwrap();

    let output = ndl(temp.path(), &["--", "--force"]);

    assert!(output.status.success(), "{output:?}");
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "a.txt\n1: use --force here\n"
    );
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("--reformat-grep-output --force")
    );
}

#[test]
fn no_header_keeps_stderr_silent() {
    if has_native_indexer() {
        return;
    }
    let temp = tempdir().expect("failed to create tempdir");
    fs::write(temp.path().join("a.txt"), "bar\n").unwrap();

    let output = ndl(temp.path(), &["--no-header", "foo"]);

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    assert!(output.stdout.is_empty());
    assert!(output.stderr.is_empty(), "{output:?}");
}

#[test]
fn git_grep_without_matches_exits_two() {
    if has_native_indexer() || which::which("git").is_err() {
        return;
    }
    let temp = tempdir().expect("failed to create tempdir");
    let init = Command::new("git")
        .args(["init", "-q"])
        .current_dir(temp.path())
        .status()
        .expect("failed to run git init");
    assert!(init.success());
    fs::write(temp.path().join("notes.txt"), "nothing relevant\n").unwrap();

    let output = ndl(temp.path(), &["absent-needle"]);

    assert_eq!(output.status.code(), Some(2), "{output:?}");
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("pipeline failed"));
    assert!(stderr.contains("'git' exited with status 1"));
}

#[test]
fn non_executable_renderer_exits_two_without_install_hint() {
    let temp = tempdir().expect("failed to create tempdir");
    fs::write(temp.path().join("renderer.txt"), "not a program\n").unwrap();
    fs::write(temp.path().join("a.txt"), "foo\n").unwrap();

    let output = ndl(temp.path(), &["--renderer", "renderer.txt", "foo"]);

    assert_eq!(output.status.code(), Some(2), "{output:?}");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to start"));
    assert!(stderr.contains("renderer.txt"));
    assert!(!stderr.contains("Perhaps you need to install"));
}
