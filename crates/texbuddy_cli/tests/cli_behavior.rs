//! Integration tests for CLI behavior
//!
//! External tools are disabled so the results only depend on the in-process
//! checkers.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use predicates::prelude::*;

fn texbuddy_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_texbuddy"));
    cmd.current_dir(dir.path());
    cmd
}

fn check_cmd(dir: &TempDir) -> Command {
    let mut cmd = texbuddy_cmd(dir);
    cmd.args(["check", "--disable-modules", "Aspell,Chktex"]);
    cmd
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn json_problems(stdout: &[u8]) -> Vec<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_slice(stdout).expect("stdout is JSON");
    value.as_array().cloned().expect("top level is an array")
}

mod help_command {
    use super::*;

    #[test]
    fn shows_help_with_flag() {
        let dir = TempDir::new().unwrap();
        texbuddy_cmd(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Usage:"));
    }

    #[test]
    fn shows_version_with_flag() {
        let dir = TempDir::new().unwrap();
        texbuddy_cmd(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }
}

mod check_command {
    use super::*;

    #[test]
    fn clean_document_exits_zero() {
        let dir = TempDir::new().unwrap();
        check_cmd(&dir)
            .arg(fixture("clean.tex"))
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "Checked 1 files, found 0 problems (0 errors)",
            ));
    }

    #[test]
    fn parse_error_exits_one() {
        let dir = TempDir::new().unwrap();
        check_cmd(&dir)
            .arg(fixture("broken.tex"))
            .assert()
            .code(1)
            .stdout(predicate::str::contains("[Detex/detex]"));
    }

    #[test]
    fn json_output_lists_problems_with_keys() {
        let dir = TempDir::new().unwrap();
        let output = check_cmd(&dir)
            .args(["--format", "json"])
            .arg(fixture("broken.tex"))
            .output()
            .unwrap();

        assert_eq!(output.status.code(), Some(1));
        let problems = json_problems(&output.stdout);
        assert!(!problems.is_empty());
        assert_eq!(problems[0]["checker"], "Detex");
        assert_eq!(problems[0]["category"], "parse");
        assert_eq!(problems[0]["severity"], "error");
        assert!(problems[0]["key"].is_string());
    }

    #[test]
    fn included_files_are_checked() {
        let dir = TempDir::new().unwrap();
        let output = check_cmd(&dir)
            .args(["--format", "json"])
            .arg(fixture("main.tex"))
            .output()
            .unwrap();

        assert!(output.status.success());
        let problems = json_problems(&output.stdout);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0]["checker"], "UrlCheck");
        assert!(
            problems[0]["file"]
                .as_str()
                .unwrap()
                .ends_with("chapter.tex")
        );
    }

    #[test]
    fn writes_result_file_per_document() {
        let dir = TempDir::new().unwrap();
        check_cmd(&dir)
            .args(["--output", "results"])
            .arg(fixture("clean.tex"))
            .assert()
            .success();

        dir.child("results/clean.result.json")
            .assert(predicate::str::contains("[]"));
    }

    #[test]
    fn result_files_with_same_stem_do_not_overwrite() {
        let dir = TempDir::new().unwrap();
        dir.child("a/main.tex")
            .write_str("See https://example.org today.\n")
            .unwrap();
        dir.child("b/main.tex").write_str("Nothing to see.\n").unwrap();

        check_cmd(&dir)
            .args(["--output", "results", "a/main.tex", "b/main.tex"])
            .assert()
            .success();

        dir.child("results/main.result.json")
            .assert(predicate::str::contains("UrlCheck"));
        dir.child("results/main-2.result.json")
            .assert(predicate::str::diff("[]"));
    }

    #[test]
    fn output_path_that_is_a_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        dir.child("results").write_str("not a directory").unwrap();

        check_cmd(&dir)
            .args(["--output", "results"])
            .arg(fixture("clean.tex"))
            .assert()
            .code(2)
            .stderr(predicate::str::contains("not a directory"));
    }

    #[test]
    fn missing_document_is_fatal() {
        let dir = TempDir::new().unwrap();
        check_cmd(&dir)
            .arg("missing.tex")
            .assert()
            .code(2)
            .stderr(predicate::str::contains("File not found"));
    }

    #[test]
    fn invalid_config_is_fatal() {
        let dir = TempDir::new().unwrap();
        dir.child(".texbuddy.json")
            .write_str(r#"{ "unknownOption": true }"#)
            .unwrap();

        check_cmd(&dir)
            .arg(fixture("clean.tex"))
            .assert()
            .code(2);
    }

    #[test]
    fn enable_and_disable_modules_conflict() {
        let dir = TempDir::new().unwrap();
        texbuddy_cmd(&dir)
            .args([
                "check",
                "--enable-modules",
                "Detex",
                "--disable-modules",
                "Chktex",
            ])
            .arg(fixture("clean.tex"))
            .assert()
            .code(2);
    }

    #[test]
    fn config_can_disable_modules() {
        let dir = TempDir::new().unwrap();
        dir.child(".texbuddy.jsonc")
            .write_str(
                r#"{
                    // only the style checks
                    "modules": { "Detex": false, "Aspell": false, "Chktex": false }
                }"#,
            )
            .unwrap();

        texbuddy_cmd(&dir)
            .arg("check")
            .arg(fixture("broken.tex"))
            .assert()
            .success();
    }
}

mod whitelist_command {
    use super::*;

    #[test]
    fn add_is_idempotent() {
        let dir = TempDir::new().unwrap();
        for _ in 0..2 {
            texbuddy_cmd(&dir)
                .args(["whitelist", "add", "en/spelling/Dongbei"])
                .assert()
                .success();
        }

        dir.child("whitelist")
            .assert(predicate::str::diff("en/spelling/Dongbei\n"));
    }

    #[test]
    fn from_wordlist_adds_spelling_keys() {
        let dir = TempDir::new().unwrap();
        dir.child("words.txt").write_str("Dongbei\n\nHarbin\n").unwrap();

        texbuddy_cmd(&dir)
            .args(["whitelist", "from-wordlist", "words.txt", "en"])
            .assert()
            .success();

        dir.child("whitelist").assert(
            predicate::str::contains("en/spelling/Dongbei")
                .and(predicate::str::contains("en/spelling/Harbin")),
        );
    }

    #[test]
    fn whitelisted_key_is_hidden_on_next_check() {
        let dir = TempDir::new().unwrap();
        let document = dir.child("paper.tex");
        document.write_str("See https://example.org today.\n").unwrap();

        let output = check_cmd(&dir)
            .args(["--format", "json"])
            .arg(document.path())
            .output()
            .unwrap();
        let problems = json_problems(&output.stdout);
        assert_eq!(problems.len(), 1);
        let key = problems[0]["key"].as_str().unwrap().to_string();
        assert_eq!(key, "UrlCheck/bare-url/https://example.org");

        texbuddy_cmd(&dir)
            .args(["whitelist", "add", &key])
            .assert()
            .success();

        let output = check_cmd(&dir)
            .args(["--format", "json"])
            .arg(document.path())
            .output()
            .unwrap();
        assert!(json_problems(&output.stdout).is_empty());
    }

    #[test]
    fn whitelist_flag_overrides_location() {
        let dir = TempDir::new().unwrap();
        texbuddy_cmd(&dir)
            .args(["--whitelist", "custom.txt", "whitelist", "add", "a/b/c"])
            .assert()
            .success();

        dir.child("custom.txt").assert(predicate::str::contains("a/b/c"));
        dir.child("whitelist").assert(predicate::path::missing());
    }
}
