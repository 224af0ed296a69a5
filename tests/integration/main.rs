//! Integration tests for Plugup

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    /// Binary isolated from the user's config, cache and token
    fn plugup(dir: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("plugup");
        cmd.current_dir(dir)
            .env("PLUGUP_CONFIG", dir.join("config.toml"))
            .env("XDG_CACHE_HOME", dir.join("cache"))
            .env_remove("GITHUB_TOKEN");
        cmd
    }

    #[test]
    fn help_displays() {
        let dir = TempDir::new().unwrap();
        plugup(dir.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("editor plugin set updater"))
            .stdout(predicate::str::contains("--github-token"));
    }

    #[test]
    fn version_displays() {
        let dir = TempDir::new().unwrap();
        plugup(dir.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("plugup"));
    }

    #[test]
    fn add_requires_plugins() {
        let dir = TempDir::new().unwrap();
        plugup(dir.path()).arg("add").assert().failure();
    }

    #[test]
    fn invalid_proc_rejected() {
        let dir = TempDir::new().unwrap();
        plugup(dir.path())
            .args(["--proc", "many", "update"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid value"));
    }

    #[test]
    fn add_rejects_bad_spec() {
        let dir = TempDir::new().unwrap();
        plugup(dir.path())
            .args(["--no-commit", "add", " as foo"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid plugin spec"));
    }

    #[test]
    fn update_without_input_fails() {
        let dir = TempDir::new().unwrap();
        plugup(dir.path())
            .args(["--no-commit", "-p", "1", "update"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read plugin list"));
    }

    #[test]
    fn invalid_config_is_reported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[fetch]\nproc = \"all\"\n").unwrap();
        plugup(dir.path())
            .args(["--no-commit", "update"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn unmatched_names_update_nothing() {
        let dir = TempDir::new().unwrap();
        let names = dir.path().join("vim-plugin-names");
        std::fs::write(&names, "repo,branch,alias\nhttps://github.com/foo/bar/,HEAD,\n").unwrap();

        plugup(dir.path())
            .args(["--no-commit", "-p", "1", "update", "does-not-exist"])
            .assert()
            .success();

        assert!(!dir.path().join("generated.nix").exists());
        assert_eq!(
            std::fs::read_to_string(&names).unwrap(),
            "repo,branch,alias\nhttps://github.com/foo/bar/,HEAD,\n"
        );
    }

    #[test]
    fn config_selects_editor_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[editor]\nname = \"kakoune\"\nroot = \"plugins\"\n",
        )
        .unwrap();

        plugup(dir.path())
            .args(["--no-commit", "update"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("kakoune-plugin-names"));
    }
}
