//! Integration tests for Trellis

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn trellis() -> Command {
        cargo_bin_cmd!("trellis")
    }

    /// A template tree with a page hierarchy and a matching config file
    fn project() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("templates/app");
        std::fs::create_dir_all(&app).unwrap();
        std::fs::write(
            app.join("Base.html"),
            "<html><body><p>base-top</p><wicket:child/></body></html>",
        )
        .unwrap();
        std::fs::write(
            app.join("Home.html"),
            "<html><body><wicket:extend><p>home-content</p></wicket:extend></body></html>",
        )
        .unwrap();
        std::fs::write(app.join("Plain.html"), "<span wicket:id=\"label\">x</span>").unwrap();

        let config = format!(
            r#"
[resources]
roots = ["{}"]

[[components]]
name = "app.Base"
kind = "page"

[[components]]
name = "app.Home"
extends = "app.Base"
kind = "page"

[[components]]
name = "app.Plain"
kind = "panel"
"#,
            dir.path().join("templates").display()
        );
        std::fs::write(dir.path().join("config.toml"), config).unwrap();
        dir
    }

    fn in_project(dir: &Path) -> Command {
        let mut cmd = trellis();
        cmd.current_dir(dir)
            .arg("--no-local")
            .arg("--config")
            .arg(dir.join("config.toml"));
        cmd
    }

    #[test]
    fn help_displays() {
        trellis()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("component markup"));
    }

    #[test]
    fn version_displays() {
        trellis()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("trellis"));
    }

    #[test]
    fn config_path() {
        trellis()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_uses_given_file() {
        let dir = project();
        in_project(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[markup]"))
            .stdout(predicate::str::contains("app.Home"));
    }

    #[test]
    fn config_set_rejects_bad_boolean() {
        let dir = project();
        in_project(dir.path())
            .args(["config", "set", "cache.watch", "maybe"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid boolean value"));
    }

    #[test]
    fn parse_plain_echoes_markup() {
        let dir = project();
        in_project(dir.path())
            .args(["parse", "templates/app/Plain.html", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("wicket:id=\"label\""));
    }

    #[test]
    fn parse_json_lists_components() {
        let dir = project();
        in_project(dir.path())
            .args(["parse", "templates/app/Plain.html", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"components\""))
            .stdout(predicate::str::contains("\"label\""));
    }

    #[test]
    fn parse_missing_file_fails() {
        let dir = project();
        in_project(dir.path())
            .args(["parse", "templates/app/Nope.html"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"));
    }

    #[test]
    fn parse_reports_unknown_wicket_tag() {
        let dir = project();
        std::fs::write(dir.path().join("bad.html"), "<wicket:nope>").unwrap();
        in_project(dir.path())
            .args(["parse", "bad.html"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"));
    }

    #[test]
    fn inspect_merges_inherited_markup() {
        let dir = project();
        in_project(dir.path())
            .args(["inspect", "app.Home", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("base-top"))
            .stdout(predicate::str::contains("home-content"));
    }

    #[test]
    fn inspect_missing_class_fails() {
        let dir = project();
        in_project(dir.path())
            .args(["inspect", "app.Missing"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Markup not found"));
    }

    #[test]
    fn cache_warm_lists_keys() {
        let dir = project();
        in_project(dir.path())
            .args(["cache", "warm", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("app.Home.html"))
            .stdout(predicate::str::contains("app.Base.html"))
            .stdout(predicate::str::contains("app.Plain.html"));
    }

    #[test]
    fn cache_stats_remove_cascades_to_derived() {
        let dir = project();
        in_project(dir.path())
            .args(["cache", "stats", "--remove", "app.Base.html", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("app.Plain.html"))
            .stdout(predicate::str::contains("app.Home.html").not());
    }

    #[test]
    fn watch_once_runs() {
        let dir = project();
        in_project(dir.path())
            .args(["watch", "--once", "app.Plain"])
            .assert()
            .success();
    }

    #[test]
    fn completions_bash() {
        trellis()
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("trellis"));
    }
}
