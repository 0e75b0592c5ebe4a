use super::*;
use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use stepup_core::{RepositoryMode, UpdateStep, VersionTag};
use stepup_updater::{PlanReport, RollbackResult, UpdateError, UpdateOutcome};

#[test]
fn cli_defaults_to_run_without_subcommand() {
    let cli = Cli::try_parse_from(["stepup"]).expect("command must parse");
    assert!(cli.command.is_none());
    assert!(!cli.plain);
}

#[test]
fn cli_parses_manual_run_and_global_flags() {
    let cli = Cli::try_parse_from(["stepup", "run", "--manual", "--home", "/srv/app", "--plain"])
        .expect("command must parse");

    assert_eq!(cli.home, Some(PathBuf::from("/srv/app")));
    assert!(cli.plain);
    match cli.command {
        Some(Commands::Run { manual }) => assert!(manual),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn cli_parses_plan_json_and_completions() {
    let cli = Cli::try_parse_from(["stepup", "-v", "plan", "--json"]).expect("command must parse");
    assert!(cli.verbose);
    assert!(matches!(cli.command, Some(Commands::Plan { json: true })));

    let cli =
        Cli::try_parse_from(["stepup", "completions", "bash"]).expect("command must parse");
    assert!(matches!(
        cli.command,
        Some(Commands::Completions { shell: Shell::Bash })
    ));
}

#[test]
fn cli_rejects_unknown_shell() {
    let err = Cli::try_parse_from(["stepup", "completions", "cmd"])
        .expect_err("unknown shell must be rejected");
    assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
}

#[test]
fn completions_script_names_the_binary() {
    let mut generated = Vec::new();
    write_completions(Shell::Bash, &mut generated);
    let script = String::from_utf8(generated).expect("completion script must be UTF-8");
    assert!(script.contains("stepup"));
    assert!(script.contains("completions"));
}

#[test]
fn output_style_is_plain_unless_rich_terminal() {
    assert_eq!(resolve_output_style(false, true, false), OutputStyle::Rich);
    assert_eq!(resolve_output_style(true, true, false), OutputStyle::Plain);
    assert_eq!(resolve_output_style(false, false, false), OutputStyle::Plain);
    assert_eq!(resolve_output_style(false, true, true), OutputStyle::Plain);
}

#[test]
fn render_status_line_plain_is_unadorned() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "installed version is now v1.5"),
        "installed version is now v1.5"
    );
}

#[test]
fn render_status_line_rich_includes_ascii_badge() {
    assert_eq!(
        render_status_line(OutputStyle::Rich, "ok", "installed version is now v1.5"),
        "[OK] installed version is now v1.5"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "warn", "submodule update failed"),
        "[WARN] submodule update failed"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "step", "migrating to v1.6"),
        "[..] migrating to v1.6"
    );
}

#[test]
fn format_plan_lines_lists_clone_steps_with_rollback_commits() {
    let report = PlanReport {
        current: version("v1.4"),
        mode: RepositoryMode::Clone,
        latest: version("v1.6"),
        steps: vec![
            UpdateStep {
                target: version("v1.5"),
                rollback_anchor: Some("1111111111111111111111111111111111111111".to_string()),
            },
            UpdateStep {
                target: version("v1.6"),
                rollback_anchor: Some("2222222222222222222222222222222222222222".to_string()),
            },
        ],
    };

    assert_eq!(
        format_plan_lines(&report, OutputStyle::Plain),
        vec![
            "installed version: v1.4",
            "repository mode: clone",
            "2 release(s) to apply:",
            "  v1.5 (rollback 111111111111)",
            "  v1.6 (rollback 222222222222)",
        ]
    );
}

#[test]
fn format_plan_lines_omits_commits_for_forks_and_reports_current() {
    let fork = PlanReport {
        current: version("v1.4"),
        mode: RepositoryMode::Fork,
        latest: version("v1.5"),
        steps: vec![UpdateStep {
            target: version("v1.5"),
            rollback_anchor: None,
        }],
    };
    assert_eq!(
        format_plan_lines(&fork, OutputStyle::Plain).last().map(String::as_str),
        Some("  v1.5")
    );

    let current = PlanReport {
        current: version("v1.6"),
        mode: RepositoryMode::Clone,
        latest: version("v1.6"),
        steps: Vec::new(),
    };
    assert_eq!(
        format_plan_lines(&current, OutputStyle::Rich).last().map(String::as_str),
        Some("[OK] already at the latest release v1.6")
    );
}

#[test]
fn plan_report_serializes_for_json_output() {
    let report = PlanReport {
        current: version("v1.4"),
        mode: RepositoryMode::Clone,
        latest: version("v1.5"),
        steps: vec![UpdateStep {
            target: version("v1.5"),
            rollback_anchor: Some("abc1234".to_string()),
        }],
    };

    let value = serde_json::to_value(&report).expect("plan must serialize");
    assert_eq!(value["current"], "v1.4");
    assert_eq!(value["mode"], "clone");
    assert_eq!(value["steps"][0]["target"], "v1.5");
    assert_eq!(value["steps"][0]["rollback_anchor"], "abc1234");
}

#[test]
fn format_outcome_lines_report_success_banner() {
    let outcome = UpdateOutcome::Updated {
        from: version("v1.4"),
        to: version("v1.6"),
        applied: vec![version("v1.5"), version("v1.6")],
    };
    assert_eq!(
        format_outcome_lines(&outcome, OutputStyle::Rich),
        vec!["[OK] successfully updated from v1.4 to v1.6 (2 step(s))"]
    );

    let current = UpdateOutcome::AlreadyCurrent {
        version: version("v1.6"),
        additional_update_ran: true,
    };
    assert_eq!(format_outcome_lines(&current, OutputStyle::Plain).len(), 2);
}

#[test]
fn format_error_lines_list_blocking_files() {
    let err = UpdateError::DirtyWorkingCopy {
        files: vec!["app.txt".to_string(), "lib/core.py".to_string()],
    };
    assert_eq!(
        format_error_lines(&err, OutputStyle::Plain),
        vec![
            "local changes block the update; commit or stash them first:",
            "  app.txt",
            "  lib/core.py",
            "not updated, aborting",
        ]
    );
}

#[test]
fn format_error_lines_describe_rollback() {
    let err = UpdateError::StepFailed {
        version: version("v1.6"),
        mode: RepositoryMode::Clone,
        checkpoint: version("v1.5"),
        detail: "exited with status 1".to_string(),
        rollback: RollbackResult::RolledBack {
            commit: "2222222222222222222222222222222222222222".to_string(),
        },
    };
    let lines = format_error_lines(&err, OutputStyle::Rich);

    assert!(lines[0].starts_with("[ERR] step-failed: migration to v1.6 failed"));
    assert_eq!(lines[1], "[OK] working copy rolled back to 222222222222");
    assert_eq!(lines[2], "[..] installed version: v1.5");
    assert_eq!(lines[3], "[ERR] not updated, aborting");
}

#[test]
fn current_command_initialises_marker_in_home() {
    let root = test_root();
    fs::create_dir_all(&root).expect("must create home");
    let home = root.to_str().expect("utf-8 path");
    let cli = Cli::try_parse_from(["stepup", "--home", home, "current"])
        .expect("command must parse");

    let code = run_cli(cli, OutputStyle::Plain).expect("current must succeed");

    assert_eq!(code, 0);
    assert_eq!(
        fs::read_to_string(root.join("update").join("current_version"))
            .expect("marker must exist"),
        "v1.4"
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn run_command_exits_with_precondition_code_when_auto_update_is_off() {
    let root = test_root();
    fs::create_dir_all(root.join("configs")).expect("must create configs");
    let updater = root.join("stepup-bin");
    fs::write(&updater, "bin").expect("must write updater");
    fs::write(
        root.join("configs").join("update.toml"),
        format!("[update]\nauto_update = false\nupdater_path = \"{}\"\n", updater.display()),
    )
    .expect("must write config");

    let cli = Cli::try_parse_from(["stepup", "--home", root.to_str().expect("utf-8 path"), "run"])
        .expect("command must parse");
    let code = run_cli(cli, OutputStyle::Plain).expect("run must report through exit code");

    assert_eq!(code, 2);
    assert!(!root.join("update").join("current_version").exists());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn malformed_config_is_a_cli_error() {
    let root = test_root();
    fs::create_dir_all(root.join("configs")).expect("must create configs");
    fs::write(root.join("configs").join("update.toml"), "[update\n").expect("must write config");

    let cli = Cli::try_parse_from(["stepup", "--home", root.to_str().expect("utf-8 path"), "plan"])
        .expect("command must parse");
    let err = run_cli(cli, OutputStyle::Plain).expect_err("malformed config must fail");
    assert!(err.to_string().contains("config-invalid"));

    let _ = fs::remove_dir_all(&root);
}

fn version(value: &str) -> VersionTag {
    VersionTag::parse(value).expect("valid version")
}

static TEST_ROOT_COUNTER: AtomicU64 = AtomicU64::new(0);

fn test_root() -> PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let counter = TEST_ROOT_COUNTER.fetch_add(1, Ordering::SeqCst);
    path.push(format!(
        "stepup-cli-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        counter
    ));
    path
}
