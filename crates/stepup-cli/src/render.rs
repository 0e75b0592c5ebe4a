use std::time::Duration;

use anstyle::{AnsiColor, Effects, Style};
use indicatif::{ProgressBar, ProgressStyle};
use stepup_core::{RepositoryMode, UpdatePlan};
use stepup_updater::{
    ExecutorState, PlanReport, RollbackResult, UpdateError, UpdateEvent, UpdateOutcome,
    UpdateReporter,
};

const COMMIT_PREFIX_LEN: usize = 12;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn resolve_output_style(
    force_plain: bool,
    stdout_is_terminal: bool,
    no_color: bool,
) -> OutputStyle {
    if force_plain || no_color || !stdout_is_terminal {
        OutputStyle::Plain
    } else {
        OutputStyle::Rich
    }
}

/// Prints update progress for an operator. Rich mode adds status badges, section
/// headers and a progress bar over the planned steps.
pub(crate) struct TerminalRenderer {
    style: OutputStyle,
    mode: Option<RepositoryMode>,
    progress_bar: Option<ProgressBar>,
}

impl TerminalRenderer {
    pub(crate) fn new(style: OutputStyle) -> Self {
        Self {
            style,
            mode: None,
            progress_bar: None,
        }
    }

    pub(crate) fn print_status(&self, status: &str, message: &str) {
        self.emit(render_status_line(self.style, status, message));
    }

    pub(crate) fn print_section(&self, title: &str) {
        if let Some(line) = render_section_header(self.style, title) {
            self.emit(String::new());
            self.emit(colorize(section_style(), &line));
        }
    }

    pub(crate) fn print_lines(&self, lines: &[String]) {
        for line in lines {
            self.emit(line.clone());
        }
    }

    pub(crate) fn finish(&mut self) {
        if let Some(progress_bar) = self.progress_bar.take() {
            progress_bar.finish_and_clear();
        }
    }

    fn start_progress(&mut self, total: u64) {
        if self.style != OutputStyle::Rich || total == 0 {
            return;
        }
        let progress_bar = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.cyan.bold} {msg:<12} [{bar:20.cyan/blue}] {pos:>3}/{len:3} {elapsed_precise}",
        ) {
            progress_bar.set_style(style.tick_chars("<^>v ").progress_chars("=>-"));
        }
        progress_bar.set_message("update");
        progress_bar.enable_steady_tick(Duration::from_millis(80));
        self.progress_bar = Some(progress_bar);
    }

    fn emit(&self, line: String) {
        match &self.progress_bar {
            Some(progress_bar) => progress_bar.println(line),
            None => println!("{line}"),
        }
    }
}

impl UpdateReporter for TerminalRenderer {
    fn report(&mut self, event: &UpdateEvent) {
        match event {
            UpdateEvent::ModeDetected(mode) => {
                self.mode = Some(*mode);
                self.print_status("step", &format!("repository mode: {mode}"));
            }
            UpdateEvent::PlanResolved { current, plan } => {
                let report = PlanReport {
                    current: current.clone(),
                    mode: self.mode.unwrap_or(RepositoryMode::Clone),
                    latest: plan.latest().clone(),
                    steps: plan.steps().to_vec(),
                };
                self.print_lines(&format_plan_lines(&report, self.style));
                if let UpdatePlan::Upgrade { steps, .. } = plan {
                    self.start_progress(steps.len() as u64);
                }
            }
            UpdateEvent::StateChanged(state) => self.report_state(state),
            UpdateEvent::SubmoduleUpdateFailed { detail } => {
                self.print_status(
                    "warn",
                    &format!("submodule update failed, continuing: {detail}"),
                );
            }
            UpdateEvent::ScriptOutput { line, .. } => self.emit(format!("    {line}")),
            UpdateEvent::AdditionalUpdate { version } => {
                self.print_status("step", &format!("running additional update for {version}"));
            }
            UpdateEvent::RollingBack { version, commit } => {
                self.print_status(
                    "warn",
                    &format!("rolling back to {} after {version} failed", short_commit(commit)),
                );
            }
        }
    }
}

impl TerminalRenderer {
    fn report_state(&mut self, state: &ExecutorState) {
        match state {
            ExecutorState::FetchingLatest => {
                self.print_status("step", "fetching the latest mainline");
            }
            ExecutorState::ApplyingStep { version, .. } => {
                if let Some(progress_bar) = &self.progress_bar {
                    progress_bar.set_message(version.to_string());
                }
                self.print_status("step", &format!("migrating to {version}"));
            }
            ExecutorState::Checkpointed { index, version } => {
                if let Some(progress_bar) = &self.progress_bar {
                    progress_bar.set_position(*index as u64 + 1);
                }
                self.print_status("ok", &format!("installed version is now {version}"));
            }
            ExecutorState::Aborting => {
                if let Some(progress_bar) = self.progress_bar.take() {
                    progress_bar.abandon();
                }
            }
            ExecutorState::RelaunchRequested => {
                self.print_status("warn", "the updater itself changed; relaunch required");
            }
            ExecutorState::Idle | ExecutorState::Done => {}
        }
    }
}

pub(crate) fn format_plan_lines(report: &PlanReport, style: OutputStyle) -> Vec<String> {
    let mut lines = vec![
        render_status_line(style, "step", &format!("installed version: {}", report.current)),
        render_status_line(style, "step", &format!("repository mode: {}", report.mode)),
    ];
    if report.steps.is_empty() {
        lines.push(render_status_line(
            style,
            "ok",
            &format!("already at the latest release {}", report.latest),
        ));
        return lines;
    }

    lines.push(render_status_line(
        style,
        "step",
        &format!("{} release(s) to apply:", report.steps.len()),
    ));
    for step in &report.steps {
        let line = match (&step.rollback_anchor, report.mode) {
            (Some(anchor), RepositoryMode::Clone) => {
                format!("  {} (rollback {})", step.target, short_commit(anchor))
            }
            (None, RepositoryMode::Clone) => {
                format!("  {} (rollback to pre-update head)", step.target)
            }
            (_, RepositoryMode::Fork) => format!("  {}", step.target),
        };
        lines.push(line);
    }
    lines
}

pub(crate) fn format_outcome_lines(outcome: &UpdateOutcome, style: OutputStyle) -> Vec<String> {
    match outcome {
        UpdateOutcome::AlreadyCurrent {
            version,
            additional_update_ran,
        } => {
            let mut lines = Vec::new();
            if *additional_update_ran {
                lines.push(render_status_line(
                    style,
                    "ok",
                    &format!("additional update for {version} completed"),
                ));
            }
            lines.push(render_status_line(
                style,
                "ok",
                &format!("already up to date at {version}"),
            ));
            lines
        }
        UpdateOutcome::Updated { from, to, applied } => vec![render_status_line(
            style,
            "ok",
            &format!(
                "successfully updated from {from} to {to} ({} step(s))",
                applied.len()
            ),
        )],
        UpdateOutcome::RelaunchRequested { updater } => vec![render_status_line(
            style,
            "warn",
            &format!(
                "{} was updated by the pull; run it again to continue",
                updater.display()
            ),
        )],
    }
}

pub(crate) fn format_error_lines(err: &UpdateError, style: OutputStyle) -> Vec<String> {
    let mut lines = Vec::new();
    match err {
        UpdateError::DirtyWorkingCopy { files } => {
            lines.push(render_status_line(
                style,
                "err",
                "local changes block the update; commit or stash them first:",
            ));
            lines.extend(files.iter().map(|file| format!("  {file}")));
        }
        UpdateError::StepFailed {
            checkpoint,
            rollback,
            ..
        } => {
            lines.push(render_status_line(style, "err", &err.to_string()));
            lines.push(render_status_line(
                style,
                rollback_status(rollback),
                &describe_rollback(rollback),
            ));
            lines.push(render_status_line(
                style,
                "step",
                &format!("installed version: {checkpoint}"),
            ));
        }
        other => lines.push(render_status_line(style, "err", &other.to_string())),
    }
    lines.push(render_status_line(style, "err", "not updated, aborting"));
    lines
}

fn rollback_status(rollback: &RollbackResult) -> &'static str {
    match rollback {
        RollbackResult::RolledBack { .. } => "ok",
        RollbackResult::Failed { .. } => "err",
        RollbackResult::NotAttempted => "warn",
    }
}

fn describe_rollback(rollback: &RollbackResult) -> String {
    match rollback {
        RollbackResult::RolledBack { commit } => {
            format!("working copy rolled back to {}", short_commit(commit))
        }
        RollbackResult::Failed {
            commit: Some(commit),
            detail,
        } => format!("rollback to {} failed: {detail}", short_commit(commit)),
        RollbackResult::Failed {
            commit: None,
            detail,
        } => format!("rollback failed: {detail}"),
        RollbackResult::NotAttempted => {
            "fork working copy left in place; repair it manually".to_string()
        }
    }
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("{} {message}", status_badge(status)),
    }
}

fn status_badge(status: &str) -> &'static str {
    match status {
        "ok" => "[OK]",
        "warn" => "[WARN]",
        "err" => "[ERR]",
        _ => "[..]",
    }
}

fn render_section_header(style: OutputStyle, title: &str) -> Option<String> {
    match style {
        OutputStyle::Plain => None,
        OutputStyle::Rich => Some(format!("== {title} ==")),
    }
}

fn short_commit(commit: &str) -> &str {
    commit.get(..COMMIT_PREFIX_LEN).unwrap_or(commit)
}

fn section_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightBlue.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
