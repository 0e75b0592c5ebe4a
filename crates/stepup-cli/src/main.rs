use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use stepup_core::{InstallLayout, UpdateConfig};
use stepup_updater::{Orchestrator, SelfUpdateGuard, UpdateRequest};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod render;

use render::{
    format_error_lines, format_outcome_lines, format_plan_lines, render_status_line,
    resolve_output_style, OutputStyle, TerminalRenderer,
};

/// Exit status for failures before any migration ran.
const EXIT_PRECONDITION: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "stepup")]
#[command(about = "Incremental release updater for git-managed installations", long_about = None)]
struct Cli {
    /// Installation home; defaults to the current directory.
    #[arg(long, global = true, env = "STEPUP_HOME")]
    home: Option<PathBuf>,
    #[arg(long, global = true)]
    plain: bool,
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Update to the newest release, one version at a time.
    Run {
        /// Run even when `auto_update` is disabled.
        #[arg(long)]
        manual: bool,
    },
    /// Show the releases a run would apply.
    Plan {
        #[arg(long)]
        json: bool,
    },
    /// Print the installed version.
    Current,
    Completions { shell: Shell },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let style = resolve_output_style(
        cli.plain,
        io::stdout().is_terminal(),
        std::env::var_os("NO_COLOR").is_some(),
    );
    match run_cli(cli, style) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("{}", render_status_line(style, "err", &format!("{err:#}")));
            ExitCode::from(EXIT_PRECONDITION)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("STEPUP_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run_cli(cli: Cli, style: OutputStyle) -> Result<u8> {
    let command = cli.command.unwrap_or(Commands::Run { manual: false });
    if let Commands::Completions { shell } = command {
        write_completions(shell, &mut io::stdout());
        return Ok(0);
    }

    let home = match cli.home {
        Some(home) => home,
        None => std::env::current_dir().context("failed to resolve current directory")?,
    };
    let layout = InstallLayout::new(home);
    debug!(home = %layout.home().display(), "resolved installation home");
    let config = UpdateConfig::load(&layout)?;
    let orchestrator = Orchestrator::new(layout, config);

    match command {
        Commands::Run { manual } => Ok(run_update(&orchestrator, manual, style)),
        Commands::Plan { json } => {
            let report = orchestrator.plan()?;
            if json {
                let rendered = serde_json::to_string_pretty(&report)
                    .context("failed to serialize update plan")?;
                println!("{rendered}");
            } else {
                for line in format_plan_lines(&report, style) {
                    println!("{line}");
                }
            }
            Ok(0)
        }
        Commands::Current => {
            println!("{}", orchestrator.current_version()?);
            Ok(0)
        }
        Commands::Completions { .. } => Ok(0),
    }
}

fn run_update(orchestrator: &Orchestrator, manual: bool, style: OutputStyle) -> u8 {
    let mut renderer = TerminalRenderer::new(style);
    renderer.print_section("update");
    renderer.print_status(
        "step",
        &format!("updating {}", orchestrator.layout().home().display()),
    );

    let guard = match orchestrator.updater_path() {
        Some(path) => SelfUpdateGuard::capture(path),
        None => {
            debug!("no updater_path configured; watching the running binary");
            SelfUpdateGuard::for_current_exe()
        }
    };
    let guard = match guard {
        Ok(guard) => guard,
        Err(err) => {
            renderer.print_status("err", &format!("{err:#}"));
            return EXIT_PRECONDITION;
        }
    };

    let result = orchestrator.run(UpdateRequest { manual }, &guard, &mut renderer);
    renderer.finish();
    match result {
        Ok(outcome) => {
            renderer.print_lines(&format_outcome_lines(&outcome, style));
            outcome.exit_code()
        }
        Err(err) => {
            renderer.print_lines(&format_error_lines(&err, style));
            err.exit_code()
        }
    }
}

fn write_completions(shell: Shell, writer: &mut dyn Write) {
    let mut command = Cli::command();
    clap_complete::generate(shell, &mut command, "stepup", writer);
}

#[cfg(test)]
mod tests;
