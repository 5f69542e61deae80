use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use log::{debug, info};
use monodep_check::Config;
use std::io::{BufWriter, Write};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "monodep")]
#[command(about = "Dependency hygiene for JavaScript/TypeScript monorepos", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check declared dependencies against imports across the workspace
    Check(Config),
}

fn main() -> Result<()> {
    env_logger::init();

    // stdio is blocked by LineWriter, use a BufWriter to reduce syscalls.
    // See https://github.com/rust-lang/rust/issues/60673
    let mut stdout = BufWriter::new(std::io::stdout());

    let cli = Cli::parse();
    debug!("Parsed CLI arguments: {:?}", cli.command);

    let start = Instant::now();

    match cli.command {
        Commands::Check(cfg) => {
            let num_threads = rayon::current_num_threads();
            info!("Running dependency check (using {} threads)", num_threads);
            let json = cfg.json;

            let result = monodep_check::run_dependency_check(cfg)?;
            debug!("Found {} blocking issues", result.blocking_issue_count());

            if json {
                monodep_check::print_json(&mut stdout, &result)?;
            } else {
                monodep_check::print_report(&mut stdout, &result)?;
                if !result.has_blocking_issues() {
                    info!("No blocking issues");
                    monodep_check::print_no_issues_message(&mut stdout, &result)?;
                }

                let elapsed_ms = start.elapsed().as_millis();
                writeln!(
                    stdout,
                    "\n{} Finished in {}ms on {} files (using {} threads).",
                    "●".bright_blue(),
                    elapsed_ms.to_string().cyan(),
                    result.files_analyzed.to_string().cyan(),
                    num_threads.to_string().cyan()
                )?;
            }
            stdout.flush()?;

            if result.has_blocking_issues() {
                // Non-zero exit to fail CI
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
