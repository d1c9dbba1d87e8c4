//! taskctl — thin CLI wrapper around `perform_task`.
//!
//! Usage:
//!   taskctl "Print 'hi' by running `echo hi` in the sandbox."
//!   echo "some instruction" | taskctl
//!
//! Contains no orchestration logic of its own: it resolves configuration
//! from the environment, installs the logging subscriber, calls
//! `perform_task`, and prints the result.

use std::io::Read;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "taskctl",
    about = "Hierarchical multi-agent controller for terminal-based engineering tasks",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Task instruction. Read from stdin if omitted.
    instruction: Option<String>,

    /// Directory Explorer subagents may write scratch scripts under.
    #[arg(long, default_value = "/tmp")]
    temp_root: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let instruction = match cli.instruction {
        Some(instruction) => instruction,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf.trim().to_string()
        }
    };
    if instruction.is_empty() {
        anyhow::bail!("no instruction given (pass an argument or pipe one via stdin)");
    }

    let config = taskctl::resolve_config()?;
    let outcome = taskctl::perform_task(&instruction, config, &cli.temp_root).await;

    println!("{}", outcome.final_message);
    println!(
        "turns={} explorers={} coders={} tokens_in={} tokens_out={} completed={} failed={} unverified_finish={}",
        outcome.stats.total_turns,
        outcome.stats.explorer_count,
        outcome.stats.coder_count,
        outcome.stats.tokens_in,
        outcome.stats.tokens_out,
        outcome.stats.tasks_completed,
        outcome.stats.tasks_failed,
        outcome.stats.unverified_finish,
    );

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new("taskctl=info"))
                .unwrap(),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
