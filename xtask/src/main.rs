use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for agentspace")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Run fmt, clippy, tests and doc in sequence
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all targets, warnings denied
    Clippy,
    /// Run all tests
    Test,
    /// Build rustdoc for the workspace
    Doc,
    /// Build the entire workspace
    Build,
    /// Run the hazard heat-map benchmark in release mode
    Bench,
}

impl Commands {
    fn cargo_args(self) -> &'static [&'static str] {
        match self {
            Self::Fmt => &["fmt", "--all", "--", "--check"],
            Self::Clippy => &[
                "clippy",
                "--workspace",
                "--all-targets",
                "--",
                "-D",
                "warnings",
            ],
            Self::Test => &["test", "--workspace"],
            Self::Doc => &["doc", "--workspace", "--no-deps"],
            Self::Build => &["build", "--workspace"],
            Self::Bench => &[
                "bench",
                "-p",
                "agentspace-kernel",
                "--bench",
                "bench_hazard_heatmap",
            ],
            Self::Check => &[],
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            for step in [
                Commands::Fmt,
                Commands::Clippy,
                Commands::Test,
                Commands::Doc,
            ] {
                run_cargo(step)?;
            }
        }
        step => run_cargo(step)?,
    }

    Ok(())
}

fn run_cargo(step: Commands) -> Result<()> {
    let args = step.cargo_args();
    println!("==> Running cargo {}", args.join(" "));
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("cargo {} failed", args[0]);
    }
    Ok(())
}
