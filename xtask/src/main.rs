//! Build automation tasks for the dbservice workspace.
//!
//! Run with `cargo xtask <command>`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use xshell::{Shell, cmd};

#[derive(Parser)]
#[command(name = "xtask", about = "Build automation for dbservice")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all checks (format, lint, test, smoke)
    Ci,
    /// Run cargo fmt --check
    Fmt,
    /// Run clippy with all features
    Clippy,
    /// Run tests, optionally for one package
    Test {
        /// Package to test (default: whole workspace)
        #[arg(short, long)]
        package: Option<String>,
    },
    /// Run the CLI's connectivity check against an in-memory database
    Smoke,
    /// Generate documentation
    Doc,
    /// Clean build artifacts
    Clean,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;

    // Change to workspace root
    let workspace_root = workspace_root()?;
    sh.change_dir(&workspace_root);

    match cli.command {
        Command::Ci => {
            println!("Running CI checks...");
            fmt(&sh)?;
            clippy(&sh)?;
            test(&sh, None)?;
            smoke(&sh)?;
            println!("All CI checks passed!");
        }
        Command::Fmt => fmt(&sh)?,
        Command::Clippy => clippy(&sh)?,
        Command::Test { package } => test(&sh, package.as_deref())?,
        Command::Smoke => smoke(&sh)?,
        Command::Doc => doc(&sh)?,
        Command::Clean => clean(&sh)?,
    }

    Ok(())
}

fn workspace_root() -> Result<PathBuf> {
    let output = std::process::Command::new("cargo")
        .args(["locate-project", "--workspace", "--message-format=plain"])
        .output()
        .context("failed to run cargo locate-project")?;

    let path = String::from_utf8(output.stdout)
        .context("invalid UTF-8 in cargo output")?
        .trim()
        .to_string();

    Ok(PathBuf::from(path)
        .parent()
        .context("failed to get workspace root")?
        .to_path_buf())
}

fn fmt(sh: &Shell) -> Result<()> {
    println!("Checking formatting...");
    cmd!(sh, "cargo fmt --all -- --check").run()?;
    println!("Formatting check passed.");
    Ok(())
}

fn clippy(sh: &Shell) -> Result<()> {
    println!("Running clippy...");
    cmd!(
        sh,
        "cargo clippy --workspace --all-features --all-targets -- -D warnings"
    )
    .run()?;
    println!("Clippy check passed.");
    Ok(())
}

fn test(sh: &Shell, package: Option<&str>) -> Result<()> {
    match package {
        Some(package) => {
            println!("Running tests for {package}...");
            cmd!(sh, "cargo test --all-features -p {package}").run()?;
        }
        None => {
            println!("Running tests...");
            cmd!(sh, "cargo test --workspace --all-features").run()?;
        }
    }
    println!("All tests passed.");
    Ok(())
}

fn smoke(sh: &Shell) -> Result<()> {
    println!("Running CLI smoke check...");
    cmd!(
        sh,
        "cargo run --quiet -p dbservice-cli -- --database :memory: check"
    )
    .env("RUST_LOG", "dbservice=info")
    .run()?;
    println!("Smoke check passed.");
    Ok(())
}

fn doc(sh: &Shell) -> Result<()> {
    println!("Generating documentation...");
    cmd!(sh, "cargo doc --workspace --all-features --no-deps").run()?;
    println!("Documentation generated.");
    Ok(())
}

fn clean(sh: &Shell) -> Result<()> {
    println!("Cleaning build artifacts...");
    cmd!(sh, "cargo clean").run()?;
    println!("Clean complete.");
    Ok(())
}
