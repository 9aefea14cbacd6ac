use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use commitguard::config::GuardConfig;
use commitguard::session::{run_guard, Disposition};

#[derive(Parser, Debug)]
#[command(
    name = "commitguard",
    about = "Inspects the staged change set and fixes suspicious lines before the commit proceeds",
    version
)]
struct Args {
    /// Path to the repository (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Report issues without writing any fixes
    #[arg(short, long)]
    check: bool,

    /// Answer every confirmation deterministically (accept|reject); overrides
    /// AI_SIMULATE_RESPONSE
    #[arg(long, value_name = "ANSWER")]
    simulate: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let path = args.path.canonicalize()?;

    let mut config = GuardConfig::from_env();
    if let Some(answer) = args.simulate.as_deref() {
        match answer {
            "accept" | "yes" | "y" => config.simulate_response = Some(true),
            "reject" | "no" | "n" => config.simulate_response = Some(false),
            other => {
                eprintln!("  Warning: unknown --simulate value '{}'; ignoring", other);
            }
        }
    }

    eprintln!("🔍 Checking staged changes...");

    match run_guard(&path, &config, args.check)? {
        Disposition::Proceed => Ok(()),
        Disposition::Blocked => std::process::exit(1),
    }
}
