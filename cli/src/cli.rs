use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[clap(name = "nem-sim", version)]
pub struct Cli {
    /// Path to the run's YAML configuration.
    #[clap(short, long)]
    pub config: PathBuf,

    /// Log elapsed wall-clock time per phase (construction / pre-roll / run) at info level.
    #[clap(short, long)]
    pub profile: bool,

    /// Accepted for parity with the original tool's `-o` flag; currently a no-op.
    #[clap(short = 'o', long)]
    pub optimise: bool,
}
