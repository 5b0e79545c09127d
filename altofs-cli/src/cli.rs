use std::path::PathBuf;

use clap::Parser;

/// Inspect, validate, and extract files from Xerox Alto disk images.
#[derive(Parser)]
#[command(name = "altofs", version, about)]
pub struct Cli {
    /// Path to the disk image.
    pub image: PathBuf,

    /// Print a one-line summary of the image and exit.
    #[arg(short = 's', long)]
    pub summary: bool,

    /// Extract a file by path (e.g. `<Docs>Memo.txt`) to the given host path.
    #[arg(short = 'e', long, value_name = "ALTO_PATH")]
    pub extract: Option<String>,

    /// Destination for `--extract`; defaults to the final path component.
    #[arg(short = 'o', long, value_name = "HOST_PATH")]
    pub output: Option<PathBuf>,

    /// Disk geometry override as `cylinders,heads,sectors`.
    #[arg(short = 'g', long, value_name = "C,H,S")]
    pub geometry: Option<String>,

    /// Increase log verbosity; repeat for more (-v, -vv).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
