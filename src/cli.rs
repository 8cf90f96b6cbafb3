use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "depol",
    version,
    about = "Remove locally-cached Group Policy and MDM enforcement state"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Back up and remove cached GPO and MDM policy state.
    Run {
        #[arg(long, help = "Preview every mutation without touching the system")]
        dry_run: bool,
        #[arg(long, help = "Trigger MDM unenrollment before removing policy state")]
        unenroll: bool,
        #[arg(long, help = "Do not force a policy refresh after removal")]
        skip_reconcile: bool,
        #[arg(long, help = "Directory to place the run's backup folder under")]
        backup_root: Option<PathBuf>,
    },
    /// List the removal targets per scope without touching anything.
    Catalog,
}
