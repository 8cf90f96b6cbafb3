use clap::Parser;
use depol::cli::{Cli, Commands};
use depol::commands;
use depol::services::logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = logging::init();

    match cli.command {
        Commands::Run {
            dry_run,
            unenroll,
            skip_reconcile,
            backup_root,
        } => commands::handle_run(cli.json, dry_run, unenroll, skip_reconcile, backup_root),
        Commands::Catalog => commands::handle_catalog(cli.json),
    }
}
