use crate::domain::catalog;
use crate::domain::models::PolicyTarget;
use crate::services::engine::{self, EngineConfig};
use crate::services::ops::SystemTools;
use crate::services::output::{print_one, print_out};
use crate::services::registry::RegExe;
use crate::services::unenroll;
use std::path::PathBuf;

fn default_backup_parent() -> PathBuf {
    match std::env::var("ProgramData") {
        Ok(pd) => PathBuf::from(pd).join("depol").join("backups"),
        Err(_) => std::env::temp_dir().join("depol-backups"),
    }
}

pub fn handle_run(
    json: bool,
    dry_run: bool,
    unenroll: bool,
    skip_reconcile: bool,
    backup_root: Option<PathBuf>,
) -> anyhow::Result<()> {
    let cfg = EngineConfig {
        dry_run,
        skip_reconcile,
        unenroll,
        backup_parent: backup_root.unwrap_or_else(default_backup_parent),
        settle: unenroll::DEFAULT_SETTLE,
        echo_log: !json,
    };

    let mut registry = RegExe;
    let mut tools = SystemTools;
    let summary = engine::run(&cfg, &mut registry, &mut tools)?;

    if json {
        print_one(true, summary, |_| String::new())?;
    }
    Ok(())
}

pub fn handle_catalog(json: bool) -> anyhow::Result<()> {
    let targets: Vec<PolicyTarget> = catalog::static_scopes()
        .into_iter()
        .flat_map(|plan| plan.targets)
        .collect();
    print_out(json, &targets, |t| {
        format!(
            "{}\t{:?}\t{}\t{}",
            t.scope.label(),
            t.kind,
            t.display_name,
            t.locator
        )
    })
}
