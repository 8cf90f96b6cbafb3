//! Post-run reconciliation and summary. Reconciliation forces the machine
//! to pull enforced policy again; failure is WARN-only since domain or MDM
//! re-enforcement is expected, not an error. The summary is always emitted.

use crate::domain::models::{RunContext, RunSummary};
use crate::services::ops::Ops;

/// Standing caveats repeated at the end of every run.
pub const CAVEATS: [&str; 3] = [
    "Removing enforcement records does not restore settings to default values",
    "Settings of users who were not logged in were not touched",
    "Domain- or MDM-managed devices may have all policies reapplied on the next management cycle",
];

pub fn reconcile(ctx: &mut RunContext, ops: &mut Ops) {
    if ctx.skip_reconcile {
        ctx.log.info("Policy reconciliation skipped by request");
        return;
    }
    match ops.run_tool(ctx, "gpupdate", &["/force"]) {
        Ok(out) if out.code == 0 => {
            ctx.log.success("Policy refresh completed");
        }
        Ok(out) => {
            ctx.log.warn(format!(
                "gpupdate /force exited with code {}; policies may still be domain-enforced",
                out.code
            ));
        }
        Err(e) => {
            ctx.log.warn(format!("Could not invoke gpupdate: {e}"));
        }
    }
}

pub fn summarize(ctx: &RunContext) -> RunSummary {
    RunSummary {
        backup_root: ctx.backup_root.display().to_string(),
        dry_run: ctx.dry_run,
        failed_targets: ctx.failed_targets.iter().cloned().collect(),
        backups: ctx.backups.clone(),
        caveats: CAVEATS.iter().map(|c| c.to_string()).collect(),
    }
}

/// Print the summary block through the run log and persist it under the
/// backup root. The write goes through the gated facade, so a dry-run logs
/// it without touching the disk (the backup root was never made).
pub fn emit(ctx: &mut RunContext, ops: &mut Ops, summary: &RunSummary) {
    ctx.log.info("==== Run summary ====");
    ctx.log
        .info(format!("Backups stored under {}", summary.backup_root));
    if summary.failed_targets.is_empty() {
        ctx.log.success("All present targets were removed");
    } else {
        ctx.log.warn(format!(
            "{} target(s) could not be removed:",
            summary.failed_targets.len()
        ));
        for name in &summary.failed_targets {
            ctx.log.warn(format!("  - {name}"));
        }
    }
    for caveat in &summary.caveats {
        ctx.log.info(format!("Note: {caveat}"));
    }

    let path = ctx.backup_root.join("summary.json");
    match serde_json::to_string_pretty(summary) {
        Ok(body) => {
            if let Err(e) = ops.write_file(ctx, &path, &body) {
                ctx.log
                    .warn(format!("Could not write {}: {e}", path.display()));
            }
        }
        Err(e) => ctx.log.warn(format!("Could not serialize summary: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ops::SystemTools;
    use crate::services::registry::MemRegistry;
    use std::path::PathBuf;

    #[test]
    fn dry_run_emit_logs_but_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let mut reg = MemRegistry::new();
        let mut tools = SystemTools;
        let mut ctx = RunContext::new(tmp.path().to_path_buf(), true, false, false, false);
        let mut ops = Ops::new(&mut reg, &mut tools);

        let summary = summarize(&ctx);
        emit(&mut ctx, &mut ops, &summary);
        assert!(!tmp.path().join("summary.json").exists());
    }

    #[test]
    fn summary_collects_failures_and_caveats() {
        let mut ctx = RunContext::new(PathBuf::from("backups"), false, false, false, false);
        ctx.failed_targets.insert("MDM enrollments".to_string());

        let summary = summarize(&ctx);
        assert_eq!(summary.failed_targets, vec!["MDM enrollments"]);
        assert_eq!(summary.caveats.len(), CAVEATS.len());
        assert!(!summary.dry_run);
    }
}
