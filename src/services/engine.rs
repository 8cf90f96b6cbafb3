//! One run of the policy removal engine: unenrollment (optional), then the
//! removal scopes in their fixed order, then reconciliation and summary.
//! Strictly sequential; an abort is scope-local and never rolls back work
//! already done.

use crate::domain::catalog::{self, ScopePlan};
use crate::domain::models::{RunContext, RunSummary};
use crate::services::ops::{Ops, ToolRunner};
use crate::services::registry::Registry;
use crate::services::{executor, profiles, reconcile, unenroll};
use chrono::Local;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("could not create backup root {path}: {source}")]
    BackupRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct EngineConfig {
    pub dry_run: bool,
    pub skip_reconcile: bool,
    pub unenroll: bool,
    /// Parent directory for the run's timestamped backup folder.
    pub backup_parent: PathBuf,
    pub settle: Duration,
    /// Echo operator log lines to stdout (off for JSON output).
    pub echo_log: bool,
}

pub fn run(
    cfg: &EngineConfig,
    registry: &mut dyn Registry,
    tools: &mut dyn ToolRunner,
) -> Result<RunSummary, EngineError> {
    let backup_root = cfg.backup_parent.join(format!(
        "policy-backup-{}",
        Local::now().format("%Y%m%d-%H%M%S")
    ));
    let mut ctx = RunContext::new(
        backup_root,
        cfg.dry_run,
        cfg.skip_reconcile,
        cfg.unenroll,
        cfg.echo_log,
    );
    let mut ops = Ops::new(registry, tools);

    ctx.log.info("Policy removal starting");
    if ctx.dry_run {
        ctx.log.info("DRY RUN - no changes will be made");
    }

    // Nothing proceeds without a place to put backups.
    let backup_root = ctx.backup_root.clone();
    if let Err(source) = ops.create_dir_all(&mut ctx, &backup_root) {
        return Err(EngineError::BackupRoot {
            path: backup_root,
            source,
        });
    }

    if ctx.unenroll {
        unenroll::run(&mut ctx, &mut ops, cfg.settle);
    }

    run_scope(&mut ctx, &mut ops, catalog::gpo_filesystem());
    run_scope(&mut ctx, &mut ops, catalog::mdm_filesystem());
    run_scope(&mut ctx, &mut ops, catalog::gpo_machine_registry());
    let mdm_plan = mdm_registry_plan(&mut ctx, &ops);
    run_scope(&mut ctx, &mut ops, mdm_plan);
    run_scope(&mut ctx, &mut ops, catalog::gpo_history());

    let users = profiles::enumerate(&mut ctx, &*ops.registry);
    for user in users {
        run_scope(&mut ctx, &mut ops, catalog::user_registry(&user.sid));
    }

    reconcile::reconcile(&mut ctx, &mut ops);

    let summary = reconcile::summarize(&ctx);
    reconcile::emit(&mut ctx, &mut ops, &summary);
    Ok(summary)
}

/// The MDM registry scope gets its static targets plus the per-enrollment
/// subkeys discovered at run time. When unenrollment was requested the
/// per-enrollment subkeys are skipped and left to the platform leave.
fn mdm_registry_plan(ctx: &mut RunContext, ops: &Ops) -> ScopePlan {
    let mut plan = catalog::mdm_registry();
    if ctx.unenroll {
        ctx.log.warn(
            "Per-enrollment subkeys left to platform unenrollment; stale subkeys may remain if the leave failed silently",
        );
        return plan;
    }
    // The subkeys go first: each one must be backed up individually before
    // the static targets take out the enrollment store as a whole.
    let mut targets = Vec::new();
    for enrollment in unenroll::enumerate_enrollments(ctx, ops) {
        targets.extend(catalog::per_enrollment_targets(&enrollment.enrollment_id));
    }
    targets.append(&mut plan.targets);
    plan.targets = targets;
    plan
}

fn run_scope(ctx: &mut RunContext, ops: &mut Ops, plan: ScopePlan) {
    ctx.log
        .info(format!("Processing scope: {}", plan.scope.label()));
    for target in &plan.targets {
        if !executor::remove(target, ctx, ops) {
            ctx.log.error(format!(
                "Aborting remaining targets in scope {}",
                plan.scope.label()
            ));
            break;
        }
    }
}
