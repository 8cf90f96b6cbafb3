//! Removal executor: backup-then-remove for a single target, honoring the
//! per-scope abort policy.
//!
//! Returns `true` when the owning scope may continue and `false` when the
//! caller should abort the scope's remaining work. Only a backup failure on
//! a critical target aborts; a deletion failure never does — it is logged,
//! recorded for the summary and processing moves on.

use crate::domain::models::{PolicyTarget, RunContext, TargetKind};
use crate::services::{backup, ops::Ops};
use std::path::Path;

pub fn remove(target: &PolicyTarget, ctx: &mut RunContext, ops: &mut Ops) -> bool {
    match exists(target, ops) {
        Ok(false) => {
            ctx.log.info(format!(
                "{} does not exist, skipping",
                target.display_name
            ));
            return true;
        }
        Ok(true) => {}
        Err(detail) => {
            ctx.log.warn(format!(
                "Could not query {}: {detail}; skipping",
                target.display_name
            ));
            return true;
        }
    }

    let record = backup::backup(target, ctx, ops);
    let backed_up = record.succeeded;
    let error_detail = record.error_detail.clone();
    ctx.backups.push(record);

    if !backed_up {
        let detail = error_detail.unwrap_or_default();
        if target.abort_on_backup_failure {
            ctx.log.error(format!(
                "Backup of {} failed ({detail}); refusing to remove without a restorable backup",
                target.display_name
            ));
            return false;
        }
        ctx.log.warn(format!(
            "Backup of {} failed ({detail}); continuing anyway",
            target.display_name
        ));
    }

    if ctx.dry_run {
        ctx.log
            .info(format!("Would remove {}", target.display_name));
        recreate_if_needed(target, ctx, ops);
        return true;
    }

    let deleted = match target.kind {
        TargetKind::FsTree => ops
            .remove_tree(ctx, Path::new(&target.locator))
            .map_err(|e| e.to_string()),
        TargetKind::RegKey => ops
            .delete_key_tree(ctx, &target.locator)
            .map_err(|e| e.to_string()),
    };

    match deleted {
        Ok(()) => {
            ctx.log.success(format!("Removed {}", target.display_name));
        }
        Err(detail) => {
            // Deletion failure is never fatal to the run.
            ctx.log.error(format!(
                "Failed to remove {}: {detail}",
                target.display_name
            ));
            ctx.failed_targets.insert(target.display_name.clone());
            return true;
        }
    }

    recreate_if_needed(target, ctx, ops);
    true
}

fn exists(target: &PolicyTarget, ops: &Ops) -> Result<bool, String> {
    match target.kind {
        TargetKind::FsTree => Ok(Path::new(&target.locator).exists()),
        TargetKind::RegKey => ops
            .registry
            .key_exists(&target.locator)
            .map_err(|e| e.to_string()),
    }
}

/// Some directories (the machine policy cache roots) are expected by the OS
/// to exist at all times; put an empty one back after deletion.
fn recreate_if_needed(target: &PolicyTarget, ctx: &mut RunContext, ops: &mut Ops) {
    if !target.recreate_after_delete || target.kind != TargetKind::FsTree {
        return;
    }
    let path = Path::new(&target.locator);
    if ctx.dry_run || !path.exists() {
        if let Err(e) = ops.create_dir_all(ctx, path) {
            ctx.log.warn(format!(
                "Could not recreate {} after removal: {e}",
                target.display_name
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Scope;
    use crate::services::ops::SystemTools;
    use crate::services::registry::{MemRegistry, Registry};
    use crate::services::runlog::Level;

    fn ctx_with_root(root: &Path, dry_run: bool) -> RunContext {
        RunContext::new(root.to_path_buf(), dry_run, false, false, false)
    }

    #[test]
    fn absent_target_is_skipped_without_backup() {
        let tmp = tempfile::tempdir().unwrap();
        let mut reg = MemRegistry::new();
        let mut tools = SystemTools;
        let mut ctx = ctx_with_root(tmp.path(), false);
        let mut ops = Ops::new(&mut reg, &mut tools);

        let target = PolicyTarget::reg_key(
            r"HKLM\SOFTWARE\Policies\Microsoft",
            "Machine policies (Software)",
            Scope::GpoMachineRegistry,
        )
        .critical();

        assert!(remove(&target, &mut ctx, &mut ops));
        assert!(ctx.backups.is_empty());
        assert!(ctx.failed_targets.is_empty());
        assert_eq!(
            ctx.log.messages_at(Level::Info),
            vec!["Machine policies (Software) does not exist, skipping"]
        );
    }

    #[test]
    fn critical_backup_failure_aborts_before_deletion() {
        let tmp = tempfile::tempdir().unwrap();
        let mut reg = MemRegistry::new();
        reg.add_key(r"HKLM\SOFTWARE\Policies\Microsoft");
        reg.fail_export_for(r"HKLM\SOFTWARE\Policies\Microsoft");
        let mut tools = SystemTools;
        let mut ctx = ctx_with_root(tmp.path(), false);
        let mut ops = Ops::new(&mut reg, &mut tools);

        let target = PolicyTarget::reg_key(
            r"HKLM\SOFTWARE\Policies\Microsoft",
            "Machine policies (Software)",
            Scope::GpoMachineRegistry,
        )
        .critical();

        assert!(!remove(&target, &mut ctx, &mut ops));
        // Key must still be present: deletion was never attempted.
        assert!(reg.key_exists(r"HKLM\SOFTWARE\Policies\Microsoft").unwrap());
        assert_eq!(ctx.log.messages_at(Level::Error).len(), 1);
    }

    #[test]
    fn non_critical_backup_failure_still_removes() {
        let tmp = tempfile::tempdir().unwrap();
        let mut reg = MemRegistry::new();
        reg.add_key(r"HKLM\SOFTWARE\Microsoft\Enrollments");
        reg.fail_export_for(r"HKLM\SOFTWARE\Microsoft\Enrollments");
        let mut tools = SystemTools;
        let mut ctx = ctx_with_root(tmp.path(), false);
        let mut ops = Ops::new(&mut reg, &mut tools);

        let target = PolicyTarget::reg_key(
            r"HKLM\SOFTWARE\Microsoft\Enrollments",
            "MDM enrollments",
            Scope::MdmRegistry,
        );

        assert!(remove(&target, &mut ctx, &mut ops));
        assert!(!reg.key_exists(r"HKLM\SOFTWARE\Microsoft\Enrollments").unwrap());
        assert_eq!(ctx.log.messages_at(Level::Warn).len(), 1);
        assert!(ctx.failed_targets.is_empty());
    }

    #[test]
    fn deletion_failure_is_recorded_but_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let mut reg = MemRegistry::new();
        reg.add_key(r"HKLM\SOFTWARE\Policies\Microsoft");
        reg.fail_delete_for(r"HKLM\SOFTWARE\Policies\Microsoft");
        let mut tools = SystemTools;
        let mut ctx = ctx_with_root(tmp.path(), false);
        let mut ops = Ops::new(&mut reg, &mut tools);

        let target = PolicyTarget::reg_key(
            r"HKLM\SOFTWARE\Policies\Microsoft",
            "Machine policies (Software)",
            Scope::GpoMachineRegistry,
        )
        .critical();

        // Backup succeeded, deletion failed: the run continues.
        assert!(remove(&target, &mut ctx, &mut ops));
        assert!(ctx
            .failed_targets
            .contains("Machine policies (Software)"));
        assert!(ctx.backups[0].succeeded);
    }

    #[test]
    fn expected_directory_is_recreated_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = tmp.path().join("GroupPolicy");
        std::fs::create_dir_all(cache.join("Machine")).unwrap();
        std::fs::write(cache.join("Machine/Registry.pol"), b"pol").unwrap();
        let backup_root = tmp.path().join("backups");
        std::fs::create_dir_all(&backup_root).unwrap();

        let mut reg = MemRegistry::new();
        let mut tools = SystemTools;
        let mut ctx = ctx_with_root(&backup_root, false);
        let mut ops = Ops::new(&mut reg, &mut tools);

        let target = PolicyTarget::fs_tree(
            cache.to_string_lossy().to_string(),
            "Machine Group Policy cache",
            Scope::GpoFilesystem,
        )
        .recreated();

        assert!(remove(&target, &mut ctx, &mut ops));
        assert!(cache.exists());
        assert!(std::fs::read_dir(&cache).unwrap().next().is_none());
    }

    #[test]
    fn dry_run_previews_without_touching_anything() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = tmp.path().join("GroupPolicy");
        std::fs::create_dir_all(&cache).unwrap();
        std::fs::write(cache.join("Registry.pol"), b"pol").unwrap();

        let mut reg = MemRegistry::new();
        let mut tools = SystemTools;
        let mut ctx = ctx_with_root(&tmp.path().join("backups"), true);
        let mut ops = Ops::new(&mut reg, &mut tools);

        let target = PolicyTarget::fs_tree(
            cache.to_string_lossy().to_string(),
            "Machine Group Policy cache",
            Scope::GpoFilesystem,
        )
        .recreated();

        assert!(remove(&target, &mut ctx, &mut ops));
        assert!(cache.join("Registry.pol").exists());
        assert!(!tmp.path().join("backups").exists());
        assert!(ctx.backups[0].succeeded);
        assert!(ctx
            .log
            .messages_at(Level::Info)
            .iter()
            .any(|m| m.starts_with("Would remove")));
    }
}
