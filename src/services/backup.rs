//! Backup service: produce a restorable copy of a target under the run's
//! backup root before anything destructive happens. Strictly additive; the
//! only side effect is file/directory creation under the backup root.

use crate::domain::models::{BackupRecord, PolicyTarget, RunContext, TargetKind};
use crate::services::ops::Ops;
use std::path::Path;

/// Path-illegal characters in a display name are replaced before building
/// the backup filename. Collisions are acceptable (last write wins); each
/// scope uses distinct display names.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c == '\\' || c == ':' { '_' } else { c })
        .collect()
}

pub fn backup(target: &PolicyTarget, ctx: &mut RunContext, ops: &mut Ops) -> BackupRecord {
    let ext = match target.kind {
        TargetKind::FsTree => "bak",
        TargetKind::RegKey => "reg",
    };
    let dest = ctx
        .backup_root
        .join(format!("{}.{}", sanitize(&target.display_name), ext));

    let result = match target.kind {
        TargetKind::FsTree => ops
            .copy_tree(ctx, Path::new(&target.locator), &dest)
            .map_err(|e| e.to_string()),
        // Success is the export tool's exit status, not file existence; a
        // zero-byte export with exit-success still counts.
        TargetKind::RegKey => ops
            .export_key(ctx, &target.locator, &dest)
            .map_err(|e| e.to_string()),
    };

    match result {
        Ok(()) => BackupRecord {
            source_locator: target.locator.clone(),
            backup_path: dest,
            succeeded: true,
            error_detail: None,
        },
        Err(detail) => BackupRecord {
            source_locator: target.locator.clone(),
            backup_path: dest,
            succeeded: false,
            error_detail: Some(detail),
        },
    }
}
