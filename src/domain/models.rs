use crate::services::runlog::RunLog;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

/// What kind of OS resource a target addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    FsTree,
    RegKey,
}

/// A named group of targets processed together with a shared abort policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    GpoFilesystem,
    MdmFilesystem,
    GpoMachineRegistry,
    MdmRegistry,
    GpoHistory,
    UserRegistry,
}

impl Scope {
    pub fn label(&self) -> &'static str {
        match self {
            Scope::GpoFilesystem => "GPO filesystem",
            Scope::MdmFilesystem => "MDM filesystem",
            Scope::GpoMachineRegistry => "GPO machine registry",
            Scope::MdmRegistry => "MDM registry",
            Scope::GpoHistory => "GPO history/RSoP",
            Scope::UserRegistry => "per-user registry",
        }
    }
}

/// One removal unit: an addressable resource subject to backup-then-remove.
///
/// Registry locators use `HKLM\...` / `HKU\<SID>\...` prefixes so one string
/// scheme addresses both machine and per-user contexts. A locator that does
/// not resolve is treated as absent, never as an error.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyTarget {
    pub kind: TargetKind,
    pub locator: String,
    pub display_name: String,
    pub scope: Scope,
    /// Abort the remaining targets of this scope when the backup fails.
    /// Set for machine-level GPO registry keys, where operating without a
    /// restorable backup is unacceptable.
    pub abort_on_backup_failure: bool,
    /// The OS expects this directory to exist at all times; recreate it
    /// empty after deletion.
    pub recreate_after_delete: bool,
}

impl PolicyTarget {
    pub fn fs_tree(locator: impl Into<String>, display: impl Into<String>, scope: Scope) -> Self {
        Self {
            kind: TargetKind::FsTree,
            locator: locator.into(),
            display_name: display.into(),
            scope,
            abort_on_backup_failure: false,
            recreate_after_delete: false,
        }
    }

    pub fn reg_key(locator: impl Into<String>, display: impl Into<String>, scope: Scope) -> Self {
        Self {
            kind: TargetKind::RegKey,
            locator: locator.into(),
            display_name: display.into(),
            scope,
            abort_on_backup_failure: false,
            recreate_after_delete: false,
        }
    }

    pub fn critical(mut self) -> Self {
        self.abort_on_backup_failure = true;
        self
    }

    pub fn recreated(mut self) -> Self {
        self.recreate_after_delete = true;
        self
    }
}

/// Outcome of the backup service for one target. Append-only; retained on
/// disk indefinitely (cleanup is an operator responsibility).
#[derive(Debug, Clone, Serialize)]
pub struct BackupRecord {
    pub source_locator: String,
    pub backup_path: PathBuf,
    pub succeeded: bool,
    pub error_detail: Option<String>,
}

/// One discovered user profile. Only profiles whose hive is currently
/// mounted under HKU produce removal targets.
#[derive(Debug, Clone, Serialize)]
pub struct UserContext {
    pub sid: String,
    pub profile_path: String,
    pub hive_loaded: bool,
}

/// One entry discovered under the MDM enrollment store.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentRecord {
    pub enrollment_id: String,
    pub provider_id: String,
    pub upn: Option<String>,
}

/// Process-wide state for one invocation. Created at start, passed by
/// reference to every component, discarded at exit.
pub struct RunContext {
    pub backup_root: PathBuf,
    pub dry_run: bool,
    pub skip_reconcile: bool,
    pub unenroll: bool,
    pub log: RunLog,
    pub failed_targets: BTreeSet<String>,
    pub backups: Vec<BackupRecord>,
}

impl RunContext {
    pub fn new(
        backup_root: PathBuf,
        dry_run: bool,
        skip_reconcile: bool,
        unenroll: bool,
        echo_log: bool,
    ) -> Self {
        Self {
            backup_root,
            dry_run,
            skip_reconcile,
            unenroll,
            log: RunLog::new(echo_log),
            failed_targets: BTreeSet::new(),
            backups: Vec::new(),
        }
    }
}

/// Final report of a run, printed as the summary block and written as
/// `summary.json` under the backup root.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub backup_root: String,
    pub dry_run: bool,
    pub failed_targets: Vec<String>,
    pub backups: Vec<BackupRecord>,
    pub caveats: Vec<String>,
}
