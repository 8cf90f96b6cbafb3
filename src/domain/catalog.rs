//! Declarative list of removal targets, grouped by scope. Leaf data only;
//! the executor decides what to do with each entry.

use crate::domain::models::{PolicyTarget, Scope};

pub const ENROLLMENTS_KEY: &str = r"HKLM\SOFTWARE\Microsoft\Enrollments";
pub const PROFILE_LIST_KEY: &str =
    r"HKLM\SOFTWARE\Microsoft\Windows NT\CurrentVersion\ProfileList";

/// All targets of one scope, in removal order.
#[derive(Debug, Clone)]
pub struct ScopePlan {
    pub scope: Scope,
    pub targets: Vec<PolicyTarget>,
}

fn system_root() -> String {
    std::env::var("SystemRoot").unwrap_or_else(|_| r"C:\Windows".to_string())
}

fn program_data() -> String {
    std::env::var("ProgramData").unwrap_or_else(|_| r"C:\ProgramData".to_string())
}

pub fn gpo_filesystem() -> ScopePlan {
    let root = system_root();
    ScopePlan {
        scope: Scope::GpoFilesystem,
        targets: vec![
            PolicyTarget::fs_tree(
                format!(r"{root}\System32\GroupPolicy"),
                "Machine Group Policy cache",
                Scope::GpoFilesystem,
            )
            .recreated(),
            PolicyTarget::fs_tree(
                format!(r"{root}\System32\GroupPolicyUsers"),
                "Per-user Group Policy cache",
                Scope::GpoFilesystem,
            )
            .recreated(),
            PolicyTarget::fs_tree(
                format!(r"{}\Microsoft\Group Policy\History", program_data()),
                "Group Policy history files",
                Scope::GpoFilesystem,
            ),
        ],
    }
}

pub fn mdm_filesystem() -> ScopePlan {
    let root = system_root();
    ScopePlan {
        scope: Scope::MdmFilesystem,
        targets: vec![PolicyTarget::fs_tree(
            format!(r"{root}\System32\Tasks\Microsoft\Windows\EnterpriseMgmt"),
            "Enterprise management scheduled tasks",
            Scope::MdmFilesystem,
        )],
    }
}

pub fn gpo_machine_registry() -> ScopePlan {
    ScopePlan {
        scope: Scope::GpoMachineRegistry,
        targets: vec![
            PolicyTarget::reg_key(
                r"HKLM\SOFTWARE\Policies\Microsoft",
                "Machine policies (Software)",
                Scope::GpoMachineRegistry,
            )
            .critical(),
            PolicyTarget::reg_key(
                r"HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\Policies",
                "Machine policies (CurrentVersion)",
                Scope::GpoMachineRegistry,
            )
            .critical(),
            PolicyTarget::reg_key(
                r"HKLM\SOFTWARE\WOW6432Node\Policies\Microsoft",
                "Machine policies (WOW6432Node)",
                Scope::GpoMachineRegistry,
            )
            .critical(),
        ],
    }
}

pub fn mdm_registry() -> ScopePlan {
    ScopePlan {
        scope: Scope::MdmRegistry,
        targets: vec![
            PolicyTarget::reg_key(ENROLLMENTS_KEY, "MDM enrollments", Scope::MdmRegistry),
            PolicyTarget::reg_key(
                r"HKLM\SOFTWARE\Microsoft\Enrollments\Status",
                "MDM enrollment status",
                Scope::MdmRegistry,
            ),
            PolicyTarget::reg_key(
                r"HKLM\SOFTWARE\Microsoft\EnterpriseResourceManager\Tracked",
                "Enterprise resource tracking",
                Scope::MdmRegistry,
            ),
            PolicyTarget::reg_key(
                r"HKLM\SOFTWARE\Microsoft\PolicyManager\AdmxInstalled",
                "Ingested ADMX policies",
                Scope::MdmRegistry,
            ),
            PolicyTarget::reg_key(
                r"HKLM\SOFTWARE\Microsoft\PolicyManager\current\device",
                "PolicyManager device policies",
                Scope::MdmRegistry,
            ),
            PolicyTarget::reg_key(
                r"HKLM\SOFTWARE\Microsoft\Provisioning\OMADM\Accounts",
                "OMA-DM accounts",
                Scope::MdmRegistry,
            ),
        ],
    }
}

/// Per-enrollment policy subkeys, discovered at run time from the
/// enrollment store. Skipped entirely when unenrollment was requested.
pub fn per_enrollment_targets(enrollment_id: &str) -> Vec<PolicyTarget> {
    ["DMClient", "PolicyManager", "FirstSync"]
        .iter()
        .map(|sub| {
            PolicyTarget::reg_key(
                format!(r"{ENROLLMENTS_KEY}\{enrollment_id}\{sub}"),
                format!("Enrollment {enrollment_id} {sub}"),
                Scope::MdmRegistry,
            )
        })
        .collect()
}

pub fn gpo_history() -> ScopePlan {
    ScopePlan {
        scope: Scope::GpoHistory,
        targets: vec![
            PolicyTarget::reg_key(
                r"HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\Group Policy\History",
                "Group Policy history (registry)",
                Scope::GpoHistory,
            ),
            PolicyTarget::reg_key(
                r"HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\Group Policy\State",
                "Group Policy RSoP state",
                Scope::GpoHistory,
            ),
        ],
    }
}

/// Targets for one mounted user hive.
pub fn user_registry(sid: &str) -> ScopePlan {
    ScopePlan {
        scope: Scope::UserRegistry,
        targets: vec![
            PolicyTarget::reg_key(
                format!(r"HKU\{sid}\Software\Policies\Microsoft"),
                format!("User policies (Software) [{sid}]"),
                Scope::UserRegistry,
            ),
            PolicyTarget::reg_key(
                format!(r"HKU\{sid}\Software\Microsoft\Windows\CurrentVersion\Policies"),
                format!("User policies (CurrentVersion) [{sid}]"),
                Scope::UserRegistry,
            ),
            PolicyTarget::reg_key(
                format!(r"HKU\{sid}\Software\Microsoft\Windows\CurrentVersion\Group Policy Objects"),
                format!("User Group Policy objects [{sid}]"),
                Scope::UserRegistry,
            ),
        ],
    }
}

/// The statically known scopes, in execution order. Per-enrollment and
/// per-user targets are discovered at run time and do not appear here.
pub fn static_scopes() -> Vec<ScopePlan> {
    vec![
        gpo_filesystem(),
        mdm_filesystem(),
        gpo_machine_registry(),
        mdm_registry(),
        gpo_history(),
    ]
}
