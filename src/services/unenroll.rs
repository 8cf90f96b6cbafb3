//! Optional MDM unenrollment step. Runs before any removal scope: walk the
//! enrollment store, and for every enrollment owned by the management
//! provider on a directory-joined device, ask the platform to leave. The
//! asynchronous leave has no completion signal, so a fixed settle wait
//! follows. Linear, no retries.

use crate::domain::catalog::ENROLLMENTS_KEY;
use crate::domain::models::{EnrollmentRecord, RunContext};
use crate::services::ops::Ops;
use std::time::Duration;

/// Provider identifier written by the Windows MDM enrollment client.
pub const EXPECTED_PROVIDER: &str = "MS DM Server";

/// Best-effort wait for the asynchronous leave to take effect. The length
/// is logged so the worst case is visible in the audit trail.
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(30);

/// Enrollment subkeys are GUID-shaped (braces optional); anything else
/// under the store (Status, Context, ...) is ignored.
pub fn looks_like_guid(name: &str) -> bool {
    let inner = name
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(name);
    let groups: Vec<&str> = inner.split('-').collect();
    if groups.len() != 5 {
        return false;
    }
    let lens = [8, 4, 4, 4, 12];
    groups
        .iter()
        .zip(lens)
        .all(|(g, len)| g.len() == len && g.chars().all(|c| c.is_ascii_hexdigit()))
}

pub fn enumerate_enrollments(
    ctx: &mut RunContext,
    ops: &Ops,
) -> Vec<EnrollmentRecord> {
    let subkeys = match ops.registry.list_subkeys(ENROLLMENTS_KEY) {
        Ok(keys) => keys,
        Err(e) => {
            ctx.log
                .warn(format!("Could not read the enrollment store: {e}"));
            return Vec::new();
        }
    };

    let mut records = Vec::new();
    for name in subkeys.into_iter().filter(|n| looks_like_guid(n)) {
        let key = format!(r"{ENROLLMENTS_KEY}\{name}");
        let provider_id = ops
            .registry
            .read_string(&key, "ProviderID")
            .ok()
            .flatten()
            .unwrap_or_default();
        let upn = ops.registry.read_string(&key, "UPN").ok().flatten();
        records.push(EnrollmentRecord {
            enrollment_id: name,
            provider_id,
            upn,
        });
    }
    records
}

/// Pattern-match the join-status tool's known output line; no other output
/// parsing happens anywhere in the engine.
pub fn azure_ad_joined(status_output: &str) -> bool {
    status_output.lines().any(|line| {
        let mut parts = line.splitn(2, ':');
        let field = parts.next().unwrap_or("").trim();
        let value = parts.next().unwrap_or("").trim();
        field.eq_ignore_ascii_case("AzureAdJoined") && value.eq_ignore_ascii_case("YES")
    })
}

pub fn run(ctx: &mut RunContext, ops: &mut Ops, settle: Duration) {
    ctx.log.info("Starting MDM unenrollment");

    let enrollments = enumerate_enrollments(ctx, ops);
    if enrollments.is_empty() {
        ctx.log.info("No MDM enrollments found");
    }

    for enrollment in &enrollments {
        if !enrollment
            .provider_id
            .eq_ignore_ascii_case(EXPECTED_PROVIDER)
        {
            ctx.log.info(format!(
                "Enrollment {} has provider '{}', not managed by {EXPECTED_PROVIDER}; skipping",
                enrollment.enrollment_id, enrollment.provider_id
            ));
            continue;
        }

        // Read-only status probe; not gated by dry-run.
        let joined = match ops.tools.run("dsregcmd", &["/status"]) {
            Ok(out) => azure_ad_joined(&out.stdout),
            Err(e) => {
                ctx.log
                    .warn(format!("Could not query directory-join status: {e}"));
                false
            }
        };

        if joined {
            match ops.run_tool(ctx, "dsregcmd", &["/leave"]) {
                Ok(out) if out.code == 0 => {
                    ctx.log.success(format!(
                        "Requested platform leave for enrollment {}",
                        enrollment.enrollment_id
                    ));
                }
                Ok(out) => {
                    ctx.log.warn(format!(
                        "dsregcmd /leave exited with code {} for enrollment {}",
                        out.code, enrollment.enrollment_id
                    ));
                }
                Err(e) => {
                    ctx.log
                        .warn(format!("Could not invoke dsregcmd /leave: {e}"));
                }
            }
        } else {
            ctx.log.info(format!(
                "Device is not directory-joined; relying on direct removal of enrollment key {}",
                enrollment.enrollment_id
            ));
        }
    }

    ctx.log.info(format!(
        "Waiting {}s for unenrollment to settle",
        settle.as_secs()
    ));
    if !ctx.dry_run {
        std::thread::sleep(settle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guid_shapes_are_recognized() {
        assert!(looks_like_guid("{1F7B5A1E-9C2D-4E3F-8A5B-0123456789AB}"));
        assert!(looks_like_guid("1f7b5a1e-9c2d-4e3f-8a5b-0123456789ab"));
        assert!(!looks_like_guid("Status"));
        assert!(!looks_like_guid("Context"));
        assert!(!looks_like_guid("{1F7B5A1E-9C2D-4E3F-8A5B}"));
        assert!(!looks_like_guid("{1F7B5A1E-9C2D-4E3F-8A5B-0123456789AG}"));
    }

    #[test]
    fn join_status_line_is_pattern_matched() {
        let joined = "+----------+\n| Device State |\n  AzureAdJoined : YES\n  DomainJoined : NO\n";
        let not_joined = "  AzureAdJoined : NO\n";
        assert!(azure_ad_joined(joined));
        assert!(!azure_ad_joined(not_joined));
        assert!(!azure_ad_joined(""));
    }
}
