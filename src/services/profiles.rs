//! Loaded user-hive enumeration. Profiles come from the OS profile
//! catalog; only hives currently mounted under HKU are actionable. A
//! profile listed in the catalog is not necessarily mounted, so each one
//! is checked live.

use crate::domain::catalog::PROFILE_LIST_KEY;
use crate::domain::models::{RunContext, UserContext};
use crate::services::registry::Registry;

/// True for ordinary user SIDs; service accounts and the classes-hive
/// aliases never carry policy targets.
pub fn is_user_sid(sid: &str) -> bool {
    let lower = sid.to_ascii_lowercase();
    lower.starts_with("s-1-5-21-") && !lower.ends_with("_classes")
}

/// Discover the user contexts for this run, in catalog order. Unmounted
/// hives are logged once and excluded; they are never retried within the
/// same run. Zero profiles is not an error.
pub fn enumerate(ctx: &mut RunContext, registry: &dyn Registry) -> Vec<UserContext> {
    let sids = match registry.list_subkeys(PROFILE_LIST_KEY) {
        Ok(sids) => sids,
        Err(e) => {
            ctx.log
                .warn(format!("Could not enumerate user profiles: {e}"));
            return Vec::new();
        }
    };

    let mut loaded = Vec::new();
    for sid in sids.into_iter().filter(|s| is_user_sid(s)) {
        let profile_key = format!(r"{PROFILE_LIST_KEY}\{sid}");
        let profile_path = registry
            .read_string(&profile_key, "ProfileImagePath")
            .ok()
            .flatten()
            .unwrap_or_default();
        let hive_loaded = registry
            .key_exists(&format!(r"HKU\{sid}"))
            .unwrap_or(false);

        if hive_loaded {
            loaded.push(UserContext {
                sid,
                profile_path,
                hive_loaded,
            });
        } else {
            ctx.log.info(format!(
                "Hive for {sid} is not loaded, skipping (user is not logged in)"
            ));
        }
    }

    if loaded.is_empty() {
        ctx.log
            .warn("No loaded user hives found; per-user policy state will not be touched");
    }
    loaded
}
