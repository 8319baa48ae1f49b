use crate::domain::model::ConflictPolicy;
use crate::utils::error::{LookalikeError, Result};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Use(String),
    Skip,
}

/// 重名處理
///
/// A base name that is not taken is returned unchanged whatever the policy.
/// Under `Append` the suffixes `-2`, `-3`, ... are probed in order and the
/// first free one wins; the probe has no upper bound. The caller must insert
/// every name it ends up creating into `existing`.
pub fn resolve_name(
    base_name: &str,
    existing: &HashSet<String>,
    policy: ConflictPolicy,
) -> Result<Resolution> {
    if !existing.contains(base_name) {
        return Ok(Resolution::Use(base_name.to_string()));
    }

    match policy {
        ConflictPolicy::Skip => Ok(Resolution::Skip),
        ConflictPolicy::Fail => Err(LookalikeError::NameCollisionError {
            name: base_name.to_string(),
        }),
        ConflictPolicy::Append => {
            // existing 是有限集合，必定找得到空位
            let mut suffix = 2u64;
            loop {
                let candidate = format!("{}-{}", base_name, suffix);
                if !existing.contains(&candidate) {
                    return Ok(Resolution::Use(candidate));
                }
                suffix += 1;
            }
        }
    }
}
