//! Frequently run shell commands missing from the allow-list.

use serde::Serialize;
use sessight_types::UsageCount;
use std::collections::HashSet;

pub const DEFAULT_PERMISSION_THRESHOLD: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionGap {
    pub command: String,
    pub count: i64,
    /// Allow-list entry that would cover the command
    pub suggestion: String,
}

impl PermissionGap {
    fn new(usage: &UsageCount) -> Self {
        Self {
            command: usage.key.clone(),
            count: usage.count,
            suggestion: format!("Bash({}:*)", usage.key),
        }
    }
}

/// Commands run at least `threshold` times that `allowed` does not cover.
///
/// Order follows `command_counts`.
pub fn find_permission_gaps(
    command_counts: &[UsageCount],
    allowed: &HashSet<String>,
    threshold: i64,
) -> Vec<PermissionGap> {
    command_counts
        .iter()
        .filter(|c| c.count >= threshold && !allowed.contains(&c.key))
        .map(PermissionGap::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(key: &str, count: i64) -> UsageCount {
        UsageCount {
            key: key.to_string(),
            count,
            last_seen: None,
        }
    }

    #[test]
    fn test_reports_unlisted_commands_at_threshold() {
        let counts = vec![usage("cargo", 12), usage("git", 9), usage("ls", 5), usage("rg", 4)];
        let allowed: HashSet<String> = ["git".to_string()].into();

        let gaps = find_permission_gaps(&counts, &allowed, DEFAULT_PERMISSION_THRESHOLD);
        assert_eq!(
            gaps,
            vec![
                PermissionGap {
                    command: "cargo".into(),
                    count: 12,
                    suggestion: "Bash(cargo:*)".into(),
                },
                PermissionGap {
                    command: "ls".into(),
                    count: 5,
                    suggestion: "Bash(ls:*)".into(),
                },
            ]
        );
    }

    #[test]
    fn test_empty_allow_list_reports_everything_frequent() {
        let counts = vec![usage("npm", 3)];
        assert_eq!(find_permission_gaps(&counts, &HashSet::new(), 3).len(), 1);
        assert!(find_permission_gaps(&counts, &HashSet::new(), 4).is_empty());
    }
}
