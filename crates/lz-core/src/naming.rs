//! Naming rules enforced by the remote control plane.
//!
//! Management-group ids are prefixed with the organization prefix and must
//! match the ARM management-group charset. Policy-assignment names are
//! stripped down to `[A-Za-z0-9-]` and truncated to 24 characters, which is
//! the limit ARM enforces for assignments at management-group scope.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::ApplyError;

/// Maximum length of a policy-assignment name at management-group scope.
pub const MAX_ASSIGNMENT_NAME_LEN: usize = 24;

/// Maximum length of a management-group id.
pub const MAX_GROUP_ID_LEN: usize = 90;

/// ARM resource path prefix for management groups.
pub const MANAGEMENT_GROUP_SCOPE_PREFIX: &str = "/providers/Microsoft.Management/managementGroups/";

static GROUP_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_.()\-]+$").expect("management group id pattern is a valid regex")
});

/// Join the organization prefix and a short group id with a hyphen.
///
/// An empty prefix leaves the id unchanged.
pub fn qualify_group_id(prefix: &str, short_id: &str) -> String {
    if prefix.is_empty() {
        short_id.to_string()
    } else {
        format!("{}-{}", prefix, short_id)
    }
}

/// Check a fully-qualified management-group id against the ARM charset.
pub fn validate_group_id(id: &str) -> Result<(), ApplyError> {
    if id.is_empty() {
        return Err(ApplyError::invalid("management group id must not be empty"));
    }
    if id.len() > MAX_GROUP_ID_LEN {
        return Err(ApplyError::invalid(format!(
            "management group id '{}' exceeds {} characters",
            id, MAX_GROUP_ID_LEN
        )));
    }
    if !GROUP_ID_PATTERN.is_match(id) {
        return Err(ApplyError::invalid(format!(
            "management group id '{}' may only contain letters, digits, '-', '_', '.', '(' and ')'",
            id
        )));
    }
    Ok(())
}

/// Strip disallowed characters, then truncate to [`MAX_ASSIGNMENT_NAME_LEN`].
///
/// The order matters: lookups for assignments created by earlier runs only
/// hit when the same truncated name is produced.
pub fn sanitize_assignment_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .take(MAX_ASSIGNMENT_NAME_LEN)
        .collect()
}

/// Sanitize an assignment name and reject it if nothing usable remains.
pub fn assignment_name(name: &str) -> Result<String, ApplyError> {
    let sanitized = sanitize_assignment_name(name);
    if sanitized.is_empty() {
        return Err(ApplyError::invalid(format!(
            "policy assignment name '{}' has no characters in [A-Za-z0-9-]",
            name
        )));
    }
    Ok(sanitized)
}

/// ARM scope path of a management group.
pub fn management_group_scope(qualified_id: &str) -> String {
    format!("{}{}", MANAGEMENT_GROUP_SCOPE_PREFIX, qualified_id)
}

/// Full ARM id of a policy assignment at a scope.
pub fn policy_assignment_id(scope: &str, sanitized_name: &str) -> String {
    format!(
        "{}/providers/Microsoft.Authorization/policyAssignments/{}",
        scope.trim_end_matches('/'),
        sanitized_name
    )
}

/// Last path segment of an ARM resource id (`/a/b/c` -> `c`).
pub fn resource_name(resource_id: &str) -> &str {
    resource_id
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(resource_id)
}
