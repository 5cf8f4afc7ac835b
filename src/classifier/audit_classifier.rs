use crate::classifier::Classification;
use crate::events::{Category, Severity};

const CRITICAL_ACTIONS: &[&str] = &[
    "delete",
    "bulk_delete",
    "permission_change",
    "admin_access",
    "security_violation",
];
const HIGH_ACTIONS: &[&str] = &["failed_login", "export", "role_change", "password_change"];
const MEDIUM_ACTIONS: &[&str] = &["create", "update", "login", "logout", "invite"];

/// Classify an audit action performed on a resource
///
/// Pure like [`crate::classifier::classify`]: only the action and resource
/// names are consulted.
pub fn classify_audit(action: &str, resource: &str) -> Classification {
    Classification {
        severity: audit_severity(action, resource),
        category: audit_category(action),
    }
}

fn audit_severity(action: &str, resource: &str) -> Severity {
    let action = action.to_lowercase();

    if CRITICAL_ACTIONS.contains(&action.as_str()) || resource.eq_ignore_ascii_case("security") {
        Severity::Critical
    } else if HIGH_ACTIONS.contains(&action.as_str()) {
        Severity::High
    } else if MEDIUM_ACTIONS.contains(&action.as_str()) {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn audit_category(action: &str) -> Category {
    let action = action.to_lowercase();

    match action.as_str() {
        "login" | "logout" | "failed_login" | "password_change" => Category::Authentication,
        "permission_change" | "role_change" | "admin_access" => Category::Authorization,
        "view" | "read" | "export" | "search" => Category::DataAccess,
        "create" | "update" | "delete" | "bulk_delete" | "import" => Category::DataModification,
        other if other.contains("security") || other.contains("suspicious") => Category::Security,
        _ => Category::System,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destructive_actions_are_critical() {
        let result = classify_audit("delete", "restaurant");
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(result.category, Category::DataModification);
    }

    #[test]
    fn test_security_resource_is_always_critical() {
        let result = classify_audit("view", "security");
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(result.category, Category::DataAccess);
    }

    #[test]
    fn test_authentication_actions() {
        assert_eq!(
            classify_audit("failed_login", "auth"),
            Classification {
                severity: Severity::High,
                category: Category::Authentication,
            }
        );
        assert_eq!(
            classify_audit("LOGIN", "auth"),
            Classification {
                severity: Severity::Medium,
                category: Category::Authentication,
            }
        );
    }

    #[test]
    fn test_security_keyword_category() {
        let result = classify_audit("suspicious_activity", "session");
        assert_eq!(result.category, Category::Security);
        assert_eq!(result.severity, Severity::Low);
    }

    #[test]
    fn test_unknown_actions_fall_back_to_system() {
        assert_eq!(
            classify_audit("heartbeat", "scheduler"),
            Classification {
                severity: Severity::Low,
                category: Category::System,
            }
        );
    }
}
