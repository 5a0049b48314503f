//! Role bitmasks, the route privilege table and the capability check.
//!
//! Roles form a lattice by bit containment: every higher role carries all
//! the bits of the roles below it, so `Admin` satisfies any requirement an
//! `Operator` satisfies, and so on.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A set of granted privilege bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleFlags(pub i32);

impl RoleFlags {
    pub const NONE: RoleFlags = RoleFlags(0);
    pub const USER: RoleFlags = RoleFlags(0b001);
    pub const OPERATOR: RoleFlags = RoleFlags(0b011);
    pub const ADMIN: RoleFlags = RoleFlags(0b111);

    pub fn bits(self) -> i32 {
        self.0
    }

    /// `true` when every bit of `required` is present in `self`.
    pub fn contains(self, required: RoleFlags) -> bool {
        self.0 & required.0 == required.0
    }

    /// Parse a well-known role name (`user`, `operator`, `admin`).
    pub fn from_name(name: &str) -> Option<RoleFlags> {
        match name.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Self::USER),
            "operator" => Some(Self::OPERATOR),
            "admin" => Some(Self::ADMIN),
            _ => None,
        }
    }

    /// Name of the highest well-known role contained in these flags.
    pub fn name(self) -> &'static str {
        if self.contains(Self::ADMIN) {
            "admin"
        } else if self.contains(Self::OPERATOR) {
            "operator"
        } else if self.contains(Self::USER) {
            "user"
        } else {
            "none"
        }
    }
}

/// Outcome of a capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Authorized,
    InsufficientRole,
}

/// The single capability check used by every protected operation.
pub fn check_capability(granted: RoleFlags, required: RoleFlags) -> Verdict {
    if granted.contains(required) {
        Verdict::Authorized
    } else {
        Verdict::InsufficientRole
    }
}

/// One row of the privilege table.
#[derive(Debug, Clone)]
pub struct PrivilegeRule {
    /// Upper-case HTTP method, or `*` for any method.
    pub method: String,
    pub path: Regex,
    pub required: RoleFlags,
}

/// Minimum role per (method, path), first matching rule wins.
///
/// Paths that match no rule require [`RoleFlags::ADMIN`].
#[derive(Debug, Clone, Default)]
pub struct PrivilegeTable {
    rules: Vec<PrivilegeRule>,
}

impl PrivilegeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule. Panics on an invalid pattern, which only happens with
    /// a programming error in the static table.
    pub fn with_rule(mut self, method: &str, pattern: &str, required: RoleFlags) -> Self {
        let path = Regex::new(pattern)
            .unwrap_or_else(|e| panic!("invalid privilege pattern '{pattern}': {e}"));
        self.rules.push(PrivilegeRule {
            method: method.to_ascii_uppercase(),
            path,
            required,
        });
        self
    }

    /// Resolve the minimum role for a request.
    pub fn required_role(&self, method: &str, path: &str) -> RoleFlags {
        self.rules
            .iter()
            .find(|rule| {
                (rule.method == "*" || rule.method.eq_ignore_ascii_case(method))
                    && rule.path.is_match(path)
            })
            .map(|rule| rule.required)
            .unwrap_or(RoleFlags::ADMIN)
    }

    /// The privilege table of the resource API.
    ///
    /// Reading metadata needs a plain user, changing it needs an operator,
    /// account administration needs an admin.
    pub fn standard() -> Self {
        let resources =
            r"^/api/v1/(hosts|appSets|oss|oas|backupSets|policies|paths|client/jobs)(/.*)?$";
        Self::new()
            .with_rule("*", r"^/api/v1/auth(/.*)?$", RoleFlags::USER)
            .with_rule("*", r"^/api/v1/users(/.*)?$", RoleFlags::ADMIN)
            .with_rule("GET", resources, RoleFlags::USER)
            .with_rule("POST", resources, RoleFlags::OPERATOR)
            .with_rule("PUT", resources, RoleFlags::OPERATOR)
            .with_rule("DELETE", resources, RoleFlags::OPERATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_roles_contain_lower_ones() {
        assert!(RoleFlags::ADMIN.contains(RoleFlags::OPERATOR));
        assert!(RoleFlags::ADMIN.contains(RoleFlags::USER));
        assert!(RoleFlags::OPERATOR.contains(RoleFlags::USER));
        assert!(!RoleFlags::USER.contains(RoleFlags::OPERATOR));
        assert!(!RoleFlags::OPERATOR.contains(RoleFlags::ADMIN));
        assert!(!RoleFlags::NONE.contains(RoleFlags::USER));
    }

    #[test]
    fn capability_check_uses_containment() {
        assert_eq!(
            check_capability(RoleFlags::OPERATOR, RoleFlags::USER),
            Verdict::Authorized
        );
        assert_eq!(
            check_capability(RoleFlags::USER, RoleFlags::OPERATOR),
            Verdict::InsufficientRole
        );
        // A stray bit outside the lattice does not grant anything else.
        assert_eq!(
            check_capability(RoleFlags(0b100), RoleFlags::OPERATOR),
            Verdict::InsufficientRole
        );
    }

    #[test]
    fn role_names_round_trip() {
        for name in ["user", "operator", "admin"] {
            let flags = RoleFlags::from_name(name).unwrap();
            assert_eq!(flags.name(), name);
        }
        assert_eq!(RoleFlags::from_name("Admin "), Some(RoleFlags::ADMIN));
        assert_eq!(RoleFlags::from_name("root"), None);
        assert_eq!(RoleFlags::NONE.name(), "none");
    }

    #[test]
    fn standard_table_reads_need_user_writes_need_operator() {
        let table = PrivilegeTable::standard();
        assert_eq!(table.required_role("GET", "/api/v1/hosts"), RoleFlags::USER);
        assert_eq!(
            table.required_role("get", "/api/v1/hosts/web-01"),
            RoleFlags::USER
        );
        assert_eq!(
            table.required_role("POST", "/api/v1/appSets"),
            RoleFlags::OPERATOR
        );
        assert_eq!(
            table.required_role("DELETE", "/api/v1/client/jobs/abc"),
            RoleFlags::OPERATOR
        );
        assert_eq!(table.required_role("GET", "/api/v1/users"), RoleFlags::ADMIN);
        assert_eq!(
            table.required_role("POST", "/api/v1/auth/logout"),
            RoleFlags::USER
        );
    }

    #[test]
    fn unmatched_paths_require_admin() {
        let table = PrivilegeTable::standard();
        assert_eq!(
            table.required_role("GET", "/api/v1/unknown"),
            RoleFlags::ADMIN
        );
        assert_eq!(table.required_role("PATCH", "/api/v1/hosts"), RoleFlags::ADMIN);
    }
}
