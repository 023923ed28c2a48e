// src/domain/scope.rs
//
// The single authorization gate for data access. Every list query and every
// single-row operation on clients, products, quotes and invoices goes through
// an AccessScope; the admin/owner branch is never re-derived in handlers.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessScope {
    admin: bool,
    user_id: i64,
}

impl AccessScope {
    pub fn for_caller(role: &str, user_id: i64) -> Self {
        Self {
            admin: role == ROLE_ADMIN,
            user_id,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Whether a row owned by `created_by` is visible to this caller.
    /// Out-of-scope rows are reported as not found, never as forbidden, so a
    /// user cannot probe for documents owned by someone else.
    pub fn allows(&self, created_by: i64) -> bool {
        self.admin || created_by == self.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_sees_everything() {
        let scope = AccessScope::for_caller(ROLE_ADMIN, 1);
        assert!(scope.is_admin());
        assert!(scope.allows(1));
        assert!(scope.allows(999));
    }

    #[test]
    fn user_only_sees_own_rows() {
        let scope = AccessScope::for_caller(ROLE_USER, 42);
        assert!(!scope.is_admin());
        assert!(scope.allows(42));
        assert!(!scope.allows(41));
        assert!(!scope.allows(1));
    }

    #[test]
    fn unknown_role_is_not_admin() {
        let scope = AccessScope::for_caller("super_duper", 7);
        assert!(!scope.is_admin());
        assert!(!scope.allows(8));
    }
}
