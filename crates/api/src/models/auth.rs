//! Authorization scope computed once per request.
//!
//! The bearer-token middleware resolves the caller into an [`AuthScope`]
//! which is threaded into every service call. Services enforce access rules
//! against the scope rather than re-deriving role checks per handler.

use serde::Serialize;

use bazaar_core::{UserId, UserRole};

/// The authenticated caller's identity and role.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AuthScope {
    /// The calling user.
    pub user_id: UserId,
    /// The caller's role.
    pub role: UserRole,
}

impl AuthScope {
    /// Create a scope for a user with a role.
    #[must_use]
    pub const fn new(user_id: UserId, role: UserRole) -> Self {
        Self { user_id, role }
    }

    /// Whether the caller is an admin.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }

    /// Whether the caller is a seller.
    #[must_use]
    pub const fn is_seller(&self) -> bool {
        matches!(self.role, UserRole::Seller)
    }

    /// Whether the caller may read an order.
    ///
    /// Admins see everything; the buying customer sees their own orders; a
    /// seller sees orders containing at least one of their products.
    #[must_use]
    pub fn can_view_order(&self, buyer: UserId, line_seller_ids: &[UserId]) -> bool {
        if self.is_admin() || self.user_id == buyer {
            return true;
        }
        self.is_seller() && line_seller_ids.contains(&self.user_id)
    }

    /// Whether the caller may transition an order's status.
    ///
    /// Status transitions are for staff: admins always, sellers only on
    /// orders containing their products. The buying customer may cancel
    /// their own order but performs no other transition.
    #[must_use]
    pub fn can_transition_order(
        &self,
        buyer: UserId,
        line_seller_ids: &[UserId],
        cancelling: bool,
    ) -> bool {
        if self.is_admin() {
            return true;
        }
        if self.is_seller() && line_seller_ids.contains(&self.user_id) {
            return true;
        }
        cancelling && self.user_id == buyer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUYER: UserId = UserId::new(1);
    const SELLER: UserId = UserId::new(2);
    const OTHER_SELLER: UserId = UserId::new(3);

    #[test]
    fn customer_sees_only_own_orders() {
        let scope = AuthScope::new(BUYER, UserRole::Customer);
        assert!(scope.can_view_order(BUYER, &[SELLER]));
        assert!(!scope.can_view_order(UserId::new(99), &[SELLER]));
    }

    #[test]
    fn seller_sees_orders_with_their_products() {
        let scope = AuthScope::new(SELLER, UserRole::Seller);
        assert!(scope.can_view_order(BUYER, &[SELLER, OTHER_SELLER]));
        assert!(!scope.can_view_order(BUYER, &[OTHER_SELLER]));
    }

    #[test]
    fn admin_sees_everything() {
        let scope = AuthScope::new(UserId::new(42), UserRole::Admin);
        assert!(scope.can_view_order(BUYER, &[]));
        assert!(scope.can_transition_order(BUYER, &[], false));
    }

    #[test]
    fn customer_may_cancel_but_not_advance() {
        let scope = AuthScope::new(BUYER, UserRole::Customer);
        assert!(scope.can_transition_order(BUYER, &[SELLER], true));
        assert!(!scope.can_transition_order(BUYER, &[SELLER], false));
        assert!(!scope.can_transition_order(UserId::new(99), &[SELLER], true));
    }
}
