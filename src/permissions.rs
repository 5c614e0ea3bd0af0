use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Vendor,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ProductWrite,
    OrderPlace,
    OrderFulfil,
    OrderCancel,
    ReviewCreate,
    ReviewModerate,
    ConversationAccess,
    BookingManage,
    StoreSettings,
}

/// The whole permission model: a fixed role/capability table. No
/// hierarchy, no delegation; admin is listed explicitly per capability.
pub fn role_allows(role: Role, capability: Capability) -> bool {
    use Capability::*;
    use Role::*;

    match capability {
        ProductWrite => matches!(role, Vendor | Admin),
        OrderPlace => matches!(role, Customer),
        OrderFulfil => matches!(role, Vendor | Admin),
        OrderCancel => matches!(role, Customer | Admin),
        ReviewCreate => matches!(role, Customer),
        ReviewModerate => matches!(role, Admin),
        ConversationAccess => matches!(role, Customer | Vendor | Admin),
        BookingManage => matches!(role, Vendor | Admin),
        StoreSettings => matches!(role, Vendor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customers_cannot_touch_the_catalog() {
        assert!(!role_allows(Role::Customer, Capability::ProductWrite));
        assert!(role_allows(Role::Vendor, Capability::ProductWrite));
        assert!(role_allows(Role::Admin, Capability::ProductWrite));
    }

    #[test]
    fn only_customers_place_and_review() {
        assert!(role_allows(Role::Customer, Capability::OrderPlace));
        assert!(!role_allows(Role::Vendor, Capability::OrderPlace));
        assert!(role_allows(Role::Customer, Capability::ReviewCreate));
        assert!(!role_allows(Role::Admin, Capability::ReviewCreate));
    }

    #[test]
    fn store_settings_stay_with_the_vendor() {
        assert!(role_allows(Role::Vendor, Capability::StoreSettings));
        assert!(!role_allows(Role::Admin, Capability::StoreSettings));
        assert!(!role_allows(Role::Customer, Capability::StoreSettings));
    }
}
