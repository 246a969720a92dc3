//! Default role matrix for a fresh deployment.

use rolegate_auth::{AdminError, PermissionFlags, Role, RuleAdmin};

/// Resource tags the API protects.
pub mod tags {
    pub const USERS: &str = "users";
    pub const PRODUCTS: &str = "products";
    pub const ACCESS_RULES: &str = "access_rules";
}

/// Roles created by [`seed_defaults`].
#[derive(Debug, Clone)]
pub struct SeededRoles {
    pub admin: Role,
    pub user: Role,
}

/// Create `admin` and `user`, the three protected elements, and their rules.
///
/// `admin` gets every flag everywhere. `user` may read and edit its own
/// account and browse all products. Fails with a conflict on a non-empty store.
pub async fn seed_defaults(admin: &dyn RuleAdmin) -> Result<SeededRoles, AdminError> {
    let admin_role = admin.create_role("admin").await?;
    let user_role = admin.create_role("user").await?;

    let users = admin.create_element(tags::USERS).await?;
    let products = admin.create_element(tags::PRODUCTS).await?;
    let access_rules = admin.create_element(tags::ACCESS_RULES).await?;

    for element in [&users, &products, &access_rules] {
        admin
            .grant(admin_role.id, element.id, PermissionFlags::full())
            .await?;
    }

    admin
        .grant(
            user_role.id,
            users.id,
            PermissionFlags {
                read_own: true,
                update_own: true,
                ..PermissionFlags::none()
            },
        )
        .await?;
    admin
        .grant(
            user_role.id,
            products.id,
            PermissionFlags {
                read_all: true,
                ..PermissionFlags::none()
            },
        )
        .await?;

    tracing::info!("default roles and rules seeded");
    Ok(SeededRoles {
        admin: admin_role,
        user: user_role,
    })
}
