use domains::{AccessControl, Capability, Identity, Role};

/// Grants capabilities by role: authors manage adverts and their
/// applications; admins may do everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoleAccessControl;

impl RoleAccessControl {
    fn role_grants(role: Role, capability: Capability) -> bool {
        match role {
            Role::Admin => true,
            Role::Author => matches!(
                capability,
                Capability::ManageAdverts | Capability::ManageApplications
            ),
        }
    }
}

impl AccessControl for RoleAccessControl {
    fn is_granted(&self, identity: &Identity, capability: Capability) -> bool {
        identity
            .roles()
            .iter()
            .any(|role| Self::role_grants(*role, capability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authors_manage_adverts() {
        let author = Identity::new("alexandre", [Role::Author]);
        assert!(RoleAccessControl.is_granted(&author, Capability::ManageAdverts));
        assert!(RoleAccessControl.is_granted(&author, Capability::ManageApplications));
    }

    #[test]
    fn identities_without_roles_get_nothing() {
        let visitor = Identity::new("visiteur", Vec::<Role>::new());
        assert!(!RoleAccessControl.is_granted(&visitor, Capability::ManageAdverts));
    }
}
