//! Role resolution from directory group membership.

use crate::models::auth::Role;

/// Maps group memberships to one of the three fixed roles.
///
/// Bindings are ordered by priority (admin, editor, viewer); roles with no
/// configured group are skipped at construction time.
#[derive(Clone, Debug)]
pub struct RoleResolver {
    bindings: Vec<(Role, String)>,
}

impl RoleResolver {
    /// Build a resolver from the configured group DNs.
    pub fn from_bindings(
        admin_group: Option<&str>,
        editor_group: Option<&str>,
        viewer_group: Option<&str>,
    ) -> Self {
        let mut bindings = Vec::new();
        for (role, group) in [
            (Role::Admin, admin_group),
            (Role::Editor, editor_group),
            (Role::Viewer, viewer_group),
        ] {
            if let Some(group) = group {
                let group = group.trim();
                if !group.is_empty() {
                    bindings.push((role, group.to_lowercase()));
                }
            }
        }
        Self { bindings }
    }

    /// Resolve a role from the profile's group DNs.
    ///
    /// Case-insensitive substring match; the first binding whose group
    /// appears in any profile group wins. `None` when nothing matches or
    /// no roles are configured.
    pub fn resolve(&self, groups: &[String]) -> Option<Role> {
        let groups: Vec<String> = groups.iter().map(|g| g.to_lowercase()).collect();
        self.bindings
            .iter()
            .find(|(_, target)| groups.iter().any(|g| g.contains(target.as_str())))
            .map(|(role, _)| *role)
    }
}
