use crate::approvals::normalize_key;
use crate::domain::approval::{ApprovalConfig, ApproverType};
use crate::domain::team::TeamMember;

pub const PROJECT_MANAGER_ROLE: &str = "Project Manager";
pub const ADMIN_ROLE: &str = "Admin";
pub const DEFAULT_DEPARTMENT_HEAD_ROLE: &str = "head";
pub const DEFAULT_AVATAR_BASE_URL: &str = "https://ui-avatars.com/api/";

/// Resolves an approval step to a concrete team member.
///
/// Resolution never fails: roster lookups fall back to the first member, and
/// client/external steps (or an empty roster) get a synthetic placeholder.
#[derive(Clone, Copy, Debug)]
pub struct ApproverResolver<'a> {
    roster: &'a [TeamMember],
    avatar_base_url: &'a str,
}

impl<'a> ApproverResolver<'a> {
    pub fn new(roster: &'a [TeamMember], avatar_base_url: &'a str) -> Self {
        Self { roster, avatar_base_url }
    }

    pub fn resolve(&self, config: &ApprovalConfig) -> TeamMember {
        match config.approver_type {
            ApproverType::DepartmentHead => {
                let role = config
                    .approver_role
                    .as_deref()
                    .filter(|role| !role.trim().is_empty())
                    .unwrap_or(DEFAULT_DEPARTMENT_HEAD_ROLE);
                let needle = normalize_key(role);
                self.first_or_fallback(|member| normalize_key(&member.role).contains(&needle))
            }
            ApproverType::ProjectManager => self.first_with_role(PROJECT_MANAGER_ROLE),
            ApproverType::Admin => self.first_with_role(ADMIN_ROLE),
            ApproverType::SpecificUser => match config.approver_user_id.as_deref() {
                Some(user_id) => self.first_or_fallback(|member| member.id == user_id),
                None => self.fallback(),
            },
            ApproverType::Client => self.placeholder("client-approver", "Client", "Client"),
            ApproverType::External => {
                self.placeholder("external-approver", "External Approver", "External")
            }
        }
    }

    pub fn find_member(&self, user_id: &str) -> Option<&'a TeamMember> {
        self.roster.iter().find(|member| member.id == user_id)
    }

    fn first_with_role(&self, role: &str) -> TeamMember {
        let role = normalize_key(role);
        self.first_or_fallback(|member| normalize_key(&member.role) == role)
    }

    fn first_or_fallback<P>(&self, predicate: P) -> TeamMember
    where
        P: Fn(&TeamMember) -> bool,
    {
        self.roster.iter().find(|member| predicate(member)).cloned().unwrap_or_else(|| self.fallback())
    }

    fn fallback(&self) -> TeamMember {
        self.roster.first().cloned().unwrap_or_else(|| {
            self.placeholder("unassigned-approver", "Unassigned Approver", "Unassigned")
        })
    }

    fn placeholder(&self, id: &str, name: &str, role: &str) -> TeamMember {
        TeamMember::new(id, name, role, self.avatar_url(name))
    }

    fn avatar_url(&self, name: &str) -> String {
        let base = self.avatar_base_url.trim_end_matches(['?', '&']);
        format!("{base}?name={}&background=random", name.replace(' ', "+"))
    }
}

#[cfg(test)]
mod tests {
    use super::{ApproverResolver, DEFAULT_AVATAR_BASE_URL};
    use crate::domain::approval::ApproverType;
    use crate::test_support::{config, roster};

    #[test]
    fn department_head_matches_role_substring_case_insensitively() {
        let roster = roster();
        let resolver = ApproverResolver::new(&roster, DEFAULT_AVATAR_BASE_URL);
        let mut step = config(0, ApproverType::DepartmentHead);
        step.approver_role = Some("DESIGN".to_string());

        assert_eq!(resolver.resolve(&step).id, "u-design-head");
    }

    #[test]
    fn department_head_without_role_looks_for_any_head() {
        let roster = roster();
        let resolver = ApproverResolver::new(&roster, DEFAULT_AVATAR_BASE_URL);
        let step = config(0, ApproverType::DepartmentHead);

        assert_eq!(resolver.resolve(&step).id, "u-design-head");
    }

    #[test]
    fn project_manager_and_admin_match_exact_role_labels() {
        let roster = roster();
        let resolver = ApproverResolver::new(&roster, DEFAULT_AVATAR_BASE_URL);

        assert_eq!(resolver.resolve(&config(0, ApproverType::ProjectManager)).id, "u-pm");
        assert_eq!(resolver.resolve(&config(0, ApproverType::Admin)).id, "u-admin");
    }

    #[test]
    fn specific_user_matches_by_id() {
        let roster = roster();
        let resolver = ApproverResolver::new(&roster, DEFAULT_AVATAR_BASE_URL);
        let mut step = config(0, ApproverType::SpecificUser);
        step.approver_user_id = Some("u-admin".to_string());

        assert_eq!(resolver.resolve(&step).id, "u-admin");
    }

    #[test]
    fn unmatched_role_falls_back_to_first_roster_member() {
        let roster = roster();
        let resolver = ApproverResolver::new(&roster, DEFAULT_AVATAR_BASE_URL);
        let mut step = config(0, ApproverType::DepartmentHead);
        step.approver_role = Some("Procurement".to_string());
        let mut unknown_user = config(1, ApproverType::SpecificUser);
        unknown_user.approver_user_id = Some("u-missing".to_string());

        assert_eq!(resolver.resolve(&step), roster[0]);
        assert_eq!(resolver.resolve(&unknown_user), roster[0]);
    }

    #[test]
    fn client_and_external_get_synthetic_placeholders() {
        let roster = roster();
        let resolver = ApproverResolver::new(&roster, "https://avatars.example.test/api/");

        let client = resolver.resolve(&config(0, ApproverType::Client));
        assert_eq!(client.id, "client-approver");
        assert_eq!(client.avatar, "https://avatars.example.test/api/?name=Client&background=random");

        let external = resolver.resolve(&config(0, ApproverType::External));
        assert_eq!(external.id, "external-approver");
        assert!(external.avatar.contains("name=External+Approver"));
    }

    #[test]
    fn empty_roster_yields_unassigned_placeholder() {
        let resolver = ApproverResolver::new(&[], DEFAULT_AVATAR_BASE_URL);
        let resolved = resolver.resolve(&config(0, ApproverType::ProjectManager));

        assert_eq!(resolved.id, "unassigned-approver");
        assert!(!resolved.avatar.is_empty());
    }
}
