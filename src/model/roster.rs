use itertools::Itertools;

/// Who is on the team, split into graded developers and managers.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Roster {
    pub developers: Vec<String>,
    pub managers: Vec<String>,
}

// Create
impl Roster {
    /// Managers listed among the members are not graded as developers.
    pub fn new(members: Vec<impl ToString>, managers: Vec<impl ToString>) -> Self {
        let managers = managers
            .iter()
            .map(|m| m.to_string())
            .unique()
            .collect::<Vec<_>>();
        let developers = members
            .iter()
            .map(|m| m.to_string())
            .filter(|m| !managers.contains(m))
            .unique()
            .collect();
        Self {
            developers,
            managers,
        }
    }
}

impl Roster {
    pub fn is_manager(&self, login: &str) -> bool {
        self.managers.iter().any(|m| m == login)
    }

    pub fn is_developer(&self, login: &str) -> bool {
        self.developers.iter().any(|d| d == login)
    }

    pub fn is_member(&self, login: &str) -> bool {
        self.is_developer(login) || self.is_manager(login)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn managers_are_removed_from_developers() {
        let roster = Roster::new(vec!["dev1", "lead", "dev2", "dev1"], vec!["lead", "prof"]);
        assert_eq!(roster.developers, vec!["dev1", "dev2"]);
        assert_eq!(roster.managers, vec!["lead", "prof"]);
        assert!(roster.is_manager("prof"));
        assert!(!roster.is_developer("lead"));
        assert!(roster.is_member("dev2"));
        assert!(!roster.is_member("outsider"));
    }
}
