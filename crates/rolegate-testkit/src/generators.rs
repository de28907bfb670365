//! Proptest generators for property-based testing.

use std::collections::BTreeSet;

use proptest::prelude::*;

use rolegate_core::Codename;

/// Generate a valid codename.
pub fn codename() -> impl Strategy<Value = Codename> {
    "[a-z][a-z0-9_]{0,29}".prop_filter_map("valid codename", |raw| Codename::new(raw).ok())
}

/// Generate a set of distinct codenames.
pub fn codenames(max: usize) -> impl Strategy<Value = Vec<Codename>> {
    prop::collection::btree_set(codename(), 1..=max).prop_map(|set| set.into_iter().collect())
}

/// A random role graph: users, roles, a codename catalog, and the grant and
/// assignment edges between them, all by index.
#[derive(Debug, Clone)]
pub struct GrantGraph {
    pub users: usize,
    pub roles: usize,
    pub codenames: Vec<Codename>,
    /// `(role index, codename index)`, no duplicates.
    pub grants: Vec<(usize, usize)>,
    /// `(user index, role index)`, no duplicates.
    pub assignments: Vec<(usize, usize)>,
}

impl GrantGraph {
    /// Reference answer: does user `user` reach codename `perm` through
    /// any assigned role?
    pub fn holds(&self, user: usize, perm: usize) -> bool {
        self.assignments
            .iter()
            .filter(|&&(u, _)| u == user)
            .any(|&(_, role)| self.grants.contains(&(role, perm)))
    }
}

impl Arbitrary for GrantGraph {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (1usize..=4, 0usize..=4, codenames(6))
            .prop_flat_map(|(users, roles, codenames)| {
                let perms = codenames.len();
                let grants = if roles == 0 {
                    Just(BTreeSet::new()).boxed()
                } else {
                    prop::collection::btree_set((0..roles, 0..perms), 0..=roles * perms).boxed()
                };
                let assignments = if roles == 0 {
                    Just(BTreeSet::new()).boxed()
                } else {
                    prop::collection::btree_set((0..users, 0..roles), 0..=users * roles).boxed()
                };
                (Just(users), Just(roles), Just(codenames), grants, assignments)
            })
            .prop_map(|(users, roles, codenames, grants, assignments)| GrantGraph {
                users,
                roles,
                codenames,
                grants: grants.into_iter().collect(),
                assignments: assignments.into_iter().collect(),
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_graph_indices_in_range(graph: GrantGraph) {
            for &(role, perm) in &graph.grants {
                prop_assert!(role < graph.roles);
                prop_assert!(perm < graph.codenames.len());
            }
            for &(user, role) in &graph.assignments {
                prop_assert!(user < graph.users);
                prop_assert!(role < graph.roles);
            }
        }

        #[test]
        fn test_generated_codenames_parse(c in codename()) {
            prop_assert!(Codename::new(c.as_str()).is_ok());
        }
    }

    #[test]
    fn test_holds_follows_edges() {
        let graph = GrantGraph {
            users: 2,
            roles: 2,
            codenames: vec![
                Codename::new("a_view").unwrap(),
                Codename::new("b_view").unwrap(),
            ],
            grants: vec![(0, 0), (1, 1)],
            assignments: vec![(0, 1)],
        };
        assert!(graph.holds(0, 1));
        assert!(!graph.holds(0, 0));
        assert!(!graph.holds(1, 1));
    }
}
