//! Author identity clustering and cohort split.
//!
//! Commits are attributed to identity clusters in a single greedy pass:
//! a (name, email) pair joins the first existing cluster that already
//! knows the name OR the email, otherwise it founds a new cluster. Two
//! clusters are never merged after creation, so an author who used three
//! variants can be split if the linking variant shows up late.

use gitlore_core::{AuthorConfig, CohortStrategy};
use serde::{Deserialize, Serialize};

/// A cluster of name/email variants believed to belong to one author.
///
/// The first name and email are canonical and never change; later
/// variants are appended once each.
///
/// # Examples
///
/// ```
/// use gitlore_mining::authors::AuthorIdentity;
///
/// let identity = AuthorIdentity::new("Alice", "alice@example.com", 0);
/// assert_eq!(identity.name(), "Alice");
/// assert!(identity.matches("alice", "alice@example.com"));
/// assert!(!identity.matches("bob", "bob@example.com"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorIdentity {
    names: Vec<String>,
    emails: Vec<String>,
    commit_indices: Vec<usize>,
}

impl AuthorIdentity {
    /// Found a cluster from its first observed commit.
    pub fn new(name: &str, email: &str, commit_index: usize) -> Self {
        Self {
            names: vec![name.to_string()],
            emails: vec![email.to_string()],
            commit_indices: vec![commit_index],
        }
    }

    /// Canonical name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.names[0]
    }

    /// Canonical email.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.emails[0]
    }

    /// Names seen after the canonical one, in order of appearance.
    #[must_use]
    pub fn other_names(&self) -> &[String] {
        &self.names[1..]
    }

    /// Emails seen after the canonical one, in order of appearance.
    #[must_use]
    pub fn other_emails(&self) -> &[String] {
        &self.emails[1..]
    }

    /// Indices of the attributed commits, in attribution order.
    #[must_use]
    pub fn commit_indices(&self) -> &[usize] {
        &self.commit_indices
    }

    /// Number of attributed commits.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.commit_indices.len()
    }

    /// Index of the commit that founded the cluster.
    #[must_use]
    pub fn first_commit_index(&self) -> usize {
        self.commit_indices[0]
    }

    /// Loose equality: shares the name OR the email.
    #[must_use]
    pub fn matches(&self, name: &str, email: &str) -> bool {
        self.names.iter().any(|n| n == name) || self.emails.iter().any(|e| e == email)
    }

    fn absorb(&mut self, name: &str, email: &str, commit_index: usize) {
        if !self.names.iter().any(|n| n == name) {
            self.names.push(name.to_string());
        }
        if !self.emails.iter().any(|e| e == email) {
            self.emails.push(email.to_string());
        }
        self.commit_indices.push(commit_index);
    }

    /// Output representation.
    #[must_use]
    pub fn description(&self) -> AuthorDescription {
        AuthorDescription {
            email: self.email().to_string(),
            name: self.name().to_string(),
            other_names: self.other_names().to_vec(),
            other_emails: self.other_emails().to_vec(),
            commits: self.commit_indices.clone(),
        }
    }
}

/// Serialized form of an [`AuthorIdentity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorDescription {
    /// Canonical email.
    pub email: String,
    /// Canonical name.
    pub name: String,
    /// Additional names, canonical excluded.
    pub other_names: Vec<String>,
    /// Additional emails, canonical excluded.
    pub other_emails: Vec<String>,
    /// Indices into the final, time-sorted commit list.
    pub commits: Vec<usize>,
}

/// Incremental, first-match-wins identity clustering.
///
/// # Examples
///
/// ```
/// use gitlore_mining::authors::IdentityResolver;
///
/// let mut resolver = IdentityResolver::new();
/// let a = resolver.resolve("Alice", "alice@example.com", 0);
/// let b = resolver.resolve("alice", "alice@example.com", 1);
/// let c = resolver.resolve("Bob", "bob@example.com", 2);
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// assert_eq!(resolver.identities()[a].other_names(), ["alice"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    identities: Vec<AuthorIdentity>,
}

impl IdentityResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute a commit and return the id of the identity it resolved to.
    ///
    /// Clusters are scanned in creation order and the first loose match
    /// wins, even if a later cluster would also match.
    pub fn resolve(&mut self, name: &str, email: &str, commit_index: usize) -> usize {
        if let Some(id) = self.find(name, email) {
            self.identities[id].absorb(name, email, commit_index);
            return id;
        }
        self.identities.push(AuthorIdentity::new(name, email, commit_index));
        self.identities.len() - 1
    }

    /// Id of the first identity loosely matching the pair, without attributing anything.
    #[must_use]
    pub fn find(&self, name: &str, email: &str) -> Option<usize> {
        self.identities
            .iter()
            .position(|identity| identity.matches(name, email))
    }

    /// Identities in creation order; ids index into this slice.
    #[must_use]
    pub fn identities(&self) -> &[AuthorIdentity] {
        &self.identities
    }

    /// Consume the resolver, keeping creation order.
    #[must_use]
    pub fn into_identities(self) -> Vec<AuthorIdentity> {
        self.identities
    }
}

/// Identity ids split into two disjoint cohorts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cohorts {
    /// Frequent committers, ordered by first commit index.
    pub main: Vec<usize>,
    /// Everyone else, ordered by first commit index.
    pub long_tail: Vec<usize>,
}

/// Partition identities into main and long-tail cohorts.
///
/// Identities are ranked ascending by commit count (ties keep creation
/// order). With [`CohortStrategy::Count`] the top `main_cohort_size`
/// form the main cohort; with [`CohortStrategy::Percentile`] the bottom
/// `long_tail_fraction` are the long tail.
///
/// # Examples
///
/// ```
/// use gitlore_core::AuthorConfig;
/// use gitlore_mining::authors::{split_cohorts, IdentityResolver};
///
/// let mut resolver = IdentityResolver::new();
/// resolver.resolve("a", "a@x", 0);
/// resolver.resolve("b", "b@x", 1);
/// let cohorts = split_cohorts(resolver.identities(), &AuthorConfig::default());
/// assert_eq!(cohorts.main, vec![0, 1]);
/// assert!(cohorts.long_tail.is_empty());
/// ```
pub fn split_cohorts(identities: &[AuthorIdentity], config: &AuthorConfig) -> Cohorts {
    let mut ranked: Vec<usize> = (0..identities.len()).collect();
    ranked.sort_by_key(|&id| identities[id].commit_count());

    let boundary = match config.strategy {
        CohortStrategy::Count => ranked.len().saturating_sub(config.main_cohort_size),
        CohortStrategy::Percentile => {
            ((ranked.len() as f64 * config.long_tail_fraction).floor() as usize).min(ranked.len())
        }
    };

    let by_first_commit = |ids: &[usize]| {
        let mut ids = ids.to_vec();
        ids.sort_by_key(|&id| identities[id].first_commit_index());
        ids
    };

    Cohorts {
        main: by_first_commit(&ranked[boundary..]),
        long_tail: by_first_commit(&ranked[..boundary]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_email_links_name_variants() {
        let mut resolver = IdentityResolver::new();
        let first = resolver.resolve("Alice Smith", "alice@example.com", 3);
        let second = resolver.resolve("asmith", "alice@example.com", 1);
        let third = resolver.resolve("asmith", "alice@work.example", 0);

        assert_eq!(first, second);
        assert_eq!(second, third);
        let identity = &resolver.identities()[first];
        assert_eq!(identity.name(), "Alice Smith");
        assert_eq!(identity.email(), "alice@example.com");
        assert_eq!(identity.other_names(), ["asmith"]);
        assert_eq!(identity.other_emails(), ["alice@work.example"]);
        assert_eq!(identity.commit_indices(), [3, 1, 0]);
    }

    #[test]
    fn first_match_wins_and_clusters_never_merge() {
        let mut resolver = IdentityResolver::new();
        let a = resolver.resolve("alice", "alice@a.example", 0);
        let b = resolver.resolve("alice2", "alice@b.example", 1);
        // Links both clusters, but only the first one absorbs it.
        let c = resolver.resolve("alice", "alice@b.example", 2);

        assert_ne!(a, b);
        assert_eq!(c, a);
        assert_eq!(resolver.identities().len(), 2);
        assert_eq!(resolver.identities()[a].other_emails(), ["alice@b.example"]);
        assert_eq!(resolver.identities()[b].commit_indices(), [1]);
    }

    #[test]
    fn repeated_pair_adds_no_variants() {
        let mut resolver = IdentityResolver::new();
        for i in 0..5 {
            resolver.resolve("bob", "bob@example.com", i);
        }
        let identity = &resolver.identities()[0];
        assert!(identity.other_names().is_empty());
        assert!(identity.other_emails().is_empty());
        assert_eq!(identity.commit_count(), 5);
    }

    #[test]
    fn find_does_not_attribute() {
        let mut resolver = IdentityResolver::new();
        resolver.resolve("bob", "bob@example.com", 0);
        assert_eq!(resolver.find("bob", "other@example.com"), Some(0));
        assert_eq!(resolver.find("carol", "carol@example.com"), None);
        assert_eq!(resolver.identities()[0].commit_count(), 1);
    }

    #[test]
    fn description_matches_identity() {
        let mut resolver = IdentityResolver::new();
        resolver.resolve("bob", "bob@example.com", 4);
        resolver.resolve("Bob B", "bob@example.com", 2);
        let desc = resolver.identities()[0].description();
        assert_eq!(desc.name, "bob");
        assert_eq!(desc.email, "bob@example.com");
        assert_eq!(desc.other_names, vec!["Bob B"]);
        assert!(desc.other_emails.is_empty());
        assert_eq!(desc.commits, vec![4, 2]);
    }

    /// Identity `i` gets `counts[i]` commits; its first commit index is `i * 100`.
    fn identities_with_counts(counts: &[usize]) -> Vec<AuthorIdentity> {
        let mut resolver = IdentityResolver::new();
        for (i, &count) in counts.iter().enumerate() {
            for c in 0..count {
                resolver.resolve(&format!("dev{i}"), &format!("dev{i}@example.com"), i * 100 + c);
            }
        }
        resolver.into_identities()
    }

    #[test]
    fn count_strategy_keeps_top_fourteen() {
        let counts: Vec<usize> = (1..=20).collect();
        let identities = identities_with_counts(&counts);
        let cohorts = split_cohorts(&identities, &AuthorConfig::default());

        assert_eq!(cohorts.main.len(), 14);
        assert_eq!(cohorts.long_tail, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(cohorts.main, (6..20).collect::<Vec<_>>());
    }

    #[test]
    fn count_strategy_with_few_authors_keeps_everyone() {
        let identities = identities_with_counts(&[3, 1, 2]);
        let cohorts = split_cohorts(&identities, &AuthorConfig::default());
        assert_eq!(cohorts.main, vec![0, 1, 2]);
        assert!(cohorts.long_tail.is_empty());
    }

    #[test]
    fn cohorts_are_ordered_by_first_commit() {
        // Highest count first, so the ascending rank order differs from creation order.
        let identities = identities_with_counts(&[5, 1, 3]);
        let config = AuthorConfig {
            main_cohort_size: 2,
            ..AuthorConfig::default()
        };
        let cohorts = split_cohorts(&identities, &config);
        assert_eq!(cohorts.main, vec![0, 2]);
        assert_eq!(cohorts.long_tail, vec![1]);
    }

    #[test]
    fn percentile_strategy_moves_bottom_tenth() {
        let counts: Vec<usize> = (1..=20).collect();
        let identities = identities_with_counts(&counts);
        let config = AuthorConfig {
            strategy: CohortStrategy::Percentile,
            ..AuthorConfig::default()
        };
        let cohorts = split_cohorts(&identities, &config);
        assert_eq!(cohorts.long_tail, vec![0, 1]);
        assert_eq!(cohorts.main.len(), 18);
    }

    #[test]
    fn no_identities_gives_empty_cohorts() {
        let cohorts = split_cohorts(&[], &AuthorConfig::default());
        assert_eq!(cohorts, Cohorts::default());
    }
}
