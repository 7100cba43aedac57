//! Identity-based access policy.
//!
//! The policy is loaded once at startup and immutable afterwards. Checks are
//! a linear first-match scan over the allow list: a rule applies when its
//! identities match the caller (both must match when both are set) and any
//! of its key patterns matches the target key. An empty allow list denies
//! everything.

use crate::config::{AccessConfig, IdentSpec};
use nix::unistd::{Group, User};

/// A resolved identity from the configuration.
///
/// `Unresolved` comes from a name the user/group database did not know at
/// load time; it never matches any caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ident {
    Id(u32),
    Unresolved,
}

/// A key pattern: an exact key, or every key underneath a dotted prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPattern {
    Exact(String),
    Subtree(String),
}

impl KeyPattern {
    /// Parses a pattern string. `a.b.*` matches all descendants of `a.b`
    /// (but not `a.b` itself); a bare `*` matches every key; anything else
    /// is an exact key.
    pub fn parse(pattern: &str) -> Self {
        if pattern == "*" {
            KeyPattern::Subtree(String::new())
        } else if let Some(prefix) = pattern.strip_suffix(".*") {
            KeyPattern::Subtree(prefix.to_owned())
        } else {
            KeyPattern::Exact(pattern.to_owned())
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyPattern::Exact(exact) => exact == key,
            KeyPattern::Subtree(prefix) if prefix.is_empty() => !key.is_empty(),
            KeyPattern::Subtree(prefix) => key
                .strip_prefix(prefix.as_str())
                .map(|rest| rest.starts_with('.') && rest.len() > 1)
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone)]
struct AccessRule {
    user: Option<Ident>,
    group: Option<Ident>,
    patterns: Vec<KeyPattern>,
}

impl AccessRule {
    fn matches(&self, uid: u32, gid: u32, key: &str) -> bool {
        if self.user.is_none() && self.group.is_none() {
            return false;
        }
        if let Some(user) = self.user {
            if user != Ident::Id(uid) {
                return false;
            }
        }
        if let Some(group) = self.group {
            if group != Ident::Id(gid) {
                return false;
            }
        }
        self.patterns.iter().any(|pattern| pattern.matches(key))
    }
}

/// The loaded allow list.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    rules: Vec<AccessRule>,
}

impl AccessPolicy {
    /// Builds the policy from configuration, resolving user and group names
    /// through the local databases.
    pub fn from_config(access: &AccessConfig) -> Self {
        let rules = access
            .allow
            .iter()
            .map(|entry| AccessRule {
                user: entry.user.as_ref().map(resolve_user),
                group: entry.group.as_ref().map(resolve_group),
                patterns: entry
                    .paths
                    .iter()
                    .map(|path| KeyPattern::parse(path))
                    .collect(),
            })
            .collect();
        Self { rules }
    }

    /// Returns whether the caller may access `key`.
    pub fn allows(&self, uid: u32, gid: u32, key: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(uid, gid, key))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn resolve_user(spec: &IdentSpec) -> Ident {
    match spec {
        IdentSpec::Id(id) => Ident::Id(*id),
        IdentSpec::Name(name) => match User::from_name(name) {
            Ok(Some(user)) => Ident::Id(user.uid.as_raw()),
            Ok(None) => {
                tracing::error!(name = %name, "failed to look up user name");
                Ident::Unresolved
            }
            Err(err) => {
                tracing::error!(name = %name, error = %err, "user database lookup failed");
                Ident::Unresolved
            }
        },
    }
}

fn resolve_group(spec: &IdentSpec) -> Ident {
    match spec {
        IdentSpec::Id(id) => Ident::Id(*id),
        IdentSpec::Name(name) => match Group::from_name(name) {
            Ok(Some(group)) => Ident::Id(group.gid.as_raw()),
            Ok(None) => {
                tracing::error!(name = %name, "failed to look up group name");
                Ident::Unresolved
            }
            Err(err) => {
                tracing::error!(name = %name, error = %err, "group database lookup failed");
                Ident::Unresolved
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AllowEntry;

    fn policy(entries: Vec<AllowEntry>) -> AccessPolicy {
        AccessPolicy::from_config(&AccessConfig { allow: entries })
    }

    fn user_rule(uid: u32, paths: &[&str]) -> AllowEntry {
        AllowEntry {
            user: Some(IdentSpec::Id(uid)),
            group: None,
            paths: paths.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_pattern_exact() {
        let pattern = KeyPattern::parse("net.hostname");
        assert!(pattern.matches("net.hostname"));
        assert!(!pattern.matches("net.hostname.v6"));
        assert!(!pattern.matches("net"));
    }

    #[test]
    fn test_pattern_subtree() {
        let pattern = KeyPattern::parse("a.b.*");
        assert!(pattern.matches("a.b.c"));
        assert!(pattern.matches("a.b.c.d"));
        // The subtree root itself is not a descendant.
        assert!(!pattern.matches("a.b"));
        assert!(!pattern.matches("a.bc"));
        assert!(!pattern.matches("a.b."));
        assert!(!pattern.matches("x.a.b.c"));
    }

    #[test]
    fn test_pattern_wildcard_all() {
        let pattern = KeyPattern::parse("*");
        assert!(pattern.matches("anything"));
        assert!(pattern.matches("a.b.c"));
        assert!(!pattern.matches(""));
    }

    #[test]
    fn test_empty_policy_denies_all() {
        let policy = policy(vec![]);
        assert!(!policy.allows(0, 0, "any.key"));
        assert!(policy.is_empty());
    }

    #[test]
    fn test_uid_rule() {
        let policy = policy(vec![user_rule(1000, &["net.*"])]);
        assert!(policy.allows(1000, 5, "net.hostname"));
        assert!(!policy.allows(1001, 5, "net.hostname"));
        assert!(!policy.allows(1000, 5, "sys.version"));
    }

    #[test]
    fn test_group_rule() {
        let policy = policy(vec![AllowEntry {
            user: None,
            group: Some(IdentSpec::Id(27)),
            paths: vec!["sys.version".into()],
        }]);
        assert!(policy.allows(9999, 27, "sys.version"));
        assert!(!policy.allows(9999, 28, "sys.version"));
    }

    #[test]
    fn test_both_identities_must_match() {
        let policy = policy(vec![AllowEntry {
            user: Some(IdentSpec::Id(1000)),
            group: Some(IdentSpec::Id(27)),
            paths: vec!["*".into()],
        }]);
        assert!(policy.allows(1000, 27, "k"));
        assert!(!policy.allows(1000, 28, "k"));
        assert!(!policy.allows(1001, 27, "k"));
    }

    #[test]
    fn test_first_match_wins_across_rules() {
        let policy = policy(vec![
            user_rule(1, &["a.*"]),
            user_rule(2, &["a.*", "b.*"]),
        ]);
        assert!(policy.allows(1, 0, "a.x"));
        assert!(!policy.allows(1, 0, "b.x"));
        assert!(policy.allows(2, 0, "b.x"));
    }

    #[test]
    fn test_unresolved_name_never_matches() {
        let policy = policy(vec![AllowEntry {
            user: Some(IdentSpec::Name(
                "no-such-user-confd-test-7f3a".to_string(),
            )),
            group: None,
            paths: vec!["*".into()],
        }]);
        // The rule loads but can never match any caller.
        assert_eq!(policy.len(), 1);
        for uid in [0, 1000, u32::MAX] {
            assert!(!policy.allows(uid, 0, "k"));
        }
    }
}
