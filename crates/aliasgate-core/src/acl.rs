//! Read-ACL diffing.
//!
//! An ACL is a comma-separated list of `account[:user]` grants. Only the
//! account part matters for shadow containers, so both sides are reduced to
//! account sets before diffing.

use std::collections::BTreeSet;

use aliasgate_model::AccountId;

/// Parse an ACL string into the set of granted accounts.
///
/// The empty string is kept as a (degenerate) member: `""` parses to `{""}`.
///
/// ```
/// use aliasgate_core::acl::parse_acl_accounts;
///
/// let accounts = parse_acl_accounts("a1:u1,a1,a2:u1");
/// assert_eq!(accounts.len(), 2);
/// ```
#[must_use]
pub fn parse_acl_accounts(acl: &str) -> BTreeSet<AccountId> {
    acl.split(',').map(AccountId::from_acl_entry).collect()
}

/// Accounts gained and lost between two versions of a read ACL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclDiff {
    /// Accounts present in the new ACL only.
    pub added: BTreeSet<AccountId>,
    /// Accounts present in the old ACL only.
    pub removed: BTreeSet<AccountId>,
}

impl AclDiff {
    /// Diff two ACL strings.
    #[must_use]
    pub fn between(old_acl: &str, new_acl: &str) -> Self {
        let old = parse_acl_accounts(old_acl);
        let new = parse_acl_accounts(new_acl);
        Self {
            added: new.difference(&old).cloned().collect(),
            removed: old.difference(&new).cloned().collect(),
        }
    }

    /// Whether the ACL change grants or revokes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(accounts: &[&str]) -> BTreeSet<AccountId> {
        accounts.iter().map(|a| AccountId::new(*a)).collect()
    }

    #[test]
    fn test_should_detect_added_account() {
        let diff = AclDiff::between("u1", "u1,u2");
        assert_eq!(diff.added, set(&["u2"]));
        assert!(diff.removed.is_empty());
    }

    #[test]
    fn test_should_detect_added_and_removed_accounts() {
        let diff = AclDiff::between("account1:user,account3", "account1,account2:user");
        assert_eq!(diff.added, set(&["account2"]));
        assert_eq!(diff.removed, set(&["account3"]));
    }

    #[test]
    fn test_should_return_empty_diff_for_identical_acl() {
        for acl in ["", "a", "a:u,b", "b,a:u"] {
            assert!(AclDiff::between(acl, acl).is_empty());
        }
        assert!(AclDiff::between("a:u1,b", "b:u2,a").is_empty());
    }

    #[test]
    fn test_should_keep_empty_account_as_member() {
        assert_eq!(parse_acl_accounts(""), set(&[""]));
        let diff = AclDiff::between("", "a");
        assert_eq!(diff.added, set(&["a"]));
        assert_eq!(diff.removed, set(&[""]));
    }

    #[test]
    fn test_should_partition_union_of_accounts() {
        let cases = [
            ("", ""),
            ("a,b", "b,c"),
            ("a:u,a:v", "a"),
            ("x,y,z", ""),
            ("", "p:q,r"),
            ("a,b,c", "c,d,e,a"),
        ];
        for (old_acl, new_acl) in cases {
            let old = parse_acl_accounts(old_acl);
            let new = parse_acl_accounts(new_acl);
            let diff = AclDiff::between(old_acl, new_acl);

            assert!(diff.added.is_disjoint(&diff.removed));

            let kept: BTreeSet<_> = old.intersection(&new).cloned().collect();
            let mut covered = diff.added.clone();
            covered.extend(diff.removed.iter().cloned());
            covered.extend(kept);
            let all: BTreeSet<_> = old.union(&new).cloned().collect();
            assert_eq!(covered, all, "old={old_acl:?} new={new_acl:?}");
        }
    }
}
