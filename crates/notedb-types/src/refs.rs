//! Ref name scheme for change metadata.
//!
//! Changes are sharded by the last two digits of their id so that no single
//! ref directory grows without bound:
//!
//! - `refs/changes/34/1234/meta` holds the change history (project repo)
//! - `refs/changes/34/1234/robot-comments` holds robot comments (project repo)
//! - `refs/draft-comments/34/1234/1000001` holds one reviewer's drafts
//!   (All-Users repo)

use crate::ids::{AccountId, ChangeId};

/// Namespace of per-change refs in project repositories.
pub const REFS_CHANGES: &str = "refs/changes/";
/// Namespace of draft comment refs in All-Users.
pub const REFS_DRAFT_COMMENTS: &str = "refs/draft-comments/";
pub const META_SUFFIX: &str = "meta";
pub const ROBOT_COMMENTS_SUFFIX: &str = "robot-comments";

/// Only meaningful for positive ids; see [`ChangeId::is_valid`].
fn shard(id: ChangeId) -> String {
    format!("{:02}/{}", id.get().rem_euclid(100), id.get())
}

/// `refs/changes/NN/ID/`
pub fn change_ref_prefix(id: ChangeId) -> String {
    format!("{REFS_CHANGES}{}/", shard(id))
}

/// `refs/changes/NN/ID/meta`
pub fn change_meta_ref(id: ChangeId) -> String {
    format!("{}{META_SUFFIX}", change_ref_prefix(id))
}

/// `refs/changes/NN/ID/robot-comments`
pub fn robot_comments_ref(id: ChangeId) -> String {
    format!("{}{ROBOT_COMMENTS_SUFFIX}", change_ref_prefix(id))
}

/// `refs/draft-comments/NN/ID/`
pub fn draft_comments_prefix(id: ChangeId) -> String {
    format!("{REFS_DRAFT_COMMENTS}{}/", shard(id))
}

/// `refs/draft-comments/NN/ID/ACCOUNT`
pub fn draft_comments_ref(id: ChangeId, account: AccountId) -> String {
    format!("{}{account}", draft_comments_prefix(id))
}

/// Parse `NN/ID` and check the shard agrees with the id.
fn parse_shard(shard_part: &str, id_part: &str) -> Option<ChangeId> {
    let id: ChangeId = id_part.parse().ok()?;
    let expected = format!("{:02}", id.get() % 100);
    (shard_part == expected).then_some(id)
}

/// Change id of any ref under `refs/changes/NN/ID/`.
pub fn change_id_from_ref(name: &str) -> Option<ChangeId> {
    let rest = name.strip_prefix(REFS_CHANGES)?;
    let mut parts = rest.splitn(3, '/');
    let shard_part = parts.next()?;
    let id_part = parts.next()?;
    parts.next()?;
    parse_shard(shard_part, id_part)
}

/// Returns the change id if `name` is exactly the meta ref of that change.
pub fn meta_ref_change_id(name: &str) -> Option<ChangeId> {
    let id = change_id_from_ref(name)?;
    (name == change_meta_ref(id)).then_some(id)
}

/// Split a draft ref into its change and account.
pub fn parse_draft_ref(name: &str) -> Option<(ChangeId, AccountId)> {
    let rest = name.strip_prefix(REFS_DRAFT_COMMENTS)?;
    let parts: Vec<&str> = rest.split('/').collect();
    let [shard_part, id_part, account_part] = parts.as_slice() else {
        return None;
    };
    let change = parse_shard(shard_part, id_part)?;
    let account = account_part.parse().ok()?;
    Some((change, account))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_ref_layout() {
        assert_eq!(change_meta_ref(ChangeId(1234)), "refs/changes/34/1234/meta");
        assert_eq!(change_meta_ref(ChangeId(5)), "refs/changes/05/5/meta");
        assert_eq!(
            robot_comments_ref(ChangeId(100)),
            "refs/changes/00/100/robot-comments"
        );
    }

    #[test]
    fn draft_ref_layout() {
        assert_eq!(
            draft_comments_ref(ChangeId(1234), AccountId(1000001)),
            "refs/draft-comments/34/1234/1000001"
        );
        assert_eq!(
            draft_comments_prefix(ChangeId(7)),
            "refs/draft-comments/07/7/"
        );
    }

    #[test]
    fn parse_meta_refs() {
        assert_eq!(
            meta_ref_change_id("refs/changes/34/1234/meta"),
            Some(ChangeId(1234))
        );
        assert_eq!(meta_ref_change_id("refs/changes/34/1234/robot-comments"), None);
        assert_eq!(meta_ref_change_id("refs/changes/35/1234/meta"), None);
        assert_eq!(meta_ref_change_id("refs/heads/master"), None);
        assert_eq!(
            change_id_from_ref("refs/changes/34/1234/robot-comments"),
            Some(ChangeId(1234))
        );
    }

    #[test]
    fn parse_draft_refs() {
        assert_eq!(
            parse_draft_ref("refs/draft-comments/34/1234/1000001"),
            Some((ChangeId(1234), AccountId(1000001)))
        );
        assert_eq!(parse_draft_ref("refs/draft-comments/34/1234"), None);
        assert_eq!(parse_draft_ref("refs/draft-comments/33/1234/1"), None);
        assert_eq!(parse_draft_ref("refs/draft-comments/34/1234/x"), None);
        assert_eq!(parse_draft_ref("refs/changes/34/1234/meta"), None);
    }
}
