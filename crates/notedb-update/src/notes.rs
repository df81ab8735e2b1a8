//! Note payloads stored in commit bodies.
//!
//! Every ref kind keeps a JSON document in the body of each commit:
//!
//! | Ref | Payload | Semantics |
//! |---|---|---|
//! | `meta` | [`ChangeNote`] | this commit's footers and published comments |
//! | `robot-comments` | [`RobotCommentNote`] | all robot comments so far |
//! | draft ref | [`DraftNote`] | all current drafts of one reviewer |

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use notedb_store::{CommitObject, StoreError};
use notedb_types::{AccountId, ObjectId};

use crate::error::{NoteParseError, UpdateError, UpdateResult};
use crate::inserter::InMemoryInserter;

/// An inline comment on a file of a patch set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub uuid: String,
    pub author: AccountId,
    pub patch_set: u32,
    pub file: String,
    pub line: Option<u32>,
    pub message: String,
    pub written_on_ms: u64,
}

/// A comment left by an automated reviewer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotComment {
    #[serde(flatten)]
    pub comment: Comment,
    pub robot_id: String,
    pub robot_run_id: String,
}

/// Note stored on each commit of a change's meta ref.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNote {
    pub footers: Vec<(String, String)>,
    pub comments: Vec<Comment>,
}

/// Note holding one reviewer's drafts on a change.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftNote {
    pub comments: Vec<Comment>,
}

/// Note holding every robot comment on a change.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotCommentNote {
    pub comments: Vec<RobotComment>,
}

/// Comment text left behind when a comment is removed from history.
pub fn removed_comment_message(deleted_by: &str, reason: &str) -> String {
    format!("Comment removed by: {deleted_by}; Reason: {reason}")
}

pub(crate) fn encode<T: Serialize>(note: &T) -> UpdateResult<String> {
    serde_json::to_string(note).map_err(|e| UpdateError::Store(StoreError::Serialization(e.to_string())))
}

pub(crate) fn decode<T: DeserializeOwned>(id: ObjectId, body: &str) -> Result<T, NoteParseError> {
    serde_json::from_str(body).map_err(|e| NoteParseError {
        id,
        reason: e.to_string(),
    })
}

/// Read a note commit. An object that exists but is not a commit is
/// reported as a parse failure rather than a store failure.
pub(crate) fn read_commit(ins: &InMemoryInserter, id: ObjectId) -> UpdateResult<CommitObject> {
    match ins.read_commit(&id) {
        Ok(commit) => Ok(commit),
        Err(StoreError::CorruptObject { id, reason }) => Err(NoteParseError { id, reason }.into()),
        Err(e) => Err(e.into()),
    }
}

/// Read the commit at `id` and decode its note.
pub(crate) fn read_note<T: DeserializeOwned>(
    ins: &InMemoryInserter,
    id: ObjectId,
) -> UpdateResult<(CommitObject, T)> {
    let commit = read_commit(ins, id)?;
    let note = decode(id, &commit.body)?;
    Ok((commit, note))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn robot_comment_flattens_base_fields() {
        let rc = RobotComment {
            comment: Comment {
                uuid: "c1".into(),
                author: AccountId(5),
                patch_set: 1,
                file: "src/lib.rs".into(),
                line: Some(3),
                message: "lint".into(),
                written_on_ms: 10,
            },
            robot_id: "clippy".into(),
            robot_run_id: "run-1".into(),
        };
        let json: serde_json::Value = serde_json::from_str(&encode(&rc).unwrap()).unwrap();
        assert_eq!(json["uuid"], "c1");
        assert_eq!(json["robot_id"], "clippy");
    }

    #[test]
    fn decode_failure_names_commit() {
        let id = ObjectId::from_bytes(b"c");
        let err = decode::<DraftNote>(id, "not json").unwrap_err();
        assert_eq!(err.id, id);
    }

    #[test]
    fn removal_message() {
        assert_eq!(
            removed_comment_message("Admin", "spam"),
            "Comment removed by: Admin; Reason: spam"
        );
    }
}
