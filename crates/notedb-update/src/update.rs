//! Delta producers.
//!
//! Each producer targets one ref and knows how to turn the ref's current tip
//! into a new tip. The manager groups producers by ref and threads the tip
//! through every producer of a group in the order they were added:
//!
//! - [`ChangeUpdate`] appends to a change's `meta` ref and may fan out into a
//!   draft update, a robot-comment update and a rewrite;
//! - [`ChangeDraftUpdate`] replaces one reviewer's draft set in All-Users;
//! - [`RobotCommentUpdate`] appends to the change's `robot-comments` ref;
//! - [`DeleteCommentRewriter`] rebuilds an existing history with one comment
//!   redacted.

use notedb_store::CommitObject;
use notedb_types::{refs, AccountId, ChangeId, ObjectId, PersonIdent, ProjectName};

use crate::error::{UpdateError, UpdateResult};
use crate::inserter::InMemoryInserter;
use crate::notes::{
    self, removed_comment_message, ChangeNote, Comment, DraftNote, RobotComment, RobotCommentNote,
};
use crate::state::ChangeRecord;

/// Which ref group an update belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    Change,
    Draft,
    RobotComment,
    Rewrite,
}

/// Any producer the manager can stage.
#[derive(Clone, Debug)]
pub enum NoteDbUpdate {
    Change(ChangeUpdate),
    Draft(ChangeDraftUpdate),
    RobotComment(RobotCommentUpdate),
    Rewrite(DeleteCommentRewriter),
}

impl NoteDbUpdate {
    pub fn kind(&self) -> UpdateKind {
        match self {
            Self::Change(_) => UpdateKind::Change,
            Self::Draft(_) => UpdateKind::Draft,
            Self::RobotComment(_) => UpdateKind::RobotComment,
            Self::Rewrite(_) => UpdateKind::Rewrite,
        }
    }

    pub fn change(&self) -> &ChangeRecord {
        match self {
            Self::Change(u) => &u.change,
            Self::Draft(u) => &u.change,
            Self::RobotComment(u) => &u.change,
            Self::Rewrite(u) => &u.change,
        }
    }

    pub fn change_id(&self) -> ChangeId {
        self.change().id()
    }

    /// Ref this update writes.
    pub fn ref_name(&self) -> String {
        match self {
            Self::Change(u) => u.ref_name(),
            Self::Draft(u) => u.ref_name(),
            Self::RobotComment(u) => u.ref_name(),
            Self::Rewrite(u) => u.ref_name().to_string(),
        }
    }

    /// Account whose drafts a draft update touches.
    pub fn account_id(&self) -> Option<AccountId> {
        match self {
            Self::Change(u) => Some(u.account_id),
            Self::Draft(u) => Some(u.account_id),
            Self::RobotComment(_) | Self::Rewrite(_) => None,
        }
    }

    /// Whether this producer may create its ref when it does not exist yet.
    pub fn allow_write_to_new_ref(&self) -> bool {
        match self {
            Self::Change(u) => u.allow_write_to_new_ref,
            Self::Draft(_) | Self::RobotComment(_) => true,
            Self::Rewrite(_) => false,
        }
    }

    /// Compute the next tip from `curr` (zero if the ref does not exist).
    /// `Ok(None)` means nothing to write; `Ok(Some(zero))` deletes the ref.
    pub fn apply(
        &self,
        ins: &mut InMemoryInserter,
        curr: ObjectId,
    ) -> UpdateResult<Option<ObjectId>> {
        match self {
            Self::Change(u) => u.apply(ins, curr),
            Self::Draft(u) => u.apply(ins, curr),
            Self::RobotComment(u) => u.apply(ins, curr),
            Self::Rewrite(_) => Err(UpdateError::IllegalState(format!(
                "rewriter for {} must be staged as a rewrite",
                self.ref_name()
            ))),
        }
    }

    /// Rebuild the history ending at `curr`.
    pub fn rewrite(
        &self,
        ins: &mut InMemoryInserter,
        curr: ObjectId,
    ) -> UpdateResult<Option<ObjectId>> {
        match self {
            Self::Rewrite(r) => r.rewrite(ins, curr),
            _ => Err(UpdateError::IllegalState(format!(
                "{:?} update for {} cannot rewrite history",
                self.kind(),
                self.ref_name()
            ))),
        }
    }
}

impl From<ChangeUpdate> for NoteDbUpdate {
    fn from(u: ChangeUpdate) -> Self {
        Self::Change(u)
    }
}

impl From<ChangeDraftUpdate> for NoteDbUpdate {
    fn from(u: ChangeDraftUpdate) -> Self {
        Self::Draft(u)
    }
}

impl From<RobotCommentUpdate> for NoteDbUpdate {
    fn from(u: RobotCommentUpdate) -> Self {
        Self::RobotComment(u)
    }
}

impl From<DeleteCommentRewriter> for NoteDbUpdate {
    fn from(r: DeleteCommentRewriter) -> Self {
        Self::Rewrite(r)
    }
}

fn new_commit(
    ident: &PersonIdent,
    parent: ObjectId,
    message: String,
    body: String,
) -> CommitObject {
    CommitObject {
        parents: parent.non_zero().into_iter().collect(),
        author: ident.clone(),
        committer: ident.clone(),
        message,
        body,
    }
}

/// Replace comments with the same uuid, append the rest.
fn merge_by_uuid<T: Clone>(into: &mut Vec<T>, from: &[T], uuid: impl Fn(&T) -> &str) {
    for c in from {
        match into.iter_mut().find(|e| uuid(&**e) == uuid(c)) {
            Some(existing) => *existing = c.clone(),
            None => into.push(c.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// ChangeUpdate
// ---------------------------------------------------------------------------

/// Which ref a comment deletion rewrites.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RewriteTarget {
    ChangeMeta,
    RobotComments,
}

#[derive(Clone, Debug)]
struct CommentDeletion {
    uuid: String,
    reason: String,
    target: RewriteTarget,
}

/// One update to a change's meta history, made by `account_id`.
#[derive(Clone, Debug)]
pub struct ChangeUpdate {
    change: ChangeRecord,
    account_id: AccountId,
    ident: PersonIdent,
    allow_write_to_new_ref: bool,
    subject: Option<String>,
    footers: Vec<(String, String)>,
    comments: Vec<Comment>,
    robot_comments: Vec<RobotComment>,
    deletion: Option<CommentDeletion>,
}

impl ChangeUpdate {
    /// An empty update by `account_id` on `change`.
    pub fn new(change: ChangeRecord, account_id: AccountId, ident: PersonIdent) -> Self {
        Self {
            change,
            account_id,
            ident,
            allow_write_to_new_ref: false,
            subject: None,
            footers: Vec::new(),
            comments: Vec::new(),
            robot_comments: Vec::new(),
            deletion: None,
        }
    }

    /// Allow this update to create the meta ref. Set for the first update
    /// of a new change.
    pub fn set_allow_write_to_new_ref(&mut self, allow: bool) -> &mut Self {
        self.allow_write_to_new_ref = allow;
        self
    }

    /// Subject line of the commit written to the meta ref.
    pub fn set_subject(&mut self, subject: impl Into<String>) -> &mut Self {
        self.subject = Some(subject.into());
        self
    }

    /// Add a `key: value` footer to the commit message.
    pub fn add_footer(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.footers.push((key.into(), value.into()));
        self
    }

    /// Publish a comment. Any draft with the same uuid is removed from the
    /// author's drafts.
    pub fn put_comment(&mut self, comment: Comment) -> &mut Self {
        self.comments.push(comment);
        self
    }

    /// Queue a robot comment, written to the change's robot-comments ref.
    pub fn put_robot_comment(&mut self, comment: RobotComment) -> &mut Self {
        self.robot_comments.push(comment);
        self
    }

    /// Redact a published comment from the meta history.
    pub fn delete_comment(&mut self, uuid: impl Into<String>, reason: impl Into<String>) -> &mut Self {
        self.deletion = Some(CommentDeletion {
            uuid: uuid.into(),
            reason: reason.into(),
            target: RewriteTarget::ChangeMeta,
        });
        self
    }

    /// Redact a robot comment from the robot-comments history.
    pub fn delete_robot_comment(
        &mut self,
        uuid: impl Into<String>,
        reason: impl Into<String>,
    ) -> &mut Self {
        self.deletion = Some(CommentDeletion {
            uuid: uuid.into(),
            reason: reason.into(),
            target: RewriteTarget::RobotComments,
        });
        self
    }

    pub fn change(&self) -> &ChangeRecord {
        &self.change
    }

    pub fn project(&self) -> &ProjectName {
        self.change.project()
    }

    pub fn change_id(&self) -> ChangeId {
        self.change.id()
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn ref_name(&self) -> String {
        refs::change_meta_ref(self.change.id())
    }

    /// Whether this update writes a meta commit of its own.
    pub fn is_empty(&self) -> bool {
        self.subject.is_none() && self.footers.is_empty() && self.comments.is_empty()
    }

    /// Draft cleanup for the comments this update publishes.
    pub fn draft_update(&self) -> Option<ChangeDraftUpdate> {
        if self.comments.is_empty() {
            return None;
        }
        let mut draft = ChangeDraftUpdate::new(self.change.clone(), self.account_id, self.ident.clone());
        for c in &self.comments {
            draft.delete_comment(c.uuid.as_str());
        }
        Some(draft)
    }

    /// Robot-comment work implied by this update.
    pub fn robot_comment_update(&self) -> Option<RobotCommentUpdate> {
        if self.robot_comments.is_empty() {
            return None;
        }
        let mut robot = RobotCommentUpdate::new(self.change.clone(), self.ident.clone());
        for c in &self.robot_comments {
            robot.put_comment(c.clone());
        }
        Some(robot)
    }

    /// Rewrite implied by a comment deletion on this update.
    pub fn delete_comment_rewriter(&self) -> Option<DeleteCommentRewriter> {
        let d = self.deletion.as_ref()?;
        Some(DeleteCommentRewriter::new(
            self.change.clone(),
            d.target,
            d.uuid.as_str(),
            self.ident.name.as_str(),
            d.reason.as_str(),
        ))
    }

    fn apply(&self, ins: &mut InMemoryInserter, curr: ObjectId) -> UpdateResult<Option<ObjectId>> {
        if self.is_empty() {
            return Ok(None);
        }
        let mut message = self
            .subject
            .clone()
            .unwrap_or_else(|| "Update change".to_string());
        if !self.footers.is_empty() {
            message.push('\n');
            for (key, value) in &self.footers {
                message.push_str(&format!("\n{key}: {value}"));
            }
        }
        let note = ChangeNote {
            footers: self.footers.clone(),
            comments: self.comments.clone(),
        };
        let commit = new_commit(&self.ident, curr, message, notes::encode(&note)?);
        Ok(Some(ins.insert_commit(&commit)?))
    }
}

// ---------------------------------------------------------------------------
// ChangeDraftUpdate
// ---------------------------------------------------------------------------

/// Changes to one reviewer's draft comments on a change.
#[derive(Clone, Debug)]
pub struct ChangeDraftUpdate {
    change: ChangeRecord,
    account_id: AccountId,
    ident: PersonIdent,
    put: Vec<Comment>,
    delete: Vec<String>,
}

impl ChangeDraftUpdate {
    /// An empty draft update for `account_id` on `change`.
    pub fn new(change: ChangeRecord, account_id: AccountId, ident: PersonIdent) -> Self {
        Self {
            change,
            account_id,
            ident,
            put: Vec::new(),
            delete: Vec::new(),
        }
    }

    /// Add or replace a draft, keyed by uuid.
    pub fn put_comment(&mut self, comment: Comment) -> &mut Self {
        self.put.push(comment);
        self
    }

    /// Remove the draft with `uuid`, if any.
    pub fn delete_comment(&mut self, uuid: impl Into<String>) -> &mut Self {
        self.delete.push(uuid.into());
        self
    }

    pub fn change(&self) -> &ChangeRecord {
        &self.change
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn ref_name(&self) -> String {
        refs::draft_comments_ref(self.change.id(), self.account_id)
    }

    fn apply(&self, ins: &mut InMemoryInserter, curr: ObjectId) -> UpdateResult<Option<ObjectId>> {
        if self.put.is_empty() && self.delete.is_empty() {
            return Ok(None);
        }
        let current = match curr.non_zero() {
            Some(tip) => notes::read_note::<DraftNote>(ins, tip)?.1.comments,
            None => Vec::new(),
        };

        let mut next: Vec<Comment> = current
            .iter()
            .filter(|c| !self.delete.contains(&c.uuid))
            .cloned()
            .collect();
        merge_by_uuid(&mut next, &self.put, |c| c.uuid.as_str());

        if next == current {
            return Ok(None);
        }
        if next.is_empty() {
            return Ok(Some(ObjectId::zero()));
        }
        let note = DraftNote { comments: next };
        let commit = new_commit(
            &self.ident,
            curr,
            "Update draft comments".to_string(),
            notes::encode(&note)?,
        );
        Ok(Some(ins.insert_commit(&commit)?))
    }
}

// ---------------------------------------------------------------------------
// RobotCommentUpdate
// ---------------------------------------------------------------------------

/// Appends robot comments to a change's robot-comments ref.
#[derive(Clone, Debug)]
pub struct RobotCommentUpdate {
    change: ChangeRecord,
    ident: PersonIdent,
    put: Vec<RobotComment>,
}

impl RobotCommentUpdate {
    /// Robot comments for `change`, committed as `ident`.
    pub fn new(change: ChangeRecord, ident: PersonIdent) -> Self {
        Self {
            change,
            ident,
            put: Vec::new(),
        }
    }

    pub fn put_comment(&mut self, comment: RobotComment) -> &mut Self {
        self.put.push(comment);
        self
    }

    pub fn ref_name(&self) -> String {
        refs::robot_comments_ref(self.change.id())
    }

    fn apply(&self, ins: &mut InMemoryInserter, curr: ObjectId) -> UpdateResult<Option<ObjectId>> {
        if self.put.is_empty() {
            return Ok(None);
        }
        let current = match curr.non_zero() {
            Some(tip) => notes::read_note::<RobotCommentNote>(ins, tip)?.1.comments,
            None => Vec::new(),
        };
        let mut next = current.clone();
        merge_by_uuid(&mut next, &self.put, |c| c.comment.uuid.as_str());
        if next == current {
            return Ok(None);
        }
        let note = RobotCommentNote { comments: next };
        let commit = new_commit(
            &self.ident,
            curr,
            "Update robot comments".to_string(),
            notes::encode(&note)?,
        );
        Ok(Some(ins.insert_commit(&commit)?))
    }
}

// ---------------------------------------------------------------------------
// DeleteCommentRewriter
// ---------------------------------------------------------------------------

/// Rebuilds a ref's first-parent history with one comment's text replaced.
///
/// Commits before the first one mentioning the comment are left alone; only
/// that commit and its descendants are rebuilt into the inserter.
#[derive(Clone, Debug)]
pub struct DeleteCommentRewriter {
    change: ChangeRecord,
    pub(crate) ref_name: String,
    target: RewriteTarget,
    uuid: String,
    deleted_by: String,
    reason: String,
}

impl DeleteCommentRewriter {
    pub fn new(
        change: ChangeRecord,
        target: RewriteTarget,
        uuid: impl Into<String>,
        deleted_by: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        let ref_name = match target {
            RewriteTarget::ChangeMeta => refs::change_meta_ref(change.id()),
            RewriteTarget::RobotComments => refs::robot_comments_ref(change.id()),
        };
        Self {
            change,
            ref_name,
            target,
            uuid: uuid.into(),
            deleted_by: deleted_by.into(),
            reason: reason.into(),
        }
    }

    pub fn ref_name(&self) -> &str {
        &self.ref_name
    }

    /// `Ok(None)` if the comment does not appear in the history.
    pub fn rewrite(
        &self,
        ins: &mut InMemoryInserter,
        curr: ObjectId,
    ) -> UpdateResult<Option<ObjectId>> {
        if curr.is_zero() {
            return Err(UpdateError::EmptyRef {
                ref_name: self.ref_name.clone(),
            });
        }

        let mut history = Vec::new();
        let mut next = Some(curr);
        while let Some(id) = next {
            let commit = notes::read_commit(ins, id)?;
            next = commit.parent();
            history.push((id, commit));
        }

        let mut found = false;
        let mut parent = ObjectId::zero();
        for (id, mut commit) in history.into_iter().rev() {
            if let Some(body) = self.redact(id, &commit.body)? {
                commit.body = body;
                found = true;
            } else if !found {
                parent = id;
                continue;
            }
            commit.parents = parent.non_zero().into_iter().collect();
            parent = ins.insert_commit(&commit)?;
        }
        Ok(found.then_some(parent))
    }

    /// New body if the note at `id` mentions the comment.
    fn redact(&self, id: ObjectId, body: &str) -> UpdateResult<Option<String>> {
        let message = removed_comment_message(&self.deleted_by, &self.reason);
        match self.target {
            RewriteTarget::ChangeMeta => {
                let mut note: ChangeNote = notes::decode(id, body)?;
                let mut changed = false;
                for c in note.comments.iter_mut().filter(|c| c.uuid == self.uuid) {
                    c.message = message.clone();
                    changed = true;
                }
                if changed {
                    return Ok(Some(notes::encode(&note)?));
                }
            }
            RewriteTarget::RobotComments => {
                let mut note: RobotCommentNote = notes::decode(id, body)?;
                let mut changed = false;
                for c in note.comments.iter_mut().filter(|c| c.comment.uuid == self.uuid) {
                    c.comment.message = message.clone();
                    changed = true;
                }
                if changed {
                    return Ok(Some(notes::encode(&note)?));
                }
            }
        }
        Ok(None)
    }
}
