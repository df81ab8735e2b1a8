//! The expected-state pointer kept on the legacy change record.
//!
//! While the legacy database is authoritative, each change row remembers the
//! NoteDb tips it was last in sync with. The pointer is a short string:
//!
//! - `N` when NoteDb is already primary for the change;
//! - otherwise `[R,]<meta>[,<account>=<draft>]*`, draft entries sorted by
//!   account id.
//!
//! Staging produces a [`Delta`] per change, and [`ChangeState::apply_delta`]
//! folds it into the pointer stored on the [`ChangeRecord`].

use std::collections::BTreeMap;
use std::fmt;

use notedb_refs::RefDatabase;
use notedb_types::{refs, AccountId, ChangeId, ObjectId, ProjectName};

use crate::error::{UpdateError, UpdateResult};

/// The slice of a legacy change row the coordinator reads and writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeRecord {
    id: ChangeId,
    project: ProjectName,
    note_db_state: Option<String>,
}

impl ChangeRecord {
    /// A change with no stored pointer.
    pub fn new(id: ChangeId, project: ProjectName) -> Self {
        Self {
            id,
            project,
            note_db_state: None,
        }
    }

    /// Attach a stored pointer string.
    pub fn with_note_db_state(mut self, state: impl Into<String>) -> Self {
        self.note_db_state = Some(state.into());
        self
    }

    pub fn id(&self) -> ChangeId {
        self.id
    }

    pub fn project(&self) -> &ProjectName {
        &self.project
    }

    pub fn note_db_state(&self) -> Option<&str> {
        self.note_db_state.as_deref()
    }

    /// Replace the stored pointer; `None` clears it.
    pub fn set_note_db_state(&mut self, state: Option<String>) {
        self.note_db_state = state;
    }
}

/// Which storage is authoritative for a change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimaryStorage {
    ReviewDb,
    NoteDb,
}

impl PrimaryStorage {
    fn code(self) -> &'static str {
        match self {
            Self::ReviewDb => "R",
            Self::NoteDb => "N",
        }
    }
}

/// Expected ref tips for a change: its meta ref and each reviewer's drafts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefState {
    pub change_meta_id: ObjectId,
    /// Only non-zero ids; a missing account means "no drafts".
    pub draft_ids: BTreeMap<AccountId, ObjectId>,
}

/// New tips produced for one change by a staging pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delta {
    pub change_id: ChangeId,
    /// `None` when the meta ref was not touched. A zero id means it was
    /// deleted.
    pub new_change_meta_id: Option<ObjectId>,
    /// A zero id means that account's draft ref was deleted.
    pub new_draft_ids: BTreeMap<AccountId, ObjectId>,
}

/// Expected-state pointer for one change.
///
/// Stored as a string on the change record. `N` means NoteDb is primary;
/// otherwise it is the meta tip followed by `,account=draft-tip` entries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeState {
    change_id: ChangeId,
    primary_storage: PrimaryStorage,
    ref_state: Option<RefState>,
}

impl ChangeState {
    pub fn new(change_id: ChangeId, ref_state: RefState) -> Self {
        Self {
            change_id,
            primary_storage: PrimaryStorage::ReviewDb,
            ref_state: Some(ref_state),
        }
    }

    /// Pointer for a change whose metadata lives only in NoteDb.
    pub fn note_db_primary(change_id: ChangeId) -> Self {
        Self {
            change_id,
            primary_storage: PrimaryStorage::NoteDb,
            ref_state: None,
        }
    }

    /// Parse the pointer stored on `change`, or `None` if it has none.
    pub fn parse(change: &ChangeRecord) -> UpdateResult<Option<Self>> {
        Self::parse_str(change.id(), change.note_db_state())
    }

    /// Parse a stored pointer string; a missing or blank string parses to `None`.
    pub fn parse_str(change_id: ChangeId, s: Option<&str>) -> UpdateResult<Option<Self>> {
        let Some(s) = s.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let invalid = |reason: &str| {
            UpdateError::InvalidChangeState(format!("{reason} for change {change_id}: {s:?}"))
        };

        let parts: Vec<&str> = s.split(',').collect();
        let rest = match parts[0] {
            "N" => {
                if parts.len() != 1 {
                    return Err(invalid("unexpected ref state with NoteDb primary"));
                }
                return Ok(Some(Self::note_db_primary(change_id)));
            }
            "R" => &parts[1..],
            _ => &parts[..],
        };
        let (meta, drafts) = rest
            .split_first()
            .ok_or_else(|| invalid("missing meta id"))?;
        let change_meta_id = ObjectId::from_hex(meta).map_err(|_| invalid("invalid meta id"))?;

        let mut draft_ids = BTreeMap::new();
        for entry in drafts {
            let (account, id) = entry
                .split_once('=')
                .ok_or_else(|| invalid("invalid draft entry"))?;
            let account: AccountId = account.parse().map_err(|_| invalid("invalid account id"))?;
            let id = ObjectId::from_hex(id).map_err(|_| invalid("invalid draft id"))?;
            draft_ids.insert(account, id);
        }

        Ok(Some(Self::new(
            change_id,
            RefState {
                change_meta_id,
                draft_ids,
            },
        )))
    }

    /// Fold `delta` into the pointer stored on `change` and return the new
    /// state. The record is updated in place.
    pub fn apply_delta(
        change: &mut ChangeRecord,
        delta: Option<&Delta>,
    ) -> UpdateResult<Option<Self>> {
        let Some(delta) = delta else {
            return Ok(None);
        };
        if change.note_db_state().is_none() && delta.new_change_meta_id.is_none() {
            // Neither the record nor the delta knows the meta tip.
            return Ok(None);
        }

        let old = Self::parse(change)?;
        if let Some(old) = &old {
            if old.primary_storage == PrimaryStorage::NoteDb {
                return Ok(Some(old.clone()));
            }
        }

        let change_meta_id = match delta.new_change_meta_id {
            Some(id) if id.is_zero() => {
                change.set_note_db_state(None);
                return Ok(None);
            }
            Some(id) => id,
            None => match old.as_ref().and_then(|o| o.ref_state.as_ref()) {
                Some(rs) => rs.change_meta_id,
                None => return Ok(None),
            },
        };

        let mut draft_ids = old
            .and_then(|o| o.ref_state)
            .map(|rs| rs.draft_ids)
            .unwrap_or_default();
        for (account, id) in &delta.new_draft_ids {
            if id.is_zero() {
                draft_ids.remove(account);
            } else {
                draft_ids.insert(*account, *id);
            }
        }

        let state = Self::new(
            change.id(),
            RefState {
                change_meta_id,
                draft_ids,
            },
        );
        change.set_note_db_state(Some(state.to_string()));
        Ok(Some(state))
    }

    pub fn change_id(&self) -> ChangeId {
        self.change_id
    }

    pub fn primary_storage(&self) -> PrimaryStorage {
        self.primary_storage
    }

    pub fn ref_state(&self) -> Option<&RefState> {
        self.ref_state.as_ref()
    }

    /// Expected meta tip; zero when NoteDb is primary.
    pub fn change_meta_id(&self) -> ObjectId {
        self.ref_state
            .as_ref()
            .map(|rs| rs.change_meta_id)
            .unwrap_or_default()
    }

    /// Expected draft tip for `account`; zero if the account has no drafts.
    pub fn draft_id(&self, account: AccountId) -> ObjectId {
        self.ref_state
            .as_ref()
            .and_then(|rs| rs.draft_ids.get(&account).copied())
            .unwrap_or_default()
    }

    /// Whether the durable meta ref still matches this pointer.
    pub fn is_change_up_to_date(&self, refs: &dyn RefDatabase) -> UpdateResult<bool> {
        if self.primary_storage == PrimaryStorage::NoteDb {
            return Ok(true);
        }
        let actual = refs
            .exact_ref(&refs::change_meta_ref(self.change_id))?
            .unwrap_or_default();
        Ok(actual == self.change_meta_id())
    }

    /// Whether the durable draft ref of `account` still matches this pointer.
    pub fn are_drafts_up_to_date(
        &self,
        refs: &dyn RefDatabase,
        account: AccountId,
    ) -> UpdateResult<bool> {
        if self.primary_storage == PrimaryStorage::NoteDb {
            return Ok(true);
        }
        let actual = refs
            .exact_ref(&refs::draft_comments_ref(self.change_id, account))?
            .unwrap_or_default();
        Ok(actual == self.draft_id(account))
    }
}

impl fmt::Display for ChangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(rs) = &self.ref_state else {
            return f.write_str(self.primary_storage.code());
        };
        if self.primary_storage == PrimaryStorage::NoteDb {
            write!(f, "{},", self.primary_storage.code())?;
        }
        write!(f, "{}", rs.change_meta_id.name())?;
        for (account, id) in &rs.draft_ids {
            write!(f, ",{account}={}", id.name())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notedb_refs::InMemoryRefDatabase;
    use proptest::prelude::*;

    fn id(s: &str) -> ObjectId {
        ObjectId::from_bytes(s.as_bytes())
    }

    fn record(state: Option<&str>) -> ChangeRecord {
        let rec = ChangeRecord::new(ChangeId(7), ProjectName::new("demo").unwrap());
        match state {
            Some(s) => rec.with_note_db_state(s),
            None => rec,
        }
    }

    fn delta(meta: Option<ObjectId>, drafts: &[(i32, ObjectId)]) -> Delta {
        Delta {
            change_id: ChangeId(7),
            new_change_meta_id: meta,
            new_draft_ids: drafts.iter().map(|(a, i)| (AccountId(*a), *i)).collect(),
        }
    }

    // -----------------------------------------------------------------------
    // Parsing and formatting
    // -----------------------------------------------------------------------

    #[test]
    fn absent_or_blank_pointer() {
        assert_eq!(ChangeState::parse_str(ChangeId(1), None).unwrap(), None);
        assert_eq!(ChangeState::parse_str(ChangeId(1), Some("  ")).unwrap(), None);
    }

    #[test]
    fn note_db_primary_pointer() {
        let state = ChangeState::parse_str(ChangeId(1), Some("N")).unwrap().unwrap();
        assert_eq!(state.primary_storage(), PrimaryStorage::NoteDb);
        assert!(state.ref_state().is_none());
        assert_eq!(state.to_string(), "N");
    }

    #[test]
    fn meta_and_drafts_pointer() {
        let s = format!("R,{},1001={},1000={}", id("m").name(), id("b").name(), id("a").name());
        let state = ChangeState::parse_str(ChangeId(1), Some(&s)).unwrap().unwrap();
        assert_eq!(state.primary_storage(), PrimaryStorage::ReviewDb);
        assert_eq!(state.change_meta_id(), id("m"));
        assert_eq!(state.draft_id(AccountId(1000)), id("a"));
        assert_eq!(state.draft_id(AccountId(1002)), ObjectId::zero());
        // Formatting drops the optional prefix and sorts drafts.
        assert_eq!(
            state.to_string(),
            format!("{},1000={},1001={}", id("m").name(), id("a").name(), id("b").name())
        );
    }

    #[test]
    fn malformed_pointers() {
        for s in ["R", "N,abc", "zz", &format!("{},1000", id("m").name())] {
            assert!(
                matches!(
                    ChangeState::parse_str(ChangeId(1), Some(s)),
                    Err(UpdateError::InvalidChangeState(_))
                ),
                "{s}"
            );
        }
    }

    proptest! {
        #[test]
        fn format_then_parse_is_stable(
            meta in any::<[u8; 32]>(),
            drafts in proptest::collection::btree_map(1..100_000i32, any::<[u8; 32]>(), 0..4),
        ) {
            let state = ChangeState::new(ChangeId(3), RefState {
                change_meta_id: ObjectId::from_hash(meta),
                draft_ids: drafts
                    .into_iter()
                    .map(|(a, d)| (AccountId(a), ObjectId::from_hash(d)))
                    .collect(),
            });
            let text = state.to_string();
            let parsed = ChangeState::parse_str(ChangeId(3), Some(&text)).unwrap().unwrap();
            prop_assert_eq!(parsed, state);
        }
    }

    // -----------------------------------------------------------------------
    // apply_delta
    // -----------------------------------------------------------------------

    #[test]
    fn no_delta_means_no_state() {
        let mut rec = record(Some("N"));
        assert_eq!(ChangeState::apply_delta(&mut rec, None).unwrap(), None);
        assert_eq!(rec.note_db_state(), Some("N"));
    }

    #[test]
    fn drafts_only_without_prior_pointer() {
        let mut rec = record(None);
        let d = delta(None, &[(1000, id("d"))]);
        assert_eq!(ChangeState::apply_delta(&mut rec, Some(&d)).unwrap(), None);
        assert_eq!(rec.note_db_state(), None);
    }

    #[test]
    fn note_db_primary_is_left_alone() {
        let mut rec = record(Some("N"));
        let d = delta(Some(id("m2")), &[]);
        let state = ChangeState::apply_delta(&mut rec, Some(&d)).unwrap().unwrap();
        assert_eq!(state.primary_storage(), PrimaryStorage::NoteDb);
        assert_eq!(rec.note_db_state(), Some("N"));
    }

    #[test]
    fn deleted_meta_clears_pointer() {
        let mut rec = record(Some(&id("m").name()));
        let d = delta(Some(ObjectId::zero()), &[]);
        assert_eq!(ChangeState::apply_delta(&mut rec, Some(&d)).unwrap(), None);
        assert_eq!(rec.note_db_state(), None);
    }

    #[test]
    fn merges_drafts_and_drops_deleted_ones() {
        let mut rec = record(Some(&format!(
            "{},1000={},1001={}",
            id("m").name(),
            id("a").name(),
            id("b").name()
        )));
        let d = delta(None, &[(1000, ObjectId::zero()), (1002, id("c"))]);
        let state = ChangeState::apply_delta(&mut rec, Some(&d)).unwrap().unwrap();

        assert_eq!(state.change_meta_id(), id("m"));
        let drafts = &state.ref_state().unwrap().draft_ids;
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[&AccountId(1001)], id("b"));
        assert_eq!(drafts[&AccountId(1002)], id("c"));
        assert_eq!(rec.note_db_state(), Some(state.to_string().as_str()));
    }

    #[test]
    fn new_meta_on_fresh_change() {
        let mut rec = record(None);
        let d = delta(Some(id("m")), &[(1000, id("a"))]);
        let state = ChangeState::apply_delta(&mut rec, Some(&d)).unwrap().unwrap();
        assert_eq!(state.change_meta_id(), id("m"));
        assert_eq!(
            rec.note_db_state().unwrap(),
            format!("{},1000={}", id("m").name(), id("a").name())
        );
    }

    // -----------------------------------------------------------------------
    // Up-to-date checks
    // -----------------------------------------------------------------------

    #[test]
    fn up_to_date_checks_read_durable_refs() {
        let refs = InMemoryRefDatabase::new();
        let change = ChangeId(7);
        refs.set_ref(&notedb_types::refs::change_meta_ref(change), id("m"));
        refs.set_ref(
            &notedb_types::refs::draft_comments_ref(change, AccountId(1000)),
            id("a"),
        );

        let state = ChangeState::new(
            change,
            RefState {
                change_meta_id: id("m"),
                draft_ids: [(AccountId(1000), id("a"))].into_iter().collect(),
            },
        );
        assert!(state.is_change_up_to_date(&refs).unwrap());
        assert!(state.are_drafts_up_to_date(&refs, AccountId(1000)).unwrap());
        assert!(state.are_drafts_up_to_date(&refs, AccountId(1001)).unwrap());

        refs.set_ref(&notedb_types::refs::change_meta_ref(change), id("other"));
        assert!(!state.is_change_up_to_date(&refs).unwrap());
        assert!(ChangeState::note_db_primary(change)
            .is_change_up_to_date(&refs)
            .unwrap());
    }
}
