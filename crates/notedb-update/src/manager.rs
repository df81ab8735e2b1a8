//! The update manager: accumulates producers for one project, stages them
//! into ref commands on the project and All-Users repositories, and commits
//! both batches.
//!
//! A manager is single use. After [`stage`](UpdateManager::stage) no more
//! producers are accepted; after [`execute`](UpdateManager::execute) or
//! [`close`](UpdateManager::close) nothing is.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use notedb_refs::{BatchRefUpdate, PushCertificate, ReceiveCommand, RepoManager, Repository};
use notedb_store::ObjectInserter;
use notedb_types::{refs, AccountId, ChangeId, ObjectId, PersonIdent, ProjectName};

use crate::chained::ChainedReceiveCommands;
use crate::config::NoteDbConfig;
use crate::error::{UpdateError, UpdateResult};
use crate::open_repo::OpenRepo;
use crate::result::{check_results, StageOutcome, StagedResult};
use crate::state::{ChangeRecord, ChangeState, Delta, PrimaryStorage};
use crate::update::{ChangeDraftUpdate, ChangeUpdate, NoteDbUpdate};

/// Producers grouped by the ref they write, in the order they were added.
type RefGroups = BTreeMap<String, Vec<NoteDbUpdate>>;

fn push(groups: &mut RefGroups, update: NoteDbUpdate) {
    groups.entry(update.ref_name()).or_default().push(update);
}

fn touches(groups: &RefGroups, id: ChangeId) -> bool {
    groups
        .values()
        .flatten()
        .any(|u| u.change_id() == id)
}

/// Creates [`UpdateManager`]s sharing one configuration and repository
/// manager.
#[derive(Clone)]
pub struct UpdateManagerFactory {
    config: Arc<NoteDbConfig>,
    repo_manager: Arc<dyn RepoManager>,
    all_users: ProjectName,
}

impl UpdateManagerFactory {
    /// Validates the configured All-Users project name.
    pub fn new(config: NoteDbConfig, repo_manager: Arc<dyn RepoManager>) -> UpdateResult<Self> {
        let all_users = config.all_users_name()?;
        Ok(Self {
            config: Arc::new(config),
            repo_manager,
            all_users,
        })
    }

    /// A fresh manager for one pass over `project`.
    pub fn create(&self, project: ProjectName) -> UpdateManager {
        UpdateManager {
            config: self.config.clone(),
            repo_manager: self.repo_manager.clone(),
            all_users: self.all_users.clone(),
            project,
            change_updates: RefGroups::new(),
            draft_updates: RefGroups::new(),
            robot_comment_updates: RefGroups::new(),
            rewriters: RefGroups::new(),
            to_delete: BTreeSet::new(),
            change_repo: None,
            all_users_repo: None,
            staged: None,
            staging_started: false,
            check_expected_state: true,
            ref_log_message: None,
            ref_log_ident: None,
            push_cert: None,
            closed: false,
        }
    }
}

/// Coordinates one pass of updates for a single project.
///
/// Updates are accumulated with [`add`](Self::add), [`add_draft`](Self::add_draft)
/// and [`delete_change`](Self::delete_change), turned into ref commands by
/// [`stage`](Self::stage), and committed by [`execute`](Self::execute): the
/// project repository first, then All-Users. A manager is single use and
/// releases every handle it opened when it closes, on every exit path.
pub struct UpdateManager {
    config: Arc<NoteDbConfig>,
    repo_manager: Arc<dyn RepoManager>,
    all_users: ProjectName,
    project: ProjectName,

    change_updates: RefGroups,
    draft_updates: RefGroups,
    robot_comment_updates: RefGroups,
    rewriters: RefGroups,
    to_delete: BTreeSet<ChangeId>,

    change_repo: Option<OpenRepo>,
    all_users_repo: Option<OpenRepo>,

    staged: Option<BTreeMap<ChangeId, StagedResult>>,
    staging_started: bool,

    check_expected_state: bool,
    ref_log_message: Option<String>,
    ref_log_ident: Option<PersonIdent>,
    push_cert: Option<PushCertificate>,
    closed: bool,
}

impl UpdateManager {
    pub fn project(&self) -> &ProjectName {
        &self.project
    }

    // -----------------------------------------------------------------------
    // Setup
    // -----------------------------------------------------------------------

    /// Stage against a project repository opened by the caller.
    ///
    /// The handle is never closed by the manager. Commands already in `cmds`
    /// are committed along with the staged ones. Without `ins`, objects can
    /// be staged but not flushed.
    pub fn set_change_repo(
        &mut self,
        repo: Arc<dyn Repository>,
        ins: Option<Box<dyn ObjectInserter>>,
        cmds: ChainedReceiveCommands,
    ) -> UpdateResult<&mut Self> {
        self.ensure_open()?;
        if self.change_repo.is_some() {
            return Err(UpdateError::IllegalState("change repo already initialized".into()));
        }
        self.change_repo = Some(OpenRepo::external(repo, ins, cmds));
        Ok(self)
    }

    /// Stage against an All-Users repository opened by the caller.
    pub fn set_all_users_repo(
        &mut self,
        repo: Arc<dyn Repository>,
        ins: Option<Box<dyn ObjectInserter>>,
        cmds: ChainedReceiveCommands,
    ) -> UpdateResult<&mut Self> {
        self.ensure_open()?;
        if self.all_users_repo.is_some() {
            return Err(UpdateError::IllegalState("All-Users repo already initialized".into()));
        }
        self.all_users_repo = Some(OpenRepo::external(repo, ins, cmds));
        Ok(self)
    }

    /// Skip comparing each change's stored pointer against its refs.
    pub fn set_check_expected_state(&mut self, check: bool) -> &mut Self {
        self.check_expected_state = check;
        self
    }

    /// Override the configured reflog message.
    pub fn set_ref_log_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.ref_log_message = Some(message.into());
        self
    }

    /// Override the server identity recorded in reflogs.
    pub fn set_ref_log_ident(&mut self, ident: PersonIdent) -> &mut Self {
        self.ref_log_ident = Some(ident);
        self
    }

    /// Certificate attached to the project repository batch only.
    pub fn set_push_certificate(&mut self, cert: Option<PushCertificate>) -> &mut Self {
        self.push_cert = cert;
        self
    }

    /// Project repository context, opened on first use.
    pub fn change_repo(&mut self) -> UpdateResult<&mut OpenRepo> {
        self.ensure_open()?;
        self.init_change_repo()?;
        Self::require(&mut self.change_repo, "change repo")
    }

    /// All-Users context, opened on first use.
    pub fn all_users_repo(&mut self) -> UpdateResult<&mut OpenRepo> {
        self.ensure_open()?;
        self.init_all_users_repo()?;
        Self::require(&mut self.all_users_repo, "All-Users repo")
    }

    fn init_change_repo(&mut self) -> UpdateResult<()> {
        if self.change_repo.is_none() {
            self.change_repo = Some(OpenRepo::open(self.repo_manager.as_ref(), &self.project)?);
        }
        Ok(())
    }

    fn init_all_users_repo(&mut self) -> UpdateResult<()> {
        if self.all_users_repo.is_none() {
            self.all_users_repo = Some(OpenRepo::open(self.repo_manager.as_ref(), &self.all_users)?);
        }
        Ok(())
    }

    fn require<'a>(repo: &'a mut Option<OpenRepo>, what: &str) -> UpdateResult<&'a mut OpenRepo> {
        repo.as_mut()
            .ok_or_else(|| UpdateError::IllegalState(format!("{what} not initialized")))
    }

    fn ensure_open(&self) -> UpdateResult<()> {
        if self.closed {
            return Err(UpdateError::IllegalState("update manager is closed".into()));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Accumulation
    // -----------------------------------------------------------------------

    /// Add an update to a change, along with the draft, robot-comment and
    /// rewrite work it implies.
    pub fn add(&mut self, update: ChangeUpdate) -> UpdateResult<()> {
        self.ensure_open()?;
        if update.project() != &self.project {
            return Err(UpdateError::InvalidArgument(format!(
                "update for project {} cannot be added to manager for project {}",
                update.project(),
                self.project
            )));
        }
        if self.staging_started {
            return Err(UpdateError::IllegalState("cannot add new update after staging".into()));
        }
        Self::check_change_id(update.change_id())?;
        self.check_not_deleted(update.change_id())?;

        if let Some(draft) = update.draft_update() {
            push(&mut self.draft_updates, draft.into());
        }
        if let Some(robot) = update.robot_comment_update() {
            push(&mut self.robot_comment_updates, robot.into());
        }
        if let Some(rewriter) = update.delete_comment_rewriter() {
            push(&mut self.rewriters, rewriter.into());
        }
        push(&mut self.change_updates, update.into());
        Ok(())
    }

    /// Add a draft update on its own, outside of any [`ChangeUpdate`].
    pub fn add_draft(&mut self, draft: ChangeDraftUpdate) -> UpdateResult<()> {
        self.ensure_open()?;
        if draft.change().project() != &self.project {
            return Err(UpdateError::InvalidArgument(format!(
                "draft update for project {} cannot be added to manager for project {}",
                draft.change().project(),
                self.project
            )));
        }
        if self.staging_started {
            return Err(UpdateError::IllegalState("cannot add new update after staging".into()));
        }
        Self::check_change_id(draft.change().id())?;
        self.check_not_deleted(draft.change().id())?;
        push(&mut self.draft_updates, draft.into());
        Ok(())
    }

    /// Remove a change's meta ref and every reviewer's drafts on it.
    pub fn delete_change(&mut self, id: ChangeId) -> UpdateResult<()> {
        self.ensure_open()?;
        if self.staging_started {
            return Err(UpdateError::IllegalState(
                "cannot add new change to delete after staging".into(),
            ));
        }
        Self::check_change_id(id)?;
        let updated = [
            &self.change_updates,
            &self.draft_updates,
            &self.robot_comment_updates,
            &self.rewriters,
        ]
        .into_iter()
        .any(|groups| touches(groups, id));
        if updated {
            return Err(UpdateError::IllegalState(format!(
                "cannot delete change {id} that is also updated"
            )));
        }
        self.to_delete.insert(id);
        Ok(())
    }

    fn check_change_id(id: ChangeId) -> UpdateResult<()> {
        if !id.is_valid() {
            return Err(UpdateError::InvalidArgument(format!("invalid change id {id}")));
        }
        Ok(())
    }

    fn check_not_deleted(&self, id: ChangeId) -> UpdateResult<()> {
        if self.to_delete.contains(&id) {
            return Err(UpdateError::IllegalState(format!(
                "cannot update change {id} that is marked for deletion"
            )));
        }
        Ok(())
    }

    fn has_commands(repo: &Option<OpenRepo>) -> bool {
        repo.as_ref().is_some_and(|or| !or.commands().is_empty())
    }

    /// Whether executing would write nothing.
    pub fn is_empty(&self) -> bool {
        if !self.config.migration.commit_change_writes() {
            return true;
        }
        self.change_updates.is_empty()
            && self.draft_updates.is_empty()
            && self.robot_comment_updates.is_empty()
            && self.rewriters.is_empty()
            && self.to_delete.is_empty()
            && !Self::has_commands(&self.change_repo)
            && !Self::has_commands(&self.all_users_repo)
    }

    // -----------------------------------------------------------------------
    // Staging
    // -----------------------------------------------------------------------

    /// Compute, without writing anything durable, the commands and objects
    /// each change needs. Computed once; later calls return the same map.
    pub fn stage(&mut self) -> UpdateResult<&BTreeMap<ChangeId, StagedResult>> {
        self.ensure_open()?;
        if self.staged.is_none() {
            if self.staging_started {
                return Err(UpdateError::IllegalState(
                    "a previous staging attempt failed".into(),
                ));
            }
            self.staging_started = true;
            let start = Instant::now();
            let staged = self.compute_staged()?;
            debug!(
                project = %self.project,
                changes = staged.len(),
                elapsed_us = start.elapsed().as_micros() as u64,
                "staged NoteDb updates"
            );
            self.staged = Some(staged);
        }
        Ok(&*self.staged.get_or_insert_with(BTreeMap::new))
    }

    /// Stage, then fold the change's delta into its stored pointer.
    pub fn stage_and_apply_delta(&mut self, change: &mut ChangeRecord) -> UpdateResult<StageOutcome> {
        let staged = self.stage()?.get(&change.id()).cloned();
        let new_state = ChangeState::apply_delta(change, staged.as_ref().map(|s| &s.delta))?;
        Ok(StageOutcome { staged, new_state })
    }

    fn compute_staged(&mut self) -> UpdateResult<BTreeMap<ChangeId, StagedResult>> {
        let mut staged = BTreeMap::new();
        if self.is_empty() {
            return Ok(staged);
        }

        self.init_change_repo()?;
        if !self.draft_updates.is_empty() || !self.to_delete.is_empty() {
            self.init_all_users_repo()?;
        }
        self.check_expected_state()?;
        self.add_commands()?;

        let mut draft_ids = self.draft_ids()?;
        let change_repo: &OpenRepo = Self::require(&mut self.change_repo, "change repo")?;
        let all_users_repo = self.all_users_repo.as_ref();
        for cmd in change_repo.commands().commands() {
            let Some(id) = refs::meta_ref_change_id(cmd.ref_name()) else {
                continue;
            };
            let delta = Delta {
                change_id: id,
                new_change_meta_id: Some(cmd.new_id()),
                new_draft_ids: draft_ids.remove(&id).unwrap_or_default(),
            };
            staged.insert(id, StagedResult::create(id, delta, change_repo, all_users_repo));
        }

        // Changes whose meta ref is untouched. Other project refs, such as
        // robot comments, may still be written alongside the drafts.
        for (id, new_draft_ids) in draft_ids {
            let delta = Delta {
                change_id: id,
                new_change_meta_id: None,
                new_draft_ids,
            };
            let result = StagedResult::create(id, delta, change_repo, all_users_repo);
            let meta_commands: Vec<String> = result
                .change_commands
                .iter()
                .filter(|c| refs::meta_ref_change_id(c.ref_name()).is_some())
                .map(ToString::to_string)
                .collect();
            if !meta_commands.is_empty() {
                return Err(UpdateError::IllegalState(format!(
                    "should not have meta commands when updating only drafts: {}",
                    meta_commands.join(", ")
                )));
            }
            staged.insert(id, result);
        }
        Ok(staged)
    }

    /// New draft tips per change and account, from staged All-Users commands.
    fn draft_ids(&self) -> UpdateResult<BTreeMap<ChangeId, BTreeMap<AccountId, ObjectId>>> {
        let mut ids: BTreeMap<ChangeId, BTreeMap<AccountId, ObjectId>> = BTreeMap::new();
        let Some(all_users) = self.all_users_repo.as_ref() else {
            return Ok(ids);
        };
        for cmd in all_users.commands().commands() {
            if !cmd.ref_name().starts_with(refs::REFS_DRAFT_COMMENTS) {
                continue;
            }
            let (change, account) = refs::parse_draft_ref(cmd.ref_name()).ok_or_else(|| {
                UpdateError::IllegalState(format!("invalid draft ref: {}", cmd.ref_name()))
            })?;
            ids.entry(change).or_default().insert(account, cmd.new_id());
        }
        Ok(ids)
    }

    fn add_commands(&mut self) -> UpdateResult<()> {
        if self.is_empty() {
            return Ok(());
        }
        for ref_name in self.rewriters.keys() {
            if self.draft_updates.contains_key(ref_name)
                || self.robot_comment_updates.contains_key(ref_name)
            {
                return Err(UpdateError::ConflictingRefGroup {
                    ref_name: ref_name.clone(),
                });
            }
        }

        let change_repo = Self::require(&mut self.change_repo, "change repo")?;
        Self::add_updates(&self.change_updates, change_repo)?;
        if !self.draft_updates.is_empty() {
            let all_users = Self::require(&mut self.all_users_repo, "All-Users repo")?;
            Self::add_updates(&self.draft_updates, all_users)?;
        }
        let change_repo = Self::require(&mut self.change_repo, "change repo")?;
        Self::add_updates(&self.robot_comment_updates, change_repo)?;
        Self::add_rewrites(&self.rewriters, change_repo)?;

        let to_delete: Vec<ChangeId> = self.to_delete.iter().copied().collect();
        for id in to_delete {
            self.do_delete(id)?;
        }
        self.check_expected_state()
    }

    fn add_updates(groups: &RefGroups, or: &mut OpenRepo) -> UpdateResult<()> {
        for (ref_name, updates) in groups {
            let old = or.cmds.get(ref_name)?.unwrap_or_default();
            if old.is_zero() && !updates.iter().any(NoteDbUpdate::allow_write_to_new_ref) {
                debug!(ref_name = %ref_name, "skipping updates to ref that does not exist yet");
                continue;
            }

            let mut curr = old;
            for u in updates {
                if let Some(next) = u.apply(&mut or.temp_ins, curr)? {
                    curr = next;
                }
            }
            if curr != old {
                debug!(
                    ref_name = %ref_name,
                    old = %old.short_name(),
                    new = %curr.short_name(),
                    "staged ref update"
                );
                or.cmds.add(ReceiveCommand::new(old, curr, ref_name.as_str()))?;
            }
        }
        Ok(())
    }

    fn add_rewrites(groups: &RefGroups, or: &mut OpenRepo) -> UpdateResult<()> {
        for (ref_name, rewriters) in groups {
            let old = or.cmds.get(ref_name)?.unwrap_or_default();
            if old.is_zero() {
                return Err(UpdateError::EmptyRef {
                    ref_name: ref_name.clone(),
                });
            }

            let mut curr = old;
            for r in rewriters {
                match r.rewrite(&mut or.temp_ins, curr) {
                    Ok(Some(next)) => curr = next,
                    Ok(None) => {}
                    Err(UpdateError::Parse(source)) => {
                        return Err(UpdateError::Rewrite {
                            ref_name: ref_name.clone(),
                            source,
                        })
                    }
                    Err(e) => return Err(e),
                }
            }
            if curr != old {
                debug!(ref_name = %ref_name, new = %curr.short_name(), "rewrote ref history");
                or.cmds.add(ReceiveCommand::new(old, curr, ref_name.as_str()))?;
            }
        }
        Ok(())
    }

    fn do_delete(&mut self, id: ChangeId) -> UpdateResult<()> {
        let meta = refs::change_meta_ref(id);
        let change_repo = Self::require(&mut self.change_repo, "change repo")?;
        if let Some(old) = change_repo.cmds.get(&meta)? {
            change_repo.cmds.add(ReceiveCommand::new(old, ObjectId::zero(), meta.as_str()))?;
        }

        let all_users = Self::require(&mut self.all_users_repo, "All-Users repo")?;
        let drafts = all_users
            .repo
            .ref_database()
            .refs_by_prefix(&refs::draft_comments_prefix(id))?;
        for (name, _) in drafts {
            if let Some(old) = all_users.cmds.get(&name)? {
                all_users.cmds.add(ReceiveCommand::new(old, ObjectId::zero(), name.as_str()))?;
            }
        }
        debug!(change = %id, "staged change deletion");
        Ok(())
    }

    /// Fail if a change's stored pointer no longer matches its durable refs.
    fn check_expected_state(&self) -> UpdateResult<()> {
        if !self.check_expected_state {
            return Ok(());
        }

        for updates in self.change_updates.values() {
            let Some(first) = updates.first() else {
                continue;
            };
            let Some(expected) = ChangeState::parse(first.change())? else {
                continue;
            };
            if expected.primary_storage() == PrimaryStorage::NoteDb {
                continue;
            }
            let repo = self
                .change_repo
                .as_ref()
                .ok_or_else(|| UpdateError::IllegalState("change repo not initialized".into()))?;
            if !expected.is_change_up_to_date(repo.repo().ref_database())? {
                warn!(change = %expected.change_id(), expected = %expected.change_meta_id().short_name(), "change meta ref moved");
                return Err(UpdateError::MismatchedState {
                    change_id: expected.change_id(),
                    expected: expected.change_meta_id(),
                });
            }
        }

        for updates in self.draft_updates.values() {
            let Some(first) = updates.first() else {
                continue;
            };
            let Some(account) = first.account_id() else {
                continue;
            };
            let Some(expected) = ChangeState::parse(first.change())? else {
                continue;
            };
            if expected.primary_storage() == PrimaryStorage::NoteDb {
                continue;
            }
            let repo = self
                .all_users_repo
                .as_ref()
                .ok_or_else(|| UpdateError::IllegalState("All-Users repo not initialized".into()))?;
            if !expected.are_drafts_up_to_date(repo.repo().ref_database(), account)? {
                warn!(change = %expected.change_id(), account = %account, "draft ref moved");
                return Err(UpdateError::DraftStateMismatch {
                    change_id: expected.change_id(),
                    account_id: account,
                    expected: expected.draft_id(account),
                });
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Commit
    // -----------------------------------------------------------------------

    /// Write staged objects to both repositories without updating refs.
    pub fn flush(&mut self) -> UpdateResult<()> {
        self.ensure_open()?;
        if let Some(or) = self.change_repo.as_mut() {
            or.flush()?;
        }
        if let Some(or) = self.all_users_repo.as_mut() {
            or.flush()?;
        }
        Ok(())
    }

    /// Stage if needed, then commit the project repository batch followed by
    /// the All-Users batch.
    ///
    /// With `dry_run`, objects only reach the final inserters and no refs are
    /// touched. Returns the project repository batch, or `None` if it had no
    /// commands. The manager is closed afterwards, whatever the outcome.
    pub fn execute(&mut self, dry_run: bool) -> UpdateResult<Option<BatchRefUpdate>> {
        self.ensure_open()?;
        if self.config.migration.fail_change_writes() {
            return Err(UpdateError::ReadOnly);
        }
        if self.is_empty() {
            return Ok(None);
        }
        let result = self.execute_staged(dry_run);
        self.close();
        result
    }

    fn execute_staged(&mut self, dry_run: bool) -> UpdateResult<Option<BatchRefUpdate>> {
        let start = Instant::now();
        self.stage()?;

        let message = self
            .ref_log_message
            .clone()
            .unwrap_or_else(|| self.config.ref_log_message.clone());
        let ident = self
            .ref_log_ident
            .clone()
            .unwrap_or_else(|| self.config.server_ident.to_person_ident());

        let result = Self::execute_repo(
            self.change_repo.as_mut(),
            dry_run,
            self.push_cert.clone(),
            &message,
            &ident,
        )?;
        Self::execute_repo(self.all_users_repo.as_mut(), dry_run, None, &message, &ident)?;

        info!(
            project = %self.project,
            dry_run,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "executed NoteDb update"
        );
        Ok(result)
    }

    fn execute_repo(
        or: Option<&mut OpenRepo>,
        dry_run: bool,
        push_cert: Option<PushCertificate>,
        message: &str,
        ident: &PersonIdent,
    ) -> UpdateResult<Option<BatchRefUpdate>> {
        let Some(or) = or else {
            return Ok(None);
        };
        if or.commands().is_empty() {
            return Ok(None);
        }
        if dry_run {
            or.flush_to_final_inserter()?;
        } else {
            or.flush()?;
        }

        let refdb = or.repo.ref_database();
        let mut bru = refdb.new_batch_update();
        bru.set_push_certificate(push_cert)
            .set_ref_log_message(message)
            .set_ref_log_ident(ident.clone())
            .set_allow_non_fast_forwards(true);
        or.commands().add_to(&mut bru);
        if !dry_run {
            refdb.execute_batch(&mut bru, or.repo.object_store().as_ref())?;
            check_results(&bru)?;
            info!(
                repo = %or.repo.name(),
                commands = bru.commands().len(),
                "committed NoteDb refs"
            );
        }
        Ok(Some(bru))
    }

    /// Release every repository handle the manager opened. Handles supplied
    /// by the caller stay open.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(mut or) = self.all_users_repo.take() {
            or.close();
        }
        if let Some(mut or) = self.change_repo.take() {
            or.close();
        }
    }
}

impl Drop for UpdateManager {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for UpdateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateManager")
            .field("project", &self.project)
            .field("change_updates", &self.change_updates.len())
            .field("draft_updates", &self.draft_updates.len())
            .field("robot_comment_updates", &self.robot_comment_updates.len())
            .field("rewriters", &self.rewriters.len())
            .field("to_delete", &self.to_delete)
            .field("staged", &self.staged.is_some())
            .field("closed", &self.closed)
            .finish()
    }
}
