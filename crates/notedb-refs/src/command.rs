//! Single compare-and-swap ref update commands.

use std::fmt;

use notedb_types::ObjectId;

/// Outcome of one command in a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// The batch has not been executed yet.
    NotAttempted,
    Ok,
    /// The ref no longer pointed at the command's old id.
    LockFailure,
    /// Not applied because another command in the same atomic batch failed.
    TransactionAborted,
    /// Refused for any other reason.
    Rejected(String),
}

impl CommandResult {
    /// Whether the command was applied.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAttempted => write!(f, "NOT_ATTEMPTED"),
            Self::Ok => write!(f, "OK"),
            Self::LockFailure => write!(f, "LOCK_FAILURE"),
            Self::TransactionAborted => write!(f, "REJECTED_OTHER_REASON: transaction aborted"),
            Self::Rejected(reason) => write!(f, "REJECTED_OTHER_REASON: {reason}"),
        }
    }
}

/// What a command does to its ref, derived from its old and new ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandType {
    Create,
    Update,
    Delete,
}

/// Move `ref_name` from `old_id` to `new_id`, provided it still points at
/// `old_id`. A zero `old_id` creates the ref; a zero `new_id` deletes it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiveCommand {
    ref_name: String,
    old_id: ObjectId,
    new_id: ObjectId,
    result: CommandResult,
}

impl ReceiveCommand {
    /// A command that has not been executed yet.
    pub fn new(old_id: ObjectId, new_id: ObjectId, ref_name: impl Into<String>) -> Self {
        Self {
            ref_name: ref_name.into(),
            old_id,
            new_id,
            result: CommandResult::NotAttempted,
        }
    }

    pub fn ref_name(&self) -> &str {
        &self.ref_name
    }

    pub fn old_id(&self) -> ObjectId {
        self.old_id
    }

    pub fn new_id(&self) -> ObjectId {
        self.new_id
    }

    pub fn result(&self) -> &CommandResult {
        &self.result
    }

    /// Record the outcome of executing this command.
    pub fn set_result(&mut self, result: CommandResult) {
        self.result = result;
    }

    pub fn command_type(&self) -> CommandType {
        if self.old_id.is_zero() {
            CommandType::Create
        } else if self.new_id.is_zero() {
            CommandType::Delete
        } else {
            CommandType::Update
        }
    }
}

impl fmt::Display for ReceiveCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: {} {} {} ({})",
            self.command_type(),
            self.old_id.short_name(),
            self.new_id.short_name(),
            self.ref_name,
            self.result
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_types() {
        let a = ObjectId::from_bytes(b"a");
        let b = ObjectId::from_bytes(b"b");
        assert_eq!(ReceiveCommand::new(ObjectId::zero(), a, "refs/x").command_type(), CommandType::Create);
        assert_eq!(ReceiveCommand::new(a, b, "refs/x").command_type(), CommandType::Update);
        assert_eq!(ReceiveCommand::new(a, ObjectId::zero(), "refs/x").command_type(), CommandType::Delete);
    }

    #[test]
    fn new_command_is_not_attempted() {
        let mut cmd = ReceiveCommand::new(ObjectId::zero(), ObjectId::from_bytes(b"a"), "refs/x");
        assert_eq!(cmd.result(), &CommandResult::NotAttempted);
        cmd.set_result(CommandResult::LockFailure);
        assert!(!cmd.result().is_ok());
        assert!(cmd.to_string().contains("LOCK_FAILURE"));
    }
}
