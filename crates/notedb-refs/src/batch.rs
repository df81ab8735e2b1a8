//! Multi-ref batch updates.

use std::fmt;

use notedb_types::PersonIdent;

use crate::cert::PushCertificate;
use crate::command::ReceiveCommand;

/// A set of ref commands submitted to a [`RefDatabase`](crate::RefDatabase)
/// in one call, along with the reflog metadata to record for them.
#[derive(Clone, Debug)]
pub struct BatchRefUpdate {
    commands: Vec<ReceiveCommand>,
    ref_log_message: Option<String>,
    ref_log_ident: Option<PersonIdent>,
    push_cert: Option<PushCertificate>,
    allow_non_fast_forwards: bool,
    atomic: bool,
}

impl BatchRefUpdate {
    /// `atomic` requests all-or-nothing semantics; it only takes effect if the
    /// database supports atomic transactions.
    pub fn new(atomic: bool) -> Self {
        Self {
            commands: Vec::new(),
            ref_log_message: None,
            ref_log_ident: None,
            push_cert: None,
            allow_non_fast_forwards: false,
            atomic,
        }
    }

    /// Append a command; commands run in the order they were added.
    pub fn add_command(&mut self, cmd: ReceiveCommand) -> &mut Self {
        self.commands.push(cmd);
        self
    }

    pub fn commands(&self) -> &[ReceiveCommand] {
        &self.commands
    }

    /// Mutable access for recording per-command results.
    pub fn commands_mut(&mut self) -> &mut [ReceiveCommand] {
        &mut self.commands
    }

    /// Message recorded on every reflog entry written by this batch.
    pub fn set_ref_log_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.ref_log_message = Some(message.into());
        self
    }

    pub fn ref_log_message(&self) -> Option<&str> {
        self.ref_log_message.as_deref()
    }

    /// Identity recorded on every reflog entry written by this batch.
    pub fn set_ref_log_ident(&mut self, ident: PersonIdent) -> &mut Self {
        self.ref_log_ident = Some(ident);
        self
    }

    pub fn ref_log_ident(&self) -> Option<&PersonIdent> {
        self.ref_log_ident.as_ref()
    }

    /// Certificate stored alongside the reflog entries, if any.
    pub fn set_push_certificate(&mut self, cert: Option<PushCertificate>) -> &mut Self {
        self.push_cert = cert;
        self
    }

    pub fn push_certificate(&self) -> Option<&PushCertificate> {
        self.push_cert.as_ref()
    }

    /// Let commands move a ref to a commit that does not descend from its old tip.
    pub fn set_allow_non_fast_forwards(&mut self, allow: bool) -> &mut Self {
        self.allow_non_fast_forwards = allow;
        self
    }

    pub fn is_allow_non_fast_forwards(&self) -> bool {
        self.allow_non_fast_forwards
    }

    pub fn is_atomic(&self) -> bool {
        self.atomic
    }
}

impl fmt::Display for BatchRefUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BatchRefUpdate[")?;
        for (i, cmd) in self.commands.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{cmd}")?;
        }
        write!(f, "]")
    }
}
