use thiserror::Error;

/// Something the invoking user got wrong.  Carries the already rendered reply; the command
/// boundary sends it to the channel instead of logging a system error.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct UserError(pub String);

impl UserError {
    pub fn new(reply: impl Into<String>) -> Self {
        Self(reply.into())
    }
}

/// Misuse of the registries by a plugin while it loads.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("command name `{name}` is already taken by `{owner}`")]
    DuplicateName { name: String, owner: String },
}
