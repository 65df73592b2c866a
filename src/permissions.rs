//! Role-based authorization for commands.
//!
//! A command declares the roles allowed to run it.  Each server can extend that set per command
//! through the store (`override:<server>:<command>`).  The server owner is always allowed.
//! Owner-only commands are checked separately against the configured bot owner and never come
//! through here.

use crate::{
    log_error,
    model::{Member, Server},
    store::Store,
};
use std::collections::HashSet;

/// Decide with the overrides already fetched.
pub fn authorized_by_roles(
    member: &Member,
    server: &Server,
    declared: &HashSet<String>,
    overrides: &HashSet<String>,
) -> bool {
    if member.id == server.owner_id {
        return true;
    }

    let effective: HashSet<&str> = declared
        .iter()
        .chain(overrides.iter())
        .map(String::as_str)
        .collect();

    // Nothing required, open to everyone
    if effective.is_empty() {
        return true;
    }

    member.has_any_role(&effective)
}

/// Whether `member` may run `command` on `server`.  Overrides are queried live; a store failure
/// counts as no overrides.
pub async fn is_authorized(
    store: &dyn Store,
    member: &Member,
    server: &Server,
    declared: &HashSet<String>,
    command: &str,
) -> bool {
    // Owner bypass needs no store round trip
    if member.id == server.owner_id {
        return true;
    }

    let overrides = match store.get_role_overrides(server.id, command).await {
        Ok(overrides) => overrides,
        Err(err) => {
            log_error!(
                "Could not fetch role overrides for `{}` on {}: {:#}",
                command,
                server.id,
                err
            );
            HashSet::new()
        }
    };

    authorized_by_roles(member, server, declared, &overrides)
}
