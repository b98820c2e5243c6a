//! Authorization module - role policy and edge route guard
//!
//! One role table (`policy`) feeds both the in-app check (`can_access`)
//! and the edge guard (`guard::evaluate`), so the two cannot drift apart.

pub mod guard;
pub mod policy;

pub use guard::{evaluate, GuardAction, GuardOutcome, GuardRequest, GuardState};
pub use policy::{allows, allows_raw, PathRule};

use crate::models::Session;

/// In-app access check. False unless the session is authenticated with a
/// known role.
pub fn can_access(session: &Session, path: &str) -> bool {
    match session.role() {
        Some(role) => policy::allows(role, path),
        None => false,
    }
}
