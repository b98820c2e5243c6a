use crate::models::Role;

/// Access rule attached to a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRule {
    Unrestricted,
    AllowOnly(&'static [&'static str]),
    DenyPrefixes(&'static [&'static str]),
}

const SECRETARY_DENIED: &[&str] = &["/billing"];
const CREW_ALLOWED: &[&str] = &["/", "/workload", "/settings"];
const CLIENT_ALLOWED: &[&str] = &["/", "/booking", "/package", "/billing", "/settings"];

impl Role {
    pub fn path_rule(&self) -> PathRule {
        match self {
            Role::Owner => PathRule::Unrestricted,
            Role::Secretary => PathRule::DenyPrefixes(SECRETARY_DENIED),
            Role::Editor | Role::Photographer => PathRule::AllowOnly(CREW_ALLOWED),
            Role::Client => PathRule::AllowOnly(CLIENT_ALLOWED),
        }
    }
}

/// `path` is `base` itself or lies underneath it. The root only matches
/// itself.
pub fn matches_base(path: &str, base: &str) -> bool {
    if path == base {
        return true;
    }
    if base == "/" {
        return false;
    }
    path.strip_prefix(base)
        .map(|rest| rest.starts_with('/'))
        .unwrap_or(false)
}

pub fn allows(role: Role, path: &str) -> bool {
    match role.path_rule() {
        PathRule::Unrestricted => true,
        PathRule::AllowOnly(bases) => bases.iter().any(|base| matches_base(path, base)),
        PathRule::DenyPrefixes(bases) => !bases.iter().any(|base| matches_base(path, base)),
    }
}

/// Same decision for a role string that has not been validated yet.
/// Unknown roles are denied everywhere.
pub fn allows_raw(role: &str, path: &str) -> bool {
    match Role::parse(role) {
        Ok(role) => allows(role, path),
        Err(_) => false,
    }
}
