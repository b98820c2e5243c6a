use crate::models::role::Role;
use crate::models::user::UserProfile;

/// In-memory authentication state for one app instance.
///
/// `is_authenticated` is only ever true together with a token and a user;
/// use [`Session::authenticated`] and [`Session::unauthenticated`] to change
/// the verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub user: Option<UserProfile>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub is_logging_out: bool,
}

impl Session {
    pub fn authenticated(token: String, user: UserProfile) -> Self {
        Self {
            access_token: Some(token),
            user: Some(user),
            is_authenticated: true,
            is_loading: false,
            is_logging_out: false,
        }
    }

    pub fn unauthenticated() -> Self {
        Self::default()
    }

    pub fn role(&self) -> Option<Role> {
        if !self.is_authenticated {
            return None;
        }
        self.user.as_ref().map(|user| user.role)
    }

    /// Replaces the auth fields, keeping the progress flags.
    pub fn adopt(&mut self, verdict: Session) {
        self.access_token = verdict.access_token;
        self.user = verdict.user;
        self.is_authenticated = verdict.is_authenticated;
    }
}
