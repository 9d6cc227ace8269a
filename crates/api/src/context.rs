use careerforge_core::UserId;

/// Authenticated identity for a request.
///
/// This is immutable and must be present for all job routes; ownership
/// checks downstream trust only this, never ids the client supplies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    user_id: UserId,
    email: Option<String>,
}

impl UserContext {
    pub fn new(user_id: UserId, email: Option<String>) -> Self {
        Self { user_id, email }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}
