//! Dashboard view model.

use crate::FormOutcome;
use auth_context::{AuthSnapshot, SessionHandle, LOGIN_PATH};
use auth_engine::User;

/// What the dashboard shows for a signed-in user.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub user: User,
}

impl DashboardView {
    /// Build the view; `None` when nobody is signed in.
    pub fn from_snapshot(snapshot: &AuthSnapshot) -> Option<Self> {
        snapshot.user.clone().map(|user| Self { user })
    }

    pub fn greeting(&self) -> String {
        format!("You are logged in as {}", self.user.display_email())
    }

    /// The logout button.
    pub async fn sign_out(&self, handle: &SessionHandle) -> FormOutcome {
        match handle.sign_out().await {
            Ok(()) => FormOutcome::Navigate { to: LOGIN_PATH },
            Err(failure) => failure.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{mounted, EMAIL, PASSWORD};
    use auth_context::{guard_protected, GuardDecision};
    use auth_engine::testing::FakeProvider;

    #[tokio::test]
    async fn test_greeting_and_logout() {
        let (_provider, _context, handle) =
            mounted(FakeProvider::new().with_account(EMAIL, PASSWORD)).await;
        assert!(DashboardView::from_snapshot(&handle.snapshot()).is_none());

        handle.sign_in(EMAIL, PASSWORD).await.unwrap();
        let view = DashboardView::from_snapshot(&handle.snapshot()).unwrap();
        assert_eq!(view.greeting(), "You are logged in as user@example.com");

        assert_eq!(
            view.sign_out(&handle).await,
            FormOutcome::Navigate { to: LOGIN_PATH }
        );
        assert_eq!(
            guard_protected(&handle.snapshot()),
            GuardDecision::Redirect { to: LOGIN_PATH }
        );
    }
}
