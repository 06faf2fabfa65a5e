use crate::session::{SessionClient, SessionError, User};

/// Server-side check at the entry of the protected area.
///
/// Runs a live user lookup of its own and does not rely on the access gate
/// having run. Any error means the caller must redirect to the login page.
#[tracing::instrument(skip_all)]
pub async fn require_user(client: &SessionClient) -> Result<User, SessionError> {
    match client.get_current_user().await {
        Ok(user) => Ok(user),
        Err(e) => {
            if e.is_transient() {
                tracing::warn!(error = %e, "Protected area guard could not reach provider");
            } else {
                tracing::debug!(error = %e, "Protected area guard denied request");
            }
            Err(e)
        }
    }
}
