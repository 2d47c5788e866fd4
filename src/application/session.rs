use crate::domain::ports::{AuthServiceRef, LocalStore, LocalStoreRef, NotificationHubRef};
use crate::domain::session::{Account, Role, SessionContext};
use crate::error::{CartError, Result};
use crate::utils::retry::CallPolicy;
use tracing::{info, instrument, warn};

pub const CREDENTIAL_KEY: &str = "credential";
pub const ACCOUNT_ID_KEY: &str = "account_id";
pub const ROLE_KEY: &str = "role";
pub const DISPLAY_NAME_KEY: &str = "display_name";
pub const EMAIL_KEY: &str = "email";

const IDENTITY_KEYS: [&str; 5] = [
    CREDENTIAL_KEY,
    ACCOUNT_ID_KEY,
    ROLE_KEY,
    DISPLAY_NAME_KEY,
    EMAIL_KEY,
];

/// Rebuilds the session from the scalar identity keys.
///
/// Without both a credential and an account id the shopper is anonymous.
pub async fn load_identity(store: &dyn LocalStore) -> Result<SessionContext> {
    let credential = store.get(CREDENTIAL_KEY).await?.unwrap_or_default();
    let account_id = store.get(ACCOUNT_ID_KEY).await?.unwrap_or_default();
    if credential.is_empty() || account_id.is_empty() {
        return Ok(SessionContext::anonymous());
    }

    let role = match store.get(ROLE_KEY).await? {
        Some(raw) => raw.parse::<Role>().unwrap_or_else(|error| {
            warn!(%error, "Unknown stored role, falling back to buyer");
            Role::Buyer
        }),
        None => Role::Buyer,
    };

    Ok(SessionContext::authenticated(Account {
        credential,
        account_id,
        role,
        display_name: store.get(DISPLAY_NAME_KEY).await?.unwrap_or_default(),
        email: store.get(EMAIL_KEY).await?.unwrap_or_default(),
    }))
}

pub async fn persist_identity(store: &dyn LocalStore, account: &Account) -> Result<()> {
    store.set(CREDENTIAL_KEY, account.credential.clone()).await?;
    store.set(ACCOUNT_ID_KEY, account.account_id.clone()).await?;
    store.set(ROLE_KEY, account.role.to_string()).await?;
    store.set(DISPLAY_NAME_KEY, account.display_name.clone()).await?;
    store.set(EMAIL_KEY, account.email.clone()).await?;
    Ok(())
}

/// Removes every identity key. The `cart` key is left alone.
pub async fn clear_identity(store: &dyn LocalStore) -> Result<()> {
    for key in IDENTITY_KEYS {
        store.remove(key).await?;
    }
    Ok(())
}

/// Login, logout and session restore against the account service.
pub struct SessionManager {
    auth: AuthServiceRef,
    local: LocalStoreRef,
    notifications: NotificationHubRef,
    calls: CallPolicy,
}

impl SessionManager {
    pub fn new(
        auth: AuthServiceRef,
        local: LocalStoreRef,
        notifications: NotificationHubRef,
        calls: CallPolicy,
    ) -> Self {
        Self {
            auth,
            local,
            notifications,
            calls,
        }
    }

    /// Session stored on this device from an earlier login, if any.
    pub async fn restore(&self) -> Result<SessionContext> {
        let session = load_identity(self.local.as_ref()).await?;
        if let Some(account) = session.account() {
            self.join_notifications(&account.account_id).await;
        }
        Ok(session)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionContext> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(CartError::ValidationError(
                "Email and password are required".to_string(),
            ));
        }

        let account = self
            .calls
            .once(|| self.auth.login(email, password))
            .await?;
        persist_identity(self.local.as_ref(), &account).await?;
        info!(account_id = %account.account_id, role = %account.role, "Logged in");

        self.join_notifications(&account.account_id).await;
        Ok(SessionContext::authenticated(account))
    }

    /// Invalidates the credential remotely (best effort) and forgets it locally.
    #[instrument(skip(self, session))]
    pub async fn logout(&self, session: &SessionContext) -> Result<()> {
        if let Some(account) = session.account() {
            if let Err(error) = self
                .calls
                .retrying(|| self.auth.logout(&account.credential))
                .await
            {
                warn!(%error, "Remote logout failed, clearing local identity anyway");
            }
            if let Err(error) = self.notifications.leave(&account.account_id).await {
                warn!(%error, "Could not leave notification room");
            }
        }
        clear_identity(self.local.as_ref()).await?;
        info!("Logged out");
        Ok(())
    }

    /// Local-only logout after the server rejected the credential: no remote
    /// call is made, but the notification room is left.
    pub async fn force_logout(&self, session: &SessionContext) -> Result<()> {
        warn!("Credential rejected by server, forcing logout");
        if let Some(account) = session.account()
            && let Err(error) = self.notifications.leave(&account.account_id).await
        {
            warn!(%error, "Could not leave notification room");
        }
        clear_identity(self.local.as_ref()).await
    }

    async fn join_notifications(&self, account_id: &str) {
        if let Err(error) = self.notifications.join(account_id).await {
            warn!(%error, account_id, "Could not join notification room");
        }
    }
}
