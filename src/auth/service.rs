use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::dto::TokenPair;
use crate::auth::error::AuthError;
use crate::auth::hashing;
use crate::auth::jwt::JwtKeys;
use crate::auth::store::{CredentialStore, User};

/// Per-user session state, derived in one place so every call site sees the
/// same two-state machine.
pub(crate) enum Session<'a> {
    None,
    Active(&'a str),
}

impl User {
    pub(crate) fn session(&self) -> Session<'_> {
        match self.refresh_token_hash.as_deref() {
            Some(digest) => Session::Active(digest),
            None => Session::None,
        }
    }
}

fn mint_pair(keys: &JwtKeys, user: &User) -> Result<TokenPair, AuthError> {
    let access_token = keys.sign_access(user.id, &user.email)?;
    let refresh_token = keys.sign_refresh(user.id, &user.email)?;
    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Create the account and immediately establish a session. Uniqueness is
/// enforced by the store's atomic create, not a lookup first.
pub async fn sign_up(
    store: &dyn CredentialStore,
    keys: &JwtKeys,
    email: &str,
    password: &str,
) -> Result<TokenPair, AuthError> {
    let password_hash = hashing::hash_blocking(password.to_owned()).await?;
    let user = store.create(email, &password_hash).await?;

    let pair = mint_pair(keys, &user)?;
    let refresh_hash = hashing::hash_blocking(pair.refresh_token.clone()).await?;
    store.store_refresh_hash(user.id, &refresh_hash).await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(pair)
}

/// Unknown email and wrong password yield the same `Unauthorized`, so a
/// caller cannot probe which addresses exist.
pub async fn sign_in(
    store: &dyn CredentialStore,
    keys: &JwtKeys,
    email: &str,
    password: &str,
) -> Result<TokenPair, AuthError> {
    let user = match store.find_by_email(email).await? {
        Some(u) => u,
        None => {
            warn!(email = %email, "sign-in for unknown email");
            return Err(AuthError::Unauthorized);
        }
    };

    if !hashing::verify_blocking(password.to_owned(), user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "sign-in with wrong password");
        return Err(AuthError::Unauthorized);
    }

    // Last login wins: any prior session fingerprint is overwritten.
    let pair = mint_pair(keys, &user)?;
    let refresh_hash = hashing::hash_blocking(pair.refresh_token.clone()).await?;
    store.store_refresh_hash(user.id, &refresh_hash).await?;

    info!(user_id = %user.id, "user signed in");
    Ok(pair)
}

/// Best-effort clear of the active session; a no-op if there is none.
pub async fn log_out(store: &dyn CredentialStore, user_id: Uuid) -> Result<(), AuthError> {
    store.clear_refresh_hash(user_id).await?;
    info!(user_id = %user_id, "session cleared");
    Ok(())
}

/// Redeem a refresh token for a new pair, rotating the stored fingerprint.
/// A refresh cannot succeed against a session that was logged out or never
/// established, and exactly one of two concurrent rotations wins.
pub async fn refresh(
    store: &dyn CredentialStore,
    keys: &JwtKeys,
    user_id: Uuid,
    presented: &str,
) -> Result<TokenPair, AuthError> {
    let user = match store.find_by_id(user_id).await? {
        Some(u) => u,
        None => return Err(AuthError::Forbidden),
    };
    let current_hash = match user.session() {
        Session::Active(digest) => digest.to_owned(),
        Session::None => {
            warn!(user_id = %user.id, "refresh without an active session");
            return Err(AuthError::Forbidden);
        }
    };

    // A mismatch also covers tokens already rotated away.
    if !hashing::verify_blocking(presented.to_owned(), current_hash.clone()).await? {
        warn!(user_id = %user.id, "refresh token did not match stored fingerprint");
        return Err(AuthError::Forbidden);
    }

    let pair = mint_pair(keys, &user)?;
    let new_hash = hashing::hash_blocking(pair.refresh_token.clone()).await?;
    if !store
        .rotate_refresh_hash(user.id, &current_hash, &new_hash)
        .await?
    {
        warn!(user_id = %user.id, "refresh lost a rotation race");
        return Err(AuthError::Forbidden);
    }

    info!(user_id = %user.id, "refresh token rotated");
    Ok(pair)
}
