//! Creation of the authenticated Matrix SDK client.
//!
//! The first start logs in with the account password and stores the session in
//! the data directory. Later starts restore that session instead of creating a
//! new device each time.

use log::{debug, info};
use matrix_sdk::{Client, ruma::OwnedUserId};

use crate::matrix::{UserCredentials, session::SessionStore};

/// Builds an SDK client for the account, backed by the SQLite store of the
/// data directory.
async fn build_client(user_id: &OwnedUserId, store: &SessionStore) -> anyhow::Result<Client> {
    let client = Client::builder()
        .server_name(user_id.server_name())
        .sqlite_store(store.sqlite_path(), None)
        .build()
        .await?;

    debug!("matrix client created");
    Ok(client)
}

async fn create_session(
    user_credentials: &UserCredentials,
    store: &SessionStore,
) -> anyhow::Result<Client> {
    let user_id: OwnedUserId = user_credentials.user_id.clone().try_into()?;
    let client = build_client(&user_id, store).await?;

    client
        .matrix_auth()
        .login_username(&user_id, &user_credentials.password)
        .initial_device_display_name("savepoint bot")
        .send()
        .await?;

    let Some(user_session) = client.matrix_auth().session() else {
        anyhow::bail!("no session after logging in as {}", user_id);
    };
    store.save_user_session(&user_session).await?;

    info!("logged in as {}", user_id);
    Ok(client)
}

async fn restore_session(
    user_credentials: &UserCredentials,
    store: &SessionStore,
    user_session: matrix_sdk::authentication::matrix::MatrixSession,
) -> anyhow::Result<Client> {
    info!("restoring matrix session from disk");

    let user_id: OwnedUserId = user_credentials.user_id.clone().try_into()?;
    let client = build_client(&user_id, store).await?;
    client.restore_session(user_session).await?;

    info!("matrix session restored for {}", user_id);
    Ok(client)
}

/// Returns a logged in client, restoring the stored session when there is one.
///
/// # Errors
///
/// Returns an error if the user id is invalid, the homeserver cannot be
/// reached, the login is refused or the session cannot be stored.
pub async fn setup_client(
    user_credentials: &UserCredentials,
    store: &SessionStore,
) -> anyhow::Result<Client> {
    info!(
        "setting up matrix client for user {}",
        user_credentials.user_id
    );

    match store.user_session().await {
        Some(user_session) => restore_session(user_credentials, store, user_session).await,
        None => create_session(user_credentials, store).await,
    }
}
