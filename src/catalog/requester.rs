//! HTTP client for the Steam catalog.
//!
//! This module provides the [`SteamRequester`] struct for fetching the
//! application list from the Steam Web API and application details from the
//! Steam store.

use std::{collections::HashMap, time::Duration};

use log::{debug, info};
use mockall::automock;
use reqwest::{Client, Error};

use crate::catalog::response_structs::{App, AppDetails, AppDetailsEnvelope, AppListResponse};

/// HTTP client for requesting catalog data.
///
/// # Examples
///
/// ```no_run
/// let requester = SteamRequester::new(
///     "https://api.steampowered.com",
///     "https://store.steampowered.com",
///     "api_key",
///     Duration::from_secs(10),
/// )?;
/// let apps = requester.get_app_list().await?;
/// println!("{} apps", apps.len());
/// ```
pub struct SteamRequester {
    /// Steam Web API url
    api_url: String,
    /// Steam store url
    store_url: String,
    /// Steam Web API key
    api_key: String,
    /// HTTP client, with the request timeout applied
    client: Client,
}

/// Trait for making requests to the catalog.
///
/// This trait abstracts the HTTP operations for easier testing with mocks.
#[automock]
pub trait CatalogRequester {
    /// Fetches the whole application list.
    async fn get_app_list(&self) -> Result<Vec<App>, Error>;
    /// Fetches the detail record of an application, `None` if the store has no
    /// record for it.
    async fn get_app_details(&self, app_id: u64) -> Result<Option<AppDetails>, Error>;
}

impl SteamRequester {
    /// Create a new [SteamRequester].
    ///
    /// # Arguments
    ///
    /// * `api_url` - The base URL of the Steam Web API.
    /// * `store_url` - The base URL of the Steam store.
    /// * `api_key` - The Steam Web API key.
    /// * `timeout` - The maximum wait for a single request.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        api_url: &str,
        store_url: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(SteamRequester {
            api_url: api_url.trim_end_matches('/').to_string(),
            store_url: store_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }
}

impl CatalogRequester for SteamRequester {
    /// Request `/ISteamApps/GetAppList/v0002/` to get the application list.
    ///
    /// This api call returns a json object wrapping every application:
    /// ```
    /// { "applist": { "apps": [ { "appid": 620, "name": "Portal 2" } ] } }
    /// ```
    async fn get_app_list(&self) -> Result<Vec<App>, Error> {
        let url = format!("{}/ISteamApps/GetAppList/v0002/", &self.api_url);
        info!("request app list");
        debug!("request {}", &url);

        let response: AppListResponse = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("format", "json")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(
            "response from {} -> {} apps",
            &url,
            response.applist.apps.len()
        );

        Ok(response.applist.apps)
    }

    /// Request `/api/appdetails?appids={appId}` to get the details of an application.
    ///
    /// This api call returns a json object keyed by the requested id:
    /// ```
    /// { "620": { "success": true, "data": { "name": "Portal 2", ... } } }
    /// ```
    async fn get_app_details(&self, app_id: u64) -> Result<Option<AppDetails>, Error> {
        let url = format!("{}/api/appdetails", &self.store_url);
        let app_id = app_id.to_string();
        info!("request app details of {}", &app_id);
        debug!("request {}?appids={}", &url, &app_id);

        let mut response: HashMap<String, AppDetailsEnvelope> = self
            .client
            .get(&url)
            .query(&[("appids", &app_id)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let details = response
            .remove(&app_id)
            .filter(|envelope| envelope.success)
            .and_then(|envelope| envelope.data);

        debug!(
            "response from {}?appids={} -> {:?}",
            &url, &app_id, &details
        );

        Ok(details)
    }
}
