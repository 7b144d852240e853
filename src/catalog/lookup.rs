//! Cached lookups over the catalog.
//!
//! The application list weighs several megabytes, so [`CatalogLookup`] keeps
//! it in memory for a configurable time instead of fetching it for every
//! command.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use log::{debug, info};
use rand::seq::SliceRandom;
use reqwest::Error;
use tokio::sync::Mutex;

use crate::catalog::{
    requester::CatalogRequester,
    response_structs::{App, AppDetails},
};

struct CachedList {
    apps: Arc<Vec<App>>,
    fetched_at: Instant,
}

/// Lookup service answering the catalog commands.
pub struct CatalogLookup<R: CatalogRequester> {
    requester: R,
    /// How long a fetched list is reused, zero disables the cache
    cache_ttl: Duration,
    cache: Mutex<Option<CachedList>>,
}

impl<R: CatalogRequester> CatalogLookup<R> {
    pub fn new(requester: R, cache_ttl: Duration) -> Self {
        CatalogLookup {
            requester,
            cache_ttl,
            cache: Mutex::new(None),
        }
    }

    /// Returns the named catalog entries, from the cache when it is fresh.
    ///
    /// Entries without a name are dropped.
    ///
    /// # Errors
    ///
    /// Returns the requester error when the list has to be fetched and the
    /// request fails. A failed fetch leaves the previous cache untouched.
    pub async fn apps(&self) -> Result<Arc<Vec<App>>, Error> {
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.as_ref() {
            if cached.fetched_at.elapsed() < self.cache_ttl {
                debug!("use cached app list ({} apps)", cached.apps.len());
                return Ok(Arc::clone(&cached.apps));
            }
        }

        let apps: Vec<App> = self
            .requester
            .get_app_list()
            .await?
            .into_iter()
            .filter(|app| !app.name.trim().is_empty())
            .collect();
        info!("fetched app list with {} named apps", apps.len());

        let apps = Arc::new(apps);
        *cache = Some(CachedList {
            apps: Arc::clone(&apps),
            fetched_at: Instant::now(),
        });

        Ok(apps)
    }

    /// Picks up to `count` distinct entry names at random.
    pub async fn random_names(&self, count: usize) -> Result<Vec<String>, Error> {
        let apps = self.apps().await?;

        let mut rng = rand::thread_rng();
        Ok(apps
            .choose_multiple(&mut rng, count)
            .map(|app| app.name.clone())
            .collect())
    }

    /// Finds the first entry whose name contains `name`, ignoring case.
    pub async fn find(&self, name: &str) -> Result<Option<App>, Error> {
        let needle = name.to_lowercase();
        let apps = self.apps().await?;

        let found = apps
            .iter()
            .find(|app| app.name.to_lowercase().contains(&needle))
            .cloned();
        debug!("lookup of {:?} -> {:?}", name, found);

        Ok(found)
    }

    /// Fetches the detail record of an entry.
    pub async fn details(&self, app: &App) -> Result<Option<AppDetails>, Error> {
        self.requester.get_app_details(app.appid).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::catalog::requester::MockCatalogRequester;

    fn create_apps() -> Vec<App> {
        [(620, "Portal 2"), (570, "Dota 2"), (10, ""), (400, "Portal"), (730, "Counter-Strike 2")]
            .into_iter()
            .map(|(appid, name)| App {
                appid,
                name: name.to_owned(),
            })
            .collect()
    }

    fn create_requester(times: usize) -> MockCatalogRequester {
        let mut requester = MockCatalogRequester::new();
        requester
            .expect_get_app_list()
            .times(times)
            .returning(|| Ok(create_apps()));
        requester
    }

    #[tokio::test]
    async fn test_apps_skips_unnamed_entries() {
        let lookup = CatalogLookup::new(create_requester(1), Duration::from_secs(3600));

        let apps = lookup.apps().await.unwrap();
        assert_eq!(apps.len(), 4);
        assert!(apps.iter().all(|app| !app.name.is_empty()));
    }

    #[tokio::test]
    async fn test_apps_are_cached() {
        let lookup = CatalogLookup::new(create_requester(1), Duration::from_secs(3600));

        lookup.apps().await.unwrap();
        lookup.find("dota").await.unwrap();
        lookup.random_names(2).await.unwrap();
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let lookup = CatalogLookup::new(create_requester(2), Duration::ZERO);

        lookup.apps().await.unwrap();
        lookup.apps().await.unwrap();
    }

    #[tokio::test]
    async fn test_random_names_are_distinct() {
        let lookup = CatalogLookup::new(create_requester(1), Duration::from_secs(3600));

        let names = lookup.random_names(3).await.unwrap();
        assert_eq!(names.len(), 3);
        assert_eq!(names.iter().collect::<HashSet<_>>().len(), 3);

        // Asking for more than available returns the whole catalog
        assert_eq!(lookup.random_names(10).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_find_first_case_insensitive_match() {
        let lookup = CatalogLookup::new(create_requester(1), Duration::from_secs(3600));

        let found = lookup.find("PORTAL").await.unwrap().unwrap();
        assert_eq!(found.appid, 620);

        assert!(lookup.find("half-life").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_error_is_propagated() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ISteamApps/GetAppList/v0002/")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;
        let requester = crate::catalog::SteamRequester::new(
            &server.url(),
            &server.url(),
            "key",
            Duration::from_secs(5),
        )
        .unwrap();

        let lookup = CatalogLookup::new(requester, Duration::from_secs(3600));
        assert!(lookup.find("portal").await.is_err());
    }

    #[tokio::test]
    async fn test_details() {
        let mut requester = create_requester(0);
        requester
            .expect_get_app_details()
            .withf(|app_id| *app_id == 620)
            .times(1)
            .returning(|_| {
                Ok(Some(AppDetails {
                    name: "Portal 2".to_owned(),
                    ..Default::default()
                }))
            });
        let lookup = CatalogLookup::new(requester, Duration::from_secs(3600));

        let app = App {
            appid: 620,
            name: "Portal 2".to_owned(),
        };
        let details = lookup.details(&app).await.unwrap().unwrap();
        assert_eq!(details.name, "Portal 2");
    }
}
