//! Response structures for the Steam catalog endpoints.
//!
//! This module contains structures for deserializing JSON responses from the
//! Steam Web API (application list) and the Steam store (application details).

use serde::Deserialize;
use std::fmt;

/// Response from `/ISteamApps/GetAppList/v0002/`.
#[derive(Deserialize, Debug)]
pub struct AppListResponse {
    pub applist: AppList,
}

/// Wrapper of the application list.
#[derive(Deserialize, Debug)]
pub struct AppList {
    pub apps: Vec<App>,
}

/// Catalog entry from the application list.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct App {
    /// Steam application identifier.
    pub appid: u64,
    /// Title of the application, may be empty for tools and removed apps.
    pub name: String,
}

impl fmt::Display for App {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "appid={}, name={}", self.appid, self.name)
    }
}

/// Entry of the `/api/appdetails?appids={id}` response, keyed by the app id.
///
/// `data` is absent when `success` is false, e.g. for region-locked titles.
#[derive(Deserialize, Debug)]
pub struct AppDetailsEnvelope {
    pub success: bool,
    pub data: Option<AppDetails>,
}

/// Detail record of a catalog entry.
///
/// Every field is optional in practice, missing ones fall back to their
/// default value.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AppDetails {
    pub name: String,
    pub developers: Vec<String>,
    pub publishers: Vec<String>,
    pub platforms: Option<Platforms>,
    pub genres: Vec<Genre>,
    pub release_date: Option<ReleaseDate>,
    pub screenshots: Vec<Screenshot>,
}

impl fmt::Display for AppDetails {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "name={}, developers={:?}, publishers={:?}, genres={}, screenshots={}",
            self.name,
            self.developers,
            self.publishers,
            self.genres.len(),
            self.screenshots.len()
        )
    }
}

/// Operating systems the title runs on.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Platforms {
    pub windows: bool,
    pub mac: bool,
    pub linux: bool,
}

impl Platforms {
    /// Names of the supported platforms.
    pub fn names(&self) -> Vec<&'static str> {
        [
            (self.windows, "Windows"),
            (self.mac, "Mac"),
            (self.linux, "Linux"),
        ]
        .into_iter()
        .filter_map(|(supported, name)| supported.then_some(name))
        .collect()
    }
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Genre {
    pub description: String,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ReleaseDate {
    pub coming_soon: bool,
    /// Human readable date, e.g. `21 Aug, 2012`
    pub date: String,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Screenshot {
    pub path_thumbnail: String,
    pub path_full: String,
}
