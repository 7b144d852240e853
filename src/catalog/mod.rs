//! Game catalog integration.
//!
//! This module fetches the list of games and their detail records from Steam
//! and answers the lookup commands from a cached copy of the list.
//!
//! # Modules
//!
//! - `requester` - HTTP client for the Steam Web API and store endpoints
//! - `response_structs` - Data structures for API responses
//! - `lookup` - Cached search and random sampling over the game list
//!
//! # Examples
//!
//! ```no_run
//! use savepoint::catalog::{CatalogLookup, SteamRequester};
//!
//! let requester = SteamRequester::new(
//!     "https://api.steampowered.com",
//!     "https://store.steampowered.com",
//!     "api_key",
//!     Duration::from_secs(10),
//! )?;
//! let lookup = CatalogLookup::new(requester, Duration::from_secs(3600));
//! let game = lookup.find("portal").await?;
//! ```

mod lookup;
mod requester;
mod response_structs;

pub use crate::catalog::lookup::CatalogLookup;
#[cfg(test)]
pub use crate::catalog::requester::MockCatalogRequester;
pub use crate::catalog::requester::{CatalogRequester, SteamRequester};
pub use crate::catalog::response_structs::{App, AppDetails};
#[cfg(test)]
pub use crate::catalog::response_structs::{Genre, Platforms, ReleaseDate, Screenshot};
