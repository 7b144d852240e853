//! Games command handler.
//!
//! Picks a handful of distinct games at random from the catalog.

use log::{debug, error};

use crate::{
    catalog::{CatalogLookup, CatalogRequester},
    commands::{
        CommandResult,
        markdown_response::{format_games, format_games_error},
    },
};

/// Number of games listed by the command.
const GAMES_COUNT: usize = 5;

pub async fn handle_games<R: CatalogRequester>(catalog: &CatalogLookup<R>) -> CommandResult {
    debug!("handling games command");

    let response = match catalog.random_names(GAMES_COUNT).await {
        Ok(names) => format_games(&names),
        Err(e) => {
            error!("failed to fetch games: {:?}", e);
            format_games_error()
        }
    };

    CommandResult::reply(response)
}
