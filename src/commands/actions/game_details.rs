//! Game details command handler.
//!
//! Looks the name up in the catalog and fetches the detail record of the first
//! match. No detail request is made when nothing matches.

use log::{debug, error, info};

use crate::{
    catalog::{CatalogLookup, CatalogRequester},
    commands::{
        CommandResult,
        markdown_response::{format_game_details, format_game_details_error, format_game_not_found},
    },
};

pub async fn handle_game_details<R: CatalogRequester>(
    catalog: &CatalogLookup<R>,
    name: &str,
) -> CommandResult {
    debug!("handling gameDetails command for {:?}", name);

    let app = match catalog.find(name).await {
        Ok(Some(app)) => app,
        Ok(None) => {
            info!("no game matching {:?}", name);
            return CommandResult::reply(format_game_not_found(name));
        }
        Err(e) => {
            error!("failed to search game {:?}: {:?}", name, e);
            return CommandResult::reply(format_game_details_error());
        }
    };

    let response = match catalog.details(&app).await {
        Ok(Some(details)) => format_game_details(name, &details),
        Ok(None) => {
            error!("store has no details for {}", app);
            format_game_details_error()
        }
        Err(e) => {
            error!("failed to fetch details of {}: {:?}", app, e);
            format_game_details_error()
        }
    };

    CommandResult::reply(response)
}
