//! The media shelf: a per-profile list of image links kept on disk.

use std::path::Path;

use chrono::{NaiveDate, Utc};
use trellis_core::stores::MediaStore;
use trellis_core::util::is_http_url;
use trellis_core::MediaItem;

use crate::cli::MediaCommands;
use crate::commands::common::{format_media_lines, normalize_name, print_json};
use crate::config_profiles::{media_shelf_path, CliProfilesConfig};
use crate::error::CliError;

pub fn run_media(command: MediaCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global_profile);
    let path = media_shelf_path(&profile_name).map_err(CliError::Config)?;
    let mut shelf = load_shelf(&path)?;

    match command {
        MediaCommands::List { json } => {
            if json {
                print_json(shelf.items())?;
            } else if shelf.items().is_empty() {
                println!("The media shelf is empty. Add an item with `trellis media add <name> --url <url>`.");
            } else {
                for line in format_media_lines(shelf.items()) {
                    println!("{line}");
                }
            }
        }
        MediaCommands::Add { name, url, date } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let item = new_media_item(&shelf, &name, &url, date)?;
            let id = item.id.clone();
            shelf.add_media(item);
            save_shelf(&path, &shelf)?;
            tracing::debug!(media_id = %id, "Added media item");
            println!("{id}");
        }
    }
    Ok(())
}

/// Shelf stored at `path`, or the starter shelf when nothing was saved yet.
pub fn load_shelf(path: &Path) -> Result<MediaStore, CliError> {
    if !path.exists() {
        return Ok(MediaStore::seeded());
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(MediaStore::with_items(serde_json::from_str(&raw)?))
}

pub fn save_shelf(path: &Path, shelf: &MediaStore) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(shelf.items())?)?;
    Ok(())
}

pub fn new_media_item(
    shelf: &MediaStore,
    name: &[String],
    url: &str,
    date: NaiveDate,
) -> Result<MediaItem, CliError> {
    let name = normalize_name(name, "Media name")?;
    let url = url.trim();
    if !is_http_url(url) {
        return Err(CliError::InvalidMediaUrl(url.to_string()));
    }
    Ok(MediaItem {
        id: shelf.next_id(),
        name,
        url: url.to_string(),
        date,
    })
}
