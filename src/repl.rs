//! Interactive location search.
//!
//! Commands: `history`, `favorites`, `clear`, `quit`. Anything else is
//! treated as a partial location; a numbered suggestion can then be picked.

use crate::location::{FavoriteOutcome, GeocodingClient, LocationService, DEFAULT_MAX_SUGGESTIONS};
use std::io::{self, BufRead, Write};

/// History entries listed by the `history` command.
const HISTORY_SHOWN: usize = 10;

/// Run the search loop until `quit` or end of input.
pub fn run<G, R, W>(service: &mut LocationService<G>, mut input: R, out: &mut W) -> io::Result<()>
where
    G: GeocodingClient,
    R: BufRead,
    W: Write,
{
    writeln!(out, "{}", "=".repeat(50))?;
    writeln!(out, "INTERACTIVE WEATHER LOCATION SEARCH")?;
    writeln!(out, "{}", "=".repeat(50))?;
    writeln!(out, "Type a location name to get suggestions.")?;
    writeln!(out, "Commands: 'history', 'favorites', 'clear', 'quit'")?;

    loop {
        write!(out, "\nEnter location (or command): ")?;
        out.flush()?;
        let Some(line) = read_line(&mut input)? else {
            break;
        };
        if line.is_empty() {
            continue;
        }

        match line.to_lowercase().as_str() {
            "quit" => {
                writeln!(out, "Goodbye!")?;
                break;
            }
            "history" => show_history(service, out)?,
            "favorites" => show_favorites(service, out)?,
            "clear" => {
                service.clear_history();
                writeln!(out, "Search history cleared.")?;
            }
            _ => search(service, &line, &mut input, out)?,
        }
    }
    Ok(())
}

fn read_line<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut buf = String::new();
    if input.read_line(&mut buf)? == 0 {
        return Ok(None);
    }
    Ok(Some(buf.trim().to_string()))
}

fn search<G, R, W>(
    service: &mut LocationService<G>,
    query: &str,
    input: &mut R,
    out: &mut W,
) -> io::Result<()>
where
    G: GeocodingClient,
    R: BufRead,
    W: Write,
{
    let suggestions = service.suggest(query, DEFAULT_MAX_SUGGESTIONS);
    if suggestions.is_empty() {
        writeln!(out, "No suggestions found for '{}'", query)?;
        return Ok(());
    }

    writeln!(out, "\nSuggestions for '{}':", query)?;
    for (i, s) in suggestions.iter().enumerate() {
        writeln!(out, "  {}. {}", i + 1, s.short_name)?;
    }

    write!(out, "\nSelect option (1-{}) or press Enter for more typing: ", suggestions.len())?;
    out.flush()?;
    let choice = read_line(input)?.unwrap_or_default();
    if choice.is_empty() || !choice.chars().all(|c| c.is_ascii_digit()) {
        return Ok(());
    }

    let Some(selected) = choice
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| suggestions.get(i))
    else {
        writeln!(out, "Invalid selection.")?;
        return Ok(());
    };

    writeln!(out, "\nSelected: {}", selected.short_name)?;
    let record = match service.select_suggestion(query, selected) {
        Ok(record) => record,
        Err(failure) => {
            writeln!(out, "Could not resolve '{}': {}", selected.short_name, failure)?;
            return Ok(());
        }
    };
    writeln!(out, "Coordinates: ({:.4}, {:.4})", record.latitude, record.longitude)?;
    writeln!(out, "Type: {}", record.place_type)?;

    write!(out, "Add to favorites? (y/n): ")?;
    out.flush()?;
    if read_line(input)?.is_some_and(|a| a.eq_ignore_ascii_case("y")) {
        let name = record.short_name.clone();
        match service.store_mut().add_favorite(record) {
            FavoriteOutcome::Added => writeln!(out, "Added '{}' to favorites!", name)?,
            FavoriteOutcome::AlreadyExists => writeln!(out, "'{}' is already in favorites.", name)?,
        }
    }
    writeln!(out, "{}", "-".repeat(40))
}

fn show_history<G: GeocodingClient, W: Write>(service: &LocationService<G>, out: &mut W) -> io::Result<()> {
    let history = &service.store().state().history;
    if history.is_empty() {
        return writeln!(out, "No search history yet.");
    }
    writeln!(out, "\nSearch History:")?;
    for (i, item) in history.iter().take(HISTORY_SHOWN).enumerate() {
        writeln!(
            out,
            "  {}. {} - {}",
            i + 1,
            item.short_name(),
            item.saved_at.format("%Y-%m-%d %H:%M")
        )?;
    }
    Ok(())
}

fn show_favorites<G: GeocodingClient, W: Write>(service: &LocationService<G>, out: &mut W) -> io::Result<()> {
    let favorites = &service.store().state().favorites;
    if favorites.is_empty() {
        return writeln!(out, "No favorites yet.");
    }
    writeln!(out, "\nFavorite Locations:")?;
    for (i, fav) in favorites.iter().enumerate() {
        writeln!(
            out,
            "  {}. {} ({:.2}, {:.2}) - Added {}",
            i + 1,
            fav.short_name(),
            fav.location.latitude,
            fav.location.longitude,
            fav.saved_at.format("%Y-%m-%d %H:%M")
        )?;
    }
    Ok(())
}
