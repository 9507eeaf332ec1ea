//! Bookmaker extraction.
//!
//! Locates one bookmaker's listing inside an odds payload. API-Football
//! usually sends bookmaker ids as integers but occasionally as numeric
//! strings, so matching runs in two passes: normalized integer equality
//! first, then plain string equality.

use tracing::debug;

use crate::types::{id_text, normalize_id, BookmakerEntry, Identifier, OddsPayload};

/// Find the bookmaker with `bookmaker_id` in the payload's first fixture.
///
/// Returns `None` when the payload has no fixture records or no entry
/// matches under either pass.
pub fn extract_bookmaker(payload: &OddsPayload, bookmaker_id: i64) -> Option<&BookmakerEntry> {
    let fixture = match payload.first_fixture() {
        Some(f) => f,
        None => {
            debug!(bookmaker_id, "No response entries in odds payload");
            return None;
        }
    };
    let bookmakers = &fixture.bookmakers;

    debug!(
        bookmaker_id,
        available = bookmakers.len(),
        ids = ?bookmakers.iter().map(|b| id_text(&b.id)).collect::<Vec<_>>(),
        "Looking up bookmaker"
    );

    let wanted = Identifier::Numeric(bookmaker_id);
    if let Some(entry) = bookmakers.iter().find(|b| normalize_id(&b.id) == wanted) {
        debug!(bookmaker_id, name = ?entry.name, "Found bookmaker");
        return Some(entry);
    }

    let wanted = bookmaker_id.to_string();
    if let Some(entry) = bookmakers.iter().find(|b| id_text(&b.id) == wanted) {
        debug!(bookmaker_id, name = ?entry.name, "Found bookmaker by string id");
        return Some(entry);
    }

    debug!(bookmaker_id, "Bookmaker not found");
    None
}
