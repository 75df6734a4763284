//! Reading-status vocabulary mapping

use crate::models::ReadingStatus;

/// Source vocabularies, keyed by lowercase alphanumerics only so that
/// "Want to Read", "want_to_read" and "want-to-read" share one entry.
const STATUS_SYNONYMS: &[(&str, ReadingStatus)] = &[
    // want to read
    ("wanttoread", ReadingStatus::WantToRead),
    ("toread", ReadingStatus::WantToRead),
    ("toberead", ReadingStatus::WantToRead),
    ("tbr", ReadingStatus::WantToRead),
    ("wishlist", ReadingStatus::WantToRead),
    ("want", ReadingStatus::WantToRead),
    ("wanted", ReadingStatus::WantToRead),
    ("planned", ReadingStatus::WantToRead),
    ("plantoread", ReadingStatus::WantToRead),
    ("planning", ReadingStatus::WantToRead),
    ("queued", ReadingStatus::WantToRead),
    ("queue", ReadingStatus::WantToRead),
    ("backlog", ReadingStatus::WantToRead),
    ("unread", ReadingStatus::WantToRead),
    ("notstarted", ReadingStatus::WantToRead),
    ("upnext", ReadingStatus::WantToRead),
    // currently reading
    ("currentlyreading", ReadingStatus::CurrentlyReading),
    ("reading", ReadingStatus::CurrentlyReading),
    ("nowreading", ReadingStatus::CurrentlyReading),
    ("readingnow", ReadingStatus::CurrentlyReading),
    ("inprogress", ReadingStatus::CurrentlyReading),
    ("current", ReadingStatus::CurrentlyReading),
    ("started", ReadingStatus::CurrentlyReading),
    ("ongoing", ReadingStatus::CurrentlyReading),
    ("active", ReadingStatus::CurrentlyReading),
    // finished
    ("finished", ReadingStatus::Finished),
    ("read", ReadingStatus::Finished),
    ("completed", ReadingStatus::Finished),
    ("complete", ReadingStatus::Finished),
    ("done", ReadingStatus::Finished),
    ("alreadyread", ReadingStatus::Finished),
    ("haveread", ReadingStatus::Finished),
    ("finishedreading", ReadingStatus::Finished),
    ("readit", ReadingStatus::Finished),
];

fn status_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Look up a status without falling back; `None` for unknown vocabulary.
pub fn lookup_reading_status(raw: &str) -> Option<ReadingStatus> {
    let key = status_key(raw);
    STATUS_SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == key)
        .map(|(_, status)| *status)
}

/// Map a source status to the canonical vocabulary.
///
/// Unknown or empty values become [`ReadingStatus::WantToRead`] and are logged
/// so guessed statuses can be audited.
pub fn standardize_reading_status(raw: &str) -> ReadingStatus {
    match lookup_reading_status(raw) {
        Some(status) => status,
        None => {
            tracing::warn!(raw_status = %raw, "Unrecognized reading status, defaulting to want-to-read");
            ReadingStatus::WantToRead
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synonyms() {
        assert_eq!(standardize_reading_status("to-read"), ReadingStatus::WantToRead);
        assert_eq!(standardize_reading_status("TBR"), ReadingStatus::WantToRead);
        assert_eq!(standardize_reading_status("Want to Read"), ReadingStatus::WantToRead);
        assert_eq!(standardize_reading_status("currently-reading"), ReadingStatus::CurrentlyReading);
        assert_eq!(standardize_reading_status("In Progress"), ReadingStatus::CurrentlyReading);
        assert_eq!(standardize_reading_status("read"), ReadingStatus::Finished);
        assert_eq!(standardize_reading_status("Completed"), ReadingStatus::Finished);
        assert_eq!(standardize_reading_status("done"), ReadingStatus::Finished);
    }

    #[test]
    fn test_unknown_defaults_to_want_to_read() {
        assert_eq!(standardize_reading_status(""), ReadingStatus::WantToRead);
        assert_eq!(standardize_reading_status("abandoned-maybe"), ReadingStatus::WantToRead);
        assert_eq!(lookup_reading_status("abandoned-maybe"), None);
    }

    #[test]
    fn test_standardization_is_idempotent() {
        for raw in ["to-read", "reading", "read", "", "???", "Currently Reading", "want_to_read"] {
            let once = standardize_reading_status(raw);
            assert_eq!(standardize_reading_status(once.as_str()), once);
        }
    }
}
