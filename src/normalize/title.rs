//! Title canonicalization and series extraction
//!
//! Series information is pulled out of the raw title by an ordered list of
//! rules. The first rule whose pattern matches and whose extractor accepts the
//! captures wins; later rules are not consulted.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use unicode_normalization::UnicodeNormalization;

pub const UNTITLED: &str = "Untitled";

/// Words kept lowercase inside a title unless they open or close it
const SMALL_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "by", "en", "for", "if", "in", "nor", "of", "on", "or", "per", "the",
    "to", "vs", "via",
];

const WORD_NUMBERS: &[(&str, u32)] = &[
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
];

/// Result of title standardization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleParts {
    pub title: String,
    pub series: Option<String>,
    pub series_number: Option<u32>,
}

#[derive(Debug, Default)]
struct SeriesInfo {
    series: Option<String>,
    number: Option<u32>,
}

/// A pattern with a named `title` group and the extractor reading the rest.
/// An extractor returning `None` rejects the match.
struct SeriesRule {
    pattern: Regex,
    extract: fn(&Captures<'_>) -> Option<SeriesInfo>,
}

static SERIES_RULES: Lazy<Vec<SeriesRule>> = Lazy::new(|| {
    vec![
        // "Title (Series, #2)", "Title (Series #2)", "Title (Series, #1; Other, #4)"
        SeriesRule {
            pattern: Regex::new(
                r"^(?P<title>.+?)\s*\(\s*(?P<series>[^()#]+?),?\s*#\s*(?P<number>\d+)(?:\.\d+)?(?:\s*;[^()]*)?\)\s*$",
            )
            .unwrap(),
            extract: numbered_series,
        },
        // "Title (Series)"
        SeriesRule {
            pattern: Regex::new(r"^(?P<title>.+?)\s*\((?P<series>[^()]+)\)\s*$").unwrap(),
            extract: parenthetical_series,
        },
        // "Title, Book 3", "Title: Book Three"
        SeriesRule {
            pattern: Regex::new(
                r"(?i)^(?P<title>.+?)\s*[,:]\s*book\s+(?P<number>\d+|one|two|three|four|five|six|seven|eight|nine|ten)\s*$",
            )
            .unwrap(),
            extract: book_number,
        },
    ]
});

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").unwrap());

fn numbered_series(caps: &Captures<'_>) -> Option<SeriesInfo> {
    let series = caps
        .name("series")
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())?;
    Some(SeriesInfo {
        series: Some(series),
        number: caps.name("number").and_then(|m| parse_series_number(m.as_str())),
    })
}

fn parenthetical_series(caps: &Captures<'_>) -> Option<SeriesInfo> {
    let inner = caps.name("series")?.as_str().trim();
    if YEAR.is_match(inner) || inner.chars().count() <= 3 {
        return None;
    }
    Some(SeriesInfo {
        series: Some(inner.to_string()),
        number: None,
    })
}

fn book_number(caps: &Captures<'_>) -> Option<SeriesInfo> {
    Some(SeriesInfo {
        series: None,
        number: caps.name("number").and_then(|m| parse_series_number(m.as_str())),
    })
}

/// Positive series number from digits or an English word; 0 means none.
fn parse_series_number(raw: &str) -> Option<u32> {
    let raw = raw.trim().to_lowercase();
    let number = match raw.parse::<u32>() {
        Ok(n) => n,
        Err(_) => WORD_NUMBERS.iter().find(|(word, _)| *word == raw).map(|(_, n)| *n)?,
    };
    (number > 0).then_some(number)
}

/// Split series information out of a raw title and title-case what remains.
pub fn standardize_title(raw: &str) -> TitleParts {
    let composed: String = raw.nfc().collect();
    let cleaned = composed.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return TitleParts {
            title: UNTITLED.to_string(),
            ..Default::default()
        };
    }

    let (title, info) = SERIES_RULES
        .iter()
        .find_map(|rule| {
            let caps = rule.pattern.captures(&cleaned)?;
            let info = (rule.extract)(&caps)?;
            Some((caps.name("title")?.as_str().to_string(), info))
        })
        .unwrap_or_else(|| (cleaned.clone(), SeriesInfo::default()));

    let title = title.trim().trim_end_matches([',', ':', ';']).trim();
    let title = if title.is_empty() {
        UNTITLED.to_string()
    } else {
        title_case(title)
    };

    TitleParts {
        title,
        series: info.series.map(|s| title_case(&s)),
        series_number: info.number,
    }
}

/// Title Case with small-word rules.
///
/// Acronyms (all caps, at most four letters) are kept unless the whole text is
/// a shouted phrase of several words, mixed-case words such as "iPhone" are kept, and the word after a
/// colon is capitalized.
pub fn title_case(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let shouting = words.len() > 1 && !text.chars().any(char::is_lowercase);
    let last = words.len().saturating_sub(1);

    let mut starts_clause = true;
    let mut out = Vec::with_capacity(words.len());
    for (i, word) in words.iter().enumerate() {
        out.push(case_word(word, starts_clause || i == last, shouting));
        starts_clause = word.ends_with(':');
    }
    out.join(" ")
}

fn case_word(word: &str, force_capital: bool, shouting: bool) -> String {
    let letters: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
    let lower = letters.to_lowercase();

    if !force_capital && SMALL_WORDS.contains(&lower.as_str()) {
        return word.to_lowercase();
    }

    let has_lower = word.chars().any(char::is_lowercase);
    let has_upper = word.chars().any(char::is_uppercase);
    if !shouting && has_upper && !has_lower && letters.chars().count() <= 4 {
        return word.to_string();
    }
    if has_lower && word.chars().skip(1).any(char::is_uppercase) {
        return word.to_string();
    }

    capitalize_word(word)
}

fn capitalize_word(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut capitalize_next = true;
    for c in word.chars() {
        if capitalize_next && c.is_alphabetic() {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.extend(c.to_lowercase());
        }
        if c == '-' {
            capitalize_next = true;
        }
    }
    out
}
