//! Author name canonicalization
//!
//! Produces "First Last[, First Last...]" from the many ways trackers write
//! author credits: "Last, First", abbreviated given names, loose initials,
//! parenthetical role annotations and lists joined with "and" / "&".

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Abbreviated given names found in older catalog records
const FIRST_NAME_ABBREVIATIONS: &[(&str, &str)] = &[
    ("thos", "Thomas"),
    ("wm", "William"),
    ("chas", "Charles"),
    ("jas", "James"),
    ("jno", "John"),
    ("geo", "George"),
    ("robt", "Robert"),
    ("richd", "Richard"),
    ("saml", "Samuel"),
    ("edw", "Edward"),
    ("benj", "Benjamin"),
    ("jos", "Joseph"),
    ("danl", "Daniel"),
    ("alexr", "Alexander"),
    ("fredk", "Frederick"),
    ("hy", "Henry"),
    ("chris", "Christopher"),
    ("eliz", "Elizabeth"),
    ("margt", "Margaret"),
];

const NAME_SUFFIXES: &[&str] = &["jr", "sr"];
const ROMAN_SUFFIXES: &[&str] = &["ii", "iii", "iv"];

static PARENTHETICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[\(\[][^\)\]]*[\)\]]").unwrap());
static LIST_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s*;\s*|\s+&\s+|\s+and\s+").unwrap());
static INITIALS_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:[[:alpha:]]\.)+[[:alpha:]]?$").unwrap());

/// Canonicalize an author credit. Empty input yields [`UNKNOWN_AUTHOR`].
pub fn standardize_author(raw: &str) -> String {
    let composed: String = raw.nfc().collect();
    let stripped = PARENTHETICAL.replace_all(&composed, "");
    let stripped = stripped.trim().trim_matches(|c: char| c == ',' || c == ';').trim();
    if stripped.is_empty() {
        return UNKNOWN_AUTHOR.to_string();
    }

    let names: Vec<String> = LIST_SEPARATOR
        .split(stripped)
        .flat_map(|part| {
            let part = part.trim();
            if is_inverted_name(part) {
                let (last, first) = part.split_once(',').unwrap_or((part, ""));
                vec![format!("{} {}", first.trim(), last.trim())]
            } else {
                part.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(String::from)
                    .collect()
            }
        })
        .collect();

    let normalized: Vec<String> = names
        .iter()
        .map(|name| normalize_single_name(name))
        .filter(|name| !name.is_empty())
        .collect();

    if normalized.is_empty() {
        UNKNOWN_AUTHOR.to_string()
    } else {
        normalized.join(", ")
    }
}

/// "Last, First" has exactly one comma and no "and"/"&" (those were split off
/// already). "Stephen King, Peter Straub" also has
/// one comma, so the swap only applies when the surname side is a single word,
/// or at most two words followed by given names that contain an initial.
fn is_inverted_name(name: &str) -> bool {
    let Some((last, first)) = name.split_once(',') else {
        return false;
    };
    if first.contains(',') || first.trim().is_empty() || last.trim().is_empty() {
        return false;
    }
    let last_words = last.split_whitespace().count();
    let first_tokens: Vec<&str> = first.split_whitespace().collect();
    if last_words == 1 {
        return true;
    }
    last_words == 2
        && (first_tokens.len() == 1 || first_tokens.iter().any(|t| is_initial_token(t)))
}

fn is_initial_token(token: &str) -> bool {
    let letters: Vec<char> = token.chars().filter(|c| *c != '.').collect();
    (letters.len() == 1 && letters[0].is_alphabetic()) || INITIALS_RUN.is_match(token)
}

/// Normalize one person's name: abbreviations, initials, casing.
fn normalize_single_name(name: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut initials = String::new();

    for token in name.split_whitespace() {
        if is_initial_token(token) {
            for c in token.chars().filter(|c| c.is_alphabetic()) {
                initials.extend(c.to_uppercase());
                initials.push('.');
            }
            continue;
        }
        if !initials.is_empty() {
            out.push(std::mem::take(&mut initials));
        }
        out.push(normalize_name_token(token));
    }
    if !initials.is_empty() {
        out.push(initials);
    }

    out.join(" ")
}

fn normalize_name_token(token: &str) -> String {
    let bare = token.trim_end_matches('.').to_lowercase();

    if let Some((_, full)) = FIRST_NAME_ABBREVIATIONS.iter().find(|(abbr, _)| *abbr == bare) {
        return full.to_string();
    }
    if NAME_SUFFIXES.contains(&bare.as_str()) {
        return format!("{}.", capitalize(&bare));
    }
    if ROMAN_SUFFIXES.contains(&bare.as_str()) {
        return bare.to_uppercase();
    }

    // Mixed case such as "McCarthy" or "DeLillo" is kept as written
    let has_lower = token.chars().any(char::is_lowercase);
    let has_upper = token.chars().skip(1).any(char::is_uppercase);
    if has_lower && has_upper {
        return token.to_string();
    }

    capitalize_compound(token)
}

/// Capitalize each part of a hyphenated or apostrophed word ("o'brien-smith").
fn capitalize_compound(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut start_of_part = true;
    for c in token.chars() {
        if start_of_part && c.is_alphabetic() {
            out.extend(c.to_uppercase());
            start_of_part = false;
        } else {
            out.extend(c.to_lowercase());
        }
        if c == '-' || c == '\'' || c == '\u{2019}' {
            start_of_part = true;
        }
    }
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
