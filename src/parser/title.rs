use crate::models::season::SeasonDescriptor;
use regex::{Captures, Regex};
use std::sync::OnceLock;

const STOPWORDS: &[&str] = &["the", "a", "an"];

/// Highest number accepted from a bare trailing numeral ("Title 2").
/// Anything larger is far more likely part of the name ("Mob Psycho 100").
const MAX_TRAILING_SEASON: i32 = 30;

/// Parses a catalog title into a [`SeasonDescriptor`].
///
/// Markers are tried in priority order: explicit season/part markers, then a bare
/// trailing numeral (only when the title has no subtitle), then nothing at all, in
/// which case the whole cleaned title is the series name. When the primary title
/// carries no season information the English title is consulted for it.
#[must_use]
pub fn parse(title: &str, title_english: Option<&str>) -> SeasonDescriptor {
    let english = title_english.filter(|t| !t.trim().is_empty());

    if title.trim().is_empty() {
        return english.map_or_else(
            || SeasonDescriptor {
                series_name: "Unknown".to_string(),
                season_number: None,
                season_name: None,
            },
            parse_single,
        );
    }

    let mut descriptor = parse_single(title);

    if descriptor.season_number.is_none()
        && let Some(english) = english
    {
        let alternate = parse_single(english);
        if alternate.season_number.is_some() {
            descriptor.season_number = alternate.season_number;
            descriptor.season_name = descriptor.season_name.or(alternate.season_name);
        }
    }

    descriptor
}

fn parse_single(title: &str) -> SeasonDescriptor {
    let cleaned = clean_title(title);

    if let Some(marker) = find_explicit_marker(&cleaned) {
        return descriptor_around_marker(&cleaned, &marker);
    }

    if let Some(descriptor) = parse_trailing_numeral(&cleaned) {
        return descriptor;
    }

    SeasonDescriptor {
        series_name: cleaned,
        season_number: None,
        season_name: None,
    }
}

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}

#[derive(Debug, Clone, Copy)]
struct Marker {
    start: usize,
    end: usize,
    number: i32,
    /// Season markers outrank part/cour markers: in "Season 3 Part 2" the part is
    /// a subdivision of the season, not the season itself.
    rank: u8,
}

fn find_explicit_marker(title: &str) -> Option<Marker> {
    static PATTERNS: OnceLock<Vec<(Regex, u8)>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        vec![
            (
                Regex::new(r"(?i)\bSeason\s+(?P<n>[0-9]{1,2}|[IVX]{1,4})\b")
                    .expect("Invalid Regex"),
                1,
            ),
            (
                Regex::new(r"(?i)\b(?P<n>[0-9]{1,2})(?:st|nd|rd|th)\s+Season\b")
                    .expect("Invalid Regex"),
                1,
            ),
            (
                Regex::new(
                    r"(?i)\b(?P<n>first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth)\s+Season\b",
                )
                .expect("Invalid Regex"),
                1,
            ),
            (
                Regex::new(r"(?i)\bS(?P<n>[0-9]{1,2})\b").expect("Invalid Regex"),
                1,
            ),
            (
                Regex::new(r"(?i)\bPart\s+(?P<n>[0-9]{1,2}|[IVX]{1,4})\b")
                    .expect("Invalid Regex"),
                0,
            ),
            (
                Regex::new(r"(?i)\bCour\s+(?P<n>[0-9]{1,2})\b").expect("Invalid Regex"),
                0,
            ),
        ]
    });

    patterns
        .iter()
        .flat_map(|(re, rank)| {
            re.captures_iter(title)
                .filter_map(move |caps| marker_from_captures(&caps, *rank))
        })
        .max_by_key(|m| (m.rank, m.start, m.end))
}

fn marker_from_captures(caps: &Captures, rank: u8) -> Option<Marker> {
    let whole = caps.get(0)?;
    let number = parse_season_number(caps.name("n")?.as_str())?;
    Some(Marker {
        start: whole.start(),
        end: whole.end(),
        number,
        rank,
    })
}

fn descriptor_around_marker(cleaned: &str, marker: &Marker) -> SeasonDescriptor {
    let prefix = trim_separators(&cleaned[..marker.start]);
    let suffix = trim_separators(&cleaned[marker.end..]);

    let (series, prefix_subtitle) = split_subtitle(prefix);

    let season_name = non_empty(suffix).or_else(|| prefix_subtitle.and_then(non_empty));

    let series_name = if series.is_empty() {
        cleaned.to_string()
    } else {
        series.to_string()
    };

    SeasonDescriptor {
        series_name,
        season_number: Some(marker.number),
        season_name,
    }
}

fn parse_trailing_numeral(cleaned: &str) -> Option<SeasonDescriptor> {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    static ROMAN: OnceLock<Regex> = OnceLock::new();

    // A numeral after a subtitle separator belongs to the subtitle ("Movie: Story 2").
    if split_subtitle(cleaned).1.is_some() {
        return None;
    }

    let digits = get_regex(&DIGITS, r"^(?P<name>.*[^\s0-9])\s+(?P<n>[0-9]{1,2})$");
    let roman = get_regex(
        &ROMAN,
        r"^(?P<name>.+?)\s+(?P<n>II|III|IV|VI|VII|VIII|IX)$",
    );

    let caps = digits.captures(cleaned).or_else(|| roman.captures(cleaned))?;
    let name = caps.name("name")?.as_str().trim();
    let number = parse_season_number(caps.name("n")?.as_str())?;

    if number > MAX_TRAILING_SEASON || !name.chars().any(char::is_alphabetic) {
        return None;
    }

    let last_word = name
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or_default()
        .to_lowercase();
    if matches!(
        last_word.as_str(),
        "no" | "no." | "#" | "vol" | "vol." | "episode" | "ep" | "ep."
    ) {
        return None;
    }

    Some(SeasonDescriptor {
        series_name: name.to_string(),
        season_number: Some(number),
        season_name: None,
    })
}

/// Splits `"Series: Subtitle"` / `"Series — Subtitle"` at the first separator.
///
/// A colon only counts when followed by whitespace, so names like "Re:Zero" stay whole.
fn split_subtitle(title: &str) -> (&str, Option<&str>) {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"\s*[:：]\s+|\s+-\s+|\s*[–—]\s*");

    match re.find(title) {
        Some(m) if m.start() > 0 => {
            let head = title[..m.start()].trim();
            let tail = title[m.end()..].trim();
            (head, if tail.is_empty() { None } else { Some(tail) })
        }
        _ => (title.trim(), None),
    }
}

fn trim_separators(s: &str) -> &str {
    s.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, ':' | '：' | '-' | '–' | '—' | ',')
    })
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn parse_season_number(raw: &str) -> Option<i32> {
    let number = raw
        .parse::<i32>()
        .ok()
        .or_else(|| ordinal_word_to_int(raw))
        .or_else(|| roman_to_int(raw))?;

    (number > 0).then_some(number)
}

fn ordinal_word_to_int(s: &str) -> Option<i32> {
    match s.to_lowercase().as_str() {
        "first" => Some(1),
        "second" => Some(2),
        "third" => Some(3),
        "fourth" => Some(4),
        "fifth" => Some(5),
        "sixth" => Some(6),
        "seventh" => Some(7),
        "eighth" => Some(8),
        "ninth" => Some(9),
        "tenth" => Some(10),
        _ => None,
    }
}

fn roman_to_int(s: &str) -> Option<i32> {
    match s.to_uppercase().as_str() {
        "I" => Some(1),
        "II" => Some(2),
        "III" => Some(3),
        "IV" => Some(4),
        "V" => Some(5),
        "VI" => Some(6),
        "VII" => Some(7),
        "VIII" => Some(8),
        "IX" => Some(9),
        "X" => Some(10),
        _ => None,
    }
}

/// Collapses whitespace/underscores and drops a trailing release year, keeping case.
#[must_use]
pub fn clean_title(title: &str) -> String {
    let mut title = title.trim().trim_end_matches(['-', '_']).trim();

    if let Some(idx) = title.rfind('(')
        && let Some(end) = title.rfind(')')
        && end > idx
    {
        let inside = &title[idx + 1..end];
        if inside.len() == 4 && inside.chars().all(|c| c.is_ascii_digit()) {
            title = title[..idx].trim();
        }
    }

    let mut result = String::with_capacity(title.len());
    let mut last_was_space = true;
    for c in title.chars() {
        if c.is_whitespace() || c == '_' {
            if !last_was_space {
                result.push(' ');
                last_was_space = true;
            }
        } else {
            result.push(c);
            last_was_space = false;
        }
    }

    if result.ends_with(' ') {
        result.pop();
    }

    result
}

/// Comparison key for a series name: case-folded, punctuation and stopwords removed.
#[must_use]
pub fn normalize_for_matching(name: &str) -> String {
    let folded: String = clean_title(name)
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    let words: Vec<&str> = folded.split_whitespace().collect();
    let kept: Vec<&str> = words
        .iter()
        .copied()
        .filter(|w| !STOPWORDS.contains(w))
        .collect();

    if kept.is_empty() {
        words.join(" ")
    } else {
        kept.join(" ")
    }
}

/// The part of a series name worth handing to a substring search: leading
/// articles dropped so "The Series" still finds "Series 2".
#[must_use]
pub fn search_term(series_name: &str) -> String {
    let cleaned = clean_title(series_name);
    let mut rest = cleaned.as_str();
    for stopword in STOPWORDS {
        let prefix_len = stopword.len() + 1;
        if rest.len() > prefix_len
            && rest.is_char_boundary(prefix_len)
            && rest[..prefix_len].eq_ignore_ascii_case(&format!("{stopword} "))
        {
            rest = &rest[prefix_len..];
            break;
        }
    }
    rest.trim().to_string()
}
