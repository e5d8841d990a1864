use crate::rules::types::GeographicScope;

/// Full state names paired with postal abbreviations
const STATES: &[(&str, &str)] = &[
    ("alabama", "AL"),
    ("alaska", "AK"),
    ("arizona", "AZ"),
    ("arkansas", "AR"),
    ("california", "CA"),
    ("colorado", "CO"),
    ("connecticut", "CT"),
    ("delaware", "DE"),
    ("florida", "FL"),
    ("georgia", "GA"),
    ("hawaii", "HI"),
    ("idaho", "ID"),
    ("illinois", "IL"),
    ("indiana", "IN"),
    ("iowa", "IA"),
    ("kansas", "KS"),
    ("kentucky", "KY"),
    ("louisiana", "LA"),
    ("maine", "ME"),
    ("maryland", "MD"),
    ("massachusetts", "MA"),
    ("michigan", "MI"),
    ("minnesota", "MN"),
    ("mississippi", "MS"),
    ("missouri", "MO"),
    ("montana", "MT"),
    ("nebraska", "NE"),
    ("nevada", "NV"),
    ("new hampshire", "NH"),
    ("new jersey", "NJ"),
    ("new mexico", "NM"),
    ("new york", "NY"),
    ("north carolina", "NC"),
    ("north dakota", "ND"),
    ("ohio", "OH"),
    ("oklahoma", "OK"),
    ("oregon", "OR"),
    ("pennsylvania", "PA"),
    ("rhode island", "RI"),
    ("south carolina", "SC"),
    ("south dakota", "SD"),
    ("tennessee", "TN"),
    ("texas", "TX"),
    ("utah", "UT"),
    ("vermont", "VT"),
    ("virginia", "VA"),
    ("washington", "WA"),
    ("west virginia", "WV"),
    ("wisconsin", "WI"),
    ("wyoming", "WY"),
];

/// Postal abbreviations that double as English words or pronouns when
/// lowercased ("in", "or", "me"...). These only count as state mentions
/// with a comma lead-in ("Portland, OR") or an explicit "state of".
const AMBIGUOUS_ABBREVS: &[&str] = &["AL", "CO", "DE", "HI", "ID", "IN", "LA", "MA", "ME", "OH", "OK", "OR", "PA", "WA"];

/// Phrases that mark a rule as applying everywhere
const NATIONAL_PHRASES: &[&str] = &[
    "all states",
    "nationwide",
    "nationally",
    "national",
    "all markets",
    "commercial plans",
    "all commercial",
    "all lines of business",
];

/// Phrases that mark a named sub-national region
const REGIONAL_MARKERS: &[&str] = &["region", "zone", "service area", "counties"];

/// Infers a rule span's geographic scope from its text
///
/// Precedence: national phrases beat state mentions, a single state beats a
/// regional marker, and multiple states collapse into a regional group. No
/// signal at all is `Unspecified`.
pub fn detect_scope(text: &str) -> GeographicScope {
    let lower = text.to_lowercase();

    for phrase in NATIONAL_PHRASES {
        if lower.contains(phrase) {
            return GeographicScope::National;
        }
    }

    let mut states = state_mentions(text, &lower);
    match states.len() {
        0 => {}
        1 => return GeographicScope::State(states.remove(0)),
        _ => return GeographicScope::Regional(states.join(", ")),
    }

    for marker in REGIONAL_MARKERS {
        if let Some(label) = regional_label(&lower, marker) {
            return GeographicScope::Regional(label);
        }
    }

    GeographicScope::Unspecified
}

/// Collects distinct state mentions, full names first, then abbreviations
fn state_mentions(original: &str, lower: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();

    for (name, _) in STATES {
        if contains_word(lower, name) && !found.iter().any(|f| f == name) {
            found.push(name.to_string());
        }
    }

    // abbreviations are matched case-sensitively against the original text;
    // "or" in running prose must never read as Oregon
    for (name, abbrev) in STATES {
        if found.iter().any(|f| f == name) {
            continue;
        }
        if abbrev_mentioned(original, abbrev) {
            found.push(name.to_string());
        }
    }

    found
}

fn abbrev_mentioned(text: &str, abbrev: &str) -> bool {
    let bytes = text.as_bytes();
    let mut start = 0;
    while let Some(pos) = text[start..].find(abbrev) {
        let i = start + pos;
        let j = i + abbrev.len();
        let word_start = i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
        let word_end = j == bytes.len() || !bytes[j].is_ascii_alphanumeric();

        if word_start && word_end {
            if !AMBIGUOUS_ABBREVS.contains(&abbrev) {
                return true;
            }
            // ambiguous two-letter codes need a comma lead-in or "state of"
            let before = &text[..i];
            if before.trim_end().ends_with(',')
                || before.to_lowercase().trim_end().ends_with("state of")
            {
                return true;
            }
        }
        start = j;
    }
    false
}

fn contains_word(haystack: &str, needle: &str) -> bool {
    let bytes = haystack.as_bytes();
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(needle) {
        let i = start + pos;
        let j = i + needle.len();
        let word_start = i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
        let word_end = j == bytes.len() || !bytes[j].is_ascii_alphanumeric();
        if word_start && word_end {
            return true;
        }
        start = j;
    }
    false
}

/// Extracts "region 4", "zone b", "service area" style labels
fn regional_label(lower: &str, marker: &str) -> Option<String> {
    let pos = find_word(lower, marker)?;
    let after = &lower[pos + marker.len()..];
    let qualifier: String = after
        .trim_start()
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_matches(|c: char| !c.is_ascii_alphanumeric())
        .to_string();

    if marker == "service area" || marker == "counties" {
        return Some(marker.to_string());
    }

    // "region" alone, without a qualifier, is too weak a signal
    if qualifier.is_empty() || qualifier.len() > 4 {
        return None;
    }
    Some(format!("{} {}", marker, qualifier))
}

fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(needle) {
        let i = start + pos;
        let j = i + needle.len();
        let word_start = i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
        let word_end = j == bytes.len() || !bytes[j].is_ascii_alphanumeric();
        if word_start && word_end {
            return Some(i);
        }
        start = j;
    }
    None
}
