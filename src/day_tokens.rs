use tracing::debug;

use crate::model::DayToken;

pub const DATE_CHANGE_NOTE: &str = "* possible date change";

const MIN_DAY_GAP: u32 = 7;

const MAX_DIGIT_RUN: usize = 16;

const SEPARATOR_TOKENS: [&str; 3] = ["j", "|", "+"];

#[must_use]
pub fn normalize_false_connector(cell: &str, connector: &str) -> String {
    let pieces = cell.split(' ').collect::<Vec<_>>();
    let last = pieces.len().saturating_sub(1);
    pieces
        .iter()
        .enumerate()
        .map(|(index, piece)| {
            if *piece == "1" && index > 0 && index < last {
                connector
            } else {
                *piece
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[must_use]
pub fn split_cell(cell: &str, connector: &str) -> Vec<String> {
    normalize_false_connector(cell, connector)
        .split(|ch: char| ch == ',' || ch.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_separator(token: &str, connector: &str) -> bool {
    token.eq_ignore_ascii_case(connector) || SEPARATOR_TOKENS.contains(&token)
}

fn extract_digits(token: &str) -> String {
    token.chars().filter(char::is_ascii_digit).collect()
}

fn parse_day(digits: &str) -> Option<u32> {
    let significant = digits.trim_start_matches('0');
    if significant.is_empty() || significant.len() > 2 {
        return None;
    }
    significant
        .parse::<u32>()
        .ok()
        .filter(|day| (1..=31).contains(day))
}

fn fragment_day(digits: &str) -> Option<u32> {
    if digits.starts_with('0') {
        return None;
    }
    parse_day(digits)
}

fn is_plausible_sequence(days: &[u32]) -> bool {
    days.len() >= 2
        && days
            .windows(2)
            .all(|pair| pair[0] < pair[1] && pair[1] - pair[0] > MIN_DAY_GAP)
}

fn with_tail(first: u32, tail: &str) -> Option<Vec<u32>> {
    if tail.is_empty() {
        return None;
    }

    let mut days = vec![first];
    match fragment_day(tail) {
        Some(day) => days.push(day),
        None => days.extend(split_digit_run(tail)?),
    }

    is_plausible_sequence(&days).then_some(days)
}

fn split_digit_run(digits: &str) -> Option<Vec<u32>> {
    let mut best = None;

    for position in 1..digits.len() {
        let Some(first) = fragment_day(&digits[..position]) else {
            continue;
        };

        if let Some(candidate) = with_tail(first, &digits[position..]) {
            best = Some(candidate);
        }

        if digits.as_bytes()[position] == b'1' {
            if let Some(candidate) = with_tail(first, &digits[position + 1..]) {
                best = Some(candidate);
            }
        }
    }

    best
}

#[must_use]
pub fn decompose_digits(digits: &str) -> Vec<u32> {
    if digits.is_empty()
        || digits.len() > MAX_DIGIT_RUN
        || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return Vec::new();
    }

    if let Some(day) = parse_day(digits) {
        return vec![day];
    }

    let days = split_digit_run(digits).unwrap_or_default();
    debug!("digit run {digits:?} -> {days:?}");
    days
}

#[must_use]
pub fn parse_cell(cell: &str, connector: &str) -> (DayToken, Vec<String>) {
    let mut token = DayToken::default();
    let mut rejected = Vec::new();

    for raw in split_cell(cell, connector) {
        if is_separator(&raw, connector) {
            debug!("({raw}) -> separator");
            continue;
        }

        if !raw.chars().any(|ch| ch.is_ascii_digit()) {
            debug!("({raw}) -> annotation");
            token.annotations.push(raw);
            continue;
        }

        let digits = extract_digits(&raw);
        let days = decompose_digits(&digits);
        debug!("({raw}) -> days {days:?}");
        if days.is_empty() {
            rejected.push(raw.clone());
        }
        token.days.extend(days);

        if raw.contains('*') {
            token.annotations.push(raw);
        }
    }

    (token, rejected)
}

#[must_use]
pub fn annotation_for_day(day: u32, annotations: &[String]) -> Option<String> {
    let parts = annotations
        .iter()
        .filter_map(|entry| {
            if entry.contains('*') {
                (parse_day(&extract_digits(entry)) == Some(day))
                    .then(|| DATE_CHANGE_NOTE.to_string())
            } else {
                Some(entry.clone())
            }
        })
        .collect::<Vec<_>>();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{
        DATE_CHANGE_NOTE, annotation_for_day, decompose_digits, normalize_false_connector,
        parse_cell, split_cell,
    };

    #[test]
    fn in_range_values_are_returned_unchanged() {
        for day in 1..=31_u32 {
            assert_eq!(decompose_digits(&day.to_string()), vec![day], "day {day}");
        }
    }

    #[test]
    fn ambiguous_141_yields_no_days() {
        assert_eq!(decompose_digits("141"), Vec::<u32>::new());
    }

    #[test]
    fn swallowed_connector_is_recovered() {
        assert_eq!(decompose_digits("9123"), vec![9, 23]);
        assert_eq!(decompose_digits("5119"), vec![5, 19]);
    }

    #[test]
    fn missing_separator_is_split_when_days_are_far_apart() {
        assert_eq!(decompose_digits("422"), vec![4, 22]);
    }

    #[test]
    fn weekly_neighbours_are_not_split() {
        assert_eq!(decompose_digits("1522"), Vec::<u32>::new());
    }

    #[test]
    fn zero_and_leading_zero_fragments_are_rejected() {
        assert!(decompose_digits("0").is_empty());
        assert!(decompose_digits("405").is_empty());
        assert_eq!(decompose_digits("07"), vec![7]);
    }

    #[test]
    fn stray_one_between_spaces_becomes_connector() {
        assert_eq!(normalize_false_connector("9 1 1 23", "i"), "9 i i 23");
        assert_eq!(split_cell("9 1 23", "i"), vec!["9", "i", "23"]);
    }

    #[test]
    fn numeric_connector_is_replaced_once() {
        assert_eq!(normalize_false_connector("9 1 23", "1"), "9 1 23");
        let (token, rejected) = parse_cell("9 1 23", "1");
        assert_eq!(token.days, vec![9, 23]);
        assert!(rejected.is_empty());
    }

    #[test]
    fn stray_one_is_dropped_as_separator() {
        let (token, rejected) = parse_cell("9 1 23", "i");
        assert_eq!(token.days, vec![9, 23]);
        assert!(token.annotations.is_empty());
        assert!(rejected.is_empty());
    }

    #[test]
    fn asterisk_footnote_flags_only_its_day() {
        let (token, _) = parse_cell("3, 17 i 31*", "i");
        assert_eq!(token.days, vec![3, 17, 31]);
        assert_eq!(annotation_for_day(3, &token.annotations), None);
        assert_eq!(annotation_for_day(17, &token.annotations), None);
        let note = annotation_for_day(31, &token.annotations).expect("day 31 has a note");
        assert!(note.contains(DATE_CHANGE_NOTE), "note: {note}");
    }

    #[test]
    fn zero_padded_footnote_flags_its_day() {
        let (token, _) = parse_cell("07* i 21", "i");
        assert_eq!(token.days, vec![7, 21]);
        assert_eq!(annotation_for_day(7, &token.annotations).as_deref(), Some(DATE_CHANGE_NOTE));
        assert_eq!(annotation_for_day(21, &token.annotations), None);
    }

    #[test]
    fn free_text_applies_to_every_day() {
        let (token, _) = parse_cell("5, 19 wtorek", "i");
        assert_eq!(token.days, vec![5, 19]);
        assert_eq!(annotation_for_day(5, &token.annotations).as_deref(), Some("wtorek"));
        assert_eq!(annotation_for_day(19, &token.annotations).as_deref(), Some("wtorek"));
    }

    #[test]
    fn empty_cell_sentinel_yields_nothing() {
        let (token, rejected) = parse_cell("+", "i");
        assert!(token.days.is_empty());
        assert!(token.annotations.is_empty());
        assert!(rejected.is_empty());
    }

    #[test]
    fn letters_glued_to_digits_are_stripped() {
        let (token, _) = parse_cell("7r, 2l", "i");
        assert_eq!(token.days, vec![7, 2]);
        assert!(token.annotations.is_empty());
    }

    #[test]
    fn undecomposable_run_is_reported() {
        let (token, rejected) = parse_cell("141, 28", "i");
        assert_eq!(token.days, vec![28]);
        assert_eq!(rejected, vec!["141"]);
    }

    #[test]
    fn pipes_and_repeated_separators_are_ignored() {
        let (token, _) = parse_cell("2 | 16,, i 30", "i");
        assert_eq!(token.days, vec![2, 16, 30]);
    }
}
