use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

const MONTH_NAMES: [(u32, &[&str]); 12] = [
    (1, &["styczeń", "styczen", "stycznia", "january", "jan", "i"]),
    (2, &["luty", "lutego", "february", "feb", "ii"]),
    (3, &["marzec", "marca", "march", "mar", "iii"]),
    (4, &["kwiecień", "kwiecien", "kwietnia", "april", "apr", "iv"]),
    (5, &["maj", "maja", "may", "v"]),
    (6, &["czerwiec", "czerwca", "june", "jun", "vi"]),
    (7, &["lipiec", "lipca", "july", "jul", "vii"]),
    (8, &["sierpień", "sierpien", "sierpnia", "august", "aug", "viii"]),
    (9, &["wrzesień", "wrzesien", "września", "wrzesnia", "september", "sep", "ix"]),
    (10, &["październik", "pazdziernik", "października", "pazdziernika", "october", "oct", "x"]),
    (11, &["listopad", "listopada", "november", "nov", "xi"]),
    (12, &["grudzień", "grudzien", "grudnia", "december", "dec", "xii"]),
];

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{1,2})\.?\s+([\p{L}.]+)\s+(\d{4})\s*$")
        .expect("hardcoded date regex is valid")
});

#[must_use]
pub fn month_number(label: &str) -> Option<u32> {
    let normalized = label.trim().trim_end_matches('.').to_lowercase();
    if let Ok(month) = normalized.parse::<u32>() {
        return (1..=12).contains(&month).then_some(month);
    }

    MONTH_NAMES
        .iter()
        .find(|(_, names)| names.contains(&normalized.as_str()))
        .map(|(month, _)| *month)
}

#[must_use]
pub fn compose_date(day: u32, month_label: &str, year: i32) -> String {
    format!("{day} {} {year}", month_label.trim())
}

#[must_use]
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let captures = DATE_RE.captures(text)?;
    let day = captures.get(1)?.as_str().parse::<u32>().ok()?;
    let month = month_number(captures.get(2)?.as_str())?;
    let year = captures.get(3)?.as_str().parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
