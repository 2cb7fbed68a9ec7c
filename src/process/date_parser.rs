use chrono::NaiveDate;

/// Full-date layouts seen in biography tables, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%B %d, %Y", // January 1, 1950
    "%b %d, %Y", // Jan 1, 1950
    "%b. %d, %Y",
    "%d %B %Y", // 1 January 1950
    "%d %b %Y",
    "%Y-%m-%d",
    "%m/%d/%Y",
];

/// Parse a free-text birth date into a calendar date.
///
/// Beyond full dates, a month-and-year (`March 1950`) resolves to the first of
/// that month and a bare four-digit year resolves to January 1st. Anything
/// else (`c. 1950`, `unknown`) is `None`.
pub fn parse_birth_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    // "March 1950" / "Mar 1950"
    let with_day = format!("1 {}", s);
    for fmt in ["%d %B %Y", "%d %b %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(&with_day, fmt) {
            return Some(d);
        }
    }

    if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year: i32 = s.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1);
    }

    None
}
