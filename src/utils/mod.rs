/// Round to one decimal place the way `Number.prototype.toFixed(1)` does.
///
/// The decision is made on the exact decimal expansion of the double, so a
/// true tie (`0.25`) rounds away from zero while a value whose binary form sits
/// just below the tie (`0.15`) rounds down.
pub fn round1(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }

    let magnitude = value.abs();
    // 25 digits is far below the gap between any double under 2^53 and a two-digit tie.
    let expansion = format!("{:.25}", magnitude);
    let (whole, fraction) = expansion.split_once('.').unwrap_or((&expansion, "0"));
    let mut digits = fraction.bytes();
    let tenths = digits.next().map_or(0, |d| u64::from(d - b'0'));
    let round_up = digits.next().is_some_and(|d| d >= b'5');

    let whole: u64 = whole.parse().unwrap_or(0);
    let scaled = whole * 10 + tenths + u64::from(round_up);
    let rounded = scaled as f64 / 10.0;

    if value.is_sign_negative() && rounded != 0.0 {
        -rounded
    } else {
        rounded
    }
}

/// `count / total * 100` rounded to one decimal, `0.0` for an empty total.
pub fn percentage(count: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1((count as f64 / total as f64) * 100.0)
}

/// `sum / total` rounded to one decimal, `0.0` for an empty total.
pub fn average(sum: u64, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(sum as f64 / total as f64)
}

pub fn total_pages(total_count: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total_count.div_ceil(page_size)
}

/// Page links shown around the current page (at most five).
pub fn page_numbers(current_page: u64, total_pages: u64) -> Vec<u64> {
    const MAX_VISIBLE: u64 = 5;

    if total_pages <= MAX_VISIBLE {
        return (1..=total_pages).collect();
    }

    let start = current_page.saturating_sub(2).max(1);
    let end = total_pages.min(start + MAX_VISIBLE - 1);
    (start..=end).collect()
}

/// Closest known team names to `query`, best first.
pub fn suggest_teams(query: &str, teams: &[String], limit: usize) -> Vec<String> {
    let needle = query.trim().to_lowercase();
    let mut scored: Vec<(f64, &String)> = teams
        .iter()
        .map(|team| (strsim::jaro_winkler(&needle, &team.to_lowercase()), team))
        .filter(|(score, _)| *score >= 0.7)
        .collect();

    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.cmp(b.1))
    });

    scored.into_iter().take(limit).map(|(_, team)| team.clone()).collect()
}
