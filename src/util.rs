use rust_decimal::Decimal;

/// Render a money amount as `$1,234.50`. Negative values get a leading `-`.
pub(crate) fn format_amount(val: Decimal) -> String {
    let rounded = format!("{:.2}", val.abs().round_dp(2));
    let (int_part, dec_part) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if val < Decimal::ZERO { "-" } else { "" };
    format!("{sign}${grouped}.{dec_part}")
}

/// Render a percentage with one decimal, e.g. `42.5%`.
pub(crate) fn format_percent(val: Decimal) -> String {
    format!("{:.1}%", val)
}

/// Shorten `s` to at most `max` characters, ending in "…" when cut.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    match max {
        0 => String::new(),
        _ => s.chars().take(max - 1).chain(std::iter::once('…')).collect(),
    }
}
