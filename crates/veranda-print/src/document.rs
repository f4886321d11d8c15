//! Fixed-width text layout helpers shared by the receipt and report
//! renderers. Widths are in characters; alignment is byte-based, which
//! is safe because the composed fields are ASCII and the baht sign is
//! only ever used through [`money`].

use veranda_core::Money;

/// Thermal receipt roll width.
pub const RECEIPT_WIDTH: usize = 42;

/// Report page width (A4 portrait, 12 cpi).
pub const REPORT_WIDTH: usize = 80;

/// Body lines per report page, heading excluded.
pub const REPORT_LINES_PER_PAGE: usize = 56;

/// Centers `text` in `width` columns, truncating if too long.
pub fn center(text: &str, width: usize) -> String {
    let text = truncate(text, width);
    let pad = width.saturating_sub(text.chars().count());
    let left = pad / 2;
    format!("{}{}", " ".repeat(left), text)
}

/// Left text, right text, padding between. The right side wins when
/// they collide.
pub fn left_right(left: &str, right: &str, width: usize) -> String {
    let right = truncate(right, width);
    let room = width.saturating_sub(right.chars().count() + 1);
    let left = truncate(left, room);
    let pad = width
        .saturating_sub(left.chars().count())
        .saturating_sub(right.chars().count());
    format!("{}{}{}", left, " ".repeat(pad), right)
}

/// A horizontal rule of `ch`.
pub fn rule(ch: char, width: usize) -> String {
    std::iter::repeat(ch).take(width).collect()
}

/// Truncates to `width` characters.
pub fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

/// Greedy word wrap. Words longer than the width are hard-split.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word.to_string();
        while word.chars().count() > width {
            let head: String = word.chars().take(width).collect();
            let tail: String = word.chars().skip(width).collect();
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(head);
            word = tail;
        }

        if current.is_empty() {
            current = word;
        } else if current.chars().count() + 1 + word.chars().count() <= width {
            current.push(' ');
            current.push_str(&word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Money rendered for documents: `1,234.50` (baht, no currency sign;
/// the column heading carries the currency).
pub fn money(amount: Money) -> String {
    let negative = amount.is_negative();
    let satang = amount.satang().abs();
    let baht = satang / 100;
    let cents = satang % 100;

    let mut digits = baht.to_string();
    let mut grouped = String::new();
    while digits.len() > 3 {
        let split = digits.len() - 3;
        grouped = format!(",{}{}", &digits[split..], grouped);
        digits.truncate(split);
    }
    grouped = format!("{digits}{grouped}");

    let sign = if negative { "-" } else { "" };
    format!("{sign}{grouped}.{cents:02}")
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center() {
        assert_eq!(center("AB", 6), "  AB");
        assert_eq!(center("ABCDEFGH", 4), "ABCD");
    }

    #[test]
    fn test_left_right() {
        assert_eq!(left_right("Total", "120.50", 20), "Total         120.50");
        // Right side wins on collision
        let line = left_right("A very long label here", "99.00", 20);
        assert_eq!(line.chars().count(), 20);
        assert!(line.ends_with("99.00"));
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("one two three", 8), vec!["one two", "three"]);
        assert_eq!(wrap("supercalifragilistic", 10), vec!["supercalif", "ragilistic"]);
        assert_eq!(wrap("", 10), vec![""]);
    }

    #[test]
    fn test_money_grouping() {
        assert_eq!(money(Money::from_satang(0)), "0.00");
        assert_eq!(money(Money::from_satang(12050)), "120.50");
        assert_eq!(money(Money::from_satang(123_456_789)), "1,234,567.89");
        assert_eq!(money(Money::from_satang(-9500)), "-95.00");
    }
}
