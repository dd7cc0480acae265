// Retailer-agnostic price extraction

/// Pulls the first number out of a price element's text.
///
/// Everything except digits, `,` and `.` is dropped, the first comma is
/// treated as the decimal separator, and the first `digits[.digits]` run is
/// parsed. Thousands separators are not recognised: `"1,234"` yields `1.234`.
pub fn extract_price(text: Option<&str>) -> Option<f64> {
    let text = text?;
    if text.is_empty() {
        return None;
    }

    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    let cleaned = cleaned.replacen(',', ".", 1);

    let number = first_number(&cleaned)?;
    number.trim_end_matches('.').parse::<f64>().ok()
}

/// First `\d+\.?\d*` run in `s`.
fn first_number(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let start = bytes.iter().position(u8::is_ascii_digit)?;

    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }

    Some(&s[start..end])
}
