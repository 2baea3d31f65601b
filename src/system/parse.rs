//! Lenient helpers shared by the platform parsers. Anything unparseable
//! yields `None` and the caller keeps its default.

pub fn value_after<'a>(line: &'a str, key: &str, sep: char) -> Option<&'a str> {
    let (k, v) = line.split_once(sep)?;
    (k.trim() == key).then(|| v.trim())
}

/// First `key<sep>value` match in a multi-line blob.
pub fn field<'a>(text: &'a str, key: &str, sep: char) -> Option<&'a str> {
    text.lines().find_map(|line| value_after(line, key, sep))
}

pub fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let end = s
        .char_indices()
        .find(|&(_, c)| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s[..end].parse().ok()
}

pub fn leading_u64(s: &str) -> Option<u64> {
    let s = s.trim_start();
    let end = s
        .char_indices()
        .find(|&(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s[..end].parse().ok()
}

/// "92%" → 92. Values outside 0..=100 are rejected.
pub fn percent(s: &str) -> Option<u8> {
    let value: u32 = s.trim().trim_end_matches('%').parse().ok()?;
    u8::try_from(value).ok().filter(|v| *v <= 100)
}

pub fn strip_quotes(s: &str) -> &str {
    s.trim().trim_matches(|c| c == '"' || c == '\'')
}

/// Size with an optional K/M/G/T suffix ("1024.50M") to bytes.
pub fn suffixed_bytes(s: &str) -> Option<u64> {
    let s = s.trim();
    let (num, mult) = match s.chars().last()? {
        'K' | 'k' => (&s[..s.len() - 1], 1024f64),
        'M' | 'm' => (&s[..s.len() - 1], 1024f64 * 1024.0),
        'G' | 'g' => (&s[..s.len() - 1], 1024f64 * 1024.0 * 1024.0),
        'T' | 't' => (&s[..s.len() - 1], 1024f64 * 1024.0 * 1024.0 * 1024.0),
        _ => (s, 1.0),
    };
    let value: f64 = num.trim().parse().ok()?;
    (value >= 0.0).then(|| (value * mult) as u64)
}

pub fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_lookup_trims_both_sides() {
        let text = "model name\t: Intel(R) Core(TM) i7\ncpu MHz\t\t: 2400.000\n";
        assert_eq!(field(text, "model name", ':'), Some("Intel(R) Core(TM) i7"));
        assert_eq!(field(text, "cpu MHz", ':'), Some("2400.000"));
        assert_eq!(field(text, "missing", ':'), None);
    }

    #[test]
    fn numbers_are_lenient() {
        assert_eq!(leading_number("96.5 id"), Some(96.5));
        assert_eq!(leading_number("abc"), None);
        assert_eq!(leading_u64("8388608 kB"), Some(8_388_608));
        assert_eq!(leading_u64("12345."), Some(12345));
    }

    #[test]
    fn percent_rejects_out_of_range() {
        assert_eq!(percent("92%"), Some(92));
        assert_eq!(percent("100%"), Some(100));
        assert_eq!(percent("101%"), None);
        assert_eq!(percent("-"), None);
    }

    #[test]
    fn suffixed_sizes() {
        assert_eq!(suffixed_bytes("2048.00M"), Some(2048 * 1024 * 1024));
        assert_eq!(suffixed_bytes("1.00G"), Some(1024 * 1024 * 1024));
        assert_eq!(suffixed_bytes("512"), Some(512));
        assert_eq!(suffixed_bytes("lots"), None);
    }

    #[test]
    fn quotes_are_stripped() {
        assert_eq!(strip_quotes("\"Ubuntu 24.04 LTS\""), "Ubuntu 24.04 LTS");
    }
}
