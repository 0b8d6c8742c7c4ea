//! ISO-8601 时长解析

use regex::Regex;
use std::sync::OnceLock;

fn duration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^P(?:(?P<weeks>\d+)W)?(?:(?P<days>\d+)D)?(?:T(?:(?P<hours>\d+)H)?(?:(?P<minutes>\d+)M)?(?:(?P<seconds>\d+(?:[.,]\d+)?)S)?)?$",
        )
        .expect("duration pattern is a valid regex")
    })
}

/// 将 ISO-8601 时长（如 `PT5M30S`、`P1DT2H`）解析为总秒数
///
/// 小数秒向下取整。年、月单位长度不固定，不予支持。
pub fn parse_iso8601(input: &str) -> Option<u64> {
    let input = input.trim();
    let caps = duration_pattern().captures(input)?;

    // `P` 与 `PT` 本身不是合法时长
    if input == "P" || input.ends_with('T') {
        return None;
    }

    let unit = |name: &str| -> Option<u64> {
        match caps.name(name) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };

    let seconds = match caps.name("seconds") {
        Some(m) => {
            let whole = m.as_str().split(['.', ',']).next().unwrap_or("0");
            whole.parse::<u64>().ok()?
        }
        None => 0,
    };

    let total = unit("weeks")?
        .checked_mul(7 * 86_400)?
        .checked_add(unit("days")?.checked_mul(86_400)?)?
        .checked_add(unit("hours")?.checked_mul(3_600)?)?
        .checked_add(unit("minutes")?.checked_mul(60)?)?
        .checked_add(seconds)?;

    Some(total)
}

/// 以规范形式编码秒数，`parse_iso8601(format_iso8601(s)) == Some(s)`
pub fn format_iso8601(total_secs: u64) -> String {
    if total_secs == 0 {
        return "P0D".to_string();
    }

    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;

    let mut out = String::from("P");
    if days > 0 {
        out.push_str(&format!("{}D", days));
    }
    if hours > 0 || minutes > 0 || seconds > 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{}H", hours));
        }
        if minutes > 0 {
            out.push_str(&format!("{}M", minutes));
        }
        if seconds > 0 {
            out.push_str(&format!("{}S", seconds));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_durations() {
        assert_eq!(parse_iso8601("PT5M30S"), Some(330));
        assert_eq!(parse_iso8601("PT1H"), Some(3600));
        assert_eq!(parse_iso8601("PT45S"), Some(45));
        assert_eq!(parse_iso8601("P1DT2H3M4S"), Some(93_784));
        assert_eq!(parse_iso8601("P1W"), Some(604_800));
        assert_eq!(parse_iso8601("P0D"), Some(0));
        assert_eq!(parse_iso8601("PT1.9S"), Some(1));
    }

    #[test]
    fn test_malformed_durations() {
        for input in ["", "P", "PT", "5M30S", "PT5X", "P1Y", "PT-5S", "P1DT"] {
            assert_eq!(parse_iso8601(input), None, "input {input:?}");
        }
    }

    #[test]
    fn test_format_parse_round_trip() {
        for secs in [0, 1, 59, 60, 330, 3_599, 3_600, 86_399, 86_400, 93_784, 1_000_000] {
            assert_eq!(parse_iso8601(&format_iso8601(secs)), Some(secs));
        }
    }

    #[test]
    fn test_reencoding_is_idempotent() {
        for input in ["PT5M30S", "PT90M", "P1W", "PT3600S"] {
            let secs = parse_iso8601(input).unwrap();
            let canonical = format_iso8601(secs);
            assert_eq!(parse_iso8601(&canonical), Some(secs));
            assert_eq!(format_iso8601(parse_iso8601(&canonical).unwrap()), canonical);
        }
    }
}
