use chrono::DateTime;

/// Format a counter with `,` thousands separators: 1234567 -> "1,234,567"
pub fn format_number(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format a percentage with two decimals: 20.0 -> "20.00%"
pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value)
}

/// Format epoch seconds as UTC `YYYY-MM-DD HH:MM`
pub fn format_timestamp(epoch_secs: i64) -> String {
    match DateTime::from_timestamp(epoch_secs, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => epoch_secs.to_string(), // Out of range, show raw value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(100000), "100,000");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(20.0), "20.00%");
        assert_eq!(format_percent(0.0), "0.00%");
        assert_eq!(format_percent(46.218487), "46.22%");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00");
        assert_eq!(format_timestamp(1_511_820_900), "2017-11-27 22:15");
        assert_eq!(format_timestamp(i64::MAX), i64::MAX.to_string());
    }
}
