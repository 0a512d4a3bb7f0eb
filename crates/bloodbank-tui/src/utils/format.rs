use bloodbank_core::models::Inventory;
use chrono::{DateTime, Utc};

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Render an inventory as `A+: 5, O-: 2` in blood group order.
pub fn format_inventory(inventory: Option<&Inventory>) -> String {
    match inventory {
        None => "-".to_string(),
        Some(inv) if inv.is_empty() => "(empty)".to_string(),
        Some(inv) => inv
            .iter()
            .map(|(group, units)| format!("{}: {}", group, units))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

/// Group thousands with commas: 12345 -> "12,345".
pub fn format_count(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

/// Human-readable age of a timestamp relative to `now`.
pub fn age_display(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    if seconds < 5 {
        // Also covers clock skew
        "just now".to_string()
    } else if seconds < 60 {
        format!("{}s ago", seconds)
    } else if seconds < 3600 {
        format!("{}m ago", seconds / 60)
    } else if seconds < 86_400 {
        format!("{}h ago", seconds / 3600)
    } else {
        format!("{}d ago", seconds / 86_400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloodbank_core::BloodGroup;
    use chrono::Duration;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Hello", 2), "He");
    }

    #[test]
    fn test_format_inventory() {
        assert_eq!(format_inventory(None), "-");
        assert_eq!(format_inventory(Some(&Inventory::new())), "(empty)");

        let inv = Inventory::from([(BloodGroup::ONegative, 2), (BloodGroup::APositive, 5)]);
        assert_eq!(format_inventory(Some(&inv)), "A+: 5, O-: 2");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
        assert_eq!(format_count(-4500), "-4,500");
    }

    #[test]
    fn test_age_display() {
        let now = Utc::now();
        assert_eq!(age_display(now, now), "just now");
        assert_eq!(age_display(now + Duration::seconds(30), now), "just now");
        assert_eq!(age_display(now - Duration::seconds(42), now), "42s ago");
        assert_eq!(age_display(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(age_display(now - Duration::hours(3), now), "3h ago");
        assert_eq!(age_display(now - Duration::days(2), now), "2d ago");
    }
}
