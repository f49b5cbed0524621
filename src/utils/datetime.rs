use jiff::Timestamp;

/// Format a timestamp into a short relative string like "2d ago", "3h ago",
/// "15m ago", or "just now".
pub fn format_relative(ts: Timestamp) -> String {
    let now = Timestamp::now();
    let delta = now.as_second() - ts.as_second();

    if delta <= 0 {
        return "just now".to_string();
    }

    let days = delta / 86_400;
    if days > 0 {
        return format!("{}d ago", days);
    }

    let hours = delta / 3_600;
    if hours > 0 {
        return format!("{}h ago", hours);
    }

    let minutes = delta / 60;
    if minutes > 0 {
        return format!("{}m ago", minutes);
    }

    "just now".to_string()
}
