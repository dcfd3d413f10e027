/// `HH:MM:SS`, with hours allowed to exceed two digits.
pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Minutes per kilometer at `speed_kmh`; 0 when not moving.
pub fn pace_from_speed(speed_kmh: f64) -> f64 {
    if speed_kmh.is_finite() && speed_kmh > 0.0 {
        60.0 / speed_kmh
    } else {
        0.0
    }
}

/// `M:SS /km`, or `--` when there is no pace.
pub fn format_pace(pace_min_per_km: f64) -> String {
    if !pace_min_per_km.is_finite() || pace_min_per_km <= 0.0 {
        return "--".to_string();
    }
    let total = (pace_min_per_km * 60.0).round() as u64;
    format!("{}:{:02} /km", total / 60, total % 60)
}

/// Up to two uppercase initials, used in place of an avatar image.
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect()
}
