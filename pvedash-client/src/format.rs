//! Human-readable rendering of byte counts, percentages and uptimes

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// 1024-based, at most two decimals, trailing zeros trimmed (`1536` -> `1.5 KB`)
pub fn format_bytes(bytes: Option<u64>) -> String {
    let bytes = match bytes {
        None | Some(0) => return "0 B".to_string(),
        Some(b) => b,
    };

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

/// `fraction` is 0..1 (upstream CPU convention); absent or zero -> `0%`
pub fn format_percentage(fraction: Option<f64>) -> String {
    match fraction {
        Some(f) if f != 0.0 && f.is_finite() => format!("{:.1}%", f * 100.0),
        _ => "0%".to_string(),
    }
}

/// used/max as a fraction, 0 when max is absent or zero
pub fn usage_fraction(used: Option<u64>, max: Option<u64>) -> f64 {
    match max {
        Some(max) if max > 0 => used.unwrap_or(0) as f64 / max as f64,
        _ => 0.0,
    }
}

/// Coarsest non-zero unit: `1d 1h`, `1h 1m`, `0m`; zero or absent -> `Down`
pub fn format_uptime(seconds: Option<u64>) -> String {
    let seconds = match seconds {
        None | Some(0) => return "Down".to_string(),
        Some(s) => s,
    };

    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;

    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
