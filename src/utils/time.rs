use chrono::{DateTime, Utc};

/// Relative age of a unix timestamp (seconds) as seen from `now`.
pub fn format_age(timestamp: i64, now: DateTime<Utc>) -> String {
	let elapsed = now.timestamp().saturating_sub(timestamp).max(0);

	match elapsed {
		0..=59 => format!("{} secs ago", elapsed),
		60..=3_599 => format!("{} mins ago", elapsed / 60),
		3_600..=86_399 => format!("{} hours ago", elapsed / 3_600),
		_ => format!("{} days ago", elapsed / 86_400),
	}
}

/// UTC wall-clock text for a unix timestamp (seconds); empty when out of range.
pub fn format_utc_time(timestamp: i64) -> String {
	DateTime::<Utc>::from_timestamp(timestamp, 0)
		.map(|time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string())
		.unwrap_or_default()
}
