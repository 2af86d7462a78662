const SECONDS_PER_MINUTE: f64 = 60.0;
const SECONDS_PER_HOUR: f64 = 60.0 * SECONDS_PER_MINUTE;

fn format_shifted_value(value: f64, fraction_digits: usize) -> String {
    if fraction_digits == 0 || value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1$}", value, fraction_digits)
    }
}

/// Format a predicted shard time, given in seconds, in the largest unit that
/// keeps it above one.
pub(crate) fn format_duration(seconds: f64, fraction_digits: Option<usize>) -> String {
    let fraction_digits = fraction_digits.unwrap_or(1); // Default to 1 decimal place

    match seconds {
        s if s >= SECONDS_PER_HOUR => {
            format!("{} h", format_shifted_value(s / SECONDS_PER_HOUR, fraction_digits))
        }
        s if s >= SECONDS_PER_MINUTE => format!(
            "{} min",
            format_shifted_value(s / SECONDS_PER_MINUTE, fraction_digits)
        ),
        s if s >= 1.0 || s == 0.0 => format!("{} s", format_shifted_value(s, fraction_digits)),
        s => format!("{} ms", format_shifted_value(s * 1000.0, fraction_digits)),
    }
}
