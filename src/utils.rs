// src/utils.rs

// d/h/m/s breakdown. Once a larger unit is rendered every smaller one is
// rendered too, so "1d 0h 0m 5s" keeps its zeroes; plain seconds stay bare.
pub fn format_duration(total_secs: u64) -> String {
    let days = total_secs / 86400;
    let hours = total_secs % 86400 / 3600;
    let minutes = total_secs % 3600 / 60;
    let seconds = total_secs % 60;

    let mut out = String::new();
    let mut carry = false;
    if days > 0 {
        carry = true;
        out.push_str(&format!("{}d", days));
    }
    if carry || hours > 0 {
        carry = true;
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&format!("{}h", hours));
    }
    if carry || minutes > 0 {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&format!("{}m", minutes));
    }
    if !out.is_empty() {
        out.push(' ');
    }
    out.push_str(&format!("{}s", seconds));
    out
}

// Strict-strip of anything tag-shaped plus control characters. Game servers
// put color codes and HTML in their names; none of it belongs in output.
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_tag = false;
    for c in name.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if in_tag || c.is_control() => {}
            c => out.push(c),
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_seconds_renders_seconds_only() {
        assert_eq!(format_duration(0), "0s");
    }

    #[test]
    fn seconds_below_a_minute_stay_bare() {
        assert_eq!(format_duration(59), "59s");
    }

    #[test]
    fn minute_boundary_forces_seconds_in() {
        assert_eq!(format_duration(60), "1m 0s");
    }

    #[test]
    fn all_units_render_from_first_nonzero_down() {
        assert_eq!(format_duration(86400 + 3661), "1d 1h 1m 1s");
    }

    #[test]
    fn inner_zero_units_are_kept() {
        // 2 days, 3 hours, 0 minutes, 5 seconds
        assert_eq!(format_duration(2 * 86400 + 3 * 3600 + 5), "2d 3h 0m 5s");
        // 1 day exactly
        assert_eq!(format_duration(86400), "1d 0h 0m 0s");
    }

    #[test]
    fn hours_without_days_omit_days() {
        assert_eq!(format_duration(3600 + 2), "1h 0m 2s");
    }

    #[test]
    fn sanitize_strips_tags_and_control_chars() {
        assert_eq!(sanitize_name("<b>Ark</b> Server"), "Ark Server");
        assert_eq!(sanitize_name("plain name"), "plain name");
        assert_eq!(sanitize_name("bell\x07name"), "bellname");
        assert_eq!(sanitize_name("  padded  "), "padded");
    }

    #[test]
    fn sanitize_drops_unterminated_tag_tail() {
        assert_eq!(sanitize_name("Ark <broken"), "Ark");
    }
}
