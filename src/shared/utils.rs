//! Utility functions and helpers

/// Format a numeraire amount with thousands separators, e.g. `1,234,567.89`
pub fn format_usd(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{}.{}", sign, grouped, frac_part)
}

/// Generate unique ID
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// `count` points spaced evenly on a log10 scale between `10^min_exp` and `10^max_exp`
pub fn log_space(min_exp: f64, max_exp: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![10f64.powf(min_exp)],
        _ => {
            let step = (max_exp - min_exp) / (count - 1) as f64;
            (0..count)
                .map(|i| 10f64.powf(min_exp + step * i as f64))
                .collect()
        }
    }
}
