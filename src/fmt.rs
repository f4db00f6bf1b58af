fn with_commas(int_part: &str) -> String {
    let mut out = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out.chars().rev().collect()
}

fn dollars(val: f64, decimals: usize) -> String {
    let negative = val < 0.0;
    let fixed = format!("{:.*}", decimals, val.abs());
    let (int_part, dec_part) = match fixed.split_once('.') {
        Some((i, d)) => (i, Some(d)),
        None => (fixed.as_str(), None),
    };
    let body = match dec_part {
        Some(d) => format!("{}.{d}", with_commas(int_part)),
        None => with_commas(int_part),
    };
    // -0.00 after rounding is still zero
    if negative && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-${body}")
    } else {
        format!("${body}")
    }
}

/// Format a float as a dollar amount with thousands separators: $1,234.56
pub fn money(val: f64) -> String {
    dollars(val, 2)
}

/// Whole-dollar form used for chart annotations: $1,235
pub fn money_whole(val: f64) -> String {
    dollars(val, 0)
}

/// Percentage with two decimals: 12.50%
pub fn pct(val: f64) -> String {
    format!("{val:.2}%")
}

/// Round to two decimals, exact ties going to the even digit.
pub fn round2(val: f64) -> f64 {
    (val * 100.0).round_ties_even() / 100.0
}
