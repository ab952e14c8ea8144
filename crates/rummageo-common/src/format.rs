//! Number formatting matching how statistics are displayed in result tables.
//! `to_precision`, `to_exponential` and `to_fixed` follow the ECMAScript
//! `Number.prototype` conventions so exported values match the web tables.

fn non_finite(x: f64) -> String {
    if x.is_nan() {
        "NaN".to_string()
    } else if x > 0.0 {
        "Infinity".to_string()
    } else {
        "-Infinity".to_string()
    }
}

/// `x` with `digits` decimals in scientific notation, e.g. `1.23e-5`, `4.00e+2`.
pub fn to_exponential(x: f64, digits: usize) -> String {
    if !x.is_finite() {
        return non_finite(x);
    }
    let s = format!("{:.*e}", digits, x);
    match s.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
        _ => s,
    }
}

/// `x` with `precision` significant digits.
pub fn to_precision(x: f64, precision: usize) -> String {
    let precision = precision.max(1);
    if !x.is_finite() {
        return non_finite(x);
    }
    if x == 0.0 {
        return format!("{:.*}", precision - 1, 0.0);
    }
    // rounding may bump the exponent (9.996 -> 1.00e1), so read it back
    let sci = format!("{:.*e}", precision - 1, x);
    let exp: i32 = sci
        .split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);
    if exp < -6 || exp >= precision as i32 {
        to_exponential(x, precision - 1)
    } else {
        let decimals = (precision as i32 - 1 - exp).max(0) as usize;
        format!("{:.*}", decimals, x)
    }
}

pub fn to_fixed(x: f64, digits: usize) -> String {
    if !x.is_finite() {
        return non_finite(x);
    }
    format!("{:.*}", digits, x)
}

/// `-log10(x)`, the significance axis used by bar charts.
pub fn neg_log10(x: f64) -> f64 {
    -x.log10()
}
