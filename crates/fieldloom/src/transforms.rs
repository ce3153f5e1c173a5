//! Built-in value transforms.
//!
//! These are the primitives behind the shortcut names (`esc`, `ucase`,
//! `int`, ...) plus a printf-style `sprintf` covering the `%s`/`%d`/`%f`
//! conversions with flags, width, and precision.

use std::collections::HashMap;

use serde_json::Value;

use crate::record::value_to_string;
use crate::registry::TransformFn;

/// Installs the built-in transforms into a registry table.
pub(crate) fn install(map: &mut HashMap<String, TransformFn>) {
    map.insert("escape".to_string(), Box::new(escape));
    map.insert("urlencode".to_string(), Box::new(urlencode));
    map.insert("rawurlencode".to_string(), Box::new(rawurlencode));
    map.insert("uppercase".to_string(), Box::new(uppercase));
    map.insert("lowercase".to_string(), Box::new(lowercase));
    map.insert("trim".to_string(), Box::new(trim));
    map.insert("int".to_string(), Box::new(int));
    map.insert("float".to_string(), Box::new(float));
    map.insert("sprintf".to_string(), Box::new(sprintf));
}

fn first(args: &[Value]) -> &Value {
    args.first().unwrap_or(&Value::Null)
}

fn escape(args: &[Value]) -> Value {
    let text = value_to_string(first(args));
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    Value::String(out)
}

fn is_unreserved(byte: u8, tilde: bool) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.') || (tilde && byte == b'~')
}

fn percent_encode(text: &str, tilde: bool, plus_space: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for &byte in text.as_bytes() {
        if is_unreserved(byte, tilde) {
            out.push(byte as char);
        } else if plus_space && byte == b' ' {
            out.push('+');
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

fn urlencode(args: &[Value]) -> Value {
    Value::String(percent_encode(&value_to_string(first(args)), false, true))
}

fn rawurlencode(args: &[Value]) -> Value {
    Value::String(percent_encode(&value_to_string(first(args)), true, false))
}

fn uppercase(args: &[Value]) -> Value {
    Value::String(value_to_string(first(args)).to_uppercase())
}

fn lowercase(args: &[Value]) -> Value {
    Value::String(value_to_string(first(args)).to_lowercase())
}

fn trim(args: &[Value]) -> Value {
    Value::String(value_to_string(first(args)).trim().to_string())
}

fn int(args: &[Value]) -> Value {
    Value::Number(to_i64(first(args)).into())
}

fn float(args: &[Value]) -> Value {
    serde_json::Number::from_f64(to_f64(first(args)))
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn to_i64(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or(0)
        }
        Value::Bool(b) => *b as i64,
        _ => 0,
    }
}

fn to_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        Value::Bool(b) => *b as u8 as f64,
        _ => 0.0,
    }
}

/// Width and precision ceiling; keeps a runaway format string from
/// allocating unbounded padding.
const MAX_PAD: usize = 4096;

/// printf-style formatting: `sprintf("%1.6f", ?)`.
///
/// Supports `%s`, `%d`/`%i`, `%f`, `%x`/`%X`/`%o`, and `%%`, with `-`, `0`,
/// `+`, and space flags, a width, and a precision (both capped at
/// [`MAX_PAD`]). Unknown conversions are emitted verbatim.
fn sprintf(args: &[Value]) -> Value {
    let Some((fmt, rest)) = args.split_first() else {
        return Value::String(String::new());
    };
    let fmt = value_to_string(fmt);
    let mut values = rest.iter();
    let mut out = String::with_capacity(fmt.len());
    let mut chars = fmt.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }

        let mut left = false;
        let mut zero = false;
        let mut plus = false;
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => left = true,
                '0' => zero = true,
                '+' => plus = true,
                ' ' => {}
                _ => break,
            }
            chars.next();
        }

        let mut width = 0usize;
        while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
            width = width.saturating_mul(10).saturating_add(digit as usize);
            chars.next();
        }
        let width = width.min(MAX_PAD);

        let mut precision = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut p = 0usize;
            while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
                p = p.saturating_mul(10).saturating_add(digit as usize);
                chars.next();
            }
            precision = Some(p.min(MAX_PAD));
        }

        let Some(conversion) = chars.next() else {
            out.push('%');
            break;
        };
        let value = values.next().cloned().unwrap_or(Value::Null);
        let formatted = match conversion {
            'd' | 'i' => {
                let n = to_i64(&value);
                let mut s = n.to_string();
                if plus && n >= 0 {
                    s.insert(0, '+');
                }
                s
            }
            'f' | 'F' => {
                let f = to_f64(&value);
                let mut s = format!("{:.*}", precision.unwrap_or(6), f);
                if plus && f >= 0.0 {
                    s.insert(0, '+');
                }
                s
            }
            's' => {
                let s = value_to_string(&value);
                match precision {
                    Some(p) => s.chars().take(p).collect(),
                    None => s,
                }
            }
            'x' => format!("{:x}", to_i64(&value)),
            'X' => format!("{:X}", to_i64(&value)),
            'o' => format!("{:o}", to_i64(&value)),
            other => {
                out.push('%');
                out.push(other);
                continue;
            }
        };
        out.push_str(&pad(formatted, width, left, zero));
    }

    Value::String(out)
}

fn pad(s: String, width: usize, left: bool, zero: bool) -> String {
    let len = s.chars().count();
    if len >= width {
        return s;
    }
    let fill = width - len;
    if left {
        return s + &" ".repeat(fill);
    }
    if zero {
        // Zero padding goes between the sign and the digits.
        let (sign, rest) = match s.strip_prefix(['-', '+']) {
            Some(rest) => (&s[..1], rest),
            None => ("", s.as_str()),
        };
        return format!("{sign}{}{rest}", "0".repeat(fill));
    }
    format!("{}{s}", " ".repeat(fill))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape() {
        let out = escape(&[json!("adam & eve <\"'>")]);
        assert_eq!(out, json!("adam &amp; eve &lt;&quot;&#039;&gt;"));
    }

    #[test]
    fn test_urlencode_variants() {
        assert_eq!(urlencode(&[json!("a b&c")]), json!("a+b%26c"));
        assert_eq!(rawurlencode(&[json!("a b~c")]), json!("a%20b~c"));
        assert_eq!(urlencode(&[json!("a~b")]), json!("a%7Eb"));
    }

    #[test]
    fn test_case_and_trim() {
        assert_eq!(uppercase(&[json!("abc")]), json!("ABC"));
        assert_eq!(lowercase(&[json!("AbC")]), json!("abc"));
        assert_eq!(trim(&[json!("  x  ")]), json!("x"));
    }

    #[test]
    fn test_int_truncates() {
        assert_eq!(int(&[json!(12.34)]), json!(12));
        assert_eq!(int(&[json!("42")]), json!(42));
        assert_eq!(int(&[json!("12.9")]), json!(12));
        assert_eq!(int(&[json!("junk")]), json!(0));
        assert_eq!(int(&[Value::Null]), json!(0));
    }

    #[test]
    fn test_float_parses() {
        assert_eq!(float(&[json!("123.456")]), json!(123.456));
        assert_eq!(float(&[json!(7)]), json!(7.0));
    }

    #[test]
    fn test_sprintf_float_precision() {
        let out = sprintf(&[json!("%1.6f"), json!(std::f64::consts::PI)]);
        assert_eq!(out, json!("3.141593"));
    }

    #[test]
    fn test_sprintf_width_and_flags() {
        assert_eq!(sprintf(&[json!("%05d"), json!(42)]), json!("00042"));
        assert_eq!(sprintf(&[json!("%05d"), json!(-42)]), json!("-0042"));
        assert_eq!(sprintf(&[json!("%-4s|"), json!("ab")]), json!("ab  |"));
        assert_eq!(sprintf(&[json!("%+d"), json!(7)]), json!("+7"));
    }

    #[test]
    fn test_sprintf_oversized_width_is_capped() {
        let out = sprintf(&[json!("%99999999999999999999999d"), json!(5)]);
        let Value::String(s) = out else {
            panic!("expected a string");
        };
        assert_eq!(s.len(), MAX_PAD);
        assert!(s.ends_with('5'));
        let out = sprintf(&[json!("%.99999999999999999999999f"), json!(1.5)]);
        let Value::String(s) = out else {
            panic!("expected a string");
        };
        assert!(s.starts_with("1.5"));
        assert_eq!(s.len(), 2 + MAX_PAD);
    }

    #[test]
    fn test_sprintf_string_precision() {
        assert_eq!(sprintf(&[json!("%.3s"), json!("abcdef")]), json!("abc"));
    }

    #[test]
    fn test_sprintf_percent_literal() {
        assert_eq!(sprintf(&[json!("100%%"), json!(1)]), json!("100%"));
    }

    #[test]
    fn test_sprintf_coerces_strings() {
        let out = sprintf(&[json!("%1.6f"), json!("3.14159265")]);
        assert_eq!(out, json!("3.141593"));
    }
}
