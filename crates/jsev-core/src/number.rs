//! # Numeric Semantics — Exact Comparison and Divisibility
//!
//! JSON numbers are arbitrary-precision decimals; `serde_json` stores them as
//! `i64`, `u64`, or `f64`. The numeric keywords need answers that do not drift
//! with binary floating point:
//!
//! - [`compare`] orders two numbers exactly when both are integers, and falls
//!   back to `f64` ordering otherwise.
//! - [`is_integer`] treats `1.0` as an integer.
//! - [`is_multiple_of`] computes the remainder on the shortest decimal
//!   representation of both operands, so `0.3` is a multiple of `0.1`.

use std::cmp::Ordering;

use serde_json::Number;

/// Compare two JSON numbers.
pub fn compare(a: &Number, b: &Number) -> Ordering {
    match (as_i128(a), as_i128(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => {
            let x = a.as_f64().unwrap_or(f64::NAN);
            let y = b.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
    }
}

/// True when `n` has no fractional part.
pub fn is_integer(n: &Number) -> bool {
    if n.is_i64() || n.is_u64() {
        return true;
    }
    n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
}

/// True when `value / divisor` is an integer.
///
/// A zero divisor never divides anything; callers reject it as a malformed
/// keyword value before getting here.
pub fn is_multiple_of(value: &Number, divisor: &Number) -> bool {
    if let (Some(v), Some(d)) = (Decimal::parse(value), Decimal::parse(divisor)) {
        if let Some(answer) = v.is_multiple_of(&d) {
            return answer;
        }
    }
    let (Some(v), Some(d)) = (value.as_f64(), divisor.as_f64()) else {
        return false;
    };
    if d == 0.0 {
        return false;
    }
    let quotient = v / d;
    quotient.is_finite() && quotient.fract() == 0.0
}

fn as_i128(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

// ---------------------------------------------------------------------------
// Decimal
// ---------------------------------------------------------------------------

/// `mantissa * 10^exponent`, sign dropped (irrelevant for divisibility).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Decimal {
    mantissa: u128,
    exponent: i32,
}

impl Decimal {
    /// Parse the shortest round-trip text form produced by `serde_json`.
    fn parse(n: &Number) -> Option<Self> {
        let text = n.to_string();
        let text = text.strip_prefix('-').unwrap_or(&text);
        let (significand, exp) = match text.find(['e', 'E']) {
            Some(pos) => (&text[..pos], text[pos + 1..].parse::<i32>().ok()?),
            None => (text, 0),
        };
        let (int_part, frac_part) = match significand.split_once('.') {
            Some((i, f)) => (i, f),
            None => (significand, ""),
        };
        let mut mantissa: u128 = 0;
        for b in int_part.bytes().chain(frac_part.bytes()) {
            if !b.is_ascii_digit() {
                return None;
            }
            mantissa = mantissa.checked_mul(10)?.checked_add(u128::from(b - b'0'))?;
        }
        let frac_len = i32::try_from(frac_part.len()).ok()?;
        let mut exponent = exp.checked_sub(frac_len)?;
        while mantissa != 0 && mantissa % 10 == 0 {
            mantissa /= 10;
            exponent += 1;
        }
        Some(Self { mantissa, exponent })
    }

    /// `None` when aligning the operands overflows.
    fn is_multiple_of(&self, divisor: &Decimal) -> Option<bool> {
        if divisor.mantissa == 0 {
            return Some(false);
        }
        if self.mantissa == 0 {
            return Some(true);
        }
        let common = self.exponent.min(divisor.exponent);
        let v = scale(self.mantissa, self.exponent - common)?;
        let d = scale(divisor.mantissa, divisor.exponent - common)?;
        Some(v % d == 0)
    }
}

fn scale(mantissa: u128, by: i32) -> Option<u128> {
    let factor = 10u128.checked_pow(u32::try_from(by).ok()?)?;
    mantissa.checked_mul(factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn num(v: serde_json::Value) -> Number {
        match v {
            serde_json::Value::Number(n) => n,
            other => panic!("not a number: {other}"),
        }
    }

    #[test]
    fn test_compare_mixed_representations() {
        assert_eq!(compare(&num(json!(1)), &num(json!(1.0))), Ordering::Equal);
        assert_eq!(compare(&num(json!(-1)), &num(json!(u64::MAX))), Ordering::Less);
        assert_eq!(compare(&num(json!(2.5)), &num(json!(2))), Ordering::Greater);
    }

    #[test]
    fn test_compare_large_integers_exactly() {
        let a = num(json!(9007199254740993u64));
        let b = num(json!(9007199254740992u64));
        assert_eq!(compare(&a, &b), Ordering::Greater);
    }

    #[test]
    fn test_is_integer_accepts_integral_floats() {
        assert!(is_integer(&num(json!(1))));
        assert!(is_integer(&num(json!(1.0))));
        assert!(is_integer(&num(json!(-0.0))));
        assert!(!is_integer(&num(json!(1.5))));
    }

    #[test]
    fn test_decimal_multiple_of() {
        assert!(is_multiple_of(&num(json!(0.3)), &num(json!(0.1))));
        assert!(is_multiple_of(&num(json!(19.99)), &num(json!(0.01))));
        assert!(!is_multiple_of(&num(json!(0.35)), &num(json!(0.1))));
        assert!(is_multiple_of(&num(json!(4.5)), &num(json!(1.5))));
    }

    #[test]
    fn test_integer_multiple_of() {
        assert!(is_multiple_of(&num(json!(10)), &num(json!(2))));
        assert!(!is_multiple_of(&num(json!(11)), &num(json!(2))));
        assert!(is_multiple_of(&num(json!(0)), &num(json!(7))));
        assert!(is_multiple_of(&num(json!(-12)), &num(json!(3))));
    }

    #[test]
    fn test_exponent_notation() {
        assert!(is_multiple_of(&num(json!(1e-7)), &num(json!(1e-8))));
        assert!(!is_multiple_of(&num(json!(1e-8)), &num(json!(1e-7))));
    }

    #[test]
    fn test_huge_operands_fall_back_to_float() {
        assert!(!is_multiple_of(&num(json!(1e308)), &num(json!(0.123456789))));
    }

    #[test]
    fn test_zero_divisor_divides_nothing() {
        assert!(!is_multiple_of(&num(json!(4)), &num(json!(0))));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn product_is_multiple_of_factor(a in -100_000i64..100_000, b in 1i64..1_000) {
                prop_assert!(is_multiple_of(&Number::from(a * b), &Number::from(b)));
            }

            #[test]
            fn cents_are_multiples_of_a_cent(cents in 0u32..1_000_000) {
                let text = format!("{}.{:02}", cents / 100, cents % 100);
                let value: Number = serde_json::from_str(&text).unwrap();
                let cent: Number = serde_json::from_str("0.01").unwrap();
                prop_assert!(is_multiple_of(&value, &cent));
            }

            #[test]
            fn compare_matches_integer_order(a in any::<i64>(), b in any::<i64>()) {
                prop_assert_eq!(compare(&Number::from(a), &Number::from(b)), a.cmp(&b));
            }
        }
    }
}
