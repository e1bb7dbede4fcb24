use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Exact monetary amount in minor units (two decimal places).
///
/// Clients send amounts either as decimal strings (`"12.50"`) or as JSON
/// numbers (`12.5`). Both are accepted; anything with more than two decimal
/// places is rejected rather than silently rounded. Amounts always serialize
/// as two-decimal strings so the wire format stays exact.
///
/// The operators saturate at the `i64` bounds. Use the `checked_*` methods
/// where an overflow has to be reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);
    const SCALE: u32 = 2;

    /// Digit budget of a stored invoice amount or line total.
    pub const AMOUNT_DIGITS: u32 = 12;
    /// Digit budget of a unit price.
    pub const PRICE_DIGITS: u32 = 10;

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Whole units plus cents, e.g. `Money::new(12, 50)` is 12.50.
    pub const fn new(units: i64, cents: i64) -> Self {
        Self(units * 100 + cents)
    }

    /// Parse a decimal string with at most two fractional digits.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        parse_fixed(s, Self::SCALE)
            .map(Self)
            .map_err(|reason| TypeError::InvalidAmount {
                value: s.to_string(),
                reason,
            })
    }

    /// Convert a JSON float, rejecting values that need more than two decimals.
    pub fn from_f64(value: f64) -> Result<Self, TypeError> {
        float_to_fixed(value, Self::SCALE)
            .map(Self)
            .map_err(|reason| TypeError::InvalidAmount {
                value: value.to_string(),
                reason,
            })
    }

    /// At most `digits` digits in total, two of them after the point.
    pub fn fits_digits(&self, digits: u32) -> bool {
        10u64
            .checked_pow(digits)
            .map_or(true, |limit| self.0.unsigned_abs() < limit)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Line total for `quantity` units at this price.
    pub fn times(self, quantity: i64) -> Result<Self, TypeError> {
        self.0
            .checked_mul(quantity)
            .map(Self)
            .ok_or(TypeError::Overflow)
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Multiply by a rate, rounding half away from zero to the nearest cent.
    pub fn apply_rate(self, rate: Rate) -> Self {
        let product = i128::from(self.0) * i128::from(rate.0);
        let denom = i128::from(Rate::ONE.0);
        let rounded = (product.abs() + denom / 2) / denom;
        let signed = if product < 0 { -rounded } else { rounded };
        Self(signed as i64)
    }

    /// Divide evenly (for averages), rounding half away from zero.
    pub fn div_round(self, divisor: i64) -> Option<Self> {
        if divisor == 0 {
            return None;
        }
        let n = i128::from(self.0);
        let d = i128::from(divisor);
        let rounded = (n.abs() * 2 + d.abs()) / (d.abs() * 2);
        let signed = if (n < 0) != (d < 0) { -rounded } else { rounded };
        Some(Self(signed as i64))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer
            .deserialize_any(FixedVisitor { scale: Money::SCALE, what: "an amount" })
            .map(Money)
    }
}

/// Fraction with four decimal places, bounded to `0..=1` (e.g. tax rate `0.1000`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rate(u32);

impl Rate {
    pub const ZERO: Rate = Rate(0);
    pub const ONE: Rate = Rate(10_000);
    const SCALE: u32 = 4;

    pub fn from_ten_thousandths(value: u32) -> Result<Self, TypeError> {
        if value > Self::ONE.0 {
            return Err(TypeError::InvalidRate {
                value: value.to_string(),
                reason: "must be between 0 and 1".into(),
            });
        }
        Ok(Self(value))
    }

    pub const fn ten_thousandths(&self) -> u32 {
        self.0
    }

    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let raw = parse_fixed(s, Self::SCALE).map_err(|reason| TypeError::InvalidRate {
            value: s.to_string(),
            reason,
        })?;
        Self::checked(raw, s)
    }

    fn checked(raw: i64, original: &str) -> Result<Self, TypeError> {
        u32::try_from(raw)
            .ok()
            .filter(|v| *v <= Self::ONE.0)
            .map(Self)
            .ok_or_else(|| TypeError::InvalidRate {
                value: original.to_string(),
                reason: "must be between 0 and 1".into(),
            })
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:04}", self.0 / 10_000, self.0 % 10_000)
    }
}

impl FromStr for Rate {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Rate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = deserializer.deserialize_any(FixedVisitor { scale: Rate::SCALE, what: "a rate" })?;
        Rate::checked(raw, &raw.to_string()).map_err(de::Error::custom)
    }
}

struct FixedVisitor {
    scale: u32,
    what: &'static str,
}

impl<'de> Visitor<'de> for FixedVisitor {
    type Value = i64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} as a decimal string or number", self.what)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
        parse_fixed(v, self.scale).map_err(|reason| E::custom(format!("{v:?}: {reason}")))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
        v.checked_mul(10i64.pow(self.scale))
            .ok_or_else(|| E::custom("value too large"))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
        i64::try_from(v)
            .ok()
            .and_then(|v| v.checked_mul(10i64.pow(self.scale)))
            .ok_or_else(|| E::custom("value too large"))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
        float_to_fixed(v, self.scale).map_err(E::custom)
    }
}

fn parse_fixed(raw: &str, scale: u32) -> Result<i64, String> {
    let s = raw.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err("not a decimal number".into());
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err("not a decimal number".into());
    }
    if frac.len() > scale as usize {
        return Err(format!("more than {scale} decimal places"));
    }

    let too_large = || "value too large".to_string();
    let whole_value: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| too_large())?
    };
    let frac_value: i64 = if frac.is_empty() {
        0
    } else {
        let parsed: i64 = frac.parse().map_err(|_| too_large())?;
        parsed * 10i64.pow(scale - frac.len() as u32)
    };
    let value = whole_value
        .checked_mul(10i64.pow(scale))
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(too_large)?;
    Ok(if negative { -value } else { value })
}

fn float_to_fixed(value: f64, scale: u32) -> Result<i64, String> {
    if !value.is_finite() {
        return Err("not a finite number".into());
    }
    let scaled = value * 10f64.powi(scale as i32);
    let rounded = scaled.round();
    if rounded.abs() >= i64::MAX as f64 {
        return Err("value too large".into());
    }
    if (scaled - rounded).abs() > 1e-6 {
        return Err(format!("more than {scale} decimal places"));
    }
    Ok(rounded as i64)
}
