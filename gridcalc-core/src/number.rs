//! Arbitrary precision numbers using dashu
//!
//! Finite values are dashu-float `DBig` decimals, so `0.1 + 0.2` is exactly
//! `0.3`. Infinities (and the NaN they can produce) cannot be represented by
//! a decimal, so they live in a native `f64` and any operation touching them
//! is carried out in floating point.

use dashu_float::DBig;
use dashu_int::IBig;
use dashu_int::ops::BitTest;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Error type for number operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumberError {
    #[error("Invalid number format: {0}")]
    ParseError(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Domain error: {0}")]
    DomainError(String),
}

/// Working precision for decimal arithmetic (significant digits)
const DEFAULT_PRECISION: usize = 50;

/// Largest integer exponent computed by repeated squaring
const MAX_EXACT_EXPONENT: i64 = 4096;

/// Largest |ln(x^y)| computed; beyond it dashu's `exp` cannot hold the exponent
const MAX_LN_MAGNITUDE: f64 = 1e15;

#[derive(Debug, Clone)]
enum Repr {
    Decimal(DBig),
    /// Infinity or NaN. Never holds a finite value.
    NonFinite(f64),
}

/// Spreadsheet number: exact decimal, or a non-finite float.
#[derive(Debug, Clone)]
pub struct Number {
    repr: Repr,
}

impl Number {
    // ========== Construction ==========

    fn decimal(val: DBig) -> Self {
        Self { repr: Repr::Decimal(val.with_precision(DEFAULT_PRECISION).value()) }
    }

    fn float(f: f64) -> Self {
        if f.is_finite() {
            Self::from_f64(f)
        } else {
            Self { repr: Repr::NonFinite(f) }
        }
    }

    /// Parse spreadsheet numeric text: "123", "-3.14", "+.5", "1.5e10", "602214076e15"
    pub fn from_str(s: &str) -> Result<Self, NumberError> {
        let s = s.trim();
        let err = || NumberError::ParseError(s.to_string());

        let body = s.strip_prefix('+').unwrap_or(s);
        if body.is_empty()
            || !body.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '-' | '+'))
            || !body.chars().any(|c| c.is_ascii_digit())
        {
            return Err(err());
        }

        let lower = body.to_ascii_lowercase();
        let (mantissa, exponent) = match lower.split_once('e') {
            Some((m, e)) => (m, Some(e.parse::<isize>().map_err(|_| err())?)),
            None => (lower.as_str(), None),
        };
        if mantissa.is_empty() || mantissa[1..].contains(['-', '+']) {
            return Err(err());
        }

        let mantissa = mantissa.strip_prefix('+').unwrap_or(mantissa);
        let mantissa = if mantissa.starts_with('.') {
            format!("0{}", mantissa)
        } else if let Some(rest) = mantissa.strip_prefix("-.") {
            format!("-0.{}", rest)
        } else {
            mantissa.to_string()
        };
        let value: DBig = mantissa.parse().map_err(|_| err())?;

        match exponent {
            // significand * 10^exponent, exact
            Some(exp) => Ok(Self::decimal(value * DBig::from_parts(IBig::ONE, exp))),
            None => Ok(Self::decimal(value)),
        }
    }

    pub fn from_i64(n: i64) -> Self {
        Self::decimal(DBig::from(n))
    }

    /// Create from f64. Finite values go through their shortest round-trip
    /// decimal text, so `from_f64(0.1)` is exactly one tenth.
    pub fn from_f64(f: f64) -> Self {
        if !f.is_finite() {
            return Self { repr: Repr::NonFinite(f) };
        }
        Self::from_str(&format!("{}", f)).unwrap_or_else(|_| Self::zero())
    }

    pub fn zero() -> Self {
        Self::from_i64(0)
    }

    pub fn one() -> Self {
        Self::from_i64(1)
    }

    pub fn infinity(negative: bool) -> Self {
        Self { repr: Repr::NonFinite(if negative { f64::NEG_INFINITY } else { f64::INFINITY }) }
    }

    // ========== Predicates ==========

    pub fn is_zero(&self) -> bool {
        match &self.repr {
            Repr::Decimal(d) => *d == DBig::ZERO,
            Repr::NonFinite(_) => false,
        }
    }

    pub fn is_negative(&self) -> bool {
        match &self.repr {
            Repr::Decimal(d) => *d < DBig::ZERO,
            Repr::NonFinite(f) => *f < 0.0,
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self.repr, Repr::NonFinite(f) if f.is_infinite())
    }

    pub fn is_finite(&self) -> bool {
        matches!(self.repr, Repr::Decimal(_))
    }

    pub fn is_integer(&self) -> bool {
        match &self.repr {
            Repr::Decimal(d) => *d == d.clone().floor(),
            Repr::NonFinite(_) => false,
        }
    }

    // ========== Basic Arithmetic ==========

    pub fn add(&self, other: &Self) -> Self {
        match (&self.repr, &other.repr) {
            (Repr::Decimal(a), Repr::Decimal(b)) => Self::decimal(a + b),
            _ => Self::float(self.to_f64_lossy() + other.to_f64_lossy()),
        }
    }

    pub fn sub(&self, other: &Self) -> Self {
        match (&self.repr, &other.repr) {
            (Repr::Decimal(a), Repr::Decimal(b)) => Self::decimal(a - b),
            _ => Self::float(self.to_f64_lossy() - other.to_f64_lossy()),
        }
    }

    pub fn mul(&self, other: &Self) -> Self {
        match (&self.repr, &other.repr) {
            (Repr::Decimal(a), Repr::Decimal(b)) => Self::decimal(a * b),
            _ => Self::float(self.to_f64_lossy() * other.to_f64_lossy()),
        }
    }

    /// Safe division (returns Result, never panics)
    pub fn checked_div(&self, other: &Self) -> Result<Self, NumberError> {
        if other.is_zero() {
            return Err(NumberError::DivisionByZero);
        }
        match (&self.repr, &other.repr) {
            (Repr::Decimal(a), Repr::Decimal(b)) => Ok(Self::decimal(a / b)),
            _ => Ok(Self::float(self.to_f64_lossy() / other.to_f64_lossy())),
        }
    }

    pub fn neg(&self) -> Self {
        match &self.repr {
            Repr::Decimal(d) => Self::decimal(-d),
            Repr::NonFinite(f) => Self { repr: Repr::NonFinite(-f) },
        }
    }

    /// Integer power by repeated squaring (exact for positive exponents)
    fn pow_int(&self, exp: i64) -> Result<Self, NumberError> {
        let mut base = self.clone();
        let mut remaining = exp.unsigned_abs();
        let mut result = Self::one();
        while remaining > 0 {
            if remaining & 1 == 1 {
                result = result.mul(&base);
            }
            base = base.mul(&base);
            remaining >>= 1;
        }
        if exp < 0 {
            Self::one().checked_div(&result)
        } else {
            Ok(result)
        }
    }

    /// Real-valued power: exact for integer exponents, `exp(y * ln(x))` otherwise
    pub fn pow_real(&self, exp: &Self) -> Result<Self, NumberError> {
        let (Repr::Decimal(base), Repr::Decimal(power)) = (&self.repr, &exp.repr) else {
            return Ok(Self::float(self.to_f64_lossy().powf(exp.to_f64_lossy())));
        };

        if exp.is_zero() {
            return Ok(Self::one());
        }
        if self.is_zero() {
            if exp.is_negative() {
                return Err(NumberError::DivisionByZero);
            }
            return Ok(Self::zero());
        }

        // ln|x^y|, checked before any work whose result exponent could leave isize
        let magnitude = if self.is_negative() { -base.clone() } else { base.clone() };
        let ln_x = magnitude.with_precision(DEFAULT_PRECISION).value().ln();
        let scaled = &ln_x * power;
        let estimate = Self::decimal(scaled.clone()).to_f64_lossy();
        if estimate > MAX_LN_MAGNITUDE {
            return Err(NumberError::DomainError("power result out of range".to_string()));
        }
        if estimate < -MAX_LN_MAGNITUDE {
            return Ok(Self::zero());
        }

        if let Some(e) = exp.to_i64().filter(|e| e.abs() <= MAX_EXACT_EXPONENT) {
            return self.pow_int(e);
        }
        if self.is_negative() {
            return Err(NumberError::DomainError(
                "negative base with non-integer exponent".to_string(),
            ));
        }

        Ok(Self::decimal(scaled.exp()))
    }

    // ========== Conversion ==========

    /// Try to convert to i64 (integers only)
    pub fn to_i64(&self) -> Option<i64> {
        let Repr::Decimal(d) = &self.repr else {
            return None;
        };
        if !self.is_integer() {
            return None;
        }

        // DBig stores significand * 10^exponent
        let (significand, exponent) = d.clone().into_repr().into_parts();
        let sig: i64 = significand.try_into().ok()?;
        match exponent {
            0 => Some(sig),
            1..=18 => sig.checked_mul(10_i64.checked_pow(exponent as u32)?),
            -18..=-1 => {
                let divisor = 10_i64.checked_pow((-exponent) as u32)?;
                (sig % divisor == 0).then_some(sig / divisor)
            }
            _ => None,
        }
    }

    /// Convert to f64; `None` when a finite decimal falls outside the f64 range
    pub fn to_f64(&self) -> Option<f64> {
        let d = match &self.repr {
            Repr::NonFinite(f) => return Some(*f),
            Repr::Decimal(d) => d,
        };

        let (significand, exponent) = d.clone().into_repr().into_parts();

        let sig_f64: f64 = if significand.bit_len() <= 53 {
            let small: i64 = significand.try_into().ok()?;
            small as f64
        } else {
            // Keep the top 53 bits and scale back up
            let extra_bits = significand.bit_len() - 53;
            let shifted: i64 = (&significand >> extra_bits).try_into().ok()?;
            shifted as f64 * 2_f64.powi(extra_bits as i32)
        };

        let result = match exponent {
            0 => sig_f64,
            1..=308 => sig_f64 * 10_f64.powi(exponent as i32),
            -308..=-1 => sig_f64 / 10_f64.powi((-exponent) as i32),
            _ => return None,
        };

        result.is_finite().then_some(result)
    }

    /// f64 view used for non-finite arithmetic; out-of-range decimals saturate to ±inf
    fn to_f64_lossy(&self) -> f64 {
        self.to_f64().unwrap_or(if self.is_negative() { f64::NEG_INFINITY } else { f64::INFINITY })
    }
}

// ========== Trait Implementations ==========

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::NonFinite(v) if v.is_nan() => write!(f, "NaN"),
            Repr::NonFinite(v) if *v > 0.0 => write!(f, "Infinity"),
            Repr::NonFinite(_) => write!(f, "-Infinity"),
            Repr::Decimal(d) => {
                if let Some(i) = self.to_i64() {
                    write!(f, "{}", i)
                } else if let Some(v) = self.to_f64() {
                    write!(f, "{}", v)
                } else {
                    write!(f, "{}", d)
                }
            }
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (&self.repr, &other.repr) {
            (Repr::Decimal(a), Repr::Decimal(b)) => a == b,
            _ => self.to_f64_lossy() == other.to_f64_lossy(),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (&self.repr, &other.repr) {
            (Repr::Decimal(a), Repr::Decimal(b)) => a.partial_cmp(b),
            _ => self.to_f64_lossy().partial_cmp(&other.to_f64_lossy()),
        }
    }
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Self::from_i64(n)
    }
}

impl From<f64> for Number {
    fn from(f: f64) -> Self {
        Self::from_f64(f)
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match (self.to_i64(), self.to_f64()) {
            (Some(i), _) => serializer.serialize_i64(i),
            (None, Some(f)) if f.is_finite() => serializer.serialize_f64(f),
            _ => serializer.serialize_str(&self.to_string()),
        }
    }
}

struct NumberVisitor;

impl<'de> Visitor<'de> for NumberVisitor {
    type Value = Number;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number or numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Number, E> {
        Ok(Number::from_i64(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Number, E> {
        Ok(match i64::try_from(v) {
            Ok(i) => Number::from_i64(i),
            Err(_) => Number::from_f64(v as f64),
        })
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Number, E> {
        Ok(Number::from_f64(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Number, E> {
        match v {
            "Infinity" => Ok(Number::infinity(false)),
            "-Infinity" => Ok(Number::infinity(true)),
            _ => Number::from_str(v).map_err(E::custom),
        }
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NumberVisitor)
    }
}
