//! money.rs
//!
//! Денежная величина с фиксированной точностью. Хранится как целое число
//! минимальных единиц (копейки/центы), поэтому сумма любого количества цен
//! совпадает с точной десятичной суммой: никакого `f64` и накопленной ошибки.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Количество знаков после запятой.
pub const SCALE: u32 = 2;

const MINOR_PER_MAJOR: i64 = 10_i64.pow(SCALE);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyParseError {
    #[error("empty amount")]
    Empty,
    #[error("invalid amount: {0}")]
    Invalid(String),
    #[error("amount has more than two fractional digits: {0}")]
    TooPrecise(String),
    #[error("amount out of range: {0}")]
    Overflow(String),
}

impl Money {
    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn from_minor(minor_units: i64) -> Self {
        Self(minor_units)
    }

    pub const fn minor_units(&self) -> i64 {
        self.0
    }

    /// Сложение без переполнения: `None`, если сумма не помещается в `i64`.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Точная сумма последовательности цен.
    pub fn checked_sum<I>(amounts: I) -> Option<Self>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Self::zero(), |total, amount| total.checked_add(amount))
    }

    pub fn to_display_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per = MINOR_PER_MAJOR.unsigned_abs();
        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            abs / per,
            abs % per,
            width = SCALE as usize
        )
    }
}

impl FromStr for Money {
    type Err = MoneyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(MoneyParseError::Empty);
        }

        let (negative, unsigned) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (unsigned, ""),
        };

        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if int_part.is_empty() || !all_digits(int_part) || !all_digits(frac_part) {
            return Err(MoneyParseError::Invalid(raw.to_string()));
        }
        // "10." не принимаем: либо без точки, либо с цифрами после неё
        if unsigned.contains('.') && frac_part.is_empty() {
            return Err(MoneyParseError::Invalid(raw.to_string()));
        }
        if frac_part.len() > SCALE as usize {
            return Err(MoneyParseError::TooPrecise(raw.to_string()));
        }

        let overflow = || MoneyParseError::Overflow(raw.to_string());

        let major: i64 = int_part.parse().map_err(|_| overflow())?;
        let mut minor: i64 = 0;
        if !frac_part.is_empty() {
            minor = frac_part.parse().map_err(|_| overflow())?;
            // "12.5" -> 50 минимальных единиц
            let pad = SCALE - frac_part.len() as u32;
            minor *= 10_i64.pow(pad);
        }

        let units = major
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|v| v.checked_add(minor))
            .ok_or_else(overflow)?;

        Ok(Money(if negative { -units } else { units }))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
