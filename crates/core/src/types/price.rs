//! Currency amounts read from loosely formatted price strings.
//!
//! Products and orders keep their price as display text (`"$1,234.56"`,
//! `"$850"`, sometimes a bare number typed into a form). Aggregation needs a
//! number, so parsing is deliberately forgiving: everything except digits and
//! `.` is dropped and anything that still fails to parse counts as zero.

use serde::{Deserialize, Serialize};

/// A non-negative currency amount in the store's single currency (USD).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(f64);

impl Price {
    /// Zero dollars.
    pub const ZERO: Self = Self(0.0);

    /// Wrap an already numeric amount. Negative and non-finite input becomes zero.
    #[must_use]
    pub fn new(amount: f64) -> Self {
        if amount.is_finite() && amount > 0.0 {
            Self(amount)
        } else {
            Self::ZERO
        }
    }

    /// Parse a price string, treating anything unparseable as zero.
    ///
    /// ```
    /// use chosen_one_core::Price;
    ///
    /// assert_eq!(Price::parse_lenient("$1,234.56").amount(), 1234.56);
    /// assert_eq!(Price::parse_lenient("call us").amount(), 0.0);
    /// assert_eq!(Price::parse_lenient("1.2.3").amount(), 0.0);
    /// ```
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        let cleaned: String = raw
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();

        cleaned.parse::<f64>().map_or(Self::ZERO, Self::new)
    }

    /// Parse an optional price field; absence is zero.
    #[must_use]
    pub fn from_field(raw: Option<&str>) -> Self {
        raw.map_or(Self::ZERO, Self::parse_lenient)
    }

    /// The numeric amount.
    #[must_use]
    pub const fn amount(self) -> f64 {
        self.0
    }

    /// Format for display with thousands separators (e.g., `"$12,400.00"`).
    #[must_use]
    pub fn display(self) -> String {
        let fixed = format!("{:.2}", self.0);
        let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, digit) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }

        format!("${grouped}.{cents}")
    }
}

impl core::ops::Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl core::iter::Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, p| acc + p)
    }
}

impl core::fmt::Display for Price {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.display())
    }
}
