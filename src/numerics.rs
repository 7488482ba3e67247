use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

/// There are 53 bits of mantissa in an IEEE 754 double precision float.
const MOST_POSITIVE_EXACT_FLOAT: i64 = 1 << 53;

/// A numeric constant. Integer tokens stay integers; anything else that
/// parses as a float becomes a float. Mixed comparisons treat `2` and `2.0`
/// as the same value, which is what unification and the comparison builtins
/// rely on.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub enum Numeric {
    Integer(i64),
    Float(f64),
}

impl Numeric {
    /// Recognize a numeric token. Integers win over floats so that `3`
    /// keeps its exact representation; `3.5`, `-2e3` and friends fall
    /// through to float parsing.
    pub fn parse(token: &str) -> Option<Self> {
        if let Ok(i) = token.parse::<i64>() {
            return Some(Self::Integer(i));
        }
        token.parse::<f64>().ok().map(Self::Float)
    }
}

impl Add for Numeric {
    type Output = Option<Self>;

    fn add(self, other: Self) -> Option<Self> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a.checked_add(b).map(Self::Integer),
            (Self::Integer(a), Self::Float(b)) => Some(Self::Float(a as f64 + b)),
            (Self::Float(a), Self::Integer(b)) => Some(Self::Float(a + b as f64)),
            (Self::Float(a), Self::Float(b)) => Some(Self::Float(a + b)),
        }
    }
}

impl Sub for Numeric {
    type Output = Option<Self>;

    fn sub(self, other: Self) -> Option<Self> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a.checked_sub(b).map(Self::Integer),
            (Self::Integer(a), Self::Float(b)) => Some(Self::Float(a as f64 - b)),
            (Self::Float(a), Self::Integer(b)) => Some(Self::Float(a - b as f64)),
            (Self::Float(a), Self::Float(b)) => Some(Self::Float(a - b)),
        }
    }
}

impl Mul for Numeric {
    type Output = Option<Self>;

    fn mul(self, other: Self) -> Option<Self> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a.checked_mul(b).map(Self::Integer),
            (Self::Integer(a), Self::Float(b)) => Some(Self::Float(a as f64 * b)),
            (Self::Float(a), Self::Integer(b)) => Some(Self::Float(a * b as f64)),
            (Self::Float(a), Self::Float(b)) => Some(Self::Float(a * b)),
        }
    }
}

impl Div for Numeric {
    type Output = Option<Self>;

    fn div(self, other: Self) -> Option<Self> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(Self::Float(a as f64 / b as f64)),
            (Self::Integer(a), Self::Float(b)) => Some(Self::Float(a as f64 / b)),
            (Self::Float(a), Self::Integer(b)) => Some(Self::Float(a / b as f64)),
            (Self::Float(a), Self::Float(b)) => Some(Self::Float(a / b)),
        }
    }
}

impl PartialEq for Numeric {
    fn eq(&self, other: &Self) -> bool {
        matches!(self.partial_cmp(other), Some(Ordering::Equal))
    }
}

impl Eq for Numeric {}

impl Hash for Numeric {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        match self {
            Self::Integer(i) => *i as u64,
            Self::Float(f) => f.to_bits(),
        }
        .hash(state)
    }
}

impl PartialOrd for Numeric {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        // Comparing an integer `i` against a float `f` is exact only while
        // `i` fits in the mantissa; beyond that the integer is compared
        // against the float's integral part.
        let partial_cmp = |i: i64, f: f64| {
            if f.is_nan() {
                None
            } else if -MOST_POSITIVE_EXACT_FLOAT < i && i < MOST_POSITIVE_EXACT_FLOAT {
                (i as f64).partial_cmp(&f)
            } else if f >= -(i64::MIN as f64) {
                Some(Ordering::Less)
            } else if f < (i64::MIN as f64) {
                Some(Ordering::Greater)
            } else {
                i.partial_cmp(&(f as i64))
            }
        };
        match (*self, *other) {
            (Self::Integer(left), Self::Integer(right)) => left.partial_cmp(&right),
            (Self::Integer(i), Self::Float(f)) => partial_cmp(i, f),
            (Self::Float(f), Self::Integer(i)) => partial_cmp(i, f).map(Ordering::reverse),
            (Self::Float(left), Self::Float(right)) => left.partial_cmp(&right),
        }
    }
}

impl From<i64> for Numeric {
    fn from(other: i64) -> Self {
        Self::Integer(other)
    }
}

impl From<f64> for Numeric {
    fn from(other: f64) -> Self {
        Self::Float(other)
    }
}
