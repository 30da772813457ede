//! Exact rational time.
//!
//! Clip durations, timeline offsets and output presentation times are kept as
//! reduced fractions of a second so that comparisons at cut points (for example
//! `89/30` against `3 - 1/30`) never depend on float rounding.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

/// Output frame rate of every export, in frames per second
pub const OUTPUT_FPS: i64 = 30;

/// A reduced fraction `num / den` with `den > 0`
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    num: i64,
    den: i64,
}

impl Rational {
    /// Create a new rational number, normalized and reduced.
    ///
    /// # Panics
    ///
    /// Panics if `den` is zero.
    pub fn new(num: i64, den: i64) -> Self {
        assert!(den != 0, "Denominator cannot be zero");
        let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
        if num == 0 {
            return Self { num: 0, den: 1 };
        }
        let g = gcd(num.unsigned_abs(), den.unsigned_abs()) as i64;
        Self {
            num: num / g,
            den: den / g,
        }
    }

    pub const fn zero() -> Self {
        Self { num: 0, den: 1 }
    }

    pub const fn from_int(n: i64) -> Self {
        Self { num: n, den: 1 }
    }

    pub fn num(&self) -> i64 {
        self.num
    }

    pub fn den(&self) -> i64 {
        self.den
    }

    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    pub fn is_negative(&self) -> bool {
        self.num < 0
    }

    pub fn to_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Largest integer `<= self`
    pub fn floor(&self) -> i64 {
        self.num.div_euclid(self.den)
    }

    /// Smallest integer `>= self`
    pub fn ceil(&self) -> i64 {
        -(-self.num).div_euclid(self.den)
    }

    /// Nearest integer, halves rounded away from zero
    pub fn round(&self) -> i64 {
        let num = self.num as i128;
        let den = self.den as i128;
        let magnitude = ((2 * num.abs() + den).div_euclid(2 * den)) as i64;
        if num >= 0 {
            magnitude
        } else {
            -magnitude
        }
    }

    /// `1 / self`
    ///
    /// # Panics
    ///
    /// Panics if `self` is zero.
    pub fn recip(&self) -> Self {
        Rational::new(self.den, self.num)
    }

    /// Presentation time of frame `index` at `fps` frames per second
    pub fn frame_time(index: i64, fps: Rational) -> Self {
        Rational::from_int(index) / fps
    }

    /// Number of whole frames this duration spans at `fps`, rounded to nearest
    pub fn frames_at(&self, fps: Rational) -> i64 {
        (*self * fps).round()
    }

    pub fn max(self, other: Self) -> Self {
        if self >= other {
            self
        } else {
            other
        }
    }

    /// Parse ffprobe-style values: `"30000/1001"`, `"25"`, `"3.000000"`.
    ///
    /// Decimal strings are taken exactly up to six fractional digits, which is
    /// what ffprobe prints.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        if let Some((num, den)) = text.split_once('/') {
            let num: i64 = num.trim().parse().ok()?;
            let den: i64 = den.trim().parse().ok()?;
            if den == 0 {
                return None;
            }
            return Some(Rational::new(num, den));
        }

        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() && frac.is_empty() {
            return None;
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let frac = &frac[..frac.len().min(6)];
        let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let scale = 10i64.pow(frac.len() as u32);
        let frac_value: i64 = if frac.is_empty() { 0 } else { frac.parse().ok()? };

        let num = whole.checked_mul(scale)?.checked_add(frac_value)?;
        let num = if negative { -num } else { num };
        Some(Rational::new(num, scale))
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Debug for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rational({}/{})", self.num, self.den)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.to_f64())
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.num as i128 * other.den as i128;
        let rhs = other.num as i128 * self.den as i128;
        lhs.cmp(&rhs)
    }
}

impl Rational {
    /// `self + rhs`, or `None` if the reduced result does not fit in `i64`
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        reduce_wide(
            self.num as i128 * rhs.den as i128 + rhs.num as i128 * self.den as i128,
            self.den as i128 * rhs.den as i128,
        )
    }

    /// `self - rhs`, or `None` if the reduced result does not fit in `i64`
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        reduce_wide(
            self.num as i128 * rhs.den as i128 - rhs.num as i128 * self.den as i128,
            self.den as i128 * rhs.den as i128,
        )
    }

    /// `self * rhs`, or `None` if the reduced result does not fit in `i64`
    pub fn checked_mul(self, rhs: Self) -> Option<Self> {
        reduce_wide(
            self.num as i128 * rhs.num as i128,
            self.den as i128 * rhs.den as i128,
        )
    }

    /// `self / rhs`, or `None` if `rhs` is zero or the result does not fit
    pub fn checked_div(self, rhs: Self) -> Option<Self> {
        if rhs.num == 0 {
            return None;
        }
        reduce_wide(
            self.num as i128 * rhs.den as i128,
            self.den as i128 * rhs.num as i128,
        )
    }
}

// Operators panic on overflow; values from untrusted input go through `checked_*`

impl Add for Rational {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.checked_add(rhs).unwrap_or_else(|| overflow("+", self, rhs))
    }
}

impl Sub for Rational {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.checked_sub(rhs).unwrap_or_else(|| overflow("-", self, rhs))
    }
}

impl Mul for Rational {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.checked_mul(rhs).unwrap_or_else(|| overflow("*", self, rhs))
    }
}

impl Div for Rational {
    type Output = Self;

    /// # Panics
    ///
    /// Panics when dividing by zero.
    fn div(self, rhs: Self) -> Self {
        assert!(rhs.num != 0, "Division by zero");
        self.checked_div(rhs).unwrap_or_else(|| overflow("/", self, rhs))
    }
}

fn overflow(op: &str, lhs: Rational, rhs: Rational) -> ! {
    panic!("Rational overflow: {:?} {} {:?}", lhs, op, rhs)
}

/// Reduce in 128-bit space, then narrow only if both parts fit
fn reduce_wide(num: i128, den: i128) -> Option<Rational> {
    let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
    if num == 0 {
        return Some(Rational::zero());
    }
    let g = gcd_wide(num.unsigned_abs(), den.unsigned_abs()) as i128;
    Some(Rational {
        num: i64::try_from(num / g).ok()?,
        den: i64::try_from(den / g).ok()?,
    })
}

fn gcd_wide(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_reduces_and_normalizes_sign() {
        let r = Rational::new(6, -4);
        assert_eq!(r.num(), -3);
        assert_eq!(r.den(), 2);
        assert_eq!(Rational::new(0, -7), Rational::zero());
    }

    #[test]
    fn test_floor_ceil_round() {
        let r = Rational::new(7, 2);
        assert_eq!(r.floor(), 3);
        assert_eq!(r.ceil(), 4);
        assert_eq!(r.round(), 4);

        let n = Rational::new(-7, 2);
        assert_eq!(n.floor(), -4);
        assert_eq!(n.ceil(), -3);
        assert_eq!(n.round(), -4);

        assert_eq!(Rational::new(10, 3).round(), 3);
        assert_eq!(Rational::from_int(5).ceil(), 5);
    }

    #[test]
    fn test_cut_comparison_is_exact() {
        let fps = Rational::from_int(OUTPUT_FPS);
        let frame_89 = Rational::frame_time(89, fps);
        let threshold = Rational::from_int(3) - fps.recip();
        assert_eq!(frame_89, threshold);
        assert!(Rational::frame_time(90, fps) > threshold);
    }

    #[test]
    fn test_parse_ffprobe_values() {
        assert_eq!(Rational::parse("30000/1001"), Some(Rational::new(30000, 1001)));
        assert_eq!(Rational::parse("25"), Some(Rational::from_int(25)));
        assert_eq!(Rational::parse("3.000000"), Some(Rational::from_int(3)));
        assert_eq!(Rational::parse("2.5"), Some(Rational::new(5, 2)));
        assert_eq!(Rational::parse("0/0"), None);
        assert_eq!(Rational::parse("N/A"), None);
        assert_eq!(Rational::parse(""), None);
    }

    #[test]
    fn test_checked_ops_refuse_to_narrow() {
        let a = Rational::new(1, 4_000_000_007);
        let b = Rational::new(1, 4_000_000_009);
        assert_eq!(a.checked_mul(b), None);
        assert_eq!(a.checked_add(b), None);
        assert_eq!(a.checked_sub(b), None);
        assert_eq!(a.checked_div(Rational::zero()), None);

        // Large intermediates that reduce back into range are fine
        let c = Rational::new(4_000_000_007, 3);
        assert_eq!(a.checked_mul(c), Some(Rational::new(1, 3)));
        assert!(a.checked_add(a).unwrap().den() > 0);
    }

    #[test]
    #[should_panic(expected = "Rational overflow")]
    fn test_operator_overflow_panics() {
        let _ = Rational::new(1, 4_000_000_007) * Rational::new(1, 4_000_000_009);
    }

    #[test]
    fn test_round_near_i64_limit() {
        let r = Rational::new(i64::MAX, 2);
        assert_eq!(r.round(), i64::MAX / 2 + 1);
    }

    #[test]
    fn test_frames_at() {
        let fps = Rational::from_int(30);
        assert_eq!(Rational::from_int(8).frames_at(fps), 240);
        assert_eq!(Rational::new(3001, 1000).frames_at(fps), 90);
    }
}
