//! Bonding-curve NAV formulas.
//!
//! The six curve shapes named by the tranche registry, plus the hand-rolled
//! fixed-point `ln`/`exp` they're built from. Kept in its own module (rather
//! than folded into `math.rs`) because it's the one place in the arithmetic
//! core doing more than add/sub/mul/div — still entirely on `math::Fp`,
//! never on `f32`/`f64`.

use crate::math::{fp_div, fp_mul, Fp, FP_SCALE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveId {
    Flat,
    Linear,
    Logarithmic,
    Sigmoid,
    Quadratic,
    CappedExponential,
}

impl CurveId {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Flat),
            1 => Some(Self::Linear),
            2 => Some(Self::Logarithmic),
            3 => Some(Self::Sigmoid),
            4 => Some(Self::Quadratic),
            5 => Some(Self::CappedExponential),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::Flat => 0,
            Self::Linear => 1,
            Self::Logarithmic => 2,
            Self::Sigmoid => 3,
            Self::Quadratic => 4,
            Self::CappedExponential => 5,
        }
    }
}

const SECONDS_PER_YEAR: i64 = 31_536_000;

/// `ln(2)`, scaled.
const LN2_FP: Fp = 693_147_181;
/// `1 / ln(2)`, scaled — used to turn `exp` into `exp2`.
const INV_LN2_FP: Fp = 1_442_695_041;

/// `2^(2^-(i+1))` for `i` in `0..20`, scaled by `FP_SCALE`. Used by
/// `fp_exp2`'s repeated-doubling expansion of the fractional part.
const EXP2_TABLE: [Fp; 20] = [
    1_414_213_562,
    1_189_207_115,
    1_090_507_733,
    1_044_273_782,
    1_021_897_149,
    1_010_889_286,
    1_005_429_901,
    1_002_711_276,
    1_001_354_213,
    1_000_677_008,
    1_000_338_338,
    1_000_169_144,
    1_000_084_566,
    1_000_042_282,
    1_000_021_141,
    1_000_010_570,
    1_000_005_285,
    1_000_002_642,
    1_000_001_321,
    1_000_000_661,
];

/// `log2(x)` for `x > 0` scaled by `FP_SCALE`, via normalize-then-square.
/// Standard bit-by-bit binary logarithm algorithm, accurate to roughly the
/// table's 20 bits (~1e-6 relative).
fn fp_log2(x: Fp) -> Option<Fp> {
    if x <= 0 {
        return None;
    }
    let mut m = x;
    let mut n: Fp = 0;
    while m >= 2 * FP_SCALE {
        m /= 2;
        n += FP_SCALE;
    }
    while m < FP_SCALE {
        m *= 2;
        n -= FP_SCALE;
    }
    let mut frac: Fp = 0;
    let mut bit = FP_SCALE / 2;
    let mut y = m;
    for _ in 0..20 {
        y = fp_mul(y, y)?;
        if y >= 2 * FP_SCALE {
            y /= 2;
            frac += bit;
        }
        bit /= 2;
    }
    Some(n + frac)
}

/// `ln(x)` for `x > 0`, scaled.
fn fp_ln(x: Fp) -> Option<Fp> {
    fp_mul(fp_log2(x)?, LN2_FP)
}

/// `2^x` for any `x` (positive or negative), scaled.
fn fp_exp2(x: Fp) -> Option<Fp> {
    let k = x.div_euclid(FP_SCALE);
    let frac = x.rem_euclid(FP_SCALE);
    let mut result = FP_SCALE;
    let mut remaining = frac;
    let mut bit = FP_SCALE / 2;
    for table_val in EXP2_TABLE.iter() {
        if remaining >= bit {
            result = fp_mul(result, *table_val)?;
            remaining -= bit;
        }
        bit /= 2;
    }
    if k >= 0 {
        if k > 100 {
            return None;
        }
        result.checked_mul(1i128.checked_shl(k as u32)?)
    } else {
        let shift = (-k).min(100) as u32;
        Some(result / (1i128 << shift))
    }
}

/// `exp(x)` for any `x`, scaled, via `2^(x / ln 2)`.
fn fp_exp(x: Fp) -> Option<Fp> {
    fp_exp2(fp_mul(x, INV_LN2_FP)?)
}

/// Elapsed time since tranche inception, in years, scaled.
fn years_elapsed_fp(elapsed_secs: i64) -> Fp {
    (elapsed_secs as i128 * FP_SCALE) / SECONDS_PER_YEAR as i128
}

/// Instantaneous curve value (nominal NAV multiplier) at `elapsed_secs`
/// since a tranche's inception, for the given curve shape and its ceiling
/// APY. This is the "expected trajectory" factor; `math::nav_per_share`
/// multiplies it by the actual capital/yield ratio.
pub fn curve_nav_fp(curve_id: CurveId, apy_max_bps: u16, elapsed_secs: i64) -> Option<Fp> {
    let t = years_elapsed_fp(elapsed_secs.max(0));
    let a = (apy_max_bps as i128 * FP_SCALE) / 10_000;

    match curve_id {
        CurveId::Flat => Some(FP_SCALE),
        CurveId::Linear => Some(FP_SCALE + fp_mul(a, t)?),
        CurveId::Quadratic => Some(FP_SCALE + fp_mul(a, fp_mul(t, t)?)?),
        CurveId::Logarithmic => {
            let ln_term = fp_ln(FP_SCALE + t)?;
            Some(FP_SCALE + fp_mul(a, ln_term)?)
        }
        CurveId::Sigmoid => {
            // 1 + a_max / (1 + exp(-k*(t - t0))), k = 5, t0 = 0.5 years.
            const K: Fp = 5 * FP_SCALE;
            const T0: Fp = FP_SCALE / 2;
            let exponent = fp_mul(-K, t - T0)?;
            let denom = FP_SCALE + fp_exp(exponent)?;
            Some(FP_SCALE + fp_div(a, denom)?)
        }
        CurveId::CappedExponential => {
            const CAP: Fp = 1_250_000_000;
            let growth = fp_exp(t)? - FP_SCALE;
            let uncapped = FP_SCALE + fp_mul(a, growth)?;
            Some(uncapped.min(CAP))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_curve_is_always_one() {
        assert_eq!(curve_nav_fp(CurveId::Flat, 500, 0), Some(FP_SCALE));
        assert_eq!(
            curve_nav_fp(CurveId::Flat, 500, 10 * SECONDS_PER_YEAR),
            Some(FP_SCALE)
        );
    }

    #[test]
    fn test_linear_curve_at_inception_is_one() {
        assert_eq!(curve_nav_fp(CurveId::Linear, 800, 0), Some(FP_SCALE));
    }

    #[test]
    fn test_linear_curve_grows_with_time() {
        let at_zero = curve_nav_fp(CurveId::Linear, 800, 0).unwrap();
        let at_one_year = curve_nav_fp(CurveId::Linear, 800, SECONDS_PER_YEAR).unwrap();
        assert!(at_one_year > at_zero);
    }

    #[test]
    fn test_quadratic_curve_at_inception_is_one() {
        assert_eq!(curve_nav_fp(CurveId::Quadratic, 800, 0), Some(FP_SCALE));
    }

    #[test]
    fn test_logarithmic_curve_at_inception_is_one() {
        assert_eq!(curve_nav_fp(CurveId::Logarithmic, 800, 0), Some(FP_SCALE));
    }

    #[test]
    fn test_logarithmic_curve_grows_slower_than_linear() {
        let log_val = curve_nav_fp(CurveId::Logarithmic, 800, 4 * SECONDS_PER_YEAR).unwrap();
        let lin_val = curve_nav_fp(CurveId::Linear, 800, 4 * SECONDS_PER_YEAR).unwrap();
        assert!(log_val < lin_val);
    }

    #[test]
    fn test_capped_exponential_respects_cap() {
        let far_future = curve_nav_fp(CurveId::CappedExponential, 2_000, 50 * SECONDS_PER_YEAR)
            .unwrap();
        assert!(far_future <= 1_250_000_000);
    }

    #[test]
    fn test_fp_log2_of_one_is_zero() {
        assert_eq!(fp_log2(FP_SCALE), Some(0));
    }

    #[test]
    fn test_fp_log2_of_two_is_one() {
        let result = fp_log2(2 * FP_SCALE).unwrap();
        assert!((result - FP_SCALE).abs() < 1_000);
    }

    #[test]
    fn test_fp_exp2_of_zero_is_one() {
        assert_eq!(fp_exp2(0), Some(FP_SCALE));
    }

    #[test]
    fn test_fp_exp2_of_one_is_two() {
        let result = fp_exp2(FP_SCALE).unwrap();
        assert!((result - 2 * FP_SCALE).abs() < 1_000);
    }

    #[test]
    fn test_fp_exp2_negative_one_is_half() {
        let result = fp_exp2(-FP_SCALE).unwrap();
        assert!((result - FP_SCALE / 2).abs() < 1_000);
    }

    #[test]
    fn test_curve_id_round_trip() {
        for v in 0u8..=5 {
            let curve = CurveId::from_u8(v).unwrap();
            assert_eq!(curve.to_u8(), v);
        }
        assert_eq!(CurveId::from_u8(6), None);
    }
}
