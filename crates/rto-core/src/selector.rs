//! Thompson sampling over the arm bank.
//!
//! One Beta sample is drawn per arm; the arm with the largest sample wins.
//! The scan keeps the first arm reaching the running maximum, so ties go to
//! the lowest index. If no sample beats zero the pre-drawn random arm is
//! returned.

use rand::Rng;
use rand_distr::{Beta, Distribution};

use crate::arm_bank::{ArmBank, BetaParams};

/// Smallest Beta parameter handed to the sampler.
pub const BETA_PARAM_FLOOR: f64 = 0.01;

/// Choose an arm by Thompson sampling.
pub fn thompson_select<R: Rng + ?Sized>(bank: &ArmBank, rng: &mut R) -> usize {
    select_by(bank, rng, |params, rng| sample_beta(params, rng))
}

/// Arg-max scan with a caller-supplied per-arm sampler.
pub fn select_by<R, F>(bank: &ArmBank, rng: &mut R, mut sample: F) -> usize
where
    R: Rng + ?Sized,
    F: FnMut(BetaParams, &mut R) -> f64,
{
    debug_assert!(!bank.is_empty(), "Cannot select from an empty bank");

    let mut chosen = rng.gen_range(0..bank.len());
    let mut max_theta = 0.0;
    for (i, &params) in bank.iter().enumerate() {
        let theta = sample(params, &mut *rng);
        if theta > max_theta {
            max_theta = theta;
            chosen = i;
        }
    }
    chosen
}

/// Draw one sample from `Beta(alpha, beta)`.
///
/// Parameters are floored at `BETA_PARAM_FLOOR`; if the distribution still
/// cannot be built the posterior mean is returned.
pub fn sample_beta<R: Rng + ?Sized>(params: BetaParams, rng: &mut R) -> f64 {
    let a = params.alpha.max(BETA_PARAM_FLOOR);
    let b = params.beta.max(BETA_PARAM_FLOOR);
    match Beta::new(a, b) {
        Ok(dist) => dist.sample(rng),
        Err(_) => a / (a + b),
    }
}
