//! Symmetric alpha-stable noise.
//!
//! Heavy-tailed noise with stability exponent `1 < alpha < 2` and scale
//! `gamma`, sitting between Cauchy (`alpha = 1`) and Gaussian (`alpha = 2`)
//! noise. Samples come from the Chambers-Mallows-Stuck transform. The density
//! has no closed form, so it is tabulated once per `alpha` on a grid that is
//! uniform in `atan(x)`, which covers the whole half-line with a few thousand
//! points, and linearly interpolated afterwards.

pub mod pdf;

use crate::cs::error::{Error, Result};
use log::debug;
use rand::Rng;
use rand_distr::{Distribution, Exp1, Uniform};
use rayon::prelude::*;
use std::f64::consts::FRAC_PI_2;

/// Default number of table points
pub const TABLE_LEN: usize = 2000;
/// Lower bound returned by [`AlphaStableNoise::density`]
pub const DENSITY_FLOOR: f64 = 1e-100;
/// Lower bound returned by [`AlphaStableNoise::log_density`]
pub const LOG_DENSITY_FLOOR: f64 = -100.0;

/// The last grid point stays just short of `pi / 2` where `tan` diverges
const WARP_LIMIT: f64 = 0.999_999_9 * FRAC_PI_2;

/// Tabulated symmetric alpha-stable law.
///
/// Read-only after construction; share it between threads behind an `Arc`.
#[derive(Debug, Clone)]
pub struct AlphaStableNoise {
    alpha: f64,
    /// Grid spacing in the warped domain
    step: f64,
    density: Vec<f64>,
    log_density: Vec<f64>,
}

impl AlphaStableNoise {
    /// Build the tables for exponent `alpha`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Range`] unless `1 < alpha < 2`.
    pub fn new(alpha: f64) -> Result<Self> {
        Self::with_table_len(alpha, TABLE_LEN)
    }

    /// Build the tables with `len` grid points.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Range`] unless `1 < alpha < 2`, and
    /// [`Error::InvalidInput`] for fewer than 3 grid points.
    pub fn with_table_len(alpha: f64, len: usize) -> Result<Self> {
        if !(alpha > 1.0 && alpha < 2.0) {
            return Err(Error::Range(format!(
                "alpha must lie strictly between 1 and 2, got {}",
                alpha
            )));
        }
        if len < 3 {
            return Err(Error::InvalidInput(format!(
                "density table needs at least 3 points, got {}",
                len
            )));
        }

        let step = WARP_LIMIT / (len - 1) as f64;
        let (density, log_density): (Vec<f64>, Vec<f64>) = (0..len)
            .into_par_iter()
            .map(|i| {
                let p = pdf::standard_density((i as f64 * step).tan(), alpha);
                let p = p.max(f64::MIN_POSITIVE);
                (p, p.ln())
            })
            .unzip();
        debug!(
            "alpha-stable table: alpha {}, {} points, f(0) = {:.6}",
            alpha, len, density[0]
        );

        Ok(AlphaStableNoise {
            alpha,
            step,
            density,
            log_density,
        })
    }

    /// Stability exponent
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Number of grid points
    pub fn table_len(&self) -> usize {
        self.density.len()
    }

    /// Draw `count` variates with scale `gamma`
    pub fn samples<R: Rng + ?Sized>(&self, rng: &mut R, gamma: f64, count: usize) -> Vec<f64> {
        (0..count).map(|_| gamma * self.sample(rng)).collect()
    }

    /// Interpolated density at `x` for scale `gamma`, floored at [`DENSITY_FLOOR`].
    ///
    /// A scale that is not strictly positive describes no density and
    /// yields the floor.
    pub fn density(&self, x: f64, gamma: f64) -> f64 {
        if !(gamma > 0.0) {
            return DENSITY_FLOOR;
        }
        let (i, frac) = self.locate(x, gamma);
        let p = self.density[i] * (1.0 - frac) + self.density[i + 1] * frac;
        (p / gamma).max(DENSITY_FLOOR)
    }

    /// Interpolated log-density at `x` for scale `gamma`, floored at
    /// [`LOG_DENSITY_FLOOR`]. Non-positive scales yield the floor.
    pub fn log_density(&self, x: f64, gamma: f64) -> f64 {
        if !(gamma > 0.0) {
            return LOG_DENSITY_FLOOR;
        }
        let (i, frac) = self.locate(x, gamma);
        let p = self.log_density[i] * (1.0 - frac) + self.log_density[i + 1] * frac;
        (p - gamma.ln()).max(LOG_DENSITY_FLOOR)
    }

    /// Bracketing table index and interpolation weight for `|x| / gamma`, `gamma > 0`
    fn locate(&self, x: f64, gamma: f64) -> (usize, f64) {
        let last = (self.density.len() - 1) as f64;
        let t = ((x.abs() / gamma).atan() / self.step).min(last);
        let i = (t as usize).min(self.density.len() - 2);
        (i, t - i as f64)
    }
}

/// Standard variates (`gamma = 1`) by the Chambers-Mallows-Stuck method
impl Distribution<f64> for AlphaStableNoise {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let alpha = self.alpha;
        let phi = Uniform::new(-FRAC_PI_2, FRAC_PI_2).sample(rng);
        let w: f64 = Exp1.sample(rng);
        (alpha * phi).sin() / phi.cos().powf(1.0 / alpha)
            * (((1.0 - alpha) * phi).cos() / w).powf((1.0 - alpha) / alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_alpha_range() {
        for alpha in [1.0, 2.0, 0.5, 2.5, f64::NAN] {
            assert!(matches!(AlphaStableNoise::new(alpha), Err(Error::Range(_))));
        }
        assert!(matches!(
            AlphaStableNoise::with_table_len(1.5, 2),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_log_density_matches_density() {
        for alpha in [1.2, 1.6, 1.9] {
            let noise = AlphaStableNoise::new(alpha).unwrap();
            for i in 0..=200 {
                let x = -10.0 + 0.1 * i as f64;
                assert_relative_eq!(
                    noise.density(x, 1.0).ln(),
                    noise.log_density(x, 1.0),
                    epsilon = 1e-3
                );
            }
        }
    }

    #[test]
    fn test_table_matches_exact_density() {
        let noise = AlphaStableNoise::new(1.6).unwrap();
        for x in [0.0, 0.3, 1.0, 2.7, 8.0, 20.0] {
            assert_relative_eq!(
                noise.density(x, 1.0),
                pdf::standard_density(x, 1.6),
                max_relative = 1e-3
            );
        }
    }

    #[test]
    fn test_scale() {
        let noise = AlphaStableNoise::new(1.5).unwrap();
        let gamma: f64 = 0.25;
        // grid points are exact, so compare at one
        let x = (10.0 * noise.step).tan();
        assert_relative_eq!(
            noise.density(gamma * x, gamma),
            noise.density[10] / gamma,
            max_relative = 1e-9
        );
        assert_relative_eq!(
            noise.log_density(gamma * x, gamma),
            noise.log_density[10] - gamma.ln(),
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_floors_and_symmetry() {
        let noise = AlphaStableNoise::new(1.3).unwrap();

        assert_eq!(noise.density(3.0, 1.0), noise.density(-3.0, 1.0));
        assert!(noise.density(1e300, 1e-300) >= DENSITY_FLOOR);
        assert!(noise.log_density(1e300, 1e-300) >= LOG_DENSITY_FLOOR);
        assert!(noise.density(f64::INFINITY, 1.0).is_finite());
        assert!(noise.log_density(f64::INFINITY, 1.0).is_finite());
    }

    #[test]
    fn test_non_positive_scale_yields_floors() {
        let noise = AlphaStableNoise::new(1.4).unwrap();
        for gamma in [0.0, -1.0, f64::NAN] {
            assert_eq!(noise.density(0.0, gamma), DENSITY_FLOOR);
            assert_eq!(noise.density(2.0, gamma), DENSITY_FLOOR);
            assert_eq!(noise.log_density(0.0, gamma), LOG_DENSITY_FLOOR);
            assert_eq!(noise.log_density(2.0, gamma), LOG_DENSITY_FLOOR);
        }
    }

    /// `P(|X| < 1)` for a standard variate, by the trapezoid rule
    fn central_probability(alpha: f64) -> f64 {
        let n = 1000;
        let h = 1.0 / n as f64;
        2.0 * (0..n)
            .map(|i| {
                let (a, b) = (i as f64 * h, (i + 1) as f64 * h);
                0.5 * h * (pdf::standard_density(a, alpha) + pdf::standard_density(b, alpha))
            })
            .sum::<f64>()
    }

    #[test]
    fn test_sample_statistics() {
        let noise = AlphaStableNoise::new(1.5).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let gamma = 2.0;
        let samples = noise.samples(&mut rng, gamma, 200_000);

        assert_eq!(samples.len(), 200_000);
        assert!(samples.iter().all(|s| s.is_finite()));

        let negative = samples.iter().filter(|&&s| s < 0.0).count() as f64;
        assert!((negative / 200_000.0 - 0.5).abs() < 0.01);

        // scaling by gamma maps P(|X| < 1) onto P(|X| < gamma)
        let inside = samples.iter().filter(|s| s.abs() < gamma).count() as f64 / 200_000.0;
        assert!((inside - central_probability(1.5)).abs() < 0.01);
    }

    #[test]
    fn test_samples_follow_density() {
        let noise = AlphaStableNoise::new(1.7).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let samples = noise.samples(&mut rng, 1.0, 100_000);

        let observed = samples.iter().filter(|s| s.abs() < 1.0).count() as f64 / 100_000.0;
        assert!((observed - central_probability(1.7)).abs() < 0.01);
    }
}
