//! Uniform random-variate source consumed by the proposal kernels.

use rand::RngExt;
use rand::rngs::StdRng;

/// Source of uniform variates.
///
/// Implemented for the crate's seeded [`StdRng`]; tests substitute scripted
/// sources to force particular draws.
pub trait RandomSource {
    /// Uniform variate on `[0, 1)`.
    fn uniform(&mut self) -> f64;

    /// Uniform variate on `[low, high)`.
    fn uniform_range(&mut self, low: f64, high: f64) -> f64 {
        (high - low).mul_add(self.uniform(), low)
    }
}

impl RandomSource for StdRng {
    fn uniform(&mut self) -> f64 {
        self.random::<f64>()
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn uniform(&mut self) -> f64 {
        (**self).uniform()
    }

    fn uniform_range(&mut self, low: f64, high: f64) -> f64 {
        (**self).uniform_range(low, high)
    }
}
