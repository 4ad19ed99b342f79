//! The `random` opcode's random number generator: a uniform mode for normal
//! play and a predictable counter mode for deterministic testing/recording.

use log::debug;
use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};

enum Mode {
    Uniform,
    Predictable { period: u16, counter: u16 },
}

pub struct ZRand {
    rng: Box<dyn RngCore>,
    mode: Mode,
}

impl ZRand {
    pub fn new_uniform() -> ZRand {
        ZRand { rng: Box::new(rand::thread_rng()), mode: Mode::Uniform }
    }

    pub fn new_predictable(seed: u64, period: u16) -> ZRand {
        ZRand {
            rng: Box::new(StdRng::seed_from_u64(seed)),
            mode: Mode::Predictable { period: period.max(1), counter: 1 },
        }
    }

    /// Implements the full `random` opcode: `range == 0` switches to uniform
    /// mode and returns 0; `range < 0` switches to predictable mode with
    /// period `-range` and returns 0; `range > 0` draws the next value.
    pub fn random(&mut self, range: i16) -> u16 {
        match range.cmp(&0) {
            std::cmp::Ordering::Equal => {
                debug!("random(0): switching to uniform mode");
                self.mode = Mode::Uniform;
                0
            }
            std::cmp::Ordering::Less => {
                let period = (-range) as u16;
                debug!("random({range}): switching to predictable mode, period {period}");
                self.mode = Mode::Predictable { period, counter: 1 };
                0
            }
            std::cmp::Ordering::Greater => match &mut self.mode {
                Mode::Uniform => self.rng.gen_range(1..=range as u16),
                Mode::Predictable { period, counter } => {
                    // Predictable mode ignores the caller's range once the
                    // period has been set via a prior `random(n<0)`.
                    let value = *counter;
                    *counter += 1;
                    if *counter > *period {
                        *counter = 1;
                    }
                    value
                }
            },
        }
    }
}

impl Default for ZRand {
    fn default() -> Self {
        Self::new_uniform()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predictable_mode_cycles_through_period() {
        let mut r = ZRand::new_predictable(1, 1);
        assert_eq!(r.random(-3), 0);
        assert_eq!(r.random(3), 1);
        assert_eq!(r.random(3), 2);
        assert_eq!(r.random(3), 3);
        assert_eq!(r.random(3), 1);
    }

    #[test]
    fn zero_switches_to_uniform_and_returns_zero() {
        let mut r = ZRand::new_predictable(1, 5);
        assert_eq!(r.random(0), 0);
        let v = r.random(10);
        assert!((1..=10).contains(&v));
    }

    #[test]
    fn uniform_mode_stays_in_range() {
        let mut r = ZRand::new_uniform();
        for _ in 0..50 {
            let v = r.random(6);
            assert!((1..=6).contains(&v));
        }
    }
}
