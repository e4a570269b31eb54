//! Signal components that can be layered onto a simulated channel

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// One additive component of a simulated channel, in microvolts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SignalPattern {
    /// Constant electrode offset
    Offset { level: f64 },
    /// Pure tone
    Sinusoid {
        frequency: f64,
        amplitude: f64,
        phase: f64,
    },
    /// Zero-mean Gaussian background activity
    GaussianNoise { std_dev: f64 },
    /// Uniform noise in `[-amplitude, amplitude]` during `[start_s, start_s + duration_s)`,
    /// modelling a movement or contact artifact
    UniformBurst {
        start_s: f64,
        duration_s: f64,
        amplitude: f64,
    },
}

impl SignalPattern {
    /// Contribution of this component at `time` seconds
    pub fn value_at<R: Rng + ?Sized>(&self, time: f64, rng: &mut R) -> f64 {
        match *self {
            SignalPattern::Offset { level } => level,

            SignalPattern::Sinusoid { frequency, amplitude, phase } => {
                amplitude * (2.0 * PI * frequency * time + phase).sin()
            }

            SignalPattern::GaussianNoise { std_dev } => {
                let z: f64 = rng.sample(StandardNormal);
                z * std_dev
            }

            SignalPattern::UniformBurst { start_s, duration_s, amplitude } => {
                if time >= start_s && time < start_s + duration_s {
                    rng.gen_range(-amplitude..=amplitude)
                } else {
                    0.0
                }
            }
        }
    }

    /// 10 Hz, 5 uV resting-state alpha rhythm
    pub fn alpha_rhythm() -> Self {
        SignalPattern::Sinusoid { frequency: 10.0, amplitude: 5.0, phase: 0.0 }
    }

    /// Half-second, 500 uV artifact starting at `start_s`
    pub fn movement_artifact(start_s: f64) -> Self {
        SignalPattern::UniformBurst { start_s, duration_s: 0.5, amplitude: 500.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sinusoid() {
        let mut rng = StdRng::seed_from_u64(1);
        let tone = SignalPattern::alpha_rhythm();
        assert_abs_diff_eq!(tone.value_at(0.025, &mut rng), 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(tone.value_at(0.05, &mut rng), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_burst_window() {
        let mut rng = StdRng::seed_from_u64(2);
        let burst = SignalPattern::movement_artifact(4.0);
        assert_eq!(burst.value_at(3.99, &mut rng), 0.0);
        assert_eq!(burst.value_at(4.5, &mut rng), 0.0);

        let inside: Vec<f64> =
            (0..100).map(|i| burst.value_at(4.0 + i as f64 * 0.004, &mut rng)).collect();
        assert!(inside.iter().all(|v| v.abs() <= 500.0));
        let max = inside.iter().cloned().fold(f64::MIN, f64::max);
        let min = inside.iter().cloned().fold(f64::MAX, f64::min);
        let ptp = max - min;
        assert!(ptp > 500.0);
    }

    #[test]
    fn test_gaussian_noise_statistics() {
        let mut rng = StdRng::seed_from_u64(3);
        let noise = SignalPattern::GaussianNoise { std_dev: 2.0 };
        let values: Vec<f64> = (0..20_000).map(|_| noise.value_at(0.0, &mut rng)).collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        assert_abs_diff_eq!(mean, 0.0, epsilon = 0.1);
        assert_abs_diff_eq!(var.sqrt(), 2.0, epsilon = 0.1);
    }
}
