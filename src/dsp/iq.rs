use rustfft::num_complex::Complex64;
use serde::Serialize;
/// Decimated constellation points, each axis scaled by its own peak magnitude.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct IqPoints {
    pub i: Vec<f64>,
    pub q: Vec<f64>,
}
impl IqPoints {
    pub fn len(&self) -> usize {
        self.i.len()
    }
    pub fn is_empty(&self) -> bool {
        self.i.is_empty()
    }
}
/// Keeps every `decimate`-th sample and normalises I and Q into `[-1, 1]`.
///
/// An axis whose samples are all zero is left unscaled.
pub fn iq_points(samples: &[Complex64], decimate: usize) -> IqPoints {
    let kept: Vec<Complex64> = samples.iter().step_by(decimate.max(1)).copied().collect();
    let i_max = kept.iter().fold(0.0_f64, |acc, c| acc.max(c.re.abs()));
    let q_max = kept.iter().fold(0.0_f64, |acc, c| acc.max(c.im.abs()));
    let scale = |v: f64, max: f64| if max > 0.0 { v / max } else { v };
    IqPoints {
        i: kept.iter().map(|c| scale(c.re, i_max)).collect(),
        q: kept.iter().map(|c| scale(c.im, q_max)).collect(),
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn decimates_and_normalises_each_axis() {
        let samples: Vec<Complex64> = (0..20)
            .map(|k| Complex64::new(k as f64 - 10.0, 0.5 * k as f64))
            .collect();
        let points = iq_points(&samples, 5);
        assert_eq!(points.len(), 4);
        assert_eq!(points.i, vec![-1.0, -0.5, 0.0, 0.5]);
        assert_eq!(points.q, vec![0.0, 2.5 / 7.5, 5.0 / 7.5, 1.0]);
    }
    #[test]
    fn silent_axis_is_not_scaled() {
        let samples = vec![Complex64::new(2.0, 0.0), Complex64::new(-4.0, 0.0)];
        let points = iq_points(&samples, 0);
        assert_eq!(points.i, vec![0.5, -1.0]);
        assert_eq!(points.q, vec![0.0, 0.0]);
        assert!(iq_points(&[], 10).is_empty());
    }
}
