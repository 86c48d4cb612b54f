//! Spectral peak detection.
//!
//! Local maxima of a dB curve are qualified by prominence (how far the curve drops on both
//! sides before reaching higher ground) and by their width at half prominence. The width
//! edges give each peak a bandwidth in Hz. Results are ranked strongest first.
use serde::Serialize;
/// Prominence threshold used by the analysis view when none is configured.
pub const DEFAULT_PROMINENCE_DB: f64 = 5.0;
/// A qualified local maximum of a PSD curve.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Peak {
    /// Bin index into the PSD.
    pub index: usize,
    pub center_freq_hz: f64,
    pub power_db: f64,
    pub prominence_db: f64,
    /// Lowest bin on each side that bounds the prominence search.
    pub left_base: usize,
    pub right_base: usize,
    /// Width in bins at `width_height_db`.
    pub width_bins: f64,
    pub width_height_db: f64,
    /// Interpolated bin positions where the curve crosses `width_height_db`.
    pub left_ips: f64,
    pub right_ips: f64,
    pub left_freq_hz: f64,
    pub right_freq_hz: f64,
    pub bandwidth_hz: f64,
}
/// Plot offsets drawing a peak's bandwidth as an error bar at half prominence.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ErrorBars {
    pub x_hz: f64,
    pub y_db: f64,
    pub x_plus_hz: f64,
    pub x_minus_hz: f64,
    pub y_err_db: f64,
}
impl Peak {
    pub fn error_bars(&self) -> ErrorBars {
        let half = self.prominence_db / 2.0;
        ErrorBars {
            x_hz: self.center_freq_hz,
            y_db: self.power_db - half,
            x_plus_hz: self.right_freq_hz - self.center_freq_hz,
            x_minus_hz: self.center_freq_hz - self.left_freq_hz,
            y_err_db: half,
        }
    }
}
#[derive(Clone, Debug)]
pub struct PeakDetector {
    prominence: Option<f64>,
    min_bandwidth_hz: Option<f64>,
    height: Option<f64>,
    rel_height: f64,
}
impl Default for PeakDetector {
    fn default() -> Self {
        Self {
            prominence: Some(DEFAULT_PROMINENCE_DB),
            min_bandwidth_hz: None,
            height: None,
            rel_height: 0.5,
        }
    }
}
impl PeakDetector {
    pub fn new() -> Self {
        Self::default()
    }
    /// Minimum prominence in dB; `None` accepts every local maximum.
    pub fn with_prominence(mut self, prominence: Option<f64>) -> Self {
        self.prominence = prominence;
        self
    }
    /// Minimum bandwidth in Hz, converted to a width in bins from the axis spacing.
    pub fn with_min_bandwidth(mut self, min_bandwidth_hz: Option<f64>) -> Self {
        self.min_bandwidth_hz = min_bandwidth_hz;
        self
    }
    /// Minimum absolute peak power in dB.
    pub fn with_height(mut self, height: Option<f64>) -> Self {
        self.height = height;
        self
    }
    /// Fraction of the prominence below the peak at which width is measured.
    pub fn with_rel_height(mut self, rel_height: f64) -> Self {
        self.rel_height = rel_height;
        self
    }
    /// Peaks of `power_db` ordered by descending power; equal powers keep ascending index
    /// order. No qualifying maxima gives an empty vector.
    pub fn find(&self, frequencies_hz: &[f64], power_db: &[f64]) -> Vec<Peak> {
        let n = frequencies_hz.len().min(power_db.len());
        let (freqs, x) = (&frequencies_hz[..n], &power_db[..n]);
        let resolution = match freqs {
            [first, second, ..] => second - first,
            _ => return Vec::new(),
        };
        let min_width = self
            .min_bandwidth_hz
            .map(|bw| bw / resolution)
            .unwrap_or(1.0);
        let mut peaks: Vec<Peak> = local_maxima(x)
            .into_iter()
            .filter(|&p| self.height.map_or(true, |h| x[p] >= h))
            .filter_map(|p| {
                let (prominence, left_base, right_base) = prominence(x, p);
                if self.prominence.map_or(false, |min| prominence < min) {
                    return None;
                }
                let width = width_at(x, p, prominence, left_base, right_base, self.rel_height);
                if width.right_ips - width.left_ips < min_width {
                    return None;
                }
                let left_freq_hz = freqs[0] + width.left_ips * resolution;
                let right_freq_hz = freqs[0] + width.right_ips * resolution;
                Some(Peak {
                    index: p,
                    center_freq_hz: freqs[p],
                    power_db: x[p],
                    prominence_db: prominence,
                    left_base,
                    right_base,
                    width_bins: width.right_ips - width.left_ips,
                    width_height_db: width.height,
                    left_ips: width.left_ips,
                    right_ips: width.right_ips,
                    left_freq_hz,
                    right_freq_hz,
                    bandwidth_hz: right_freq_hz - left_freq_hz,
                })
            })
            .collect();
        peaks.sort_by(|a, b| b.power_db.total_cmp(&a.power_db));
        log::debug!("peak search kept {} peak(s) over {n} bins", peaks.len());
        peaks
    }
}
/// Indices of strict local maxima; flat tops report their middle sample (rounded down).
/// The first and last samples are never maxima.
fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut maxima = Vec::new();
    if x.len() < 3 {
        return maxima;
    }
    let last = x.len() - 1;
    let mut i = 1;
    while i < last {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < last && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                maxima.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    maxima
}
/// Prominence of `peak` with the bases it was measured against.
fn prominence(x: &[f64], peak: usize) -> (f64, usize, usize) {
    let top = x[peak];
    let (mut left_min, mut left_base) = (top, peak);
    for i in (0..=peak).rev() {
        if x[i] > top {
            break;
        }
        if x[i] < left_min {
            left_min = x[i];
            left_base = i;
        }
    }
    let (mut right_min, mut right_base) = (top, peak);
    for (i, &v) in x.iter().enumerate().skip(peak) {
        if v > top {
            break;
        }
        if v < right_min {
            right_min = v;
            right_base = i;
        }
    }
    (top - left_min.max(right_min), left_base, right_base)
}
struct Width {
    height: f64,
    left_ips: f64,
    right_ips: f64,
}
fn width_at(
    x: &[f64],
    peak: usize,
    prominence: f64,
    left_base: usize,
    right_base: usize,
    rel_height: f64,
) -> Width {
    let height = x[peak] - prominence * rel_height;
    let mut i = peak;
    while left_base < i && height < x[i] {
        i -= 1;
    }
    let mut left_ips = i as f64;
    if !x[i].is_finite() && i < peak {
        // no slope to interpolate against a silent bin
        left_ips = (i + 1) as f64;
    } else if x[i] < height {
        left_ips += (height - x[i]) / (x[i + 1] - x[i]);
    }
    let mut i = peak;
    while i < right_base && height < x[i] {
        i += 1;
    }
    let mut right_ips = i as f64;
    if !x[i].is_finite() && i > peak {
        right_ips = (i - 1) as f64;
    } else if x[i] < height {
        right_ips -= (height - x[i]) / (x[i - 1] - x[i]);
    }
    Width {
        height,
        left_ips,
        right_ips,
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn axis(n: usize, step: f64) -> Vec<f64> {
        (0..n).map(|i| -(n as f64) * step / 2.0 + i as f64 * step).collect()
    }
    /// Flat floor with gaussian bumps of (center, height above floor, sigma in bins).
    fn bumps(n: usize, floor: f64, tones: &[(usize, f64, f64)]) -> Vec<f64> {
        (0..n)
            .map(|i| {
                tones.iter().fold(floor, |acc, &(c, h, s)| {
                    let d = (i as f64 - c as f64) / s;
                    acc.max(floor + h * (-0.5 * d * d).exp())
                })
            })
            .collect()
    }
    #[test]
    fn two_tones_survive_moderate_thresholds() {
        let freqs = axis(512, 100.0);
        let power = bumps(512, -80.0, &[(100, 40.0, 3.0), (400, 30.0, 2.0)]);
        for prominence in [5.0, 20.0] {
            let peaks = PeakDetector::new()
                .with_prominence(Some(prominence))
                .find(&freqs, &power);
            assert_eq!(peaks.len(), 2, "prominence {prominence}");
            assert_eq!(peaks[0].index, 100);
            assert_eq!(peaks[1].index, 400);
        }
        let strict = PeakDetector::new()
            .with_prominence(Some(35.0))
            .find(&freqs, &power);
        assert_eq!(strict.len(), 1);
        let none = PeakDetector::new()
            .with_prominence(Some(45.0))
            .find(&freqs, &power);
        assert!(none.is_empty());
    }
    #[test]
    fn ordered_by_power_with_stable_ties() {
        let freqs = axis(9, 1.0);
        let power = [0.0, 3.0, 0.0, 5.0, 0.0, 3.0, 0.0, 5.0, 0.0];
        let peaks = PeakDetector::new()
            .with_prominence(None)
            .find(&freqs, &power);
        let order: Vec<usize> = peaks.iter().map(|p| p.index).collect();
        assert_eq!(order, vec![3, 7, 1, 5]);
        assert!(peaks.windows(2).all(|w| w[0].power_db >= w[1].power_db));
    }
    #[test]
    fn bandwidth_is_interpolated_at_half_prominence() {
        let freqs: Vec<f64> = (0..5).map(|i| 1000.0 + 10.0 * i as f64).collect();
        let power = [0.0, 0.0, 10.0, 0.0, 0.0];
        let peaks = PeakDetector::new().find(&freqs, &power);
        assert_eq!(peaks.len(), 1);
        let p = &peaks[0];
        assert_eq!(p.prominence_db, 10.0);
        assert_eq!(p.width_height_db, 5.0);
        assert_eq!((p.left_ips, p.right_ips), (1.5, 2.5));
        assert_eq!((p.left_freq_hz, p.right_freq_hz), (1015.0, 1025.0));
        assert_eq!(p.bandwidth_hz, 10.0);
        let bars = p.error_bars();
        assert_eq!(bars.y_db, 5.0);
        assert_eq!(bars.y_err_db, 5.0);
        assert_eq!((bars.x_minus_hz, bars.x_plus_hz), (5.0, 5.0));
    }
    #[test]
    fn bandwidth_is_never_negative() {
        let freqs = axis(256, 25.0);
        let power = bumps(
            256,
            -60.0,
            &[(20, 12.0, 1.0), (90, 30.0, 6.0), (91, 29.0, 1.0), (200, 8.0, 0.5)],
        );
        let peaks = PeakDetector::new().with_prominence(None).find(&freqs, &power);
        assert!(!peaks.is_empty());
        for p in &peaks {
            assert!(p.right_freq_hz >= p.left_freq_hz);
            assert!(p.bandwidth_hz >= 0.0);
            assert!(p.left_base <= p.index && p.index <= p.right_base);
        }
    }
    #[test]
    fn min_bandwidth_rejects_narrow_peaks() {
        let freqs = axis(256, 10.0);
        let power = bumps(256, -50.0, &[(60, 20.0, 0.6), (180, 20.0, 8.0)]);
        let all = PeakDetector::new().find(&freqs, &power);
        assert_eq!(all.len(), 2);
        let wide = PeakDetector::new()
            .with_min_bandwidth(Some(100.0))
            .find(&freqs, &power);
        assert_eq!(wide.len(), 1);
        assert_eq!(wide[0].index, 180);
    }
    #[test]
    fn plateau_reports_its_middle() {
        let freqs = axis(8, 1.0);
        let power = [0.0, 1.0, 4.0, 4.0, 4.0, 4.0, 1.0, 0.0];
        let peaks = PeakDetector::new().with_prominence(None).find(&freqs, &power);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 3);
    }
    #[test]
    fn flat_or_tiny_input_has_no_peaks() {
        let freqs = axis(64, 1.0);
        assert!(PeakDetector::new().find(&freqs, &[-60.0; 64]).is_empty());
        assert!(PeakDetector::new().find(&freqs[..2], &[0.0, 1.0]).is_empty());
        assert!(PeakDetector::new().find(&[], &[]).is_empty());
        let silent = vec![f64::NEG_INFINITY; 64];
        assert!(PeakDetector::new().find(&freqs, &silent).is_empty());
    }
    #[test]
    fn silent_neighbour_does_not_poison_bandwidth() {
        let freqs: Vec<f64> = (0..7).map(|i| 10.0 * i as f64).collect();
        let power = [0.0, f64::NEG_INFINITY, 10.0, 5.0, 0.0, 20.0, 0.0];
        let peaks = PeakDetector::new().with_prominence(None).find(&freqs, &power);
        assert_eq!(peaks.len(), 2);
        for p in &peaks {
            assert!(p.bandwidth_hz.is_finite() && p.bandwidth_hz >= 0.0);
            assert!(p.left_freq_hz.is_finite() && p.right_freq_hz.is_finite());
        }
        let quiet = &peaks[1];
        assert_eq!(quiet.index, 2);
        assert_eq!((quiet.left_ips, quiet.right_ips), (2.0, 3.0));
        assert_eq!(quiet.bandwidth_hz, 10.0);
    }
    #[test]
    fn rel_height_moves_the_width_line() {
        let freqs: Vec<f64> = (0..5).map(|i| 1000.0 + 10.0 * i as f64).collect();
        let power = [0.0, 0.0, 10.0, 0.0, 0.0];
        let peaks = PeakDetector::new()
            .with_rel_height(0.8)
            .find(&freqs, &power);
        let p = &peaks[0];
        assert_eq!(p.width_height_db, 2.0);
        assert!((p.left_ips - 1.2).abs() < 1e-12);
        assert!((p.right_ips - 2.8).abs() < 1e-12);
        assert!((p.bandwidth_hz - 16.0).abs() < 1e-9);
    }
    #[test]
    fn edge_samples_are_not_peaks() {
        let freqs = axis(5, 1.0);
        let power = [9.0, 1.0, 0.0, 1.0, 9.0];
        assert!(PeakDetector::new().with_prominence(None).find(&freqs, &power).is_empty());
    }
    #[test]
    fn height_threshold() {
        let freqs = axis(7, 1.0);
        let power = [0.0, 6.0, 0.0, 9.0, 0.0, 12.0, 0.0];
        let peaks = PeakDetector::new().with_height(Some(8.0)).find(&freqs, &power);
        let order: Vec<usize> = peaks.iter().map(|p| p.index).collect();
        assert_eq!(order, vec![5, 3]);
    }
}
