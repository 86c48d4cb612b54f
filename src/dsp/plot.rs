use std::io::Cursor;
use std::ops::Range;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::LineSeries;
use plotters::prelude::*;
use crate::dsp::iq::IqPoints;
use crate::dsp::peaks::Peak;
use crate::dsp::psd::PsdResult;
use crate::dsp::spectrogram::{AnnotationBox, Spectrogram};
use crate::dsp::AnalysisError;
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub palette: Vec<RGBColor>,
    /// Caption; nothing is drawn when empty.
    pub title: String,
    /// Draw tick labels and axis descriptions. Needs a system font.
    pub annotate_axes: bool,
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 400,
            background: RGBColor(10, 10, 10),
            palette: vec![BLUE, RED, GREEN, CYAN, MAGENTA, YELLOW, WHITE],
            title: String::new(),
            annotate_axes: true,
        }
    }
}
const PEAK_MARKER: RGBColor = RGBColor(255, 140, 0);
const VIRIDIS: [(f64, f64, f64); 5] = [
    (68.0, 1.0, 84.0),
    (59.0, 82.0, 139.0),
    (33.0, 145.0, 140.0),
    (94.0, 201.0, 98.0),
    (253.0, 231.0, 37.0),
];
/// Maps `t` in `[0, 1]` onto a five-stop viridis ramp.
fn viridis(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (VIRIDIS.len() - 1) as f64;
    let lo = (scaled.floor() as usize).min(VIRIDIS.len() - 2);
    let frac = scaled - lo as f64;
    let (a, b) = (VIRIDIS[lo], VIRIDIS[lo + 1]);
    let mix = |x: f64, y: f64| (x + (y - x) * frac).round() as u8;
    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}
/// Widens a degenerate range so plotters can build an axis on it.
fn padded(lo: f64, hi: f64) -> Range<f64> {
    if (hi - lo).abs() < f64::EPSILON {
        lo - 0.5..hi + 0.5
    } else {
        lo..hi
    }
}
/// PSD line with peak markers and half-prominence bandwidth bars.
pub fn render_psd_png(
    psd: &PsdResult,
    peaks: &[Peak],
    style: PlotStyle,
) -> Result<Vec<u8>, AnalysisError> {
    let (y_min, y_max) = psd
        .power_db
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .ok_or_else(|| AnalysisError::Plot("spectrum has no finite power values".into()))?;
    let x_range = padded(
        psd.frequencies_hz.first().copied().unwrap_or(0.0),
        psd.frequencies_hz.last().copied().unwrap_or(0.0),
    );
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut builder = ChartBuilder::on(&root);
        builder.margin(10);
        if style.annotate_axes {
            builder
                .set_label_area_size(LabelAreaPosition::Left, 55)
                .set_label_area_size(LabelAreaPosition::Bottom, 40);
        }
        if !style.title.is_empty() {
            builder.caption(&style.title, ("sans-serif", 20).into_font().color(&WHITE));
        }
        let mut chart = builder.build_cartesian_2d(x_range, padded(y_min - 3.0, y_max + 3.0))?;
        if style.annotate_axes {
            chart
                .configure_mesh()
                .x_desc("Frequency [Hz]")
                .y_desc("PSD [dB]")
                .light_line_style(&WHITE.mix(0.1))
                .draw()?;
        }
        let floor = y_min - 3.0;
        let line = style.palette.first().copied().unwrap_or(BLUE);
        chart.draw_series(LineSeries::new(
            psd.frequencies_hz
                .iter()
                .copied()
                .zip(psd.power_db.iter().map(|p| p.max(floor))),
            &line,
        ))?;
        chart.draw_series(peaks.iter().map(|p| {
            Circle::new(
                (p.center_freq_hz, p.power_db),
                6,
                ShapeStyle::from(&PEAK_MARKER).stroke_width(2),
            )
        }))?;
        chart.draw_series(peaks.iter().flat_map(|p| {
            let bars = p.error_bars();
            [
                PathElement::new(
                    vec![
                        (bars.x_hz - bars.x_minus_hz, bars.y_db),
                        (bars.x_hz + bars.x_plus_hz, bars.y_db),
                    ],
                    &RED,
                ),
                PathElement::new(
                    vec![
                        (bars.x_hz, bars.y_db - bars.y_err_db),
                        (bars.x_hz, bars.y_db + bars.y_err_db),
                    ],
                    &RED,
                ),
            ]
        }))?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
/// Heat map of the spectrogram (frequency across, time up) with annotation outlines.
pub fn render_spectrogram_png(
    spectrogram: &Spectrogram,
    boxes: &[AnnotationBox],
    style: PlotStyle,
) -> Result<Vec<u8>, AnalysisError> {
    let (lo, hi) = spectrogram
        .finite_range()
        .ok_or_else(|| AnalysisError::Plot("spectrogram has no finite rows".into()))?;
    let span = (hi - lo).max(f64::EPSILON);
    let freqs = &spectrogram.frequencies_hz;
    let df = match freqs.as_slice() {
        [a, b, ..] => b - a,
        _ => 1.0,
    };
    let dt = spectrogram.block_duration_s();
    let t_end = spectrogram.times_s.last().copied().unwrap_or(0.0) + dt;
    // one rectangle per plot pixel at most, keeping the loudest bin of each cell
    let col_step = (freqs.len() / style.width.max(1) as usize).max(1);
    let row_step = (spectrogram.num_rows() / style.height.max(1) as usize).max(1);
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut builder = ChartBuilder::on(&root);
        builder.margin(10);
        if style.annotate_axes {
            builder
                .set_label_area_size(LabelAreaPosition::Left, 55)
                .set_label_area_size(LabelAreaPosition::Bottom, 40);
        }
        if !style.title.is_empty() {
            builder.caption(&style.title, ("sans-serif", 20).into_font().color(&WHITE));
        }
        let x_range = padded(freqs[0], freqs[freqs.len() - 1] + df);
        let mut chart = builder.build_cartesian_2d(x_range, 0.0..t_end)?;
        if style.annotate_axes {
            chart
                .configure_mesh()
                .x_desc("Frequency [Hz]")
                .y_desc("Time [s]")
                .disable_mesh()
                .draw()?;
        }
        let power = &spectrogram.power_db;
        let mut cells = Vec::new();
        for row in (0..spectrogram.num_rows()).step_by(row_step) {
            let row_end = (row + row_step).min(spectrogram.num_rows());
            for col in (0..freqs.len()).step_by(col_step) {
                let col_end = (col + col_step).min(freqs.len());
                let loudest = (row..row_end)
                    .flat_map(|r| (col..col_end).map(move |c| (r, c)))
                    .map(|idx| power[idx])
                    .fold(f64::NEG_INFINITY, f64::max);
                let t0 = spectrogram.times_s[row];
                let f0 = freqs[col];
                cells.push(Rectangle::new(
                    [(f0, t0), (f0 + df * col_step as f64, t0 + dt * row_step as f64)],
                    viridis((loudest - lo) / span).filled(),
                ));
            }
        }
        chart.draw_series(cells)?;
        chart.draw_series(boxes.iter().map(|b| {
            Rectangle::new(
                [(b.freq_lower_hz, b.start_s), (b.freq_upper_hz, b.stop_s)],
                ShapeStyle::from(&WHITE).stroke_width(2),
            )
        }))?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
/// IQ scatter with the unit circle for reference.
pub fn render_iq_png(iq: &IqPoints, style: PlotStyle) -> Result<Vec<u8>, AnalysisError> {
    if iq.is_empty() {
        return Err(AnalysisError::Plot("no IQ samples to plot".into()));
    }
    let side = style.width.min(style.height);
    let mut buffer = vec![0u8; (side * side * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (side, side)).into_drawing_area();
        root.fill(&style.background)?;
        let mut builder = ChartBuilder::on(&root);
        builder.margin(10);
        if style.annotate_axes {
            builder
                .set_label_area_size(LabelAreaPosition::Left, 40)
                .set_label_area_size(LabelAreaPosition::Bottom, 40);
        }
        if !style.title.is_empty() {
            builder.caption(&style.title, ("sans-serif", 20).into_font().color(&WHITE));
        }
        let mut chart = builder.build_cartesian_2d(-1.2f64..1.2f64, -1.2f64..1.2f64)?;
        if style.annotate_axes {
            chart
                .configure_mesh()
                .x_desc("I")
                .y_desc("Q")
                .light_line_style(&WHITE.mix(0.1))
                .draw()?;
        }
        chart.draw_series(LineSeries::new(
            (0..=256).map(|k| {
                let a = std::f64::consts::TAU * k as f64 / 256.0;
                (a.cos(), a.sin())
            }),
            &WHITE.mix(0.4),
        ))?;
        let color = style.palette.first().copied().unwrap_or(BLUE);
        chart.draw_series(
            iq.i.iter()
                .zip(&iq.q)
                .map(|(&i, &q)| Circle::new((i, q), 2, color.filled())),
        )?;
        root.present()?;
    }
    encode_png(&buffer, side, side)
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, AnalysisError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| AnalysisError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
