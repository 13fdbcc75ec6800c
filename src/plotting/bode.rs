use super::{FONT_TUPLE_LABEL, FONT_TUPLE_TITLE, LINE_WIDTH};
use crate::error::{ExplorerError, ExplorerResult};
use crate::math_tools::{finite_range, unwrap_phase};
use crate::response::{Response, ResponseOutput};
use log::info;
use plotters::prelude::*;
use std::path::Path;

const BODE_POINTS: usize = 512;
const AMPLITUDE_COLOR: RGBColor = RGBColor(0, 100, 200);
const PHASE_COLOR: RGBColor = RGBColor(200, 80, 0);

/// `n` logarithmically spaced frequencies from `min` to `max`, both included.
fn logspace(min: f64, max: f64, n: usize) -> Vec<f64> {
    let (lo, hi) = (min.log10(), max.log10());
    (0..n)
        .map(|i| 10f64.powf(lo + (hi - lo) * i as f64 / (n - 1) as f64))
        .collect()
}

pub(super) fn plot_response(
    response: &Response,
    (min_freq, max_freq): (f64, f64),
    output: ResponseOutput,
    title: &str,
    path: &Path,
    size: (u32, u32),
) -> ExplorerResult<()> {
    let freqs = logspace(min_freq, max_freq, BODE_POINTS);
    let values = response.evaluate(&freqs, output)?;
    let amplitude: Vec<(f64, f64)> = freqs
        .iter()
        .zip(&values)
        .map(|(&f, h)| (f, h.norm()))
        .filter(|&(_, a)| a > 0.0 && a.is_finite())
        .collect();
    let phase = unwrap_phase(&values.iter().map(|h| h.arg()).collect::<Vec<_>>());
    let (amp_lo, amp_hi) = finite_range(amplitude.iter().map(|&(_, a)| a))
        .ok_or_else(|| ExplorerError::Precondition("response amplitude is zero".to_string()))?;
    let (phase_lo, phase_hi) = finite_range(phase.iter().copied()).unwrap_or((-1.0, 1.0));

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((2, 1));

    let mut amp_chart = ChartBuilder::on(&panels[0])
        .caption(format!("{title} ({output})"), FONT_TUPLE_TITLE)
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(70)
        .build_cartesian_2d(
            (min_freq..max_freq).log_scale(),
            (amp_lo / 2.0..amp_hi * 2.0).log_scale(),
        )?;
    amp_chart
        .configure_mesh()
        .y_desc("Amplitude")
        .y_label_formatter(&|y| format!("{y:.0e}"))
        .label_style(FONT_TUPLE_LABEL)
        .draw()?;
    amp_chart.draw_series(LineSeries::new(
        amplitude,
        ShapeStyle::from(&AMPLITUDE_COLOR).stroke_width(LINE_WIDTH + 1),
    ))?;

    let margin = 0.1 * (phase_hi - phase_lo).max(0.1);
    let mut phase_chart = ChartBuilder::on(&panels[1])
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(70)
        .build_cartesian_2d(
            (min_freq..max_freq).log_scale(),
            phase_lo - margin..phase_hi + margin,
        )?;
    phase_chart
        .configure_mesh()
        .x_desc("Frequency [Hz]")
        .y_desc("Phase [rad]")
        .label_style(FONT_TUPLE_LABEL)
        .draw()?;
    phase_chart.draw_series(LineSeries::new(
        freqs.iter().copied().zip(phase),
        ShapeStyle::from(&PHASE_COLOR).stroke_width(LINE_WIDTH + 1),
    ))?;

    root.present()?;
    info!(
        "plotted response {title} from {min_freq} to {max_freq} Hz to {}",
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_logspace_ends() {
        let f = logspace(0.001, 50.0, 5);
        assert_eq!(f.len(), 5);
        assert_relative_eq!(f[0], 0.001, max_relative = 1e-12);
        assert_relative_eq!(f[4], 50.0, max_relative = 1e-12);
        assert!(f.windows(2).all(|w| w[1] > w[0]));
    }
}
