use super::{FONT_TUPLE_LABEL, FONT_TUPLE_TITLE};
use crate::error::{ExplorerError, ExplorerResult};
use crate::math_tools::finite_range;
use crate::spectrogram::Spectrogram;
use log::info;
use plotters::prelude::*;
use std::path::Path;

/// Maps `value` into the viridis colour scale spanning `[min, max]`.
fn map_to_color(value: f64, min: f64, max: f64) -> RGBColor {
    if !value.is_finite() {
        return RGBColor(0, 0, 0);
    }
    let span = (max - min).abs().max(1e-12);
    let t = ((value.clamp(min, max) - min) / span).clamp(0.0, 1.0);
    let color = colorous::VIRIDIS.eval_continuous(t);
    RGBColor(color.r, color.g, color.b)
}

/// Cell edges around regularly spaced centres.
fn edges(centres: &[f64]) -> Vec<f64> {
    let step = match centres {
        [a, b, ..] => b - a,
        [a] => 2.0 * a.abs().max(1e-3),
        [] => 1.0,
    };
    let mut out: Vec<f64> = centres.iter().map(|c| c - step / 2.0).collect();
    if let Some(last) = centres.last() {
        out.push(last + step / 2.0);
    }
    out
}

pub(super) fn plot_spectrogram(
    spectrogram: &Spectrogram,
    title: &str,
    log_frequency: bool,
    path: &Path,
    size: (u32, u32),
) -> ExplorerResult<()> {
    let times = edges(spectrogram.times.as_slice().unwrap_or(&[]));
    let mut freqs = edges(spectrogram.frequencies.as_slice().unwrap_or(&[]));
    if times.len() < 2 || freqs.len() < 2 {
        return Err(ExplorerError::Precondition(
            "spectrogram axes are not contiguous".to_string(),
        ));
    }
    if log_frequency {
        // the lowest edge would sit at or below 0 Hz
        freqs[0] = freqs[0].max(freqs[1] / 2.0);
    }
    let (lo, hi) = finite_range(spectrogram.values.iter().copied()).unwrap_or((0.0, 1.0));
    let x_range = times[0].max(0.0)..times[times.len() - 1];
    let y_range = freqs[0]..freqs[freqs.len() - 1];

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let cells = spectrogram
        .values
        .indexed_iter()
        .map(|((k, j), &value)| {
            Rectangle::new(
                [(times[j], freqs[k + 1]), (times[j + 1], freqs[k])],
                map_to_color(value, lo, hi).filled(),
            )
        });
    let unit = if spectrogram.dbscale { "dB" } else { "amplitude" };
    let caption = format!("{title} ({unit}, {lo:.3e} to {hi:.3e})");
    if log_frequency {
        let mut chart = ChartBuilder::on(&root)
            .caption(caption, FONT_TUPLE_TITLE)
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, y_range.log_scale())?;
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("Time [s]")
            .y_desc("Frequency [Hz]")
            .label_style(FONT_TUPLE_LABEL)
            .draw()?;
        chart.draw_series(cells)?;
    } else {
        let mut chart = ChartBuilder::on(&root)
            .caption(caption, FONT_TUPLE_TITLE)
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, y_range)?;
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("Time [s]")
            .y_desc("Frequency [Hz]")
            .label_style(FONT_TUPLE_LABEL)
            .draw()?;
        chart.draw_series(cells)?;
    }
    root.present()?;
    info!(
        "plotted spectrogram {title} ({}x{}) to {}",
        spectrogram.frequencies.len(),
        spectrogram.times.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_around_centres() {
        assert_eq!(edges(&[1.0, 2.0, 3.0]), vec![0.5, 1.5, 2.5, 3.5]);
        assert_eq!(edges(&[0.5]), vec![0.0, 1.0]);
        assert!(edges(&[]).is_empty());
    }

    #[test]
    fn test_color_scale_ends() {
        let low = map_to_color(-10.0, 0.0, 1.0);
        let high = map_to_color(10.0, 0.0, 1.0);
        assert_eq!(low, map_to_color(0.0, 0.0, 1.0));
        assert_eq!(high, map_to_color(1.0, 0.0, 1.0));
        assert_ne!(low, high);
        assert_eq!(map_to_color(f64::NAN, 0.0, 1.0), RGBColor(0, 0, 0));
    }
}
