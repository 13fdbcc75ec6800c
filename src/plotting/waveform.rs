use super::{FONT_TUPLE_LABEL, FONT_TUPLE_TITLE, LINE_WIDTH};
use crate::data_container::{Stream, Trace};
use crate::error::{ExplorerError, ExplorerResult};
use crate::math_tools::finite_range;
use crate::timestamp::{add_seconds, format_fdsn, seconds_between};
use log::info;
use plotters::prelude::*;
use std::path::Path;

/// Row colours of a day plot, cycled.
const ROW_COLORS: [RGBColor; 4] = [BLACK, RED, BLUE, RGBColor(0, 128, 0)];

/// Runs of unmasked samples as `(seconds, value)` points, shifted by `offset` seconds.
fn segments(trace: &Trace, offset: f64) -> Vec<Vec<(f64, f64)>> {
    let data = trace.data_f64();
    let delta = trace.delta();
    let mut runs = vec![];
    let mut current = vec![];
    for (i, &value) in data.iter().enumerate() {
        if trace.mask.as_ref().is_some_and(|m| m[i]) {
            if !current.is_empty() {
                runs.push(std::mem::take(&mut current));
            }
        } else {
            current.push((offset + i as f64 * delta, value));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Value range with a small margin; constant or empty data get a unit range.
fn padded(range: Option<(f64, f64)>) -> (f64, f64) {
    match range {
        Some((lo, hi)) if hi > lo => {
            let margin = 0.05 * (hi - lo);
            (lo - margin, hi + margin)
        }
        Some((lo, _)) => (lo - 1.0, lo + 1.0),
        None => (-1.0, 1.0),
    }
}

pub(super) fn plot_stream(stream: &Stream, path: &Path, size: (u32, u32)) -> ExplorerResult<()> {
    let traces: Vec<&Trace> = stream.iter().filter(|tr| tr.npts() > 0).collect();
    let origin = traces
        .iter()
        .map(|tr| tr.starttime)
        .min()
        .ok_or_else(|| ExplorerError::Precondition("stream has no samples to plot".into()))?;
    let span = traces
        .iter()
        .map(|tr| seconds_between(&origin, &tr.starttime) + tr.duration())
        .fold(0.0, f64::max);

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((traces.len(), 1));
    for (trace, panel) in traces.iter().zip(panels.iter()) {
        let runs = segments(trace, seconds_between(&origin, &trace.starttime));
        let (lo, hi) = padded(finite_range(runs.iter().flatten().map(|&(_, v)| v)));
        let mut chart = ChartBuilder::on(panel)
            .caption(trace.id.to_string(), FONT_TUPLE_TITLE)
            .margin(5)
            .x_label_area_size(35)
            .y_label_area_size(70)
            .build_cartesian_2d(0.0..span, lo..hi)?;
        chart
            .configure_mesh()
            .x_desc(format!("Seconds after {}", format_fdsn(&origin)))
            .label_style(FONT_TUPLE_LABEL)
            .draw()?;
        for run in runs {
            chart.draw_series(LineSeries::new(
                run,
                ShapeStyle::from(&BLACK).stroke_width(LINE_WIDTH),
            ))?;
        }
    }
    root.present()?;
    info!("plotted {} trace(s) to {}", traces.len(), path.display());
    Ok(())
}

pub(super) fn plot_dayplot(
    trace: &Trace,
    interval: f64,
    path: &Path,
    size: (u32, u32),
) -> ExplorerResult<()> {
    let rows = (trace.duration() / interval).ceil().max(1.0) as usize;
    let runs = segments(trace, 0.0);
    // each row spans one unit, traces are scaled to the largest absolute value
    let scale = finite_range(runs.iter().flatten().map(|&(_, v)| v))
        .map(|(lo, hi)| lo.abs().max(hi.abs()))
        .filter(|&m| m > 0.0)
        .unwrap_or(1.0);
    let mean = runs.iter().flatten().map(|&(_, v)| v).sum::<f64>()
        / runs.iter().map(Vec::len).sum::<usize>().max(1) as f64;

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let starttime = trace.starttime;
    let label = |row: &f64| {
        let row = -row.round();
        if row < 0.0 || row >= rows as f64 {
            return String::new();
        }
        add_seconds(&starttime, row * interval)
            .format("%H:%M")
            .to_string()
    };
    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("{} from {}", trace.id, format_fdsn(&starttime)),
            FONT_TUPLE_TITLE,
        )
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..interval / 60.0, -(rows as f64)..1.0)?;
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(rows.min(48) + 1)
        .y_label_formatter(&label)
        .x_desc("Minutes")
        .y_desc("UTC")
        .label_style(FONT_TUPLE_LABEL)
        .draw()?;

    for run in runs {
        // a run can cross row boundaries, cut it into per-row pieces
        let mut pieces: Vec<(usize, Vec<(f64, f64)>)> = vec![];
        for (t, v) in run {
            let row = ((t / interval).floor() as usize).min(rows - 1);
            let point = (
                (t - row as f64 * interval) / 60.0,
                -(row as f64) + 0.5 * (v - mean) / scale,
            );
            match pieces.last_mut() {
                Some((r, points)) if *r == row => points.push(point),
                _ => pieces.push((row, vec![point])),
            }
        }
        for (row, points) in pieces {
            let color = ROW_COLORS[row % ROW_COLORS.len()];
            chart.draw_series(LineSeries::new(
                points,
                ShapeStyle::from(&color).stroke_width(LINE_WIDTH),
            ))?;
        }
    }
    root.present()?;
    info!(
        "day plot of {} with {rows} row(s) of {} min to {}",
        trace.id,
        interval / 60.0,
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_container::{Samples, TraceId};
    use chrono::{TimeZone, Utc};
    use ndarray::Array1;

    #[test]
    fn test_segments_skip_masked_samples() {
        let mut trace = Trace::new(
            TraceId::new("OO", "AXAS1", "", "EHZ"),
            Utc.with_ymd_and_hms(2019, 11, 1, 0, 0, 0).unwrap(),
            2.0,
            Samples::Float64(Array1::from_vec(vec![1.0, 2.0, 0.0, 0.0, 5.0])),
        );
        trace.mask = Some(vec![false, false, true, true, false]);
        let runs = segments(&trace, 1.0);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0], vec![(1.0, 1.0), (1.5, 2.0)]);
        assert_eq!(runs[1], vec![(3.0, 5.0)]);
    }

    #[test]
    fn test_padded_range() {
        assert_eq!(padded(None), (-1.0, 1.0));
        assert_eq!(padded(Some((3.0, 3.0))), (2.0, 4.0));
        assert_eq!(padded(Some((0.0, 10.0))), (-0.5, 10.5));
    }
}
