use super::{FONT_TUPLE_LABEL, FONT_TUPLE_TITLE, MapProjection};
use crate::error::ExplorerResult;
use crate::inventory::Inventory;
use crate::math_tools::finite_range;
use log::info;
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;

const NETWORK_COLORS: [RGBColor; 6] = [
    RGBColor(200, 0, 0),
    RGBColor(0, 100, 200),
    RGBColor(0, 150, 0),
    RGBColor(200, 120, 0),
    RGBColor(130, 0, 180),
    RGBColor(0, 160, 160),
];
const MARKER_SIZE: i32 = 8;

/// Longitude and latitude ranges shown for `projection`.
fn extent(inventory: &Inventory, projection: MapProjection) -> (Range<f64>, Range<f64>) {
    let stations = || inventory.networks.iter().flat_map(|net| &net.stations);
    match projection {
        MapProjection::Local => {
            let pad = |(lo, hi): (f64, f64)| {
                let margin = (0.1 * (hi - lo)).max(1.0);
                (lo - margin, hi + margin)
            };
            let (lon_lo, lon_hi) =
                pad(finite_range(stations().map(|sta| sta.longitude)).unwrap_or((0.0, 0.0)));
            let (lat_lo, lat_hi) =
                pad(finite_range(stations().map(|sta| sta.latitude)).unwrap_or((0.0, 0.0)));
            (
                lon_lo.max(-180.0)..lon_hi.min(180.0),
                lat_lo.max(-90.0)..lat_hi.min(90.0),
            )
        }
        _ => (-180.0..180.0, -90.0..90.0),
    }
}

pub(super) fn plot_inventory(
    inventory: &Inventory,
    projection: MapProjection,
    path: &Path,
    size: (u32, u32),
) -> ExplorerResult<()> {
    let (lon_range, lat_range) = extent(inventory, projection);
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("{} station(s)", inventory.station_count()),
            FONT_TUPLE_TITLE,
        )
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(50)
        .build_cartesian_2d(lon_range, lat_range)?;
    chart
        .configure_mesh()
        .x_desc("Longitude [°]")
        .y_desc("Latitude [°]")
        .label_style(FONT_TUPLE_LABEL)
        .draw()?;

    for (i, net) in inventory.networks.iter().enumerate() {
        let color = NETWORK_COLORS[i % NETWORK_COLORS.len()];
        chart
            .draw_series(net.stations.iter().map(|sta| {
                EmptyElement::at((sta.longitude, sta.latitude))
                    + TriangleMarker::new((0, 0), MARKER_SIZE, color.filled())
                    + Text::new(sta.code.clone(), (6, -14), FONT_TUPLE_LABEL.into_font())
            }))?
            .label(net.code.clone())
            .legend(move |(x, y)| TriangleMarker::new((x, y), MARKER_SIZE, color.filled()));
    }
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .label_font(FONT_TUPLE_LABEL)
        .draw()?;

    root.present()?;
    info!(
        "plotted {} station(s) ({projection:?}) to {}",
        inventory.station_count(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::tests::{channel, inventory};

    #[test]
    fn test_local_extent_around_station() {
        let metadata = inventory(vec![channel("", "EHZ", 2016, None)]);
        let (lon, lat) = extent(&metadata, MapProjection::Local);
        assert!(lon.start < 7.44 && lon.end > 7.44);
        assert!(lat.start < 46.95 && lat.end > 46.95);
        assert!(lon.end - lon.start <= 2.0 + 1e-9);
    }

    #[test]
    fn test_global_extent() {
        let metadata = inventory(vec![channel("", "EHZ", 2016, None)]);
        let (lon, lat) = extent(&metadata, MapProjection::Global);
        assert_eq!(lon, -180.0..180.0);
        assert_eq!(lat, -90.0..90.0);
    }
}
