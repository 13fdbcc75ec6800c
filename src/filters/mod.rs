//! Trace processing filters.
//!
//! Every filter implements the `Filter` trait defined in the `filter` module and is registered
//! by name in the global `FILTER_REGISTRY`, so that processing steps can be configured from
//! names and parameter maps (settings files, command lines).
//!
//! # Filter Categories
//!
//! * **Time Domain Filters**: Butterworth band, high and low pass filters, detrending and
//!   tapering.
//!
//! * **Frequency Domain Filters**: instrument response removal.

use crate::error::{ExplorerError, ExplorerResult};
use crate::filters::filter::{CloneBoxedFilter, Filter, FilterRegistry, FILTER_REGISTRY};
use std::collections::BTreeMap;

/// Butterworth band pass.
pub mod band_pass;

/// Removal of the mean or a linear trend.
pub mod detrend;

/// Core filter interfaces and shared components.
/// Defines the `Filter` trait and supporting structures used by all filter implementations.
pub mod filter;

/// Butterworth high pass.
pub mod high_pass;

/// Butterworth design and second-order section filtering shared by the pass filters.
pub mod iir;

/// Butterworth low pass.
pub mod low_pass;

/// Deconvolution of the instrument response.
pub mod response_removal;

/// Cosine taper.
pub mod taper;

/// Registry with every filter of this crate, used to build `FILTER_REGISTRY`.
pub fn default_registry() -> FilterRegistry {
    let mut registry = FilterRegistry::default();
    registry.register_filter::<band_pass::BandPass>();
    registry.register_filter::<high_pass::HighPass>();
    registry.register_filter::<low_pass::LowPass>();
    registry.register_filter::<detrend::Detrend>();
    registry.register_filter::<taper::Taper>();
    registry.register_filter::<response_removal::ResponseRemoval>();
    registry
}

/// Instantiates the registered filter `name` and applies `parameters` to it.
///
/// # Errors
/// `ExplorerError::Validation` for an unknown filter or parameter name.
pub fn build_filter(
    name: &str,
    parameters: &BTreeMap<String, f64>,
) -> ExplorerResult<Box<dyn Filter>> {
    let mut filter = FILTER_REGISTRY
        .get_filter(name)
        .ok_or_else(|| {
            ExplorerError::Validation(format!(
                "unknown filter '{name}', available: {}",
                FILTER_REGISTRY.names().join(", ")
            ))
        })?
        .clone_box();
    for (key, value) in parameters {
        filter.set_parameter(key, *value)?;
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_contents() {
        assert_eq!(
            FILTER_REGISTRY.names(),
            vec![
                "Band Pass",
                "Detrend",
                "High Pass",
                "Low Pass",
                "Remove Response",
                "Taper"
            ]
        );
        for filter in &*FILTER_REGISTRY {
            assert!(!filter.config().description.is_empty());
        }
    }

    #[test]
    fn test_build_filter() {
        let parameters = BTreeMap::from([("freq".to_string(), 2.5)]);
        let filter = build_filter("Low Pass", &parameters).unwrap();
        assert_eq!(filter.parameters()["freq"], 2.5);
        // the registered default is untouched
        assert_eq!(
            FILTER_REGISTRY.get_filter("Low Pass").unwrap().parameters()["freq"],
            10.0
        );
        assert!(matches!(
            build_filter("Notch", &BTreeMap::new()),
            Err(ExplorerError::Validation(_))
        ));
        assert!(build_filter("Low Pass", &BTreeMap::from([("q".to_string(), 1.0)])).is_err());
    }
}
