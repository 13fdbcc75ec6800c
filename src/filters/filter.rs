//! This module provides the `Filter` trait and related structures for managing trace processors
//! and their configuration. Filters turn one `Trace` into a new `Trace`; they never modify their
//! input, so a failed filter leaves the data as it was.
//! It also implements the global, immutable registry that looks filters up by name.

use crate::data_container::Trace;
use crate::error::{ExplorerError, ExplorerResult};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::fmt::{self, Debug};

/// The `Filter` trait defines the structure and behavior of a trace processor.
///
/// Filters must implement:
/// - A `new` function to initialize a filter with default parameters.
/// - A `config` function to provide metadata for the filter.
/// - A `parameters` function listing the numeric parameters and their current values.
/// - A `set_parameter` function to change one of them.
/// - A `filter` function to apply the filter to a `Trace`.
///
/// To implement a new filter, create a struct that derives `Clone` and `Debug`, implement
/// `Filter` for it and register it in `filters::default_registry`.
///
/// **Example**:
/// ```rust,ignore
/// use seismo_explorer::filters::filter::{Filter, FilterConfig, FilterDomain};
///
/// #[derive(Clone, Debug)]
/// struct Scale {
///     factor: f64,
/// }
///
/// impl Filter for Scale {
///     fn new() -> Self {
///         Scale { factor: 1.0 }
///     }
///
///     fn config(&self) -> FilterConfig {
///         FilterConfig {
///             name: "Scale".to_string(),
///             description: "Multiplies every sample by a constant.".to_string(),
///             hyperlink: None,
///             domain: FilterDomain::Time,
///         }
///     }
///
///     fn parameters(&self) -> BTreeMap<String, f64> {
///         BTreeMap::from([("factor".to_string(), self.factor)])
///     }
///
///     fn set_parameter(&mut self, name: &str, value: f64) -> ExplorerResult<()> {
///         match name {
///             "factor" => self.factor = value,
///             _ => return Err(unknown_parameter(&self.config().name, name)),
///         }
///         Ok(())
///     }
///
///     fn filter(&self, trace: &Trace) -> ExplorerResult<Trace> {
///         let data = trace.data_f64() * self.factor;
///         Ok(trace.with_samples(data, format!("scale: factor={}", self.factor)))
///     }
/// }
/// ```
pub trait Filter: Send + Sync + Debug + CloneBoxedFilter {
    /// Creates a new instance of the filter with default parameters.
    fn new() -> Self
    where
        Self: Sized;

    /// Returns the filter configuration, including name, description and domain.
    fn config(&self) -> FilterConfig;

    /// Current values of the numeric parameters, by name.
    fn parameters(&self) -> BTreeMap<String, f64>;

    /// Sets one numeric parameter. Unknown names and malformed values, such as a fractional
    /// corner count, are a `Validation` error. Values are checked against the trace when the
    /// filter runs.
    fn set_parameter(&mut self, name: &str, value: f64) -> ExplorerResult<()>;

    /// Applies the filter to `trace` and returns the processed copy, with the operation appended
    /// to its processing history.
    ///
    /// # Errors
    /// `ExplorerError::Precondition` when the trace cannot be processed with the current
    /// parameters (masked samples, corner above Nyquist, missing response, ...).
    fn filter(&self, trace: &Trace) -> ExplorerResult<Trace>;
}

/// The `FilterDomain` enum specifies where a filter does its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDomain {
    /// Filters working sample by sample (recursive filters, detrending, tapering).
    Time,
    /// Filters that transform the trace to the frequency domain and back.
    Frequency,
}

impl fmt::Display for FilterDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterDomain::Time => write!(f, "time domain"),
            FilterDomain::Frequency => write!(f, "frequency domain"),
        }
    }
}

/// A structure representing the configuration and metadata of a filter.
///
/// # Fields
/// - `name`: A human-readable name for the filter, also its registry key.
/// - `description`: A detailed description of what the filter does.
/// - `hyperlink`: Optional reference link with label.
/// - `domain`: The working domain, represented as a `FilterDomain`.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub name: String,
    pub description: String,
    pub hyperlink: Option<(Option<String>, String)>, // (optional_label, url)
    pub domain: FilterDomain,
}

/// One line per filter: name, domain and description, followed by the reference link if any.
impl fmt::Display for FilterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.domain, self.description)?;
        match &self.hyperlink {
            Some((Some(label), url)) => write!(f, " [{label}: {url}]"),
            Some((None, url)) => write!(f, " [{url}]"),
            None => Ok(()),
        }
    }
}

/// A trait to allow cloning of boxed filters.
/// This is necessary because `Box<dyn Filter>` cannot be cloned directly.
pub trait CloneBoxedFilter {
    fn clone_box(&self) -> Box<dyn Filter>;
}

impl<T> CloneBoxedFilter for T
where
    T: 'static + Filter + Clone,
{
    fn clone_box(&self) -> Box<dyn Filter> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Filter> {
    fn clone(&self) -> Box<dyn Filter> {
        self.as_ref().clone_box()
    }
}

/// Error for a parameter name a filter does not know.
pub fn unknown_parameter(filter: &str, name: &str) -> ExplorerError {
    ExplorerError::Validation(format!("{filter} has no parameter '{name}'"))
}

/// Reads a boolean parameter stored as a number (`0` is false, anything else true).
pub fn flag(value: f64) -> bool {
    value != 0.0
}

/// Reads a parameter that counts something (corners, derivative order) and must be a whole
/// number within `range`.
pub fn whole_number(
    filter: &str,
    name: &str,
    value: f64,
    range: std::ops::RangeInclusive<i64>,
) -> ExplorerResult<i64> {
    let whole = value.is_finite() && value.fract() == 0.0;
    if !whole || !range.contains(&(value as i64)) {
        return Err(ExplorerError::Validation(format!(
            "{filter} parameter '{name}' must be a whole number from {} to {}, got {value}",
            range.start(),
            range.end()
        )));
    }
    Ok(value as i64)
}

/// A registry holding one default instance of every filter, keyed by filter name.
///
/// **Example**:
/// ```rust,ignore
/// use seismo_explorer::filters::filter::FILTER_REGISTRY;
///
/// if let Some(filter) = FILTER_REGISTRY.get_filter("Band Pass") {
///     println!("Filter found: {:?}", filter.config());
/// }
/// ```
#[derive(Debug, Default)]
pub struct FilterRegistry {
    pub filters: BTreeMap<String, Box<dyn Filter>>,
}

impl FilterRegistry {
    /// Registers a default instance of the filter type `F` under its configured name.
    pub fn register_filter<F: Filter + 'static>(&mut self) {
        let filter_instance = F::new();
        let name = filter_instance.config().name;
        self.filters.insert(name, Box::new(filter_instance));
    }

    /// Retrieves a registered filter by its name.
    pub fn get_filter(&self, name: &str) -> Option<&dyn Filter> {
        self.filters.get(name).map(|f| f.as_ref())
    }

    /// Names of all registered filters, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.filters.keys().map(String::as_str).collect()
    }

    /// Names of the registered filters working in `domain`, sorted.
    pub fn names_in(&self, domain: FilterDomain) -> Vec<&str> {
        self.filters
            .iter()
            .filter(|(_, filter)| filter.config().domain == domain)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Implements `IntoIterator` for `&FilterRegistry`, iterating over the registered filters in
/// name order.
impl<'a> IntoIterator for &'a FilterRegistry {
    type Item = &'a Box<dyn Filter>;
    type IntoIter = std::collections::btree_map::Values<'a, String, Box<dyn Filter>>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.values()
    }
}

/// Global registry of all filters. Built once on first access and never modified afterwards.
pub static FILTER_REGISTRY: Lazy<FilterRegistry> = Lazy::new(crate::filters::default_registry);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_by_domain() {
        assert_eq!(
            FILTER_REGISTRY.names_in(FilterDomain::Frequency),
            vec!["Remove Response"]
        );
        let time = FILTER_REGISTRY.names_in(FilterDomain::Time);
        assert_eq!(time.len(), FILTER_REGISTRY.names().len() - 1);
        assert!(time.contains(&"Band Pass"));
    }

    #[test]
    fn test_config_display() {
        let removal = FILTER_REGISTRY.get_filter("Remove Response").unwrap().config();
        let line = removal.to_string();
        assert!(line.starts_with("Remove Response (frequency domain): "));
        assert!(line.ends_with(
            "[FDSN StationXML: https://docs.fdsn.org/projects/stationxml/en/latest/response.html]"
        ));

        let taper = FILTER_REGISTRY.get_filter("Taper").unwrap().config();
        assert_eq!(
            taper.to_string(),
            format!("Taper (time domain): {}", taper.description)
        );
    }

    #[test]
    fn test_whole_number() {
        assert_eq!(whole_number("Band Pass", "corners", 4.0, 1..=10).unwrap(), 4);
        for value in [2.5, 0.0, -1.0, 11.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                whole_number("Band Pass", "corners", value, 1..=10),
                Err(ExplorerError::Validation(_))
            ));
        }
    }
}
