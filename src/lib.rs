//! Retrieval, processing, storage and plotting of seismic station metadata and waveforms.
//!
//! Metadata and waveforms come from FDSN web services ([`fdsn::Client`]) as an [`Inventory`]
//! and a [`Stream`]. Streams are merged ([`Stream::merge`]), filtered through the
//! [`filters::FILTER_REGISTRY`], turned into spectrograms ([`spectrogram::compute`]), stored as
//! miniSEED / StationXML ([`io`]) and rendered to PNG ([`plotting`]).

use preferences::AppInfo;

pub mod config;
pub mod data_container;
pub mod error;
pub mod fdsn;
pub mod filters;
pub mod inventory;
pub mod io;
pub mod math_tools;
pub mod merge;
pub mod plotting;
pub mod response;
pub mod spectrogram;
pub mod timestamp;

pub use config::Settings;
pub use data_container::{SampleType, Samples, Stream, Trace, TraceId};
pub use error::{ExplorerError, ExplorerResult};
pub use inventory::Inventory;
pub use merge::{Gap, GapFill};
pub use response::{Response, ResponseOutput};

pub const APP_INFO: AppInfo = AppInfo {
    name: "Seismo Explorer",
    author: "Linus Leo Stöckli",
};
