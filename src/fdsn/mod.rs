//! Retrieval of station metadata and waveforms from FDSN web services.

pub mod client;
pub mod query;
pub mod services;
pub mod transport;

pub use client::Client;
pub use query::{BoundingBox, Level, StationQuery, WaveformQuery};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
