use crate::sensor_readings::{Field, SensorReadings};
use std::io;
use thiserror::Error;

/// The station could not be reached for this cycle.
#[derive(Debug, Error)]
#[error("{address} unreachable: {source}")]
pub struct FetchError {
    pub address: String,
    #[source]
    pub source: io::Error,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing {field} field")]
    MissingField { field: Field },
}

/// A weather station variant: how raw data is fetched and how it becomes readings.
pub trait Station {
    type Raw;

    /// `host:port` the station is polled at, used in diagnostics.
    fn address(&self) -> &str;

    fn fetch(&mut self) -> Result<Self::Raw, FetchError>;

    fn parse(&self, raw: &Self::Raw) -> Result<SensorReadings, ParseError>;
}
