use crate::sensor_readings::{Field, SensorReadings, lenient_float, lenient_int};
use crate::station::{FetchError, ParseError, Station};
use std::io::{self, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;

// Status blob layout: space separated tokens, each `name:unit:value`.
const VALUE_SUBFIELD: usize = 2;
const TOKEN_LAYOUT: [(Field, usize); 6] = [
    (Field::Temperature, 3),
    (Field::Humidity, 6),
    (Field::WindSpeed, 7),
    (Field::WindDirection, 8),
    (Field::Pressure, 9),
    (Field::Rain, 10),
];
/// A blob counts as a complete record only when this field is present.
const COMPLETENESS_FIELD: Field = Field::Rain;

/// Station that streams its status blob over TCP and closes the connection.
pub struct SocketStation {
    host: String,
    port: u16,
    address: String,
    timeout: Option<Duration>,
}

impl SocketStation {
    pub fn new(host: impl Into<String>, port: u16, timeout: Option<Duration>) -> Self {
        let host = host.into();
        let address = format!("{host}:{port}");
        Self {
            host,
            port,
            address,
            timeout,
        }
    }

    fn connect(&self) -> io::Result<TcpStream> {
        let Some(timeout) = self.timeout else {
            return TcpStream::connect((self.host.as_str(), self.port));
        };

        let mut last_err = None;
        for addr in (self.host.as_str(), self.port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(timeout))?;
                    return Ok(stream);
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses")
        }))
    }

    fn read_blob(&self) -> io::Result<String> {
        let mut stream = self.connect()?;
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl Station for SocketStation {
    type Raw = String;

    fn address(&self) -> &str {
        &self.address
    }

    fn fetch(&mut self) -> Result<String, FetchError> {
        let blob = self.read_blob().map_err(|source| FetchError {
            address: self.address.clone(),
            source,
        })?;
        debug!(address = %self.address, bytes = blob.len(), "read status blob");
        Ok(blob)
    }

    fn parse(&self, raw: &String) -> Result<SensorReadings, ParseError> {
        parse_blob(raw)
    }
}

fn field_value<'a>(tokens: &[Vec<&'a str>], field: Field) -> Option<&'a str> {
    let (_, index) = TOKEN_LAYOUT.iter().find(|(f, _)| *f == field)?;
    tokens.get(*index)?.get(VALUE_SUBFIELD).copied()
}

/// Split a status blob into tokens and pull each field's value sub-field.
pub fn parse_blob(blob: &str) -> Result<SensorReadings, ParseError> {
    let tokens: Vec<Vec<&str>> = blob
        .split(' ')
        .map(|token| token.split(':').collect())
        .collect();

    if field_value(&tokens, COMPLETENESS_FIELD).is_none() {
        return Err(ParseError::MissingField {
            field: COMPLETENESS_FIELD,
        });
    }
    let text = |field: Field| {
        field_value(&tokens, field).unwrap_or_else(|| {
            debug!(%field, "field absent from blob, using zero");
            ""
        })
    };

    Ok(SensorReadings {
        wind_speed: lenient_int(text(Field::WindSpeed)),
        wind_direction: lenient_int(text(Field::WindDirection)),
        temperature: lenient_float(text(Field::Temperature)),
        humidity: lenient_int(text(Field::Humidity)),
        pressure: lenient_float(text(Field::Pressure)),
        rain: lenient_float(text(Field::Rain)),
    })
}
