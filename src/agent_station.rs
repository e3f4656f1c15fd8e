use crate::sensor_readings::{Field, SensorReadings, lenient_float, lenient_int};
use crate::station::{FetchError, ParseError, Station};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// `nsExtendOutLine."davis"`: one row per output line of the agent's `davis` extend command.
const DAVIS_OUTPUT_LINE: [u32; 18] = [
    1, 3, 6, 1, 4, 1, 2021, 50, 1, 4, 1, 2, 5, 100, 97, 118, 105, 115,
];

const LINE_LAYOUT: [(Field, u32); 7] = [
    (Field::SourceTime, 4),
    (Field::WindSpeed, 27),
    (Field::WindDirection, 31),
    (Field::Temperature, 11),
    (Field::Humidity, 23),
    (Field::Pressure, 35),
    (Field::Rain, 39),
];

const METERS_PER_SECOND_TO_KM_PER_HOUR: f64 = 3.6;

/// Textual replies keyed by field, as `TYPE: VALUE`; empty when the query failed.
pub type AgentReplies = BTreeMap<Field, String>;

/// Station served by an SNMP agent exposing one object per sensor value.
pub struct AgentStation {
    host: String,
    port: u16,
    address: String,
    community: String,
    timeout: Duration,
    strict: bool,
}

impl AgentStation {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        community: impl Into<String>,
        timeout: Duration,
        strict: bool,
    ) -> Self {
        let host = host.into();
        let address = format!("{host}:{port}");
        Self {
            host,
            port,
            address,
            community: community.into(),
            timeout,
            strict,
        }
    }
}

/// Full object identifier for one line of the `davis` output table.
fn line_oid(line: u32) -> Vec<u32> {
    let mut oid = DAVIS_OUTPUT_LINE.to_vec();
    oid.push(line);
    oid
}

/// Render a varbind value the way net-snmp prints it.
fn render_value(value: &snmp::Value<'_>) -> String {
    match value {
        snmp::Value::Integer(v) => format!("INTEGER: {v}"),
        snmp::Value::OctetString(bytes) => {
            format!("STRING: \"{}\"", String::from_utf8_lossy(bytes))
        }
        snmp::Value::Counter32(v) => format!("Counter32: {v}"),
        snmp::Value::Unsigned32(v) => format!("Gauge32: {v}"),
        snmp::Value::Timeticks(v) => format!("Timeticks: {v}"),
        snmp::Value::Counter64(v) => format!("Counter64: {v}"),
        snmp::Value::IpAddress([a, b, c, d]) => format!("IpAddress: {a}.{b}.{c}.{d}"),
        _ => String::new(),
    }
}

/// Value part of a `TYPE: VALUE` reply, with string quotes stripped.
pub fn decode_reply(reply: &str) -> &str {
    let Some((kind, value)) = reply.split_once(':') else {
        return "";
    };
    let value = value.trim();
    if kind == "STRING" {
        let mut chars = value.chars();
        chars.next();
        chars.next_back();
        chars.as_str()
    } else {
        value
    }
}

/// Per-second wind speed to a whole per-hour value, rounding half up by truncation.
pub fn wind_speed_per_hour(per_second: f64) -> i64 {
    (per_second * METERS_PER_SECOND_TO_KM_PER_HOUR + 0.5) as i64
}

impl Station for AgentStation {
    type Raw = AgentReplies;

    fn address(&self) -> &str {
        &self.address
    }

    fn fetch(&mut self) -> Result<AgentReplies, FetchError> {
        let mut session = snmp::SyncSession::new(
            (self.host.as_str(), self.port),
            self.community.as_bytes(),
            Some(self.timeout),
            0,
        )
        .map_err(|source| FetchError {
            address: self.address.clone(),
            source,
        })?;

        let mut replies = AgentReplies::new();
        for (field, line) in LINE_LAYOUT {
            let reply = match session.get(&line_oid(line)) {
                Ok(mut response) => response
                    .varbinds
                    .next()
                    .map(|(_name, value)| render_value(&value))
                    .unwrap_or_default(),
                Err(err) => {
                    debug!(address = %self.address, %field, ?err, "agent query failed");
                    String::new()
                }
            };
            replies.insert(field, reply);
        }
        Ok(replies)
    }

    fn parse(&self, raw: &AgentReplies) -> Result<SensorReadings, ParseError> {
        parse_replies(raw, self.strict)
    }
}

/// Convert agent replies into readings; `strict` rejects empty values instead of zeroing them.
pub fn parse_replies(replies: &AgentReplies, strict: bool) -> Result<SensorReadings, ParseError> {
    let text = |field: Field| {
        let value = replies.get(&field).map_or("", |reply| decode_reply(reply));
        if strict && value.is_empty() {
            return Err(ParseError::MissingField { field });
        }
        Ok(value)
    };

    if let Some(reply) = replies.get(&Field::SourceTime) {
        debug!(source_time = decode_reply(reply), "agent time ignored, stamping with local clock");
    }

    Ok(SensorReadings {
        wind_speed: wind_speed_per_hour(lenient_float(text(Field::WindSpeed)?)),
        wind_direction: lenient_int(text(Field::WindDirection)?),
        temperature: lenient_float(text(Field::Temperature)?),
        humidity: lenient_int(text(Field::Humidity)?),
        pressure: lenient_float(text(Field::Pressure)?),
        rain: lenient_float(text(Field::Rain)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::UdpSocket;

    fn replies(values: &[(Field, &str)]) -> AgentReplies {
        values
            .iter()
            .map(|(field, reply)| (*field, reply.to_string()))
            .collect()
    }

    #[test]
    fn test_line_oid() {
        assert_eq!(
            line_oid(27),
            vec![1, 3, 6, 1, 4, 1, 2021, 50, 1, 4, 1, 2, 5, 100, 97, 118, 105, 115, 27]
        );
    }

    #[test]
    fn test_decode_reply() {
        assert_eq!(decode_reply("STRING: \"2.0\""), "2.0");
        assert_eq!(decode_reply("INTEGER: 12"), "12");
        assert_eq!(decode_reply("Gauge32:  80 "), "80");
        assert_eq!(decode_reply("STRING: x"), "");
        assert_eq!(decode_reply(""), "");
        assert_eq!(decode_reply("no colon"), "");
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&snmp::Value::Integer(-4)), "INTEGER: -4");
        assert_eq!(
            render_value(&snmp::Value::OctetString(&b"1013.2"[..])),
            "STRING: \"1013.2\""
        );
        assert_eq!(render_value(&snmp::Value::Null), "");
    }

    #[test]
    fn test_wind_speed_conversion() {
        assert_eq!(wind_speed_per_hour(2.0), 7);
        assert_eq!(wind_speed_per_hour(0.0), 0);
        assert_eq!(wind_speed_per_hour(2.5), 9);
    }

    #[test]
    fn test_parse_replies() {
        let raw = replies(&[
            (Field::SourceTime, "STRING: \"2460483.5\""),
            (Field::WindSpeed, "STRING: \"2.0\""),
            (Field::WindDirection, "STRING: \"270\""),
            (Field::Temperature, "STRING: \"18.4\""),
            (Field::Humidity, "INTEGER: 64"),
            (Field::Pressure, "STRING: \"1013.2\""),
            (Field::Rain, "STRING: \"0.2\""),
        ]);
        let readings = parse_replies(&raw, true).unwrap();
        assert_eq!(
            readings,
            SensorReadings {
                wind_speed: 7,
                wind_direction: 270,
                temperature: 18.4,
                humidity: 64,
                pressure: 1013.2,
                rain: 0.2,
            }
        );
    }

    #[test]
    fn test_empty_replies_are_zero_when_lenient() {
        let readings = parse_replies(&AgentReplies::new(), false).unwrap();
        assert_eq!(readings, SensorReadings::default());
    }

    #[test]
    fn test_empty_reply_rejected_when_strict() {
        let raw = replies(&[
            (Field::WindSpeed, "STRING: \"2.0\""),
            (Field::WindDirection, "STRING: \"270\""),
            (Field::Temperature, ""),
        ]);
        assert_eq!(
            parse_replies(&raw, true),
            Err(ParseError::MissingField {
                field: Field::Temperature
            })
        );
    }

    #[test]
    fn test_silent_agent_yields_empty_replies() {
        let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = silent.local_addr().unwrap().port();
        let mut station =
            AgentStation::new("127.0.0.1", port, "public", Duration::from_millis(50), false);

        let replies = station.fetch().unwrap();

        assert_eq!(replies.len(), LINE_LAYOUT.len());
        assert!(replies.values().all(String::is_empty));
        assert_eq!(station.parse(&replies), Ok(SensorReadings::default()));
    }

    #[test]
    fn test_unresolvable_agent_is_unreachable() {
        let mut station = AgentStation::new(
            "agent.invalid",
            161,
            "public",
            Duration::from_millis(50),
            false,
        );
        let err = station.fetch().unwrap_err();
        assert_eq!(err.address, "agent.invalid:161");
    }
}
