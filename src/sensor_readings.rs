use std::fmt;

/// Named sensor fields a station can report.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub enum Field {
    SourceTime,
    WindSpeed,
    WindDirection,
    Temperature,
    Humidity,
    Pressure,
    Rain,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::SourceTime => "time",
            Field::WindSpeed => "windspeed",
            Field::WindDirection => "winddirection",
            Field::Temperature => "temperature",
            Field::Humidity => "humidity",
            Field::Pressure => "pressure",
            Field::Rain => "rain",
        };
        f.write_str(name)
    }
}

#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct SensorReadings {
    pub wind_speed: i64,
    pub wind_direction: i64,
    pub temperature: f64,
    pub humidity: i64,
    pub pressure: f64,
    pub rain: f64,
}

/// One complete reading stamped with its astronomical day count.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct SensorSample {
    pub timestamp: f64,
    pub readings: SensorReadings,
}

const RECORD_SENTINEL: &str = "-----";

impl fmt::Display for SensorSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.readings;
        write!(
            f,
            "{} {} {} {} {} {} {} {}",
            format_float(self.timestamp),
            r.wind_speed,
            r.wind_direction,
            format_float(r.temperature),
            r.humidity,
            format_float(r.pressure),
            format_float(r.rain),
            RECORD_SENTINEL
        )
    }
}

/// Float text that always carries a decimal point for finite values.
fn format_float(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains('.') {
        format!("{text}.0")
    } else {
        text
    }
}

/// Longest numeric prefix of `text`: `[+-]?digits[.digits][e[+-]digits]`.
fn numeric_prefix(text: &str, allow_fraction: bool) -> &str {
    let bytes = text.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_end = digits_from(end);
    let mut has_digits = int_end > end;
    end = int_end;

    if allow_fraction {
        if bytes.get(end) == Some(&b'.') {
            let frac_end = digits_from(end + 1);
            if has_digits || frac_end > end + 1 {
                has_digits = true;
                end = frac_end;
            }
        }
        if has_digits && matches!(bytes.get(end), Some(b'e' | b'E')) {
            let mut exp = end + 1;
            if matches!(bytes.get(exp), Some(b'+' | b'-')) {
                exp += 1;
            }
            let exp_end = digits_from(exp);
            if exp_end > exp {
                end = exp_end;
            }
        }
    }

    if has_digits { &text[..end] } else { "" }
}

/// Integer value of the leading numeric text, 0 when there is none.
///
/// A prefix carrying an exponent is read as a float and truncated, so `"1e3"`
/// is 1000 while `"7.9"` stays 7.
pub fn lenient_int(text: &str) -> i64 {
    let text = text.trim_start();
    let float_prefix = numeric_prefix(text, true);
    if float_prefix.contains(['e', 'E']) {
        return float_prefix.parse::<f64>().map_or(0, |value| value as i64);
    }

    let prefix = numeric_prefix(text, false);
    match prefix.parse::<i64>() {
        Ok(value) => value,
        Err(_) if prefix.is_empty() => 0,
        Err(_) if prefix.starts_with('-') => i64::MIN,
        Err(_) => i64::MAX,
    }
}

/// Float value of the leading numeric text, 0.0 when there is none.
pub fn lenient_float(text: &str) -> f64 {
    numeric_prefix(text.trim_start(), true)
        .parse::<f64>()
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_line_format() {
        let sample = SensorSample {
            timestamp: 2451545.25,
            readings: SensorReadings {
                wind_speed: 7,
                wind_direction: 12,
                temperature: 4.5,
                humidity: 80,
                pressure: 1013.0,
                rain: 0.0,
            },
        };
        assert_eq!(sample.to_string(), "2451545.25 7 12 4.5 80 1013.0 0.0 -----");
    }

    #[test]
    fn test_lenient_int() {
        assert_eq!(lenient_int("12"), 12);
        assert_eq!(lenient_int("  7\n"), 7);
        assert_eq!(lenient_int("7.9"), 7);
        assert_eq!(lenient_int("-3abc"), -3);
        assert_eq!(lenient_int("abc"), 0);
        assert_eq!(lenient_int(""), 0);
        assert_eq!(lenient_int("99999999999999999999"), i64::MAX);
    }

    #[test]
    fn test_lenient_int_reads_exponent() {
        assert_eq!(lenient_int("1e3"), 1000);
        assert_eq!(lenient_int("1.5E3"), 1500);
        assert_eq!(lenient_int("-2e2x"), -200);
        assert_eq!(lenient_int("2e"), 2);
        assert_eq!(lenient_int("1e400"), i64::MAX);
    }

    #[test]
    fn test_lenient_float() {
        assert_eq!(lenient_float("1013.2"), 1013.2);
        assert_eq!(lenient_float("0.0\n"), 0.0);
        assert_eq!(lenient_float(".5"), 0.5);
        assert_eq!(lenient_float("-4.5C"), -4.5);
        assert_eq!(lenient_float("1e3"), 1000.0);
        assert_eq!(lenient_float("2e"), 2.0);
        assert_eq!(lenient_float("c.5"), 0.0);
        assert_eq!(lenient_float("."), 0.0);
    }

    #[test]
    fn test_field_names() {
        assert_eq!(Field::Rain.to_string(), "rain");
        assert_eq!(Field::WindSpeed.to_string(), "windspeed");
    }
}
