use std::{env, fmt, str::FromStr};

use chrono::{DateTime, FixedOffset, Offset, Utc};
use model::{geometry::ShapeGeometry, shape::CoverageShape};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOCALE: &str = "en-US";
pub const DEFAULT_CURRENCY: &str = "USD";

/// Languages that write `1,5` instead of `1.5`.
const COMMA_DECIMAL_LANGUAGES: [&str; 14] = [
    "de", "fr", "es", "it", "nl", "pt", "ru", "pl", "sv", "da", "nb", "fi", "cs", "tr",
];

/// A fixed UTC offset, written `UTC` or `+02:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeZone(FixedOffset);

impl TimeZone {
    pub fn utc() -> Self {
        Self(Utc.fix())
    }

    pub fn offset(&self) -> FixedOffset {
        self.0
    }
}

impl Default for TimeZone {
    fn default() -> Self {
        Self::utc()
    }
}

impl fmt::Display for TimeZone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0.local_minus_utc() == 0 {
            f.write_str("UTC")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl FromStr for TimeZone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("utc") || s == "Z" {
            return Ok(Self::utc());
        }
        let invalid = || format!("invalid time zone offset '{}'", s);
        let (sign, rest) = match s.chars().next() {
            Some('+') => (1, &s[1..]),
            Some('-') => (-1, &s[1..]),
            _ => return Err(invalid()),
        };
        let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
        let hours: i32 = hours.parse().map_err(|_| invalid())?;
        let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
        if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
            return Err(invalid());
        }
        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl Serialize for TimeZone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeZone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

/// Locale dependent presentation of values on the map. Passed in
/// explicitly, nothing here reads the host locale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattingConfig {
    pub locale: String,
    pub time_zone: TimeZone,
    pub currency: String,
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_owned(),
            time_zone: TimeZone::utc(),
            currency: DEFAULT_CURRENCY.to_owned(),
        }
    }
}

impl FormattingConfig {
    /// Reads `FORMAT_LOCALE`, `FORMAT_TIME_ZONE` and `FORMAT_CURRENCY`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let time_zone = match env::var("FORMAT_TIME_ZONE") {
            Ok(value) => value.parse().unwrap_or_else(|why| {
                log::warn!("{}, using {}", why, defaults.time_zone);
                defaults.time_zone
            }),
            Err(_) => defaults.time_zone,
        };
        Self {
            locale: env::var("FORMAT_LOCALE").unwrap_or(defaults.locale),
            time_zone,
            currency: env::var("FORMAT_CURRENCY").unwrap_or(defaults.currency),
        }
    }

    fn language(&self) -> &str {
        self.locale
            .split(|c: char| c == '-' || c == '_')
            .next()
            .unwrap_or_default()
    }

    pub fn decimal_separator(&self) -> char {
        let language = self.language().to_lowercase();
        if COMMA_DECIMAL_LANGUAGES.contains(&language.as_str()) {
            ','
        } else {
            '.'
        }
    }

    pub fn format_decimal(&self, value: f64, decimals: usize) -> String {
        let formatted = format!("{:.*}", decimals, value);
        match self.decimal_separator() {
            '.' => formatted,
            separator => formatted.replace('.', &separator.to_string()),
        }
    }

    /// `"500 m"` below a kilometer, `"1.5 km"` above.
    pub fn format_radius(&self, radius_m: f64) -> String {
        if radius_m < 1000.0 {
            format!("{} m", radius_m.round())
        } else {
            let km = radius_m / 1000.0;
            let decimals = if (km * 10.0).round() % 10.0 == 0.0 { 0 } else { 1 };
            format!("{} km", self.format_decimal(km, decimals))
        }
    }

    pub fn format_timestamp(&self, timestamp: &DateTime<Utc>) -> String {
        format!(
            "{} {}",
            timestamp
                .with_timezone(&self.time_zone.offset())
                .format("%Y-%m-%d %H:%M"),
            self.time_zone
        )
    }

    pub fn format_amount(&self, amount: f64) -> String {
        format!("{} {}", self.format_decimal(amount, 2), self.currency)
    }

    /// Short label shown next to a shape, e.g. `"Depot (1.5 km)"`.
    pub fn shape_label(&self, shape: &CoverageShape) -> String {
        match &shape.geometry {
            ShapeGeometry::Circle { radius_m, .. } => {
                format!("{} ({})", shape.name, self.format_radius(*radius_m))
            }
            ShapeGeometry::Polygon { ring } => {
                format!("{} ({} vertices)", shape.name, ring.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use model::geometry::LatLng;

    use super::*;

    fn german() -> FormattingConfig {
        FormattingConfig {
            locale: "de-DE".to_owned(),
            time_zone: "+02:00".parse().unwrap(),
            currency: "EUR".to_owned(),
        }
    }

    #[test]
    fn radius_switches_to_kilometers() {
        let config = FormattingConfig::default();
        assert_eq!(config.format_radius(500.0), "500 m");
        assert_eq!(config.format_radius(1500.0), "1.5 km");
        assert_eq!(config.format_radius(2000.0), "2 km");
        assert_eq!(german().format_radius(1500.0), "1,5 km");
    }

    #[test]
    fn timestamps_use_the_configured_offset() {
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        assert_eq!(
            FormattingConfig::default().format_timestamp(&timestamp),
            "2024-05-01 12:30 UTC"
        );
        assert_eq!(german().format_timestamp(&timestamp), "2024-05-01 14:30 +02:00");
    }

    #[test]
    fn parses_time_zones() {
        assert_eq!("utc".parse::<TimeZone>().unwrap(), TimeZone::utc());
        assert_eq!(
            "-05:30".parse::<TimeZone>().unwrap().offset().local_minus_utc(),
            -(5 * 3600 + 30 * 60)
        );
        assert!("Europe/Berlin".parse::<TimeZone>().is_err());
        assert!("+02:75".parse::<TimeZone>().is_err());
    }

    #[test]
    fn rejects_out_of_range_hours() {
        assert!("+99999999".parse::<TimeZone>().is_err());
        assert!("-24:00".parse::<TimeZone>().is_err());
        assert!("+-5".parse::<TimeZone>().is_err());
        assert_eq!(
            "+23:59".parse::<TimeZone>().unwrap().offset().local_minus_utc(),
            23 * 3600 + 59 * 60
        );
    }

    #[test]
    fn amounts_carry_the_currency() {
        assert_eq!(FormattingConfig::default().format_amount(12.5), "12.50 USD");
        assert_eq!(german().format_amount(12.5), "12,50 EUR");
    }

    #[test]
    fn labels_describe_the_geometry() {
        let circle = CoverageShape::new(
            "Depot",
            ShapeGeometry::circle(LatLng::new(0.0, 0.0), 1500.0).unwrap(),
        );
        assert_eq!(FormattingConfig::default().shape_label(&circle), "Depot (1.5 km)");
    }
}
