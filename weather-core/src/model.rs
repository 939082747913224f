use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Why a payload was rejected as displayable weather.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("weather payload is not a JSON object")]
    NotAnObject,

    #[error("weather payload field `{0}` is missing or malformed")]
    Field(&'static str),
}

/// A current-conditions payload as returned by OpenWeather.
///
/// The JSON object is kept verbatim so it can be persisted and restored
/// unchanged. Construction always goes through shape validation: `sys` and
/// `main` must be objects, `weather` a non-empty array starting with an
/// object, and `name` a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct WeatherReading {
    raw: Map<String, Value>,
}

impl WeatherReading {
    /// Checks the structure the renderer relies on.
    pub fn validate(value: &Value) -> Result<(), ShapeError> {
        let obj = value.as_object().ok_or(ShapeError::NotAnObject)?;

        if !obj.get("sys").is_some_and(Value::is_object) {
            return Err(ShapeError::Field("sys"));
        }
        if !obj.get("main").is_some_and(Value::is_object) {
            return Err(ShapeError::Field("main"));
        }
        let first_condition = obj
            .get("weather")
            .and_then(Value::as_array)
            .and_then(|conditions| conditions.first());
        if !first_condition.is_some_and(Value::is_object) {
            return Err(ShapeError::Field("weather"));
        }
        if !obj.get("name").is_some_and(Value::is_string) {
            return Err(ShapeError::Field("name"));
        }

        Ok(())
    }

    /// City name as normalized by the API.
    pub fn name(&self) -> &str {
        self.raw.get("name").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn country(&self) -> Option<&str> {
        self.section("sys")?.get("country")?.as_str()
    }

    pub fn temperature(&self) -> Option<f64> {
        self.number("main", "temp")
    }

    pub fn feels_like(&self) -> Option<f64> {
        self.number("main", "feels_like")
    }

    pub fn temp_min(&self) -> Option<f64> {
        self.number("main", "temp_min")
    }

    pub fn temp_max(&self) -> Option<f64> {
        self.number("main", "temp_max")
    }

    pub fn humidity(&self) -> Option<f64> {
        self.number("main", "humidity")
    }

    pub fn pressure(&self) -> Option<f64> {
        self.number("main", "pressure")
    }

    pub fn wind_speed(&self) -> Option<f64> {
        self.number("wind", "speed")
    }

    pub fn wind_direction(&self) -> Option<f64> {
        self.number("wind", "deg")
    }

    pub fn cloud_cover(&self) -> Option<f64> {
        self.number("clouds", "all")
    }

    /// Visibility in metres.
    pub fn visibility(&self) -> Option<f64> {
        self.raw.get("visibility")?.as_f64()
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates {
            lat: self.number("coord", "lat")?,
            lon: self.number("coord", "lon")?,
        })
    }

    /// Sunrise as epoch seconds.
    pub fn sunrise(&self) -> Option<i64> {
        self.section("sys")?.get("sunrise")?.as_i64()
    }

    /// Sunset as epoch seconds.
    pub fn sunset(&self) -> Option<i64> {
        self.section("sys")?.get("sunset")?.as_i64()
    }

    pub fn icon(&self) -> Option<&str> {
        self.primary_condition()?.get("icon")?.as_str()
    }

    pub fn description(&self) -> Option<&str> {
        self.primary_condition()?.get("description")?.as_str()
    }

    fn primary_condition(&self) -> Option<&Map<String, Value>> {
        self.raw.get("weather")?.as_array()?.first()?.as_object()
    }

    fn section(&self, key: &str) -> Option<&Map<String, Value>> {
        self.raw.get(key)?.as_object()
    }

    fn number(&self, section: &str, key: &str) -> Option<f64> {
        self.section(section)?.get(key)?.as_f64()
    }
}

impl TryFrom<Value> for WeatherReading {
    type Error = ShapeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::validate(&value)?;
        match value {
            Value::Object(raw) => Ok(Self { raw }),
            _ => Err(ShapeError::NotAnObject),
        }
    }
}

impl From<WeatherReading> for Value {
    fn from(reading: WeatherReading) -> Self {
        Value::Object(reading.raw)
    }
}

/// A latitude/longitude pair, persisted as `{"lat": .., "lon": ..}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.lat, self.lon)
    }
}

/// Whether an OpenWeather body reports success through its `cod` field.
///
/// The API sends `cod` as a number on success and as a string on most
/// errors, so both forms are compared textually.
pub fn api_status_ok(body: &Value) -> bool {
    match body.get("cod") {
        Some(Value::Number(n)) => n.to_string() == "200",
        Some(Value::String(s)) => s == "200",
        _ => false,
    }
}

/// Non-empty `message` carried by an OpenWeather error body.
pub fn api_message(body: &Value) -> Option<&str> {
    body.get("message")
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
}
