//! Adapter over an external ephemeris engine.
//!
//! Engine bindings differ across versions in both the entry-point names
//! they expose and the shape of their replies, so each capability is
//! resolved against an ordered candidate list and longitudes are pulled
//! out through an ordered extractor chain. The adapter presents an async
//! contract whether or not the underlying engine is synchronous.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::domain::{CelestialBodySpec, HouseData};

/// Portable calculation mode, no external ephemeris data files.
pub const SEFLG_MOSEPH: i32 = 4;
/// Request speed/derivative terms alongside positions.
pub const SEFLG_SPEED: i32 = 256;
/// Gregorian calendar flag for the Julian-day conversion.
pub const GREGORIAN: i32 = 1;
/// Placidus house division, fixed for all requests.
pub const HOUSE_SYSTEM: char = 'P';

const JULIAN_DAY_ENTRIES: [&str; 4] = ["julday_ut", "swe_julday_ut", "julday", "swe_julday"];
const POSITION_ENTRIES: [&str; 2] = ["calc_ut", "swe_calc_ut"];
const HOUSES_ENTRIES: [&str; 2] = ["houses", "swe_houses"];

/// The three capabilities the adapter needs from an engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    JulianDay,
    BodyPosition,
    Houses,
}

impl Capability {
    fn candidates(self) -> &'static [&'static str] {
        match self {
            Capability::JulianDay => &JULIAN_DAY_ENTRIES,
            Capability::BodyPosition => &POSITION_ENTRIES,
            Capability::Houses => &HOUSES_ENTRIES,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Capability::JulianDay => "julian-day conversion",
            Capability::BodyPosition => "position calculation",
            Capability::Houses => "house calculation",
        })
    }
}

/// Fault raised by the engine while executing a call, as opposed to an
/// `error` field carried inside an otherwise well-formed reply.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct EngineFault {
    pub message: String,
}

impl EngineFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum EphemerisError {
    #[error("missing required entry point for {0}")]
    MissingEntryPoint(Capability),
    #[error("{0}")]
    Engine(String),
    #[error("invalid longitude")]
    InvalidLongitude,
    #[error("invalid julian day")]
    InvalidJulianDay,
    #[error("expected 12 house cusps, got {0}")]
    InvalidCusps(usize),
}

/// One call into the engine, mirroring the three capabilities.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineCall {
    JulianDay {
        year: i32,
        month: u8,
        day: u8,
        hour_ut: f64,
        /// `None` selects the shorter call form without the calendar flag.
        calendar: Option<i32>,
    },
    BodyPosition {
        julian_day: f64,
        body: i32,
        flags: i32,
    },
    Houses {
        julian_day: f64,
        latitude: f64,
        longitude: f64,
        system: char,
    },
}

/// Boundary to the external astronomical engine. Implementations wrap a
/// concrete binding; tests script replies directly.
pub trait EphemerisEngine: Send + Sync {
    /// Whether the binding exposes `entry` at all.
    fn provides(&self, entry: &str) -> bool;

    /// Executes `call` through `entry`. The reply is loosely shaped JSON;
    /// the adapter does all interpretation.
    fn invoke(&self, entry: &str, call: &EngineCall) -> Result<Value, EngineFault>;
}

/// Ordered longitude extractors; the first finite value wins.
const LONGITUDE_EXTRACTORS: [fn(&Value) -> Option<f64>; 2] = [leading_data_value, longitude_field];

fn leading_data_value(reply: &Value) -> Option<f64> {
    reply.get("data")?.get(0)?.as_f64()
}

fn longitude_field(reply: &Value) -> Option<f64> {
    reply.get("longitude")?.as_f64()
}

fn extract_longitude(reply: &Value) -> Option<f64> {
    LONGITUDE_EXTRACTORS
        .iter()
        .filter_map(|extract| extract(reply))
        .find(|lon| lon.is_finite())
}

pub struct EphemerisAdapter<E> {
    engine: E,
    flags: i32,
}

impl<E: EphemerisEngine> EphemerisAdapter<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            flags: SEFLG_MOSEPH | SEFLG_SPEED,
        }
    }

    pub fn with_flags(mut self, flags: i32) -> Self {
        self.flags = flags;
        self
    }

    fn entry_for(&self, capability: Capability) -> Result<&'static str, EphemerisError> {
        capability
            .candidates()
            .iter()
            .copied()
            .find(|entry| self.engine.provides(entry))
            .ok_or(EphemerisError::MissingEntryPoint(capability))
    }

    /// Invokes and rejects engine-signalled failures: a fault from the
    /// call itself, a null reply, or a non-null `error` field.
    fn checked_invoke(&self, entry: &str, call: &EngineCall) -> Result<Value, EphemerisError> {
        let reply = self
            .engine
            .invoke(entry, call)
            .map_err(|fault| EphemerisError::Engine(fault.message))?;
        if reply.is_null() {
            return Err(EphemerisError::Engine(format!("{entry} failed")));
        }
        match reply.get("error") {
            Some(error) if !error.is_null() => {
                let message = error
                    .as_str()
                    .map(str::to_owned)
                    .unwrap_or_else(|| format!("{entry} failed"));
                Err(EphemerisError::Engine(message))
            }
            _ => Ok(reply),
        }
    }

    /// Converts a civil UTC date/time to a Julian day.
    ///
    /// The first attempt carries the Gregorian calendar flag; if that call
    /// form fails, retry once with the shorter form omitting it, because
    /// the installed binding's signature varies. No other retries.
    pub async fn julian_day(
        &self,
        year: i32,
        month: u8,
        day: u8,
        hour_ut: f64,
    ) -> Result<f64, EphemerisError> {
        let entry = self.entry_for(Capability::JulianDay)?;
        let flagged = EngineCall::JulianDay {
            year,
            month,
            day,
            hour_ut,
            calendar: Some(GREGORIAN),
        };
        let reply = match self.engine.invoke(entry, &flagged) {
            Ok(reply) => reply,
            Err(_) => {
                let bare = EngineCall::JulianDay {
                    year,
                    month,
                    day,
                    hour_ut,
                    calendar: None,
                };
                self.engine
                    .invoke(entry, &bare)
                    .map_err(|fault| EphemerisError::Engine(fault.message))?
            }
        };
        reply
            .as_f64()
            .filter(|jd| jd.is_finite())
            .ok_or(EphemerisError::InvalidJulianDay)
    }

    /// Computes the ecliptic longitude of one body at `julian_day`.
    pub async fn body_position(
        &self,
        julian_day: f64,
        body: &CelestialBodySpec,
    ) -> Result<f64, EphemerisError> {
        let entry = self.entry_for(Capability::BodyPosition)?;
        let call = EngineCall::BodyPosition {
            julian_day,
            body: body.engine_id,
            flags: self.flags,
        };
        let reply = self.checked_invoke(entry, &call)?;
        extract_longitude(&reply).ok_or(EphemerisError::InvalidLongitude)
    }

    /// Computes the Placidus house cusps and chart angles.
    pub async fn houses(
        &self,
        julian_day: f64,
        latitude: f64,
        longitude: f64,
    ) -> Result<HouseData, EphemerisError> {
        let entry = self.entry_for(Capability::Houses)?;
        let call = EngineCall::Houses {
            julian_day,
            latitude,
            longitude,
            system: HOUSE_SYSTEM,
        };
        let reply = self.checked_invoke(entry, &call)?;
        Ok(HouseData {
            cusps: cusp_array(&reply)?,
            ascendant: finite_field(&reply, "ascendant")?,
            midheaven: finite_field(&reply, "mc")?,
        })
    }
}

fn finite_field(reply: &Value, field: &str) -> Result<f64, EphemerisError> {
    reply
        .get(field)
        .and_then(Value::as_f64)
        .filter(|value| value.is_finite())
        .ok_or_else(|| EphemerisError::Engine(format!("houses reply missing finite `{field}`")))
}

fn cusp_array(reply: &Value) -> Result<[f64; 12], EphemerisError> {
    let raw = ["house", "cusps"]
        .iter()
        .find_map(|field| reply.get(*field).and_then(Value::as_array))
        .ok_or(EphemerisError::InvalidCusps(0))?;
    // 1-based bindings ship 13 entries with a leading placeholder.
    let slice = if raw.len() == 13 { &raw[1..] } else { &raw[..] };
    if slice.len() != 12 {
        return Err(EphemerisError::InvalidCusps(raw.len()));
    }
    let mut cusps = [0.0f64; 12];
    for (slot, value) in cusps.iter_mut().zip(slice) {
        *slot = value
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or(EphemerisError::InvalidCusps(raw.len()))?;
    }
    Ok(cusps)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde_json::json;

    use super::*;

    type Reply = Box<dyn Fn(&str, &EngineCall) -> Result<Value, EngineFault> + Send + Sync>;

    struct ScriptedEngine {
        entries: &'static [&'static str],
        reply: Reply,
    }

    impl ScriptedEngine {
        fn new(
            entries: &'static [&'static str],
            reply: impl Fn(&str, &EngineCall) -> Result<Value, EngineFault> + Send + Sync + 'static,
        ) -> Self {
            Self {
                entries,
                reply: Box::new(reply),
            }
        }
    }

    impl EphemerisEngine for ScriptedEngine {
        fn provides(&self, entry: &str) -> bool {
            self.entries.contains(&entry)
        }

        fn invoke(&self, entry: &str, call: &EngineCall) -> Result<Value, EngineFault> {
            (self.reply)(entry, call)
        }
    }

    const SUN: CelestialBodySpec = CelestialBodySpec {
        name: "Sun",
        engine_id: 0,
    };

    #[tokio::test]
    async fn longitude_read_from_data_sequence() {
        let engine = ScriptedEngine::new(&["calc_ut"], |_, _| {
            Ok(json!({ "data": [123.4, 0.0, 1.0] }))
        });
        let adapter = EphemerisAdapter::new(engine);
        assert_eq!(adapter.body_position(2440000.0, &SUN).await.unwrap(), 123.4);
    }

    #[tokio::test]
    async fn longitude_read_from_direct_field() {
        let engine = ScriptedEngine::new(&["calc_ut"], |_, _| Ok(json!({ "longitude": 210.0 })));
        let adapter = EphemerisAdapter::new(engine);
        assert_eq!(adapter.body_position(2440000.0, &SUN).await.unwrap(), 210.0);
    }

    #[tokio::test]
    async fn data_sequence_takes_priority_over_field() {
        let engine = ScriptedEngine::new(&["calc_ut"], |_, _| {
            Ok(json!({ "data": [5.0], "longitude": 99.0 }))
        });
        let adapter = EphemerisAdapter::new(engine);
        assert_eq!(adapter.body_position(2440000.0, &SUN).await.unwrap(), 5.0);
    }

    #[tokio::test]
    async fn non_numeric_data_falls_through_to_next_shape() {
        let engine = ScriptedEngine::new(&["calc_ut"], |_, _| {
            Ok(json!({ "data": [null], "longitude": 250.5 }))
        });
        let adapter = EphemerisAdapter::new(engine);
        assert_eq!(adapter.body_position(2440000.0, &SUN).await.unwrap(), 250.5);
    }

    #[tokio::test]
    async fn missing_longitude_in_every_shape_is_rejected() {
        let engine = ScriptedEngine::new(&["calc_ut"], |_, _| Ok(json!({ "flag": 258 })));
        let adapter = EphemerisAdapter::new(engine);
        assert!(matches!(
            adapter.body_position(2440000.0, &SUN).await,
            Err(EphemerisError::InvalidLongitude)
        ));
    }

    #[tokio::test]
    async fn engine_error_field_is_propagated() {
        let engine =
            ScriptedEngine::new(&["calc_ut"], |_, _| Ok(json!({ "error": "kaput orbit" })));
        let adapter = EphemerisAdapter::new(engine);
        match adapter.body_position(2440000.0, &SUN).await {
            Err(EphemerisError::Engine(message)) => assert_eq!(message, "kaput orbit"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn null_reply_gets_generic_failure_message() {
        let engine = ScriptedEngine::new(&["calc_ut"], |_, _| Ok(Value::Null));
        let adapter = EphemerisAdapter::new(engine);
        match adapter.body_position(2440000.0, &SUN).await {
            Err(EphemerisError::Engine(message)) => assert_eq!(message, "calc_ut failed"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_entry_point_names_the_capability() {
        let engine = ScriptedEngine::new(&["calc_ut"], |_, _| Ok(Value::Null));
        let adapter = EphemerisAdapter::new(engine);
        match adapter.julian_day(1965, 11, 7, 10.0).await {
            Err(err @ EphemerisError::MissingEntryPoint(Capability::JulianDay)) => {
                assert!(err.to_string().contains("julian-day"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn later_entry_name_is_used_when_first_is_absent() {
        let engine = ScriptedEngine::new(&["swe_calc_ut"], |entry, _| {
            assert_eq!(entry, "swe_calc_ut");
            Ok(json!({ "longitude": 42.0 }))
        });
        let adapter = EphemerisAdapter::new(engine);
        assert_eq!(adapter.body_position(2440000.0, &SUN).await.unwrap(), 42.0);
    }

    #[tokio::test]
    async fn julian_day_retries_once_without_calendar_flag() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = attempts.clone();
        let engine = ScriptedEngine::new(&["julday_ut"], move |_, call| {
            seen.fetch_add(1, Ordering::SeqCst);
            match call {
                EngineCall::JulianDay {
                    calendar: Some(_), ..
                } => Err(EngineFault::new("bad signature")),
                EngineCall::JulianDay { calendar: None, .. } => Ok(json!(2439071.9166666665)),
                other => panic!("unexpected call: {other:?}"),
            }
        });
        let adapter = EphemerisAdapter::new(engine);
        let jd = adapter.julian_day(1965, 11, 7, 10.0).await.unwrap();
        assert_eq!(jd, 2439071.9166666665);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn julian_day_prefers_the_calendar_flagged_form() {
        let engine = ScriptedEngine::new(&["julday_ut"], |_, call| match call {
            EngineCall::JulianDay {
                calendar: Some(GREGORIAN),
                year: 1965,
                month: 11,
                day: 7,
                ..
            } => Ok(json!(2439071.9166666665)),
            other => panic!("unexpected call: {other:?}"),
        });
        let adapter = EphemerisAdapter::new(engine);
        assert!(adapter.julian_day(1965, 11, 7, 10.0).await.is_ok());
    }

    #[tokio::test]
    async fn houses_reply_maps_to_house_data() {
        let engine = ScriptedEngine::new(&["houses"], |_, call| {
            match call {
                EngineCall::Houses { system: 'P', .. } => {}
                other => panic!("unexpected call: {other:?}"),
            }
            Ok(json!({
                "house": [10.0, 40.0, 70.0, 100.0, 130.0, 160.0,
                          190.0, 220.0, 250.0, 280.0, 310.0, 340.0],
                "ascendant": 100.5,
                "mc": 12.25,
            }))
        });
        let adapter = EphemerisAdapter::new(engine);
        let houses = adapter.houses(2440000.0, 40.7, -74.0).await.unwrap();
        assert_eq!(houses.cusps[0], 10.0);
        assert_eq!(houses.cusps[11], 340.0);
        assert_eq!(houses.ascendant, 100.5);
        assert_eq!(houses.midheaven, 12.25);
    }

    #[tokio::test]
    async fn one_based_cusp_array_drops_leading_placeholder() {
        let engine = ScriptedEngine::new(&["houses"], |_, _| {
            Ok(json!({
                "cusps": [0.0, 10.0, 40.0, 70.0, 100.0, 130.0, 160.0,
                          190.0, 220.0, 250.0, 280.0, 310.0, 340.0],
                "ascendant": 100.5,
                "mc": 12.25,
            }))
        });
        let adapter = EphemerisAdapter::new(engine);
        let houses = adapter.houses(2440000.0, 40.7, -74.0).await.unwrap();
        assert_eq!(houses.cusps[0], 10.0);
        assert_eq!(houses.cusps[11], 340.0);
    }

    #[tokio::test]
    async fn short_cusp_array_is_rejected() {
        let engine = ScriptedEngine::new(&["houses"], |_, _| {
            Ok(json!({
                "house": [10.0, 40.0, 70.0],
                "ascendant": 100.5,
                "mc": 12.25,
            }))
        });
        let adapter = EphemerisAdapter::new(engine);
        assert!(matches!(
            adapter.houses(2440000.0, 40.7, -74.0).await,
            Err(EphemerisError::InvalidCusps(3))
        ));
    }
}
