use serde::Serialize;

use crate::domain::zodiac::{ZodiacPosition, ZodiacSign};

/// One row of the fixed celestial body table: display name plus the
/// engine-side body identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CelestialBodySpec {
    pub name: &'static str,
    pub engine_id: i32,
}

/// The bodies every chart carries, in computation order. Immutable for
/// the process lifetime; Ascendant and Midheaven are appended separately.
pub const CELESTIAL_BODIES: [CelestialBodySpec; 11] = [
    CelestialBodySpec { name: "Sun", engine_id: 0 },
    CelestialBodySpec { name: "Moon", engine_id: 1 },
    CelestialBodySpec { name: "Mercury", engine_id: 2 },
    CelestialBodySpec { name: "Venus", engine_id: 3 },
    CelestialBodySpec { name: "Mars", engine_id: 4 },
    CelestialBodySpec { name: "Jupiter", engine_id: 5 },
    CelestialBodySpec { name: "Saturn", engine_id: 6 },
    CelestialBodySpec { name: "Uranus", engine_id: 7 },
    CelestialBodySpec { name: "Neptune", engine_id: 8 },
    CelestialBodySpec { name: "Pluto", engine_id: 9 },
    CelestialBodySpec { name: "True Node", engine_id: 11 },
];

/// One chart entry: a planet/point with its raw longitude and the derived
/// sign/degree. `meaning` is reserved for interpretation text and is
/// currently always empty.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BodyReading {
    pub name: String,
    pub longitude: f64,
    pub sign: ZodiacSign,
    pub degree: f64,
    pub meaning: String,
}

impl BodyReading {
    pub fn new(name: impl Into<String>, longitude: f64) -> Self {
        let ZodiacPosition { sign, degree } = ZodiacPosition::from_longitude(longitude);
        Self {
            name: name.into(),
            longitude,
            sign,
            degree,
            meaning: String::new(),
        }
    }
}

/// House cusps plus the two chart angles. The 12-cusp invariant lives in
/// the array type.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HouseData {
    pub cusps: [f64; 12],
    pub ascendant: f64,
    pub midheaven: f64,
}

/// The assembled chart, built atomically per request and serialized
/// verbatim as the success payload.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub place: String,
    pub latitude: f64,
    pub longitude: f64,
    pub year: i32,
    pub month: u8,
    pub day: u8,
    #[serde(rename = "hourUT")]
    pub hour_ut: f64,
    pub house_system: char,
    pub bodies: Vec<BodyReading>,
    pub houses: HouseData,
}

/// Which resolver slot produced a geocode hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GeocodeSource {
    Primary,
    Fallback,
}

/// A resolved place, as cached and as returned to the caller.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeResult {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
    pub source: GeocodeSource,
}
