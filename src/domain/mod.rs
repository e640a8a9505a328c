//! Domain types for the chart pipeline.

pub mod entities;
pub mod zodiac;

pub use entities::{
    BodyReading, CelestialBodySpec, Chart, GeocodeResult, GeocodeSource, HouseData,
    CELESTIAL_BODIES,
};
pub use zodiac::{ZodiacPosition, ZodiacSign};
