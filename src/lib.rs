//! Astrological chart computation.
//!
//! Two-stage pipeline: a free-text place is resolved to coordinates via a
//! primary geocoding provider with a fallback ([`PlaceResolver`]), then the
//! chart (planets, ascendant, midheaven, house cusps) is assembled over an
//! external ephemeris engine ([`ChartAssembler`]). The HTTP layer that
//! validates requests and maps errors to statuses lives outside this crate.

pub mod chart;
pub mod domain;
pub mod error;
pub mod infra;

pub use chart::{ChartAssembler, ChartRequest};
pub use domain::{
    BodyReading, Chart, GeocodeResult, GeocodeSource, HouseData, ZodiacPosition, ZodiacSign,
};
pub use error::ChartError;
pub use infra::ephemeris::{EphemerisAdapter, EphemerisEngine};
pub use infra::geocode::PlaceResolver;
