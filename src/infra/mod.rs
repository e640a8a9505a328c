//! Collaborator-facing infrastructure: the ephemeris engine adapter and
//! the geocoding providers with their memo cache.

pub mod cache;
pub mod ephemeris;
pub mod geocode;
