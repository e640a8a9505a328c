//! Error taxonomy for the chart pipeline.
//!
//! Every variant is terminal for the current request; the caller maps them
//! to user-visible statuses. Nothing here is retried beyond the provider
//! fallback and the single Julian-day call-shape retry.

use thiserror::Error;

use crate::infra::ephemeris::EphemerisError;
use crate::infra::geocode::ProviderError;

#[derive(Debug, Error)]
pub enum ChartError {
    /// Request input rejected before any provider or engine call.
    #[error("invalid input: {0}")]
    Input(String),

    /// Both geocoding providers were exhausted. Carries the fallback
    /// provider's error; the primary failure is discarded (see DESIGN.md).
    #[error("geocoding failed: {0}")]
    Geocode(#[from] ProviderError),

    #[error(transparent)]
    Ephemeris(#[from] EphemerisError),
}
