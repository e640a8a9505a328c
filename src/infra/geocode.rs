//! Free-text place resolution.
//!
//! Primary: Nominatim (OpenStreetMap). Fallback: Photon (Komoot).
//! Nominatim returns 403 when the User-Agent is missing or traffic is
//! heavy, so any primary failure rolls over to Photon uniformly.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Url};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::domain::{GeocodeResult, GeocodeSource};
use crate::error::ChartError;
use crate::infra::cache::GeocodeCache;

const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org/search";
const PHOTON_BASE_URL: &str = "https://photon.komoot.io/api/";
const USER_AGENT: &str = concat!("astrochart/", env!("CARGO_PKG_VERSION"));

/// Per-call network timeout; exceeding it aborts the in-flight request
/// and counts as that provider's failure.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(9000);

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned HTTP {0}")]
    Status(u16),
    #[error("no results for query")]
    NoResults,
    #[error("invalid coordinates in response")]
    InvalidCoordinates,
    #[error("malformed response body: {0}")]
    Decode(String),
}

/// Coordinates plus label, before the resolver stamps the source slot.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedPlace {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
}

/// One geocoding service. The raw (untrimmed) query goes over the wire;
/// normalization only shapes the cache key.
pub trait GeocodeProvider: Send + Sync {
    fn lookup(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<ResolvedPlace, ProviderError>> + Send;
}

/// Resolves place names through a primary/fallback provider pair, memoizing
/// successes in an injected bounded cache.
pub struct PlaceResolver<P, F> {
    primary: P,
    fallback: F,
    cache: Arc<Mutex<GeocodeCache>>,
}

impl<P: GeocodeProvider, F: GeocodeProvider> PlaceResolver<P, F> {
    pub fn new(primary: P, fallback: F, cache: Arc<Mutex<GeocodeCache>>) -> Self {
        Self {
            primary,
            fallback,
            cache,
        }
    }

    /// Resolves `query` to coordinates.
    ///
    /// The cache key is the trimmed, lower-cased query; an empty key is
    /// rejected before touching the cache or either provider. A cache hit
    /// returns the prior result with no network access. On a miss the
    /// primary is tried first; any primary failure triggers the fallback
    /// without inspecting the reason, and when both fail the fallback's
    /// error is the one propagated. Failures are never cached.
    pub async fn resolve_place(&self, query: &str) -> Result<GeocodeResult, ChartError> {
        let key = query.trim().to_lowercase();
        if key.is_empty() {
            return Err(ChartError::Input("empty place query".into()));
        }
        if let Some(hit) = self.cache.lock().await.get(&key) {
            return Ok(hit.clone());
        }

        let (place, source) = match self.primary.lookup(query).await {
            Ok(place) => (place, GeocodeSource::Primary),
            Err(_) => {
                println!("[geocode] primary provider failed, trying fallback");
                (self.fallback.lookup(query).await?, GeocodeSource::Fallback)
            }
        };

        let result = GeocodeResult {
            latitude: place.latitude,
            longitude: place.longitude,
            display_name: place.display_name,
            source,
        };
        self.cache.lock().await.insert(key, result.clone());
        Ok(result)
    }
}

impl PlaceResolver<Nominatim, Photon> {
    /// Resolver wired to the live providers with a fresh bounded cache.
    pub fn over_http() -> Result<Self, ProviderError> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::new(
            Nominatim::new(http.clone())?,
            Photon::new(http)?,
            Arc::new(Mutex::new(GeocodeCache::default())),
        ))
    }
}

/// OpenStreetMap's Nominatim search endpoint. Results arrive as a JSON
/// list ordered best-first, with latitude/longitude as string fields.
pub struct Nominatim {
    http: Client,
    base_url: Url,
    timeout: Duration,
}

impl Nominatim {
    pub fn new(http: Client) -> Result<Self, ProviderError> {
        Self::with_base_url(http, NOMINATIM_BASE_URL)
    }

    pub fn with_base_url(http: Client, base: &str) -> Result<Self, ProviderError> {
        Ok(Self {
            http,
            base_url: Url::parse(base)?,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl GeocodeProvider for Nominatim {
    async fn lookup(&self, query: &str) -> Result<ResolvedPlace, ProviderError> {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("format", "json")
            .append_pair("limit", "1")
            .append_pair("addressdetails", "1");

        let response = self
            .http
            .get(url)
            .timeout(self.timeout)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }
        let body = response.text().await?;
        parse_nominatim(&body, query)
    }
}

/// Komoot's Photon endpoint. Results arrive as a GeoJSON feature
/// collection whose coordinates are ordered [longitude, latitude] —
/// the inverse of Nominatim.
pub struct Photon {
    http: Client,
    base_url: Url,
    timeout: Duration,
}

impl Photon {
    pub fn new(http: Client) -> Result<Self, ProviderError> {
        Self::with_base_url(http, PHOTON_BASE_URL)
    }

    pub fn with_base_url(http: Client, base: &str) -> Result<Self, ProviderError> {
        Ok(Self {
            http,
            base_url: Url::parse(base)?,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl GeocodeProvider for Photon {
    async fn lookup(&self, query: &str) -> Result<ResolvedPlace, ProviderError> {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("limit", "1");

        let response = self
            .http
            .get(url)
            .timeout(self.timeout)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }
        let body = response.text().await?;
        parse_photon(&body, query)
    }
}

#[derive(Debug, Deserialize)]
struct NominatimHit {
    #[serde(deserialize_with = "string_from_json")]
    lat: String,
    #[serde(deserialize_with = "string_from_json")]
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

fn parse_nominatim(body: &str, query: &str) -> Result<ResolvedPlace, ProviderError> {
    let hits: Vec<NominatimHit> =
        serde_json::from_str(body).map_err(|err| ProviderError::Decode(err.to_string()))?;
    let hit = hits.into_iter().next().ok_or(ProviderError::NoResults)?;
    Ok(ResolvedPlace {
        latitude: parse_coordinate(&hit.lat)?,
        longitude: parse_coordinate(&hit.lon)?,
        display_name: hit.display_name.unwrap_or_else(|| query.to_string()),
    })
}

#[derive(Debug, Deserialize)]
struct PhotonResponse {
    #[serde(default)]
    features: Vec<PhotonFeature>,
}

#[derive(Debug, Deserialize)]
struct PhotonFeature {
    geometry: PhotonGeometry,
    #[serde(default)]
    properties: PhotonProperties,
}

#[derive(Debug, Deserialize)]
struct PhotonGeometry {
    #[serde(default)]
    coordinates: Vec<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct PhotonProperties {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

fn parse_photon(body: &str, query: &str) -> Result<ResolvedPlace, ProviderError> {
    let response: PhotonResponse =
        serde_json::from_str(body).map_err(|err| ProviderError::Decode(err.to_string()))?;
    let feature = response
        .features
        .into_iter()
        .next()
        .ok_or(ProviderError::NoResults)?;
    let coords = feature.geometry.coordinates;
    if coords.len() < 2 {
        return Err(ProviderError::NoResults);
    }
    // GeoJSON order: [longitude, latitude].
    let (longitude, latitude) = (coords[0], coords[1]);
    if !latitude.is_finite() || !longitude.is_finite() {
        return Err(ProviderError::InvalidCoordinates);
    }

    let props = feature.properties;
    let display_name = if props.name.as_deref().is_some_and(|n| !n.is_empty()) {
        [props.name, props.city, props.country]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    } else {
        query.to_string()
    };

    Ok(ResolvedPlace {
        latitude,
        longitude,
        display_name,
    })
}

fn parse_coordinate(raw: &str) -> Result<f64, ProviderError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or(ProviderError::InvalidCoordinates)
}

/// Accepts a string or a bare number for fields some deployments encode
/// either way.
fn string_from_json<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct StringOrNumber;

    impl serde::de::Visitor<'_> for StringOrNumber {
        type Value = String;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or number")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(StringOrNumber)
}
