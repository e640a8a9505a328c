//! Chart assembly over the ephemeris adapter.

use time::{OffsetDateTime, UtcOffset};

use crate::domain::{BodyReading, Chart, CELESTIAL_BODIES};
use crate::error::ChartError;
use crate::infra::ephemeris::{EphemerisAdapter, EphemerisEngine, HOUSE_SYSTEM};

/// Inputs for one chart computation. The caller has already validated the
/// instant and supplied finite coordinates (directly or via the resolver).
#[derive(Clone, Debug)]
pub struct ChartRequest {
    pub timestamp: OffsetDateTime,
    pub latitude: f64,
    pub longitude: f64,
    pub place: String,
}

/// Civil UTC parts in the form the engine expects.
struct CivilUt {
    year: i32,
    month: u8,
    day: u8,
    hour_ut: f64,
}

fn to_civil_ut(timestamp: OffsetDateTime) -> CivilUt {
    let utc = timestamp.to_offset(UtcOffset::UTC);
    CivilUt {
        year: utc.year(),
        month: u8::from(utc.month()),
        day: utc.day(),
        hour_ut: f64::from(utc.hour())
            + f64::from(utc.minute()) / 60.0
            + f64::from(utc.second()) / 3600.0,
    }
}

pub struct ChartAssembler<E> {
    adapter: EphemerisAdapter<E>,
}

impl<E: EphemerisEngine> ChartAssembler<E> {
    pub fn new(adapter: EphemerisAdapter<E>) -> Self {
        Self { adapter }
    }

    /// Computes the full chart for one request.
    ///
    /// The Julian day is obtained once and reused for every
    /// sub-computation so all values are temporally consistent. Houses
    /// come first (the ascendant and midheaven join the body list), then
    /// each body in table order — sequentially, to bound concurrent load
    /// on the engine. Any single failure aborts the whole chart.
    pub async fn compute_chart(&self, request: &ChartRequest) -> Result<Chart, ChartError> {
        let civil = to_civil_ut(request.timestamp);
        let julian_day = self
            .adapter
            .julian_day(civil.year, civil.month, civil.day, civil.hour_ut)
            .await?;

        let houses = self
            .adapter
            .houses(julian_day, request.latitude, request.longitude)
            .await?;

        let mut bodies = Vec::with_capacity(CELESTIAL_BODIES.len() + 2);
        for body in &CELESTIAL_BODIES {
            let longitude = self.adapter.body_position(julian_day, body).await?;
            bodies.push(BodyReading::new(body.name, longitude));
        }
        bodies.push(BodyReading::new("Ascendant", houses.ascendant));
        bodies.push(BodyReading::new("Midheaven", houses.midheaven));

        Ok(Chart {
            place: request.place.clone(),
            latitude: request.latitude,
            longitude: request.longitude,
            year: civil.year,
            month: civil.month,
            day: civil.day,
            hour_ut: civil.hour_ut,
            house_system: HOUSE_SYSTEM,
            bodies,
            houses,
        })
    }
}
