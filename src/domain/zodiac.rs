//! Ecliptic longitude to zodiac sign/degree mapping.

use std::fmt;

use serde::Serialize;

/// The 12 tropical signs, in ecliptic order starting at 0° Aries.
/// Serializes as the plain sign name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ZodiacSign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

impl ZodiacSign {
    pub const ALL: [ZodiacSign; 12] = [
        ZodiacSign::Aries,
        ZodiacSign::Taurus,
        ZodiacSign::Gemini,
        ZodiacSign::Cancer,
        ZodiacSign::Leo,
        ZodiacSign::Virgo,
        ZodiacSign::Libra,
        ZodiacSign::Scorpio,
        ZodiacSign::Sagittarius,
        ZodiacSign::Capricorn,
        ZodiacSign::Aquarius,
        ZodiacSign::Pisces,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ZodiacSign::Aries => "Aries",
            ZodiacSign::Taurus => "Taurus",
            ZodiacSign::Gemini => "Gemini",
            ZodiacSign::Cancer => "Cancer",
            ZodiacSign::Leo => "Leo",
            ZodiacSign::Virgo => "Virgo",
            ZodiacSign::Libra => "Libra",
            ZodiacSign::Scorpio => "Scorpio",
            ZodiacSign::Sagittarius => "Sagittarius",
            ZodiacSign::Capricorn => "Capricorn",
            ZodiacSign::Aquarius => "Aquarius",
            ZodiacSign::Pisces => "Pisces",
        }
    }
}

impl fmt::Display for ZodiacSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A longitude folded into a sign plus degree-within-sign.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ZodiacPosition {
    pub sign: ZodiacSign,
    pub degree: f64,
}

impl ZodiacPosition {
    /// Maps an ecliptic longitude in degrees to its sign and degree.
    ///
    /// Accepts any finite input, including negative values and values
    /// ≥ 360; the longitude is wrapped into [0,360) with a floored
    /// modulo first. The resulting degree is always in [0,30).
    pub fn from_longitude(longitude: f64) -> Self {
        let mut wrapped = longitude.rem_euclid(360.0);
        // rem_euclid of a tiny negative rounds up to exactly 360.0.
        if wrapped >= 360.0 {
            wrapped = 0.0;
        }
        let index = (wrapped / 30.0).floor() as usize;
        ZodiacPosition {
            sign: ZodiacSign::ALL[index],
            degree: wrapped - index as f64 * 30.0,
        }
    }
}
