//! Geographic enrichment using the MaxMind GeoLite2-City database
//!
//! Enrichment is best-effort: any lookup failure yields the unknown
//! sentinel and never blocks the pipeline. The database file must be
//! downloaded separately from MaxMind (free with registration).

use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use maxminddb::{geoip2, Reader};
use thiserror::Error;

use crate::models::GeoMetadata;

#[derive(Error, Debug)]
pub enum GeoError {
    #[error("Failed to open database: {0}")]
    DatabaseOpen(#[from] maxminddb::MaxMindDBError),

    #[error("Database file not found: {0}")]
    FileNotFound(String),
}

/// GeoIP lookup service wrapping the GeoLite2-City reader
pub struct GeoEnricher {
    reader: Arc<Reader<Vec<u8>>>,
}

impl GeoEnricher {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, GeoError> {
        let path = db_path.as_ref();
        if !path.exists() {
            return Err(GeoError::FileNotFound(path.display().to_string()));
        }

        let reader = Reader::open_readfile(path)?;
        Ok(GeoEnricher {
            reader: Arc::new(reader),
        })
    }

    /// Locate an IP. Misses (private ranges, absent records, missing
    /// coordinates) all collapse to the unknown sentinel.
    pub fn locate(&self, ip: &IpAddr) -> GeoMetadata {
        let city: geoip2::City = match self.reader.lookup(*ip) {
            Ok(city) => city,
            Err(maxminddb::MaxMindDBError::AddressNotFoundError(_)) => {
                return GeoMetadata::unknown();
            }
            Err(e) => {
                log::debug!("geo lookup failed for {}: {}", ip, e);
                return GeoMetadata::unknown();
            }
        };

        let (latitude, longitude) = match city.location.as_ref() {
            Some(loc) => (loc.latitude.unwrap_or(0.0), loc.longitude.unwrap_or(0.0)),
            None => return GeoMetadata::unknown(),
        };

        let country = city
            .country
            .as_ref()
            .and_then(|c| c.names.as_ref())
            .and_then(|n| n.get("en").copied())
            .unwrap_or("Unknown")
            .to_string();

        let city_name = city
            .city
            .as_ref()
            .and_then(|c| c.names.as_ref())
            .and_then(|n| n.get("en").copied())
            .unwrap_or("Unknown")
            .to_string();

        let region_code = city
            .subdivisions
            .as_ref()
            .and_then(|s| s.first())
            .and_then(|s| s.iso_code)
            .or(city.country.as_ref().and_then(|c| c.iso_code))
            .unwrap_or("")
            .to_string();

        GeoMetadata {
            country,
            city: city_name,
            latitude,
            longitude,
            region_code,
        }
    }
}

impl Clone for GeoEnricher {
    fn clone(&self) -> Self {
        GeoEnricher {
            reader: Arc::clone(&self.reader),
        }
    }
}
