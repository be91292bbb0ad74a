//! Spatial reference systems and coordinate transforms.
//!
//! Projection handles are cached per worker: each concurrent task owns its own
//! [SrsCache] and populates it lazily, so no handle is ever shared across threads.
//! Projection math is implemented natively for the reference systems the catalog
//! supports; geographic coordinates are degrees at the API boundary and radians
//! internally.

use hashbrown::HashMap;

use crate::error::GeosliceError;

/// Semi-major axis of the WGS84 spheroid in meters, used by spherical Mercator.
const WGS84_SEMI_MAJOR_M: f64 = 6_378_137.0;

/// Radius of the MODIS authalic sphere in meters, used by the sinusoidal grid.
const MODIS_SPHERE_RADIUS_M: f64 = 6_371_007.181;

/// Latitude bound for spherical Mercator, the conventional web map cutoff in radians.
const MAX_MERCATOR_LAT_RAD: f64 = 85.05112878 * std::f64::consts::PI / 180.0;

/// EPSG:4326, geographic longitude/latitude in degrees.
pub const SRID_GEOGRAPHIC: u32 = 4326;

/// EPSG:3857, spherical (web) Mercator in meters.
pub const SRID_WEB_MERCATOR: u32 = 3857;

/// MODIS sinusoidal grid in meters, under its conventional private SRID.
pub const SRID_MODIS_SINUSOIDAL: u32 = 100001;

/// An initialised projection handle for one SRID.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpatialReference {
    srid: u32,
    projection: Projection,
}

/// The projection families this service can evaluate.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Projection {
    /// Plain longitude/latitude; no projection applied.
    Geographic,
    /// Spherical Mercator on a sphere of the given radius.
    Mercator { radius: f64 },
    /// Sinusoidal (equal-area) on a sphere of the given radius.
    Sinusoidal { radius: f64 },
}

impl SpatialReference {
    /// Build the projection handle for an SRID.
    ///
    /// Fails if the SRID is not one of the supported reference systems.
    pub fn resolve(srid: u32) -> Result<Self, GeosliceError> {
        let projection = match srid {
            SRID_GEOGRAPHIC => Projection::Geographic,
            SRID_WEB_MERCATOR => Projection::Mercator {
                radius: WGS84_SEMI_MAJOR_M,
            },
            SRID_MODIS_SINUSOIDAL => Projection::Sinusoidal {
                radius: MODIS_SPHERE_RADIUS_M,
            },
            _ => return Err(GeosliceError::UnknownSrid { srid }),
        };
        Ok(SpatialReference { srid, projection })
    }

    /// The SRID this handle was built for.
    pub fn srid(&self) -> u32 {
        self.srid
    }

    /// Returns true if coordinates in this system are geographic degrees.
    pub fn is_geographic(&self) -> bool {
        matches!(self.projection, Projection::Geographic)
    }

    /// Project geographic radians to this system's planar coordinates.
    fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        match self.projection {
            Projection::Geographic => (lon, lat),
            Projection::Mercator { radius } => {
                // Mercator is undefined at the poles; floating point tan() stays
                // finite there, so bound the latitude explicitly.
                if lat.abs() >= MAX_MERCATOR_LAT_RAD {
                    return (f64::NAN, f64::NAN);
                }
                let x = radius * lon;
                let y = radius * (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln();
                (x, y)
            }
            Projection::Sinusoidal { radius } => (radius * lon * lat.cos(), radius * lat),
        }
    }

    /// Unproject this system's planar coordinates to geographic radians.
    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        match self.projection {
            Projection::Geographic => (x, y),
            Projection::Mercator { radius } => {
                let lon = x / radius;
                let lat = 2.0 * (y / radius).exp().atan() - std::f64::consts::FRAC_PI_2;
                (lon, lat)
            }
            Projection::Sinusoidal { radius } => {
                let lat = y / radius;
                let lon = x / (radius * lat.cos());
                (lon, lat)
            }
        }
    }
}

/// Per-worker cache of initialised projection handles, keyed by SRID.
///
/// Built lazily; never shared between tasks.
#[derive(Debug, Default)]
pub struct SrsCache {
    handles: HashMap<u32, SpatialReference>,
}

impl SrsCache {
    /// Return a new, empty SrsCache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or build the projection handle for an SRID.
    pub fn get(&mut self, srid: u32) -> Result<&SpatialReference, GeosliceError> {
        if !self.handles.contains_key(&srid) {
            let handle = SpatialReference::resolve(srid)?;
            self.handles.insert_unique_unchecked(srid, handle);
        }
        Ok(&self.handles[&srid])
    }

    /// Transform a point between two reference systems.
    ///
    /// Geographic inputs are converted from degrees to radians before projecting, and
    /// back to degrees only when the destination is geographic. Fails if either SRID is
    /// unknown or the transform produces a non-finite coordinate.
    ///
    /// # Arguments
    ///
    /// * `source_srid`: Reference system of `(x, y)`
    /// * `target_srid`: Reference system of the result
    /// * `x`: Easting or longitude
    /// * `y`: Northing or latitude
    pub fn transform(
        &mut self,
        source_srid: u32,
        target_srid: u32,
        x: f64,
        y: f64,
    ) -> Result<(f64, f64), GeosliceError> {
        if source_srid == target_srid {
            self.get(source_srid)?;
            return Ok((x, y));
        }
        let source = *self.get(source_srid)?;
        let target = *self.get(target_srid)?;
        let (lon, lat) = if source.is_geographic() {
            (x.to_radians(), y.to_radians())
        } else {
            source.inverse(x, y)
        };
        let (out_x, out_y) = if target.is_geographic() {
            (lon.to_degrees(), lat.to_degrees())
        } else {
            target.forward(lon, lat)
        };
        if !out_x.is_finite() || !out_y.is_finite() {
            return Err(GeosliceError::Transform {
                source_srid,
                target_srid,
            });
        }
        Ok((out_x, out_y))
    }
}
