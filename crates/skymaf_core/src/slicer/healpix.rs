//! Equal-area sky pixelization (HEALPix, RING ordering).
//!
//! Pixel count is fixed by `nside` (`12 * nside^2` pixels), independent of the
//! data. Every pixel is a slice, so sparse sky coverage produces masked entries
//! rather than a shorter result array.

use std::f64::consts::{FRAC_2_PI, PI, TAU};

use serde::{Deserialize, Serialize};

use crate::error::{MafError, Result};
use crate::table::Table;

use super::{Partition, SliceGeometry, SlicePoint, Slicer};

/// Largest supported resolution (about 12.6 million pixels)
pub const MAX_NSIDE: u32 = 1024;

fn default_nside() -> u32 {
    128
}

fn default_lon_col() -> String {
    "fieldRA".to_string()
}

fn default_lat_col() -> String {
    "fieldDec".to_string()
}

fn default_true() -> bool {
    true
}

/// Healpix slicer configuration; dithered pointings are selected by naming
/// the already-materialized dither columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealpixConfig {
    #[serde(default = "default_nside")]
    pub nside: u32,
    #[serde(default = "default_lon_col")]
    pub lon_col: String,
    #[serde(default = "default_lat_col")]
    pub lat_col: String,
    /// Coordinates are in degrees (otherwise radians)
    #[serde(default = "default_true")]
    pub lat_lon_deg: bool,
}

impl Default for HealpixConfig {
    fn default() -> Self {
        Self {
            nside: default_nside(),
            lon_col: default_lon_col(),
            lat_col: default_lat_col(),
            lat_lon_deg: true,
        }
    }
}

impl HealpixConfig {
    #[must_use]
    pub fn with_nside(mut self, nside: u32) -> Self {
        self.nside = nside;
        self
    }

    #[must_use]
    pub fn with_columns(mut self, lon_col: impl Into<String>, lat_col: impl Into<String>) -> Self {
        self.lon_col = lon_col.into();
        self.lat_col = lat_col.into();
        self
    }

    #[must_use]
    pub fn npix(&self) -> usize {
        12 * (self.nside as usize).pow(2)
    }
}

/// Integer square root, exact for all `i64` values we produce
fn isqrt(v: i64) -> i64 {
    let mut r = (v as f64).sqrt() as i64;
    while r * r > v {
        r -= 1;
    }
    while (r + 1) * (r + 1) <= v {
        r += 1;
    }
    r
}

/// Pixel holding colatitude `theta` and longitude `phi` (radians).
///
/// Returns `None` for non-finite input or `theta` outside `[0, pi]`.
#[must_use]
pub fn ang2pix_ring(nside: u32, theta: f64, phi: f64) -> Option<u64> {
    if nside == 0 || !theta.is_finite() || !phi.is_finite() || !(0.0..=PI).contains(&theta) {
        return None;
    }
    let ns = i64::from(nside);
    let nsf = f64::from(nside);
    let npix = 12 * ns * ns;
    let ncap = 2 * ns * (ns - 1);
    let nl4 = 4 * ns;

    let z = theta.cos();
    let za = z.abs();
    let mut tt = phi.rem_euclid(TAU) * FRAC_2_PI;
    if tt >= 4.0 {
        tt -= 4.0;
    }

    let pix = if za <= 2.0 / 3.0 {
        // Equatorial belt: index along the ascending and descending edge lines
        let temp1 = nsf * (0.5 + tt);
        let temp2 = nsf * z * 0.75;
        let jp = (temp1 - temp2) as i64;
        let jm = (temp1 + temp2) as i64;
        let ir = ns + 1 + jp - jm;
        let kshift = 1 - (ir & 1);
        let ip = ((jp + jm - ns + kshift + 1) / 2).rem_euclid(nl4);
        ncap + (ir - 1) * nl4 + ip
    } else {
        // Polar caps
        let tp = tt - tt.floor();
        let tmp = nsf * (3.0 * (1.0 - za)).sqrt();
        let jp = (tp * tmp) as i64;
        let jm = ((1.0 - tp) * tmp) as i64;
        let ir = jp + jm + 1;
        let ip = ((tt * ir as f64) as i64).rem_euclid(4 * ir);
        if z > 0.0 {
            2 * ir * (ir - 1) + ip
        } else {
            npix - 2 * ir * (ir + 1) + ip
        }
    };
    u64::try_from(pix).ok().filter(|&p| p < npix as u64)
}

/// Center of pixel `pix` as `(theta, phi)` in radians
#[must_use]
pub fn pix2ang_ring(nside: u32, pix: u64) -> Option<(f64, f64)> {
    let ns = i64::from(nside);
    let npix = 12 * ns * ns;
    let pix = i64::try_from(pix).ok().filter(|&p| nside > 0 && p < npix)?;
    let ncap = 2 * ns * (ns - 1);
    let nl4 = 4 * ns;
    let fact2 = 4.0 / npix as f64;
    let fact1 = (2 * ns) as f64 * fact2;

    let (z, phi) = if pix < ncap {
        let iring = (1 + isqrt(1 + 2 * pix)) >> 1;
        let iphi = pix + 1 - 2 * iring * (iring - 1);
        let z = 1.0 - (iring * iring) as f64 * fact2;
        (z, (iphi as f64 - 0.5) * PI / (2 * iring) as f64)
    } else if pix < npix - ncap {
        let ip = pix - ncap;
        let tmp = ip / nl4;
        let iring = tmp + ns;
        let iphi = ip - nl4 * tmp + 1;
        let fodd = if (iring + ns) & 1 == 1 { 1.0 } else { 0.5 };
        let z = (2 * ns - iring) as f64 * fact1;
        (z, (iphi as f64 - fodd) * PI * 0.75 * fact1)
    } else {
        let ip = npix - pix;
        let iring = (1 + isqrt(2 * ip - 1)) >> 1;
        let iphi = 4 * iring + 1 - (ip - 2 * iring * (iring - 1));
        let z = -1.0 + (iring * iring) as f64 * fact2;
        (z, (iphi as f64 - 0.5) * PI / (2 * iring) as f64)
    };
    Some((z.clamp(-1.0, 1.0).acos(), phi))
}

/// Spatial slicer over two coordinate columns
#[derive(Debug, Clone)]
pub struct HealpixSlicer {
    config: HealpixConfig,
    partition: Option<Partition>,
}

impl HealpixSlicer {
    pub fn new(config: HealpixConfig) -> Result<Self> {
        let nside = config.nside;
        if nside == 0 || !nside.is_power_of_two() || nside > MAX_NSIDE {
            return Err(MafError::config(format!(
                "nside must be a power of two between 1 and {MAX_NSIDE}, got {nside}"
            )));
        }
        Ok(Self {
            config,
            partition: None,
        })
    }

    #[must_use]
    pub fn config(&self) -> &HealpixConfig {
        &self.config
    }

    /// Pixel for a row's coordinates in the configured units
    fn pixel_of(&self, lon: f64, lat: f64) -> Option<usize> {
        let (lon, lat) = if self.config.lat_lon_deg {
            (lon.to_radians(), lat.to_radians())
        } else {
            (lon, lat)
        };
        let theta = PI / 2.0 - lat;
        ang2pix_ring(self.config.nside, theta, lon).and_then(|p| usize::try_from(p).ok())
    }
}

impl Slicer for HealpixSlicer {
    fn kind(&self) -> &str {
        "HealpixSlicer"
    }

    fn setup(&mut self, table: &Table, rows: &[usize]) -> Result<()> {
        let lons = table.f64_column(&self.config.lon_col)?;
        let lats = table.f64_column(&self.config.lat_col)?;
        let npix = self.config.npix();

        let mut members = vec![Vec::new(); npix];
        let mut excluded = 0usize;
        for &row in rows {
            match self.pixel_of(lons[row], lats[row]) {
                Some(pix) => members[pix].push(row),
                None => excluded += 1,
            }
        }
        for pixel_rows in &mut members {
            pixel_rows.sort_unstable();
        }

        let nside = self.config.nside;
        let points = (0..npix)
            .map(|sid| {
                let (theta, phi) = pix2ang_ring(nside, sid as u64).unwrap_or((0.0, 0.0));
                SlicePoint::Pixel {
                    sid,
                    lon: phi.to_degrees(),
                    lat: 90.0 - theta.to_degrees(),
                }
            })
            .collect();

        if excluded > 0 {
            tracing::debug!(excluded, "rows without resolvable coordinates skipped");
        }
        tracing::debug!(nside, npix, "healpix slicer set up");
        self.partition = Some(Partition::new(points, members)?);
        Ok(())
    }

    fn partition(&self) -> Result<&Partition> {
        self.partition.as_ref().ok_or(MafError::NotConfigured)
    }

    fn geometry(&self) -> Option<SliceGeometry> {
        self.partition.as_ref().map(|_| SliceGeometry::Healpix {
            nside: self.config.nside,
            lon_col: self.config.lon_col.clone(),
            lat_col: self.config.lat_col.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_centers_round_trip() {
        for nside in [1, 2, 4, 8, 16] {
            let npix = 12 * u64::from(nside) * u64::from(nside);
            for pix in 0..npix {
                let (theta, phi) = pix2ang_ring(nside, pix).unwrap();
                assert_eq!(
                    ang2pix_ring(nside, theta, phi),
                    Some(pix),
                    "nside {nside} pixel {pix} center did not map back"
                );
            }
        }
    }

    #[test]
    fn test_poles_and_wrap() {
        assert_eq!(ang2pix_ring(4, 0.0, 0.0), Some(0));
        assert_eq!(ang2pix_ring(4, PI, 0.0), Some(12 * 16 - 4));
        // phi = 2pi and phi = 0 land in the same pixel
        assert_eq!(ang2pix_ring(4, 1.0, TAU), ang2pix_ring(4, 1.0, 0.0));
        assert_eq!(ang2pix_ring(4, 1.0, -0.1), ang2pix_ring(4, 1.0, TAU - 0.1));
    }

    #[test]
    fn test_invalid_angles() {
        assert_eq!(ang2pix_ring(4, -0.1, 0.0), None);
        assert_eq!(ang2pix_ring(4, f64::NAN, 0.0), None);
        assert_eq!(pix2ang_ring(4, 12 * 16), None);
    }

    #[test]
    fn test_nside_must_be_power_of_two() {
        assert!(HealpixSlicer::new(HealpixConfig::default().with_nside(3)).is_err());
        assert!(HealpixSlicer::new(HealpixConfig::default().with_nside(0)).is_err());
        assert!(HealpixSlicer::new(HealpixConfig::default().with_nside(2048)).is_err());
        assert!(HealpixSlicer::new(HealpixConfig::default().with_nside(64)).is_ok());
    }
}
