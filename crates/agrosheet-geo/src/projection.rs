//! Closed-form map projections.
//!
//! Transverse Mercator follows the Snyder series (USGS PP 1395, eqs. 8-9
//! to 8-18), parameterized by ellipsoid, origin, scale factor and false
//! offsets. Web Mercator is the spherical form used by tile maps.

use agrosheet_core::models::crs::{ETRS89_UTM_29N, PT_TM06, UTM_29N, WEB_MERCATOR, WGS84};

/// Radius of the Web Mercator sphere
const WEB_MERCATOR_RADIUS: f64 = 6378137.0;

/// Latitude limit of Web Mercator
const WEB_MERCATOR_MAX_LAT: f64 = 85.051128779806;

/// Reference ellipsoid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis in metres
    pub a: f64,
    /// Flattening
    pub f: f64,
}

impl Ellipsoid {
    pub const GRS80: Ellipsoid = Ellipsoid { a: 6378137.0, f: 1.0 / 298.257222101 };
    pub const WGS84: Ellipsoid = Ellipsoid { a: 6378137.0, f: 1.0 / 298.257223563 };

    /// First eccentricity squared
    pub fn e2(&self) -> f64 {
        2.0 * self.f - self.f * self.f
    }
}

/// Transverse Mercator projection parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransverseMercator {
    pub ellipsoid: Ellipsoid,
    /// Central meridian in degrees
    pub lon0: f64,
    /// Latitude of origin in degrees
    pub lat0: f64,
    /// Scale factor on the central meridian
    pub k0: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

impl TransverseMercator {
    /// ETRS89 / Portugal TM06
    pub const PT_TM06: TransverseMercator = TransverseMercator {
        ellipsoid: Ellipsoid::GRS80,
        lon0: -8.133108333333334,
        lat0: 39.66825833333333,
        k0: 1.0,
        false_easting: 0.0,
        false_northing: 0.0,
    };

    /// UTM zone on the northern hemisphere
    pub fn utm_north(zone: u8, ellipsoid: Ellipsoid) -> Self {
        Self {
            ellipsoid,
            lon0: f64::from(zone) * 6.0 - 183.0,
            lat0: 0.0,
            k0: 0.9996,
            false_easting: 500000.0,
            false_northing: 0.0,
        }
    }

    /// Geographic (degrees) to projected (metres)
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let e2 = self.ellipsoid.e2();
        let ep2 = e2 / (1.0 - e2);
        let phi = lat.to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();

        let n = self.ellipsoid.a / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = phi.tan().powi(2);
        let c = ep2 * cos_phi * cos_phi;
        let a = (lon - self.lon0).to_radians() * cos_phi;

        let m = self.meridian_arc(phi);
        let m0 = self.meridian_arc(self.lat0.to_radians());

        let x = self.k0
            * n
            * (a + (1.0 - t + c) * a.powi(3) / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0);

        let y = self.k0
            * (m - m0
                + n * phi.tan()
                    * (a * a / 2.0
                        + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                        + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6)
                            / 720.0));

        (x + self.false_easting, y + self.false_northing)
    }

    /// Projected (metres) to geographic (degrees)
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let e2 = self.ellipsoid.e2();
        let ep2 = e2 / (1.0 - e2);
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let x = x - self.false_easting;
        let y = y - self.false_northing;

        // Footpoint latitude
        let m = self.meridian_arc(self.lat0.to_radians()) + y / self.k0;
        let mu = m / (self.ellipsoid.a * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let (sin_phi1, cos_phi1) = phi1.sin_cos();
        let w = 1.0 - e2 * sin_phi1 * sin_phi1;
        let n1 = self.ellipsoid.a / w.sqrt();
        let r1 = self.ellipsoid.a * (1.0 - e2) / w.powf(1.5);
        let t1 = phi1.tan().powi(2);
        let c1 = ep2 * cos_phi1 * cos_phi1;
        let d = x / (n1 * self.k0);

        let lat = phi1
            - (n1 * phi1.tan() / r1)
                * (d * d / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                        - 252.0 * ep2
                        - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);

        let lon = self.lon0.to_radians()
            + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                    * d.powi(5)
                    / 120.0)
                / cos_phi1;

        (lon.to_degrees(), lat.to_degrees())
    }

    /// Distance along the meridian from the equator to `phi` (radians)
    fn meridian_arc(&self, phi: f64) -> f64 {
        let e2 = self.ellipsoid.e2();
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        self.ellipsoid.a
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
    }
}

/// Geographic (degrees) to spherical Web Mercator (metres)
pub fn web_mercator_forward(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-WEB_MERCATOR_MAX_LAT, WEB_MERCATOR_MAX_LAT);
    let x = WEB_MERCATOR_RADIUS * lon.to_radians();
    let y = WEB_MERCATOR_RADIUS
        * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Spherical Web Mercator (metres) to geographic (degrees)
pub fn web_mercator_inverse(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / WEB_MERCATOR_RADIUS).to_degrees();
    let lat = (2.0 * (y / WEB_MERCATOR_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2)
        .to_degrees();
    (lon, lat)
}

/// A coordinate space with a closed-form link to geographic coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Planar {
    Geographic,
    TransverseMercator(TransverseMercator),
    WebMercator,
}

impl Planar {
    /// Closed form for an EPSG code, if there is one.
    ///
    /// ETRS89 and WGS 84 are treated as the same datum.
    pub fn for_epsg(epsg: u32) -> Option<Planar> {
        match epsg {
            WGS84 => Some(Planar::Geographic),
            PT_TM06 => Some(Planar::TransverseMercator(TransverseMercator::PT_TM06)),
            UTM_29N => {
                Some(Planar::TransverseMercator(TransverseMercator::utm_north(29, Ellipsoid::WGS84)))
            }
            ETRS89_UTM_29N => {
                Some(Planar::TransverseMercator(TransverseMercator::utm_north(29, Ellipsoid::GRS80)))
            }
            WEB_MERCATOR => Some(Planar::WebMercator),
            _ => None,
        }
    }

    pub fn to_geographic(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Planar::Geographic => (x, y),
            Planar::TransverseMercator(tm) => tm.inverse(x, y),
            Planar::WebMercator => web_mercator_inverse(x, y),
        }
    }

    pub fn from_geographic(&self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Planar::Geographic => (lon, lat),
            Planar::TransverseMercator(tm) => tm.forward(lon, lat),
            Planar::WebMercator => web_mercator_forward(lon, lat),
        }
    }
}
