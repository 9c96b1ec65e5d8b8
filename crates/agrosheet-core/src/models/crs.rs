//! Coordinate reference system descriptors and the table of systems the
//! worksheet tooling knows about without asking a remote service.

use serde::{Deserialize, Serialize};
use std::fmt;

/// EPSG code of WGS 84 geographic coordinates
pub const WGS84: u32 = 4326;

/// EPSG code of ETRS89 / Portugal TM06, the national transverse Mercator grid
pub const PT_TM06: u32 = 3763;

/// EPSG code of WGS 84 / UTM zone 29N
pub const UTM_29N: u32 = 32629;

/// EPSG code of ETRS89 / UTM zone 29N
pub const ETRS89_UTM_29N: u32 = 25829;

/// EPSG code of ETRS89 / LAEA Europe
pub const LAEA_EUROPE: u32 = 3035;

/// EPSG code of WGS 84 / Pseudo-Mercator
pub const WEB_MERCATOR: u32 = 3857;

/// Broad classification of a CRS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CrsKind {
    /// Longitude/latitude in degrees
    #[default]
    Geographic,
    /// Planar easting/northing in metres
    Projected,
    /// Not in the known table
    Unknown,
}

/// Entry of the static known-CRS table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownCrs {
    pub epsg: u32,
    pub name: &'static str,
    pub kind: CrsKind,
    /// PROJ definition used when no closed form applies
    pub proj4: &'static str,
}

pub const KNOWN_CRS: &[KnownCrs] = &[
    KnownCrs {
        epsg: WGS84,
        name: "WGS 84",
        kind: CrsKind::Geographic,
        proj4: "+proj=longlat +datum=WGS84 +no_defs",
    },
    KnownCrs {
        epsg: PT_TM06,
        name: "ETRS89 / Portugal TM06",
        kind: CrsKind::Projected,
        proj4: "+proj=tmerc +lat_0=39.66825833333333 +lon_0=-8.133108333333334 +k=1 +x_0=0 +y_0=0 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
    },
    KnownCrs {
        epsg: UTM_29N,
        name: "WGS 84 / UTM zone 29N",
        kind: CrsKind::Projected,
        proj4: "+proj=utm +zone=29 +datum=WGS84 +units=m +no_defs",
    },
    KnownCrs {
        epsg: ETRS89_UTM_29N,
        name: "ETRS89 / UTM zone 29N",
        kind: CrsKind::Projected,
        proj4: "+proj=utm +zone=29 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
    },
    KnownCrs {
        epsg: LAEA_EUROPE,
        name: "ETRS89 / LAEA Europe",
        kind: CrsKind::Projected,
        proj4: "+proj=laea +lat_0=52 +lon_0=10 +x_0=4321000 +y_0=3210000 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
    },
    KnownCrs {
        epsg: WEB_MERCATOR,
        name: "WGS 84 / Pseudo-Mercator",
        kind: CrsKind::Projected,
        proj4: "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +wktext +no_defs",
    },
];

/// Look up a code in the known-CRS table
pub fn known_crs(epsg: u32) -> Option<&'static KnownCrs> {
    KNOWN_CRS.iter().find(|entry| entry.epsg == epsg)
}

/// Coordinate Reference System identified by EPSG code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrsDescriptor {
    pub epsg: u32,
    pub name: String,
    pub kind: CrsKind,
}

impl Default for CrsDescriptor {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl CrsDescriptor {
    pub fn new(epsg: u32, name: impl Into<String>, kind: CrsKind) -> Self {
        Self { epsg, name: name.into(), kind }
    }

    /// WGS 84 (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(WGS84)
    }

    /// ETRS89 / Portugal TM06 (EPSG:3763)
    pub fn pt_tm06() -> Self {
        Self::from_epsg(PT_TM06)
    }

    /// WGS 84 / UTM zone 29N (EPSG:32629)
    pub fn utm_29n() -> Self {
        Self::from_epsg(UTM_29N)
    }

    /// Descriptor for a code; codes outside the known table are `Unknown`
    pub fn from_epsg(epsg: u32) -> Self {
        match known_crs(epsg) {
            Some(known) => Self::new(known.epsg, known.name, known.kind),
            None => Self::new(epsg, format!("EPSG:{}", epsg), CrsKind::Unknown),
        }
    }

    /// Descriptor for a code, keeping `raw` as the name when the code is unknown
    pub fn from_epsg_named(epsg: u32, raw: &str) -> Self {
        match known_crs(epsg) {
            Some(_) => Self::from_epsg(epsg),
            None => Self::new(epsg, raw, CrsKind::Unknown),
        }
    }

    /// The `EPSG:<n>` form of the code
    pub fn code(&self) -> String {
        format!("EPSG:{}", self.epsg)
    }

    pub fn is_geographic(&self) -> bool {
        self.kind == CrsKind::Geographic
    }

    pub fn is_known(&self) -> bool {
        self.kind != CrsKind::Unknown
    }
}

impl fmt::Display for CrsDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{} ({})", self.epsg, self.name)
    }
}

/// What to do with a coordinate that cannot be reprojected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReprojectionPolicy {
    /// Abort the operation with the projection error
    Strict,
    /// Keep the original coordinate, log a warning and report it
    #[default]
    Lenient,
}
