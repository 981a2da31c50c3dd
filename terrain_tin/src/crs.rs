//! Coordinate reference system utilities built on top of the `proj` crate.

use proj::Proj;

/// Representation of a coordinate reference system.
///
/// A CRS is stored internally as a definition string which can be an EPSG
/// identifier (`"EPSG:4326"`), a Proj4 definition or a WKT definition. When
/// created from an EPSG code the numeric value is retained so that callers
/// can inspect it if necessary. The WKT form is what the native TIN file
/// header embeds.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Crs {
    definition: String,
    epsg: Option<u32>,
}

impl Crs {
    /// Creates a new CRS from the given EPSG code.
    pub fn from_epsg(code: u32) -> Self {
        Self {
            definition: format!("EPSG:{}", code),
            epsg: Some(code),
        }
    }

    /// Creates a CRS from a Proj4 definition string.
    pub fn from_proj4(definition: &str) -> Self {
        Self {
            definition: definition.to_string(),
            epsg: None,
        }
    }

    /// Creates a CRS from a WKT definition string.
    pub fn from_wkt(definition: &str) -> Self {
        Self {
            definition: definition.to_string(),
            epsg: None,
        }
    }

    /// Returns the EPSG code for this CRS, if available.
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Returns the underlying definition string.
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Common global CRS definition: WGS84 (EPSG:4326).
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Common global CRS definition: Web Mercator (EPSG:3857).
    pub fn web_mercator() -> Self {
        Self::from_epsg(3857)
    }

    /// Transforms an `(x, y)` coordinate from this CRS to the target CRS.
    /// Returns `None` when no conversion between the two systems exists.
    pub fn transform_point(&self, target: &Crs, x: f64, y: f64) -> Option<(f64, f64)> {
        let proj = Proj::new_known_crs(&self.definition, &target.definition, None).ok()?;
        proj.convert((x, y)).ok()
    }

    /// Transforms a slice of `(x, y)` coordinates in place from this CRS to
    /// the target CRS. Returns `false` (leaving `points` in an unspecified
    /// state) when the pair is not convertible; callers that must not mutate
    /// on failure should transform a scratch copy.
    pub fn transform_points(&self, target: &Crs, points: &mut [(f64, f64)]) -> bool {
        let Ok(proj) = Proj::new_known_crs(&self.definition, &target.definition, None) else {
            return false;
        };
        proj.convert_array(points).is_ok()
    }
}
