//! Data types and associated functions and methods

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use validator::Validate;

use crate::error::GeosliceError;
use crate::timeline::Timeline;

/// Supported attribute data types
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// [i8]
    Int8,
    /// [i16]
    Int16,
    /// [i32]
    Int32,
    /// [i64]
    Int64,
    /// [u8]
    Uint8,
    /// [u16]
    Uint16,
    /// [u32]
    Uint32,
    /// [u64]
    Uint64,
    /// [f32]
    Float32,
    /// [f64]
    Float64,
}

impl DType {
    /// Returns the size of the associated type in bytes.
    pub fn size_of(self) -> usize {
        match self {
            Self::Int8 => std::mem::size_of::<i8>(),
            Self::Int16 => std::mem::size_of::<i16>(),
            Self::Int32 => std::mem::size_of::<i32>(),
            Self::Int64 => std::mem::size_of::<i64>(),
            Self::Uint8 => std::mem::size_of::<u8>(),
            Self::Uint16 => std::mem::size_of::<u16>(),
            Self::Uint32 => std::mem::size_of::<u32>(),
            Self::Uint64 => std::mem::size_of::<u64>(),
            Self::Float32 => std::mem::size_of::<f32>(),
            Self::Float64 => std::mem::size_of::<f64>(),
        }
    }

    /// Returns true for floating point types.
    pub fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }
}

/// A closed integer index range over one array axis.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Dimension {
    /// Primary axis name, as known to the backend array engine
    pub name: String,
    /// Client-facing alias for the axis
    pub alias: String,
    /// Smallest valid cell index
    pub min_index: i64,
    /// Largest valid cell index
    pub max_index: i64,
}

impl Dimension {
    /// Return a new Dimension.
    ///
    /// Fails if `min_index` exceeds `max_index`.
    ///
    /// # Arguments
    ///
    /// * `name`: Primary axis name
    /// * `alias`: Client-facing alias
    /// * `min_index`: Smallest valid cell index
    /// * `max_index`: Largest valid cell index
    pub fn new(
        name: &str,
        alias: &str,
        min_index: i64,
        max_index: i64,
    ) -> Result<Self, GeosliceError> {
        if min_index > max_index {
            return Err(GeosliceError::DimensionBounds {
                name: name.to_string(),
                min_index,
                max_index,
            });
        }
        Ok(Dimension {
            name: name.to_string(),
            alias: alias.to_string(),
            min_index,
            max_index,
        })
    }

    /// Number of cells along this axis.
    pub fn size(&self) -> i64 {
        self.max_index - self.min_index + 1
    }

    /// Inclusive index containment test.
    pub fn contains(&self, index: i64) -> bool {
        index >= self.min_index && index <= self.max_index
    }

    /// Returns true if `axis` matches this dimension's name or alias.
    pub fn answers_to(&self, axis: &str) -> bool {
        axis == self.name || axis == self.alias
    }
}

/// The three axes of a geo-array.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Dimensions {
    /// Column (x) axis
    pub x: Dimension,
    /// Row (y) axis
    pub y: Dimension,
    /// Temporal axis
    pub t: Dimension,
}

/// A bounding rectangle in a declared spatial reference system.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SpatialExtent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl SpatialExtent {
    /// Inclusive bounding-box containment test.
    pub fn intersects(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }
}

/// Per-axis cell size in spatial reference units.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SpatialResolution {
    pub x: f64,
    pub y: f64,
}

/// Closed range of valid attribute values.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ValidRange {
    pub min: f64,
    pub max: f64,
}

/// One measured band of a geo-array.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct Attribute {
    /// Attribute name
    #[validate(length(min = 1, message = "attribute name must not be empty"))]
    pub name: String,
    /// Human readable description
    #[serde(default)]
    pub description: String,
    /// Storage data type
    pub datatype: DType,
    /// Range of meaningful values
    pub valid_range: ValidRange,
    /// Multiplier applied to stored values
    pub scale_factor: f64,
    /// Sentinel for missing cells
    pub missing_value: f64,
}

/// Native storage geometry of a geo-array.
///
/// The backend stores the array in its own reference system, which may differ from the
/// externally advertised one. Cell indices are always native-grid indices.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct InternalMetadata {
    #[validate]
    pub spatial_extent: SpatialExtent,
    #[validate]
    pub spatial_resolution: SpatialResolution,
    pub srid: u32,
}

/// Immutable metadata record for one geo-array.
///
/// Created once at catalog load time and looked up by `cluster_id:name`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GeoArray {
    /// Array name, as known to the backend array engine
    pub name: String,
    /// Backend cluster that stores this array
    pub cluster_id: String,
    /// Human readable description
    pub description: String,
    /// Measured bands, in catalog order
    pub attributes: Vec<Attribute>,
    /// The three axes
    pub dimensions: Dimensions,
    /// Externally advertised extent
    pub spatial_extent: SpatialExtent,
    /// Externally advertised resolution
    pub spatial_resolution: SpatialResolution,
    /// Externally advertised spatial reference system
    pub srid: u32,
    /// Time point labels for the temporal axis
    pub timeline: Timeline,
    /// Native storage geometry
    pub internal_metadata: InternalMetadata,
}

impl GeoArray {
    /// Composite catalog key for this array.
    pub fn key(&self) -> String {
        format!("{}:{}", self.cluster_id, self.name)
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// One axis record of the catalog configuration document.
#[derive(Clone, Debug, Deserialize, PartialEq, Validate)]
#[serde(deny_unknown_fields)]
pub struct DimensionConfig {
    #[validate(length(min = 1, message = "dimension name must not be empty"))]
    pub name: String,
    /// Client-facing alias, defaults to the name
    pub alias: Option<String>,
    pub min_idx: i64,
    pub max_idx: i64,
}

impl DimensionConfig {
    /// Build the immutable [Dimension] this record describes.
    pub fn build(&self) -> Result<Dimension, GeosliceError> {
        Dimension::new(
            &self.name,
            self.alias.as_deref().unwrap_or(&self.name),
            self.min_idx,
            self.max_idx,
        )
    }
}

/// The three axis records of one array entry.
#[derive(Clone, Debug, Deserialize, PartialEq, Validate)]
#[serde(deny_unknown_fields)]
pub struct DimensionsConfig {
    #[validate]
    pub x: DimensionConfig,
    #[validate]
    pub y: DimensionConfig,
    #[validate]
    pub t: DimensionConfig,
}

/// One array entry of the catalog configuration document.
#[derive(Clone, Debug, Deserialize, PartialEq, Validate)]
#[serde(deny_unknown_fields)]
pub struct ArrayConfig {
    #[validate(length(min = 1, message = "array name must not be empty"))]
    pub name: String,
    #[validate(length(min = 1, message = "cluster_id must not be empty"))]
    pub cluster_id: String,
    #[serde(default)]
    pub description: String,
    #[validate]
    pub dimensions: DimensionsConfig,
    #[validate]
    #[validate(length(min = 1, message = "arrays must declare at least one attribute"))]
    pub attributes: Vec<Attribute>,
    #[validate]
    pub spatial_extent: SpatialExtent,
    #[validate]
    pub spatial_resolution: SpatialResolution,
    pub srid: u32,
    #[validate(length(min = 1, message = "timeline must not be empty"))]
    pub timeline: Vec<String>,
    #[validate]
    pub internal_metadata: InternalMetadata,
}

/// One backend cluster entry of the configuration document.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ClusterConfig {
    #[validate(length(min = 1, message = "cluster id must not be empty"))]
    pub id: String,
    #[validate(length(min = 1, message = "coordinator_address must not be empty"))]
    pub coordinator_address: String,
    pub coordinator_port: u16,
    #[validate(range(min = 1, message = "max_connections must be greater than 0"))]
    pub max_connections: usize,
}

/// The startup configuration document.
///
/// Loaded once; structural errors here are fatal, while per-array problems are
/// reported and skipped during catalog load.
#[derive(Clone, Debug, Deserialize, PartialEq, Validate)]
#[serde(deny_unknown_fields)]
pub struct ConfigDocument {
    #[validate]
    #[validate(length(min = 1, message = "at least one cluster must be configured"))]
    pub clusters: Vec<ClusterConfig>,
    #[validate]
    pub arrays: Vec<ArrayConfig>,
}

impl ConfigDocument {
    /// Read and parse the configuration document at `path`.
    ///
    /// A leading `~` is expanded to the user's home directory.
    pub fn from_file(path: &str) -> Result<Self, GeosliceError> {
        let path = expanduser::expanduser(path)?;
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}
