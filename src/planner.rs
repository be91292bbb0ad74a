//! Coverage query planner.
//!
//! Combines catalog metadata, parsed axis clips and attribute selection into the
//! query string sent to the backend array engine. Spatial clips are world
//! coordinates, reprojected into the array's native reference system when the client
//! declares a different one, then converted to cell indices through the native grid.
//! Temporal clips are native time indices or timeline labels. Axes without a clip
//! fall back to the full dimension range.

use crate::error::GeosliceError;
use crate::grid::Grid;
use crate::models::{Attribute, Dimension, GeoArray};
use crate::srs::SrsCache;
use crate::subset::AxisClip;

/// The planned backend request for one coverage subset.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryPlan {
    /// Backend query string
    pub query: String,
    /// Selected attributes, in response order
    pub attributes: Vec<Attribute>,
    /// Column index range, inclusive
    pub x_range: (i64, i64),
    /// Row index range, inclusive
    pub y_range: (i64, i64),
    /// Temporal index range, inclusive
    pub t_range: (i64, i64),
}

/// A spatial clip with its bounds parsed into world coordinates.
#[derive(Clone, Copy, Debug)]
struct WorldRange {
    min: f64,
    max: f64,
}

/// Build the query plan for one coverage subset request.
///
/// # Arguments
///
/// * `array`: The geo-array being subset
/// * `clips`: Parsed axis clips, at most one per axis
/// * `range_subset`: Optional explicit attribute selection, in client order
/// * `srs`: The caller's spatial reference cache
pub fn plan(
    array: &GeoArray,
    clips: &[AxisClip],
    range_subset: Option<&[String]>,
    srs: &mut SrsCache,
) -> Result<QueryPlan, GeosliceError> {
    let (x_clip, y_clip, t_clip) = classify(array, clips)?;

    let (x_range, y_range) = plan_spatial(array, x_clip, y_clip, srs)?;
    let t_range = plan_temporal(array, t_clip)?;
    let attributes = select_attributes(array, range_subset)?;

    let names: Vec<&str> = attributes.iter().map(|a| a.name.as_str()).collect();
    let query = format!(
        "project(between({}, {}, {}, {}, {}, {}, {}), {})",
        array.name,
        x_range.0,
        y_range.0,
        t_range.0,
        x_range.1,
        y_range.1,
        t_range.1,
        names.join(", ")
    );

    Ok(QueryPlan {
        query,
        attributes,
        x_range,
        y_range,
        t_range,
    })
}

/// Match each clip against the array's axes.
///
/// Fails with invalid-axis if a clip names no axis of the array, or declares a
/// reference system on the temporal axis.
fn classify<'a>(
    array: &GeoArray,
    clips: &'a [AxisClip],
) -> Result<
    (
        Option<&'a AxisClip>,
        Option<&'a AxisClip>,
        Option<&'a AxisClip>,
    ),
    GeosliceError,
> {
    let mut x_clip = None;
    let mut y_clip = None;
    let mut t_clip = None;
    for clip in clips {
        if array.dimensions.x.answers_to(&clip.name) {
            x_clip = Some(clip);
        } else if array.dimensions.y.answers_to(&clip.name) {
            y_clip = Some(clip);
        } else if array.dimensions.t.answers_to(&clip.name) {
            if clip.srid.is_some() {
                return Err(GeosliceError::InvalidAxis {
                    axis: clip.name.clone(),
                    reason: "reference systems do not apply to the temporal axis".to_string(),
                });
            }
            t_clip = Some(clip);
        } else {
            return Err(GeosliceError::InvalidAxis {
                axis: clip.name.clone(),
                reason: format!("{} has no axis by that name", array.key()),
            });
        }
    }
    Ok((x_clip, y_clip, t_clip))
}

/// Resolve the spatial clips to native column and row index ranges.
fn plan_spatial(
    array: &GeoArray,
    x_clip: Option<&AxisClip>,
    y_clip: Option<&AxisClip>,
    srs: &mut SrsCache,
) -> Result<((i64, i64), (i64, i64)), GeosliceError> {
    let native = &array.internal_metadata;
    let dims = &array.dimensions;

    // No spatial restriction at all: the full index ranges, no geometry involved.
    if x_clip.is_none() && y_clip.is_none() {
        return Ok((
            (dims.x.min_index, dims.x.max_index),
            (dims.y.min_index, dims.y.max_index),
        ));
    }

    let client_srid = client_srid(x_clip, y_clip)?.unwrap_or(native.srid);

    let x_world = x_clip.map(|clip| parse_world_range(clip)).transpose()?;
    let y_world = y_clip.map(|clip| parse_world_range(clip)).transpose()?;

    // A point transform needs both coordinates. An unclipped axis contributes the
    // center of the native extent, expressed in the client's reference system.
    let center_x = (native.spatial_extent.xmin + native.spatial_extent.xmax) / 2.0;
    let center_y = (native.spatial_extent.ymin + native.spatial_extent.ymax) / 2.0;
    let (center_x, center_y) =
        srs.transform(native.srid, client_srid, center_x, center_y)?;
    let x_world = x_world.unwrap_or(WorldRange {
        min: center_x,
        max: center_x,
    });
    let y_world = y_world.unwrap_or(WorldRange {
        min: center_y,
        max: center_y,
    });

    let lo = srs.transform(client_srid, native.srid, x_world.min, y_world.min)?;
    let hi = srs.transform(client_srid, native.srid, x_world.max, y_world.max)?;

    for (x, y) in [lo, hi] {
        if !native.spatial_extent.intersects(x, y) {
            let axis = if x < native.spatial_extent.xmin || x > native.spatial_extent.xmax {
                &dims.x
            } else {
                &dims.y
            };
            return Err(GeosliceError::InvalidAxis {
                axis: axis.alias.clone(),
                reason: format!(
                    "coordinate ({}, {}) falls outside the spatial extent of {}",
                    x,
                    y,
                    array.key()
                ),
            });
        }
    }

    let grid = Grid::new(&native.spatial_extent, &native.spatial_resolution, dims);

    let x_range = if x_clip.is_some() {
        ordered_clamped(grid.col(lo.0), grid.col(hi.0), &dims.x)
    } else {
        (dims.x.min_index, dims.x.max_index)
    };
    // Rows count downward from ymax, so the northern bound maps to the lower row.
    let y_range = if y_clip.is_some() {
        ordered_clamped(grid.row(hi.1), grid.row(lo.1), &dims.y)
    } else {
        (dims.y.min_index, dims.y.max_index)
    };
    Ok((x_range, y_range))
}

/// The single client reference system declared across the spatial clips, if any.
///
/// Fails if the two spatial axes declare different reference systems.
fn client_srid(
    x_clip: Option<&AxisClip>,
    y_clip: Option<&AxisClip>,
) -> Result<Option<u32>, GeosliceError> {
    let x_srid = x_clip.and_then(|c| c.srid.as_deref());
    let y_srid = y_clip.and_then(|c| c.srid.as_deref());
    if let (Some(a), Some(b)) = (x_srid, y_srid) {
        if a != b {
            return Err(GeosliceError::InvalidAxis {
                axis: x_clip.map(|c| c.name.clone()).unwrap_or_default(),
                reason: format!(
                    "spatial axes declare conflicting reference systems {} and {}",
                    a, b
                ),
            });
        }
    }
    let (token, clip) = match (x_srid, y_srid) {
        (Some(token), _) => (token, x_clip),
        (None, Some(token)) => (token, y_clip),
        (None, None) => return Ok(None),
    };
    // Accept a bare code or the conventional EPSG: prefix.
    let code = token
        .strip_prefix("EPSG:")
        .or_else(|| token.strip_prefix("epsg:"))
        .unwrap_or(token);
    code.parse::<u32>()
        .map(Some)
        .map_err(|_| GeosliceError::InvalidAxis {
            axis: clip.map(|c| c.name.clone()).unwrap_or_default(),
            reason: format!("{} is not a valid srid", token),
        })
}

/// Parse a spatial clip's bounds as world coordinates.
fn parse_world_range(clip: &AxisClip) -> Result<WorldRange, GeosliceError> {
    let min = parse_coordinate(clip, &clip.min)?;
    let max = match &clip.max {
        Some(max) => parse_coordinate(clip, max)?,
        None => min,
    };
    Ok(WorldRange { min, max })
}

/// Parse one world coordinate, failing with invalid-axis on malformed input.
fn parse_coordinate(clip: &AxisClip, value: &str) -> Result<f64, GeosliceError> {
    let parsed: f64 = value.parse().map_err(|_| GeosliceError::InvalidAxis {
        axis: clip.name.clone(),
        reason: format!("{} is not a number", value),
    })?;
    if !parsed.is_finite() {
        return Err(GeosliceError::InvalidAxis {
            axis: clip.name.clone(),
            reason: format!("{} is not a finite coordinate", value),
        });
    }
    Ok(parsed)
}

/// Sort a pair of cell indices and clamp them to the dimension bounds.
///
/// Reprojection can flip axis direction, and a coordinate exactly on the far edge of
/// the extent floors to one cell past the end.
fn ordered_clamped(a: i64, b: i64, dimension: &Dimension) -> (i64, i64) {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    (
        lo.clamp(dimension.min_index, dimension.max_index),
        hi.clamp(dimension.min_index, dimension.max_index),
    )
}

/// Resolve the temporal clip to an index range within the dimension bounds.
///
/// Integer bounds are native time indices. Anything else is treated as a pair of
/// timeline labels and resolved through the timeline's interval lookup, which rounds a
/// missing begin up and a missing end down.
fn plan_temporal(array: &GeoArray, clip: Option<&AxisClip>) -> Result<(i64, i64), GeosliceError> {
    let dimension = &array.dimensions.t;
    let clip = match clip {
        Some(clip) => clip,
        None => return Ok((dimension.min_index, dimension.max_index)),
    };
    let max = clip.max.as_deref().unwrap_or(&clip.min);
    let (min, max) = match (clip.min.parse::<i64>(), max.parse::<i64>()) {
        (Ok(min), Ok(max)) => (min, max),
        _ => return array.timeline.find_interval(&clip.min, max),
    };
    if min > max || !dimension.contains(min) || !dimension.contains(max) {
        return Err(GeosliceError::InvalidAxis {
            axis: clip.name.clone(),
            reason: format!(
                "time interval [{}, {}] is outside the dimension range [{}, {}]",
                min, max, dimension.min_index, dimension.max_index
            ),
        });
    }
    Ok((min, max))
}

/// Resolve the attribute selection.
///
/// An explicit range subset must name existing attributes and keeps the client's
/// ordering; otherwise all attributes are selected in catalog order.
fn select_attributes(
    array: &GeoArray,
    range_subset: Option<&[String]>,
) -> Result<Vec<Attribute>, GeosliceError> {
    match range_subset {
        None => Ok(array.attributes.clone()),
        Some(names) => names
            .iter()
            .map(|name| {
                array
                    .attribute(name)
                    .cloned()
                    .ok_or_else(|| GeosliceError::NoSuchField {
                        attribute: name.clone(),
                    })
            })
            .collect(),
    }
}
