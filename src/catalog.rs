//! Registry of immutable geo-array metadata records.
//!
//! The catalog is populated once at startup from the configuration document and is
//! never mutated afterwards, so lookups need no locking. Arrays are keyed by
//! `cluster_id:name`.

use std::sync::Arc;

use hashbrown::HashMap;
use validator::Validate;

use crate::error::GeosliceError;
use crate::models::{ArrayConfig, ConfigDocument, Dimensions, GeoArray};
use crate::srs::SrsCache;
use crate::timeline::Timeline;

/// Registry of geo-array metadata, looked up by `cluster_id:name`.
#[derive(Debug, Default)]
pub struct Catalog {
    arrays: HashMap<String, Arc<GeoArray>>,
}

impl Catalog {
    /// Return a new, empty Catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a geo-array.
    ///
    /// Fails if an array is already registered under the same `cluster_id:name`.
    ///
    /// # Arguments
    ///
    /// * `array`: The metadata record to register
    pub fn insert(&mut self, array: GeoArray) -> Result<(), GeosliceError> {
        let key = array.key();
        if self.arrays.contains_key(&key) {
            return Err(GeosliceError::DuplicateArray { key });
        }
        self.arrays.insert_unique_unchecked(key, Arc::new(array));
        Ok(())
    }

    /// Look up a geo-array by cluster id and name.
    ///
    /// Fails with not-found if the key is not registered.
    ///
    /// # Arguments
    ///
    /// * `cluster_id`: Backend cluster id
    /// * `name`: Array name
    pub fn get(&self, cluster_id: &str, name: &str) -> Result<Arc<GeoArray>, GeosliceError> {
        let key = format!("{}:{}", cluster_id, name);
        self.arrays
            .get(&key)
            .cloned()
            .ok_or(GeosliceError::ArrayNotFound { key })
    }

    /// All registered keys, sorted for stable listings.
    pub fn list(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.arrays.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of registered arrays.
    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    /// Returns true if no arrays are registered.
    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    /// Build the catalog from a validated configuration document.
    ///
    /// Entries that fail their own checks (unresolvable reference system, inverted
    /// dimension bounds, timeline length mismatch, duplicate key) are skipped with a
    /// warning; the rest of the catalog still loads. Structural problems with the
    /// document itself fail the whole load.
    ///
    /// # Arguments
    ///
    /// * `document`: The parsed configuration document
    pub fn load(document: &ConfigDocument) -> Result<Self, GeosliceError> {
        document.validate()?;
        let mut catalog = Catalog::new();
        let mut srs = SrsCache::new();
        for entry in &document.arrays {
            let array = match build_array(entry, &mut srs) {
                Ok(array) => array,
                Err(err) => {
                    tracing::warn!(
                        "skipping geo-array {}:{}: {}",
                        entry.cluster_id,
                        entry.name,
                        err
                    );
                    continue;
                }
            };
            let key = array.key();
            if let Err(err) = catalog.insert(array) {
                tracing::warn!("skipping geo-array {}: {}", key, err);
            }
        }
        tracing::info!("catalog loaded with {} geo-arrays", catalog.len());
        Ok(catalog)
    }
}

/// Build one immutable [GeoArray] from its configuration entry.
///
/// Both the advertised and the native reference system must resolve.
fn build_array(entry: &ArrayConfig, srs: &mut SrsCache) -> Result<GeoArray, GeosliceError> {
    srs.get(entry.srid)?;
    srs.get(entry.internal_metadata.srid)?;
    let dimensions = Dimensions {
        x: entry.dimensions.x.build()?,
        y: entry.dimensions.y.build()?,
        t: entry.dimensions.t.build()?,
    };
    let timeline = Timeline::new(entry.timeline.clone(), dimensions.t.clone())?;
    Ok(GeoArray {
        name: entry.name.clone(),
        cluster_id: entry.cluster_id.clone(),
        description: entry.description.clone(),
        attributes: entry.attributes.clone(),
        dimensions,
        spatial_extent: entry.spatial_extent,
        spatial_resolution: entry.spatial_resolution,
        srid: entry.srid,
        timeline,
        internal_metadata: entry.internal_metadata.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn insert_then_get_returns_equal_record() {
        let mut catalog = Catalog::new();
        let array = test_utils::make_geo_array();
        catalog.insert(array.clone()).unwrap();
        let found = catalog.get("scidb", "mod13q1").unwrap();
        assert_eq!(array, *found);
    }

    #[test]
    fn insert_duplicate_key() {
        let mut catalog = Catalog::new();
        catalog.insert(test_utils::make_geo_array()).unwrap();
        let err = catalog.insert(test_utils::make_geo_array()).unwrap_err();
        assert_eq!(
            "a geo-array is already registered under scidb:mod13q1",
            err.to_string()
        );
    }

    #[test]
    fn get_unknown_key() {
        let catalog = Catalog::new();
        let err = catalog.get("scidb", "nosuch").unwrap_err();
        assert_eq!(
            "no geo-array registered under scidb:nosuch",
            err.to_string()
        );
    }

    #[test]
    fn list_is_sorted() {
        let mut catalog = Catalog::new();
        let mut second = test_utils::make_geo_array();
        second.name = "aqua".to_string();
        catalog.insert(test_utils::make_geo_array()).unwrap();
        catalog.insert(second).unwrap();
        assert_eq!(vec!["scidb:aqua", "scidb:mod13q1"], catalog.list());
    }

    #[test]
    fn load_from_document() {
        let document = test_utils::make_config_document();
        let catalog = Catalog::load(&document).unwrap();
        assert_eq!(1, catalog.len());
        assert!(!catalog.is_empty());
        let array = catalog.get("scidb", "mod13q1").unwrap();
        assert_eq!(3, array.timeline.len());
        assert_eq!("x", array.dimensions.x.alias);
    }

    #[test]
    fn load_skips_unresolvable_srid() {
        let mut document = test_utils::make_config_document();
        document.arrays[0].srid = 32632;
        let catalog = Catalog::load(&document).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn load_skips_timeline_mismatch() {
        let mut document = test_utils::make_config_document();
        document.arrays[0].timeline.pop();
        let catalog = Catalog::load(&document).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn load_skips_inverted_dimension() {
        let mut document = test_utils::make_config_document();
        document.arrays[0].dimensions.x.min_idx = 1000;
        let catalog = Catalog::load(&document).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn load_rejects_structural_errors() {
        let mut document = test_utils::make_config_document();
        document.clusters.clear();
        let err = Catalog::load(&document).unwrap_err();
        assert_eq!("configuration document is not valid", err.to_string());
    }
}
