use crate::catalog::Catalog;
use crate::models::{ConfigDocument, GeoArray};

/// A configuration document with one cluster and one geo-array.
pub(crate) const CONFIG_JSON: &str = r#"{
    "clusters": [
        {
            "id": "scidb",
            "coordinator_address": "coordinator.example.com",
            "coordinator_port": 8080,
            "max_connections": 4
        }
    ],
    "arrays": [
        {
            "name": "mod13q1",
            "cluster_id": "scidb",
            "description": "MODIS vegetation indices, 16 day composite",
            "dimensions": {
                "x": {"name": "col_id", "alias": "x", "min_idx": 0, "max_idx": 15},
                "y": {"name": "row_id", "alias": "y", "min_idx": 0, "max_idx": 7},
                "t": {"name": "time_id", "alias": "t", "min_idx": 0, "max_idx": 2}
            },
            "attributes": [
                {
                    "name": "ndvi",
                    "description": "Normalized difference vegetation index",
                    "datatype": "int16",
                    "valid_range": {"min": -2000.0, "max": 10000.0},
                    "scale_factor": 0.0001,
                    "missing_value": -3000.0
                },
                {
                    "name": "evi",
                    "description": "Enhanced vegetation index",
                    "datatype": "int16",
                    "valid_range": {"min": -2000.0, "max": 10000.0},
                    "scale_factor": 0.0001,
                    "missing_value": -3000.0
                }
            ],
            "spatial_extent": {"xmin": -54.0, "ymin": -12.0, "xmax": -50.0, "ymax": -10.0},
            "spatial_resolution": {"x": 0.25, "y": 0.25},
            "srid": 4326,
            "timeline": ["2023-01-01", "2023-01-17", "2023-02-02"],
            "internal_metadata": {
                "spatial_extent": {"xmin": -54.0, "ymin": -12.0, "xmax": -50.0, "ymax": -10.0},
                "spatial_resolution": {"x": 0.25, "y": 0.25},
                "srid": 4326
            }
        }
    ]
}"#;

/// Parse [CONFIG_JSON] into a configuration document.
pub(crate) fn make_config_document() -> ConfigDocument {
    serde_json::from_str(CONFIG_JSON).unwrap()
}

/// Build the `scidb:mod13q1` geo-array described by [CONFIG_JSON].
pub(crate) fn make_geo_array() -> GeoArray {
    let catalog = Catalog::load(&make_config_document()).unwrap();
    (*catalog.get("scidb", "mod13q1").unwrap()).clone()
}
