use criterion::{black_box, criterion_group, criterion_main, Criterion};

use geoslice::catalog::Catalog;
use geoslice::models::GeoArray;
use geoslice::planner;
use geoslice::srs::SrsCache;
use geoslice::subset;

const CONFIG_JSON: &str = r#"{
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

fn make_geo_array() -> GeoArray {
    let document = serde_json::from_str(CONFIG_JSON).unwrap();
    let catalog = Catalog::load(&document).unwrap();
    (*catalog.get("scidb", "mod13q1").unwrap()).clone()
}

fn criterion_benchmark(c: &mut Criterion) {
    let clauses = vec![
        "x,3857(-6000000,-5900000)".to_string(),
        "y(-11.9,-11.1)".to_string(),
        "t(0,2)".to_string(),
    ];
    c.bench_function("parse_request", |b| {
        b.iter(|| subset::parse_request(black_box(&clauses)).unwrap())
    });

    let array = make_geo_array();
    let clips = subset::parse_request(&[
        "x(-53.9,-53.1)".to_string(),
        "y(-11.9,-11.1)".to_string(),
        "t(0,2)".to_string(),
    ])
    .unwrap();
    c.bench_function("plan_native", |b| {
        let mut srs = SrsCache::new();
        b.iter(|| planner::plan(black_box(&array), &clips, None, &mut srs).unwrap())
    });

    let mut srs = SrsCache::new();
    let (x_lo, y_lo) = srs.transform(4326, 3857, -53.9, -11.9).unwrap();
    let (x_hi, y_hi) = srs.transform(4326, 3857, -53.1, -11.1).unwrap();
    let reprojected = subset::parse_request(&[
        format!("x,3857({},{})", x_lo, x_hi),
        format!("y,3857({},{})", y_lo, y_hi),
    ])
    .unwrap();
    c.bench_function("plan_reprojected", |b| {
        let mut srs = SrsCache::new();
        b.iter(|| planner::plan(black_box(&array), &reprojected, None, &mut srs).unwrap())
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
