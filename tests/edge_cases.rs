use geowatch::{
    GeoWatchError, Indexable, IndexableType, MapBounds, Object, Point, Rect, Server,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn object(id: &str, lat: f64, lng: f64) -> Arc<dyn Indexable> {
    Arc::new(Object::at(id, IndexableType(1), lat, lng, 0.0001, 0.0001, None).unwrap())
}

/// Large dataset stress test
#[test]
fn test_large_dataset_insertion() {
    let srv = Server::new(25, 50).expect("Failed to create server");

    for i in 0..10_000 {
        let lat = 40.0 + (i as f64 * 0.00001);
        let lng = -74.0 + (i as f64 * 0.00001);
        srv.add(object(&format!("obj{}", i), lat, lng))
            .unwrap_or_else(|_| panic!("Failed to add object {}", i));
    }
    assert_eq!(srv.len(), 10_000);

    let query = Rect::new([40.0, -74.0], [0.01, 0.01]).unwrap();
    let results = srv.find_objects(&[query], None);
    assert!(!results.is_empty());
    assert!(results.len() < 10_000);
}

/// Extreme coordinate values around the poles and the antimeridian
#[test]
fn test_extreme_coordinates() {
    let srv = Server::new(25, 50).expect("Failed to create server");

    srv.add(object("north", 89.9999, 0.0)).unwrap();
    srv.add(object("south", -90.0, 0.0)).unwrap();
    srv.add(object("date_line_west", 0.0, 179.9999)).unwrap();
    srv.add(object("date_line_east", 0.0, -180.0)).unwrap();

    let polar = MapBounds::new(-1.0, 89.0, 1.0, -89.0).rects().unwrap();
    let mut ids: Vec<_> = srv
        .find_objects(&polar, None)
        .iter()
        .map(|o| o.id().to_string())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["north".to_string(), "south".to_string()]);

    let dateline = MapBounds::new(179.0, -1.0, -179.0, 1.0).rects().unwrap();
    let found = srv.find_objects(&dateline, None);
    assert_eq!(found.len(), 2);
}

/// Invalid inputs surface as errors and leave the index untouched
#[test]
fn test_invalid_inputs() {
    assert!(matches!(
        Object::at("nan", IndexableType(1), f64::NAN, 0.0, 0.1, 0.1, None),
        Err(GeoWatchError::InvalidRect(_))
    ));
    assert!(matches!(
        Rect::new([0.0, 0.0], [0.0, 0.0]),
        Err(GeoWatchError::InvalidRect(_))
    ));

    let srv = Server::new(25, 50).unwrap();
    let lst = srv.new_listener(10, Duration::from_millis(10)).unwrap();
    assert!(matches!(
        lst.set_bounds(MapBounds::new(0.0, 0.0, 10.0, 95.0)),
        Err(GeoWatchError::InvalidInput(_))
    ));
    assert!(lst.regions().is_empty());
    assert_eq!(srv.region_count(), 0);
}

/// Regions with a corner exactly on the antimeridian or a pole
#[test]
fn test_region_ending_on_antimeridian() {
    let srv = Server::new(25, 50).unwrap();
    let lst = srv.new_listener(10, Duration::from_millis(10)).unwrap();

    lst.set_bounds(MapBounds::new(170.0, -10.0, -180.0, 10.0))
        .unwrap();
    assert_eq!(lst.regions().len(), 1);

    lst.set_bounds(MapBounds::new(-10.0, 90.0, 10.0, 80.0))
        .unwrap();
    assert_eq!(lst.regions().len(), 1);
    assert_eq!(srv.region_count(), 1);
}

/// Unfiltered searches only ever see caller objects
#[test]
fn test_search_never_returns_region_markers() {
    let srv = Server::new(25, 50).unwrap();
    let lst = srv.new_listener(10, Duration::from_millis(10)).unwrap();
    lst.set_bounds(MapBounds::new(-10.0, -10.0, 10.0, 10.0))
        .unwrap();

    srv.add(object("a", 0.0, 0.0)).unwrap();
    srv.add(Arc::new(
        Object::at("b", IndexableType(2), 1.0, 1.0, 0.1, 0.1, None).unwrap(),
    ))
    .unwrap();

    let query = Rect::new([-5.0, -5.0], [10.0, 10.0]).unwrap();
    let found = srv.search(&query, None);
    assert_eq!(found.len(), 2);
    assert!(
        found
            .iter()
            .all(|o| o.kind() != IndexableType::REGION_MARKER && !o.id().starts_with("bbx:"))
    );
    assert_eq!(srv.region_count(), 1);
}

/// Bounds built from geo points use x = longitude, y = latitude
#[test]
fn test_bounds_from_points() {
    let bounds = MapBounds::from_points(Point::new(170.0, -5.0), Point::new(-170.0, 5.0));
    assert!(bounds.crosses_antimeridian());
    assert!(!bounds.crosses_pole());
    assert_eq!(bounds.rects().unwrap().len(), 2);
}

/// A full channel blocks the notifier, never the writer
#[test]
fn test_backpressure_does_not_block_writers() {
    let srv = Server::new(25, 50).unwrap();
    let mut lst = srv.new_listener(1, Duration::from_millis(1)).unwrap();
    lst.set_bounds(MapBounds::new(-10.0, -10.0, 10.0, 10.0))
        .unwrap();

    let start = Instant::now();
    for i in 0..500 {
        srv.add(object("mover", (i % 10) as f64, 0.0)).unwrap();
        if i % 50 == 0 {
            thread::sleep(Duration::from_millis(2));
        }
    }
    assert!(start.elapsed() < Duration::from_secs(5));

    // the notifier is still alive and delivering once drained
    let first = lst.updates().blocking_recv();
    assert!(first.is_some());
}

/// Many listeners on overlapping regions
#[test]
fn test_many_listeners() {
    let srv = Server::new(25, 50).unwrap();
    let listeners: Vec<_> = (0..50)
        .map(|i| {
            let lst = srv.new_listener(4, Duration::from_millis(10)).unwrap();
            let offset = i as f64 * 0.1;
            lst.set_bounds(MapBounds::new(-10.0 + offset, -10.0, 10.0 + offset, 10.0))
                .unwrap();
            lst
        })
        .collect();

    assert_eq!(srv.region_count(), 50);

    drop(listeners);
    assert_eq!(srv.region_count(), 0);
}
