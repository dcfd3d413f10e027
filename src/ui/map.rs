use strides::geo::GeoPoint;

/// Smallest span shown on either axis, in degrees (roughly 100 m).
const MIN_SPAN_DEG: f64 = 0.001;

/// Compute longitude (x) and latitude (y) bounds for the route canvas.
///
/// The route is padded by 10% on each side. With no route the view centers on
/// `anchor`, and with neither it falls back to the whole world.
pub fn route_bounds(route: &[GeoPoint], anchor: Option<GeoPoint>) -> ([f64; 2], [f64; 2]) {
    let points: Vec<GeoPoint> = if route.is_empty() {
        anchor.into_iter().collect()
    } else {
        route.to_vec()
    };

    if points.is_empty() {
        return ([-180.0, 180.0], [-90.0, 90.0]);
    }

    let (mut min_lon, mut max_lon) = (f64::MAX, f64::MIN);
    let (mut min_lat, mut max_lat) = (f64::MAX, f64::MIN);
    for p in &points {
        min_lon = min_lon.min(p.longitude);
        max_lon = max_lon.max(p.longitude);
        min_lat = min_lat.min(p.latitude);
        max_lat = max_lat.max(p.latitude);
    }

    (pad(min_lon, max_lon), pad(min_lat, max_lat))
}

fn pad(min: f64, max: f64) -> [f64; 2] {
    let span = (max - min).max(MIN_SPAN_DEG);
    let center = (min + max) / 2.0;
    let half = span * 1.2 / 2.0;
    [center - half, center + half]
}

/// Format a coordinate for the map title
pub fn format_coord(point: GeoPoint) -> String {
    let ns = if point.latitude >= 0.0 { 'N' } else { 'S' };
    let ew = if point.longitude >= 0.0 { 'E' } else { 'W' };
    format!(
        "{:.4}°{ns} {:.4}°{ew}",
        point.latitude.abs(),
        point.longitude.abs()
    )
}
