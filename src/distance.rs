//! Great-circle distance between a fix and the configured reference point

/// Mean Earth radius (IUGG) in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Haversine distance in kilometres between two points given in decimal degrees
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` just outside [0, 1] for identical or antipodal points
    let a = a.clamp(0.0, 1.0);

    EARTH_RADIUS_KM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Named point distances are reported against
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePoint {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl Default for ReferencePoint {
    fn default() -> Self {
        Self {
            name: "Mawasi".to_string(),
            lat: 31.283,
            lon: 34.234,
        }
    }
}

impl ReferencePoint {
    pub fn distance_km(&self, lat: f64, lon: f64) -> f64 {
        haversine_km(lat, lon, self.lat, self.lon)
    }
}
