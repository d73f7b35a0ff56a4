use serde::{Deserialize, Serialize};

/// Delivery team available for the planning day
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: i64,
}

/// Truck bound to a team for the day
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    /// Truck code (e.g. "CAM-07")
    pub code: String,
    /// Price per kilometre of the truck type
    pub cost_per_km: f64,
}

impl Vehicle {
    pub fn new(code: impl Into<String>, cost_per_km: f64) -> Self {
        Self {
            code: code.into(),
            cost_per_km,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_deserialize_camel_case() {
        let json = r#"{"code": "CAM-01", "costPerKm": 1.25}"#;
        let vehicle: Vehicle = serde_json::from_str(json).unwrap();
        assert_eq!(vehicle.code, "CAM-01");
        assert!((vehicle.cost_per_km - 1.25).abs() < f64::EPSILON);
    }
}
