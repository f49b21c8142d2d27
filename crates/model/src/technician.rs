use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::HasId;

use crate::{geometry::LatLng, ExampleData};

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Technician {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<LatLng>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Technician {
    /// The location, if it is present and usable for the map.
    pub fn valid_location(&self) -> Option<LatLng> {
        self.location.filter(LatLng::is_valid)
    }
}

impl HasId for Technician {
    type IdType = i64;
}

impl ExampleData for Technician {
    fn example_data() -> Self {
        Technician {
            name: "Jamie Rivera".to_owned(),
            email: Some("jamie.rivera@example.com".to_owned()),
            phone: None,
            location: Some(LatLng::new(47.6062, -122.3321)),
            is_active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_location_and_activity_use_defaults() {
        let technician: Technician =
            serde_json::from_str(r#"{"name":"Sam"}"#).unwrap();
        assert!(technician.location.is_none());
        assert!(technician.is_active);
    }

    #[test]
    fn invalid_location_is_not_usable() {
        let mut technician = Technician::example_data();
        assert!(technician.valid_location().is_some());
        technician.location = Some(LatLng::new(f64::NAN, 3.0));
        assert!(technician.valid_location().is_none());
    }
}
