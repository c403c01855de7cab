use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{Profile, ProfileFields};
use crate::error::ApiError;

/// Request body for saving a profile. The whole form is submitted on every
/// save.
#[derive(Debug, Deserialize)]
pub struct SaveProfileRequest {
    pub name: String,
    pub age: i32,
    pub gender: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub existing_conditions: Option<String>,
    pub allergies: Option<String>,
    pub smoking_habit: Option<String>,
    pub alcohol_habit: Option<String>,
}

impl SaveProfileRequest {
    pub fn validate(self) -> Result<ProfileFields, ApiError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::Validation("Please enter your name.".into()));
        }
        if !(1..=130).contains(&self.age) {
            return Err(ApiError::Validation("Age must be between 1 and 130.".into()));
        }
        for (label, value) in [("Height", self.height_cm), ("Weight", self.weight_kg)] {
            if let Some(v) = value {
                if !(v > 0.0 && v.is_finite()) {
                    return Err(ApiError::Validation(format!("{label} must be positive.")));
                }
            }
        }

        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Ok(ProfileFields {
            name,
            age: self.age,
            gender: clean(self.gender),
            height_cm: self.height_cm,
            weight_kg: self.weight_kg,
            existing_conditions: clean(self.existing_conditions),
            allergies: clean(self.allergies),
            smoking_habit: clean(self.smoking_habit),
            alcohol_habit: clean(self.alcohol_habit),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    pub gender: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub existing_conditions: Option<String>,
    pub allergies: Option<String>,
    pub smoking_habit: Option<String>,
    pub alcohol_habit: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Profile> for ProfileResponse {
    fn from(p: Profile) -> Self {
        Self {
            id: p.id,
            name: p.name,
            age: p.age,
            gender: p.gender,
            height_cm: p.height_cm,
            weight_kg: p.weight_kg,
            existing_conditions: p.existing_conditions,
            allergies: p.allergies,
            smoking_habit: p.smoking_habit,
            alcohol_habit: p.alcohol_habit,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SaveProfileRequest {
        SaveProfileRequest {
            name: "  Alex  ".into(),
            age: 34,
            gender: Some("male".into()),
            height_cm: Some(170.0),
            weight_kg: Some(70.0),
            existing_conditions: Some("  ".into()),
            allergies: None,
            smoking_habit: Some("never".into()),
            alcohol_habit: None,
        }
    }

    #[test]
    fn validate_trims_and_drops_blank_fields() {
        let fields = request().validate().unwrap();
        assert_eq!(fields.name, "Alex");
        assert_eq!(fields.existing_conditions, None);
        assert_eq!(fields.smoking_habit.as_deref(), Some("never"));
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut r = request();
        r.name = "   ".into();
        assert!(matches!(r.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn out_of_range_age_is_rejected() {
        let mut r = request();
        r.age = 0;
        assert!(matches!(r.validate(), Err(ApiError::Validation(_))));
        let mut r = request();
        r.age = 200;
        assert!(matches!(r.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn non_positive_height_is_rejected() {
        let mut r = request();
        r.height_cm = Some(0.0);
        assert!(matches!(r.validate(), Err(ApiError::Validation(_))));
    }
}
