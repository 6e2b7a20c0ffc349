//! Persisted onboarding record and staff identity models.

use serde::{Deserialize, Deserializer, Serialize};

use super::merge::Fields;
use super::state::StepId;
use crate::error::DatabaseError;

/// Document collections used by the onboarding workflow.
pub mod collections {
    /// Cumulative onboarding record, keyed by user id.
    pub const STAFF: &str = "staff";
    /// Staff identity record (name, phone, role, status), keyed by user id.
    pub const USERS: &str = "users";
}

/// Persisted keys written by the controller itself (not by a step draft).
pub mod keys {
    pub const LAST_STEP: &str = "lastStep";
    pub const STATUS: &str = "status";
    pub const PROVIDER_ID: &str = "providerId";
}

/// Registration status of a staff member.
///
/// `Live` is set by the external approval process, never by this workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffStatus {
    #[default]
    Unregistered,
    Registered,
    Live,
}

impl StaffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unregistered => "unregistered",
            Self::Registered => "registered",
            Self::Live => "live",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

/// Expected wage per duty length, in rupees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpectedWages {
    #[serde(rename = "5hrs")]
    pub under_5_hours: u32,
    #[serde(rename = "12hrs")]
    pub hours_12: u32,
    #[serde(rename = "24hrs")]
    pub hours_24: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelfTestimonial {
    pub customer_name: String,
    pub customer_phone: String,
    pub recording: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdentityDocuments {
    pub aadhar_number: String,
    pub aadhar_front: String,
    pub aadhar_back: String,
    pub pan_number: String,
    pub pan_document: String,
}

/// Typed view of the cumulative onboarding document.
///
/// Every field defaults when absent, so a partially filled (or missing)
/// document always yields a usable record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OnboardingRecord {
    // details
    pub name: String,
    pub district: String,
    pub sub_districts: Vec<String>,
    pub gender: String,
    pub agency: String,
    pub profile_photo: String,
    pub date_of_birth: String,

    // address
    pub current_address: Address,
    pub permanent_address: Option<Address>,
    pub is_current_address_same_as_permanent: bool,

    // wages
    pub expected_wages: ExpectedWages,

    // education
    pub education_qualification: String,
    pub education_certificate: String,
    pub experience_years: String,
    pub marital_status: String,
    pub languages_known: Vec<String>,

    // shifts / skills
    pub preferred_shifts: Vec<String>,
    pub job_role: String,
    pub extra_services_offered: Vec<String>,

    // personal
    pub food_preference: String,
    pub smokes: String,
    #[serde(rename = "carryOwnFood12hrs")]
    pub carry_own_food_12hrs: String,
    pub additional_info: String,

    // testimonial / id proof
    pub self_testimonial: Option<SelfTestimonial>,
    pub identity_documents: IdentityDocuments,

    // bookkeeping
    #[serde(deserialize_with = "lenient_step", skip_serializing_if = "Option::is_none")]
    pub last_step: Option<StepId>,
    pub provider_id: String,
    pub status: StaffStatus,
}

/// Unknown step tags (e.g. from an older portal build) read as "no step".
fn lenient_step<'de, D>(deserializer: D) -> Result<Option<StepId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

impl OnboardingRecord {
    /// Decode a stored document into a typed record.
    pub fn from_fields(fields: &Fields) -> Result<Self, DatabaseError> {
        serde_json::from_value(serde_json::Value::Object(fields.clone()))
            .map_err(|e| DatabaseError::Serialization(format!("onboarding record: {e}")))
    }
}

/// Identity record provisioned when onboarding completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffIdentity {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phone: String,
    pub role: String,
    #[serde(default)]
    pub status: StaffStatus,
}

impl StaffIdentity {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            role: "staff".to_string(),
            status: StaffStatus::Unregistered,
        }
    }

    /// Fields for a first-time create.
    pub fn to_fields(&self) -> Result<Fields, DatabaseError> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(other) => Err(DatabaseError::Serialization(format!(
                "staff identity serialized to non-object: {other}"
            ))),
            Err(e) => Err(DatabaseError::Serialization(e.to_string())),
        }
    }

    /// Fields for updating an identity that already exists.
    ///
    /// Leaves `status` alone; it belongs to whoever owns the existing record.
    pub fn to_update_fields(&self) -> Result<Fields, DatabaseError> {
        let mut fields = self.to_fields()?;
        fields.remove(keys::STATUS);
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_document_yields_default_record() {
        let record = OnboardingRecord::from_fields(&Fields::new()).unwrap();
        assert_eq!(record, OnboardingRecord::default());
        assert!(record.last_step.is_none());
        assert_eq!(record.status, StaffStatus::Unregistered);
    }

    #[test]
    fn partial_document_fills_defaults() {
        let record = OnboardingRecord::from_fields(&fields(json!({
            "name": "Asha Rao",
            "expectedWages": { "12hrs": 900 },
            "permanentAddress": null,
            "lastStep": "education"
        })))
        .unwrap();

        assert_eq!(record.name, "Asha Rao");
        assert_eq!(record.expected_wages.hours_12, 900);
        assert_eq!(record.expected_wages.under_5_hours, 0);
        assert!(record.permanent_address.is_none());
        assert_eq!(record.last_step, Some(StepId::Education));
        assert!(record.languages_known.is_empty());
    }

    #[test]
    fn unknown_last_step_reads_as_none() {
        let record =
            OnboardingRecord::from_fields(&fields(json!({ "lastStep": "phone" }))).unwrap();
        assert!(record.last_step.is_none());
    }

    #[test]
    fn persisted_key_names() {
        let record = OnboardingRecord {
            carry_own_food_12hrs: "yes".into(),
            extra_services_offered: vec!["cooking".into()],
            ..Default::default()
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["carryOwnFood12hrs"], "yes");
        assert_eq!(value["extraServicesOffered"][0], "cooking");
        assert_eq!(value["expectedWages"]["5hrs"], 0);
        assert_eq!(value["status"], "unregistered");
        assert!(value.get("lastStep").is_none());
    }

    #[test]
    fn identity_update_fields_skip_status() {
        let identity = StaffIdentity::new("Asha Rao", "");
        let create = identity.to_fields().unwrap();
        assert_eq!(create["role"], "staff");
        assert_eq!(create["status"], "unregistered");
        assert!(create.get("phone").is_none());

        let update = identity.to_update_fields().unwrap();
        assert!(update.get("status").is_none());
        assert_eq!(update["name"], "Asha Rao");
    }
}
