//! Step drafts and the per-session draft store.
//!
//! Each step owns a typed draft holding just its fields. Drafts are
//! populated from the persisted record on hydrate, edited while their step
//! is active, and turned into persisted fields by [`StepDraft::to_fields`]
//! when the step is submitted.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::merge::{Fields, merge_fields};
use super::model::{Address, OnboardingRecord};
use super::state::StepId;
use crate::error::OnboardingError;

/// Largest file accepted for any file field.
pub const MAX_FILE_BYTES: usize = 5 * 1024 * 1024;

/// A file-bearing form field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum FileSlot {
    /// Nothing chosen and nothing on file.
    #[default]
    Empty,
    /// Chosen this session, not uploaded yet.
    Pending { file_name: String, content: Vec<u8> },
    /// Uploaded; `url` is the stored content reference.
    Stored { url: String },
}

impl FileSlot {
    /// Slot for a previously persisted reference (empty string = nothing).
    pub fn from_reference(url: &str) -> Self {
        if url.trim().is_empty() {
            Self::Empty
        } else {
            Self::Stored {
                url: url.to_string(),
            }
        }
    }

    pub fn pending(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self::Pending {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    /// A new file or a prior reference is present.
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Empty)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Stored { url } => Some(url),
            _ => None,
        }
    }

    /// Persisted form of the slot. Pending files must be uploaded first.
    fn reference(&self) -> &str {
        self.url().unwrap_or_default()
    }
}

/// A file field of a draft and where it uploads to, relative to
/// `users/{uid}/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTarget {
    /// Draft field name, as the UI sends it.
    pub field: &'static str,
    pub folder: &'static str,
    pub prefix: &'static str,
}

impl UploadTarget {
    const fn new(field: &'static str, folder: &'static str, prefix: &'static str) -> Self {
        Self {
            field,
            folder,
            prefix,
        }
    }
}

const PROFILE_PHOTO: UploadTarget = UploadTarget::new("profilePhoto", "profile", "");
const CERTIFICATE: UploadTarget = UploadTarget::new("certificate", "certificates", "");
const RECORDING: UploadTarget = UploadTarget::new("recording", "testimonials", "");
const AADHAR_FRONT: UploadTarget = UploadTarget::new("aadharFront", "documents", "aadhar_front_");
const AADHAR_BACK: UploadTarget = UploadTarget::new("aadharBack", "documents", "aadhar_back_");
const PAN_CARD: UploadTarget = UploadTarget::new("panCard", "documents", "pan_");

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetailsDraft {
    pub full_name: String,
    pub district: String,
    pub sub_districts: Vec<String>,
    pub gender: String,
    pub agency: String,
    pub profile_photo: FileSlot,
    pub date_of_birth: Option<NaiveDate>,
}

/// Current + permanent address with the "same as current" branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressDraft {
    pub current_address: Address,
    pub permanent_address: Address,
    pub same_as_current: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WagesDraft {
    #[serde(rename = "lessThan5Hours")]
    pub under_5_hours: u32,
    pub hours_12: u32,
    pub hours_24: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EducationDraft {
    pub qualification: String,
    pub certificate: FileSlot,
    pub experience: String,
    pub marital_status: String,
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShiftsDraft {
    pub preferred_shifts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SkillsDraft {
    pub job_role: String,
    pub services: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalDraft {
    pub food_preference: String,
    pub smoking: String,
    pub carry_food: String,
    pub additional_info: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestimonialDraft {
    pub recording: FileSlot,
    pub customer_name: String,
    pub customer_phone: String,
}

impl TestimonialDraft {
    fn is_blank(&self) -> bool {
        !self.recording.is_present()
            && self.customer_name.trim().is_empty()
            && self.customer_phone.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdProofDraft {
    pub aadhar_number: String,
    pub aadhar_front: FileSlot,
    pub aadhar_back: FileSlot,
    pub pan_number: String,
    pub pan_card: FileSlot,
}

/// The draft for one step, tagged by step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "lowercase")]
pub enum StepDraft {
    Details(DetailsDraft),
    Address(AddressDraft),
    Wages(WagesDraft),
    Education(EducationDraft),
    Shifts(ShiftsDraft),
    Skills(SkillsDraft),
    Personal(PersonalDraft),
    Testimonial(TestimonialDraft),
    IdProof(IdProofDraft),
}

impl StepDraft {
    pub fn step(&self) -> StepId {
        match self {
            Self::Details(_) => StepId::Details,
            Self::Address(_) => StepId::Address,
            Self::Wages(_) => StepId::Wages,
            Self::Education(_) => StepId::Education,
            Self::Shifts(_) => StepId::Shifts,
            Self::Skills(_) => StepId::Skills,
            Self::Personal(_) => StepId::Personal,
            Self::Testimonial(_) => StepId::Testimonial,
            Self::IdProof(_) => StepId::IdProof,
        }
    }

    /// Empty draft for `step`; `None` for the terminal step.
    pub fn empty(step: StepId) -> Option<Self> {
        let draft = match step {
            StepId::Details => Self::Details(DetailsDraft::default()),
            StepId::Address => Self::Address(AddressDraft::default()),
            StepId::Wages => Self::Wages(WagesDraft::default()),
            StepId::Education => Self::Education(EducationDraft::default()),
            StepId::Shifts => Self::Shifts(ShiftsDraft::default()),
            StepId::Skills => Self::Skills(SkillsDraft::default()),
            StepId::Personal => Self::Personal(PersonalDraft::default()),
            StepId::Testimonial => Self::Testimonial(TestimonialDraft::default()),
            StepId::IdProof => Self::IdProof(IdProofDraft::default()),
            StepId::Completed => return None,
        };
        Some(draft)
    }

    /// Draft for `step` populated from a persisted record.
    pub fn from_record(step: StepId, record: &OnboardingRecord) -> Option<Self> {
        let draft = match step {
            StepId::Details => Self::Details(DetailsDraft {
                full_name: record.name.clone(),
                district: record.district.clone(),
                sub_districts: record.sub_districts.clone(),
                gender: record.gender.clone(),
                agency: record.agency.clone(),
                profile_photo: FileSlot::from_reference(&record.profile_photo),
                date_of_birth: NaiveDate::parse_from_str(&record.date_of_birth, "%Y-%m-%d").ok(),
            }),
            StepId::Address => Self::Address(AddressDraft {
                current_address: record.current_address.clone(),
                permanent_address: record.permanent_address.clone().unwrap_or_default(),
                same_as_current: record.is_current_address_same_as_permanent,
            }),
            StepId::Wages => Self::Wages(WagesDraft {
                under_5_hours: record.expected_wages.under_5_hours,
                hours_12: record.expected_wages.hours_12,
                hours_24: record.expected_wages.hours_24,
            }),
            StepId::Education => Self::Education(EducationDraft {
                qualification: record.education_qualification.clone(),
                certificate: FileSlot::from_reference(&record.education_certificate),
                experience: record.experience_years.clone(),
                marital_status: record.marital_status.clone(),
                languages: record.languages_known.clone(),
            }),
            StepId::Shifts => Self::Shifts(ShiftsDraft {
                preferred_shifts: record.preferred_shifts.clone(),
            }),
            StepId::Skills => Self::Skills(SkillsDraft {
                job_role: record.job_role.clone(),
                services: record.extra_services_offered.clone(),
            }),
            StepId::Personal => Self::Personal(PersonalDraft {
                food_preference: record.food_preference.clone(),
                smoking: record.smokes.clone(),
                carry_food: record.carry_own_food_12hrs.clone(),
                additional_info: record.additional_info.clone(),
            }),
            StepId::Testimonial => {
                let testimonial = record.self_testimonial.clone().unwrap_or_default();
                Self::Testimonial(TestimonialDraft {
                    recording: FileSlot::from_reference(&testimonial.recording),
                    customer_name: testimonial.customer_name,
                    customer_phone: testimonial.customer_phone,
                })
            }
            StepId::IdProof => {
                let docs = &record.identity_documents;
                Self::IdProof(IdProofDraft {
                    aadhar_number: docs.aadhar_number.clone(),
                    aadhar_front: FileSlot::from_reference(&docs.aadhar_front),
                    aadhar_back: FileSlot::from_reference(&docs.aadhar_back),
                    pan_number: docs.pan_number.clone(),
                    pan_card: FileSlot::from_reference(&docs.pan_document),
                })
            }
            StepId::Completed => return None,
        };
        Some(draft)
    }

    /// File slots of this draft with their upload destinations.
    pub fn file_slots(&self) -> Vec<(UploadTarget, &FileSlot)> {
        match self {
            Self::Details(d) => vec![(PROFILE_PHOTO, &d.profile_photo)],
            Self::Education(d) => vec![(CERTIFICATE, &d.certificate)],
            Self::Testimonial(d) => vec![(RECORDING, &d.recording)],
            Self::IdProof(d) => vec![
                (AADHAR_FRONT, &d.aadhar_front),
                (AADHAR_BACK, &d.aadhar_back),
                (PAN_CARD, &d.pan_card),
            ],
            _ => Vec::new(),
        }
    }

    pub fn file_slots_mut(&mut self) -> Vec<(UploadTarget, &mut FileSlot)> {
        match self {
            Self::Details(d) => vec![(PROFILE_PHOTO, &mut d.profile_photo)],
            Self::Education(d) => vec![(CERTIFICATE, &mut d.certificate)],
            Self::Testimonial(d) => vec![(RECORDING, &mut d.recording)],
            Self::IdProof(d) => vec![
                (AADHAR_FRONT, &mut d.aadhar_front),
                (AADHAR_BACK, &mut d.aadhar_back),
                (PAN_CARD, &mut d.pan_card),
            ],
            _ => Vec::new(),
        }
    }

    /// Reject pending files over [`MAX_FILE_BYTES`].
    pub fn check_file_sizes(&self) -> Result<(), OnboardingError> {
        for (target, slot) in self.file_slots() {
            if let FileSlot::Pending { content, .. } = slot {
                check_file_size(target.field, content.len())?;
            }
        }
        Ok(())
    }

    /// Persisted fields owned by this step.
    pub fn to_fields(&self) -> Fields {
        let value = match self {
            Self::Details(d) => json!({
                "name": d.full_name,
                "district": d.district,
                "subDistricts": d.sub_districts,
                "gender": d.gender,
                "agency": d.agency,
                "profilePhoto": d.profile_photo.reference(),
                "dateOfBirth": d
                    .date_of_birth
                    .map(|dob| dob.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            }),
            Self::Address(d) => json!({
                "currentAddress": d.current_address,
                "permanentAddress": if d.same_as_current {
                    Value::Null
                } else {
                    json!(d.permanent_address)
                },
                "isCurrentAddressSameAsPermanent": d.same_as_current,
            }),
            Self::Wages(d) => json!({
                "expectedWages": {
                    "5hrs": d.under_5_hours,
                    "12hrs": d.hours_12,
                    "24hrs": d.hours_24,
                },
            }),
            Self::Education(d) => json!({
                "educationQualification": d.qualification,
                "educationCertificate": d.certificate.reference(),
                "experienceYears": d.experience,
                "maritalStatus": d.marital_status,
                "languagesKnown": d.languages,
            }),
            Self::Shifts(d) => json!({ "preferredShifts": d.preferred_shifts }),
            Self::Skills(d) => json!({
                "jobRole": d.job_role,
                "extraServicesOffered": d.services,
            }),
            Self::Personal(d) => json!({
                "foodPreference": d.food_preference,
                "smokes": d.smoking,
                "carryOwnFood12hrs": d.carry_food,
                "additionalInfo": d.additional_info,
            }),
            Self::Testimonial(d) => json!({
                "selfTestimonial": if d.is_blank() {
                    Value::Null
                } else {
                    json!({
                        "customerName": d.customer_name,
                        "customerPhone": d.customer_phone,
                        "recording": d.recording.reference(),
                    })
                },
            }),
            Self::IdProof(d) => json!({
                "identityDocuments": {
                    "aadharNumber": d.aadhar_number,
                    "aadharFront": d.aadhar_front.reference(),
                    "aadharBack": d.aadhar_back.reference(),
                    "panNumber": d.pan_number,
                    "panDocument": d.pan_card.reference(),
                },
            }),
        };
        match value {
            Value::Object(map) => map,
            _ => Fields::new(),
        }
    }
}

fn check_file_size(field: &str, size: usize) -> Result<(), OnboardingError> {
    if size > MAX_FILE_BYTES {
        return Err(OnboardingError::FileTooLarge {
            field: field.to_string(),
            size,
            max: MAX_FILE_BYTES,
        });
    }
    Ok(())
}

/// One draft slot per step, scoped to the active session.
#[derive(Debug, Clone)]
pub struct DraftStore {
    slots: HashMap<StepId, StepDraft>,
}

impl Default for DraftStore {
    fn default() -> Self {
        let slots = StepId::ALL
            .into_iter()
            .filter_map(|step| StepDraft::empty(step).map(|d| (step, d)))
            .collect();
        Self { slots }
    }
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate every slot from a persisted record.
    pub fn from_record(record: &OnboardingRecord) -> Self {
        let slots = StepId::ALL
            .into_iter()
            .filter_map(|step| StepDraft::from_record(step, record).map(|d| (step, d)))
            .collect();
        Self { slots }
    }

    pub fn get(&self, step: StepId) -> Option<&StepDraft> {
        self.slots.get(&step)
    }

    pub fn get_mut(&mut self, step: StepId) -> Option<&mut StepDraft> {
        self.slots.get_mut(&step)
    }

    /// Replace the slot for the draft's own step.
    pub fn set(&mut self, draft: StepDraft) -> Result<(), OnboardingError> {
        draft.check_file_sizes()?;
        self.slots.insert(draft.step(), draft);
        Ok(())
    }

    /// Put a newly chosen file into the file field `field` of `step`.
    pub fn attach(
        &mut self,
        step: StepId,
        field: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<&StepDraft, OnboardingError> {
        check_file_size(field, content.len())?;
        let draft = self
            .slots
            .get_mut(&step)
            .ok_or_else(|| OnboardingError::InvalidDraft(format!("step {step} has no draft")))?;
        let Some((_, slot)) = draft
            .file_slots_mut()
            .into_iter()
            .find(|(target, _)| target.field == field)
        else {
            return Err(OnboardingError::InvalidDraft(format!(
                "step {step} has no file field {field}"
            )));
        };
        *slot = FileSlot::pending(file_name, content);
        Ok(&*draft)
    }

    /// Overlay a partial JSON object onto the slot for `step`.
    ///
    /// Top-level draft fields in `partial` replace the current values; the
    /// result must still decode as that step's draft.
    pub fn patch(&mut self, step: StepId, partial: &Value) -> Result<&StepDraft, OnboardingError> {
        let Some(partial) = partial.as_object() else {
            return Err(OnboardingError::InvalidDraft(
                "draft update must be a JSON object".to_string(),
            ));
        };
        let current = self
            .slots
            .get(&step)
            .ok_or_else(|| OnboardingError::InvalidDraft(format!("step {step} has no draft")))?;

        let mut fields = match serde_json::to_value(current) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Fields::new(),
            Err(e) => return Err(OnboardingError::InvalidDraft(e.to_string())),
        };
        merge_fields(&mut fields, partial);
        fields.insert("step".to_string(), Value::String(step.to_string()));

        let updated: StepDraft = serde_json::from_value(Value::Object(fields))
            .map_err(|e| OnboardingError::InvalidDraft(format!("{step}: {e}")))?;
        updated.check_file_sizes()?;
        self.slots.insert(step, updated);
        self.slots
            .get(&step)
            .ok_or_else(|| OnboardingError::InvalidDraft(format!("step {step} has no draft")))
    }
}
