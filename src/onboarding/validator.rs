//! Step validators, one pure predicate per step.
//!
//! The controller re-runs the active step's validator after every draft
//! change, so the UI can disable "Next" before the user ever taps it.

use chrono::NaiveDate;
use serde::Serialize;

use super::draft::{
    AddressDraft, DetailsDraft, EducationDraft, IdProofDraft, PersonalDraft, ShiftsDraft,
    SkillsDraft, StepDraft, WagesDraft,
};
use super::model::Address;
use super::state::StepId;
use crate::error::ValidationError;

/// Outcome of validating the active step, as reported to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub step: StepId,
    pub can_advance: bool,
    pub missing: Vec<&'static str>,
}

impl ValidationReport {
    pub fn from_result(step: StepId, result: &Result<(), ValidationError>) -> Self {
        match result {
            Ok(()) => Self {
                step,
                can_advance: true,
                missing: Vec::new(),
            },
            Err(e) => Self {
                step,
                can_advance: false,
                missing: e.missing.clone(),
            },
        }
    }
}

/// Validate a step draft. `today` bounds the date of birth.
pub fn validate(draft: &StepDraft, today: NaiveDate) -> Result<(), ValidationError> {
    let mut missing = Vec::new();
    match draft {
        StepDraft::Details(d) => details(d, today, &mut missing),
        StepDraft::Address(d) => address(d, &mut missing),
        StepDraft::Wages(d) => wages(d, &mut missing),
        StepDraft::Education(d) => education(d, &mut missing),
        StepDraft::Shifts(d) => shifts(d, &mut missing),
        StepDraft::Skills(d) => skills(d, &mut missing),
        StepDraft::Personal(d) => personal(d, &mut missing),
        // Optional step
        StepDraft::Testimonial(_) => {}
        StepDraft::IdProof(d) => id_proof(d, &mut missing),
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            step: draft.step(),
            missing,
        })
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn require(missing: &mut Vec<&'static str>, ok: bool, field: &'static str) {
    if !ok {
        missing.push(field);
    }
}

fn details(d: &DetailsDraft, today: NaiveDate, missing: &mut Vec<&'static str>) {
    require(missing, !blank(&d.full_name), "fullName");
    require(missing, !blank(&d.district), "district");
    require(missing, !blank(&d.gender), "gender");
    require(missing, d.profile_photo.is_present(), "profilePhoto");
    require(missing, !blank(&d.agency), "agency");
    require(
        missing,
        d.date_of_birth.is_some_and(|dob| dob <= today),
        "dateOfBirth",
    );
}

const CURRENT_ADDRESS_FIELDS: [&str; 4] = [
    "currentAddress.street",
    "currentAddress.city",
    "currentAddress.state",
    "currentAddress.zip",
];

const PERMANENT_ADDRESS_FIELDS: [&str; 4] = [
    "permanentAddress.street",
    "permanentAddress.city",
    "permanentAddress.state",
    "permanentAddress.zip",
];

fn address_parts(address: &Address) -> [&str; 4] {
    [
        address.street.as_str(),
        address.city.as_str(),
        address.state.as_str(),
        address.zip.as_str(),
    ]
}

fn address(d: &AddressDraft, missing: &mut Vec<&'static str>) {
    for (value, field) in address_parts(&d.current_address)
        .into_iter()
        .zip(CURRENT_ADDRESS_FIELDS)
    {
        require(missing, !blank(value), field);
    }
    if d.same_as_current {
        return;
    }
    for (value, field) in address_parts(&d.permanent_address)
        .into_iter()
        .zip(PERMANENT_ADDRESS_FIELDS)
    {
        require(missing, !blank(value), field);
    }
}

fn wages(d: &WagesDraft, missing: &mut Vec<&'static str>) {
    require(missing, d.under_5_hours > 0, "lessThan5Hours");
    require(missing, d.hours_12 > 0, "hours12");
    require(missing, d.hours_24 > 0, "hours24");
}

fn education(d: &EducationDraft, missing: &mut Vec<&'static str>) {
    require(missing, !blank(&d.qualification), "qualification");
    require(missing, d.certificate.is_present(), "certificate");
    require(missing, !blank(&d.experience), "experience");
    require(missing, !blank(&d.marital_status), "maritalStatus");
    require(missing, !d.languages.is_empty(), "languages");
}

fn shifts(d: &ShiftsDraft, missing: &mut Vec<&'static str>) {
    require(missing, !d.preferred_shifts.is_empty(), "preferredShifts");
}

fn skills(d: &SkillsDraft, missing: &mut Vec<&'static str>) {
    require(missing, !blank(&d.job_role), "jobRole");
    require(missing, !d.services.is_empty(), "services");
}

fn personal(d: &PersonalDraft, missing: &mut Vec<&'static str>) {
    require(missing, !blank(&d.food_preference), "foodPreference");
    require(missing, !blank(&d.smoking), "smoking");
    require(missing, !blank(&d.carry_food), "carryFood");
}

fn id_proof(d: &IdProofDraft, missing: &mut Vec<&'static str>) {
    require(missing, !blank(&d.aadhar_number), "aadharNumber");
    require(missing, d.aadhar_front.is_present(), "aadharFront");
    require(missing, d.aadhar_back.is_present(), "aadharBack");
}
