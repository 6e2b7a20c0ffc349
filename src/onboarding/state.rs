//! Onboarding step identifiers.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The named stages of the onboarding form.
///
/// Ordering is owned by [`StepRegistry`](super::registry::StepRegistry);
/// `Completed` is terminal and carries no draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepId {
    Details,
    Address,
    Wages,
    Education,
    Shifts,
    Skills,
    Personal,
    Testimonial,
    IdProof,
    Completed,
}

impl StepId {
    /// Every step, in the default registry order.
    pub const ALL: [StepId; 10] = [
        StepId::Details,
        StepId::Address,
        StepId::Wages,
        StepId::Education,
        StepId::Shifts,
        StepId::Skills,
        StepId::Personal,
        StepId::Testimonial,
        StepId::IdProof,
        StepId::Completed,
    ];

    /// Whether this step is terminal (onboarding is done).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Wire/storage tag, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Details => "details",
            Self::Address => "address",
            Self::Wages => "wages",
            Self::Education => "education",
            Self::Shifts => "shifts",
            Self::Skills => "skills",
            Self::Personal => "personal",
            Self::Testimonial => "testimonial",
            Self::IdProof => "idproof",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returned when a step tag is not one of the known steps.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown onboarding step: {0}")]
pub struct UnknownStep(pub String);

impl FromStr for StepId {
    type Err = UnknownStep;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepId::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| UnknownStep(s.to_string()))
    }
}
