//! Step registry: the ordered list of onboarding steps and their labels.
//!
//! The controller only walks this list; reordering steps or dropping one is
//! an edit here (plus a validator arm), never a controller change.

use serde::Serialize;

use super::state::StepId;

/// One entry in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepEntry {
    pub id: StepId,
    pub label: &'static str,
}

/// Ordered list of onboarding steps.
#[derive(Debug, Clone)]
pub struct StepRegistry {
    steps: Vec<StepEntry>,
}

/// A step list the controller can't walk.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidRegistry {
    #[error("step registry must end with the completed step")]
    MissingTerminal,

    #[error("step {0} is listed more than once")]
    Duplicate(StepId),
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self {
            steps: vec![
                StepEntry { id: StepId::Details, label: "Details" },
                StepEntry { id: StepId::Address, label: "Address" },
                StepEntry { id: StepId::Wages, label: "Wages" },
                StepEntry { id: StepId::Education, label: "Education" },
                StepEntry { id: StepId::Shifts, label: "Shifts" },
                StepEntry { id: StepId::Skills, label: "Skills" },
                StepEntry { id: StepId::Personal, label: "Personal" },
                StepEntry { id: StepId::Testimonial, label: "Testimonial" },
                StepEntry { id: StepId::IdProof, label: "ID Proof" },
                StepEntry { id: StepId::Completed, label: "Completed" },
            ],
        }
    }
}

impl StepRegistry {
    /// Build a registry from an explicit list.
    ///
    /// The list must end with `Completed` and name each step once.
    pub fn new(steps: Vec<StepEntry>) -> Result<Self, InvalidRegistry> {
        if !steps.last().is_some_and(|e| e.id.is_terminal()) {
            return Err(InvalidRegistry::MissingTerminal);
        }
        for (i, entry) in steps.iter().enumerate() {
            if steps[..i].iter().any(|e| e.id == entry.id) {
                return Err(InvalidRegistry::Duplicate(entry.id));
            }
        }
        Ok(Self { steps })
    }

    pub fn entries(&self) -> &[StepEntry] {
        &self.steps
    }

    /// The step a fresh applicant starts on.
    pub fn first(&self) -> StepId {
        self.steps.first().map_or(StepId::Completed, |e| e.id)
    }

    /// Position of `step` in the sequence, if registered.
    pub fn position(&self, step: StepId) -> Option<usize> {
        self.steps.iter().position(|e| e.id == step)
    }

    pub fn contains(&self, step: StepId) -> bool {
        self.position(step).is_some()
    }

    /// Step after `step`, or `None` at the end (or if unregistered).
    pub fn next(&self, step: StepId) -> Option<StepId> {
        let idx = self.position(step)?;
        self.steps.get(idx + 1).map(|e| e.id)
    }

    /// Step before `step`, or `None` at the start (or if unregistered).
    pub fn previous(&self, step: StepId) -> Option<StepId> {
        let idx = self.position(step)?;
        idx.checked_sub(1).map(|i| self.steps[i].id)
    }

    /// The later of two registered steps.
    pub fn furthest(&self, a: StepId, b: StepId) -> StepId {
        match (self.position(a), self.position(b)) {
            (Some(pa), Some(pb)) if pa > pb => a,
            (Some(_), None) => a,
            _ => b,
        }
    }
}
