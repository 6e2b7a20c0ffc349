//! Staff onboarding: a linear, resumable multi-step form.
//!
//! An applicant walks a fixed sequence of steps. Each step owns a typed
//! draft; submitting a step validates it, uploads any chosen files and
//! merges the step's fields into the cumulative record. The record is
//! persisted after every forward transition, so a session can resume from
//! `lastStep` at any time. The terminal step also provisions the staff
//! identity record and marks the staff member registered.

pub mod controller;
pub mod draft;
pub mod merge;
pub mod model;
pub mod registry;
pub mod routes;
pub mod state;
pub mod validator;

pub use controller::{OnboardingController, OnboardingDeps, Progress, StaffAccount};
pub use draft::{DraftStore, FileSlot, MAX_FILE_BYTES, StepDraft};
pub use model::{OnboardingRecord, StaffIdentity, StaffStatus};
pub use registry::StepRegistry;
pub use routes::{OnboardingRouteState, SessionRegistry, onboarding_routes, spawn_idle_sweep};
pub use state::StepId;
pub use validator::ValidationReport;
