//! OnboardingController: drives the step sequence, merges drafts into the
//! cumulative record, and persists after every forward transition.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::draft::{DraftStore, FileSlot, StepDraft};
use super::merge::{Fields, merge_fields};
use super::model::{OnboardingRecord, StaffIdentity, StaffStatus, collections, keys};
use super::registry::StepRegistry;
use super::state::StepId;
use super::validator::{self, ValidationReport};
use crate::error::{DatabaseError, OnboardingError, ValidationError};
use crate::store::Database;
use crate::uploads::{FileStore, sanitize_file_name};

/// The signed-in staff member the session belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffAccount {
    pub user_id: String,
    /// Verified phone number; may be empty when the auth layer has none.
    pub phone: String,
}

impl StaffAccount {
    pub fn new(user_id: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            phone: phone.into(),
        }
    }
}

/// Collaborators and settings shared by every controller.
#[derive(Clone)]
pub struct OnboardingDeps {
    pub db: Arc<dyn Database>,
    pub files: Arc<dyn FileStore>,
    pub registry: StepRegistry,
    /// Provider id stamped on every onboarding write.
    pub provider_id: String,
}

impl OnboardingDeps {
    pub fn new(db: Arc<dyn Database>, files: Arc<dyn FileStore>) -> Self {
        Self {
            db,
            files,
            registry: StepRegistry::default(),
            provider_id: "zense".to_string(),
        }
    }
}

/// One row of the progress indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressStep {
    pub id: StepId,
    pub label: &'static str,
    pub done: bool,
}

/// Where the applicant is in the sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub current: StepId,
    pub index: usize,
    pub total: usize,
    pub steps: Vec<ProgressStep>,
}

/// Per-session onboarding state machine.
///
/// Owns the step pointer, the draft store, and the cumulative record as last
/// acknowledged by the store. The pointer only moves forward after the store
/// acknowledges the write for that transition.
pub struct OnboardingController {
    account: StaffAccount,
    deps: OnboardingDeps,
    step: StepId,
    record: Fields,
    drafts: DraftStore,
}

impl OnboardingController {
    /// Start or resume a session from the persisted record.
    ///
    /// A missing record (or missing fields) means a first-time applicant:
    /// defaults apply silently.
    pub async fn hydrate(
        deps: OnboardingDeps,
        account: StaffAccount,
    ) -> Result<Self, OnboardingError> {
        let stored = deps
            .db
            .get_document(collections::STAFF, &account.user_id)
            .await?;

        let Some(record) = stored else {
            debug!(user_id = %account.user_id, "No onboarding record, starting fresh");
            let step = deps.registry.first();
            return Ok(Self {
                account,
                deps,
                step,
                record: Fields::new(),
                drafts: DraftStore::new(),
            });
        };

        let typed = OnboardingRecord::from_fields(&record)?;
        let step = typed
            .last_step
            .filter(|s| deps.registry.contains(*s))
            .unwrap_or_else(|| deps.registry.first());

        info!(user_id = %account.user_id, step = %step, "Resuming onboarding");
        Ok(Self {
            account,
            step,
            drafts: DraftStore::from_record(&typed),
            record,
            deps,
        })
    }

    pub fn account(&self) -> &StaffAccount {
        &self.account
    }

    /// Take a newer verified phone number from the auth layer.
    ///
    /// Blank values are ignored so a request without one can't erase it.
    pub fn refresh_phone(&mut self, phone: &str) {
        let phone = phone.trim();
        if !phone.is_empty() && phone != self.account.phone {
            debug!(user_id = %self.account.user_id, "Phone number updated");
            self.account.phone = phone.to_string();
        }
    }

    pub fn current_step(&self) -> StepId {
        self.step
    }

    pub fn is_completed(&self) -> bool {
        self.step.is_terminal()
    }

    /// Cumulative record as last persisted.
    pub fn record_fields(&self) -> &Fields {
        &self.record
    }

    /// Typed view of the cumulative record.
    pub fn record(&self) -> OnboardingRecord {
        OnboardingRecord::from_fields(&self.record).unwrap_or_default()
    }

    pub fn get_draft(&self, step: StepId) -> Option<&StepDraft> {
        self.drafts.get(step)
    }

    /// Replace the active step's draft and re-validate.
    pub fn set_draft(&mut self, draft: StepDraft) -> Result<ValidationReport, OnboardingError> {
        self.ensure_active(draft.step())?;
        self.drafts.set(draft)?;
        Ok(self.validation())
    }

    /// Put a newly chosen file into a file field of the active step.
    pub fn attach_file(
        &mut self,
        step: StepId,
        field: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<ValidationReport, OnboardingError> {
        self.ensure_active(step)?;
        self.drafts.attach(step, field, file_name, content)?;
        Ok(self.validation())
    }

    /// Apply a partial JSON update to the active step's draft and re-validate.
    pub fn patch_draft(
        &mut self,
        step: StepId,
        partial: &Value,
    ) -> Result<ValidationReport, OnboardingError> {
        self.ensure_active(step)?;
        self.drafts.patch(step, partial)?;
        Ok(self.validation())
    }

    /// Validation status of the active step's current draft.
    pub fn validation(&self) -> ValidationReport {
        let mut report = ValidationReport::from_result(self.step, &self.check_current());
        report.can_advance &= !self.step.is_terminal();
        report
    }

    pub fn can_advance(&self) -> bool {
        !self.step.is_terminal() && self.check_current().is_ok()
    }

    pub fn progress(&self) -> Progress {
        let registry = &self.deps.registry;
        let index = registry.position(self.step).unwrap_or(0);
        let steps = registry
            .entries()
            .iter()
            .enumerate()
            .map(|(i, entry)| ProgressStep {
                id: entry.id,
                label: entry.label,
                done: i < index,
            })
            .collect();
        Progress {
            current: self.step,
            index,
            total: registry.entries().len(),
            steps,
        }
    }

    /// Move back one step. Never validates, never persists, keeps drafts.
    pub fn retreat(&mut self) -> StepId {
        if self.step.is_terminal() {
            return self.step;
        }
        if let Some(previous) = self.deps.registry.previous(self.step) {
            debug!(user_id = %self.account.user_id, from = %self.step, to = %previous, "Step back");
            self.step = previous;
        }
        self.step
    }

    /// Submit the active step and move forward.
    ///
    /// Validates the draft, uploads any newly chosen files, merges the
    /// step's fields into the cumulative record and writes them. On any
    /// failure the pointer stays put and the draft is kept for a retry.
    pub async fn advance(&mut self) -> Result<StepId, OnboardingError> {
        let current = self.step;
        if current.is_terminal() {
            return Err(OnboardingError::Completed);
        }
        let next = self
            .deps
            .registry
            .next(current)
            .ok_or(OnboardingError::Completed)?;

        self.check_current()?;
        self.upload_pending(current).await?;

        let Some(draft) = self.drafts.get(current) else {
            return Err(OnboardingError::InvalidDraft(format!("step {current} has no draft")));
        };
        let mut fields = draft.to_fields();
        // A revisited step never pulls the resume point backwards.
        let last_step = self.deps.registry.furthest(self.persisted_step(), next);
        fields.insert(keys::LAST_STEP.to_string(), Value::from(last_step.as_str()));
        fields.insert(
            keys::PROVIDER_ID.to_string(),
            Value::from(self.deps.provider_id.as_str()),
        );

        if next.is_terminal() {
            self.complete(fields).await?;
        } else {
            self.write_record(&fields).await?;
            merge_fields(&mut self.record, &fields);
        }

        info!(user_id = %self.account.user_id, from = %current, to = %next, "Step saved");
        self.step = next;
        Ok(next)
    }

    /// Terminal transition: provision identity, flip its status, then save.
    ///
    /// The staff write carrying `lastStep=completed` goes last, so a failure
    /// anywhere before it resumes on the terminal step and can be retried.
    async fn complete(&mut self, mut fields: Fields) -> Result<(), OnboardingError> {
        self.provision_identity().await?;

        let mut status = Fields::new();
        status.insert(
            keys::STATUS.to_string(),
            Value::from(StaffStatus::Registered.as_str()),
        );
        self.deps
            .db
            .merge_document(collections::USERS, &self.account.user_id, &status)
            .await
            .inspect_err(|e| {
                warn!(user_id = %self.account.user_id, error = %e, "Failed to mark staff registered");
            })?;

        fields.extend(status);
        self.write_record(&fields).await?;
        merge_fields(&mut self.record, &fields);
        Ok(())
    }

    /// Create the identity record, or update it if it already exists.
    async fn provision_identity(&self) -> Result<(), OnboardingError> {
        let name = match self.drafts.get(StepId::Details) {
            Some(StepDraft::Details(details)) => details.full_name.clone(),
            _ => self.record().name,
        };
        let identity = StaffIdentity::new(name, self.account.phone.clone());
        let user_id = &self.account.user_id;

        let created = self
            .deps
            .db
            .create_document(collections::USERS, user_id, &identity.to_fields()?)
            .await?;

        if created {
            info!(user_id = %user_id, "Staff identity created");
        } else {
            info!(user_id = %user_id, "Staff identity already exists, updating");
            self.deps
                .db
                .merge_document(collections::USERS, user_id, &identity.to_update_fields()?)
                .await?;
        }
        Ok(())
    }

    async fn write_record(&self, fields: &Fields) -> Result<(), DatabaseError> {
        self.deps
            .db
            .merge_document(collections::STAFF, &self.account.user_id, fields)
            .await
            .inspect_err(|e| {
                warn!(
                    user_id = %self.account.user_id,
                    step = %self.step,
                    error = %e,
                    "Failed to save onboarding step"
                );
            })
    }

    /// Upload every pending file of `step`'s draft, swapping in its URL.
    ///
    /// Files that upload before a later one fails keep their URL, so a retry
    /// doesn't re-upload them.
    async fn upload_pending(&mut self, step: StepId) -> Result<(), OnboardingError> {
        let files = Arc::clone(&self.deps.files);
        let user_id = self.account.user_id.clone();
        let Some(draft) = self.drafts.get_mut(step) else {
            return Ok(());
        };

        for (target, slot) in draft.file_slots_mut() {
            let FileSlot::Pending { file_name, content } = &*slot else {
                continue;
            };
            let path = format!(
                "users/{user_id}/{}/{}{}_{}",
                target.folder,
                target.prefix,
                Uuid::new_v4().simple(),
                sanitize_file_name(file_name)
            );
            let url = files.upload(&path, content).await.inspect_err(|e| {
                warn!(user_id = %user_id, step = %step, error = %e, "Document upload failed");
            })?;
            debug!(user_id = %user_id, path = %path, "Document uploaded");
            *slot = FileSlot::Stored { url };
        }
        Ok(())
    }

    /// Resume point as last persisted, or the first step.
    fn persisted_step(&self) -> StepId {
        self.record
            .get(keys::LAST_STEP)
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<StepId>().ok())
            .filter(|s| self.deps.registry.contains(*s))
            .unwrap_or_else(|| self.deps.registry.first())
    }

    fn check_current(&self) -> Result<(), ValidationError> {
        match self.drafts.get(self.step) {
            Some(draft) => validator::validate(draft, today()),
            None => Ok(()),
        }
    }

    fn ensure_active(&self, requested: StepId) -> Result<(), OnboardingError> {
        if requested != self.step || self.step.is_terminal() {
            return Err(OnboardingError::InactiveStep {
                requested,
                active: self.step,
            });
        }
        Ok(())
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
