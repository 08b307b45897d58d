// Admin panel state and operations.
//
// Holds the lists behind each admin tab. Every mutation goes to the backend
// first and then reloads the lists it affects; nothing is patched locally.
// Destructive actions are staged with `request` and only run on `confirm`.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use wellness_api::{AdminApi, ApiError};
use wellness_core::models::{
    Analytics, FeedbackEntry, KeywordEntry, KeywordUpdate, NewKeyword, PatientRecord,
    PatientUpdate, TextFeedbackEntry,
};
use wellness_core::time::{format_date_time, today_date};

use crate::protocol::{AdminAction, AdminSnapshot};

pub const CSV_HEADERS: [&str; 4] = ["User Name", "Rating", "Feedback", "Date"];

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("{0}")]
    Invalid(&'static str),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("failed to write export: {0}")]
    Export(#[from] csv::Error),

    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApprovalFilter {
    #[default]
    All,
    Approved,
    Pending,
}

impl ApprovalFilter {
    pub fn label(self) -> &'static str {
        match self {
            ApprovalFilter::All => "All",
            ApprovalFilter::Approved => "Approved",
            ApprovalFilter::Pending => "Pending",
        }
    }

    pub fn next(self) -> ApprovalFilter {
        match self {
            ApprovalFilter::All => ApprovalFilter::Approved,
            ApprovalFilter::Approved => ApprovalFilter::Pending,
            ApprovalFilter::Pending => ApprovalFilter::All,
        }
    }

    fn matches(self, patient: &PatientRecord) -> bool {
        match self {
            ApprovalFilter::All => true,
            ApprovalFilter::Approved => patient.is_approved,
            ApprovalFilter::Pending => !patient.is_approved,
        }
    }
}

/// Keywords whose name or any response contains `term` (case-insensitive).
pub fn filter_keywords<'a>(keywords: &'a [KeywordEntry], term: &str) -> Vec<&'a KeywordEntry> {
    let term = term.trim().to_lowercase();
    keywords
        .iter()
        .filter(|k| {
            term.is_empty()
                || k.keyword.to_lowercase().contains(&term)
                || k.responses.iter().any(|r| r.to_lowercase().contains(&term))
        })
        .collect()
}

/// Patients matching `term` on name, email or phone, and the approval filter.
pub fn filter_patients<'a>(
    patients: &'a [PatientRecord],
    term: &str,
    approval: ApprovalFilter,
) -> Vec<&'a PatientRecord> {
    let term = term.trim().to_lowercase();
    patients
        .iter()
        .filter(|p| approval.matches(p))
        .filter(|p| {
            term.is_empty()
                || p.name.to_lowercase().contains(&term)
                || p.email.to_lowercase().contains(&term)
                || p.phone.contains(&term)
        })
        .collect()
}

/// Chat ratings matching `term` on chat or feedback id, optionally limited to
/// one star rating.
pub fn filter_feedback<'a>(
    feedback: &'a [FeedbackEntry],
    term: &str,
    rating: Option<u8>,
) -> Vec<&'a FeedbackEntry> {
    let term = term.trim().to_lowercase();
    feedback
        .iter()
        .filter(|f| rating.is_none_or(|r| f.rating == r))
        .filter(|f| {
            term.is_empty()
                || f.chat_id.to_lowercase().contains(&term)
                || f.feedback_id.to_lowercase().contains(&term)
        })
        .collect()
}

/// Count of ratings 1 through 5; out-of-range ratings are ignored.
pub fn rating_distribution(feedback: &[FeedbackEntry]) -> [usize; 5] {
    let mut counts = [0usize; 5];
    for entry in feedback {
        if (1..=5).contains(&entry.rating) {
            counts[usize::from(entry.rating) - 1] += 1;
        }
    }
    counts
}

/// Default file name for a text feedback export.
pub fn export_file_name() -> String {
    format!("feedback-analytics-{}.csv", today_date())
}

/// Write text feedback as CSV. Returns the number of rows written.
pub fn write_text_feedback_csv(
    path: &Path,
    entries: &[TextFeedbackEntry],
) -> Result<usize, AdminError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(CSV_HEADERS)?;
    for entry in entries {
        let rating = entry.rating.to_string();
        let date = format_date_time(&entry.created_at);
        writer.write_record([
            entry.user_name.as_str(),
            rating.as_str(),
            entry.feedback.as_str(),
            date.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(entries.len())
}

// ---------------------------------------------------------------------------
// AdminPanel
// ---------------------------------------------------------------------------

pub struct AdminPanel {
    api: Arc<dyn AdminApi>,
    analytics: Option<Analytics>,
    feedback: Vec<FeedbackEntry>,
    text_feedback: Vec<TextFeedbackEntry>,
    keywords: Vec<KeywordEntry>,
    pending_users: Vec<PatientRecord>,
    patients: Vec<PatientRecord>,
    pending_action: Option<AdminAction>,
}

/// Keep the most relevant of several failures: unauthorized wins, otherwise
/// the first one seen.
fn keep_error(slot: &mut Option<ApiError>, err: ApiError) {
    match slot {
        Some(existing) if existing.is_unauthorized() || !err.is_unauthorized() => {}
        _ => *slot = Some(err),
    }
}

impl AdminPanel {
    pub fn new(api: Arc<dyn AdminApi>) -> Self {
        AdminPanel {
            api,
            analytics: None,
            feedback: Vec::new(),
            text_feedback: Vec::new(),
            keywords: Vec::new(),
            pending_users: Vec::new(),
            patients: Vec::new(),
            pending_action: None,
        }
    }

    pub fn analytics(&self) -> Option<&Analytics> {
        self.analytics.as_ref()
    }

    pub fn keywords(&self) -> &[KeywordEntry] {
        &self.keywords
    }

    pub fn pending_users(&self) -> &[PatientRecord] {
        &self.pending_users
    }

    pub fn patients(&self) -> &[PatientRecord] {
        &self.patients
    }

    pub fn text_feedback(&self) -> &[TextFeedbackEntry] {
        &self.text_feedback
    }

    pub fn pending_action(&self) -> Option<&AdminAction> {
        self.pending_action.as_ref()
    }

    /// Drop all loaded data (used on logout).
    pub fn clear(&mut self) {
        let api = Arc::clone(&self.api);
        *self = AdminPanel::new(api);
    }

    // -- Loading --

    async fn reload_analytics(&mut self) -> Result<(), ApiError> {
        self.analytics = Some(self.api.analytics().await?);
        Ok(())
    }

    async fn reload_feedback(&mut self) -> Result<(), ApiError> {
        self.feedback = self.api.chat_feedback().await?;
        Ok(())
    }

    async fn reload_text_feedback(&mut self) -> Result<(), ApiError> {
        self.text_feedback = self.api.text_feedbacks().await?;
        Ok(())
    }

    async fn reload_keywords(&mut self) -> Result<(), ApiError> {
        self.keywords = self.api.keywords().await?;
        Ok(())
    }

    async fn reload_users(&mut self) -> Result<(), ApiError> {
        self.pending_users = self.api.pending_users().await?;
        self.patients = self.api.patients().await?;
        Ok(())
    }

    /// Reload every list. Each list that fails keeps its previous contents;
    /// the most relevant failure is returned after all loads ran.
    pub async fn refresh_all(&mut self) -> Result<(), ApiError> {
        let mut failure = None;
        let results = [
            ("analytics", self.reload_analytics().await),
            ("chat feedback", self.reload_feedback().await),
            ("text feedback", self.reload_text_feedback().await),
            ("keywords", self.reload_keywords().await),
            ("users", self.reload_users().await),
        ];
        for (what, result) in results {
            if let Err(e) = result {
                warn!("Failed to load {}: {}", what, e);
                keep_error(&mut failure, e);
            }
        }
        match failure {
            Some(e) => Err(e),
            None => {
                info!(
                    "Admin data loaded: {} patients, {} pending, {} keywords",
                    self.patients.len(),
                    self.pending_users.len(),
                    self.keywords.len()
                );
                Ok(())
            }
        }
    }

    // -- Users --

    pub async fn approve_user(&mut self, id: &str) -> Result<String, AdminError> {
        self.api.approve_user(id).await?;
        info!("Approved user {}", id);
        self.reload_users().await?;
        self.reload_analytics().await?;
        Ok("User approved".to_string())
    }

    // -- Confirmed actions --

    pub fn request(&mut self, action: AdminAction) {
        self.pending_action = Some(action);
    }

    pub fn cancel(&mut self) {
        self.pending_action = None;
    }

    /// Run the staged action, if any. Returns the notice to show.
    pub async fn confirm(&mut self) -> Result<Option<String>, AdminError> {
        let Some(action) = self.pending_action.take() else {
            return Ok(None);
        };

        let message = match &action {
            AdminAction::RejectUser(id) => {
                self.api.reject_user(id).await?;
                self.reload_users().await?;
                "User rejected"
            }
            AdminAction::DeletePatient(id) => {
                self.api.delete_patient(id).await?;
                self.reload_users().await?;
                "Patient deleted"
            }
            AdminAction::DeleteKeyword(id) => {
                self.api.delete_keyword(id).await?;
                self.reload_keywords().await?;
                "Keyword deleted"
            }
        };
        info!("Admin action completed: {:?}", action);
        self.reload_analytics().await?;
        Ok(Some(message.to_string()))
    }

    // -- Keywords --

    /// Add a keyword, or another response to an existing one.
    pub async fn add_keyword(&mut self, keyword: &str, response: &str) -> Result<String, AdminError> {
        let keyword = keyword.trim();
        let response = response.trim();
        if keyword.is_empty() || response.is_empty() {
            return Err(AdminError::Invalid("Keyword and response are required"));
        }

        let ack = self
            .api
            .add_keyword(&NewKeyword {
                keyword: keyword.to_string(),
                response: response.to_string(),
            })
            .await?;
        info!("Added response for keyword {:?}", keyword);
        self.reload_keywords().await?;
        self.reload_analytics().await?;
        Ok(if ack.message.is_empty() {
            "Keyword added".to_string()
        } else {
            ack.message
        })
    }

    pub async fn update_keyword(
        &mut self,
        id: &str,
        keyword: &str,
        responses: &[String],
    ) -> Result<String, AdminError> {
        let keyword = keyword.trim();
        let responses: Vec<String> = responses
            .iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        if keyword.is_empty() || responses.is_empty() {
            return Err(AdminError::Invalid(
                "A keyword needs a name and at least one response",
            ));
        }

        let ack = self
            .api
            .update_keyword(
                id,
                &KeywordUpdate {
                    keyword: keyword.to_string(),
                    responses,
                },
            )
            .await?;
        info!("Updated keyword {}", id);
        self.reload_keywords().await?;
        Ok(if ack.message.is_empty() {
            "Keyword updated".to_string()
        } else {
            ack.message
        })
    }

    // -- Patients --

    pub async fn update_patient(
        &mut self,
        id: &str,
        update: &PatientUpdate,
    ) -> Result<String, AdminError> {
        if update.is_empty() {
            return Err(AdminError::Invalid("Nothing to update"));
        }
        self.api.update_patient(id, update).await?;
        info!("Updated patient {}", id);
        self.reload_users().await?;
        Ok("Patient updated".to_string())
    }

    // -- Export --

    pub fn export_text_feedback(&self, path: &Path) -> Result<usize, AdminError> {
        let rows = write_text_feedback_csv(path, &self.text_feedback)?;
        info!("Exported {} feedback rows to {}", rows, path.display());
        Ok(rows)
    }

    pub fn snapshot(&self) -> AdminSnapshot {
        AdminSnapshot {
            analytics: self.analytics.clone(),
            feedback: self.feedback.clone(),
            rating_distribution: rating_distribution(&self.feedback),
            text_feedback: self.text_feedback.clone(),
            keywords: self.keywords.clone(),
            pending_users: self.pending_users.clone(),
            patients: self.patients.clone(),
            pending_action: self.pending_action.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
