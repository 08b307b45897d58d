// Domain and wire types shared by the API client, the app layer and the TUI.
//
// Field names follow the backend's JSON. Everything the backend may omit is
// defaulted so partially-populated rows still decode.

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One entry in a conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    /// Backend urgency signal, clamped to 0..=10 on decode.
    #[serde(
        default,
        deserialize_with = "de_severity",
        skip_serializing_if = "Option::is_none"
    )]
    pub severity_score: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<String>,
    /// Shown on this client only; the stored transcript never has it.
    #[serde(skip)]
    pub local: bool,
}

impl Message {
    /// A message typed by the user, stamped with the current time.
    pub fn user(text: impl Into<String>) -> Self {
        Message {
            text: text.into(),
            sender: Sender::User,
            timestamp: crate::time::now_timestamp(),
            emotion: None,
            severity_score: None,
            entities: Vec::new(),
            local: false,
        }
    }

    /// A plain bot message (no annotations), stamped with the current time.
    pub fn bot(text: impl Into<String>) -> Self {
        Message {
            sender: Sender::Bot,
            ..Message::user(text)
        }
    }

    pub fn is_bot(&self) -> bool {
        self.sender == Sender::Bot
    }

    /// A bot reply that exists in the stored transcript.
    pub fn is_stored_reply(&self) -> bool {
        self.is_bot() && !self.local
    }
}

/// Clamp a severity score into the 0..=10 range. NaN is dropped.
pub fn clamp_severity(score: f32) -> Option<f32> {
    if score.is_nan() {
        None
    } else {
        Some(score.clamp(0.0, 10.0))
    }
}

fn de_severity<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<f32> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(clamp_severity))
}

/// A conversation as listed in the sidebar, or a search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSummary {
    #[serde(alias = "id")]
    pub chat_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub message_count: Option<u32>,
    #[serde(default)]
    pub match_count: Option<u32>,
}

impl ChatSummary {
    /// Title for display; the backend leaves it empty for some chats.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "New conversation"
        } else {
            &self.title
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatHistoryResponse {
    #[serde(default)]
    pub chats: Vec<ChatSummary>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatMessagesResponse {
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<ChatSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendRequest {
    pub user_id: String,
    pub message: String,
    pub chat_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SendResponse {
    pub response: String,
    pub chat_id: String,
    #[serde(default)]
    pub emotion: Option<String>,
    #[serde(default, deserialize_with = "de_severity")]
    pub severity_score: Option<f32>,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl SendResponse {
    /// The bot message carried by this response.
    pub fn to_message(&self) -> Message {
        Message {
            emotion: self.emotion.clone(),
            severity_score: self.severity_score,
            entities: self.entities.clone(),
            ..Message::bot(self.response.clone())
        }
    }
}

/// Per-message rating of a bot reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatFeedback {
    pub chat_id: String,
    pub message_index: usize,
    pub rating: u8,
    pub comments: String,
}

/// General portal feedback submitted from the patient dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextFeedbackRequest {
    pub user_id: String,
    pub rating: u8,
    pub feedback: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A canned prompt offered in the chat view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickAction {
    pub label: &'static str,
    pub prompt: &'static str,
}

pub const QUICK_ACTIONS: &[QuickAction] = &[
    QuickAction { label: "Symptom Checker", prompt: "I have some symptoms I want to discuss" },
    QuickAction { label: "Medication Info", prompt: "Tell me about medications for" },
    QuickAction { label: "Nutrition Advice", prompt: "I need nutrition and diet advice" },
    QuickAction { label: "Exercise Plan", prompt: "Help me create an exercise routine" },
    QuickAction { label: "Sleep Issues", prompt: "I'm having trouble with sleep" },
    QuickAction { label: "Mental Health", prompt: "I need mental health support" },
    QuickAction { label: "Book Appointment", prompt: "How can I book an appointment?" },
    QuickAction { label: "Emergency Help", prompt: "I need emergency medical advice" },
];

/// Speech and reply language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "ta")]
    Tamil,
    #[serde(rename = "hi")]
    Hindi,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::English, Language::Tamil, Language::Hindi];

    /// BCP 47 tag handed to the speech engine.
    pub fn tag(self) -> &'static str {
        match self {
            Language::English => "en-US",
            Language::Tamil => "ta-IN",
            Language::Hindi => "hi-IN",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Tamil => "Tamil",
            Language::Hindi => "Hindi",
        }
    }

    pub fn next(self) -> Language {
        match self {
            Language::English => Language::Tamil,
            Language::Tamil => Language::Hindi,
            Language::Hindi => Language::English,
        }
    }
}

// ---------------------------------------------------------------------------
// Users and auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Patient,
    Admin,
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(match raw.as_deref().map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("admin") => Role::Admin,
            _ => Role::Patient,
        })
    }
}

/// The signed-in user as cached on the client.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "_id", deserialize_with = "de_string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, deserialize_with = "de_string_or_number")]
    pub phone: String,
    #[serde(default, deserialize_with = "de_string_or_number")]
    pub age: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub blood_group: String,
    #[serde(default, deserialize_with = "de_string_or_number")]
    pub emergency_contact: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub medical_history: String,
}

/// Editable subset of the profile.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfileUpdate {
    pub name: String,
    pub phone: String,
    pub age: String,
    pub gender: String,
    pub blood_group: String,
    pub emergency_contact: String,
    pub address: String,
}

impl ProfileUpdate {
    pub fn from_user(user: &User) -> Self {
        ProfileUpdate {
            name: user.name.clone(),
            phone: user.phone.clone(),
            age: user.age.clone(),
            gender: user.gender.clone(),
            blood_group: user.blood_group.clone(),
            emergency_contact: user.emergency_contact.clone(),
            address: user.address.clone(),
        }
    }
}

impl User {
    pub fn apply_profile(&mut self, update: ProfileUpdate) {
        self.name = update.name;
        self.phone = update.phone;
        self.age = update.age;
        self.gender = update.gender;
        self.blood_group = update.blood_group;
        self.emergency_contact = update.emergency_contact;
        self.address = update.address;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub age: String,
    pub gender: String,
    pub password: String,
    pub emergency_contact: String,
    pub blood_group: String,
    pub address: String,
    pub medical_history: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub patient_id: Option<String>,
}

/// Generic `{"message": ...}` acknowledgement.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: String,
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Analytics {
    #[serde(default)]
    pub total_users: u64,
    #[serde(default)]
    pub approved_users: u64,
    #[serde(default)]
    pub pending_users: u64,
    #[serde(default)]
    pub rejected_users: u64,
    #[serde(default)]
    pub feedback_count: u64,
    #[serde(default)]
    pub keyword_count: u64,
    #[serde(default)]
    pub average_feedback: f64,
}

/// A stored per-message chat rating.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedbackEntry {
    #[serde(deserialize_with = "de_string_or_number")]
    pub feedback_id: String,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default)]
    pub message_index: u32,
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KeywordEntry {
    #[serde(rename = "_id")]
    pub id: String,
    pub keyword: String,
    #[serde(default)]
    pub responses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewKeyword {
    pub keyword: String,
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordUpdate {
    pub keyword: String,
    pub responses: Vec<String>,
}

/// A registered user as seen by the admin (pending or approved).
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct PatientRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, deserialize_with = "de_string_or_number")]
    pub phone: String,
    #[serde(default, deserialize_with = "de_string_or_number")]
    pub age: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub is_approved: bool,
}

/// Fields an admin may change on a patient record.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PatientUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl PatientUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.age.is_none()
            && self.gender.is_none()
            && self.phone.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextFeedbackEntry {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, deserialize_with = "de_string_or_number")]
    pub user_id: String,
    #[serde(default, deserialize_with = "de_string_or_number")]
    pub user_name: String,
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub created_at: String,
}

// ---------------------------------------------------------------------------
// Serde helpers
// ---------------------------------------------------------------------------

/// Accept a JSON string, number, or null and produce a string.
fn de_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
