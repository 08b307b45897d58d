// Messages exchanged between the TUI and the application loop.
//
// The TUI sends `UserCommand`s; the app loop answers with `UiUpdate`s.
// Chat sends complete in a spawned task and come back as `ChatEvent`s.

use std::collections::BTreeSet;
use std::path::PathBuf;

use wellness_api::ApiError;
use wellness_core::models::{
    Analytics, ChatSummary, FeedbackEntry, KeywordEntry, Language, Message, PatientRecord,
    PatientUpdate, ProfileUpdate, SendResponse, TextFeedbackEntry, User,
};
use wellness_core::validation::{FieldErrors, LoginForm, SignupForm};

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatientSection {
    #[default]
    Overview,
    HealthRecords,
    Appointments,
    Profile,
}

impl PatientSection {
    pub const ALL: [PatientSection; 4] = [
        PatientSection::Overview,
        PatientSection::HealthRecords,
        PatientSection::Appointments,
        PatientSection::Profile,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PatientSection::Overview => "Overview",
            PatientSection::HealthRecords => "Health Records",
            PatientSection::Appointments => "Appointments",
            PatientSection::Profile => "Profile",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdminTab {
    #[default]
    Dashboard,
    Users,
    Patients,
    TextFeedback,
    Keywords,
    Feedback,
    Analytics,
}

impl AdminTab {
    pub const ALL: [AdminTab; 7] = [
        AdminTab::Dashboard,
        AdminTab::Users,
        AdminTab::Patients,
        AdminTab::TextFeedback,
        AdminTab::Keywords,
        AdminTab::Feedback,
        AdminTab::Analytics,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AdminTab::Dashboard => "Dashboard",
            AdminTab::Users => "Users",
            AdminTab::Patients => "Patients",
            AdminTab::TextFeedback => "Text Feedback",
            AdminTab::Keywords => "Keywords",
            AdminTab::Feedback => "Chat Feedback",
            AdminTab::Analytics => "Analytics",
        }
    }
}

/// Every screen the portal can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Signup,
    Patient(PatientSection),
    Admin(AdminTab),
    Chat,
}

// ---------------------------------------------------------------------------
// Commands (TUI -> app)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    Login(LoginForm),
    Signup(SignupForm),
    Logout,
    Navigate(Route),
    UpdateProfile(ProfileUpdate),
    /// General feedback form on the patient dashboard.
    SubmitPortalFeedback { rating: u8, text: String },
    Chat(ChatCommand),
    Admin(AdminCommand),
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    Send(String),
    Load(String),
    NewChat,
    Refresh,
    RequestDelete(String),
    ConfirmDelete,
    CancelDelete,
    Search(String),
    Rate {
        message_index: usize,
        rating: u8,
        comments: String,
    },
    Speak(usize),
    ToggleSpeech,
    StopSpeech,
    SetLanguage(Language),
    DismissAppointmentPrompt,
}

/// Admin actions that need an explicit confirmation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAction {
    RejectUser(String),
    DeletePatient(String),
    DeleteKeyword(String),
}

impl AdminAction {
    pub fn describe(&self) -> &'static str {
        match self {
            AdminAction::RejectUser(_) => "Reject and remove this user?",
            AdminAction::DeletePatient(_) => "Delete this patient permanently?",
            AdminAction::DeleteKeyword(_) => "Delete this keyword and its responses?",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdminCommand {
    Refresh,
    ApproveUser(String),
    Request(AdminAction),
    Confirm,
    Cancel,
    AddKeyword { keyword: String, response: String },
    UpdateKeyword {
        id: String,
        keyword: String,
        responses: Vec<String>,
    },
    UpdatePatient { id: String, update: PatientUpdate },
    ExportTextFeedback(PathBuf),
}

// ---------------------------------------------------------------------------
// Events (spawned tasks -> app)
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ChatEvent {
    /// A send finished. `generation` identifies the conversation it was
    /// issued for.
    SendFinished {
        generation: u64,
        result: Result<SendResponse, ApiError>,
    },
}

// ---------------------------------------------------------------------------
// Updates (app -> TUI)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Everything the chat view renders.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatSnapshot {
    pub messages: Vec<Message>,
    pub current_chat_id: Option<String>,
    pub is_loading: bool,
    pub history: Vec<ChatSummary>,
    pub search_query: String,
    pub search_results: Vec<ChatSummary>,
    pub pending_delete: Option<String>,
    pub rated: BTreeSet<usize>,
    pub language: Language,
    pub appointment_prompt: bool,
}

/// Everything the admin panel renders.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AdminSnapshot {
    pub analytics: Option<Analytics>,
    pub feedback: Vec<FeedbackEntry>,
    /// Count of chat ratings 1 through 5 (index 0 is rating 1).
    pub rating_distribution: [usize; 5],
    pub text_feedback: Vec<TextFeedbackEntry>,
    pub keywords: Vec<KeywordEntry>,
    pub pending_users: Vec<PatientRecord>,
    pub patients: Vec<PatientRecord>,
    pub pending_action: Option<AdminAction>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    Route(Route),
    /// Signed-in user, or `None` after logout.
    Session(Option<User>),
    /// Email to pre-fill on the login form.
    RememberedEmail(Option<String>),
    FormErrors(FieldErrors),
    SignupComplete(String),
    Chat(Box<ChatSnapshot>),
    Admin(Box<AdminSnapshot>),
    Speaking(bool),
    Notice(Notice),
}
