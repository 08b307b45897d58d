// In-memory backends for unit tests.
//
// Each mock keeps its data behind a `Mutex` so tests can script responses and
// inspect the calls afterwards. `fail(op, status)` makes every later call to
// `op` return the error the HTTP client would produce for that status;
// `fail_with` also supplies the response body.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use wellness_api::{AdminApi, ApiError, AuthApi, ChatApi};
use wellness_core::models::{
    Ack, Analytics, ChatFeedback, ChatSummary, FeedbackEntry, KeywordEntry, KeywordUpdate,
    LoginRequest, LoginResponse, Message, NewKeyword, PatientRecord, PatientUpdate, Role,
    SendRequest, SendResponse, SignupRequest, SignupResponse, TextFeedbackEntry,
    TextFeedbackRequest, User,
};

use crate::speech::{SpeechError, SpeechSynthesizer, Utterance};

#[derive(Default)]
struct Failures {
    by_op: Mutex<HashMap<&'static str, (u16, &'static str)>>,
}

impl Failures {
    fn set(&self, op: &'static str, status: u16, body: &'static str) {
        self.by_op.lock().unwrap().insert(op, (status, body));
    }

    fn clear(&self, op: &'static str) {
        self.by_op.lock().unwrap().remove(op);
    }

    fn check(&self, op: &'static str) -> Result<(), ApiError> {
        match self.by_op.lock().unwrap().get(op) {
            Some((status, body)) => Err(ApiError::from_status(*status, body)),
            None => Ok(()),
        }
    }
}

pub(crate) fn user(id: &str, role: Role) -> User {
    User {
        id: id.to_string(),
        name: format!("User {id}"),
        email: format!("{id}@example.com"),
        role,
        ..User::default()
    }
}

pub(crate) fn summary(id: &str, title: &str) -> ChatSummary {
    ChatSummary {
        chat_id: id.to_string(),
        title: title.to_string(),
        last_message: None,
        preview: None,
        updated_at: None,
        message_count: None,
        match_count: None,
    }
}

pub(crate) fn reply(text: &str, chat_id: &str, severity: Option<f32>) -> SendResponse {
    SendResponse {
        response: text.to_string(),
        chat_id: chat_id.to_string(),
        emotion: None,
        severity_score: severity,
        entities: Vec::new(),
        language: None,
    }
}

pub(crate) fn patient(id: &str, name: &str, approved: bool) -> PatientRecord {
    PatientRecord {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        phone: "9876543210".to_string(),
        age: "30".to_string(),
        gender: "Female".to_string(),
        is_approved: approved,
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

pub(crate) struct MockChatApi {
    pub history: Mutex<Vec<ChatSummary>>,
    pub transcripts: Mutex<HashMap<String, Vec<Message>>>,
    pub reply: Mutex<SendResponse>,
    pub search_results: Mutex<Vec<ChatSummary>>,
    pub sent: Mutex<Vec<SendRequest>>,
    pub deleted: Mutex<Vec<String>>,
    pub searches: Mutex<Vec<String>>,
    pub feedback: Mutex<Vec<ChatFeedback>>,
    pub text_feedback: Mutex<Vec<TextFeedbackRequest>>,
    pub history_calls: AtomicUsize,
    failures: Failures,
}

impl MockChatApi {
    pub fn new() -> Self {
        MockChatApi {
            history: Mutex::new(Vec::new()),
            transcripts: Mutex::new(HashMap::new()),
            reply: Mutex::new(reply("Hi! How can I help?", "abc123", None)),
            search_results: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            searches: Mutex::new(Vec::new()),
            feedback: Mutex::new(Vec::new()),
            text_feedback: Mutex::new(Vec::new()),
            history_calls: AtomicUsize::new(0),
            failures: Failures::default(),
        }
    }

    pub fn fail(&self, op: &'static str, status: u16) {
        self.failures.set(op, status, "");
    }

    pub fn recover(&self, op: &'static str) {
        self.failures.clear(op);
    }

    pub fn set_transcript(&self, chat_id: &str, messages: Vec<Message>) {
        self.transcripts
            .lock()
            .unwrap()
            .insert(chat_id.to_string(), messages);
    }
}

#[async_trait]
impl ChatApi for MockChatApi {
    async fn chat_history(&self, _user_id: &str) -> Result<Vec<ChatSummary>, ApiError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.failures.check("history")?;
        Ok(self.history.lock().unwrap().clone())
    }

    async fn chat_messages(&self, chat_id: &str) -> Result<Vec<Message>, ApiError> {
        self.failures.check("messages")?;
        self.transcripts
            .lock()
            .unwrap()
            .get(chat_id)
            .cloned()
            .ok_or_else(|| ApiError::from_status(404, r#"{"error":"Chat not found"}"#))
    }

    async fn send_message(&self, req: &SendRequest) -> Result<SendResponse, ApiError> {
        self.sent.lock().unwrap().push(req.clone());
        self.failures.check("send")?;
        Ok(self.reply.lock().unwrap().clone())
    }

    async fn delete_chat(&self, chat_id: &str) -> Result<(), ApiError> {
        self.failures.check("delete")?;
        self.deleted.lock().unwrap().push(chat_id.to_string());
        self.history.lock().unwrap().retain(|c| c.chat_id != chat_id);
        Ok(())
    }

    async fn search_chats(&self, _user_id: &str, query: &str) -> Result<Vec<ChatSummary>, ApiError> {
        self.searches.lock().unwrap().push(query.to_string());
        self.failures.check("search")?;
        Ok(self.search_results.lock().unwrap().clone())
    }

    async fn submit_chat_feedback(&self, feedback: &ChatFeedback) -> Result<(), ApiError> {
        self.failures.check("feedback")?;
        self.feedback.lock().unwrap().push(feedback.clone());
        Ok(())
    }

    async fn submit_text_feedback(&self, feedback: &TextFeedbackRequest) -> Result<(), ApiError> {
        self.failures.check("text_feedback")?;
        self.text_feedback.lock().unwrap().push(feedback.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

pub(crate) struct MockAdminApi {
    pub analytics: Mutex<Analytics>,
    pub feedback: Mutex<Vec<FeedbackEntry>>,
    pub text_feedback: Mutex<Vec<TextFeedbackEntry>>,
    pub keywords: Mutex<Vec<KeywordEntry>>,
    pub pending: Mutex<Vec<PatientRecord>>,
    pub patients: Mutex<Vec<PatientRecord>>,
    pub patient_updates: Mutex<Vec<(String, PatientUpdate)>>,
    failures: Failures,
}

impl MockAdminApi {
    pub fn new() -> Self {
        MockAdminApi {
            analytics: Mutex::new(Analytics::default()),
            feedback: Mutex::new(Vec::new()),
            text_feedback: Mutex::new(Vec::new()),
            keywords: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
            patients: Mutex::new(Vec::new()),
            patient_updates: Mutex::new(Vec::new()),
            failures: Failures::default(),
        }
    }

    pub fn fail(&self, op: &'static str, status: u16) {
        self.failures.set(op, status, "");
    }
}

#[async_trait]
impl AdminApi for MockAdminApi {
    async fn analytics(&self) -> Result<Analytics, ApiError> {
        self.failures.check("analytics")?;
        Ok(self.analytics.lock().unwrap().clone())
    }

    async fn chat_feedback(&self) -> Result<Vec<FeedbackEntry>, ApiError> {
        self.failures.check("feedback")?;
        Ok(self.feedback.lock().unwrap().clone())
    }

    async fn text_feedbacks(&self) -> Result<Vec<TextFeedbackEntry>, ApiError> {
        self.failures.check("text_feedbacks")?;
        Ok(self.text_feedback.lock().unwrap().clone())
    }

    async fn keywords(&self) -> Result<Vec<KeywordEntry>, ApiError> {
        self.failures.check("keywords")?;
        Ok(self.keywords.lock().unwrap().clone())
    }

    async fn add_keyword(&self, keyword: &NewKeyword) -> Result<Ack, ApiError> {
        self.failures.check("add_keyword")?;
        let mut keywords = self.keywords.lock().unwrap();
        match keywords.iter_mut().find(|k| k.keyword == keyword.keyword) {
            Some(existing) => existing.responses.push(keyword.response.clone()),
            None => {
                let id = format!("kw{}", keywords.len() + 1);
                keywords.push(KeywordEntry {
                    id,
                    keyword: keyword.keyword.clone(),
                    responses: vec![keyword.response.clone()],
                });
            }
        }
        Ok(Ack {
            message: "Keyword added".to_string(),
        })
    }

    async fn update_keyword(&self, id: &str, update: &KeywordUpdate) -> Result<Ack, ApiError> {
        self.failures.check("update_keyword")?;
        let mut keywords = self.keywords.lock().unwrap();
        let entry = keywords
            .iter_mut()
            .find(|k| k.id == id)
            .ok_or_else(|| ApiError::from_status(404, ""))?;
        entry.keyword = update.keyword.clone();
        entry.responses = update.responses.clone();
        Ok(Ack {
            message: "Keyword updated".to_string(),
        })
    }

    async fn delete_keyword(&self, id: &str) -> Result<(), ApiError> {
        self.failures.check("delete_keyword")?;
        self.keywords.lock().unwrap().retain(|k| k.id != id);
        Ok(())
    }

    async fn pending_users(&self) -> Result<Vec<PatientRecord>, ApiError> {
        self.failures.check("pending")?;
        Ok(self.pending.lock().unwrap().clone())
    }

    async fn approve_user(&self, id: &str) -> Result<(), ApiError> {
        self.failures.check("approve")?;
        let mut pending = self.pending.lock().unwrap();
        if let Some(pos) = pending.iter().position(|p| p.id == id) {
            let mut record = pending.remove(pos);
            record.is_approved = true;
            self.patients.lock().unwrap().push(record);
        }
        Ok(())
    }

    async fn reject_user(&self, id: &str) -> Result<(), ApiError> {
        self.failures.check("reject")?;
        self.pending.lock().unwrap().retain(|p| p.id != id);
        Ok(())
    }

    async fn patients(&self) -> Result<Vec<PatientRecord>, ApiError> {
        self.failures.check("patients")?;
        Ok(self.patients.lock().unwrap().clone())
    }

    async fn update_patient(&self, id: &str, update: &PatientUpdate) -> Result<(), ApiError> {
        self.failures.check("update_patient")?;
        self.patient_updates
            .lock()
            .unwrap()
            .push((id.to_string(), update.clone()));
        let mut patients = self.patients.lock().unwrap();
        if let Some(p) = patients.iter_mut().find(|p| p.id == id) {
            if let Some(name) = &update.name {
                p.name = name.clone();
            }
            if let Some(phone) = &update.phone {
                p.phone = phone.clone();
            }
        }
        Ok(())
    }

    async fn delete_patient(&self, id: &str) -> Result<(), ApiError> {
        self.failures.check("delete_patient")?;
        self.patients.lock().unwrap().retain(|p| p.id != id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

pub(crate) struct MockAuthApi {
    pub login_user: Mutex<User>,
    pub token: Mutex<Option<String>>,
    pub signups: Mutex<Vec<SignupRequest>>,
    pub logins: AtomicUsize,
    failures: Failures,
}

impl MockAuthApi {
    pub fn new(login_user: User) -> Self {
        MockAuthApi {
            login_user: Mutex::new(login_user),
            token: Mutex::new(None),
            signups: Mutex::new(Vec::new()),
            logins: AtomicUsize::new(0),
            failures: Failures::default(),
        }
    }

    pub fn fail_with(&self, op: &'static str, status: u16, body: &'static str) {
        self.failures.set(op, status, body);
    }

    pub fn current_token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthApi for MockAuthApi {
    fn set_token(&self, token: Option<String>) {
        *self.token.lock().unwrap() = token;
    }

    async fn login(&self, _req: &LoginRequest) -> Result<LoginResponse, ApiError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        self.failures.check("login")?;
        Ok(LoginResponse {
            token: "tok-1".to_string(),
            user: self.login_user.lock().unwrap().clone(),
            message: None,
        })
    }

    async fn signup(&self, req: &SignupRequest) -> Result<SignupResponse, ApiError> {
        self.failures.check("signup")?;
        self.signups.lock().unwrap().push(req.clone());
        Ok(SignupResponse {
            message: "Signup successful! Await admin approval.".to_string(),
            patient_id: Some("P1001".to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Speech
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct MockSpeech {
    pub started: Mutex<Vec<Utterance>>,
    pub stops: AtomicUsize,
    active: AtomicBool,
}

impl MockSpeech {
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn spoken(&self) -> Vec<String> {
        self.started
            .lock()
            .unwrap()
            .iter()
            .map(|u| u.text.clone())
            .collect()
    }
}

impl SpeechSynthesizer for MockSpeech {
    fn start(&self, utterance: Utterance) -> Result<(), SpeechError> {
        if utterance.text.trim().is_empty() {
            return Err(SpeechError::Empty);
        }
        self.started.lock().unwrap().push(utterance);
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.active.store(false, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
