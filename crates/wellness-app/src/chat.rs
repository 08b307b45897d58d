// Chat session controller.
//
// Owns the open conversation, the sidebar history and search results, and
// the read-aloud state. Only `send_message` runs in the background: the
// request is spawned and its result returns as a `ChatEvent` tagged with the
// generation it was issued for. Starting, loading or leaving a conversation
// bumps the generation so late replies for it are dropped.

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use wellness_api::{ApiError, ChatApi};
use wellness_core::config::Config;
use wellness_core::models::{ChatFeedback, ChatSummary, Language, Message, SendRequest};

use crate::protocol::{ChatEvent, ChatSnapshot};
use crate::speech::{SpeechError, SpeechSynthesizer, Utterance};

/// Shown in place of a reply when the send fails.
pub const FALLBACK_REPLY: &str =
    "Sorry, I'm having trouble responding right now. Please try again.";

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("Start or open a conversation before rating a reply")]
    NoActiveChat,

    #[error("Rating must be between 1 and 5")]
    InvalidRating,

    #[error("Only assistant replies can be rated")]
    NotABotMessage,

    #[error("You have already rated this reply")]
    AlreadyRated,

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub struct ChatController {
    api: Arc<dyn ChatApi>,
    speech: Arc<dyn SpeechSynthesizer>,
    events: mpsc::Sender<ChatEvent>,

    user_id: Option<String>,
    severity_threshold: f32,
    speech_rate: f32,

    messages: Vec<Message>,
    current_chat_id: Option<String>,
    is_loading: bool,
    history: Vec<ChatSummary>,
    search_query: String,
    search_results: Vec<ChatSummary>,
    pending_delete: Option<String>,
    /// Indices of bot messages rated in the open conversation.
    rated: BTreeSet<usize>,
    language: Language,
    generation: u64,
    /// Generation the signed-in user's session started at. Replies issued
    /// before it belong to someone else.
    session_generation: u64,
    /// Index of the bot message whose appointment prompt was dismissed.
    dismissed_prompt: Option<usize>,
}

impl ChatController {
    pub fn new(
        api: Arc<dyn ChatApi>,
        speech: Arc<dyn SpeechSynthesizer>,
        events: mpsc::Sender<ChatEvent>,
        config: &Config,
    ) -> Self {
        ChatController {
            api,
            speech,
            events,
            user_id: None,
            severity_threshold: config.chat.severity_prompt_threshold,
            speech_rate: config.speech.rate,
            messages: Vec::new(),
            current_chat_id: None,
            is_loading: false,
            history: Vec::new(),
            search_query: String::new(),
            search_results: Vec::new(),
            pending_delete: None,
            rated: BTreeSet::new(),
            language: config.speech.language,
            generation: 0,
            session_generation: 0,
            dismissed_prompt: None,
        }
    }

    // -- Accessors --

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn current_chat_id(&self) -> Option<&str> {
        self.current_chat_id.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn history(&self) -> &[ChatSummary] {
        &self.history
    }

    pub fn search_results(&self) -> &[ChatSummary] {
        &self.search_results
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_rated(&self, index: usize) -> bool {
        self.rated.contains(&index)
    }

    // -- Session --

    /// Switch to another user (or none) and drop everything from the
    /// previous session.
    pub fn set_user(&mut self, user_id: Option<String>) {
        self.start_new_chat();
        self.session_generation = self.generation;
        self.is_loading = false;
        self.user_id = user_id;
        self.history.clear();
        self.search_query.clear();
        self.search_results.clear();
        self.pending_delete = None;
    }

    pub fn reset(&mut self) {
        self.set_user(None);
    }

    // -- Conversation --

    /// Send `text` in the open conversation. Returns `false` without touching
    /// any state when the text is blank, a send is already outstanding, or no
    /// user is signed in.
    pub fn send_message(&mut self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        if self.is_loading {
            debug!("Ignoring send while a reply is outstanding");
            return false;
        }
        let Some(user_id) = self.user_id.clone() else {
            warn!("Ignoring send without a signed-in user");
            return false;
        };

        self.messages.push(Message::user(text));
        self.is_loading = true;

        let req = SendRequest {
            user_id,
            message: text.to_string(),
            chat_id: self.current_chat_id.clone(),
        };
        let api = Arc::clone(&self.api);
        let tx = self.events.clone();
        let generation = self.generation;

        tokio::spawn(async move {
            let result = api.send_message(&req).await;
            if tx
                .send(ChatEvent::SendFinished { generation, result })
                .await
                .is_err()
            {
                debug!("Chat event channel closed before the reply arrived");
            }
        });

        info!(
            "Sent message in chat {:?} (gen: {})",
            self.current_chat_id, generation
        );
        true
    }

    /// Apply a finished send. Only an unauthorized error is returned for
    /// replies that no longer belong to the open conversation.
    pub async fn handle_event(&mut self, event: ChatEvent) -> Result<(), ApiError> {
        match event {
            ChatEvent::SendFinished { generation, result } => {
                if generation < self.session_generation {
                    debug!("Discarding reply from a previous session (gen {})", generation);
                    return Ok(());
                }
                self.is_loading = false;

                if generation != self.generation {
                    debug!(
                        "Discarding stale reply (gen {} != current {})",
                        generation, self.generation
                    );
                    return match result {
                        Err(e) if e.is_unauthorized() => Err(e),
                        _ => Ok(()),
                    };
                }

                match result {
                    Ok(resp) => {
                        self.messages.push(resp.to_message());
                        if !resp.chat_id.is_empty() {
                            self.current_chat_id = Some(resp.chat_id);
                        }
                        self.refresh_history().await
                    }
                    Err(e) => {
                        warn!("Chat send failed: {}", e);
                        if let Some(question) = self.messages.last_mut().filter(|m| !m.is_bot()) {
                            question.local = true;
                        }
                        self.messages.push(Message {
                            local: true,
                            ..Message::bot(FALLBACK_REPLY)
                        });
                        Err(e)
                    }
                }
            }
        }
    }

    /// Open a stored conversation, replacing whatever is on screen. A chat
    /// that no longer exists opens as a fresh conversation.
    pub async fn load_chat(&mut self, chat_id: &str) -> Result<(), ApiError> {
        match self.api.chat_messages(chat_id).await {
            Ok(messages) => {
                self.start_new_chat();
                info!("Loaded chat {} ({} messages)", chat_id, messages.len());
                self.messages = messages;
                self.current_chat_id = Some(chat_id.to_string());
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                info!("Chat {} not found; starting a new conversation", chat_id);
                self.start_new_chat();
                Ok(())
            }
            Err(e) => {
                warn!("Failed to load chat {}: {}", chat_id, e);
                Err(e)
            }
        }
    }

    pub fn start_new_chat(&mut self) {
        self.speech.stop();
        self.generation += 1;
        self.messages.clear();
        self.current_chat_id = None;
        self.rated.clear();
        self.dismissed_prompt = None;
    }

    // -- History, search, delete --

    /// Reload the sidebar. Failures keep the previous list.
    pub async fn refresh_history(&mut self) -> Result<(), ApiError> {
        let Some(user_id) = self.user_id.clone() else {
            return Ok(());
        };
        match self.api.chat_history(&user_id).await {
            Ok(history) => {
                self.history = history;
                Ok(())
            }
            Err(e) => {
                warn!("Failed to refresh chat history: {}", e);
                if e.is_unauthorized() {
                    Err(e)
                } else {
                    Ok(())
                }
            }
        }
    }

    pub async fn search_chats(&mut self, query: &str) -> Result<(), ApiError> {
        self.search_query = query.to_string();
        let query = query.trim();
        if query.is_empty() {
            self.search_results.clear();
            return Ok(());
        }
        let Some(user_id) = self.user_id.clone() else {
            self.search_results.clear();
            return Ok(());
        };

        match self.api.search_chats(&user_id, query).await {
            Ok(results) => {
                debug!("Search {:?} matched {} chats", query, results.len());
                self.search_results = results;
                Ok(())
            }
            Err(e) => {
                warn!("Chat search failed: {}", e);
                self.search_results.clear();
                if e.is_unauthorized() {
                    Err(e)
                } else {
                    Ok(())
                }
            }
        }
    }

    pub fn request_delete(&mut self, chat_id: &str) {
        self.pending_delete = Some(chat_id.to_string());
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Delete the chat awaiting confirmation. A chat the backend no longer
    /// has counts as deleted.
    pub async fn confirm_delete(&mut self) -> Result<(), ApiError> {
        let Some(chat_id) = self.pending_delete.take() else {
            return Ok(());
        };

        match self.api.delete_chat(&chat_id).await {
            Ok(()) => info!("Deleted chat {}", chat_id),
            Err(e) if e.is_not_found() => {
                info!("Chat {} was already gone", chat_id);
            }
            Err(e) => {
                warn!("Failed to delete chat {}: {}", chat_id, e);
                return Err(e);
            }
        }

        if self.current_chat_id.as_deref() == Some(chat_id.as_str()) {
            self.start_new_chat();
        }
        self.history.retain(|c| c.chat_id != chat_id);
        self.search_results.retain(|c| c.chat_id != chat_id);
        self.refresh_history().await
    }

    // -- Feedback --

    /// Rate a bot reply in the open conversation. Each reply can be rated
    /// once; the mark is only set after the backend accepts it.
    pub async fn submit_feedback(
        &mut self,
        message_index: usize,
        rating: u8,
        comments: &str,
    ) -> Result<(), FeedbackError> {
        let chat_id = self
            .current_chat_id
            .clone()
            .ok_or(FeedbackError::NoActiveChat)?;
        if !(1..=5).contains(&rating) {
            return Err(FeedbackError::InvalidRating);
        }
        if !self
            .messages
            .get(message_index)
            .is_some_and(Message::is_stored_reply)
        {
            return Err(FeedbackError::NotABotMessage);
        }
        if self.rated.contains(&message_index) {
            return Err(FeedbackError::AlreadyRated);
        }

        // The backend indexes its own transcript, which lacks local entries.
        let stored_index = self.messages[..message_index]
            .iter()
            .filter(|m| !m.local)
            .count();
        let feedback = ChatFeedback {
            chat_id,
            message_index: stored_index,
            rating,
            comments: comments.trim().to_string(),
        };
        self.api.submit_chat_feedback(&feedback).await?;

        info!(
            "Rated message {} in chat {} with {}",
            stored_index, feedback.chat_id, rating
        );
        self.rated.insert(message_index);
        Ok(())
    }

    // -- Speech --

    /// Read a bot reply aloud, cutting off anything already playing.
    pub fn speak(&mut self, index: usize) -> Result<(), SpeechError> {
        let text = self
            .messages
            .get(index)
            .filter(|m| m.is_bot())
            .map(|m| m.text.clone())
            .ok_or(SpeechError::Empty)?;

        self.speech.stop();
        self.speech.start(Utterance {
            text,
            language: self.language,
            rate: self.speech_rate,
        })
    }

    /// Stop if speaking, otherwise read the latest reply. Returns whether
    /// speech is now playing.
    pub fn toggle_speech(&mut self) -> Result<bool, SpeechError> {
        if self.speech.is_active() {
            self.speech.stop();
            return Ok(false);
        }
        let index = self.latest_bot_index().ok_or(SpeechError::Empty)?;
        self.speak(index)?;
        Ok(true)
    }

    pub fn stop_speech(&self) {
        self.speech.stop();
    }

    pub fn is_speaking(&self) -> bool {
        self.speech.is_active()
    }

    pub fn set_language(&mut self, language: Language) {
        if language != self.language {
            self.speech.stop();
            info!("Speech language set to {}", language.tag());
            self.language = language;
        }
    }

    // -- Appointment prompt --

    fn latest_bot_index(&self) -> Option<usize> {
        self.messages.iter().rposition(Message::is_bot)
    }

    /// Whether the latest reply is urgent enough to suggest booking an
    /// appointment.
    pub fn needs_appointment_prompt(&self) -> bool {
        let Some(index) = self.latest_bot_index() else {
            return false;
        };
        if self.dismissed_prompt == Some(index) {
            return false;
        }
        self.messages[index]
            .severity_score
            .is_some_and(|score| score >= self.severity_threshold)
    }

    pub fn dismiss_appointment_prompt(&mut self) {
        self.dismissed_prompt = self.latest_bot_index();
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            messages: self.messages.clone(),
            current_chat_id: self.current_chat_id.clone(),
            is_loading: self.is_loading,
            history: self.history.clone(),
            search_query: self.search_query.clone(),
            search_results: self.search_results.clone(),
            pending_delete: self.pending_delete.clone(),
            rated: self.rated.clone(),
            language: self.language,
            appointment_prompt: self.needs_appointment_prompt(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{reply, summary, MockChatApi, MockSpeech};
    use wellness_core::models::Sender;

    struct Harness {
        api: Arc<MockChatApi>,
        speech: Arc<MockSpeech>,
        rx: mpsc::Receiver<ChatEvent>,
        chat: ChatController,
    }

    fn harness() -> Harness {
        let api = Arc::new(MockChatApi::new());
        let speech = Arc::new(MockSpeech::default());
        let (tx, rx) = mpsc::channel(8);
        let mut chat = ChatController::new(
            Arc::clone(&api) as Arc<dyn ChatApi>,
            Arc::clone(&speech) as Arc<dyn SpeechSynthesizer>,
            tx,
            &Config::default(),
        );
        chat.set_user(Some("u1".to_string()));
        Harness {
            api,
            speech,
            rx,
            chat,
        }
    }

    impl Harness {
        /// Wait for the spawned send and apply its result.
        async fn finish_send(&mut self) -> Result<(), ApiError> {
            let event = self.rx.recv().await.expect("send event");
            self.chat.handle_event(event).await
        }
    }

    fn bot_with_severity(text: &str, score: f32) -> Message {
        Message {
            severity_score: Some(score),
            ..Message::bot(text)
        }
    }

    #[tokio::test]
    async fn send_appends_user_then_bot_message() {
        let mut h = harness();
        assert!(h.chat.send_message("hello"));

        assert_eq!(h.chat.messages().len(), 1);
        assert_eq!(h.chat.messages()[0].text, "hello");
        assert_eq!(h.chat.messages()[0].sender, Sender::User);
        assert!(h.chat.is_loading());

        h.finish_send().await.unwrap();

        let messages = h.chat.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].text, "Hi! How can I help?");
        assert_eq!(messages[1].sender, Sender::Bot);
        assert_eq!(h.chat.current_chat_id(), Some("abc123"));
        assert!(!h.chat.is_loading());
    }

    #[tokio::test]
    async fn send_request_carries_user_and_chat_id() {
        let mut h = harness();
        h.chat.send_message("first");
        h.finish_send().await.unwrap();
        h.chat.send_message("  second as typed ");
        h.finish_send().await.unwrap();

        let sent = h.api.sent.lock().unwrap();
        assert_eq!(sent[0].user_id, "u1");
        assert_eq!(sent[0].chat_id, None);
        assert_eq!(sent[1].chat_id.as_deref(), Some("abc123"));
        assert_eq!(sent[1].message, "  second as typed ");
    }

    #[tokio::test]
    async fn success_refreshes_history_after_reply() {
        let mut h = harness();
        *h.api.history.lock().unwrap() = vec![summary("abc123", "Headache")];
        h.chat.send_message("hello");
        h.finish_send().await.unwrap();

        assert_eq!(h.chat.history().len(), 1);
        assert_eq!(h.chat.history()[0].chat_id, "abc123");
    }

    #[tokio::test]
    async fn send_while_loading_is_a_no_op() {
        let mut h = harness();
        assert!(h.chat.send_message("one"));
        assert!(!h.chat.send_message("two"));
        assert_eq!(h.chat.messages().len(), 1);

        h.finish_send().await.unwrap();
        assert_eq!(h.api.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_or_signed_out_send_is_rejected() {
        let mut h = harness();
        assert!(!h.chat.send_message("   "));
        assert!(h.chat.messages().is_empty());

        h.chat.set_user(None);
        assert!(!h.chat.send_message("hello"));
        assert!(h.chat.messages().is_empty());
        assert!(!h.chat.is_loading());
    }

    #[tokio::test]
    async fn failed_send_appends_fallback_and_keeps_user_message() {
        let mut h = harness();
        h.api.fail("send", 500);
        h.chat.send_message("hello");
        let err = h.finish_send().await.unwrap_err();
        assert!(!err.is_unauthorized());

        let messages = h.chat.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "hello");
        assert_eq!(messages[1].text, FALLBACK_REPLY);
        assert!(!h.chat.is_loading());
        assert_eq!(h.chat.current_chat_id(), None);
    }

    #[tokio::test]
    async fn reply_for_abandoned_conversation_is_discarded() {
        let mut h = harness();
        h.chat.send_message("hello");
        h.chat.start_new_chat();
        assert!(h.chat.is_loading());

        h.finish_send().await.unwrap();
        assert!(h.chat.messages().is_empty());
        assert_eq!(h.chat.current_chat_id(), None);
        assert!(!h.chat.is_loading());
    }

    #[tokio::test]
    async fn stale_unauthorized_still_surfaces() {
        let mut h = harness();
        h.api.fail("send", 401);
        h.chat.send_message("hello");
        h.chat.start_new_chat();
        assert!(h.finish_send().await.unwrap_err().is_unauthorized());
        assert!(h.chat.messages().is_empty());
    }

    #[tokio::test]
    async fn load_chat_replaces_messages_exactly() {
        let mut h = harness();
        let stored = vec![Message::user("old question"), Message::bot("old answer")];
        h.api.set_transcript("c9", stored.clone());

        h.chat.send_message("draft");
        h.chat.load_chat("c9").await.unwrap();

        assert_eq!(h.chat.messages(), stored.as_slice());
        assert_eq!(h.chat.current_chat_id(), Some("c9"));

        // The reply for "draft" belongs to the previous conversation.
        h.finish_send().await.unwrap();
        assert_eq!(h.chat.messages(), stored.as_slice());
    }

    #[tokio::test]
    async fn load_missing_chat_opens_new_conversation() {
        let mut h = harness();
        h.chat.send_message("hello");
        h.finish_send().await.unwrap();

        h.chat.load_chat("gone").await.unwrap();
        assert!(h.chat.messages().is_empty());
        assert_eq!(h.chat.current_chat_id(), None);
    }

    #[tokio::test]
    async fn load_failure_keeps_current_view() {
        let mut h = harness();
        h.chat.send_message("hello");
        h.finish_send().await.unwrap();
        h.api.fail("messages", 500);

        assert!(h.chat.load_chat("c9").await.is_err());
        assert_eq!(h.chat.messages().len(), 2);
        assert_eq!(h.chat.current_chat_id(), Some("abc123"));
    }

    #[tokio::test]
    async fn deleting_open_chat_resets_to_new_chat() {
        let mut h = harness();
        *h.api.history.lock().unwrap() = vec![summary("abc123", "Hello"), summary("c2", "Other")];
        h.chat.send_message("hello");
        h.finish_send().await.unwrap();
        assert_eq!(h.chat.history().len(), 2);

        h.chat.request_delete("abc123");
        assert_eq!(h.chat.pending_delete(), Some("abc123"));
        h.chat.confirm_delete().await.unwrap();

        assert!(h.chat.messages().is_empty());
        assert_eq!(h.chat.current_chat_id(), None);
        assert_eq!(h.chat.pending_delete(), None);
        assert_eq!(h.chat.history().len(), 1);
        assert_eq!(h.api.deleted.lock().unwrap().as_slice(), ["abc123"]);
    }

    #[tokio::test]
    async fn deleting_other_chat_keeps_open_conversation() {
        let mut h = harness();
        h.chat.send_message("hello");
        h.finish_send().await.unwrap();

        h.chat.request_delete("c2");
        h.chat.confirm_delete().await.unwrap();
        assert_eq!(h.chat.messages().len(), 2);
        assert_eq!(h.chat.current_chat_id(), Some("abc123"));
    }

    #[tokio::test]
    async fn cancelled_delete_never_reaches_backend() {
        let mut h = harness();
        h.chat.request_delete("c2");
        h.chat.cancel_delete();
        h.chat.confirm_delete().await.unwrap();
        assert!(h.api.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_of_missing_chat_counts_as_deleted() {
        let mut h = harness();
        h.api.fail("delete", 404);
        h.chat.request_delete("c2");
        assert!(h.chat.confirm_delete().await.is_ok());
    }

    #[tokio::test]
    async fn blank_search_clears_without_backend_call() {
        let mut h = harness();
        *h.api.search_results.lock().unwrap() = vec![summary("c1", "Fever")];
        h.chat.search_chats("fever").await.unwrap();
        assert_eq!(h.chat.search_results().len(), 1);

        h.chat.search_chats("  ").await.unwrap();
        assert!(h.chat.search_results().is_empty());
        assert_eq!(h.api.searches.lock().unwrap().as_slice(), ["fever"]);
    }

    #[tokio::test]
    async fn search_errors_degrade_to_empty_results() {
        let mut h = harness();
        *h.api.search_results.lock().unwrap() = vec![summary("c1", "Fever")];
        h.chat.search_chats("fever").await.unwrap();

        h.api.fail("search", 500);
        h.chat.search_chats("fever").await.unwrap();
        assert!(h.chat.search_results().is_empty());

        h.api.fail("search", 401);
        assert!(h.chat.search_chats("fever").await.is_err());
    }

    #[tokio::test]
    async fn history_errors_keep_previous_list() {
        let mut h = harness();
        *h.api.history.lock().unwrap() = vec![summary("c1", "Fever")];
        h.chat.refresh_history().await.unwrap();

        h.api.fail("history", 503);
        h.chat.refresh_history().await.unwrap();
        assert_eq!(h.chat.history().len(), 1);

        h.api.recover("history");
        h.api.fail("history", 401);
        assert!(h.chat.refresh_history().await.unwrap_err().is_unauthorized());
    }

    #[tokio::test]
    async fn feedback_is_accepted_once_per_message() {
        let mut h = harness();
        h.chat.send_message("hello");
        h.finish_send().await.unwrap();

        h.chat.submit_feedback(1, 5, " great ").await.unwrap();
        assert!(h.chat.is_rated(1));
        let err = h.chat.submit_feedback(1, 4, "").await.unwrap_err();
        assert!(matches!(err, FeedbackError::AlreadyRated));

        let sent = h.api.feedback.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, "abc123");
        assert_eq!(sent[0].comments, "great");
    }

    #[tokio::test]
    async fn feedback_preconditions() {
        let mut h = harness();
        assert!(matches!(
            h.chat.submit_feedback(0, 5, "").await,
            Err(FeedbackError::NoActiveChat)
        ));

        h.chat.send_message("hello");
        h.finish_send().await.unwrap();
        assert!(matches!(
            h.chat.submit_feedback(1, 0, "").await,
            Err(FeedbackError::InvalidRating)
        ));
        assert!(matches!(
            h.chat.submit_feedback(0, 3, "").await,
            Err(FeedbackError::NotABotMessage)
        ));
        assert!(matches!(
            h.chat.submit_feedback(7, 3, "").await,
            Err(FeedbackError::NotABotMessage)
        ));
    }

    #[tokio::test]
    async fn rejected_feedback_can_be_retried() {
        let mut h = harness();
        h.chat.send_message("hello");
        h.finish_send().await.unwrap();

        h.api.fail("feedback", 500);
        assert!(matches!(
            h.chat.submit_feedback(1, 4, "").await,
            Err(FeedbackError::Api(_))
        ));
        assert!(!h.chat.is_rated(1));

        h.api.recover("feedback");
        h.chat.submit_feedback(1, 4, "").await.unwrap();
        assert!(h.chat.is_rated(1));
    }

    #[tokio::test]
    async fn severity_at_threshold_prompts_for_appointment() {
        let mut h = harness();
        h.api.set_transcript("urgent", vec![Message::user("chest pain"), bot_with_severity("See a doctor", 8.0)]);
        h.api.set_transcript("mild", vec![Message::user("sniffles"), bot_with_severity("Rest up", 3.0)]);

        h.chat.load_chat("urgent").await.unwrap();
        assert!(h.chat.needs_appointment_prompt());
        assert!(h.chat.snapshot().appointment_prompt);

        h.chat.dismiss_appointment_prompt();
        assert!(!h.chat.needs_appointment_prompt());

        h.chat.load_chat("mild").await.unwrap();
        assert!(!h.chat.needs_appointment_prompt());
    }

    #[tokio::test]
    async fn severity_from_reply_drives_prompt() {
        let mut h = harness();
        *h.api.reply.lock().unwrap() = reply("Please seek care", "abc123", Some(8.0));
        h.chat.send_message("I feel faint");
        h.finish_send().await.unwrap();
        assert!(h.chat.needs_appointment_prompt());
    }

    #[tokio::test]
    async fn speak_stops_before_starting() {
        let mut h = harness();
        h.chat.send_message("hello");
        h.finish_send().await.unwrap();
        let stops_before = h.speech.stop_count();

        h.chat.speak(1).unwrap();
        assert_eq!(h.speech.stop_count(), stops_before + 1);
        assert_eq!(h.speech.spoken(), vec!["Hi! How can I help?".to_string()]);
        assert!(matches!(h.chat.speak(0), Err(SpeechError::Empty)));
    }

    #[tokio::test]
    async fn toggle_speech_reads_latest_reply_then_stops() {
        let mut h = harness();
        assert!(matches!(h.chat.toggle_speech(), Err(SpeechError::Empty)));

        h.chat.send_message("hello");
        h.finish_send().await.unwrap();
        assert!(h.chat.toggle_speech().unwrap());
        assert!(h.chat.is_speaking());
        assert!(!h.chat.toggle_speech().unwrap());
        assert!(!h.chat.is_speaking());
    }

    #[tokio::test]
    async fn new_chat_and_language_change_stop_speech() {
        let mut h = harness();
        h.chat.send_message("hello");
        h.finish_send().await.unwrap();
        h.chat.speak(1).unwrap();

        h.chat.set_language(Language::Hindi);
        assert!(!h.speech.is_active());
        assert_eq!(h.chat.language(), Language::Hindi);

        h.chat.speak(1).unwrap();
        assert_eq!(h.speech.started.lock().unwrap()[1].language, Language::Hindi);
        h.chat.start_new_chat();
        assert!(!h.speech.is_active());
    }

    #[tokio::test]
    async fn reset_clears_session_state() {
        let mut h = harness();
        *h.api.history.lock().unwrap() = vec![summary("abc123", "Hello")];
        h.chat.send_message("hello");
        h.finish_send().await.unwrap();
        let generation = h.chat.generation();

        h.chat.reset();
        assert!(h.chat.messages().is_empty());
        assert!(h.chat.history().is_empty());
        assert!(h.chat.generation() > generation);
        assert!(!h.chat.is_loading());
        assert!(!h.chat.send_message("hello"));
    }

    #[tokio::test]
    async fn next_user_can_send_while_previous_reply_is_outstanding() {
        let mut h = harness();
        assert!(h.chat.send_message("hello"));
        h.chat.reset();
        assert!(!h.chat.is_loading());
        assert!(!h.chat.snapshot().is_loading);

        h.chat.set_user(Some("u2".to_string()));
        assert!(h.chat.send_message("a new question"));

        // The first reply still belongs to the signed-out user.
        h.finish_send().await.unwrap();
        assert!(h.chat.is_loading());
        assert_eq!(h.chat.messages().len(), 1);
        assert!(!h.chat.send_message("too soon"));

        h.finish_send().await.unwrap();
        assert!(!h.chat.is_loading());
        assert_eq!(h.chat.messages().len(), 2);
        assert_eq!(h.api.sent.lock().unwrap()[1].user_id, "u2");
    }

    #[tokio::test]
    async fn previous_users_unauthorized_reply_is_ignored() {
        let mut h = harness();
        h.api.fail("send", 401);
        h.chat.send_message("hello");
        h.chat.set_user(Some("u2".to_string()));
        h.finish_send().await.unwrap();
        assert!(h.chat.messages().is_empty());
    }

    #[tokio::test]
    async fn fallback_reply_cannot_be_rated() {
        let mut h = harness();
        h.chat.send_message("hello");
        h.finish_send().await.unwrap();

        h.api.fail("send", 500);
        h.chat.send_message("again");
        h.finish_send().await.unwrap_err();
        assert_eq!(h.chat.messages().len(), 4);
        assert!(h.chat.messages()[2].local);
        assert!(h.chat.messages()[3].local);

        assert!(matches!(
            h.chat.submit_feedback(3, 1, "").await,
            Err(FeedbackError::NotABotMessage)
        ));
        assert!(h.api.feedback.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rating_after_failed_send_posts_stored_index() {
        let mut h = harness();
        h.chat.send_message("hello");
        h.finish_send().await.unwrap();

        h.api.fail("send", 500);
        h.chat.send_message("again");
        h.finish_send().await.unwrap_err();

        h.api.recover("send");
        h.chat.send_message("third time");
        h.finish_send().await.unwrap();
        assert_eq!(h.chat.messages().len(), 6);

        h.chat.submit_feedback(5, 4, "").await.unwrap();
        assert!(h.chat.is_rated(5));
        assert_eq!(h.api.feedback.lock().unwrap()[0].message_index, 3);
    }
}
