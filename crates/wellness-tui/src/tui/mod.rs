// Terminal front end: view state, layout, input handling and widgets.
//
// The TUI owns a `ViewState` that mirrors what the app loop reports. The app
// loop pushes `UiUpdate` messages over an mpsc channel; the TUI applies them
// to `ViewState` and re-renders at ~30 fps. Key presses become
// `UserCommand`s or local edits of the view state.

pub mod form;
pub mod input;
pub mod layout;
pub mod widgets;

use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::Frame;
use tokio::sync::mpsc;

use wellness_app::admin::{filter_feedback, filter_keywords, filter_patients, ApprovalFilter};
use wellness_app::dashboard::{AppointmentTab, RecordCategory};
use wellness_app::protocol::{
    AdminSnapshot, AdminTab, ChatSnapshot, Notice, Route, UiUpdate, UserCommand,
};
use wellness_app::routing::home_for;
use wellness_core::models::{ChatSummary, FeedbackEntry, KeywordEntry, PatientRecord, User};
use wellness_core::validation::FieldErrors;

use form::Form;
use layout::build_layout;

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// What key presses currently edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    /// Typing a chat message.
    Compose,
    /// Typing a chat history search.
    Search,
    /// Typing an admin list filter.
    Filter,
    /// Writing general feedback on the overview page.
    Feedback,
    /// Rating a bot reply.
    Rating,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingDraft {
    pub message_index: usize,
    pub rating: u8,
    pub comments: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackDraft {
    pub rating: u8,
    pub text: String,
}

impl Default for FeedbackDraft {
    fn default() -> Self {
        FeedbackDraft {
            rating: 5,
            text: String::new(),
        }
    }
}

/// TUI-local state that mirrors the application state for rendering.
pub struct ViewState {
    pub route: Route,
    pub user: Option<User>,
    pub notice: Option<Notice>,
    pub form_errors: FieldErrors,
    pub login: Form,
    pub remember_me: bool,
    pub signup: Form,
    /// Modal form (profile, patient or keyword editor).
    pub editor: Option<Form>,
    pub mode: InputMode,
    pub confirm_quit: bool,
    pub speaking: bool,

    pub chat: ChatSnapshot,
    pub chat_input: String,
    pub search_text: String,
    /// Highlighted message; `None` follows the newest message.
    pub selected_message: Option<usize>,
    pub selected_chat: usize,
    pub rating_draft: Option<RatingDraft>,

    pub record_category: RecordCategory,
    pub appointment_tab: AppointmentTab,
    pub feedback: FeedbackDraft,

    pub admin: AdminSnapshot,
    pub admin_selected: usize,
    pub filter_text: String,
    pub approval_filter: ApprovalFilter,
    pub rating_filter: Option<u8>,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            route: Route::Login,
            user: None,
            notice: None,
            form_errors: FieldErrors::new(),
            login: Form::login(),
            remember_me: false,
            signup: Form::signup(),
            editor: None,
            mode: InputMode::Normal,
            confirm_quit: false,
            speaking: false,
            chat: ChatSnapshot::default(),
            chat_input: String::new(),
            search_text: String::new(),
            selected_message: None,
            selected_chat: 0,
            rating_draft: None,
            record_category: RecordCategory::default(),
            appointment_tab: AppointmentTab::default(),
            feedback: FeedbackDraft::default(),
            admin: AdminSnapshot::default(),
            admin_selected: 0,
            filter_text: String::new(),
            approval_filter: ApprovalFilter::default(),
            rating_filter: None,
        }
    }
}

impl ViewState {
    /// Landing page for the signed-in user, or the login screen.
    pub fn home_route(&self) -> Route {
        self.user
            .as_ref()
            .map(|u| home_for(u.role))
            .unwrap_or(Route::Login)
    }

    /// Search results while a search is active, otherwise the history.
    pub fn sidebar_chats(&self) -> &[ChatSummary] {
        if self.chat.search_query.trim().is_empty() {
            &self.chat.history
        } else {
            &self.chat.search_results
        }
    }

    pub fn selected_chat_id(&self) -> Option<&str> {
        self.sidebar_chats()
            .get(self.selected_chat)
            .map(|c| c.chat_id.as_str())
    }

    pub fn visible_patients(&self) -> Vec<&PatientRecord> {
        filter_patients(&self.admin.patients, &self.filter_text, self.approval_filter)
    }

    pub fn visible_keywords(&self) -> Vec<&KeywordEntry> {
        filter_keywords(&self.admin.keywords, &self.filter_text)
    }

    pub fn visible_feedback(&self) -> Vec<&FeedbackEntry> {
        filter_feedback(&self.admin.feedback, &self.filter_text, self.rating_filter)
    }

    /// Number of selectable rows on the current admin tab.
    pub fn admin_row_count(&self) -> usize {
        match self.route {
            Route::Admin(AdminTab::Users) => self.admin.pending_users.len(),
            Route::Admin(AdminTab::Patients) => self.visible_patients().len(),
            Route::Admin(AdminTab::Keywords) => self.visible_keywords().len(),
            Route::Admin(AdminTab::Feedback) => self.visible_feedback().len(),
            Route::Admin(AdminTab::TextFeedback) => self.admin.text_feedback.len(),
            _ => 0,
        }
    }

    /// Index of the message that speak/rate act on: the highlighted one, or
    /// the newest bot reply.
    pub fn target_message(&self) -> Option<usize> {
        match self.selected_message {
            Some(i) => Some(i),
            None => self.chat.messages.iter().rposition(|m| m.is_bot()),
        }
    }

    fn reset_signed_out(&mut self) {
        self.user = None;
        self.editor = None;
        self.mode = InputMode::Normal;
        self.chat_input.clear();
        self.search_text.clear();
        self.selected_message = None;
        self.selected_chat = 0;
        self.rating_draft = None;
        self.feedback = FeedbackDraft::default();
        self.filter_text.clear();
        self.login.clear_secrets();
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState.
pub fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::Route(route) => {
            if route != state.route {
                state.form_errors.clear();
                state.editor = None;
                state.mode = InputMode::Normal;
                state.admin_selected = 0;
                state.filter_text.clear();
                if route == Route::Login {
                    state.login.clear_secrets();
                }
            }
            state.route = route;
        }
        UiUpdate::Session(Some(user)) => {
            state.user = Some(user);
        }
        UiUpdate::Session(None) => {
            state.reset_signed_out();
        }
        UiUpdate::RememberedEmail(Some(email)) => {
            state.login.set_value(0, email);
            state.remember_me = true;
        }
        UiUpdate::RememberedEmail(None) => {
            state.remember_me = false;
        }
        UiUpdate::FormErrors(errors) => {
            state.form_errors = errors;
        }
        UiUpdate::SignupComplete(_) => {
            state.signup = Form::signup();
            state.form_errors.clear();
        }
        UiUpdate::Chat(snapshot) => {
            let len = snapshot.messages.len();
            if state.selected_message.is_some_and(|i| i >= len) {
                state.selected_message = None;
            }
            if state
                .rating_draft
                .as_ref()
                .is_some_and(|d| d.message_index >= len)
            {
                state.rating_draft = None;
                if state.mode == InputMode::Rating {
                    state.mode = InputMode::Normal;
                }
            }
            state.chat = *snapshot;
            let chats = state.sidebar_chats().len();
            state.selected_chat = state.selected_chat.min(chats.saturating_sub(1));
        }
        UiUpdate::Admin(snapshot) => {
            state.admin = *snapshot;
            let rows = state.admin_row_count();
            state.admin_selected = state.admin_selected.min(rows.saturating_sub(1));
        }
        UiUpdate::Speaking(active) => {
            state.speaking = active;
        }
        UiUpdate::Notice(notice) => {
            state.notice = Some(notice);
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

/// Render the complete frame for the current route.
pub fn render_frame(frame: &mut Frame, state: &ViewState) {
    let with_nav = !matches!(state.route, Route::Login | Route::Signup);
    let layout = build_layout(frame.area(), with_nav);

    widgets::status_bar::render(frame, layout.status_bar, state);
    if with_nav {
        widgets::nav::render(frame, layout.nav, state);
    }

    match state.route {
        Route::Login => widgets::auth::render_login(frame, layout.body, state),
        Route::Signup => widgets::auth::render_signup(frame, layout.body, state),
        Route::Patient(section) => widgets::patient::render(frame, layout.body, state, section),
        Route::Admin(tab) => widgets::admin::render(frame, layout.body, state, tab),
        Route::Chat => widgets::chat::render(frame, layout.body, state),
    }

    widgets::help_bar::render_notice(frame, layout.notice, state);
    widgets::help_bar::render(frame, layout.help_bar, state);

    // Overlays, topmost last.
    if let Some(editor) = &state.editor {
        widgets::form_panel::render_modal(frame, frame.area(), editor, &state.form_errors);
    }
    if state.route == Route::Chat {
        if let Some(draft) = &state.rating_draft {
            widgets::chat::render_rating(frame, frame.area(), draft);
        }
        if state.chat.pending_delete.is_some() {
            widgets::confirm::render(frame, frame.area(), " Delete chat? ", "Delete this conversation?");
        }
    }
    if let (Route::Admin(_), Some(action)) = (state.route, &state.admin.pending_action) {
        widgets::confirm::render(frame, frame.area(), " Confirm ", action.describe());
    }
    if state.confirm_quit {
        widgets::confirm::render(frame, frame.area(), " Quit? ", "Really quit?");
    }
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop.
///
/// 1. Initializes the terminal (raw mode, alternate screen).
/// 2. Installs a panic hook that restores the terminal.
/// 3. Selects over UI updates, keyboard input and the render tick.
/// 4. Restores the terminal on exit.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();

    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result = loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => apply_ui_update(&mut view_state, ui_update),
                    // App loop is gone.
                    None => break Ok(()),
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = matches!(cmd, UserCommand::Quit);
                            let _ = cmd_tx.send(cmd).await;
                            if quit {
                                break Ok(());
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(anyhow::Error::new(e).context("terminal input failed")),
                    None => break Ok(()),
                }
            }

            _ = render_tick.tick() => {
                if let Err(e) = terminal.draw(|frame| render_frame(frame, &view_state)) {
                    break Err(anyhow::Error::new(e).context("failed to draw frame"));
                }
            }
        }
    };

    ratatui::restore();
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
