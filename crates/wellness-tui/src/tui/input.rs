// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages sent to the
// app loop, or into local ViewState edits (typing, selection, filters).

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use wellness_app::admin::export_file_name;
use wellness_app::dashboard::FEEDBACK_MAX_CHARS;
use wellness_app::protocol::{
    AdminAction, AdminCommand, AdminTab, ChatCommand, Notice, PatientSection, Route, UserCommand,
};
use wellness_core::models::QUICK_ACTIONS;

use super::form::Form;
use super::{InputMode, RatingDraft, ViewState};

/// Directory (relative to the working directory) that CSV exports land in.
pub const EXPORT_DIR: &str = "exports";

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press should be forwarded to the
/// app loop. Returns `None` when it was handled locally.
pub fn handle_key(key_event: KeyEvent, state: &mut ViewState) -> Option<UserCommand> {
    // Windows reports releases too.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    if is_ctrl(&key_event, 'c') {
        return Some(UserCommand::Quit);
    }

    if state.confirm_quit {
        return handle_confirm_quit(key_event, state);
    }

    if matches!(state.route, Route::Login | Route::Signup) {
        return handle_auth_form(key_event, state);
    }

    if state.editor.is_some() {
        return handle_editor(key_event, state);
    }

    if state.route == Route::Chat && state.chat.pending_delete.is_some() {
        return confirm_keys(
            key_event,
            UserCommand::Chat(ChatCommand::ConfirmDelete),
            UserCommand::Chat(ChatCommand::CancelDelete),
        );
    }

    if matches!(state.route, Route::Admin(_)) && state.admin.pending_action.is_some() {
        return confirm_keys(
            key_event,
            UserCommand::Admin(AdminCommand::Confirm),
            UserCommand::Admin(AdminCommand::Cancel),
        );
    }

    match state.mode {
        InputMode::Normal => handle_normal(key_event, state),
        InputMode::Compose => handle_compose(key_event, state),
        InputMode::Search => handle_search(key_event, state),
        InputMode::Filter => handle_filter(key_event, state),
        InputMode::Feedback => handle_feedback(key_event, state),
        InputMode::Rating => handle_rating(key_event, state),
    }
}

fn is_ctrl(key_event: &KeyEvent, c: char) -> bool {
    key_event.modifiers.contains(KeyModifiers::CONTROL) && key_event.code == KeyCode::Char(c)
}

/// Printable character of an unmodified (or shifted) key press.
fn typed_char(key_event: &KeyEvent) -> Option<char> {
    match key_event.code {
        KeyCode::Char(c)
            if !key_event
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            Some(c)
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Confirmation prompts
// ---------------------------------------------------------------------------

fn handle_confirm_quit(key_event: KeyEvent, state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Char('q') | KeyCode::Char('Q') => {
            Some(UserCommand::Quit)
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            state.confirm_quit = false;
            None
        }
        _ => None,
    }
}

/// `y` confirms, `n`/Esc cancels, everything else is blocked.
fn confirm_keys(key_event: KeyEvent, yes: UserCommand, no: UserCommand) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => Some(yes),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(no),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

/// Shared field editing. Returns `true` when the key was consumed.
fn edit_form(key_event: &KeyEvent, form: &mut Form) -> bool {
    match key_event.code {
        KeyCode::Tab | KeyCode::Down => form.next_field(),
        KeyCode::BackTab | KeyCode::Up => form.prev_field(),
        KeyCode::Backspace => form.backspace(),
        _ => match typed_char(key_event) {
            Some(c) => form.push_char(c),
            None => return false,
        },
    }
    true
}

fn handle_auth_form(key_event: KeyEvent, state: &mut ViewState) -> Option<UserCommand> {
    let on_login = state.route == Route::Login;

    if on_login && is_ctrl(&key_event, 'n') {
        return Some(UserCommand::Navigate(Route::Signup));
    }
    if on_login && is_ctrl(&key_event, 'r') {
        state.remember_me = !state.remember_me;
        return None;
    }

    match key_event.code {
        KeyCode::Esc if on_login => {
            state.confirm_quit = true;
            None
        }
        KeyCode::Esc => Some(UserCommand::Navigate(Route::Login)),
        KeyCode::Enter => {
            let form = if on_login { &state.login } else { &state.signup };
            form.submit(state.remember_me)
        }
        _ => {
            let form = if on_login {
                &mut state.login
            } else {
                &mut state.signup
            };
            edit_form(&key_event, form);
            None
        }
    }
}

fn handle_editor(key_event: KeyEvent, state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Esc => {
            state.editor = None;
            None
        }
        KeyCode::Enter => {
            let cmd = state.editor.take().and_then(|form| form.submit(false));
            if cmd.is_none() {
                state.notice = Some(Notice::info("Nothing to update."));
            }
            cmd
        }
        _ => {
            if let Some(form) = state.editor.as_mut() {
                edit_form(&key_event, form);
            }
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Normal mode
// ---------------------------------------------------------------------------

fn handle_normal(key_event: KeyEvent, state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('q') => {
            state.confirm_quit = true;
            return None;
        }
        KeyCode::Char('L') => return Some(UserCommand::Logout),
        KeyCode::Esc if state.notice.is_some() => {
            state.notice = None;
            return None;
        }
        _ => {}
    }

    match state.route {
        Route::Chat => handle_chat_keys(key_event, state),
        Route::Patient(section) => handle_patient_keys(key_event, state, section),
        Route::Admin(tab) => handle_admin_keys(key_event, state, tab),
        Route::Login | Route::Signup => None,
    }
}

/// Move one section left or right within the current area, wrapping.
fn step_section(route: Route, forward: bool) -> Option<Route> {
    fn step<T: Copy + PartialEq>(all: &[T], current: T, forward: bool) -> Option<T> {
        let i = all.iter().position(|x| *x == current)?;
        let n = all.len();
        let j = if forward { (i + 1) % n } else { (i + n - 1) % n };
        Some(all[j])
    }

    match route {
        Route::Patient(section) => step(&PatientSection::ALL, section, forward).map(Route::Patient),
        Route::Admin(tab) => step(&AdminTab::ALL, tab, forward).map(Route::Admin),
        _ => None,
    }
}

/// Keys shared by the patient and admin areas.
fn handle_area_keys(key_event: &KeyEvent, state: &ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Right | KeyCode::Tab => {
            step_section(state.route, true).map(UserCommand::Navigate)
        }
        KeyCode::Left | KeyCode::BackTab => {
            step_section(state.route, false).map(UserCommand::Navigate)
        }
        KeyCode::Char('c') => Some(UserCommand::Navigate(Route::Chat)),
        _ => None,
    }
}

fn handle_patient_keys(
    key_event: KeyEvent,
    state: &mut ViewState,
    section: PatientSection,
) -> Option<UserCommand> {
    if let Some(cmd) = handle_area_keys(&key_event, state) {
        return Some(cmd);
    }

    match (section, key_event.code) {
        (PatientSection::Overview, KeyCode::Char('f')) => {
            state.mode = InputMode::Feedback;
            None
        }
        (PatientSection::HealthRecords, KeyCode::Char('f')) => {
            state.record_category = state.record_category.next();
            None
        }
        (PatientSection::Appointments, KeyCode::Char('f')) => {
            state.appointment_tab = state.appointment_tab.next();
            None
        }
        (PatientSection::Profile, KeyCode::Char('e')) => {
            state.editor = state.user.as_ref().map(Form::profile);
            None
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

fn handle_chat_keys(key_event: KeyEvent, state: &mut ViewState) -> Option<UserCommand> {
    let chat = |cmd: ChatCommand| Some(UserCommand::Chat(cmd));

    match key_event.code {
        KeyCode::Esc => Some(UserCommand::Navigate(state.home_route())),
        KeyCode::Enter | KeyCode::Char('i') => {
            state.mode = InputMode::Compose;
            None
        }
        KeyCode::Char('/') => {
            state.mode = InputMode::Search;
            None
        }
        KeyCode::Up | KeyCode::Char('k') => {
            select_previous_message(state);
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            select_next_message(state);
            None
        }
        KeyCode::Char('[') => {
            state.selected_chat = state.selected_chat.saturating_sub(1);
            None
        }
        KeyCode::Char(']') => {
            let last = state.sidebar_chats().len().saturating_sub(1);
            state.selected_chat = (state.selected_chat + 1).min(last);
            None
        }
        KeyCode::Char('o') => {
            let id = state.selected_chat_id()?.to_string();
            state.selected_message = None;
            chat(ChatCommand::Load(id))
        }
        KeyCode::Char('d') => {
            let id = state.selected_chat_id()?.to_string();
            chat(ChatCommand::RequestDelete(id))
        }
        KeyCode::Char('n') => {
            state.selected_message = None;
            chat(ChatCommand::NewChat)
        }
        KeyCode::Char('R') => chat(ChatCommand::Refresh),
        KeyCode::Char('s') => match state.selected_message {
            Some(i) => chat(ChatCommand::Speak(i)),
            None => chat(ChatCommand::ToggleSpeech),
        },
        KeyCode::Char('t') => chat(ChatCommand::ToggleSpeech),
        KeyCode::Char('x') => chat(ChatCommand::StopSpeech),
        KeyCode::Char('l') => chat(ChatCommand::SetLanguage(state.chat.language.next())),
        KeyCode::Char('r') => {
            start_rating(state);
            None
        }
        KeyCode::Char('a') if state.chat.appointment_prompt => {
            chat(ChatCommand::DismissAppointmentPrompt)
        }
        KeyCode::Char('b') if state.chat.appointment_prompt => Some(UserCommand::Navigate(
            Route::Patient(PatientSection::Appointments),
        )),
        KeyCode::Char(c @ '1'..='9') => {
            let index = c.to_digit(10).map(|d| d as usize - 1)?;
            let action = QUICK_ACTIONS.get(index)?;
            state.chat_input = action.prompt.to_string();
            state.mode = InputMode::Compose;
            None
        }
        _ => None,
    }
}

fn select_previous_message(state: &mut ViewState) {
    let len = state.chat.messages.len();
    if len == 0 {
        return;
    }
    state.selected_message = Some(match state.selected_message {
        None => len - 1,
        Some(i) => i.saturating_sub(1),
    });
}

fn select_next_message(state: &mut ViewState) {
    let len = state.chat.messages.len();
    state.selected_message = match state.selected_message {
        Some(i) if i + 1 < len => Some(i + 1),
        _ => None,
    };
}

fn start_rating(state: &mut ViewState) {
    let target = state
        .target_message()
        .filter(|&i| state.chat.messages.get(i).is_some_and(|m| m.is_stored_reply()));
    match target {
        None => {
            state.notice = Some(Notice::info("Select an assistant reply to rate."));
        }
        Some(i) if state.chat.rated.contains(&i) => {
            state.notice = Some(Notice::info("You already rated this reply."));
        }
        Some(i) => {
            state.rating_draft = Some(RatingDraft {
                message_index: i,
                rating: 5,
                comments: String::new(),
            });
            state.mode = InputMode::Rating;
        }
    }
}

fn handle_compose(key_event: KeyEvent, state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Esc => {
            state.mode = InputMode::Normal;
            None
        }
        KeyCode::Enter => {
            // Keep the draft while a reply is outstanding.
            if state.chat.is_loading || state.chat_input.trim().is_empty() {
                return None;
            }
            let text = std::mem::take(&mut state.chat_input);
            state.selected_message = None;
            // Held until the next snapshot says otherwise.
            state.chat.is_loading = true;
            Some(UserCommand::Chat(ChatCommand::Send(text)))
        }
        KeyCode::Backspace => {
            state.chat_input.pop();
            None
        }
        _ => {
            if let Some(c) = typed_char(&key_event) {
                state.chat_input.push(c);
            }
            None
        }
    }
}

fn handle_search(key_event: KeyEvent, state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Esc => {
            state.mode = InputMode::Normal;
            state.search_text.clear();
            state.selected_chat = 0;
            Some(UserCommand::Chat(ChatCommand::Search(String::new())))
        }
        KeyCode::Enter => {
            state.mode = InputMode::Normal;
            state.selected_chat = 0;
            Some(UserCommand::Chat(ChatCommand::Search(state.search_text.clone())))
        }
        KeyCode::Backspace => {
            state.search_text.pop();
            None
        }
        _ => {
            if let Some(c) = typed_char(&key_event) {
                state.search_text.push(c);
            }
            None
        }
    }
}

fn handle_rating(key_event: KeyEvent, state: &mut ViewState) -> Option<UserCommand> {
    let Some(draft) = state.rating_draft.as_mut() else {
        state.mode = InputMode::Normal;
        return None;
    };
    match key_event.code {
        KeyCode::Esc => {
            state.rating_draft = None;
            state.mode = InputMode::Normal;
            None
        }
        KeyCode::Enter => {
            let draft = state.rating_draft.take()?;
            state.mode = InputMode::Normal;
            Some(UserCommand::Chat(ChatCommand::Rate {
                message_index: draft.message_index,
                rating: draft.rating,
                comments: draft.comments,
            }))
        }
        KeyCode::Up | KeyCode::Right => {
            draft.rating = (draft.rating + 1).min(5);
            None
        }
        KeyCode::Down | KeyCode::Left => {
            draft.rating = draft.rating.saturating_sub(1).max(1);
            None
        }
        KeyCode::Backspace => {
            draft.comments.pop();
            None
        }
        _ => {
            if let Some(c) = typed_char(&key_event) {
                draft.comments.push(c);
            }
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Patient feedback
// ---------------------------------------------------------------------------

fn handle_feedback(key_event: KeyEvent, state: &mut ViewState) -> Option<UserCommand> {
    let draft = &mut state.feedback;
    match key_event.code {
        KeyCode::Esc => {
            state.mode = InputMode::Normal;
            None
        }
        KeyCode::Enter => {
            let draft = std::mem::take(&mut state.feedback);
            state.mode = InputMode::Normal;
            Some(UserCommand::SubmitPortalFeedback {
                rating: draft.rating,
                text: draft.text,
            })
        }
        KeyCode::Up | KeyCode::Right => {
            draft.rating = (draft.rating + 1).min(5);
            None
        }
        KeyCode::Down | KeyCode::Left => {
            draft.rating = draft.rating.saturating_sub(1).max(1);
            None
        }
        KeyCode::Backspace => {
            draft.text.pop();
            None
        }
        _ => {
            if let Some(c) = typed_char(&key_event) {
                if draft.text.chars().count() < FEEDBACK_MAX_CHARS {
                    draft.text.push(c);
                }
            }
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

fn handle_admin_keys(
    key_event: KeyEvent,
    state: &mut ViewState,
    tab: AdminTab,
) -> Option<UserCommand> {
    if let Some(cmd) = handle_area_keys(&key_event, state) {
        return Some(cmd);
    }

    let admin = |cmd: AdminCommand| Some(UserCommand::Admin(cmd));
    let selected = state.admin_selected;

    match (tab, key_event.code) {
        (_, KeyCode::Up | KeyCode::Char('k')) => {
            state.admin_selected = selected.saturating_sub(1);
            None
        }
        (_, KeyCode::Down | KeyCode::Char('j')) => {
            let last = state.admin_row_count().saturating_sub(1);
            state.admin_selected = (selected + 1).min(last);
            None
        }
        (_, KeyCode::Char('r')) => admin(AdminCommand::Refresh),
        (AdminTab::Patients | AdminTab::Keywords | AdminTab::Feedback, KeyCode::Char('/')) => {
            state.mode = InputMode::Filter;
            None
        }

        (AdminTab::Users, KeyCode::Char('a')) => {
            let id = state.admin.pending_users.get(selected)?.id.clone();
            admin(AdminCommand::ApproveUser(id))
        }
        (AdminTab::Users, KeyCode::Char('x')) => {
            let id = state.admin.pending_users.get(selected)?.id.clone();
            admin(AdminCommand::Request(AdminAction::RejectUser(id)))
        }

        (AdminTab::Patients, KeyCode::Char('p')) => {
            state.approval_filter = state.approval_filter.next();
            state.admin_selected = 0;
            None
        }
        (AdminTab::Patients, KeyCode::Char('e')) => {
            let form = state.visible_patients().get(selected).map(|p| Form::edit_patient(p));
            state.editor = form;
            None
        }
        (AdminTab::Patients, KeyCode::Char('d')) => {
            let id = state.visible_patients().get(selected)?.id.clone();
            admin(AdminCommand::Request(AdminAction::DeletePatient(id)))
        }

        (AdminTab::Keywords, KeyCode::Char('n')) => {
            state.editor = Some(Form::new_keyword());
            None
        }
        (AdminTab::Keywords, KeyCode::Char('e')) => {
            let form = state.visible_keywords().get(selected).map(|k| Form::edit_keyword(k));
            state.editor = form;
            None
        }
        (AdminTab::Keywords, KeyCode::Char('d')) => {
            let id = state.visible_keywords().get(selected)?.id.clone();
            admin(AdminCommand::Request(AdminAction::DeleteKeyword(id)))
        }

        (AdminTab::Feedback, KeyCode::Char('f')) => {
            state.rating_filter = match state.rating_filter {
                None => Some(1),
                Some(5) => None,
                Some(r) => Some(r + 1),
            };
            state.admin_selected = 0;
            None
        }

        (AdminTab::TextFeedback, KeyCode::Char('s')) => {
            let path = PathBuf::from(EXPORT_DIR).join(export_file_name());
            admin(AdminCommand::ExportTextFeedback(path))
        }

        _ => None,
    }
}

fn handle_filter(key_event: KeyEvent, state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Esc => {
            state.mode = InputMode::Normal;
            state.filter_text.clear();
        }
        KeyCode::Enter => {
            state.mode = InputMode::Normal;
        }
        KeyCode::Backspace => {
            state.filter_text.pop();
        }
        _ => {
            if let Some(c) = typed_char(&key_event) {
                state.filter_text.push(c);
            }
        }
    }
    state.admin_selected = 0;
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::test_support::{conversation, summary, user};
    use crossterm::event::{KeyEventState, KeyModifiers};
    use wellness_core::models::{KeywordEntry, Language, Message, PatientRecord, Role};
    use wellness_core::validation::LoginForm;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent {
            modifiers: KeyModifiers::CONTROL,
            ..key(KeyCode::Char(c))
        }
    }

    fn type_text(state: &mut ViewState, text: &str) {
        for c in text.chars() {
            assert_eq!(handle_key(key(KeyCode::Char(c)), state), None);
        }
    }

    fn signed_in(role: Role, route: Route) -> ViewState {
        let mut state = ViewState::default();
        state.user = Some(user(role));
        state.route = route;
        state
    }

    fn chat_state() -> ViewState {
        let mut state = signed_in(Role::Patient, Route::Chat);
        state.chat.messages = conversation();
        state.chat.history = vec![summary("c1", "First"), summary("c2", "Second")];
        state
    }

    #[test]
    fn ctrl_c_quits_from_anywhere() {
        let mut state = chat_state();
        state.mode = InputMode::Compose;
        assert_eq!(handle_key(ctrl('c'), &mut state), Some(UserCommand::Quit));
    }

    #[test]
    fn release_events_are_ignored() {
        let mut state = ViewState::default();
        let release = KeyEvent {
            kind: KeyEventKind::Release,
            ..key(KeyCode::Char('a'))
        };
        assert_eq!(handle_key(release, &mut state), None);
        assert_eq!(state.login.value(0), "");
    }

    #[test]
    fn quit_requires_confirmation() {
        let mut state = signed_in(Role::Patient, Route::Patient(PatientSection::Overview));
        assert_eq!(handle_key(key(KeyCode::Char('q')), &mut state), None);
        assert!(state.confirm_quit);
        assert_eq!(handle_key(key(KeyCode::Char('x')), &mut state), None);
        assert_eq!(handle_key(key(KeyCode::Esc), &mut state), None);
        assert!(!state.confirm_quit);
        handle_key(key(KeyCode::Char('q')), &mut state);
        assert_eq!(
            handle_key(key(KeyCode::Char('y')), &mut state),
            Some(UserCommand::Quit)
        );
    }

    #[test]
    fn login_form_typing_and_submit() {
        let mut state = ViewState::default();
        type_text(&mut state, "asha@example.com");
        handle_key(key(KeyCode::Tab), &mut state);
        type_text(&mut state, "secret1");
        handle_key(ctrl('r'), &mut state);
        assert_eq!(
            handle_key(key(KeyCode::Enter), &mut state),
            Some(UserCommand::Login(LoginForm {
                email: "asha@example.com".to_string(),
                password: "secret1".to_string(),
                remember_me: true,
            }))
        );
    }

    #[test]
    fn q_types_into_login_form() {
        let mut state = ViewState::default();
        type_text(&mut state, "q");
        assert!(!state.confirm_quit);
        assert_eq!(state.login.value(0), "q");
    }

    #[test]
    fn login_links_to_signup_and_back() {
        let mut state = ViewState::default();
        assert_eq!(
            handle_key(ctrl('n'), &mut state),
            Some(UserCommand::Navigate(Route::Signup))
        );
        state.route = Route::Signup;
        assert_eq!(
            handle_key(key(KeyCode::Esc), &mut state),
            Some(UserCommand::Navigate(Route::Login))
        );
    }

    #[test]
    fn arrows_cycle_patient_sections() {
        let mut state = signed_in(Role::Patient, Route::Patient(PatientSection::Overview));
        assert_eq!(
            handle_key(key(KeyCode::Right), &mut state),
            Some(UserCommand::Navigate(Route::Patient(PatientSection::HealthRecords)))
        );
        assert_eq!(
            handle_key(key(KeyCode::Left), &mut state),
            Some(UserCommand::Navigate(Route::Patient(PatientSection::Profile)))
        );
        assert_eq!(
            handle_key(key(KeyCode::Char('c')), &mut state),
            Some(UserCommand::Navigate(Route::Chat))
        );
    }

    #[test]
    fn record_and_appointment_filters_cycle_locally() {
        let mut state = signed_in(Role::Patient, Route::Patient(PatientSection::HealthRecords));
        let before = state.record_category;
        assert_eq!(handle_key(key(KeyCode::Char('f')), &mut state), None);
        assert_ne!(state.record_category, before);

        state.route = Route::Patient(PatientSection::Appointments);
        let before = state.appointment_tab;
        handle_key(key(KeyCode::Char('f')), &mut state);
        assert_ne!(state.appointment_tab, before);
    }

    #[test]
    fn portal_feedback_flow() {
        let mut state = signed_in(Role::Patient, Route::Patient(PatientSection::Overview));
        handle_key(key(KeyCode::Char('f')), &mut state);
        assert_eq!(state.mode, InputMode::Feedback);
        handle_key(key(KeyCode::Down), &mut state);
        type_text(&mut state, "Great app");
        assert_eq!(
            handle_key(key(KeyCode::Enter), &mut state),
            Some(UserCommand::SubmitPortalFeedback {
                rating: 4,
                text: "Great app".to_string(),
            })
        );
        assert_eq!(state.mode, InputMode::Normal);
        assert!(state.feedback.text.is_empty());
    }

    #[test]
    fn feedback_text_stops_at_limit() {
        let mut state = signed_in(Role::Patient, Route::Patient(PatientSection::Overview));
        state.mode = InputMode::Feedback;
        state.feedback.text = "a".repeat(FEEDBACK_MAX_CHARS);
        handle_key(key(KeyCode::Char('b')), &mut state);
        assert_eq!(state.feedback.text.chars().count(), FEEDBACK_MAX_CHARS);
    }

    #[test]
    fn profile_edit_opens_prefilled_editor() {
        let mut state = signed_in(Role::Patient, Route::Patient(PatientSection::Profile));
        handle_key(key(KeyCode::Char('e')), &mut state);
        let editor = state.editor.as_ref().unwrap();
        assert_eq!(editor.value(0), "Asha Rao");

        handle_key(key(KeyCode::Backspace), &mut state);
        let cmd = handle_key(key(KeyCode::Enter), &mut state);
        let Some(UserCommand::UpdateProfile(update)) = cmd else {
            panic!("expected profile update");
        };
        assert_eq!(update.name, "Asha Ra");
        assert!(state.editor.is_none());
    }

    #[test]
    fn compose_and_send() {
        let mut state = chat_state();
        handle_key(key(KeyCode::Char('i')), &mut state);
        type_text(&mut state, "hello");
        assert_eq!(
            handle_key(key(KeyCode::Enter), &mut state),
            Some(UserCommand::Chat(ChatCommand::Send("hello".to_string())))
        );
        assert!(state.chat_input.is_empty());
        assert_eq!(state.mode, InputMode::Compose);
    }

    #[test]
    fn compose_keeps_draft_while_loading() {
        let mut state = chat_state();
        state.mode = InputMode::Compose;
        state.chat.is_loading = true;
        type_text(&mut state, "again");
        assert_eq!(handle_key(key(KeyCode::Enter), &mut state), None);
        assert_eq!(state.chat_input, "again");
    }

    #[test]
    fn second_enter_before_snapshot_keeps_draft() {
        let mut state = chat_state();
        state.mode = InputMode::Compose;
        type_text(&mut state, "first");
        assert!(handle_key(key(KeyCode::Enter), &mut state).is_some());
        assert!(state.chat.is_loading);

        type_text(&mut state, "second");
        assert_eq!(handle_key(key(KeyCode::Enter), &mut state), None);
        assert_eq!(state.chat_input, "second");
    }

    #[test]
    fn blank_message_is_not_sent() {
        let mut state = chat_state();
        state.mode = InputMode::Compose;
        type_text(&mut state, "   ");
        assert_eq!(handle_key(key(KeyCode::Enter), &mut state), None);
    }

    #[test]
    fn quick_action_fills_input() {
        let mut state = chat_state();
        handle_key(key(KeyCode::Char('1')), &mut state);
        assert_eq!(state.chat_input, QUICK_ACTIONS[0].prompt);
        assert_eq!(state.mode, InputMode::Compose);
    }

    #[test]
    fn sidebar_selection_loads_and_deletes() {
        let mut state = chat_state();
        handle_key(key(KeyCode::Char(']')), &mut state);
        handle_key(key(KeyCode::Char(']')), &mut state);
        assert_eq!(state.selected_chat, 1);
        assert_eq!(
            handle_key(key(KeyCode::Char('o')), &mut state),
            Some(UserCommand::Chat(ChatCommand::Load("c2".to_string())))
        );
        assert_eq!(
            handle_key(key(KeyCode::Char('d')), &mut state),
            Some(UserCommand::Chat(ChatCommand::RequestDelete("c2".to_string())))
        );
    }

    #[test]
    fn pending_delete_blocks_other_keys() {
        let mut state = chat_state();
        state.chat.pending_delete = Some("c1".to_string());
        assert_eq!(handle_key(key(KeyCode::Char('n')), &mut state), Some(UserCommand::Chat(ChatCommand::CancelDelete)));
        assert_eq!(handle_key(key(KeyCode::Char('o')), &mut state), None);
        assert_eq!(
            handle_key(key(KeyCode::Char('y')), &mut state),
            Some(UserCommand::Chat(ChatCommand::ConfirmDelete))
        );
    }

    #[test]
    fn search_submits_and_escape_clears() {
        let mut state = chat_state();
        handle_key(key(KeyCode::Char('/')), &mut state);
        type_text(&mut state, "fever");
        assert_eq!(
            handle_key(key(KeyCode::Enter), &mut state),
            Some(UserCommand::Chat(ChatCommand::Search("fever".to_string())))
        );
        handle_key(key(KeyCode::Char('/')), &mut state);
        assert_eq!(
            handle_key(key(KeyCode::Esc), &mut state),
            Some(UserCommand::Chat(ChatCommand::Search(String::new())))
        );
        assert!(state.search_text.is_empty());
    }

    #[test]
    fn rating_targets_latest_bot_reply() {
        let mut state = chat_state();
        handle_key(key(KeyCode::Char('r')), &mut state);
        assert_eq!(state.mode, InputMode::Rating);
        handle_key(key(KeyCode::Left), &mut state);
        handle_key(key(KeyCode::Left), &mut state);
        type_text(&mut state, "meh");
        assert_eq!(
            handle_key(key(KeyCode::Enter), &mut state),
            Some(UserCommand::Chat(ChatCommand::Rate {
                message_index: 1,
                rating: 3,
                comments: "meh".to_string(),
            }))
        );
        assert!(state.rating_draft.is_none());
    }

    #[test]
    fn rating_a_user_message_is_refused_locally() {
        let mut state = chat_state();
        state.selected_message = Some(0);
        handle_key(key(KeyCode::Char('r')), &mut state);
        assert_eq!(state.mode, InputMode::Normal);
        assert!(state.notice.is_some());
    }

    #[test]
    fn fallback_reply_is_refused_locally() {
        let mut state = chat_state();
        state.chat.messages.push(Message {
            local: true,
            ..Message::bot("Sorry, I'm having trouble responding right now.")
        });
        handle_key(key(KeyCode::Char('r')), &mut state);
        assert!(state.rating_draft.is_none());
        assert_eq!(state.mode, InputMode::Normal);
    }

    #[test]
    fn already_rated_reply_is_refused_locally() {
        let mut state = chat_state();
        state.chat.rated.insert(1);
        handle_key(key(KeyCode::Char('r')), &mut state);
        assert!(state.rating_draft.is_none());
    }

    #[test]
    fn message_selection_walks_up_and_back_to_tail() {
        let mut state = chat_state();
        handle_key(key(KeyCode::Up), &mut state);
        assert_eq!(state.selected_message, Some(1));
        handle_key(key(KeyCode::Up), &mut state);
        assert_eq!(state.selected_message, Some(0));
        assert_eq!(
            handle_key(key(KeyCode::Char('s')), &mut state),
            Some(UserCommand::Chat(ChatCommand::Speak(0)))
        );
        handle_key(key(KeyCode::Down), &mut state);
        handle_key(key(KeyCode::Down), &mut state);
        assert_eq!(state.selected_message, None);
        assert_eq!(
            handle_key(key(KeyCode::Char('s')), &mut state),
            Some(UserCommand::Chat(ChatCommand::ToggleSpeech))
        );
    }

    #[test]
    fn language_cycles_and_escape_goes_home() {
        let mut state = chat_state();
        assert_eq!(
            handle_key(key(KeyCode::Char('l')), &mut state),
            Some(UserCommand::Chat(ChatCommand::SetLanguage(Language::English.next())))
        );
        assert_eq!(
            handle_key(key(KeyCode::Esc), &mut state),
            Some(UserCommand::Navigate(Route::Patient(PatientSection::Overview)))
        );
    }

    #[test]
    fn appointment_prompt_keys_only_when_shown() {
        let mut state = chat_state();
        assert_eq!(handle_key(key(KeyCode::Char('a')), &mut state), None);
        state.chat.appointment_prompt = true;
        assert_eq!(
            handle_key(key(KeyCode::Char('a')), &mut state),
            Some(UserCommand::Chat(ChatCommand::DismissAppointmentPrompt))
        );
        assert_eq!(
            handle_key(key(KeyCode::Char('b')), &mut state),
            Some(UserCommand::Navigate(Route::Patient(PatientSection::Appointments)))
        );
    }

    fn patient(id: &str, name: &str, approved: bool) -> PatientRecord {
        PatientRecord {
            id: id.to_string(),
            name: name.to_string(),
            is_approved: approved,
            ..PatientRecord::default()
        }
    }

    #[test]
    fn admin_user_approval_and_rejection() {
        let mut state = signed_in(Role::Admin, Route::Admin(AdminTab::Users));
        state.admin.pending_users = vec![patient("p1", "Ravi", false), patient("p2", "Meena", false)];
        handle_key(key(KeyCode::Down), &mut state);
        assert_eq!(
            handle_key(key(KeyCode::Char('a')), &mut state),
            Some(UserCommand::Admin(AdminCommand::ApproveUser("p2".to_string())))
        );
        assert_eq!(
            handle_key(key(KeyCode::Char('x')), &mut state),
            Some(UserCommand::Admin(AdminCommand::Request(AdminAction::RejectUser(
                "p2".to_string()
            ))))
        );
    }

    #[test]
    fn admin_confirm_prompt_takes_over() {
        let mut state = signed_in(Role::Admin, Route::Admin(AdminTab::Patients));
        state.admin.pending_action = Some(AdminAction::DeletePatient("p1".to_string()));
        assert_eq!(handle_key(key(KeyCode::Char('r')), &mut state), None);
        assert_eq!(
            handle_key(key(KeyCode::Esc), &mut state),
            Some(UserCommand::Admin(AdminCommand::Cancel))
        );
        assert_eq!(
            handle_key(key(KeyCode::Char('y')), &mut state),
            Some(UserCommand::Admin(AdminCommand::Confirm))
        );
    }

    #[test]
    fn patient_actions_follow_the_filtered_list() {
        let mut state = signed_in(Role::Admin, Route::Admin(AdminTab::Patients));
        state.admin.patients = vec![patient("p1", "Ravi", true), patient("p2", "Meena", false)];
        handle_key(key(KeyCode::Char('/')), &mut state);
        type_text(&mut state, "meena");
        handle_key(key(KeyCode::Enter), &mut state);
        assert_eq!(
            handle_key(key(KeyCode::Char('d')), &mut state),
            Some(UserCommand::Admin(AdminCommand::Request(AdminAction::DeletePatient(
                "p2".to_string()
            ))))
        );

        handle_key(key(KeyCode::Char('e')), &mut state);
        assert_eq!(state.editor.as_ref().unwrap().value(0), "Meena");
        // Unchanged editor submits nothing.
        assert_eq!(handle_key(key(KeyCode::Enter), &mut state), None);
        assert!(state.notice.is_some());
    }

    #[test]
    fn approval_filter_cycles() {
        let mut state = signed_in(Role::Admin, Route::Admin(AdminTab::Patients));
        state.admin.patients = vec![patient("p1", "Ravi", true), patient("p2", "Meena", false)];
        handle_key(key(KeyCode::Char('p')), &mut state);
        let names: Vec<_> = state.visible_patients().iter().map(|p| p.name.clone()).collect();
        assert_eq!(names, vec!["Ravi"]);
    }

    #[test]
    fn keyword_editor_flows() {
        let mut state = signed_in(Role::Admin, Route::Admin(AdminTab::Keywords));
        handle_key(key(KeyCode::Char('n')), &mut state);
        type_text(&mut state, "fever");
        handle_key(key(KeyCode::Tab), &mut state);
        type_text(&mut state, "Rest well");
        assert_eq!(
            handle_key(key(KeyCode::Enter), &mut state),
            Some(UserCommand::Admin(AdminCommand::AddKeyword {
                keyword: "fever".to_string(),
                response: "Rest well".to_string(),
            }))
        );

        state.admin.keywords = vec![KeywordEntry {
            id: "k1".to_string(),
            keyword: "fever".to_string(),
            responses: vec!["Rest well".to_string()],
        }];
        assert_eq!(
            handle_key(key(KeyCode::Char('d')), &mut state),
            Some(UserCommand::Admin(AdminCommand::Request(AdminAction::DeleteKeyword(
                "k1".to_string()
            ))))
        );
    }

    #[test]
    fn feedback_rating_filter_cycles_through_stars() {
        let mut state = signed_in(Role::Admin, Route::Admin(AdminTab::Feedback));
        for expected in [Some(1), Some(2), Some(3), Some(4), Some(5), None] {
            handle_key(key(KeyCode::Char('f')), &mut state);
            assert_eq!(state.rating_filter, expected);
        }
    }

    #[test]
    fn text_feedback_export_goes_to_exports_dir() {
        let mut state = signed_in(Role::Admin, Route::Admin(AdminTab::TextFeedback));
        let Some(UserCommand::Admin(AdminCommand::ExportTextFeedback(path))) =
            handle_key(key(KeyCode::Char('s')), &mut state)
        else {
            panic!("expected export command");
        };
        assert!(path.starts_with(EXPORT_DIR));
        assert!(path.to_string_lossy().ends_with(".csv"));
    }

    #[test]
    fn logout_is_shift_l() {
        let mut state = signed_in(Role::Admin, Route::Admin(AdminTab::Dashboard));
        assert_eq!(
            handle_key(key(KeyCode::Char('L')), &mut state),
            Some(UserCommand::Logout)
        );
    }
}
