// Application state and orchestration.
//
// The central event loop: takes user commands from the TUI and finished sends
// from the chat controller, applies them to the session, chat and admin
// state, and pushes UI updates back to the TUI. Every backend error that
// reaches this layer goes through `handle_api_error`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use wellness_api::{AdminApi, ApiError, AuthApi, ChatApi, HttpPortalApi};
use wellness_core::config::Config;
use wellness_core::models::{LoginResponse, Role};

use crate::admin::{AdminError, AdminPanel};
use crate::auth;
use crate::chat::{ChatController, FeedbackError};
use crate::dashboard::{self, PortalFeedbackError};
use crate::protocol::{
    AdminCommand, ChatCommand, ChatEvent, Notice, Route, UiUpdate, UserCommand,
};
use crate::routing::authorize;
use crate::session::SessionContext;
use crate::speech::{SpeechError, SpeechSynthesizer};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// How often the loop checks whether read-aloud playback has finished.
pub const SPEECH_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub const SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The three backend seams. In production all three are the same
/// `HttpPortalApi`, so a token set through `auth` applies everywhere.
#[derive(Clone)]
pub struct Backends {
    pub auth: Arc<dyn AuthApi>,
    pub chat: Arc<dyn ChatApi>,
    pub admin: Arc<dyn AdminApi>,
}

impl Backends {
    pub fn http(api: Arc<HttpPortalApi>) -> Self {
        Backends {
            auth: Arc::clone(&api) as Arc<dyn AuthApi>,
            chat: Arc::clone(&api) as Arc<dyn ChatApi>,
            admin: api as Arc<dyn AdminApi>,
        }
    }
}

pub struct AppState {
    pub session: SessionContext,
    pub chat: ChatController,
    pub admin: AdminPanel,
    pub route: Route,
    auth_api: Arc<dyn AuthApi>,
    chat_api: Arc<dyn ChatApi>,
    speaking: bool,
}

impl AppState {
    /// Build the state, resuming any session the store already holds.
    pub fn new(
        config: &Config,
        session: SessionContext,
        backends: Backends,
        speech: Arc<dyn SpeechSynthesizer>,
        chat_tx: mpsc::Sender<ChatEvent>,
    ) -> Self {
        let mut chat = ChatController::new(Arc::clone(&backends.chat), speech, chat_tx, config);

        if let (Some(token), Some(user)) = (session.token(), session.user()) {
            backends.auth.set_token(Some(token.to_string()));
            chat.set_user(Some(user.id.clone()));
        }
        let route = authorize(Route::Login, session.role());

        AppState {
            session,
            chat,
            admin: AdminPanel::new(backends.admin),
            route,
            auth_api: backends.auth,
            chat_api: backends.chat,
            speaking: false,
        }
    }

    /// Updates that bring a freshly started TUI in line with this state.
    pub fn initial_updates(&self) -> Vec<UiUpdate> {
        vec![
            UiUpdate::Session(self.session.user().cloned()),
            UiUpdate::RememberedEmail(self.session.remembered_email()),
            UiUpdate::Chat(Box::new(self.chat.snapshot())),
            UiUpdate::Route(self.route),
        ]
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the application event loop.
///
/// Listens with `tokio::select!` on:
/// 1. User commands from the TUI
/// 2. Finished chat sends
/// 3. A speech-status tick
///
/// Pushes UI updates through `ui_tx` for the TUI render loop.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    mut chat_rx: mpsc::Receiver<ChatEvent>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    if state.session.is_authenticated() {
        load_home_data(&mut state, &ui_tx).await;
    }

    let mut chat_open = true;
    let mut speech_interval = tokio::time::interval(SPEECH_POLL_INTERVAL);
    speech_interval.tick().await;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        handle_user_command(&mut state, cmd, &ui_tx).await;
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            event = chat_rx.recv(), if chat_open => {
                match event {
                    Some(event) => {
                        handle_chat_event(&mut state, event, &ui_tx).await;
                    }
                    None => {
                        info!("Chat event channel closed");
                        chat_open = false;
                    }
                }
            }

            _ = speech_interval.tick() => {
                sync_speaking(&mut state, &ui_tx).await;
            }
        }
    }

    state.chat.stop_speech();
    info!("Application event loop exiting");
    Ok(())
}

async fn push_chat(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let _ = ui_tx
        .send(UiUpdate::Chat(Box::new(state.chat.snapshot())))
        .await;
}

async fn push_admin(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let _ = ui_tx
        .send(UiUpdate::Admin(Box::new(state.admin.snapshot())))
        .await;
}

async fn notify(ui_tx: &mpsc::Sender<UiUpdate>, notice: Notice) {
    let _ = ui_tx.send(UiUpdate::Notice(notice)).await;
}

async fn sync_speaking(state: &mut AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let active = state.chat.is_speaking();
    if active != state.speaking {
        state.speaking = active;
        let _ = ui_tx.send(UiUpdate::Speaking(active)).await;
    }
}

// ---------------------------------------------------------------------------
// Error policy
// ---------------------------------------------------------------------------

/// A rejected token while signed in ends the session; anything else is
/// logged and shown as a notice.
async fn handle_api_error(state: &mut AppState, ui_tx: &mpsc::Sender<UiUpdate>, err: ApiError) {
    if err.is_unauthorized() && state.session.is_authenticated() {
        warn!("Backend rejected the session token: {}", err);
        logout(state, ui_tx, Notice::error(SESSION_EXPIRED)).await;
    } else {
        warn!("Backend request failed: {}", err);
        notify(ui_tx, Notice::error(err.user_message())).await;
    }
}

async fn logout(state: &mut AppState, ui_tx: &mpsc::Sender<UiUpdate>, notice: Notice) {
    state.chat.reset();
    state.admin.clear();
    if let Err(e) = state.session.logout() {
        warn!("Failed to clear stored session: {:#}", e);
    }
    state.auth_api.set_token(None);
    state.route = Route::Login;

    let _ = ui_tx.send(UiUpdate::Session(None)).await;
    push_chat(state, ui_tx).await;
    push_admin(state, ui_tx).await;
    let _ = ui_tx
        .send(UiUpdate::RememberedEmail(state.session.remembered_email()))
        .await;
    let _ = ui_tx.send(UiUpdate::Route(Route::Login)).await;
    notify(ui_tx, notice).await;
    sync_speaking(state, ui_tx).await;
}

// ---------------------------------------------------------------------------
// Command handling
// ---------------------------------------------------------------------------

/// Handle a user command from the TUI.
pub async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match cmd {
        UserCommand::Login(form) => {
            let result = auth::login(state.auth_api.as_ref(), &form).await;
            match result {
                Ok(resp) => complete_login(state, resp, form.remember_me, ui_tx).await,
                Err(errors) => {
                    let _ = ui_tx.send(UiUpdate::FormErrors(errors)).await;
                }
            }
        }
        UserCommand::Signup(form) => match auth::signup(state.auth_api.as_ref(), &form).await {
            Ok(message) => {
                let _ = ui_tx.send(UiUpdate::SignupComplete(message.clone())).await;
                state.route = Route::Login;
                let _ = ui_tx.send(UiUpdate::Route(Route::Login)).await;
                notify(ui_tx, Notice::success(message)).await;
            }
            Err(errors) => {
                let _ = ui_tx.send(UiUpdate::FormErrors(errors)).await;
            }
        },
        UserCommand::Logout => {
            logout(state, ui_tx, Notice::info("You have been logged out.")).await;
        }
        UserCommand::Navigate(route) => navigate(state, route, ui_tx).await,
        UserCommand::UpdateProfile(update) => match state.session.update_profile(update) {
            Ok(user) => {
                let user = user.clone();
                let _ = ui_tx.send(UiUpdate::Session(Some(user))).await;
                notify(ui_tx, Notice::success("Profile updated successfully!")).await;
            }
            Err(e) => {
                warn!("Profile update failed: {:#}", e);
                notify(ui_tx, Notice::error("Failed to update profile.")).await;
            }
        },
        UserCommand::SubmitPortalFeedback { rating, text } => {
            let user_id = state.session.user().map(|u| u.id.clone());
            let result = dashboard::submit_portal_feedback(
                state.chat_api.as_ref(),
                user_id.as_deref(),
                rating,
                &text,
            )
            .await;
            match result {
                Ok(()) => {
                    notify(
                        ui_tx,
                        Notice::success("Thank you! Your feedback helps us improve."),
                    )
                    .await
                }
                Err(PortalFeedbackError::Api(e)) => handle_api_error(state, ui_tx, e).await,
                Err(e) => notify(ui_tx, Notice::error(e.to_string())).await,
            }
        }
        UserCommand::Chat(cmd) => {
            if !state.session.is_authenticated() {
                warn!("Ignoring chat command while signed out: {:?}", cmd);
                return;
            }
            handle_chat_command(state, cmd, ui_tx).await;
        }
        UserCommand::Admin(cmd) => {
            if state.session.role() != Some(Role::Admin) {
                warn!("Ignoring admin command without admin role: {:?}", cmd);
                return;
            }
            handle_admin_command(state, cmd, ui_tx).await;
        }
        UserCommand::Quit => {}
    }
}

async fn complete_login(
    state: &mut AppState,
    resp: LoginResponse,
    remember_me: bool,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    let LoginResponse { token, user, .. } = resp;
    state.auth_api.set_token(Some(token.clone()));
    if let Err(e) = state.session.login(token, user.clone()) {
        warn!("Session will not survive a restart: {:#}", e);
    }

    let remembered = remember_me.then_some(user.email.as_str());
    if let Err(e) = state.session.set_remembered_email(remembered) {
        warn!("Failed to update remembered email: {:#}", e);
    }

    state.chat.set_user(Some(user.id.clone()));
    state.route = authorize(Route::Login, Some(user.role));

    let _ = ui_tx.send(UiUpdate::FormErrors(Default::default())).await;
    let _ = ui_tx.send(UiUpdate::Session(Some(user))).await;
    let _ = ui_tx
        .send(UiUpdate::RememberedEmail(state.session.remembered_email()))
        .await;
    let _ = ui_tx.send(UiUpdate::Route(state.route)).await;

    load_home_data(state, ui_tx).await;
}

/// Fetch what the signed-in user's landing page shows.
async fn load_home_data(state: &mut AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    match state.session.role() {
        Some(Role::Admin) => refresh_admin(state, ui_tx).await,
        Some(Role::Patient) => {
            if let Err(e) = state.chat.refresh_history().await {
                handle_api_error(state, ui_tx, e).await;
            }
            push_chat(state, ui_tx).await;
        }
        None => {}
    }
}

async fn refresh_admin(state: &mut AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let result = state.admin.refresh_all().await;
    push_admin(state, ui_tx).await;
    if let Err(e) = result {
        handle_api_error(state, ui_tx, e).await;
    }
}

async fn navigate(state: &mut AppState, requested: Route, ui_tx: &mpsc::Sender<UiUpdate>) {
    let target = authorize(requested, state.session.role());
    if target != requested {
        info!("Redirecting {:?} to {:?}", requested, target);
    }
    if state.route == Route::Chat && target != Route::Chat {
        state.chat.stop_speech();
        sync_speaking(state, ui_tx).await;
    }

    let entering_admin =
        matches!(target, Route::Admin(_)) && !matches!(state.route, Route::Admin(_));
    state.route = target;
    let _ = ui_tx.send(UiUpdate::Route(target)).await;

    if target == Route::Chat {
        if let Err(e) = state.chat.refresh_history().await {
            handle_api_error(state, ui_tx, e).await;
        }
        push_chat(state, ui_tx).await;
    } else if entering_admin {
        refresh_admin(state, ui_tx).await;
    }
}

async fn handle_chat_event(state: &mut AppState, event: ChatEvent, ui_tx: &mpsc::Sender<UiUpdate>) {
    let result = state.chat.handle_event(event).await;
    push_chat(state, ui_tx).await;
    if let Err(e) = result {
        // The fallback reply already tells the user; only a lost session
        // needs more.
        if e.is_unauthorized() {
            handle_api_error(state, ui_tx, e).await;
        }
    }
}

fn speech_notice(err: &SpeechError) -> Notice {
    match err {
        SpeechError::Disabled => Notice::info("Read aloud is turned off in the configuration."),
        SpeechError::Empty => Notice::info("There is no reply to read aloud yet."),
        SpeechError::Spawn { .. } => Notice::error("Read aloud is unavailable on this system."),
    }
}

async fn handle_chat_command(
    state: &mut AppState,
    cmd: ChatCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    let result: Result<(), ApiError> = match cmd {
        ChatCommand::Send(text) => {
            state.chat.send_message(&text);
            Ok(())
        }
        ChatCommand::Load(chat_id) => state.chat.load_chat(&chat_id).await,
        ChatCommand::NewChat => {
            state.chat.start_new_chat();
            Ok(())
        }
        ChatCommand::Refresh => state.chat.refresh_history().await,
        ChatCommand::RequestDelete(chat_id) => {
            state.chat.request_delete(&chat_id);
            Ok(())
        }
        ChatCommand::ConfirmDelete => state.chat.confirm_delete().await,
        ChatCommand::CancelDelete => {
            state.chat.cancel_delete();
            Ok(())
        }
        ChatCommand::Search(query) => state.chat.search_chats(&query).await,
        ChatCommand::Rate {
            message_index,
            rating,
            comments,
        } => match state
            .chat
            .submit_feedback(message_index, rating, &comments)
            .await
        {
            Ok(()) => {
                notify(ui_tx, Notice::success("Thank you for your feedback!")).await;
                Ok(())
            }
            Err(FeedbackError::Api(e)) => Err(e),
            Err(e) => {
                notify(ui_tx, Notice::error(e.to_string())).await;
                Ok(())
            }
        },
        ChatCommand::Speak(index) => {
            if let Err(e) = state.chat.speak(index) {
                warn!("Read aloud failed: {}", e);
                notify(ui_tx, speech_notice(&e)).await;
            }
            Ok(())
        }
        ChatCommand::ToggleSpeech => {
            if let Err(e) = state.chat.toggle_speech() {
                warn!("Read aloud failed: {}", e);
                notify(ui_tx, speech_notice(&e)).await;
            }
            Ok(())
        }
        ChatCommand::StopSpeech => {
            state.chat.stop_speech();
            Ok(())
        }
        ChatCommand::SetLanguage(language) => {
            state.chat.set_language(language);
            Ok(())
        }
        ChatCommand::DismissAppointmentPrompt => {
            state.chat.dismiss_appointment_prompt();
            Ok(())
        }
    };

    push_chat(state, ui_tx).await;
    sync_speaking(state, ui_tx).await;
    if let Err(e) = result {
        handle_api_error(state, ui_tx, e).await;
    }
}

async fn handle_admin_command(
    state: &mut AppState,
    cmd: AdminCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    let result: Result<Option<String>, AdminError> = match cmd {
        AdminCommand::Refresh => {
            refresh_admin(state, ui_tx).await;
            return;
        }
        AdminCommand::ApproveUser(id) => state.admin.approve_user(&id).await.map(Some),
        AdminCommand::Request(action) => {
            state.admin.request(action);
            Ok(None)
        }
        AdminCommand::Confirm => state.admin.confirm().await,
        AdminCommand::Cancel => {
            state.admin.cancel();
            Ok(None)
        }
        AdminCommand::AddKeyword { keyword, response } => state
            .admin
            .add_keyword(&keyword, &response)
            .await
            .map(Some),
        AdminCommand::UpdateKeyword {
            id,
            keyword,
            responses,
        } => state
            .admin
            .update_keyword(&id, &keyword, &responses)
            .await
            .map(Some),
        AdminCommand::UpdatePatient { id, update } => {
            state.admin.update_patient(&id, &update).await.map(Some)
        }
        AdminCommand::ExportTextFeedback(path) => state
            .admin
            .export_text_feedback(&path)
            .map(|rows| Some(format!("Exported {} entries to {}", rows, path.display()))),
    };

    push_admin(state, ui_tx).await;
    match result {
        Ok(Some(message)) => notify(ui_tx, Notice::success(message)).await,
        Ok(None) => {}
        Err(AdminError::Api(e)) => handle_api_error(state, ui_tx, e).await,
        Err(e) => {
            warn!("Admin action failed: {}", e);
            notify(ui_tx, Notice::error(e.to_string())).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
