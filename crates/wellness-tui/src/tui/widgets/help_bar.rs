// Bottom rows: the latest notice and the key hints for the current screen.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use wellness_app::protocol::{AdminTab, NoticeLevel, PatientSection, Route};

use crate::tui::{InputMode, ViewState};

pub fn help_text(state: &ViewState) -> &'static str {
    if state.editor.is_some() {
        return " Tab/Up/Down:Field | Enter:Save | Esc:Cancel";
    }
    match state.mode {
        InputMode::Compose => return " Enter:Send | Esc:Done typing",
        InputMode::Search => return " Enter:Search | Esc:Clear search",
        InputMode::Filter => return " Type to filter | Enter:Keep | Esc:Clear",
        InputMode::Feedback | InputMode::Rating => {
            return " Up/Down:Stars | Type comments | Enter:Submit | Esc:Cancel"
        }
        InputMode::Normal => {}
    }
    match state.route {
        Route::Login => " Tab:Next field | Enter:Sign in | Ctrl+R:Remember me | Ctrl+N:Sign up | Esc:Quit",
        Route::Signup => " Tab:Next field | Enter:Create account | Esc:Back to sign in",
        Route::Chat => {
            " i:Type | 1-8:Quick | Up/Down:Select | s:Speak | x:Stop | r:Rate | l:Lang | [ ]:Chats | o:Open | d:Delete | n:New | /:Search | Esc:Back"
        }
        Route::Patient(PatientSection::Overview) => " <-/->:Section | f:Feedback | c:Chat | L:Logout | q:Quit",
        Route::Patient(PatientSection::Profile) => " <-/->:Section | e:Edit profile | c:Chat | L:Logout | q:Quit",
        Route::Patient(_) => " <-/->:Section | f:Filter | c:Chat | L:Logout | q:Quit",
        Route::Admin(AdminTab::Users) => " <-/->:Tab | Up/Down:Select | a:Approve | x:Reject | r:Refresh | L:Logout",
        Route::Admin(AdminTab::Patients) => {
            " <-/->:Tab | /:Search | p:Approval | e:Edit | d:Delete | r:Refresh | L:Logout"
        }
        Route::Admin(AdminTab::Keywords) => {
            " <-/->:Tab | /:Search | n:Add | e:Edit | d:Delete | r:Refresh | L:Logout"
        }
        Route::Admin(AdminTab::Feedback) => " <-/->:Tab | /:Search | f:Stars | r:Refresh | L:Logout",
        Route::Admin(AdminTab::TextFeedback) => " <-/->:Tab | s:Export CSV | r:Refresh | L:Logout",
        Route::Admin(_) => " <-/->:Tab | r:Refresh | c:Chat | L:Logout | q:Quit",
    }
}

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let paragraph = Paragraph::new(Line::from(Span::styled(
        help_text(state),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::DIM),
    )))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

pub fn notice_color(level: NoticeLevel) -> Color {
    match level {
        NoticeLevel::Info => Color::Cyan,
        NoticeLevel::Success => Color::Green,
        NoticeLevel::Error => Color::Red,
    }
}

pub fn render_notice(frame: &mut Frame, area: Rect, state: &ViewState) {
    let Some(notice) = &state.notice else {
        return;
    };
    let line = Line::from(Span::styled(
        format!(" {}", notice.text),
        Style::default()
            .fg(notice_color(notice.level))
            .add_modifier(Modifier::BOLD),
    ));
    frame.render_widget(Paragraph::new(line), area);
}
