// Sign-in and sign-up screens.

use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::Frame;

use crate::tui::layout::centered_rect;
use crate::tui::ViewState;

use super::form_panel;

const PANEL_WIDTH: u16 = 60;

pub fn render_login(frame: &mut Frame, area: Rect, state: &ViewState) {
    let mark = if state.remember_me { "[x]" } else { "[ ]" };
    let extra = vec![
        Line::default(),
        Line::from(format!("{} Remember me (Ctrl+R)", mark)),
        Line::from(Span::styled(
            "Don't have an account? Ctrl+N to sign up",
            Style::default().fg(Color::Gray),
        )),
    ];
    let height = state.login.fields.len() as u16 * 3 + 8;
    let panel = centered_rect(PANEL_WIDTH, height, area);
    form_panel::render(frame, panel, &state.login, &state.form_errors, extra);
}

pub fn render_signup(frame: &mut Frame, area: Rect, state: &ViewState) {
    let extra = vec![
        Line::default(),
        Line::from(Span::styled(
            "Esc returns to sign in",
            Style::default().fg(Color::Gray),
        )),
    ];
    let height = state.signup.fields.len() as u16 * 3 + 6;
    let panel = centered_rect(PANEL_WIDTH, height, area);
    form_panel::render(frame, panel, &state.signup, &state.form_errors, extra);
}
