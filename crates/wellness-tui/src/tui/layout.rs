// Screen layout: panel arrangement and sizing.
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +-----------+--------------------------------------+
// | Nav (22)  | Body                                 |
// |           |                                      |
// +-----------+--------------------------------------+
// | Notice (1 row)                                    |
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+
//
// The chat screen splits its body again into a history sidebar and the
// conversation column (messages, quick actions, input box).

use ratatui::layout::{Constraint, Direction, Flex, Layout, Rect};

const NAV_WIDTH: u16 = 22;

#[derive(Debug, Clone)]
pub struct AppLayout {
    pub status_bar: Rect,
    /// Section list; zero-width on the login and signup screens.
    pub nav: Rect,
    pub body: Rect,
    pub notice: Rect,
    pub help_bar: Rect,
}

pub fn build_layout(area: Rect, with_nav: bool) -> AppLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Min(6),    // nav + body
            Constraint::Length(1), // notice
            Constraint::Length(1), // help bar
        ])
        .split(area);

    let nav_width = if with_nav { NAV_WIDTH } else { 0 };
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(nav_width), Constraint::Min(20)])
        .split(vertical[1]);

    AppLayout {
        status_bar: vertical[0],
        nav: horizontal[0],
        body: horizontal[1],
        notice: vertical[2],
        help_bar: vertical[3],
    }
}

#[derive(Debug, Clone)]
pub struct ChatLayout {
    pub sidebar: Rect,
    /// Appointment banner; zero-height when not shown.
    pub banner: Rect,
    pub messages: Rect,
    pub quick_actions: Rect,
    pub input: Rect,
}

pub fn chat_layout(area: Rect, show_banner: bool) -> ChatLayout {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(area);

    let banner_height = if show_banner { 3 } else { 0 };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(banner_height),
            Constraint::Min(5),
            Constraint::Length(2),
            Constraint::Length(3),
        ])
        .split(columns[1]);

    ChatLayout {
        sidebar: columns[0],
        banner: rows[0],
        messages: rows[1],
        quick_actions: rows[2],
        input: rows[3],
    }
}

/// A rectangle of the given size centered in `area`, clamped to fit.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .split(area);
    let horizontal = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .split(vertical[0]);
    horizontal[0]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
