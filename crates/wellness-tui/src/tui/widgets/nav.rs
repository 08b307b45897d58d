// Section list on the left edge: patient sections or admin tabs, plus chat.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use wellness_app::protocol::{AdminTab, PatientSection, Route};
use wellness_core::models::Role;

use crate::tui::ViewState;

/// Entries shown for a role, in navigation order.
pub fn entries(role: Role) -> Vec<(Route, &'static str)> {
    let mut items: Vec<(Route, &'static str)> = match role {
        Role::Patient => PatientSection::ALL
            .iter()
            .map(|s| (Route::Patient(*s), s.label()))
            .collect(),
        Role::Admin => AdminTab::ALL
            .iter()
            .map(|t| (Route::Admin(*t), t.label()))
            .collect(),
    };
    items.push((Route::Chat, "Health Assistant"));
    items
}

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let role = state.user.as_ref().map(|u| u.role).unwrap_or_default();
    let lines: Vec<Line> = entries(role)
        .into_iter()
        .map(|(route, label)| {
            if route == state.route {
                Line::from(Span::styled(
                    format!("> {}", label),
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(Span::raw(format!("  {}", label)))
            }
        })
        .collect();

    let paragraph =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Menu"));
    frame.render_widget(paragraph, area);
}
