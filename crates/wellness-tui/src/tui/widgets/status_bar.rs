// Status bar widget: portal name, current screen, signed-in user, activity.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use wellness_app::protocol::Route;
use wellness_core::models::Role;

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let separator = || Span::styled(" | ", Style::default().fg(Color::Gray));

    let mut spans = vec![
        Span::styled(
            " Wellness Portal ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        separator(),
        Span::styled(route_label(state.route), Style::default().fg(Color::White)),
    ];

    if let Some(user) = &state.user {
        spans.push(separator());
        spans.push(Span::styled(
            format!("{} ({})", user.name, role_label(user.role)),
            Style::default().fg(Color::White),
        ));
    }

    if state.chat.is_loading {
        spans.push(separator());
        spans.push(Span::styled(
            "Assistant is thinking...",
            Style::default().fg(Color::Yellow),
        ));
    }

    if state.speaking {
        spans.push(separator());
        spans.push(Span::styled(
            "Speaking",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

pub fn route_label(route: Route) -> String {
    match route {
        Route::Login => "Sign In".to_string(),
        Route::Signup => "Create Account".to_string(),
        Route::Patient(section) => format!("Patient / {}", section.label()),
        Route::Admin(tab) => format!("Admin / {}", tab.label()),
        Route::Chat => "Health Assistant".to_string(),
    }
}

pub fn role_label(role: Role) -> &'static str {
    match role {
        Role::Patient => "Patient",
        Role::Admin => "Admin",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use wellness_app::protocol::{AdminTab, PatientSection};

    #[test]
    fn route_labels() {
        assert_eq!(route_label(Route::Login), "Sign In");
        assert_eq!(
            route_label(Route::Patient(PatientSection::HealthRecords)),
            "Patient / Health Records"
        );
        assert_eq!(route_label(Route::Admin(AdminTab::Feedback)), "Admin / Chat Feedback");
    }

    #[test]
    fn render_does_not_panic() {
        let backend = ratatui::backend::TestBackend::new(80, 1);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let mut state = ViewState::default();
        state.chat.is_loading = true;
        state.speaking = true;
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
    }
}
