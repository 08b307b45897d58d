// Form rendering shared by the sign-in, sign-up and editor screens.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use wellness_core::validation::{Field, FieldErrors};

use crate::tui::form::Form;
use crate::tui::layout::centered_rect;

const MODAL_WIDTH: u16 = 64;

/// Lines for every field: label, value (masked for passwords), and the
/// field's error if any. The form-level submit error goes last.
pub fn form_lines(form: &Form, errors: &FieldErrors) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (i, field) in form.fields.iter().enumerate() {
        let focused = i == form.focus;
        let label_style = if focused {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        lines.push(Line::from(Span::styled(field.label, label_style)));

        let mut shown = if field.secret {
            "*".repeat(field.value.chars().count())
        } else {
            field.value.clone()
        };
        if focused {
            shown.push('_');
        }
        lines.push(Line::from(format!("  {}", shown)));

        if let Some(message) = field.key.and_then(|k| errors.get(&k)) {
            lines.push(Line::from(Span::styled(
                format!("  {}", message),
                Style::default().fg(Color::Red),
            )));
        }
    }

    if let Some(message) = errors.get(&Field::Submit) {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
    }
    lines
}

pub fn render(frame: &mut Frame, area: Rect, form: &Form, errors: &FieldErrors, extra: Vec<Line<'static>>) {
    let mut lines = form_lines(form, errors);
    lines.extend(extra);

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", form.title())),
    );
    frame.render_widget(paragraph, area);
}

/// Render `form` as a dialog over the current screen.
pub fn render_modal(frame: &mut Frame, area: Rect, form: &Form, errors: &FieldErrors) {
    let height = form.fields.len() as u16 * 2 + 3;
    let dialog = centered_rect(MODAL_WIDTH, height, area);
    frame.render_widget(Clear, dialog);
    render(frame, dialog, form, errors, Vec::new());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(lines: &[Line]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn passwords_are_masked() {
        let mut form = Form::login();
        form.set_value(0, "asha@example.com");
        form.set_value(1, "secret1");
        let lines = text(&form_lines(&form, &FieldErrors::new()));
        assert!(lines.iter().any(|l| l.contains("asha@example.com")));
        assert!(lines.iter().any(|l| l.contains("*******")));
        assert!(!lines.iter().any(|l| l.contains("secret1")));
    }

    #[test]
    fn field_and_submit_errors_are_listed() {
        let form = Form::login();
        let mut errors = FieldErrors::new();
        errors.insert(Field::Email, "Email is required".to_string());
        errors.insert(Field::Submit, "Login failed. Please check your credentials.".to_string());
        let lines = text(&form_lines(&form, &errors));
        assert!(lines.iter().any(|l| l.contains("Email is required")));
        assert_eq!(
            lines.last().map(String::as_str),
            Some("Login failed. Please check your credentials.")
        );
    }

    #[test]
    fn modal_render_does_not_panic() {
        let backend = ratatui::backend::TestBackend::new(80, 30);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let form = Form::signup();
        terminal
            .draw(|frame| render_modal(frame, frame.area(), &form, &FieldErrors::new()))
            .unwrap();
    }
}
