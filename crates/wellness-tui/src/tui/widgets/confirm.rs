// Confirmation overlay: a centered yes/no dialog drawn over the current
// screen (quit, chat deletion, destructive admin actions).

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::tui::layout::centered_rect;

const DIALOG_HEIGHT: u16 = 5;
const MIN_WIDTH: u16 = 28;

pub fn render(frame: &mut Frame, area: Rect, title: &str, question: &str) {
    let width = (question.chars().count() as u16 + 16).max(MIN_WIDTH);
    let dialog_area = centered_rect(width, DIALOG_HEIGHT, area);

    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(Span::styled(
            title.to_string(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));

    let text = vec![
        Line::from(format!(" {}", question)),
        Line::from(vec![
            Span::raw(" ("),
            Span::styled("y", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw("/"),
            Span::styled("n", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw(")"),
        ]),
    ];

    let paragraph = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, dialog_area);
}
