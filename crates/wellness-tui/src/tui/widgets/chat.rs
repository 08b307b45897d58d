// Chat screen: history sidebar, conversation, quick actions and input box.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use wellness_app::dashboard::rating_text;
use wellness_core::models::{Message, QUICK_ACTIONS};
use wellness_core::time::{format_clock, format_date_time};

use crate::tui::layout::{centered_rect, chat_layout};
use crate::tui::{InputMode, RatingDraft, ViewState};

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let layout = chat_layout(area, state.chat.appointment_prompt);

    render_sidebar(frame, layout.sidebar, state);
    if state.chat.appointment_prompt {
        render_banner(frame, layout.banner);
    }
    render_messages(frame, layout.messages, state);
    render_quick_actions(frame, layout.quick_actions);
    render_input(frame, layout.input, state);
}

// ---------------------------------------------------------------------------
// Sidebar
// ---------------------------------------------------------------------------

fn render_sidebar(frame: &mut Frame, area: Rect, state: &ViewState) {
    let mut lines = Vec::new();

    let searching = state.mode == InputMode::Search;
    if searching || !state.search_text.is_empty() {
        let cursor = if searching { "_" } else { "" };
        lines.push(Line::from(Span::styled(
            format!("Search: {}{}", state.search_text, cursor),
            Style::default().fg(Color::Yellow),
        )));
        lines.push(Line::default());
    }

    let chats = state.sidebar_chats();
    if chats.is_empty() {
        let empty = if state.chat.search_query.trim().is_empty() {
            "No conversations yet"
        } else {
            "No matching chats"
        };
        lines.push(Line::from(Span::styled(empty, Style::default().fg(Color::Gray))));
    }

    let current = state.chat.current_chat_id.as_deref();
    for (i, summary) in chats.iter().enumerate() {
        let marker = if Some(summary.chat_id.as_str()) == current { "*" } else { " " };
        let style = if i == state.selected_chat {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(
            format!("{}{}", marker, summary.display_title()),
            style,
        )));

        let mut detail = Vec::new();
        if let Some(updated) = &summary.updated_at {
            detail.push(format_date_time(updated));
        }
        if let Some(count) = summary.match_count {
            detail.push(format!("{} matches", count));
        } else if let Some(count) = summary.message_count {
            detail.push(format!("{} messages", count));
        }
        if let Some(preview) = summary.preview.as_ref().or(summary.last_message.as_ref()) {
            detail.push(preview.clone());
        }
        if !detail.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("  {}", detail.join(" - ")),
                Style::default().fg(Color::Gray),
            )));
        }
    }

    let title = format!(" Chats | {} ", state.chat.language.label());
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

fn render_banner(frame: &mut Frame, area: Rect) {
    let paragraph = Paragraph::new(Line::from(vec![
        Span::styled(
            "Your symptoms may need a doctor's attention. ",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Span::raw("b: book an appointment | a: dismiss"),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red)),
    );
    frame.render_widget(paragraph, area);
}

fn message_header(message: &Message, index: usize, state: &ViewState) -> Line<'static> {
    let (who, color) = if message.is_bot() {
        ("Assistant", Color::Green)
    } else {
        ("You", Color::Cyan)
    };
    let mut style = Style::default().fg(color).add_modifier(Modifier::BOLD);
    if state.selected_message == Some(index) {
        style = style.add_modifier(Modifier::REVERSED);
    }

    let mut spans = vec![
        Span::styled(who, style),
        Span::styled(
            format!(" {}", format_clock(&message.timestamp)),
            Style::default().fg(Color::Gray),
        ),
    ];
    if let Some(emotion) = &message.emotion {
        spans.push(Span::styled(
            format!(" [{}]", emotion),
            Style::default().fg(Color::Magenta),
        ));
    }
    if let Some(score) = message.severity_score {
        spans.push(Span::styled(
            format!(" severity {:.0}/10", score),
            Style::default().fg(severity_color(score)),
        ));
    }
    if state.chat.rated.contains(&index) {
        spans.push(Span::styled(" rated", Style::default().fg(Color::Yellow)));
    }
    Line::from(spans)
}

pub fn severity_color(score: f32) -> Color {
    if score >= 7.0 {
        Color::Red
    } else if score >= 4.0 {
        Color::Yellow
    } else {
        Color::Green
    }
}

/// Rows a message needs at `width`: header, wrapped text, optional
/// entities line.
pub fn message_height(message: &Message, width: u16) -> usize {
    let width = usize::from(width.max(1));
    let text_rows: usize = message
        .text
        .lines()
        .map(|l| l.chars().count().div_ceil(width).max(1))
        .sum::<usize>()
        .max(1);
    let entity_rows = usize::from(!message.entities.is_empty());
    1 + text_rows + entity_rows
}

/// First message index to draw so that `anchor` (and as much history
/// before it as fits) is visible in `height` rows.
pub fn first_visible(heights: &[usize], height: usize, anchor: usize) -> usize {
    if heights.is_empty() {
        return 0;
    }
    let mut used = 0;
    let mut start = anchor.min(heights.len().saturating_sub(1));
    for i in (0..=start).rev() {
        if used + heights[i] > height && i != start {
            break;
        }
        used += heights[i];
        start = i;
    }
    start
}

fn render_messages(frame: &mut Frame, area: Rect, state: &ViewState) {
    let block = Block::default().borders(Borders::ALL).title(" Health Assistant ");
    let inner = block.inner(area);
    let messages = &state.chat.messages;

    let mut lines: Vec<Line> = Vec::new();
    if messages.is_empty() {
        lines.push(Line::from(Span::styled(
            "Start a conversation: press i to type, or 1-8 for a quick question.",
            Style::default().fg(Color::Gray),
        )));
    } else {
        let heights: Vec<usize> = messages
            .iter()
            .map(|m| message_height(m, inner.width))
            .collect();
        let reserved = usize::from(state.chat.is_loading);
        let room = usize::from(inner.height).saturating_sub(reserved);
        let anchor = state.selected_message.unwrap_or(messages.len() - 1);
        let start = first_visible(&heights, room, anchor);

        for (i, message) in messages.iter().enumerate().skip(start) {
            lines.push(message_header(message, i, state));
            for text_line in message.text.lines() {
                lines.push(Line::from(text_line.to_string()));
            }
            if !message.entities.is_empty() {
                lines.push(Line::from(Span::styled(
                    format!("Topics: {}", message.entities.join(", ")),
                    Style::default().fg(Color::Gray),
                )));
            }
        }
    }

    if state.chat.is_loading {
        lines.push(Line::from(Span::styled(
            "Assistant is thinking...",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_quick_actions(frame: &mut Frame, area: Rect) {
    let mut spans = Vec::new();
    for (i, action) in QUICK_ACTIONS.iter().enumerate() {
        spans.push(Span::styled(
            format!("{}", i + 1),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(format!(" {}  ", action.label)));
    }
    let paragraph = Paragraph::new(Line::from(spans)).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_input(frame: &mut Frame, area: Rect, state: &ViewState) {
    let composing = state.mode == InputMode::Compose;
    let border = if composing { Color::Cyan } else { Color::Gray };
    let title = if state.chat.is_loading {
        " Message (waiting for reply) "
    } else {
        " Message "
    };
    let mut text = state.chat_input.clone();
    if composing {
        text.push('_');
    }

    // Keep the end of a long draft in view.
    let width = usize::from(area.width.saturating_sub(2));
    let skip = text.chars().count().saturating_sub(width);
    let visible: String = text.chars().skip(skip).collect();

    let paragraph = Paragraph::new(visible).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(title),
    );
    frame.render_widget(paragraph, area);
}

// ---------------------------------------------------------------------------
// Rating dialog
// ---------------------------------------------------------------------------

pub fn stars(rating: u8) -> String {
    let filled = usize::from(rating.min(5));
    format!("{}{}", "*".repeat(filled), ".".repeat(5 - filled))
}

pub fn render_rating(frame: &mut Frame, area: Rect, draft: &RatingDraft) {
    let dialog = centered_rect(56, 6, area);
    frame.render_widget(Clear, dialog);

    let lines = vec![
        Line::from(vec![
            Span::styled(
                stars(draft.rating),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  {}", rating_text(draft.rating))),
        ]),
        Line::from(format!("Comments: {}_", draft.comments)),
    ];
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" Rate this reply "),
        )
        .wrap(Wrap { trim: false })
        .style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, dialog);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
