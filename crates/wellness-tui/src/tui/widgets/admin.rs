// Admin area: dashboard, users, patients, feedback, keywords, analytics.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, TableState, Wrap};
use ratatui::Frame;

use wellness_app::protocol::AdminTab;
use wellness_core::models::Analytics;
use wellness_core::time::format_date_time;

use crate::tui::{InputMode, ViewState};

use super::chat::stars;

const BAR_WIDTH: usize = 30;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState, tab: AdminTab) {
    match tab {
        AdminTab::Dashboard => render_dashboard(frame, area, state),
        AdminTab::Users => render_users(frame, area, state),
        AdminTab::Patients => render_patients(frame, area, state),
        AdminTab::TextFeedback => render_text_feedback(frame, area, state),
        AdminTab::Keywords => render_keywords(frame, area, state),
        AdminTab::Feedback => render_feedback(frame, area, state),
        AdminTab::Analytics => render_analytics(frame, area, state),
    }
}

fn titled(title: String) -> Block<'static> {
    Block::default().borders(Borders::ALL).title(title)
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

/// Render `rows` as a selectable table with the current admin selection.
fn render_table(
    frame: &mut Frame,
    area: Rect,
    state: &ViewState,
    title: String,
    header: Vec<&'static str>,
    rows: Vec<Row<'static>>,
    widths: Vec<Constraint>,
) {
    let selected = (!rows.is_empty()).then_some(state.admin_selected);
    let table = Table::new(rows, widths)
        .header(Row::new(header).style(bold()))
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .block(titled(title));
    let mut table_state = TableState::default().with_selected(selected);
    frame.render_stateful_widget(table, area, &mut table_state);
}

/// Split off a one-row filter line above the list.
fn with_filter_line(frame: &mut Frame, area: Rect, state: &ViewState, extra: String) -> Rect {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(area);

    let cursor = if state.mode == InputMode::Filter { "_" } else { "" };
    let line = Line::from(vec![
        Span::styled(" Search: ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("{}{}", state.filter_text, cursor),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled(format!("   {}", extra), Style::default().fg(Color::Gray)),
    ]);
    frame.render_widget(Paragraph::new(line), rows[0]);
    rows[1]
}

// ---------------------------------------------------------------------------
// Dashboard / analytics
// ---------------------------------------------------------------------------

pub fn analytics_lines(analytics: Option<&Analytics>) -> Vec<Line<'static>> {
    let Some(a) = analytics else {
        return vec![Line::from(Span::styled(
            "Analytics not loaded yet (r to refresh)",
            Style::default().fg(Color::Gray),
        ))];
    };
    let stat = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{:<22}", label), Style::default().fg(Color::Gray)),
            Span::styled(value, bold()),
        ])
    };
    vec![
        stat("Total users", a.total_users.to_string()),
        stat("Approved users", a.approved_users.to_string()),
        stat("Pending approval", a.pending_users.to_string()),
        stat("Rejected users", a.rejected_users.to_string()),
        stat("Feedback received", a.feedback_count.to_string()),
        stat("Keywords", a.keyword_count.to_string()),
        stat("Average rating", format!("{:.1} / 5", a.average_feedback)),
    ]
}

/// One bar per star rating, scaled to the largest count.
pub fn distribution_lines(distribution: &[usize; 5]) -> Vec<Line<'static>> {
    let max = distribution.iter().copied().max().unwrap_or(0).max(1);
    (1..=5)
        .rev()
        .map(|stars_count| {
            let count = distribution[stars_count - 1];
            let width = count * BAR_WIDTH / max;
            Line::from(vec![
                Span::raw(format!("{} star ", stars_count)),
                Span::styled("#".repeat(width), Style::default().fg(Color::Yellow)),
                Span::raw(format!(" {}", count)),
            ])
        })
        .collect()
}

fn render_dashboard(frame: &mut Frame, area: Rect, state: &ViewState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let mut lines = analytics_lines(state.admin.analytics.as_ref());
    lines.push(Line::default());
    lines.push(Line::from(format!(
        "{} users waiting for approval",
        state.admin.pending_users.len()
    )));
    lines.push(Line::from(format!(
        "{} registered patients",
        state.admin.patients.len()
    )));
    frame.render_widget(
        Paragraph::new(lines).block(titled(" Overview ".to_string())),
        columns[0],
    );

    frame.render_widget(
        Paragraph::new(distribution_lines(&state.admin.rating_distribution))
            .block(titled(" Chat Ratings ".to_string())),
        columns[1],
    );
}

fn render_analytics(frame: &mut Frame, area: Rect, state: &ViewState) {
    let mut lines = analytics_lines(state.admin.analytics.as_ref());
    lines.push(Line::default());
    lines.push(Line::from(Span::styled("Rating distribution", bold())));
    lines.extend(distribution_lines(&state.admin.rating_distribution));
    lines.push(Line::default());
    lines.push(Line::from(format!(
        "{} text feedback entries",
        state.admin.text_feedback.len()
    )));
    frame.render_widget(
        Paragraph::new(lines).block(titled(" Analytics ".to_string())),
        area,
    );
}

// ---------------------------------------------------------------------------
// Users and patients
// ---------------------------------------------------------------------------

fn approval_span(approved: bool) -> Span<'static> {
    if approved {
        Span::styled("Approved", Style::default().fg(Color::Green))
    } else {
        Span::styled("Pending", Style::default().fg(Color::Yellow))
    }
}

fn render_users(frame: &mut Frame, area: Rect, state: &ViewState) {
    let rows = state
        .admin
        .pending_users
        .iter()
        .map(|p| {
            Row::new(vec![
                p.name.clone(),
                p.email.clone(),
                p.phone.clone(),
                p.age.clone(),
                p.gender.clone(),
            ])
        })
        .collect();
    render_table(
        frame,
        area,
        state,
        format!(" Pending Approval ({}) ", state.admin.pending_users.len()),
        vec!["Name", "Email", "Phone", "Age", "Gender"],
        rows,
        vec![
            Constraint::Percentage(25),
            Constraint::Percentage(35),
            Constraint::Percentage(18),
            Constraint::Percentage(8),
            Constraint::Percentage(14),
        ],
    );
}

fn render_patients(frame: &mut Frame, area: Rect, state: &ViewState) {
    let extra = format!("Status: {} (p)", state.approval_filter.label());
    let list_area = with_filter_line(frame, area, state, extra);

    let visible = state.visible_patients();
    let title = format!(" Patients ({} of {}) ", visible.len(), state.admin.patients.len());
    let rows = visible
        .into_iter()
        .map(|p| {
            Row::new(vec![
                Span::raw(p.name.clone()),
                Span::raw(p.email.clone()),
                Span::raw(p.phone.clone()),
                Span::raw(p.age.clone()),
                Span::raw(p.gender.clone()),
                approval_span(p.is_approved),
            ])
        })
        .collect();
    render_table(
        frame,
        list_area,
        state,
        title,
        vec!["Name", "Email", "Phone", "Age", "Gender", "Status"],
        rows,
        vec![
            Constraint::Percentage(22),
            Constraint::Percentage(30),
            Constraint::Percentage(15),
            Constraint::Percentage(7),
            Constraint::Percentage(12),
            Constraint::Percentage(14),
        ],
    );
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

fn render_text_feedback(frame: &mut Frame, area: Rect, state: &ViewState) {
    let rows = state
        .admin
        .text_feedback
        .iter()
        .map(|f| {
            Row::new(vec![
                f.user_name.clone(),
                stars(f.rating),
                f.feedback.clone(),
                format_date_time(&f.created_at),
            ])
        })
        .collect();
    render_table(
        frame,
        area,
        state,
        format!(" Text Feedback ({}) ", state.admin.text_feedback.len()),
        vec!["User", "Rating", "Feedback", "Date"],
        rows,
        vec![
            Constraint::Percentage(18),
            Constraint::Length(7),
            Constraint::Percentage(55),
            Constraint::Percentage(20),
        ],
    );
}

fn render_feedback(frame: &mut Frame, area: Rect, state: &ViewState) {
    let stars_filter = match state.rating_filter {
        Some(r) => format!("{} stars only (f)", r),
        None => "All ratings (f)".to_string(),
    };
    let list_area = with_filter_line(frame, area, state, stars_filter);

    let visible = state.visible_feedback();
    let title = format!(" Chat Feedback ({} of {}) ", visible.len(), state.admin.feedback.len());
    let rows = visible
        .into_iter()
        .map(|f| {
            Row::new(vec![
                f.chat_id.clone(),
                f.message_index.to_string(),
                stars(f.rating),
                format_date_time(&f.created_at),
            ])
        })
        .collect();
    render_table(
        frame,
        list_area,
        state,
        title,
        vec!["Chat", "Message", "Rating", "Date"],
        rows,
        vec![
            Constraint::Percentage(40),
            Constraint::Length(8),
            Constraint::Length(7),
            Constraint::Percentage(30),
        ],
    );
}

// ---------------------------------------------------------------------------
// Keywords
// ---------------------------------------------------------------------------

fn render_keywords(frame: &mut Frame, area: Rect, state: &ViewState) {
    let extra = format!("{} keywords", state.admin.keywords.len());
    let list_area = with_filter_line(frame, area, state, extra);

    let rows = state
        .visible_keywords()
        .into_iter()
        .map(|k| Row::new(vec![k.keyword.clone(), k.responses.join(" | ")]))
        .collect();
    render_table(
        frame,
        list_area,
        state,
        " Keywords ".to_string(),
        vec!["Keyword", "Responses"],
        rows,
        vec![Constraint::Percentage(25), Constraint::Percentage(75)],
    );

    if state.admin.keywords.is_empty() {
        let hint = Paragraph::new("No keywords yet. Press n to add one.")
            .style(Style::default().fg(Color::Gray))
            .wrap(Wrap { trim: true });
        let inner = Rect {
            x: list_area.x + 2,
            y: list_area.y + 2,
            width: list_area.width.saturating_sub(4),
            height: 1.min(list_area.height.saturating_sub(2)),
        };
        frame.render_widget(hint, inner);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
