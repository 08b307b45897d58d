// Patient area: overview, health records, appointments and profile.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap};
use ratatui::Frame;

use wellness_app::dashboard::{
    appointments_in, rating_text, records_in, Appointment, AppointmentStatus, AppointmentTab,
    RecordCategory, RecordKind, FEEDBACK_MAX_CHARS, HEALTH_METRICS, MEDICATIONS,
};
use wellness_app::protocol::PatientSection;

use crate::tui::{InputMode, ViewState};

use super::chat::stars;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState, section: PatientSection) {
    match section {
        PatientSection::Overview => render_overview(frame, area, state),
        PatientSection::HealthRecords => render_records(frame, area, state),
        PatientSection::Appointments => render_appointments(frame, area, state),
        PatientSection::Profile => render_profile(frame, area, state),
    }
}

fn titled(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", title))
}

/// `label (count)` entries with the active one highlighted.
fn filter_tabs<T: Copy + PartialEq>(
    all: &[T],
    active: T,
    label: impl Fn(T) -> String,
) -> Line<'static> {
    let mut spans = Vec::new();
    for item in all {
        let style = if *item == active {
            Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::styled(format!("[{}]", label(*item)), style));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

fn render_overview(frame: &mut Frame, area: Rect, state: &ViewState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(HEALTH_METRICS.len() as u16 + 3),
            Constraint::Min(4),
            Constraint::Length(6),
        ])
        .split(area);

    let name = state.user.as_ref().map(|u| u.name.as_str()).unwrap_or("there");
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            format!(" Welcome back, {}!", name),
            Style::default().add_modifier(Modifier::BOLD),
        ))),
        rows[0],
    );

    let metric_rows = HEALTH_METRICS.iter().map(|m| {
        Row::new(vec![
            Cell::from(m.name),
            Cell::from(format!("{} {}", m.value, m.unit)),
            Cell::from(m.status),
            Cell::from(m.trend.arrow()),
        ])
    });
    let metrics = Table::new(
        metric_rows,
        [
            Constraint::Percentage(35),
            Constraint::Percentage(30),
            Constraint::Percentage(20),
            Constraint::Percentage(15),
        ],
    )
    .header(
        Row::new(vec!["Metric", "Value", "Status", "Trend"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(titled("Health Metrics"));
    frame.render_widget(metrics, rows[1]);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[2]);

    let upcoming: Vec<Line> = appointments_in(AppointmentTab::Upcoming)
        .into_iter()
        .map(|a| Line::from(format!("{} {}  {} ({})", a.date, a.time, a.doctor, a.kind)))
        .collect();
    frame.render_widget(
        Paragraph::new(upcoming).block(titled("Upcoming Appointments")),
        middle[0],
    );

    let meds: Vec<Line> = MEDICATIONS
        .iter()
        .map(|m| {
            Line::from(format!(
                "{} {} - {} (next {})",
                m.name, m.dosage, m.frequency, m.next_dose
            ))
        })
        .collect();
    frame.render_widget(
        Paragraph::new(meds)
            .block(titled("Medications"))
            .wrap(Wrap { trim: true }),
        middle[1],
    );

    render_feedback_box(frame, rows[3], state);
}

fn render_feedback_box(frame: &mut Frame, area: Rect, state: &ViewState) {
    let editing = state.mode == InputMode::Feedback;
    let draft = &state.feedback;
    let mut text = draft.text.clone();
    if editing {
        text.push('_');
    }

    let lines = vec![
        Line::from(vec![
            Span::styled(
                stars(draft.rating),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  {}", rating_text(draft.rating))),
            Span::styled(
                format!(
                    "   {}/{} characters",
                    draft.text.chars().count(),
                    FEEDBACK_MAX_CHARS
                ),
                Style::default().fg(Color::Gray),
            ),
        ]),
        if draft.text.is_empty() && !editing {
            Line::from(Span::styled(
                "Press f to tell us about your experience.",
                Style::default().fg(Color::Gray),
            ))
        } else {
            Line::from(text)
        },
    ];

    let border = if editing { Color::Cyan } else { Color::Gray };
    let paragraph = Paragraph::new(lines)
        .block(titled("Share Your Feedback").border_style(Style::default().fg(border)))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

// ---------------------------------------------------------------------------
// Health records
// ---------------------------------------------------------------------------

pub fn kind_label(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::History => "History",
        RecordKind::Labs => "Labs",
        RecordKind::Vaccinations => "Vaccinations",
        RecordKind::Medications => "Medications",
        RecordKind::Imaging => "Imaging",
        RecordKind::Allergies => "Allergies",
    }
}

fn render_records(frame: &mut Frame, area: Rect, state: &ViewState) {
    let mut lines = vec![
        filter_tabs(&RecordCategory::ALL, state.record_category, |c| {
            format!("{} ({})", c.label(), c.count())
        }),
        Line::default(),
    ];

    let records = records_in(state.record_category);
    if records.is_empty() {
        lines.push(Line::from(Span::styled(
            "No records in this category",
            Style::default().fg(Color::Gray),
        )));
    }
    for record in records {
        lines.push(Line::from(vec![
            Span::styled(record.title, Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(
                format!("  {}  {}", kind_label(record.kind), record.date),
                Style::default().fg(Color::Gray),
            ),
        ]));
        lines.push(Line::from(format!("  {}", record.description)));
    }

    frame.render_widget(
        Paragraph::new(lines)
            .block(titled("Health Records"))
            .wrap(Wrap { trim: false }),
        area,
    );
}

// ---------------------------------------------------------------------------
// Appointments
// ---------------------------------------------------------------------------

fn status_color(status: AppointmentStatus) -> Color {
    match status {
        AppointmentStatus::Confirmed => Color::Green,
        AppointmentStatus::Pending => Color::Yellow,
        AppointmentStatus::Completed => Color::Gray,
    }
}

fn appointment_row(a: &Appointment) -> Row<'static> {
    Row::new(vec![
        Cell::from(format!("{} {}", a.date, a.time)),
        Cell::from(format!("{} ({})", a.doctor, a.specialty)),
        Cell::from(a.kind),
        Cell::from(a.duration),
        Cell::from(a.location),
        Cell::from(Span::styled(
            a.status.label(),
            Style::default().fg(status_color(a.status)),
        )),
    ])
}

fn render_appointments(frame: &mut Frame, area: Rect, state: &ViewState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(area);

    frame.render_widget(
        Paragraph::new(filter_tabs(&AppointmentTab::ALL, state.appointment_tab, |t| {
            format!("{} ({})", t.label(), appointments_in(t).len())
        })),
        rows[0],
    );

    let table = Table::new(
        appointments_in(state.appointment_tab).into_iter().map(appointment_row),
        [
            Constraint::Length(20),
            Constraint::Percentage(28),
            Constraint::Percentage(18),
            Constraint::Length(8),
            Constraint::Percentage(24),
            Constraint::Length(10),
        ],
    )
    .header(
        Row::new(vec!["When", "Doctor", "Type", "Length", "Location", "Status"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(titled("Appointments"));
    frame.render_widget(table, rows[1]);
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

fn render_profile(frame: &mut Frame, area: Rect, state: &ViewState) {
    let Some(user) = &state.user else {
        frame.render_widget(
            Paragraph::new("Not signed in").block(titled("Profile")),
            area,
        );
        return;
    };

    let or_dash = |v: &str| {
        if v.trim().is_empty() {
            "-".to_string()
        } else {
            v.to_string()
        }
    };
    let fields = [
        ("Name", user.name.as_str()),
        ("Email", user.email.as_str()),
        ("Phone", user.phone.as_str()),
        ("Age", user.age.as_str()),
        ("Gender", user.gender.as_str()),
        ("Blood Group", user.blood_group.as_str()),
        ("Emergency Contact", user.emergency_contact.as_str()),
        ("Address", user.address.as_str()),
        ("Medical History", user.medical_history.as_str()),
    ];
    let lines: Vec<Line> = fields
        .into_iter()
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(
                    format!("{:<18}", label),
                    Style::default().fg(Color::Gray),
                ),
                Span::raw(or_dash(value)),
            ])
        })
        .collect();

    frame.render_widget(
        Paragraph::new(lines)
            .block(titled("Profile"))
            .wrap(Wrap { trim: false }),
        area,
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::test_support::{render_to_text, user};
    use wellness_app::protocol::Route;
    use wellness_core::models::Role;

    fn patient_state(section: PatientSection) -> ViewState {
        let mut state = ViewState::default();
        state.user = Some(user(Role::Patient));
        state.route = Route::Patient(section);
        state
    }

    #[test]
    fn records_show_category_counts() {
        let text = render_to_text(&patient_state(PatientSection::HealthRecords), 140, 40);
        assert!(text.contains("All Records (6)"));
        assert!(text.contains("MRI Scan Report"));
    }

    #[test]
    fn record_filter_limits_list() {
        let mut state = patient_state(PatientSection::HealthRecords);
        state.record_category = RecordCategory::Imaging;
        let text = render_to_text(&state, 140, 40);
        assert!(text.contains("MRI Scan Report"));
        assert!(!text.contains("Vaccination Records"));
    }

    #[test]
    fn appointments_follow_tab() {
        let mut state = patient_state(PatientSection::Appointments);
        state.appointment_tab = AppointmentTab::Past;
        let text = render_to_text(&state, 160, 40);
        assert!(text.contains("Dr. Raj Patel"));
        assert!(!text.contains("Dr. Emily Chen"));
    }

    #[test]
    fn profile_lists_user_fields() {
        let text = render_to_text(&patient_state(PatientSection::Profile), 120, 40);
        assert!(text.contains("12 Lake Road"));
        assert!(text.contains("Blood Group"));
    }

    #[test]
    fn feedback_box_shows_counter_while_editing() {
        let mut state = patient_state(PatientSection::Overview);
        state.mode = InputMode::Feedback;
        state.feedback.text = "Great".to_string();
        let text = render_to_text(&state, 120, 40);
        assert!(text.contains("5/500 characters"));
        assert!(text.contains("Excellent"));
    }

    #[test]
    fn every_record_kind_has_a_label() {
        assert_eq!(kind_label(RecordKind::Allergies), "Allergies");
    }
}
