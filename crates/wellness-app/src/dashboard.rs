// Patient dashboard content.
//
// Overview metrics, medications, health records and appointments are fixed
// sample data; the backend has no endpoints for them. The general feedback
// form is the one dashboard feature that talks to the backend.

use thiserror::Error;
use tracing::info;

use wellness_api::{ApiError, ChatApi};
use wellness_core::models::TextFeedbackRequest;

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    pub fn arrow(self) -> &'static str {
        match self {
            Trend::Up => "↗",
            Trend::Down => "↘",
            Trend::Stable => "→",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthMetric {
    pub name: &'static str,
    pub value: &'static str,
    pub unit: &'static str,
    pub status: &'static str,
    pub trend: Trend,
}

pub const HEALTH_METRICS: &[HealthMetric] = &[
    HealthMetric { name: "Heart Rate", value: "72", unit: "BPM", status: "normal", trend: Trend::Stable },
    HealthMetric { name: "Blood Pressure", value: "120/80", unit: "mmHg", status: "normal", trend: Trend::Stable },
    HealthMetric { name: "Weight", value: "68", unit: "kg", status: "normal", trend: Trend::Down },
    HealthMetric { name: "BMI", value: "22.2", unit: "", status: "healthy", trend: Trend::Stable },
    HealthMetric { name: "Sleep", value: "7.5", unit: "hours", status: "good", trend: Trend::Up },
    HealthMetric { name: "Steps", value: "8452", unit: "steps", status: "good", trend: Trend::Up },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Medication {
    pub name: &'static str,
    pub dosage: &'static str,
    pub frequency: &'static str,
    pub next_dose: &'static str,
}

pub const MEDICATIONS: &[Medication] = &[
    Medication { name: "Metformin", dosage: "500mg", frequency: "Twice daily", next_dose: "2:00 PM" },
    Medication { name: "Lisinopril", dosage: "10mg", frequency: "Once daily", next_dose: "8:00 AM" },
];

// ---------------------------------------------------------------------------
// Health records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    History,
    Labs,
    Vaccinations,
    Medications,
    Imaging,
    Allergies,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthRecord {
    pub title: &'static str,
    pub description: &'static str,
    pub kind: RecordKind,
    pub date: &'static str,
}

pub const HEALTH_RECORDS: &[HealthRecord] = &[
    HealthRecord {
        title: "Medical History",
        description: "Complete medical history and past conditions",
        kind: RecordKind::History,
        date: "2024-01-15",
    },
    HealthRecord {
        title: "Lab Results - Blood Test",
        description: "Complete blood count and metabolic panel",
        kind: RecordKind::Labs,
        date: "2024-01-10",
    },
    HealthRecord {
        title: "Vaccination Records",
        description: "Immunization history and vaccination schedule",
        kind: RecordKind::Vaccinations,
        date: "2023-12-20",
    },
    HealthRecord {
        title: "Current Prescriptions",
        description: "Active medications and dosage instructions",
        kind: RecordKind::Medications,
        date: "2024-01-12",
    },
    HealthRecord {
        title: "MRI Scan Report",
        description: "Brain MRI imaging and radiologist report",
        kind: RecordKind::Imaging,
        date: "2023-11-30",
    },
    HealthRecord {
        title: "Allergy Information",
        description: "Documented allergies and adverse reactions",
        kind: RecordKind::Allergies,
        date: "2024-01-05",
    },
];

/// Filter buttons on the health records page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordCategory {
    #[default]
    All,
    Labs,
    History,
    Medications,
    Imaging,
}

impl RecordCategory {
    pub const ALL: [RecordCategory; 5] = [
        RecordCategory::All,
        RecordCategory::Labs,
        RecordCategory::History,
        RecordCategory::Medications,
        RecordCategory::Imaging,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RecordCategory::All => "All Records",
            RecordCategory::Labs => "Lab Results",
            RecordCategory::History => "Medical History",
            RecordCategory::Medications => "Prescriptions",
            RecordCategory::Imaging => "Imaging",
        }
    }

    pub fn next(self) -> RecordCategory {
        let i = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn matches(self, record: &HealthRecord) -> bool {
        match self {
            RecordCategory::All => true,
            RecordCategory::Labs => record.kind == RecordKind::Labs,
            RecordCategory::History => record.kind == RecordKind::History,
            RecordCategory::Medications => record.kind == RecordKind::Medications,
            RecordCategory::Imaging => record.kind == RecordKind::Imaging,
        }
    }

    pub fn count(self) -> usize {
        HEALTH_RECORDS.iter().filter(|r| self.matches(r)).count()
    }
}

pub fn records_in(category: RecordCategory) -> Vec<&'static HealthRecord> {
    HEALTH_RECORDS.iter().filter(|r| category.matches(r)).collect()
}

// ---------------------------------------------------------------------------
// Appointments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentStatus {
    Confirmed,
    Pending,
    Completed,
}

impl AppointmentStatus {
    pub fn label(self) -> &'static str {
        match self {
            AppointmentStatus::Confirmed => "Confirmed",
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appointment {
    pub doctor: &'static str,
    pub specialty: &'static str,
    pub date: &'static str,
    pub time: &'static str,
    pub kind: &'static str,
    pub status: AppointmentStatus,
    pub duration: &'static str,
    pub location: &'static str,
}

pub const APPOINTMENTS: &[Appointment] = &[
    Appointment {
        doctor: "Dr. Sarah Smith",
        specialty: "Cardiologist",
        date: "2024-02-15",
        time: "10:00 AM",
        kind: "General Checkup",
        status: AppointmentStatus::Confirmed,
        duration: "30 mins",
        location: "Main Hospital - Floor 3",
    },
    Appointment {
        doctor: "Dr. Mike Johnson",
        specialty: "Dentist",
        date: "2024-02-20",
        time: "2:30 PM",
        kind: "Dental Cleaning",
        status: AppointmentStatus::Confirmed,
        duration: "45 mins",
        location: "Dental Wing - Floor 1",
    },
    Appointment {
        doctor: "Dr. Emily Chen",
        specialty: "Dermatologist",
        date: "2024-03-01",
        time: "11:15 AM",
        kind: "Skin Consultation",
        status: AppointmentStatus::Pending,
        duration: "30 mins",
        location: "Skin Clinic - Floor 2",
    },
    Appointment {
        doctor: "Dr. Raj Patel",
        specialty: "General Physician",
        date: "2024-01-10",
        time: "9:00 AM",
        kind: "Follow-up",
        status: AppointmentStatus::Completed,
        duration: "20 mins",
        location: "Main Hospital - Floor 2",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppointmentTab {
    #[default]
    Upcoming,
    Pending,
    Past,
}

impl AppointmentTab {
    pub const ALL: [AppointmentTab; 3] = [
        AppointmentTab::Upcoming,
        AppointmentTab::Pending,
        AppointmentTab::Past,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AppointmentTab::Upcoming => "Upcoming",
            AppointmentTab::Pending => "Pending",
            AppointmentTab::Past => "Past",
        }
    }

    pub fn next(self) -> AppointmentTab {
        match self {
            AppointmentTab::Upcoming => AppointmentTab::Pending,
            AppointmentTab::Pending => AppointmentTab::Past,
            AppointmentTab::Past => AppointmentTab::Upcoming,
        }
    }

    fn status(self) -> AppointmentStatus {
        match self {
            AppointmentTab::Upcoming => AppointmentStatus::Confirmed,
            AppointmentTab::Pending => AppointmentStatus::Pending,
            AppointmentTab::Past => AppointmentStatus::Completed,
        }
    }
}

pub fn appointments_in(tab: AppointmentTab) -> Vec<&'static Appointment> {
    APPOINTMENTS
        .iter()
        .filter(|a| a.status == tab.status())
        .collect()
}

// ---------------------------------------------------------------------------
// General feedback
// ---------------------------------------------------------------------------

pub const FEEDBACK_MAX_CHARS: usize = 500;

#[derive(Debug, Error)]
pub enum PortalFeedbackError {
    #[error("User not found. Please log in again.")]
    NoUser,

    #[error("Please provide your feedback before submitting.")]
    Empty,

    #[error("Feedback is limited to 500 characters.")]
    TooLong,

    #[error("Rating must be between 1 and 5")]
    InvalidRating,

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub fn rating_text(rating: u8) -> &'static str {
    match rating {
        5 => "Excellent",
        4 => "Good",
        3 => "Average",
        2 => "Poor",
        1 => "Very Poor",
        _ => "",
    }
}

/// Submit the dashboard's general feedback form.
pub async fn submit_portal_feedback(
    api: &dyn ChatApi,
    user_id: Option<&str>,
    rating: u8,
    text: &str,
) -> Result<(), PortalFeedbackError> {
    let user_id = user_id.ok_or(PortalFeedbackError::NoUser)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(PortalFeedbackError::Empty);
    }
    if text.chars().count() > FEEDBACK_MAX_CHARS {
        return Err(PortalFeedbackError::TooLong);
    }
    if !(1..=5).contains(&rating) {
        return Err(PortalFeedbackError::InvalidRating);
    }

    api.submit_text_feedback(&TextFeedbackRequest {
        user_id: user_id.to_string(),
        rating,
        feedback: text.to_string(),
        kind: "general".to_string(),
    })
    .await?;
    info!("Portal feedback submitted ({} stars)", rating);
    Ok(())
}
