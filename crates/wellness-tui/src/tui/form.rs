// Editable forms: login, signup, profile and the admin editors.
//
// A `Form` is an ordered list of labelled text fields with one focused
// field. `submit` turns the filled-in form into the command it stands for.

use wellness_app::protocol::{AdminCommand, UserCommand};
use wellness_core::models::{KeywordEntry, PatientRecord, PatientUpdate, ProfileUpdate, User};
use wellness_core::validation::{Field, LoginForm, SignupForm};

/// Separator used to edit a keyword's responses in a single line.
pub const RESPONSE_SEPARATOR: char = '|';

#[derive(Debug, Clone, PartialEq)]
pub enum FormKind {
    Login,
    Signup,
    Profile,
    NewKeyword,
    EditKeyword(String),
    /// Holds the record as loaded so only changed fields are sent.
    EditPatient(PatientRecord),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub label: &'static str,
    /// Validation slot this field reports errors under.
    pub key: Option<Field>,
    pub value: String,
    pub secret: bool,
}

impl FormField {
    fn text(label: &'static str, key: Option<Field>) -> Self {
        FormField {
            label,
            key,
            value: String::new(),
            secret: false,
        }
    }

    fn secret(label: &'static str, key: Field) -> Self {
        FormField {
            secret: true,
            ..FormField::text(label, Some(key))
        }
    }

    fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    pub kind: FormKind,
    pub fields: Vec<FormField>,
    pub focus: usize,
}

impl Form {
    fn new(kind: FormKind, fields: Vec<FormField>) -> Self {
        Form {
            kind,
            fields,
            focus: 0,
        }
    }

    pub fn login() -> Self {
        Form::new(
            FormKind::Login,
            vec![
                FormField::text("Email", Some(Field::Email)),
                FormField::secret("Password", Field::Password),
            ],
        )
    }

    pub fn signup() -> Self {
        Form::new(
            FormKind::Signup,
            vec![
                FormField::text("Full Name", Some(Field::Name)),
                FormField::text("Email", Some(Field::Email)),
                FormField::text("Phone", Some(Field::Phone)),
                FormField::text("Age", Some(Field::Age)),
                FormField::text("Gender", Some(Field::Gender)),
                FormField::secret("Password", Field::Password),
                FormField::secret("Confirm Password", Field::ConfirmPassword),
                FormField::text("Emergency Contact", Some(Field::EmergencyContact)),
                FormField::text("Blood Group", Some(Field::BloodGroup)),
                FormField::text("Address", Some(Field::Address)),
                FormField::text("Medical History", Some(Field::MedicalHistory)),
            ],
        )
    }

    pub fn profile(user: &User) -> Self {
        let p = ProfileUpdate::from_user(user);
        Form::new(
            FormKind::Profile,
            vec![
                FormField::text("Full Name", Some(Field::Name)).with_value(p.name),
                FormField::text("Phone", Some(Field::Phone)).with_value(p.phone),
                FormField::text("Age", Some(Field::Age)).with_value(p.age),
                FormField::text("Gender", Some(Field::Gender)).with_value(p.gender),
                FormField::text("Blood Group", Some(Field::BloodGroup)).with_value(p.blood_group),
                FormField::text("Emergency Contact", Some(Field::EmergencyContact))
                    .with_value(p.emergency_contact),
                FormField::text("Address", Some(Field::Address)).with_value(p.address),
            ],
        )
    }

    pub fn new_keyword() -> Self {
        Form::new(
            FormKind::NewKeyword,
            vec![
                FormField::text("Keyword", None),
                FormField::text("Response", None),
            ],
        )
    }

    pub fn edit_keyword(entry: &KeywordEntry) -> Self {
        let joined = entry.responses.join(&format!(" {} ", RESPONSE_SEPARATOR));
        Form::new(
            FormKind::EditKeyword(entry.id.clone()),
            vec![
                FormField::text("Keyword", None).with_value(entry.keyword.clone()),
                FormField::text("Responses (separate with |)", None).with_value(joined),
            ],
        )
    }

    pub fn edit_patient(record: &PatientRecord) -> Self {
        Form::new(
            FormKind::EditPatient(record.clone()),
            vec![
                FormField::text("Name", Some(Field::Name)).with_value(record.name.clone()),
                FormField::text("Email", Some(Field::Email)).with_value(record.email.clone()),
                FormField::text("Phone", Some(Field::Phone)).with_value(record.phone.clone()),
                FormField::text("Age", Some(Field::Age)).with_value(record.age.clone()),
                FormField::text("Gender", Some(Field::Gender)).with_value(record.gender.clone()),
            ],
        )
    }

    pub fn title(&self) -> &'static str {
        match self.kind {
            FormKind::Login => "Sign In",
            FormKind::Signup => "Create Account",
            FormKind::Profile => "Edit Profile",
            FormKind::NewKeyword => "Add Keyword",
            FormKind::EditKeyword(_) => "Edit Keyword",
            FormKind::EditPatient(_) => "Edit Patient",
        }
    }

    pub fn value(&self, index: usize) -> &str {
        self.fields.get(index).map(|f| f.value.as_str()).unwrap_or("")
    }

    pub fn set_value(&mut self, index: usize, value: impl Into<String>) {
        if let Some(field) = self.fields.get_mut(index) {
            field.value = value.into();
        }
    }

    pub fn next_field(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub fn prev_field(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    pub fn push_char(&mut self, c: char) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.value.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.value.pop();
        }
    }

    /// Blank every password field.
    pub fn clear_secrets(&mut self) {
        for field in self.fields.iter_mut().filter(|f| f.secret) {
            field.value.clear();
        }
    }

    /// Build the command this form submits, or `None` when there is
    /// nothing to send (e.g. a patient edit that changed no field).
    pub fn submit(&self, remember_me: bool) -> Option<UserCommand> {
        let v = |i: usize| self.value(i).to_string();
        match &self.kind {
            FormKind::Login => Some(UserCommand::Login(LoginForm {
                email: v(0),
                password: v(1),
                remember_me,
            })),
            FormKind::Signup => Some(UserCommand::Signup(SignupForm {
                name: v(0),
                email: v(1),
                phone: v(2),
                age: v(3),
                gender: v(4),
                password: v(5),
                confirm_password: v(6),
                emergency_contact: v(7),
                blood_group: v(8),
                address: v(9),
                medical_history: v(10),
            })),
            FormKind::Profile => Some(UserCommand::UpdateProfile(ProfileUpdate {
                name: v(0).trim().to_string(),
                phone: v(1).trim().to_string(),
                age: v(2).trim().to_string(),
                gender: v(3).trim().to_string(),
                blood_group: v(4).trim().to_string(),
                emergency_contact: v(5).trim().to_string(),
                address: v(6).trim().to_string(),
            })),
            FormKind::NewKeyword => Some(UserCommand::Admin(AdminCommand::AddKeyword {
                keyword: v(0),
                response: v(1),
            })),
            FormKind::EditKeyword(id) => Some(UserCommand::Admin(AdminCommand::UpdateKeyword {
                id: id.clone(),
                keyword: v(0),
                responses: split_responses(self.value(1)),
            })),
            FormKind::EditPatient(original) => {
                let changed = |i: usize, before: &str| {
                    let after = self.value(i).trim();
                    (after != before).then(|| after.to_string())
                };
                let update = PatientUpdate {
                    name: changed(0, &original.name),
                    email: changed(1, &original.email),
                    phone: changed(2, &original.phone),
                    age: changed(3, &original.age),
                    gender: changed(4, &original.gender),
                };
                if update.is_empty() {
                    return None;
                }
                Some(UserCommand::Admin(AdminCommand::UpdatePatient {
                    id: original.id.clone(),
                    update,
                }))
            }
        }
    }
}

pub fn split_responses(raw: &str) -> Vec<String> {
    raw.split(RESPONSE_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
