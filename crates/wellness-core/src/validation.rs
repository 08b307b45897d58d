// Client-side form validation for login and signup.
//
// Mirrors the checks the portal performs before it talks to the backend.
// The backend re-validates everything; these only give early feedback.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::SignupRequest;

/// Form fields that can carry an error message. `Submit` is the form-level
/// slot used for backend failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Email,
    Phone,
    Age,
    Gender,
    Password,
    ConfirmPassword,
    EmergencyContact,
    BloodGroup,
    Address,
    MedicalHistory,
    Submit,
}

pub type FieldErrors = BTreeMap<Field, String>;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern compiles"));

// ASCII only; `\d` would also accept other scripts' digits.
static TEN_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10}$").expect("phone pattern compiles"));

fn is_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

fn is_ten_digits(value: &str) -> bool {
    TEN_DIGITS.is_match(value)
}

/// Login form input.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub remember_me: bool,
}

/// Signup form input, including the password confirmation that never
/// leaves the client.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub age: String,
    pub gender: String,
    pub password: String,
    pub confirm_password: String,
    pub emergency_contact: String,
    pub blood_group: String,
    pub address: String,
    pub medical_history: String,
}

impl SignupForm {
    /// The request body sent to the backend.
    pub fn to_request(&self) -> SignupRequest {
        SignupRequest {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            age: self.age.trim().to_string(),
            gender: self.gender.trim().to_string(),
            password: self.password.clone(),
            emergency_contact: self.emergency_contact.trim().to_string(),
            blood_group: self.blood_group.trim().to_string(),
            address: self.address.trim().to_string(),
            medical_history: self.medical_history.trim().to_string(),
        }
    }
}

fn check_email(email: &str, errors: &mut FieldErrors) {
    let email = email.trim();
    if email.is_empty() {
        errors.insert(Field::Email, "Email is required".into());
    } else if !is_email(email) {
        errors.insert(Field::Email, "Email is invalid".into());
    }
}

pub fn validate_login(form: &LoginForm) -> FieldErrors {
    let mut errors = FieldErrors::new();
    check_email(&form.email, &mut errors);
    if form.password.is_empty() {
        errors.insert(Field::Password, "Password is required".into());
    }
    errors
}

pub fn validate_signup(form: &SignupForm) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if form.name.trim().is_empty() {
        errors.insert(Field::Name, "Full name is required".into());
    }

    check_email(&form.email, &mut errors);

    let phone = form.phone.trim();
    if phone.is_empty() {
        errors.insert(Field::Phone, "Phone number is required".into());
    } else if !is_ten_digits(phone) {
        errors.insert(Field::Phone, "Phone number must be 10 digits".into());
    }

    let age = form.age.trim();
    if age.is_empty() {
        errors.insert(Field::Age, "Age is required".into());
    } else if !matches!(age.parse::<u32>(), Ok(1..=120)) {
        errors.insert(Field::Age, "Age must be between 1 and 120".into());
    }

    if form.gender.trim().is_empty() {
        errors.insert(Field::Gender, "Gender is required".into());
    }

    if form.password.is_empty() {
        errors.insert(Field::Password, "Password is required".into());
    } else if form.password.chars().count() < 6 {
        errors.insert(Field::Password, "Password must be at least 6 characters".into());
    }

    if form.password != form.confirm_password {
        errors.insert(Field::ConfirmPassword, "Passwords do not match".into());
    }

    let emergency = form.emergency_contact.trim();
    if !emergency.is_empty() && !is_ten_digits(emergency) {
        errors.insert(
            Field::EmergencyContact,
            "Emergency contact must be 10 digits".into(),
        );
    }

    errors
}
