// Login and signup flows: validate locally, then call the backend.
//
// Failures come back as `FieldErrors` so the form can show them inline;
// backend errors land in the form-level `Field::Submit` slot.

use tracing::{info, warn};

use wellness_api::{ApiError, AuthApi};
use wellness_core::models::{LoginRequest, LoginResponse};
use wellness_core::validation::{
    validate_login, validate_signup, Field, FieldErrors, LoginForm, SignupForm,
};

const LOGIN_FAILED: &str = "Login failed. Please check your credentials.";
const SIGNUP_FAILED: &str = "Signup failed. Please try again.";
const SIGNUP_DONE: &str = "Account created successfully!";

fn submit_error(err: &ApiError, fallback: &str) -> FieldErrors {
    let message = match err {
        ApiError::Transport(_) => err.user_message(),
        ApiError::Decode(_) => fallback.to_string(),
        _ => {
            let server = err.user_message();
            if server.trim().is_empty() {
                fallback.to_string()
            } else {
                server
            }
        }
    };
    let mut errors = FieldErrors::new();
    errors.insert(Field::Submit, message);
    errors
}

pub async fn login(api: &dyn AuthApi, form: &LoginForm) -> Result<LoginResponse, FieldErrors> {
    let errors = validate_login(form);
    if !errors.is_empty() {
        return Err(errors);
    }

    let req = LoginRequest {
        email: form.email.trim().to_string(),
        password: form.password.clone(),
    };
    match api.login(&req).await {
        Ok(resp) => {
            info!("Login succeeded for {}", req.email);
            Ok(resp)
        }
        Err(e) => {
            warn!("Login failed for {}: {}", req.email, e);
            Err(submit_error(&e, LOGIN_FAILED))
        }
    }
}

/// Register a new patient. Returns the confirmation text to show.
pub async fn signup(api: &dyn AuthApi, form: &SignupForm) -> Result<String, FieldErrors> {
    let errors = validate_signup(form);
    if !errors.is_empty() {
        return Err(errors);
    }

    let req = form.to_request();
    match api.signup(&req).await {
        Ok(resp) => {
            info!(
                "Signup succeeded for {} (patient id {:?})",
                req.email, resp.patient_id
            );
            if resp.message.trim().is_empty() {
                Ok(SIGNUP_DONE.to_string())
            } else {
                Ok(resp.message)
            }
        }
        Err(e) => {
            warn!("Signup failed for {}: {}", req.email, e);
            Err(submit_error(&e, SIGNUP_FAILED))
        }
    }
}
