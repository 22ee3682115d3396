//! Input validation utilities

use oauth2::url::Url;
use regex::Regex;
use std::sync::OnceLock;

use crate::models::RegisterRequest;

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.len() < 3 {
        return Err("Username must be at least 3 characters long".to_string());
    }

    if username.len() > 32 {
        return Err("Username must be at most 32 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_.-]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err(
            "Username can only contain letters, numbers, dots, dashes and underscores".to_string(),
        );
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password: 8 to 128 characters with upper, lower and digit
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !has_upper {
        return Err("Password must contain at least one uppercase letter".to_string());
    }

    if !has_lower {
        return Err("Password must contain at least one lowercase letter".to_string());
    }

    if !has_digit {
        return Err("Password must contain at least one digit".to_string());
    }

    Ok(())
}

/// Validate every field of a registration request
pub fn validate_registration(request: &RegisterRequest) -> Result<(), String> {
    validate_username(request.username.trim())?;
    validate_email(request.email.trim())?;
    validate_password(&request.password)?;

    if request.first_name.len() > 100 || request.last_name.len() > 100 {
        return Err("Names must be at most 100 characters long".to_string());
    }

    Ok(())
}

/// Validate a mobile redirect target
///
/// App deep links use custom schemes, so any scheme is accepted except the
/// ones a browser would execute or read locally.
pub fn validate_redirect_uri(redirect_uri: &str) -> Result<Url, String> {
    let url = Url::parse(redirect_uri.trim()).map_err(|_| "Invalid redirect_uri".to_string())?;

    match url.scheme() {
        "javascript" | "data" | "file" | "vbscript" | "blob" => {
            Err("redirect_uri scheme is not allowed".to_string())
        }
        _ => Ok(url),
    }
}
