//! Local input checks. Failures become [`ClientError::Validation`] and never
//! reach the network.

use super::ClientError;
use crate::models::{CreateIdeaInput, SignupInput};

const PASSWORD_MIN_LENGTH: usize = 8;
const PASSWORD_SPECIALS: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?";
const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "123456", "12345678", "123456789", "qwerty", "abc123",
    "letmein", "welcome", "admin", "monkey", "master", "dragon", "login", "princess",
    "football", "shadow", "sunshine", "trustno1", "iloveyou",
];

const DESCRIPTION_MIN_CHARS: usize = 20;
const DESCRIPTION_MAX_CHARS: usize = 5000;
const DESCRIPTION_MIN_WORDS: usize = 5;
const QUESTION_MIN_CHARS: usize = 3;
const QUESTION_MAX_CHARS: usize = 1000;

pub fn username(username: &str) -> Result<(), ClientError> {
    let len = username.chars().count();
    let allowed = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if (3..=20).contains(&len) && allowed {
        Ok(())
    } else {
        Err(ClientError::validation(
            "Username must be 3-20 characters and contain only letters, numbers, or underscores.",
        ))
    }
}

pub fn password(password: &str) -> Result<(), ClientError> {
    let mut missing = Vec::new();
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        missing.push(format!("at least {} characters", PASSWORD_MIN_LENGTH));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        missing.push("one uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        missing.push("one lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        missing.push("one number".to_string());
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        missing.push("one special character".to_string());
    }

    // The alphabetic core catches "Password1!" style variations.
    let lower = password.to_lowercase();
    let alpha: String = lower.chars().filter(|c| c.is_ascii_lowercase()).collect();
    if COMMON_PASSWORDS.contains(&lower.as_str()) || COMMON_PASSWORDS.contains(&alpha.as_str()) {
        missing.push("not be a common password".to_string());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ClientError::validation(format!(
            "Password must contain {}.",
            missing.join(", ")
        )))
    }
}

pub fn signup(input: &SignupInput) -> Result<(), ClientError> {
    if !input.email.contains('@') {
        return Err(ClientError::validation("Enter a valid email address."));
    }
    username(&input.username)?;
    password(&input.password)
}

pub fn idea(input: &CreateIdeaInput) -> Result<(), ClientError> {
    let required = [
        ("Startup name", &input.startup_name),
        ("Industry", &input.industry),
        ("Geography", &input.geography),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(ClientError::validation(format!("{} is required.", field)));
        }
    }

    let description = input.one_line_description.trim();
    let chars = description.chars().count();
    if !(DESCRIPTION_MIN_CHARS..=DESCRIPTION_MAX_CHARS).contains(&chars) {
        return Err(ClientError::validation(format!(
            "Business description must be between {} and {} characters.",
            DESCRIPTION_MIN_CHARS, DESCRIPTION_MAX_CHARS
        )));
    }
    if description.split_whitespace().count() < DESCRIPTION_MIN_WORDS {
        return Err(ClientError::validation(
            "Business description must be detailed (at least 5 words). \
             Explain the problem, solution, and target users.",
        ));
    }
    Ok(())
}

pub fn question(question: &str) -> Result<(), ClientError> {
    let len = question.trim().chars().count();
    if (QUESTION_MIN_CHARS..=QUESTION_MAX_CHARS).contains(&len) {
        Ok(())
    } else {
        Err(ClientError::validation(format!(
            "Question must be between {} and {} characters.",
            QUESTION_MIN_CHARS, QUESTION_MAX_CHARS
        )))
    }
}
