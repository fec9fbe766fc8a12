/// Auth rejection message mapping
///
/// The platform reports sign-in failures as free-form message strings. This
/// module folds them into a fixed set of user-facing categories with a
/// deterministic, case-insensitive, ordered substring match. Unrecognized
/// messages fall back to one generic category.

/// User-facing categories for auth rejections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCategory {
    InvalidCredentials,
    EmailNotConfirmed,
    RateLimited,
    OtpExpired,
    OtpInvalid,
    NetworkError,
    AuthFailed,
}

/// Known platform phrases, checked in order; the first match wins
const MESSAGE_RULES: &[(&[&str], AuthErrorCategory)] = &[
    (
        &["invalid login credentials", "invalid_credentials"],
        AuthErrorCategory::InvalidCredentials,
    ),
    (&["email not confirmed"], AuthErrorCategory::EmailNotConfirmed),
    (
        &["rate limit", "too many requests"],
        AuthErrorCategory::RateLimited,
    ),
    (
        &["token has expired", "otp_expired"],
        AuthErrorCategory::OtpExpired,
    ),
    (
        &["invalid token", "invalid otp", "otp"],
        AuthErrorCategory::OtpInvalid,
    ),
    (
        &["network", "fetch", "connection"],
        AuthErrorCategory::NetworkError,
    ),
];

/// Categorize a raw platform rejection message
pub fn categorize_auth_message(raw: &str) -> AuthErrorCategory {
    let lowered = raw.to_lowercase();

    for (needles, category) in MESSAGE_RULES {
        if needles.iter().any(|needle| lowered.contains(needle)) {
            return *category;
        }
    }

    AuthErrorCategory::AuthFailed
}

impl AuthErrorCategory {
    /// Stable machine-readable code for the category
    pub fn code(self) -> &'static str {
        match self {
            AuthErrorCategory::InvalidCredentials => "invalid_credentials",
            AuthErrorCategory::EmailNotConfirmed => "email_not_confirmed",
            AuthErrorCategory::RateLimited => "rate_limited",
            AuthErrorCategory::OtpExpired => "otp_expired",
            AuthErrorCategory::OtpInvalid => "otp_invalid",
            AuthErrorCategory::NetworkError => "network_error",
            AuthErrorCategory::AuthFailed => "auth_failed",
        }
    }

    /// Message shown to the user
    pub fn user_message(self) -> &'static str {
        match self {
            AuthErrorCategory::InvalidCredentials => "Invalid email or password",
            AuthErrorCategory::EmailNotConfirmed => "Please verify your email address",
            AuthErrorCategory::RateLimited => "Too many attempts. Please wait and try again",
            AuthErrorCategory::OtpExpired => "The code has expired. Request a new one",
            AuthErrorCategory::OtpInvalid => "The code is incorrect",
            AuthErrorCategory::NetworkError => "Network error. Please check your connection",
            AuthErrorCategory::AuthFailed => "Authentication failed. Please try again",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_invalid_credentials() {
        assert_eq!(
            categorize_auth_message("Invalid login credentials"),
            AuthErrorCategory::InvalidCredentials
        );
        assert_eq!(
            categorize_auth_message("error: invalid_credentials"),
            AuthErrorCategory::InvalidCredentials
        );
    }

    #[test]
    fn maps_unconfirmed_email() {
        assert_eq!(
            categorize_auth_message("Email not confirmed"),
            AuthErrorCategory::EmailNotConfirmed
        );
    }

    #[test]
    fn maps_rate_limits() {
        assert_eq!(
            categorize_auth_message("For security purposes, rate limit reached"),
            AuthErrorCategory::RateLimited
        );
        assert_eq!(
            categorize_auth_message("Too Many Requests"),
            AuthErrorCategory::RateLimited
        );
    }

    #[test]
    fn maps_otp_expiry_before_otp_invalid() {
        // Platform phrasing mentions both expiry and invalidity; expiry wins
        assert_eq!(
            categorize_auth_message("Token has expired or is invalid"),
            AuthErrorCategory::OtpExpired
        );
        assert_eq!(
            categorize_auth_message("otp_expired"),
            AuthErrorCategory::OtpExpired
        );
    }

    #[test]
    fn maps_invalid_otp() {
        assert_eq!(
            categorize_auth_message("Invalid token"),
            AuthErrorCategory::OtpInvalid
        );
        assert_eq!(
            categorize_auth_message("Invalid OTP"),
            AuthErrorCategory::OtpInvalid
        );
    }

    #[test]
    fn maps_network_failures() {
        assert_eq!(
            categorize_auth_message("Network request failed"),
            AuthErrorCategory::NetworkError
        );
        assert_eq!(
            categorize_auth_message("failed to fetch"),
            AuthErrorCategory::NetworkError
        );
        assert_eq!(
            categorize_auth_message("Connection refused"),
            AuthErrorCategory::NetworkError
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(
            categorize_auth_message("INVALID LOGIN CREDENTIALS"),
            AuthErrorCategory::InvalidCredentials
        );
    }

    #[test]
    fn unknown_messages_fall_back_to_generic() {
        assert_eq!(
            categorize_auth_message("something novel happened"),
            AuthErrorCategory::AuthFailed
        );
        assert_eq!(categorize_auth_message(""), AuthErrorCategory::AuthFailed);
    }

    #[test]
    fn every_category_has_code_and_message() {
        let all = [
            AuthErrorCategory::InvalidCredentials,
            AuthErrorCategory::EmailNotConfirmed,
            AuthErrorCategory::RateLimited,
            AuthErrorCategory::OtpExpired,
            AuthErrorCategory::OtpInvalid,
            AuthErrorCategory::NetworkError,
            AuthErrorCategory::AuthFailed,
        ];
        for category in all {
            assert!(!category.code().is_empty());
            assert!(!category.user_message().is_empty());
        }
    }
}
