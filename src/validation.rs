/// Credential input validation
///
/// Pure, total checks applied before any network call is made.

/// Validate email format.
///
/// True iff the trimmed input contains no whitespace, exactly one `@` with a
/// non-empty local part, and a `.` strictly inside the domain part.
pub fn validate_email(email: &str) -> bool {
    let trimmed = email.trim();

    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = trimmed.split_once('@') else {
        return false;
    };

    // A second `@` would land in the domain part
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    // The dot needs at least one character on each side
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Validate password (min 6 chars, must contain letters and numbers)
pub fn validate_password(password: &str) -> bool {
    if password.chars().count() < 6 {
        return false;
    }
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    has_letter && has_digit
}
