/// Checks that a username only uses letters, digits, underscores and hyphens.
///
/// Length is enforced separately by the `length` rule on the field.
///
/// # Arguments
///
/// * `username` - The username to validate.
///
/// # Returns
///
/// A `garde::Result` indicating whether the username is valid.
pub fn validate_username(username: &str, _context: &()) -> garde::Result {
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(garde::Error::new(
            "can only contain letters, numbers, underscores, and hyphens",
        ));
    }

    Ok(())
}

/// Rejects passwords that are only whitespace.
///
/// # Arguments
///
/// * `password` - The password to validate.
///
/// # Returns
///
/// A `garde::Result` indicating whether the password is acceptable.
pub fn validate_password(password: &str, _context: &()) -> garde::Result {
    if password.trim().is_empty() {
        return Err(garde::Error::new("cannot be blank"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_are_restricted_to_a_safe_charset() {
        assert!(validate_username("alice_01-x", &()).is_ok());
        assert!(validate_username("alice smith", &()).is_err());
        assert!(validate_username("al!ce", &()).is_err());
        assert!(validate_username("ålice", &()).is_err());
    }

    #[test]
    fn blank_passwords_are_rejected() {
        assert!(validate_password("        ", &()).is_err());
        assert!(validate_password("hunter22", &()).is_ok());
    }
}
