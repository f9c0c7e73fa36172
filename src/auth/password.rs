use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a password using Argon2id (19MB memory, 2 iterations, parallelism 1).
pub fn hash(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let params = Params::new(19 * 1024, 2, 1, None).map_err(|e| format!("Invalid params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| format!("Hashing failed: {e}"))
}

/// Verify a password against a stored hash. A missing hash never verifies.
pub fn verify(password: &str, hash: Option<&str>) -> Result<bool, String> {
    let Some(hash) = hash else {
        return Ok(false);
    };
    let parsed = PasswordHash::new(hash).map_err(|e| format!("Invalid hash: {e}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Checks a new password pair the way the registration and reset forms do.
pub fn validate_new(password1: &str, password2: &str) -> Result<(), String> {
    if password1 != password2 {
        return Err("The two password fields didn't match.".to_string());
    }
    if password1.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        ));
    }
    if password1.chars().all(|c| c.is_ascii_digit()) {
        return Err("This password is entirely numeric.".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hashed = hash("correct horse").unwrap();
        assert!(verify("correct horse", Some(&hashed)).unwrap());
        assert!(!verify("wrong horse", Some(&hashed)).unwrap());
    }

    #[test]
    fn unusable_password_never_verifies() {
        assert!(!verify("anything", None).unwrap());
    }

    #[test]
    fn validate_new_rules() {
        assert!(validate_new("password123", "password123").is_ok());
        assert!(validate_new("password123", "password124").is_err());
        assert!(validate_new("short", "short").is_err());
        assert!(validate_new("12345678", "12345678").is_err());
    }
}
