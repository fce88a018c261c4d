use sha2::{Digest, Sha256};

/// Checks a username/password pair against configured secrets.
pub trait CredentialVerifier {
    fn verify(&self, username: &str, password: &str) -> Result<(), LoginError>;
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LoginError {
    #[error("Invalid username or password")]
    InvalidCredentials,
}

/// Stores only SHA-256 digests of the configured secrets.
pub struct HashedCredentials {
    username_hash: [u8; 32],
    password_hash: [u8; 32],
}

impl HashedCredentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username_hash: digest(username),
            password_hash: digest(password),
        }
    }
}

impl CredentialVerifier for HashedCredentials {
    fn verify(&self, username: &str, password: &str) -> Result<(), LoginError> {
        // Both halves are always compared
        let user_ok = constant_time_eq(&digest(username), &self.username_hash);
        let pass_ok = constant_time_eq(&digest(password), &self.password_hash);

        if user_ok & pass_ok {
            Ok(())
        } else {
            Err(LoginError::InvalidCredentials)
        }
    }
}

fn digest(value: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_matching_pair() {
        let creds = HashedCredentials::new("zezima", "hunter2");
        assert_eq!(creds.verify("zezima", "hunter2"), Ok(()));
    }

    #[test]
    fn test_rejects_wrong_password_or_user_identically() {
        let creds = HashedCredentials::new("zezima", "hunter2");
        let wrong_pass = creds.verify("zezima", "hunter3");
        let wrong_user = creds.verify("durial321", "hunter2");

        assert_eq!(wrong_pass, Err(LoginError::InvalidCredentials));
        assert_eq!(wrong_user, wrong_pass);
    }

    #[test]
    fn test_exact_match_only() {
        let creds = HashedCredentials::new("zezima", "hunter2");
        assert!(creds.verify("Zezima", "hunter2").is_err());
        assert!(creds.verify("zezima ", "hunter2").is_err());
        assert!(creds.verify("", "").is_err());
    }

    #[test]
    fn test_constant_time_eq() {
        let a = digest("a");
        let b = digest("b");
        assert!(constant_time_eq(&a, &a));
        assert!(!constant_time_eq(&a, &b));
    }
}
