use crate::config;

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use base64::{URL_SAFE_NO_PAD, encode_config};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

const SESSION_TOKEN_BYTES: usize = 32;
const SALT_BYTES: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("failed to hash password: {0}")]
    Hash(argon2::password_hash::Error),
}

/// Builds and reads the session cookie.
#[derive(Debug, Clone)]
pub struct SessionCookies {
    cookie_name: String,
    ttl: time::Duration,
    secure: bool,
}

impl SessionCookies {
    pub fn from_config(config: &config::SessionConfig) -> Self {
        Self {
            cookie_name: config.cookie_name.clone(),
            ttl: config.ttl,
            secure: config.cookie_secure,
        }
    }

    pub fn session_cookie(&self, token: &str) -> String {
        let max_age = self.ttl.whole_seconds().max(0);
        let mut cookie = format!(
            "{}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}",
            self.cookie_name
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn clear_cookie(&self) -> String {
        let mut cookie = format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            self.cookie_name
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn session_token<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        for header in headers.get_all(COOKIE).iter() {
            if let Ok(raw) = header.to_str()
                && let Some(value) = cookie_from_header(raw, &self.cookie_name)
                && !value.is_empty()
            {
                return Some(value);
            }
        }
        None
    }
}

fn cookie_from_header<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    for part in header.split(';') {
        let trimmed = part.trim();
        if let Some((cookie_name, cookie_value)) = trimmed.split_once('=')
            && cookie_name == name
        {
            return Some(cookie_value);
        }
    }
    None
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let mut salt_bytes = [0u8; SALT_BYTES];
    OsRng.fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(AuthError::Hash)?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(AuthError::Hash)?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let hash = match PasswordHash::new(password_hash) {
        Ok(hash) => hash,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .is_ok()
}

pub fn generate_session_token() -> String {
    let mut rng = OsRng;
    generate_session_token_with_rng(&mut rng)
}

pub(crate) fn generate_session_token_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rng.fill_bytes(&mut bytes);
    encode_config(bytes, URL_SAFE_NO_PAD)
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    struct ZeroRng;

    impl RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for value in dest.iter_mut() {
                *value = 0;
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    impl CryptoRng for ZeroRng {}

    fn cookies(secure: bool) -> SessionCookies {
        SessionCookies::from_config(&config::SessionConfig {
            cookie_name: "sessionId".to_string(),
            cookie_secure: secure,
            ttl: time::Duration::hours(1),
        })
    }

    #[test]
    fn generate_session_token_with_rng__should_match_fixture() {
        // Given
        let mut rng = ZeroRng;

        // When
        let token = generate_session_token_with_rng(&mut rng);

        // Then
        assert_eq!(token, "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA");
    }

    #[test]
    fn generate_session_token__should_not_repeat() {
        assert_ne!(generate_session_token(), generate_session_token());
    }

    #[test]
    fn verify_password__should_accept_only_matching_password() {
        // Given
        let hash = hash_password("secret").expect("hash password");

        // Then
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("secret", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("secret", "not-a-phc-string"));
    }

    #[test]
    fn session_cookie__should_carry_token_and_flags() {
        // When
        let cookie = cookies(true).session_cookie("abc");

        // Then
        assert_eq!(
            cookie,
            "sessionId=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600; Secure"
        );
    }

    #[test]
    fn clear_cookie__should_expire_immediately() {
        assert_eq!(
            cookies(false).clear_cookie(),
            "sessionId=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
        );
    }

    #[test]
    fn session_token__should_find_named_cookie_among_others() {
        // Given
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(COOKIE, HeaderValue::from_static("a=1; sessionId=tok; b=2"));

        // When
        let token = cookies(false).session_token(&headers);

        // Then
        assert_eq!(token, Some("tok"));
    }

    #[test]
    fn session_token__should_ignore_empty_cookie() {
        // Given
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("sessionId="));

        // Then
        assert!(cookies(false).session_token(&headers).is_none());
    }
}
