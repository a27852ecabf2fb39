// common/src/utils.rs
use chrono::Utc;
use jsonwebtoken::{encode, decode, Header, Algorithm, Validation, EncodingKey, DecodingKey};
use serde::{Serialize, Deserialize};
use tracing_subscriber::EnvFilter;

pub use jsonwebtoken::errors::Error as JwtError;

pub const TOKEN_LIFETIME_SECS: i64 = 86400;

/// Setup tracing for consistent logging; `RUST_LOG` overrides the default level
pub fn setup_tracing() {
    setup_tracing_with_writer(std::io::stderr);
}

/// Same as [`setup_tracing`] but logs go to `writer` (the terminal owns stdout)
pub fn setup_tracing_with_writer<W>(writer: W)
where
    W: for<'a> tracing_subscriber::fmt::MakeWriter<'a> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(writer)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

// JWT Claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,       // user id
    pub exp: usize,        // expiration time
    pub iat: usize,        // issued at time
}

/// Mint an HS256 bearer token for `user_id`, returning it with its expiry (unix seconds)
pub fn generate_jwt_token(user_id: &str, secret: &[u8]) -> Result<(String, i64), jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let exp = now + TOKEN_LIFETIME_SECS;

    let claims = JwtClaims {
        sub: user_id.to_string(),
        iat: now as usize,
        exp: exp as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret)
    )?;
    Ok((token, exp))
}

/// Validate a token and return its subject
pub fn validate_jwt_token(token: &str, secret: &[u8]) -> Result<String, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret),
        &validation
    )?;

    if token_data.claims.sub.is_empty() {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into());
    }

    Ok(token_data.claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_roundtrip_subject() {
        let (token, exp) = generate_jwt_token("user-42", b"secret").unwrap();
        assert!(exp > Utc::now().timestamp());
        assert_eq!(validate_jwt_token(&token, b"secret").unwrap(), "user-42");
    }

    #[test]
    fn test_jwt_wrong_secret_rejected() {
        let (token, _) = generate_jwt_token("user-42", b"secret").unwrap();
        assert!(validate_jwt_token(&token, b"other").is_err());
    }

    #[test]
    fn test_jwt_empty_subject_rejected() {
        let (token, _) = generate_jwt_token("", b"secret").unwrap();
        assert!(validate_jwt_token(&token, b"secret").is_err());
    }
}
