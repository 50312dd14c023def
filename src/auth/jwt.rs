use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error,
    get_current_timestamp,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access-token payload shared with the account backend that issues tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    /// Account email.
    pub sub: String,
    /// Role slug; legacy aliases are accepted.
    pub role: String,
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
    pub department_id: Option<u64>,
    pub exp: u64,
    pub iss: String,
    pub jti: String,
}

impl Claims {
    pub fn new(
        user_id: u64,
        email: impl Into<String>,
        role: impl Into<String>,
        employee_id: Option<u64>,
        department_id: Option<u64>,
        issuer: impl Into<String>,
        ttl_secs: u64,
    ) -> Self {
        Self {
            user_id,
            sub: email.into(),
            role: role.into(),
            employee_id,
            department_id,
            exp: get_current_timestamp() + ttl_secs,
            iss: issuer.into(),
            jti: Uuid::new_v4().to_string(),
        }
    }
}

pub fn issue_token(claims: &Claims, secret: &str) -> Result<String, Error> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, secret: &str, issuer: &str) -> Result<Claims, Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn claims(issuer: &str, ttl: u64) -> Claims {
        Claims::new(7, "ana@cih.hn", "jefe", Some(70), Some(3), issuer, ttl)
    }

    #[test]
    fn verifies_own_tokens() {
        let original = claims("cih-backend", 600);
        let token = issue_token(&original, SECRET).unwrap();
        let decoded = verify_token(&token, SECRET, "cih-backend").unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn rejects_wrong_issuer_and_secret() {
        let token = issue_token(&claims("someone-else", 600), SECRET).unwrap();
        assert!(verify_token(&token, SECRET, "cih-backend").is_err());

        let token = issue_token(&claims("cih-backend", 600), SECRET).unwrap();
        assert!(verify_token(&token, "other-secret", "cih-backend").is_err());
    }

    #[test]
    fn rejects_expired_tokens() {
        let mut expired = claims("cih-backend", 0);
        expired.exp = get_current_timestamp() - 3600;
        let token = issue_token(&expired, SECRET).unwrap();
        assert!(verify_token(&token, SECRET, "cih-backend").is_err());
    }
}
