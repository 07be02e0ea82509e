use std::collections::HashMap;

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::error::{AuthError, Result};
use crate::user::AuthUser;
use crate::verifier::IdentityVerifier;

const GOOGLE_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Verifies Google ID tokens against Google's published JWKS.
///
/// Signing keys are cached; an unknown `kid` triggers one refresh before the
/// token is rejected (Google rotates keys every few days).
pub struct GoogleVerifier {
    http_client: reqwest::Client,
    client_id: String,
    certs_url: String,
    keys: RwLock<HashMap<String, DecodingKey>>,
    allowed_emails: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

/// Claims we care about from a Google ID token. Signature, expiry, issuer
/// and audience are all checked by jsonwebtoken before these are read.
#[derive(Debug, Deserialize)]
struct GoogleClaims {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
    email_verified: Option<bool>,
}

impl GoogleVerifier {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            client_id: client_id.into(),
            certs_url: GOOGLE_CERTS_URL.to_string(),
            keys: RwLock::new(HashMap::new()),
            allowed_emails: None,
        }
    }

    /// Restrict sign-in to an allow-list of emails. `None` means
    /// unrestricted.
    pub fn with_allowed_emails(mut self, emails: Option<Vec<String>>) -> Self {
        self.allowed_emails = emails;
        self
    }

    /// Override the JWKS endpoint (test servers)
    pub fn with_certs_url(mut self, url: impl Into<String>) -> Self {
        self.certs_url = url.into();
        self
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey> {
        if let Some(key) = self.keys.read().await.get(kid) {
            return Ok(key.clone());
        }

        self.refresh_keys().await?;

        self.keys
            .read()
            .await
            .get(kid)
            .cloned()
            .ok_or_else(|| AuthError::InvalidToken(format!("unknown signing key: {}", kid)))
    }

    async fn refresh_keys(&self) -> Result<()> {
        let response = self
            .http_client
            .get(&self.certs_url)
            .send()
            .await
            .map_err(|e| AuthError::Keys(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Keys(format!(
                "JWKS endpoint returned {}",
                response.status()
            )));
        }

        let jwks: JwksResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Keys(e.to_string()))?;

        let mut keys = self.keys.write().await;
        keys.clear();
        for jwk in jwks.keys {
            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => {
                    keys.insert(jwk.kid, key);
                }
                Err(e) => {
                    tracing::warn!(kid = %jwk.kid, "Skipping malformed JWK: {}", e);
                }
            }
        }

        Ok(())
    }

    fn user_from_claims(&self, claims: GoogleClaims) -> Result<AuthUser> {
        let email = claims.email.ok_or(AuthError::MissingClaim("email"))?;
        let name = claims.name.ok_or(AuthError::MissingClaim("name"))?;

        if let Some(allowed) = &self.allowed_emails {
            if !allowed.iter().any(|a| a == &email) {
                return Err(AuthError::Forbidden(email));
            }
        }

        Ok(AuthUser {
            id: claims.sub,
            email,
            name,
            picture: claims.picture,
            verified_email: claims.email_verified.unwrap_or(false),
        })
    }
}

#[async_trait]
impl IdentityVerifier for GoogleVerifier {
    async fn verify(&self, credential: &str) -> Result<AuthUser> {
        let header =
            decode_header(credential).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token has no key id".to_string()))?;

        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.client_id]);
        validation.set_issuer(&GOOGLE_ISSUERS);

        let token = decode::<GoogleClaims>(credential, &key, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        self.user_from_claims(token.claims)
    }
}
