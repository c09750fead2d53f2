use actix_web::{dev::Payload, Error, FromRequest, HttpRequest, HttpResponse};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use std::future::{ready, Ready};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// user id, e.g. "user-123"
    pub sub: String,
    pub username: String,
    pub exp: usize,
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("JWT_SECRET not set")]
    MissingSecret,
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

fn secret() -> Result<String, AuthError> {
    env::var("JWT_SECRET").map_err(|_| AuthError::MissingSecret)
}

/// Validate a JWT and return its claims.
fn decode_jwt(token: &str) -> Result<Claims, AuthError> {
    let secret = secret()?;
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?;
    Ok(data.claims)
}

fn unauthorized(message: &'static str) -> Error {
    let body = serde_json::json!({ "error": "Unauthorized", "message": message });
    actix_web::error::InternalError::from_response(message, HttpResponse::Unauthorized().json(body)).into()
}

/// Extractor yielding validated `Claims`.
pub struct Auth(pub Claims);

impl Auth {
    pub fn user_id(&self) -> &str {
        &self.0.sub
    }

    pub fn username(&self) -> &str {
        &self.0.username
    }
}

impl FromRequest for Auth {
    type Error = Error;
    type Future = Ready<Result<Self, Error>>;

    fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
        // Delegate to BearerAuth to parse the header.
        let Ok(bearer) = BearerAuth::from_request(req, pl).into_inner() else {
            return ready(Err(unauthorized("Missing authentication")));
        };
        match decode_jwt(bearer.token()) {
            Ok(claims) => ready(Ok(Auth(claims))),
            Err(AuthError::MissingSecret) => {
                tracing::error!("JWT_SECRET not configured; rejecting authenticated request");
                ready(Err(actix_web::error::ErrorInternalServerError("authentication unavailable")))
            }
            Err(_) => ready(Err(unauthorized("Invalid token"))),
        }
    }
}

/// Issue an access token. Production tokens come from the external
/// authentication service sharing `JWT_SECRET`; this is for operators and tests.
pub fn create_jwt(user_id: &str, username: &str) -> Result<String, AuthError> {
    let secret = secret()?;
    let expiration = (chrono::Utc::now() + chrono::Duration::hours(24)).timestamp() as usize;
    let claims = Claims { sub: user_id.to_string(), username: username.to_string(), exp: expiration };
    Ok(encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))?)
}
