use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};

use crate::error::ProximityError;

/// Claims carried by session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub id: String,
    pub exp: usize,
}

/// HS256 bearer token verification
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ProximityError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => ProximityError::Unauthorized("Token expired".to_string()),
                _ => ProximityError::Unauthorized("Invalid token".to_string()),
            })
    }
}

/// The user making the request, resolved from `Authorization: Bearer <jwt>`
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: String,
}

impl AuthenticatedUser {
    fn from_request_sync(req: &HttpRequest) -> Result<Self, ProximityError> {
        let verifier = req
            .app_data::<web::Data<JwtVerifier>>()
            .ok_or_else(|| ProximityError::Unauthorized("authentication not configured".to_string()))?;

        let token = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ProximityError::Unauthorized("No token provided".to_string()))?;

        let claims = verifier.verify(token)?;
        Ok(Self { id: claims.id })
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ProximityError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = Self::from_request_sync(req);
        if let Err(e) = &result {
            tracing::info!("Rejected request to {}: {}", req.path(), e);
        }
        ready(result)
    }
}
