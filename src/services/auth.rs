use actix_web::{FromRequest, HttpRequest, dev::Payload, web::Data};
use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::future::{Ready, ready};
use uuid::Uuid;

use crate::config::Config;
use crate::database::models::Role;
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // staff id
    pub role: Role,
    pub exp: usize, // expiration time
}

impl Claims {
    pub fn new(staff_id: Uuid, role: Role, valid_for: Duration) -> Self {
        Self {
            sub: staff_id,
            role,
            exp: (Utc::now() + valid_for).timestamp() as usize,
        }
    }

    /// Signs the claims with HS256.
    pub fn encode(&self, secret: &str) -> Result<String> {
        let token = encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_ref()),
        )?;
        Ok(token)
    }

    pub fn decode(token: &str, secret: &str) -> Result<Self> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_ref()),
            &Validation::new(Algorithm::HS256),
        )?;
        Ok(data.claims)
    }
}

/// The authenticated caller of a scheduling operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn staff(id: Uuid) -> Self {
        Self {
            id,
            role: Role::Staff,
        }
    }

    pub fn admin(id: Uuid) -> Self {
        Self {
            id,
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn requires_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(
                "Admin role required".to_string(),
            ))
        }
    }

    pub fn requires_staff(&self) -> Result<(), AppError> {
        if self.role == Role::Staff {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(
                "Staff role required".to_string(),
            ))
        }
    }

    /// Passes only when the actor is `owner_id`.
    pub fn requires_owner(&self, owner_id: Uuid) -> Result<(), AppError> {
        if self.id == owner_id {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(
                "Only the owner can modify this resource".to_string(),
            ))
        }
    }

    /// Passes when the actor is `owner_id` or an admin.
    pub fn requires_owner_or_admin(&self, owner_id: Uuid) -> Result<(), AppError> {
        if self.is_admin() {
            return Ok(());
        }
        self.requires_owner(owner_id)
    }
}

impl From<Claims> for Actor {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
        }
    }
}

impl FromRequest for Actor {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        let (Some(token), Some(config)) = (token, req.app_data::<Data<Config>>()) else {
            return ready(Err(AppError::Unauthorized));
        };

        match Claims::decode(token, &config.jwt_secret) {
            Ok(claims) => ready(Ok(claims.into())),
            Err(err) => {
                log::debug!("Rejected bearer token: {}", err);
                ready(Err(AppError::Unauthorized))
            }
        }
    }
}
