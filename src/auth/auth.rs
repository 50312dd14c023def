use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, http::header, web::Data};
use futures::future::{Ready, ready};

use crate::auth::jwt::{Claims, verify_token};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::model::role::Role;

/// Caller identity decoded from the bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: u64,
    pub email: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
    pub department_id: Option<u64>,
}

impl TryFrom<Claims> for AuthUser {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let role = Role::from_slug(&claims.role)
            .ok_or_else(|| AppError::Unauthorized(format!("Unknown role '{}'", claims.role)))?;

        Ok(AuthUser {
            user_id: claims.user_id,
            email: claims.sub,
            role,
            employee_id: claims.employee_id,
            department_id: claims.department_id,
        })
    }
}

/// Reads and verifies the `Authorization: Bearer` header of `req`.
pub fn authenticate(req: &HttpRequest) -> AppResult<AuthUser> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| AppError::Internal("App config missing".into()))?;

    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header encoding".into()))?;

    let token = header_value.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Unauthorized("Authorization header must start with Bearer".into())
    })?;

    let claims = verify_token(token, &config.jwt_secret, &config.jwt_issuer)
        .map_err(|e| AppError::Unauthorized(format!("Invalid or expired token: {e}")))?;

    AuthUser::try_from(claims)
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }
        ready(authenticate(req))
    }
}

impl AuthUser {
    pub fn require_role(&self, allowed: &[Role]) -> AppResult<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Role {} may not perform this action",
                self.role
            )))
        }
    }

    pub fn require_employee(&self) -> AppResult<u64> {
        self.employee_id
            .ok_or_else(|| AppError::Forbidden("No employee profile".into()))
    }

    pub fn require_department(&self) -> AppResult<u64> {
        self.department_id
            .ok_or_else(|| AppError::Forbidden("No organizational unit assigned".into()))
    }

    /// Chiefs, managers and admins may act on other people's planning.
    pub fn supervises(&self) -> bool {
        matches!(self.role, Role::Chief | Role::Manager | Role::Admin)
    }
}
