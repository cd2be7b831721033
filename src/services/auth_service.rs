use crate::error::{AppError, AppResult};
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, User, UserResponse};
use crate::models::{ROLE_CUSTOMER, ROLE_DROPSHIPPER};
use crate::utils::{JwtService, hash_password, validate_password, verify_password};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    jwt_service: JwtService,
}

impl AuthService {
    pub fn new(pool: PgPool, jwt_service: JwtService) -> Self {
        Self { pool, jwt_service }
    }

    pub async fn register(&self, request: RegisterRequest) -> AppResult<AuthResponse> {
        let email = request.email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(AppError::ValidationError("Invalid email".to_string()));
        }
        validate_password(&request.password)?;

        let role = match request.role.as_deref() {
            None | Some(ROLE_CUSTOMER) => ROLE_CUSTOMER,
            Some(ROLE_DROPSHIPPER) => ROLE_DROPSHIPPER,
            Some(other) => {
                return Err(AppError::ValidationError(format!("Unknown role: {other}")));
            }
        };

        let password_hash = hash_password(&request.password)?;

        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, full_name, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, password_hash, full_name, role, created_at
            "#,
        )
        .bind(&email)
        .bind(&password_hash)
        .bind(request.full_name.trim())
        .bind(role)
        .fetch_one(&self.pool)
        .await;

        let user = match result {
            Ok(user) => user,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(AppError::ValidationError(
                    "Email is already registered".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        self.issue_tokens(user)
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        let email = request.email.trim().to_lowercase();

        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, full_name, role, created_at FROM users WHERE email = $1",
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::AuthError("Invalid email or password".to_string()))?;

        if !verify_password(&request.password, &user.password_hash)? {
            return Err(AppError::AuthError("Invalid email or password".to_string()));
        }

        self.issue_tokens(user)
    }

    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AuthResponse> {
        let claims = self.jwt_service.verify_refresh_token(refresh_token)?;
        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))?;

        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, full_name, role, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::AuthError("User no longer exists".to_string()))?;

        self.issue_tokens(user)
    }

    pub async fn get_user(&self, user_id: i64) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, full_name, role, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    fn issue_tokens(&self, user: User) -> AppResult<AuthResponse> {
        let access_token = self.jwt_service.generate_access_token(user.id, &user.role)?;
        let refresh_token = self.jwt_service.generate_refresh_token(user.id, &user.role)?;

        Ok(AuthResponse {
            access_token,
            refresh_token,
            expires_in: self.jwt_service.get_access_token_expires_in(),
            user: UserResponse::from(user),
        })
    }
}
