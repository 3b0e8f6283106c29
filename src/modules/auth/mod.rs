pub mod extract;
pub mod models;
pub mod password;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{extract::State, Json, Router};
use serde_json::{json, Value};
use shelf_http::error::AppError;
use shelf_kernel::{InitCtx, Module};
use shelf_store::StoreError;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use shelf_collection::{AuthResponse, User};

use crate::state::AppState;
use crate::utils::store_error;
use models::{LoginRequest, RegisterRequest, UserDoc};

pub use extract::AuthUser;

/// Identity module: account registration, login, and session validation for
/// every other module's routes.
pub struct AuthModule {
    state: AppState,
}

impl AuthModule {
    pub const fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for AuthModule {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            session_ttl_minutes = ctx.settings.auth.session_ttl_minutes,
            "auth module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/register", post(register))
            .route("/login", post(login))
            .route("/me", get(me))
            .with_state(self.state.clone())
    }

    fn collections(&self) -> Vec<&'static str> {
        vec!["users", "sessions"]
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/register": {
                    "post": {
                        "summary": "Register a new account",
                        "tags": ["Auth"],
                        "responses": {
                            "201": {
                                "description": "Account created",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/AuthResponse" }
                                    }
                                }
                            },
                            "400": {
                                "description": "Validation error",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/login": {
                    "post": {
                        "summary": "Log in with email and password",
                        "tags": ["Auth"],
                        "responses": {
                            "200": {
                                "description": "Authenticated",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/AuthResponse" }
                                    }
                                }
                            },
                            "401": {
                                "description": "Bad credentials",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/me": {
                    "get": {
                        "summary": "Current user for the presented token",
                        "tags": ["Auth"],
                        "responses": {
                            "200": {
                                "description": "Current user",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/User" }
                                    }
                                }
                            },
                            "401": {
                                "description": "Missing or invalid token",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "User": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "email": { "type": "string", "format": "email" },
                            "name": { "type": "string" }
                        },
                        "required": ["id", "email", "name"]
                    },
                    "AuthResponse": {
                        "type": "object",
                        "properties": {
                            "user": { "$ref": "#/components/schemas/User" },
                            "token": { "type": "string" }
                        },
                        "required": ["user", "token"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "auth module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "auth module stopped");
        Ok(())
    }
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_lowercase();

    let mut details = Vec::new();
    if name.is_empty() {
        details.push(json!({"field": "name", "error": "required"}));
    }
    if !email.contains('@') {
        details.push(json!({"field": "email", "error": "must be a valid email address"}));
    }
    if req.password.chars().count() < state.min_password_len {
        details.push(json!({
            "field": "password",
            "error": format!("must be at least {} characters", state.min_password_len)
        }));
    }
    if !details.is_empty() {
        return Err(AppError::validation(details, "registration payload is invalid"));
    }

    let users = state.store.collection("users").map_err(store_error)?;
    let body = serde_json::to_value(UserDoc {
        name,
        email,
        password: password::hash_password(&req.password),
    })
    .map_err(|err| AppError::Internal(anyhow::Error::new(err)))?;

    let doc = match users.insert_unique("email", body) {
        Ok(doc) => doc,
        Err(StoreError::Conflict(_)) => {
            return Err(AppError::validation(
                vec![json!({"field": "email", "error": "already registered"})],
                "email is already registered",
            ));
        }
        Err(other) => return Err(store_error(other)),
    };

    let user = models::user_from_doc(&doc)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("corrupt user document")))?;
    let token = create_session(&state, &doc.id)?;

    tracing::info!(user_id = %doc.id, "account registered");
    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = req.email.trim().to_lowercase();

    let users = state.store.collection("users").map_err(store_error)?;
    let doc = users
        .find_one(|body| body.get("email").and_then(Value::as_str) == Some(email.as_str()))
        .map_err(store_error)?;

    // Same error for unknown email and bad password.
    let doc = doc.ok_or_else(|| AppError::unauthorized("invalid email or password"))?;
    let stored = doc
        .body
        .get("password")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if !password::verify_password(&req.password, stored) {
        return Err(AppError::unauthorized("invalid email or password"));
    }

    let user = models::user_from_doc(&doc)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("corrupt user document")))?;
    let token = create_session(&state, &doc.id)?;

    tracing::info!(user_id = %doc.id, "login succeeded");
    Ok(Json(AuthResponse { user, token }))
}

async fn me(user: AuthUser) -> Json<User> {
    Json(User {
        id: user.id,
        email: user.email,
        name: user.name,
    })
}

/// Mint an opaque session token with the configured TTL.
fn create_session(state: &AppState, user_id: &str) -> Result<String, AppError> {
    let sessions = state.store.collection("sessions").map_err(store_error)?;
    let token = Uuid::now_v7().to_string();
    let expires_at = OffsetDateTime::now_utc()
        + Duration::minutes(state.session_ttl_minutes as i64);
    let expires_at = expires_at
        .format(&Rfc3339)
        .map_err(|err| AppError::Internal(anyhow::Error::new(err)))?;

    sessions
        .insert(json!({
            "token": token,
            "userId": user_id,
            "expiresAt": expires_at,
        }))
        .map_err(store_error)?;

    Ok(token)
}

/// Create a new instance of the auth module
pub fn create_module(state: AppState) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(AuthModule::new(state))
}
