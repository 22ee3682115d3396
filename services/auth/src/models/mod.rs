//! Authentication service models

pub mod auth;

// Re-export for convenience
pub use auth::{
    AuthResponse, LoginRequest, MobilePayload, OAuthCallbackQuery, OAuthLoginQuery,
    ProviderTokenRequest, RegisterRequest,
};
