//! Pending OAuth logins kept in Redis between redirect and callback
//!
//! The CSRF state sent to the provider is the lookup key. Entries are taken
//! exactly once, so a replayed callback finds nothing.

use anyhow::Result;
use common::cache::RedisPool;
use resolution::models::ProviderKind;
use serde::{Deserialize, Serialize};

/// What the callback needs to finish a login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingLogin {
    pub provider: ProviderKind,
    pub pkce_verifier: String,
    /// Mobile deep link that receives the session instead of a JSON body
    pub redirect_uri: Option<String>,
}

#[derive(Clone)]
pub struct LoginStateStore {
    redis: RedisPool,
    ttl_seconds: u64,
}

impl LoginStateStore {
    pub fn new(redis: RedisPool, ttl_seconds: u64) -> Self {
        Self { redis, ttl_seconds }
    }

    pub async fn save(&self, csrf_state: &str, pending: &PendingLogin) -> Result<()> {
        self.redis
            .set_json(&state_key(csrf_state), pending, self.ttl_seconds)
            .await
    }

    pub async fn take(&self, csrf_state: &str) -> Result<Option<PendingLogin>> {
        self.redis.take_json(&state_key(csrf_state)).await
    }
}

fn state_key(csrf_state: &str) -> String {
    format!("oauth:state:{}", csrf_state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_login_round_trips_through_json() {
        let pending = PendingLogin {
            provider: ProviderKind::Google,
            pkce_verifier: "verifier".to_string(),
            redirect_uri: Some("wardrobe://auth".to_string()),
        };
        let json = serde_json::to_string(&pending).unwrap();
        assert!(json.contains(r#""provider":"google""#));
        assert_eq!(serde_json::from_str::<PendingLogin>(&json).unwrap(), pending);
    }

    #[test]
    fn state_keys_are_scoped() {
        assert_eq!(state_key("abc"), "oauth:state:abc");
    }
}
