//! Identity resolver: normalized candidates to canonical entities
//!
//! Users are matched by email and enriched in place; garments are always
//! inserted and rely on the store's uniqueness rules.

use rand::distributions::Alphanumeric;
use rand::{Rng, thread_rng};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ResolutionError, ResolutionResult};
use crate::models::{Garment, NewGarment, NewUser, ProviderKind, User};
use crate::ports::{CredentialHasher, GarmentStore, UserStore};

/// Length of the throwaway secret given to provider-created accounts
const RANDOM_SECRET_LEN: usize = 32;

/// A resolved user and whether this call created it
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedUser {
    pub user: User,
    pub created: bool,
}

#[derive(Clone)]
pub struct UserResolver {
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn CredentialHasher>,
}

impl UserResolver {
    pub fn new(users: Arc<dyn UserStore>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { users, hasher }
    }

    /// Find or create the user behind a provider-normalized candidate
    ///
    /// Idempotent per (email, provider): a repeated call with the same
    /// candidate returns the same user with `created = false` and writes
    /// nothing. Concurrent first sign-ins converge on one row: the call that
    /// loses the insert re-reads by email and links into the winner.
    pub async fn resolve_user(
        &self,
        kind: ProviderKind,
        mut candidate: NewUser,
    ) -> ResolutionResult<ResolvedUser> {
        let external_id = candidate.providers.get(kind).map(str::to_string);

        if let Some(user) = self.users.find_by_email(&candidate.email).await? {
            return self.link(kind, external_id, candidate, user).await;
        }

        let created = self.create(kind, external_id.as_deref(), &mut candidate).await;
        match created {
            Err(ResolutionError::Conflict(reason)) => {
                match self.users.find_by_email(&candidate.email).await? {
                    Some(user) => {
                        info!(user_id = %user.id, provider = %kind, "Lost insert race, reusing user");
                        self.link(kind, external_id, candidate, user).await
                    }
                    None => Err(ResolutionError::Conflict(reason)),
                }
            }
            other => other,
        }
    }

    async fn create(
        &self,
        kind: ProviderKind,
        external_id: Option<&str>,
        candidate: &mut NewUser,
    ) -> ResolutionResult<ResolvedUser> {
        if let Some(external_id) = external_id {
            self.ensure_unclaimed(kind, external_id, None).await?;
        }

        if candidate.password_hash.is_none() {
            candidate.password_hash = Some(self.hasher.hash(&random_secret())?);
        }

        let user = self.users.create_user(candidate).await?;
        info!(user_id = %user.id, provider = %kind, "Created user from provider profile");

        Ok(ResolvedUser {
            user,
            created: true,
        })
    }

    /// Attach the provider account and fill a missing avatar on `user`
    async fn link(
        &self,
        kind: ProviderKind,
        external_id: Option<String>,
        candidate: NewUser,
        mut user: User,
    ) -> ResolutionResult<ResolvedUser> {
        let mut changed = false;

        if let Some(external_id) = external_id {
            if user.providers.get(kind) != Some(external_id.as_str()) {
                self.ensure_unclaimed(kind, &external_id, Some(user.id)).await?;
                if let Some(previous) = user.providers.get(kind) {
                    warn!(
                        user_id = %user.id,
                        provider = %kind,
                        previous,
                        "Relinking provider account"
                    );
                }
                user.providers.set(kind, Some(external_id));
                changed = true;
            }
        }

        if user.avatar_url.is_none() && candidate.avatar_url.is_some() {
            user.avatar_url = candidate.avatar_url;
            changed = true;
        }

        if changed {
            self.users.update_user(&user).await?;
            info!(user_id = %user.id, provider = %kind, "Linked provider to existing user");
        }

        Ok(ResolvedUser {
            user,
            created: false,
        })
    }

    /// Conflict if `external_id` already belongs to a user other than `owner`
    async fn ensure_unclaimed(
        &self,
        kind: ProviderKind,
        external_id: &str,
        owner: Option<Uuid>,
    ) -> ResolutionResult<()> {
        match self.users.find_by_provider(kind, external_id).await? {
            Some(holder) if Some(holder.id) != owner => {
                warn!(
                    holder_id = %holder.id,
                    provider = %kind,
                    "Provider account already linked to another user"
                );
                Err(ResolutionError::Conflict(format!(
                    "{kind} account is already linked to another user"
                )))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Clone)]
pub struct GarmentResolver {
    garments: Arc<dyn GarmentStore>,
}

impl GarmentResolver {
    pub fn new(garments: Arc<dyn GarmentStore>) -> Self {
        Self { garments }
    }

    /// Persist a garment candidate
    ///
    /// There is no merge step. A duplicate barcode is reported by the store
    /// and surfaces as [`ResolutionError::Conflict`].
    pub async fn resolve_garment(&self, candidate: NewGarment) -> ResolutionResult<Garment> {
        let garment = self.garments.create_garment(&candidate).await?;
        info!(
            garment_id = %garment.id,
            owner_id = %garment.owner_id,
            category = %garment.category,
            verified = garment.is_verified,
            "Stored garment"
        );
        Ok(garment)
    }
}

/// Unpredictable 32-character alphanumeric secret
pub fn random_secret() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_SECRET_LEN)
        .map(char::from)
        .collect()
}
