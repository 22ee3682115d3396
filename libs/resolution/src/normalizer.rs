//! Provider identity normalizer
//!
//! Turns raw external payloads into unsaved canonical candidates. Nothing here
//! touches persistence.

use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ResolutionError, ResolutionResult};
use crate::models::{
    Category, ClassificationResult, LinkedProviders, NewGarment, NewUser, ProductRecord,
    ProviderKind, ProviderProfile,
};
use crate::taxonomy::Taxonomy;

/// Map an OAuth userinfo payload onto a user candidate
///
/// The email is trimmed and lower-cased and doubles as the username. The
/// password is left unset so the resolver generates a random credential.
/// An email the provider has not verified is rejected, since it is the key
/// that links the profile to an existing account.
pub fn normalize_oauth(profile: ProviderProfile, kind: ProviderKind) -> ResolutionResult<NewUser> {
    let external_id = profile.external_id.trim();
    if external_id.is_empty() {
        return Err(ResolutionError::Validation(format!(
            "{kind} profile carries no account id"
        )));
    }

    let email = profile
        .email
        .as_deref()
        .map(|email| email.trim().to_lowercase())
        .filter(|email| email.contains('@'))
        .ok_or_else(|| {
            ResolutionError::Validation(format!("{kind} profile carries no usable email"))
        })?;

    if !profile.email_verified {
        return Err(ResolutionError::Validation(format!(
            "{kind} account has not verified {email}"
        )));
    }

    Ok(NewUser {
        username: email.clone(),
        email,
        first_name: trimmed_or_empty(profile.given_name),
        last_name: trimmed_or_empty(profile.family_name),
        avatar_url: non_blank(profile.avatar_url),
        providers: LinkedProviders::single(kind, external_id),
        password_hash: None,
    })
}

/// Map a classification onto a garment candidate for an uploaded photo
pub fn normalize_classification(
    result: &ClassificationResult,
    owner_id: Uuid,
    image_url: String,
) -> NewGarment {
    let color = result.color_name().to_string();

    NewGarment {
        id: Uuid::new_v4(),
        owner_id,
        name: format!("{} {}", color, result.category),
        category: result.category,
        color,
        labels: result.label_texts(),
        brand: None,
        size: None,
        image_url: Some(image_url),
        barcode: None,
        is_verified: true,
    }
}

/// Normalizer for catalog product records
#[derive(Debug, Clone)]
pub struct Normalizer {
    catalog: Arc<Taxonomy>,
}

impl Normalizer {
    pub fn new(catalog: Arc<Taxonomy>) -> Self {
        Self { catalog }
    }

    /// Map a barcode-catalog product onto a verified garment candidate
    pub fn normalize_product(&self, record: ProductRecord, owner_id: Uuid) -> NewGarment {
        let category = self
            .category_for(record.category.as_deref())
            .or_else(|| self.catalog.classify(&record.title))
            .unwrap_or(Category::Unknown);

        let color = non_blank(record.color).unwrap_or_else(|| "unknown".to_string());
        let name = match record.title.trim() {
            "" => format!("{color} {category}"),
            title => title.to_string(),
        };
        let image_url = record
            .images
            .into_iter()
            .map(|url| url.trim().to_string())
            .find(|url| !url.is_empty());

        NewGarment {
            id: Uuid::new_v4(),
            owner_id,
            name,
            category,
            color,
            labels: Vec::new(),
            brand: non_blank(record.brand),
            size: non_blank(record.size),
            image_url,
            barcode: Some(record.barcode),
            is_verified: true,
        }
    }

    /// Catalog categories are often breadcrumbs ("Apparel > Clothing > Jeans");
    /// the most specific segment that resolves wins.
    fn category_for(&self, raw: Option<&str>) -> Option<Category> {
        raw?.rsplit('>')
            .find_map(|segment| self.catalog.classify(segment))
    }
}

fn trimmed_or_empty(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
