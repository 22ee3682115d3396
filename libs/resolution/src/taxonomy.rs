//! Category taxonomy: free-text vocabulary to garment categories
//!
//! A [`Taxonomy`] is an immutable lookup table built once at startup and
//! shared through an `Arc`. Lookup is exact match first, then substring
//! containment where the longest contained key wins; keys of equal length
//! fall back to table order.

use crate::models::Category;

const VISION_VOCABULARY: &[(&str, Category)] = &[
    // Tops
    ("shirt", Category::Top),
    ("t-shirt", Category::Top),
    ("t shirt", Category::Top),
    ("polo", Category::Top),
    ("polo shirt", Category::Top),
    ("blouse", Category::Top),
    ("jacket", Category::Top),
    ("sweater", Category::Top),
    ("hoodie", Category::Top),
    ("coat", Category::Top),
    ("sweatshirt", Category::Top),
    ("jersey", Category::Top),
    ("cardigan", Category::Top),
    ("button shirt", Category::Top),
    ("long sleeve", Category::Top),
    // Bottoms
    ("jean", Category::Bottom),
    ("jeans", Category::Bottom),
    ("denim", Category::Bottom),
    ("pants", Category::Bottom),
    ("shorts", Category::Bottom),
    ("skirt", Category::Bottom),
    ("trousers", Category::Bottom),
    ("leggings", Category::Bottom),
    ("sweatpants", Category::Bottom),
    ("jogging pants", Category::Bottom),
    ("chinos", Category::Bottom),
    // Dresses
    ("dress", Category::Dress),
    ("gown", Category::Dress),
    ("sundress", Category::Dress),
    // Footwear
    ("sneakers", Category::Sneakers),
    ("shoes", Category::Sneakers),
    ("boots", Category::Sneakers),
    ("sandals", Category::Sneakers),
    ("footwear", Category::Sneakers),
    // Accessories
    ("hat", Category::Accessories),
    ("cap", Category::Accessories),
    ("scarf", Category::Accessories),
    ("gloves", Category::Accessories),
    ("socks", Category::Accessories),
    ("belt", Category::Accessories),
    // Bags
    ("backpack", Category::Backpack),
    ("bag", Category::Backpack),
    ("handbag", Category::Backpack),
    ("tote", Category::Backpack),
    ("purse", Category::Backpack),
    ("duffel", Category::Backpack),
];

/// Catalog-only synonyms, appended to the vision vocabulary
const CATALOG_SYNONYMS: &[(&str, Category)] = &[
    ("tops", Category::Top),
    ("shirts", Category::Top),
    ("tee", Category::Top),
    ("tank top", Category::Top),
    ("outerwear", Category::Top),
    ("sweaters", Category::Top),
    ("bottoms", Category::Bottom),
    ("pant", Category::Bottom),
    ("jeggings", Category::Bottom),
    ("skirts", Category::Bottom),
    ("dresses", Category::Dress),
    ("sneaker", Category::Sneakers),
    ("shoe", Category::Sneakers),
    ("trainers", Category::Sneakers),
    ("loafers", Category::Sneakers),
    ("heels", Category::Sneakers),
    ("accessories", Category::Accessories),
    ("accessory", Category::Accessories),
    ("jewelry", Category::Accessories),
    ("watches", Category::Accessories),
    ("watch", Category::Accessories),
    ("sunglasses", Category::Accessories),
    ("necklace", Category::Accessories),
    ("bracelet", Category::Accessories),
    ("bags", Category::Backpack),
    ("backpacks", Category::Backpack),
    ("duffel bag", Category::Backpack),
    ("messenger bag", Category::Backpack),
];

/// Immutable vocabulary table
#[derive(Debug, Clone)]
pub struct Taxonomy {
    entries: Vec<(String, Category)>,
}

impl Taxonomy {
    /// Build a taxonomy from `(key, category)` pairs
    ///
    /// Keys are trimmed and lower-cased; empty keys are dropped.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Category)>,
        S: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|(key, category)| (normalize(key.as_ref()), category))
            .filter(|(key, _)| !key.is_empty())
            .collect();

        Self { entries }
    }

    /// Vocabulary matched against image-analysis labels
    pub fn vision() -> Self {
        Self::new(VISION_VOCABULARY.iter().copied())
    }

    /// Larger synonym table matched against catalog product categories
    pub fn catalog() -> Self {
        Self::new(
            VISION_VOCABULARY
                .iter()
                .chain(CATALOG_SYNONYMS.iter())
                .copied(),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Map a free-text label to a category
    pub fn classify(&self, label: &str) -> Option<Category> {
        let label = normalize(label);
        if label.is_empty() {
            return None;
        }

        if let Some((_, category)) = self.entries.iter().find(|(key, _)| *key == label) {
            return Some(*category);
        }

        self.entries
            .iter()
            .filter(|(key, _)| label.contains(key.as_str()))
            .fold(None::<&(String, Category)>, |best, entry| match best {
                Some(current) if current.0.len() >= entry.0.len() => Some(current),
                _ => Some(entry),
            })
            .map(|(_, category)| *category)
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}
