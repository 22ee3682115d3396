//! Garment repository for database operations
//!
//! Every read and write other than the insert is scoped to the owning user,
//! so one user's IDs are invisible to another.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow, types::Json};
use tracing::info;
use uuid::Uuid;

use resolution::StoreError;
use resolution::models::{Category, Garment, NewGarment};
use resolution::ports::GarmentStore;

use super::store_error;

const GARMENT_COLUMNS: &str = "id, owner_id, name, category, color, labels, brand, size, \
                               image_url, barcode, is_verified, created_at, updated_at";

/// Listing filters; `None` fields do not constrain the result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GarmentFilter {
    pub category: Option<Category>,
    pub color: Option<String>,
    pub brand: Option<String>,
}

impl GarmentFilter {
    fn push_conditions(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        if let Some(category) = self.category {
            builder.push(" AND category = ").push_bind(category.as_str());
        }
        if let Some(color) = &self.color {
            builder
                .push(" AND LOWER(color) = LOWER(")
                .push_bind(color.clone())
                .push(")");
        }
        if let Some(brand) = &self.brand {
            builder
                .push(" AND LOWER(brand) = LOWER(")
                .push_bind(brand.clone())
                .push(")");
        }
    }
}

/// Partial update; `None` keeps the stored value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GarmentChanges {
    pub name: Option<String>,
    pub category: Option<Category>,
    pub color: Option<String>,
    pub brand: Option<String>,
    pub size: Option<String>,
}

impl GarmentChanges {
    pub fn is_empty(&self) -> bool {
        self == &GarmentChanges::default()
    }
}

/// Garment repository
#[derive(Clone)]
pub struct GarmentRepository {
    pool: PgPool,
}

impl GarmentRepository {
    /// Create a new garment repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a garment by ID
    pub async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Garment>, StoreError> {
        let sql = format!(
            "SELECT {} FROM garments WHERE id = $1 AND owner_id = $2",
            GARMENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;

        row.as_ref().map(garment_from_row).transpose()
    }

    pub async fn find_by_barcode(
        &self,
        owner_id: Uuid,
        barcode: &str,
    ) -> Result<Option<Garment>, StoreError> {
        let sql = format!(
            "SELECT {} FROM garments WHERE barcode = $1 AND owner_id = $2",
            GARMENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(barcode)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;

        row.as_ref().map(garment_from_row).transpose()
    }

    /// Get one page of the owner's garments, newest first, with the total count
    pub async fn filter(
        &self,
        owner_id: Uuid,
        filter: &GarmentFilter,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Garment>, i64), StoreError> {
        let offset = (page.max(1) - 1) as i64 * limit as i64;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM garments WHERE owner_id = ",
            GARMENT_COLUMNS
        ));
        query.push_bind(owner_id);
        filter.push_conditions(&mut query);
        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM garments WHERE owner_id = ");
        count.push_bind(owner_id);
        filter.push_conditions(&mut count);

        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;

        let garments = rows
            .iter()
            .map(garment_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((garments, total))
    }

    /// Apply a partial update; `None` if the garment is not the owner's
    pub async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        changes: &GarmentChanges,
    ) -> Result<Option<Garment>, StoreError> {
        let sql = format!(
            r#"
            UPDATE garments
            SET name = COALESCE($3, name),
                category = COALESCE($4, category),
                color = COALESCE($5, color),
                brand = COALESCE($6, brand),
                size = COALESCE($7, size),
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING {}
            "#,
            GARMENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(owner_id)
            .bind(&changes.name)
            .bind(changes.category.map(|category| category.as_str()))
            .bind(&changes.color)
            .bind(&changes.brand)
            .bind(&changes.size)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;

        row.as_ref().map(garment_from_row).transpose()
    }

    pub async fn update_image(
        &self,
        owner_id: Uuid,
        id: Uuid,
        image_url: &str,
    ) -> Result<Option<Garment>, StoreError> {
        let sql = format!(
            r#"
            UPDATE garments
            SET image_url = $3, updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING {}
            "#,
            GARMENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(owner_id)
            .bind(image_url)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;

        row.as_ref().map(garment_from_row).transpose()
    }

    /// Delete a garment; false if nothing of the owner's matched
    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM garments WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every listed garment the owner has; IDs of others are skipped
    pub async fn delete_many(&self, owner_id: Uuid, ids: &[Uuid]) -> Result<u64, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM garments WHERE owner_id = $1 AND id = ANY($2)")
            .bind(owner_id)
            .bind(ids)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        info!(%owner_id, deleted = result.rows_affected(), "Bulk deleted garments");
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl GarmentStore for GarmentRepository {
    async fn create_garment(&self, garment: &NewGarment) -> Result<Garment, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO garments
                (id, owner_id, name, category, color, labels, brand, size, image_url, barcode, is_verified)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            GARMENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(garment.id)
            .bind(garment.owner_id)
            .bind(&garment.name)
            .bind(garment.category.as_str())
            .bind(&garment.color)
            .bind(Json(&garment.labels))
            .bind(&garment.brand)
            .bind(&garment.size)
            .bind(&garment.image_url)
            .bind(&garment.barcode)
            .bind(garment.is_verified)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;

        garment_from_row(&row)
    }
}

fn garment_from_row(row: &PgRow) -> Result<Garment, StoreError> {
    let category: String = row.get("category");
    let category = category
        .parse::<Category>()
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    let Json(labels): Json<Vec<String>> = row.get("labels");

    Ok(Garment {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        name: row.get("name"),
        category,
        color: row.get("color"),
        labels,
        brand: row.get("brand"),
        size: row.get("size"),
        image_url: row.get("image_url"),
        barcode: row.get("barcode"),
        is_verified: row.get("is_verified"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn where_clause(filter: &GarmentFilter) -> String {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 FROM garments WHERE owner_id = ");
        builder.push_bind(Uuid::nil());
        filter.push_conditions(&mut builder);
        builder.sql().to_string()
    }

    #[test]
    fn empty_filter_only_scopes_by_owner() {
        assert_eq!(
            where_clause(&GarmentFilter::default()),
            "SELECT 1 FROM garments WHERE owner_id = $1"
        );
    }

    #[test]
    fn filters_bind_in_order() {
        let filter = GarmentFilter {
            category: Some(Category::Bottom),
            color: Some("Blue".to_string()),
            brand: Some("Levi's".to_string()),
        };
        assert_eq!(
            where_clause(&filter),
            "SELECT 1 FROM garments WHERE owner_id = $1 AND category = $2 \
             AND LOWER(color) = LOWER($3) AND LOWER(brand) = LOWER($4)"
        );
    }

    #[test]
    fn empty_changes() {
        assert!(GarmentChanges::default().is_empty());
        let changes = GarmentChanges {
            size: Some("M".to_string()),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }
}
