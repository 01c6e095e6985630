//! Postgres backend built on sqlx.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::QueryAs;
use sqlx::{FromRow, PgPool, Postgres};
use std::marker::PhantomData;

use super::{
    ContentRepository, Entity, ListFilter, Repository, SettingsRepository, StoreError, StoreResult,
};
use crate::db::models::{
    AdminUser, Booking, CaseStudy, ContentBlock, ContentBlockUpdate, Insight, Lead, MediaAsset,
    NewContentBlock, Service, SiteSetting, Testimonial,
};

type Query<'q, T> = QueryAs<'q, Postgres, T, PgArguments>;

/// Table mapping for an [`Entity`]. `COLUMNS` lists every column except `id`,
/// in the order `bind_columns` binds them. The filter columns are SQL
/// expressions matching the facets `Entity::matches` reads.
pub trait PgEntity: Entity + for<'r> FromRow<'r, PgRow> {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    /// Same order as `Entity::listing_order`
    const ORDER_BY: &'static str = "id DESC";
    const SLUG_COLUMN: Option<&'static str> = None;
    const STATUS_COLUMN: Option<&'static str> = None;
    const CATEGORY_COLUMN: Option<&'static str> = None;
    const PUBLISHED_COLUMN: Option<&'static str> = None;
    const SEARCH_COLUMNS: &'static [&'static str] = &[];

    fn bind_columns<'q>(&self, query: Query<'q, Self>) -> Query<'q, Self>;
}

fn map_write_error(err: sqlx::Error, kind: &'static str) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return StoreError::Conflict(format!("{} already exists", kind));
        }
    }
    StoreError::Database(err)
}

fn insert_sql(table: &str, columns: &[&str]) -> String {
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
        table,
        columns.join(", "),
        placeholders.join(", ")
    )
}

fn update_sql(table: &str, columns: &[&str]) -> String {
    let assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| format!("{} = ${}", col, i + 1))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE id = ${} RETURNING *",
        table,
        assignments.join(", "),
        columns.len() + 1
    )
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Listing query for `filter`, with its text binds in placeholder order
fn listing_sql<T: PgEntity>(filter: &ListFilter) -> (String, Vec<String>) {
    let mut clauses = Vec::new();
    let mut binds = Vec::new();

    if let Some(col) = T::PUBLISHED_COLUMN.filter(|_| !filter.all) {
        clauses.push(format!("{} = TRUE", col));
    }
    if let (Some(col), Some(status)) = (T::STATUS_COLUMN, filter.status_filter()) {
        binds.push(status.to_string());
        clauses.push(format!("{} = ${}", col, binds.len()));
    }
    if let (Some(col), Some(category)) = (T::CATEGORY_COLUMN, filter.category_filter()) {
        binds.push(category.to_string());
        clauses.push(format!("LOWER({}) = LOWER(${})", col, binds.len()));
    }
    if let Some(term) = filter.search_term().filter(|_| !T::SEARCH_COLUMNS.is_empty()) {
        binds.push(format!("%{}%", escape_like(term)));
        let n = binds.len();
        let any: Vec<String> = T::SEARCH_COLUMNS
            .iter()
            .map(|col| format!("{} ILIKE ${}", col, n))
            .collect();
        clauses.push(format!("({})", any.join(" OR ")));
    }

    let mut sql = format!("SELECT * FROM {}", T::TABLE);
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY ");
    sql.push_str(T::ORDER_BY);
    (sql, binds)
}

/// Generic repository over one table
pub struct PgTable<T> {
    pool: PgPool,
    _entity: PhantomData<fn() -> T>,
}

impl<T> PgTable<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<T: PgEntity> Repository<T> for PgTable<T> {
    async fn list(&self) -> StoreResult<Vec<T>> {
        let sql = format!("SELECT * FROM {} ORDER BY {}", T::TABLE, T::ORDER_BY);
        let rows = sqlx::query_as::<_, T>(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn filtered(&self, filter: &ListFilter) -> StoreResult<Vec<T>> {
        let (sql, binds) = listing_sql::<T>(filter);
        let mut query = sqlx::query_as::<_, T>(&sql);
        for value in &binds {
            query = query.bind(value.clone());
        }
        let rows = query.fetch_all(&self.pool).await?;
        // Facets without a column (e.g. status on services) still reject here.
        Ok(rows.into_iter().filter(|row| row.matches(filter)).collect())
    }

    async fn find_by_slug(&self, slug: &str) -> StoreResult<T> {
        let Some(col) = T::SLUG_COLUMN else {
            return Err(StoreError::not_found(T::KIND, slug));
        };
        let sql = format!("SELECT * FROM {} WHERE LOWER({}) = LOWER($1)", T::TABLE, col);
        sqlx::query_as::<_, T>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found(T::KIND, slug))
    }

    async fn get(&self, id: i64) -> StoreResult<T> {
        let sql = format!("SELECT * FROM {} WHERE id = $1", T::TABLE);
        sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found(T::KIND, id))
    }

    async fn create(&self, draft: T::Draft) -> StoreResult<T> {
        let row = T::from_draft(0, draft, Utc::now());
        let sql = insert_sql(T::TABLE, T::COLUMNS);
        row.bind_columns(sqlx::query_as::<_, T>(&sql))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, T::KIND))
    }

    async fn update(&self, id: i64, patch: T::Patch) -> StoreResult<T> {
        let mut row = self.get(id).await?;
        row.apply_patch(patch, Utc::now());
        let sql = update_sql(T::TABLE, T::COLUMNS);
        row.bind_columns(sqlx::query_as::<_, T>(&sql))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_error(e, T::KIND))?
            .ok_or_else(|| StoreError::not_found(T::KIND, id))
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = $1", T::TABLE);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(T::KIND, id));
        }
        Ok(())
    }
}

// ============================================================================
// Table mappings
// ============================================================================

impl PgEntity for Lead {
    const TABLE: &'static str = "leads";
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "email",
        "phone",
        "company",
        "service_interest",
        "message",
        "source",
        "status",
        "notes",
        "created_at",
        "updated_at",
    ];
    const STATUS_COLUMN: Option<&'static str> = Some("status");
    const CATEGORY_COLUMN: Option<&'static str> = Some("service_interest");
    const SEARCH_COLUMNS: &'static [&'static str] = &["name", "email", "COALESCE(company, '')"];

    fn bind_columns<'q>(&self, q: Query<'q, Self>) -> Query<'q, Self> {
        q.bind(self.name.clone())
            .bind(self.email.clone())
            .bind(self.phone.clone())
            .bind(self.company.clone())
            .bind(self.service_interest.clone())
            .bind(self.message.clone())
            .bind(self.source.clone())
            .bind(self.status.as_str())
            .bind(self.notes.clone())
            .bind(self.created_at)
            .bind(self.updated_at)
    }
}

impl PgEntity for Booking {
    const TABLE: &'static str = "bookings";
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "email",
        "phone",
        "company",
        "service_type",
        "preferred_date",
        "preferred_time",
        "message",
        "status",
        "notes",
        "created_at",
        "updated_at",
    ];
    const STATUS_COLUMN: Option<&'static str> = Some("status");
    const CATEGORY_COLUMN: Option<&'static str> = Some("service_type");
    const SEARCH_COLUMNS: &'static [&'static str] = &["name", "email", "COALESCE(company, '')"];

    fn bind_columns<'q>(&self, q: Query<'q, Self>) -> Query<'q, Self> {
        q.bind(self.name.clone())
            .bind(self.email.clone())
            .bind(self.phone.clone())
            .bind(self.company.clone())
            .bind(self.service_type.clone())
            .bind(self.preferred_date)
            .bind(self.preferred_time.clone())
            .bind(self.message.clone())
            .bind(self.status.as_str())
            .bind(self.notes.clone())
            .bind(self.created_at)
            .bind(self.updated_at)
    }
}

impl PgEntity for CaseStudy {
    const TABLE: &'static str = "case_studies";
    const COLUMNS: &'static [&'static str] = &[
        "title",
        "slug",
        "client_name",
        "industry",
        "category",
        "challenge",
        "solution",
        "results",
        "image_url",
        "published",
        "featured",
        "sort_order",
        "created_at",
        "updated_at",
    ];
    const ORDER_BY: &'static str = "sort_order, id";
    const SLUG_COLUMN: Option<&'static str> = Some("slug");
    const CATEGORY_COLUMN: Option<&'static str> = Some("category");
    const PUBLISHED_COLUMN: Option<&'static str> = Some("published");
    const SEARCH_COLUMNS: &'static [&'static str] = &["title", "client_name", "industry"];

    fn bind_columns<'q>(&self, q: Query<'q, Self>) -> Query<'q, Self> {
        q.bind(self.title.clone())
            .bind(self.slug.clone())
            .bind(self.client_name.clone())
            .bind(self.industry.clone())
            .bind(self.category.clone())
            .bind(self.challenge.clone())
            .bind(self.solution.clone())
            .bind(self.results.clone())
            .bind(self.image_url.clone())
            .bind(self.published)
            .bind(self.featured)
            .bind(self.sort_order)
            .bind(self.created_at)
            .bind(self.updated_at)
    }
}

impl PgEntity for Service {
    const TABLE: &'static str = "services";
    const COLUMNS: &'static [&'static str] = &[
        "title",
        "slug",
        "summary",
        "description",
        "category",
        "icon",
        "features",
        "published",
        "sort_order",
        "created_at",
        "updated_at",
    ];
    const ORDER_BY: &'static str = "sort_order, id";
    const SLUG_COLUMN: Option<&'static str> = Some("slug");
    const CATEGORY_COLUMN: Option<&'static str> = Some("category");
    const PUBLISHED_COLUMN: Option<&'static str> = Some("published");
    const SEARCH_COLUMNS: &'static [&'static str] = &["title", "summary"];

    fn bind_columns<'q>(&self, q: Query<'q, Self>) -> Query<'q, Self> {
        q.bind(self.title.clone())
            .bind(self.slug.clone())
            .bind(self.summary.clone())
            .bind(self.description.clone())
            .bind(self.category.clone())
            .bind(self.icon.clone())
            .bind(self.features.clone())
            .bind(self.published)
            .bind(self.sort_order)
            .bind(self.created_at)
            .bind(self.updated_at)
    }
}

impl PgEntity for Testimonial {
    const TABLE: &'static str = "testimonials";
    const COLUMNS: &'static [&'static str] = &[
        "client_name",
        "client_title",
        "company",
        "quote",
        "rating",
        "image_url",
        "published",
        "featured",
        "sort_order",
        "created_at",
        "updated_at",
    ];
    const ORDER_BY: &'static str = "sort_order, id";
    const PUBLISHED_COLUMN: Option<&'static str> = Some("published");
    const SEARCH_COLUMNS: &'static [&'static str] =
        &["client_name", "COALESCE(company, '')", "quote"];

    fn bind_columns<'q>(&self, q: Query<'q, Self>) -> Query<'q, Self> {
        q.bind(self.client_name.clone())
            .bind(self.client_title.clone())
            .bind(self.company.clone())
            .bind(self.quote.clone())
            .bind(self.rating)
            .bind(self.image_url.clone())
            .bind(self.published)
            .bind(self.featured)
            .bind(self.sort_order)
            .bind(self.created_at)
            .bind(self.updated_at)
    }
}

impl PgEntity for Insight {
    const TABLE: &'static str = "insights";
    const COLUMNS: &'static [&'static str] = &[
        "title",
        "slug",
        "summary",
        "content_html",
        "category",
        "author",
        "tags",
        "cover_image",
        "published",
        "published_at",
        "created_at",
        "updated_at",
    ];
    const SLUG_COLUMN: Option<&'static str> = Some("slug");
    const CATEGORY_COLUMN: Option<&'static str> = Some("category");
    const PUBLISHED_COLUMN: Option<&'static str> = Some("published");
    const SEARCH_COLUMNS: &'static [&'static str] =
        &["title", "COALESCE(summary, '')", "array_to_string(tags, ' ')"];

    fn bind_columns<'q>(&self, q: Query<'q, Self>) -> Query<'q, Self> {
        q.bind(self.title.clone())
            .bind(self.slug.clone())
            .bind(self.summary.clone())
            .bind(self.content_html.clone())
            .bind(self.category.clone())
            .bind(self.author.clone())
            .bind(self.tags.clone())
            .bind(self.cover_image.clone())
            .bind(self.published)
            .bind(self.published_at)
            .bind(self.created_at)
            .bind(self.updated_at)
    }
}

impl PgEntity for MediaAsset {
    const TABLE: &'static str = "media_assets";
    const COLUMNS: &'static [&'static str] = &[
        "filename",
        "original_name",
        "url",
        "file_size",
        "mime_type",
        "checksum",
        "alt_text",
        "created_at",
        "updated_at",
    ];
    const CATEGORY_COLUMN: Option<&'static str> = Some("split_part(mime_type, '/', 1)");
    const SEARCH_COLUMNS: &'static [&'static str] =
        &["original_name", "COALESCE(alt_text, '')"];

    fn bind_columns<'q>(&self, q: Query<'q, Self>) -> Query<'q, Self> {
        q.bind(self.filename.clone())
            .bind(self.original_name.clone())
            .bind(self.url.clone())
            .bind(self.file_size)
            .bind(self.mime_type.clone())
            .bind(self.checksum.clone())
            .bind(self.alt_text.clone())
            .bind(self.created_at)
            .bind(self.updated_at)
    }
}

impl PgEntity for AdminUser {
    const TABLE: &'static str = "admin_users";
    const COLUMNS: &'static [&'static str] = &[
        "email",
        "name",
        "password_hash",
        "role",
        "is_active",
        "login_attempts",
        "locked_until",
        "last_login_at",
        "created_at",
        "updated_at",
    ];
    const ORDER_BY: &'static str = "id";
    const SLUG_COLUMN: Option<&'static str> = Some("email");
    const STATUS_COLUMN: Option<&'static str> = Some("role");
    const SEARCH_COLUMNS: &'static [&'static str] = &["email", "name"];

    fn bind_columns<'q>(&self, q: Query<'q, Self>) -> Query<'q, Self> {
        q.bind(self.email.clone())
            .bind(self.name.clone())
            .bind(self.password_hash.clone())
            .bind(self.role.as_str())
            .bind(self.is_active)
            .bind(self.login_attempts)
            .bind(self.locked_until)
            .bind(self.last_login_at)
            .bind(self.created_at)
            .bind(self.updated_at)
    }
}

// ============================================================================
// Content blocks
// ============================================================================

pub struct PgContent {
    pool: PgPool,
}

impl PgContent {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentRepository for PgContent {
    async fn list(&self, page: &str, section: Option<&str>) -> StoreResult<Vec<ContentBlock>> {
        let blocks = sqlx::query_as::<_, ContentBlock>(
            r#"
            SELECT * FROM content_blocks
            WHERE page = $1 AND ($2::TEXT IS NULL OR section = $2)
            ORDER BY section, sort_order, id
            "#,
        )
        .bind(page)
        .bind(section)
        .fetch_all(&self.pool)
        .await?;
        Ok(blocks)
    }

    async fn get(&self, id: i64) -> StoreResult<ContentBlock> {
        sqlx::query_as::<_, ContentBlock>("SELECT * FROM content_blocks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("content block", id))
    }

    async fn update(&self, id: i64, update: ContentBlockUpdate) -> StoreResult<ContentBlock> {
        sqlx::query_as::<_, ContentBlock>(
            r#"
            UPDATE content_blocks SET
                content = COALESCE($1, content),
                sort_order = COALESCE($2, sort_order),
                block_type = COALESCE($3, block_type),
                updated_at = now()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(update.content)
        .bind(update.sort_order)
        .bind(update.block_type.map(|t| t.as_str()))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("content block", id))
    }

    async fn upsert(&self, block: NewContentBlock) -> StoreResult<ContentBlock> {
        let row = sqlx::query_as::<_, ContentBlock>(
            r#"
            INSERT INTO content_blocks (page, section, block_type, block_key, content, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (page, section, block_key) DO UPDATE SET
                block_type = EXCLUDED.block_type,
                content = EXCLUDED.content,
                sort_order = EXCLUDED.sort_order,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(&block.page)
        .bind(&block.section)
        .bind(block.block_type.as_str())
        .bind(&block.block_key)
        .bind(&block.content)
        .bind(block.sort_order)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn count(&self) -> StoreResult<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM content_blocks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as usize)
    }
}

// ============================================================================
// Settings
// ============================================================================

pub struct PgSettings {
    pool: PgPool,
}

impl PgSettings {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for PgSettings {
    async fn all(&self) -> StoreResult<Vec<SiteSetting>> {
        let settings =
            sqlx::query_as::<_, SiteSetting>("SELECT key, value, updated_at FROM site_settings ORDER BY key")
                .fetch_all(&self.pool)
                .await?;
        Ok(settings)
    }

    async fn get(&self, key: &str) -> StoreResult<SiteSetting> {
        sqlx::query_as::<_, SiteSetting>(
            "SELECT key, value, updated_at FROM site_settings WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("setting", key))
    }

    async fn put(&self, key: &str, value: Value) -> StoreResult<SiteSetting> {
        let setting = sqlx::query_as::<_, SiteSetting>(
            r#"
            INSERT INTO site_settings (key, value, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (key) DO UPDATE SET
                value = EXCLUDED.value,
                updated_at = now()
            RETURNING key, value, updated_at
            "#,
        )
        .bind(key)
        .bind(&value)
        .fetch_one(&self.pool)
        .await?;
        Ok(setting)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM site_settings WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("setting", key));
        }
        Ok(())
    }
}
