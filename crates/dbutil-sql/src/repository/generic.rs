//! # Generic Repository
//!
//! CRUD, pagination and transaction-aware writes for any [`Record`].
//!
//! ## Locking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Repository<T>                                                          │
//! │  ├── db     (shared pool, thread-safe on its own)                      │
//! │  ├── table  (fixed at construction)                                    │
//! │  └── state: Mutex<RepoState>                                           │
//! │            ├── options   (equality filters)                            │
//! │            ├── preload   (relation name)                               │
//! │            └── order_by                                                │
//! │                                                                         │
//! │  Every operation holds the lock from reading options until the         │
//! │  query completes, so one repository value runs one query at a time.   │
//! │  The *_with reads take options per call and skip the lock.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Not-Found Normalization
//! Reads never surface "no rows": `first` → `None`, `find`/`list`/raw → `[]`,
//! `count` → `0`. Any other backend error is returned unchanged.

use std::marker::PhantomData;

use dbutil_core::filter::{quote_identifier, validate_expression, validate_identifier};
use dbutil_core::{FieldMap, Filter, ListOptions, Page, SearchOptions, Value};
use sqlx::sqlite::SqliteQueryResult;
use sqlx::{QueryBuilder, Sqlite, Transaction};
use tokio::sync::Mutex;
use tracing::debug;

use super::query::{
    count_from, delete_from, insert_into, push_fragment, push_limit_offset, push_order, push_where,
    select_from, update_set,
};
use super::Record;
use crate::error::{not_found_as_empty, DbError, DbResult};
use crate::pool::Database;

#[derive(Debug, Default)]
struct RepoState {
    options: SearchOptions,
    preload: Option<String>,
    order_by: String,
}

/// Generic repository over an entity type.
///
/// Cheap to create: one per use site or request is fine.
///
/// ## Example
/// ```rust,ignore
/// let repo = Repository::<Account>::new(&db).with_option("active", true);
///
/// let first = repo.first().await?;          // Option<Account>
/// let all = repo.find().await?;             // Vec<Account>
/// let page = repo.find_by_page(&ListOptions::new(2, 20).desc(None)).await?;
/// ```
pub struct Repository<T> {
    db: Database,
    table: String,
    state: Mutex<RepoState>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Record> Repository<T> {
    /// Creates a repository bound to the entity's table under the
    /// database's naming strategy.
    pub fn new(db: &Database) -> Self {
        Repository {
            db: db.clone(),
            table: db.table_name::<T>(),
            state: Mutex::new(RepoState::default()),
            _entity: PhantomData,
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Overrides the target table.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Replaces the equality filters.
    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.state.get_mut().options = options;
        self
    }

    /// Adds one equality filter.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.state.get_mut().options.set(key, value);
        self
    }

    /// Sets the relation eager-loaded by [`Repository::first`].
    pub fn with_preload(mut self, relation: impl Into<String>) -> Self {
        self.state.get_mut().preload = Some(relation.into());
        self
    }

    /// Sets the order applied by `first` and `find`.
    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.state.get_mut().order_by = order_by.into();
        self
    }

    /// Replaces the equality filters.
    pub async fn set_options(&self, fields: FieldMap) {
        self.state.lock().await.options = SearchOptions::new(fields);
    }

    /// Adds or replaces one equality filter.
    pub async fn set_option(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.state.lock().await.options.set(key, value);
    }

    pub async fn set_preload(&self, relation: Option<String>) {
        self.state.lock().await.preload = relation;
    }

    pub async fn set_order_by(&self, order_by: impl Into<String>) {
        self.state.lock().await.order_by = order_by.into();
    }

    /// Snapshot of the current equality filters.
    pub async fn options(&self) -> SearchOptions {
        self.state.lock().await.options.clone()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// First row matching the configured filters, or `None`.
    ///
    /// Applies the configured order and, when set, preloads the relation.
    pub async fn first(&self) -> DbResult<Option<T>> {
        let state = self.state.lock().await;
        let mut row = self.fetch_first(&state.options, &state.order_by).await?;

        if let (Some(row), Some(relation)) = (row.as_mut(), state.preload.as_deref()) {
            debug!(table = %self.table, relation = %relation, "Preloading relation");
            row.preload(relation, self.db.pool()).await?;
        }

        Ok(row)
    }

    /// All rows matching the configured filters (empty when none match).
    pub async fn find(&self) -> DbResult<Vec<T>> {
        let state = self.state.lock().await;
        self.fetch_all(&state.options, &state.order_by).await
    }

    /// Number of rows matching the configured filters.
    pub async fn count(&self) -> DbResult<u64> {
        let state = self.state.lock().await;
        self.fetch_count(&Filter::from_search(&state.options)?).await
    }

    /// [`Repository::first`] with per-call options; no order, no preload.
    pub async fn first_with(&self, options: &SearchOptions) -> DbResult<Option<T>> {
        self.fetch_first(options, "").await
    }

    /// [`Repository::find`] with per-call options.
    pub async fn find_with(&self, options: &SearchOptions) -> DbResult<Vec<T>> {
        self.fetch_all(options, "").await
    }

    /// [`Repository::count`] with per-call options.
    pub async fn count_with(&self, options: &SearchOptions) -> DbResult<u64> {
        self.fetch_count(&Filter::from_search(options)?).await
    }

    /// One page of rows plus the total matching count.
    ///
    /// ## What This Does
    /// 1. `field_map` entries become equality predicates
    /// 2. `fields` pairs become one combined AND predicate
    /// 3. `total` counts every row matching 1+2, ignoring paging
    /// 4. Rows are ordered by `order_by`, limited to `limit`,
    ///    skipping `(page - 1) * limit`
    pub async fn find_by_page(&self, options: &ListOptions) -> DbResult<Page<T>> {
        let _guard = self.state.lock().await;
        let filter = Filter::from_list(options)?;

        let total = self.fetch_count(&filter).await?;

        let mut builder = select_from(&self.table)?;
        push_where(&mut builder, &filter)?;
        push_order(&mut builder, &options.order_by)?;
        push_limit_offset(&mut builder, options.limit, options.offset());

        debug!(table = %self.table, sql = builder.sql(), total, "Fetching page");
        let items = not_found_as_empty(builder.build_query_as::<T>().fetch_all(self.db.pool()).await)?;

        Ok(Page::new(items, total, options))
    }

    /// Rows filtered by `field_map` only, skipping `page` rows.
    ///
    /// Unlike [`Repository::find_by_page`], the offset is `page` itself,
    /// not `(page - 1) * limit`, and no total is computed.
    pub async fn list(&self, options: &ListOptions) -> DbResult<Vec<T>> {
        let _guard = self.state.lock().await;
        let filter = Filter::from_field_map(options)?;

        let mut builder = select_from(&self.table)?;
        push_where(&mut builder, &filter)?;
        push_order(&mut builder, &options.order_by)?;
        push_limit_offset(&mut builder, options.limit, options.page);

        debug!(table = %self.table, sql = builder.sql(), "Listing rows");
        not_found_as_empty(builder.build_query_as::<T>().fetch_all(self.db.pool()).await)
    }

    /// Runs raw SQL and decodes the rows into `T`.
    ///
    /// Bypasses options, ordering and table configuration entirely.
    pub async fn find_by_raw(&self, sql: &str) -> DbResult<Vec<T>> {
        let _guard = self.state.lock().await;
        debug!(sql = %sql, "Running raw query");
        not_found_as_empty(sqlx::query_as::<_, T>(sql).fetch_all(self.db.pool()).await)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Inserts one row and returns its row id.
    pub async fn create(&self, entity: &T) -> DbResult<i64> {
        self.tx_create(entity, None).await
    }

    /// Deletes rows matching the configured filters.
    ///
    /// Refuses to run with no filters configured.
    pub async fn delete(&self) -> DbResult<u64> {
        self.tx_delete(None).await
    }

    /// Deletes rows where `key` matches `value`, ignoring configured filters.
    pub async fn delete_by_kv(&self, key: &str, value: impl Into<Value>) -> DbResult<u64> {
        let _guard = self.state.lock().await;
        let filter = Filter::single(key, &value.into())?;

        let mut builder = delete_from(&self.table)?;
        push_where(&mut builder, &filter)?;
        Ok(self.execute(builder, None).await?.rows_affected())
    }

    /// Sets the columns in `attrs` on rows where `key` matches `value`.
    ///
    /// Returns rows affected; empty `attrs` is a no-op.
    pub async fn update(&self, key: &str, value: impl Into<Value>, attrs: &FieldMap) -> DbResult<u64> {
        self.tx_update(key, value, attrs, None).await
    }

    /// Atomically sets `column = <template>` with `?` bound to `num`.
    ///
    /// ## Example
    /// ```rust,ignore
    /// // UPDATE account SET balance = balance + 25 WHERE id = 7
    /// repo.expr("id", 7, "balance", "balance + ?", 25).await?;
    /// ```
    ///
    /// The template may only reference the entity's columns and a small
    /// set of SQL functions; see [`validate_expression`].
    pub async fn expr(
        &self,
        key: &str,
        value: impl Into<Value>,
        column: &str,
        template: &str,
        num: i64,
    ) -> DbResult<u64> {
        self.tx_expr(key, value, column, template, num, None).await
    }

    // =========================================================================
    // Transaction Variants
    // =========================================================================
    // `tx = None` runs against the pool; the plain writes above delegate here.

    /// [`Repository::create`] inside an optional transaction.
    pub async fn tx_create(&self, entity: &T, tx: Option<&mut Transaction<'_, Sqlite>>) -> DbResult<i64> {
        let _guard = self.state.lock().await;
        let builder = insert_into(&self.table, &entity.insert_pairs())?;
        Ok(self.execute(builder, tx).await?.last_insert_rowid())
    }

    /// [`Repository::update`] inside an optional transaction.
    pub async fn tx_update(
        &self,
        key: &str,
        value: impl Into<Value>,
        attrs: &FieldMap,
        tx: Option<&mut Transaction<'_, Sqlite>>,
    ) -> DbResult<u64> {
        let _guard = self.state.lock().await;
        if attrs.is_empty() {
            debug!(table = %self.table, "Update with no attributes skipped");
            return Ok(0);
        }

        let filter = Filter::single(key, &value.into())?;
        let mut builder = update_set(&self.table, attrs)?;
        push_where(&mut builder, &filter)?;
        Ok(self.execute(builder, tx).await?.rows_affected())
    }

    /// [`Repository::delete`] inside an optional transaction.
    pub async fn tx_delete(&self, tx: Option<&mut Transaction<'_, Sqlite>>) -> DbResult<u64> {
        let state = self.state.lock().await;
        let filter = Filter::from_search(&state.options)?;
        if filter.is_empty() {
            return Err(DbError::MissingWhereConditions {
                table: self.table.clone(),
            });
        }

        let mut builder = delete_from(&self.table)?;
        push_where(&mut builder, &filter)?;
        Ok(self.execute(builder, tx).await?.rows_affected())
    }

    /// [`Repository::expr`] inside an optional transaction.
    pub async fn tx_expr(
        &self,
        key: &str,
        value: impl Into<Value>,
        column: &str,
        template: &str,
        num: i64,
        tx: Option<&mut Transaction<'_, Sqlite>>,
    ) -> DbResult<u64> {
        let _guard = self.state.lock().await;
        validate_identifier(column)?;
        validate_expression(template, &T::column_names())?;
        let filter = Filter::single(key, &value.into())?;

        let mut builder = QueryBuilder::new(format!(
            "UPDATE {} SET {} = ",
            quote_identifier(&self.table)?,
            quote_identifier(column)?
        ));
        push_fragment(&mut builder, template, &[Value::Int(num)]);
        push_where(&mut builder, &filter)?;
        Ok(self.execute(builder, tx).await?.rows_affected())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn fetch_first(&self, options: &SearchOptions, order_by: &str) -> DbResult<Option<T>> {
        let filter = Filter::from_search(options)?;
        let mut builder = select_from(&self.table)?;
        push_where(&mut builder, &filter)?;
        push_order(&mut builder, order_by)?;
        builder.push(" LIMIT 1");

        debug!(table = %self.table, sql = builder.sql(), "Fetching first row");
        not_found_as_empty(builder.build_query_as::<T>().fetch_optional(self.db.pool()).await)
    }

    async fn fetch_all(&self, options: &SearchOptions, order_by: &str) -> DbResult<Vec<T>> {
        let filter = Filter::from_search(options)?;
        let mut builder = select_from(&self.table)?;
        push_where(&mut builder, &filter)?;
        push_order(&mut builder, order_by)?;

        debug!(table = %self.table, sql = builder.sql(), "Fetching rows");
        not_found_as_empty(builder.build_query_as::<T>().fetch_all(self.db.pool()).await)
    }

    async fn fetch_count(&self, filter: &Filter) -> DbResult<u64> {
        let mut builder = count_from(&self.table)?;
        push_where(&mut builder, filter)?;

        debug!(table = %self.table, sql = builder.sql(), "Counting rows");
        let count: i64 =
            not_found_as_empty(builder.build_query_scalar::<i64>().fetch_one(self.db.pool()).await)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn execute(
        &self,
        mut builder: QueryBuilder<'_, Sqlite>,
        tx: Option<&mut Transaction<'_, Sqlite>>,
    ) -> DbResult<SqliteQueryResult> {
        debug!(
            table = %self.table,
            sql = builder.sql(),
            in_transaction = tx.is_some(),
            "Executing statement"
        );

        let query = builder.build();
        let result = match tx {
            Some(tx) => query.execute(&mut **tx).await?,
            None => query.execute(self.db.pool()).await?,
        };
        Ok(result)
    }
}
