//! Repository module
//!
//! Ownership-scoped, transactional CRUD over the store. One generic
//! [`Repository`] is instantiated per entity kind; each kind describes its
//! table, columns and optional owner column through [`Resource`].

mod budget;
mod category;
mod error;
mod merchant;
pub mod pagination;
mod transaction;
mod user;

use std::marker::PhantomData;

use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{FromRow, PgPool, Postgres, Row};
use uuid::Uuid;

pub use budget::{Budget, BudgetAmount, BudgetInput, Budgets};
pub use category::{Categories, Category, CategoryInput};
pub use error::RepositoryError;
pub use merchant::{Merchant, MerchantInput, Merchants};
pub use pagination::{Cursor, PageRequest, PaginationError};
pub use transaction::{Transaction, TransactionInput, Transactions};
pub use user::{User, UserRecord, UserRepository};

pub type CategoryRepository = Repository<Categories>;
pub type MerchantRepository = Repository<Merchants>;
pub type BudgetRepository = Repository<Budgets>;
pub type TransactionRepository = Repository<Transactions>;

/// Postgres query with positional arguments
pub type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// A set of column values written by an insert or update.
pub trait BindFields: Send + Sync {
    /// Columns in the order `bind` pushes their values
    const COLUMNS: &'static [&'static str];

    fn bind<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q>;
}

/// Per-entity description consumed by [`Repository`].
pub trait Resource: Send + Sync + 'static {
    /// Human readable entity name for messages and logs
    const NAME: &'static str;
    /// Table identifier, quoted where it collides with a keyword
    const TABLE: &'static str;
    /// Columns returned by reads, `id` included
    const SELECT_COLUMNS: &'static str;
    /// Column holding the owning user's id, if the entity is owner-scoped
    const OWNER_COLUMN: Option<&'static str>;

    type Row: for<'r> FromRow<'r, PgRow> + Send + Unpin + 'static;
    /// Values supplied on create
    type Fields: BindFields;
    /// Values supplied on update
    type Changes: BindFields;

    /// The row a successful create of `fields` produced under `id`
    fn assemble(id: Uuid, fields: Self::Fields) -> Self::Row;
}

/// Generic repository for one entity kind.
///
/// For owner-scoped kinds every statement filters on the owner column with
/// the supplied owner; passing `None` matches no rows, and inserting without
/// an owner violates the column's NOT NULL constraint.
pub struct Repository<R> {
    pool: PgPool,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for Repository<R> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R> std::fmt::Debug for Repository<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("pool", &self.pool)
            .finish()
    }
}

impl<R: Resource> Repository<R> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _resource: PhantomData,
        }
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Fetch one row by id (and owner)
    pub async fn get(&self, id: Uuid, owner: Option<Uuid>) -> Result<R::Row, RepositoryError> {
        let sql = select_one_sql::<R>();
        let mut query = sqlx::query_as::<Postgres, R::Row>(&sql).bind(id);
        if R::OWNER_COLUMN.is_some() {
            query = query.bind(owner);
        }

        query
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound(R::NAME))
    }

    /// Fetch every row, restricted to `owner` for owner-scoped kinds
    pub async fn list(&self, owner: Option<Uuid>) -> Result<Vec<R::Row>, RepositoryError> {
        let sql = list_sql::<R>();
        let mut query = sqlx::query_as::<Postgres, R::Row>(&sql);
        if R::OWNER_COLUMN.is_some() {
            query = query.bind(owner);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    /// Insert a row in its own transaction and return the generated id
    pub async fn create(
        &self,
        fields: &R::Fields,
        owner: Option<Uuid>,
    ) -> Result<Uuid, RepositoryError> {
        let sql = insert_sql::<R>();
        let mut tx = self.pool.begin().await?;

        let mut query = fields.bind(sqlx::query(&sql));
        if R::OWNER_COLUMN.is_some() {
            query = query.bind(owner);
        }

        let row = query
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_write(R::NAME, e))?;
        let id: Uuid = row.try_get("id")?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::from_write(R::NAME, e))?;

        tracing::debug!(entity = R::NAME, %id, "Created");
        Ok(id)
    }

    /// Update a row; zero matched rows (wrong id or wrong owner) is `NotFound`
    pub async fn update(
        &self,
        id: Uuid,
        changes: &R::Changes,
        owner: Option<Uuid>,
    ) -> Result<(), RepositoryError> {
        let sql = update_sql::<R>();
        let mut tx = self.pool.begin().await?;

        let mut query = changes.bind(sqlx::query(&sql)).bind(id);
        if R::OWNER_COLUMN.is_some() {
            query = query.bind(owner);
        }

        let result = query
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_write(R::NAME, e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(R::NAME));
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::from_write(R::NAME, e))?;

        tracing::debug!(entity = R::NAME, %id, "Updated");
        Ok(())
    }

    /// Delete a row; zero matched rows (wrong id or wrong owner) is `NotFound`
    pub async fn delete(&self, id: Uuid, owner: Option<Uuid>) -> Result<(), RepositoryError> {
        let sql = delete_sql::<R>();
        let mut tx = self.pool.begin().await?;

        let mut query = sqlx::query(&sql).bind(id);
        if R::OWNER_COLUMN.is_some() {
            query = query.bind(owner);
        }

        let result = query
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_write(R::NAME, e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(R::NAME));
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::from_write(R::NAME, e))?;

        tracing::debug!(entity = R::NAME, %id, "Deleted");
        Ok(())
    }
}

// =========================================================================
// SQL builders
// =========================================================================

fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|n| format!("${}", n))
        .collect::<Vec<_>>()
        .join(", ")
}

fn owner_filter<R: Resource>(param: usize) -> String {
    match R::OWNER_COLUMN {
        Some(column) => format!(" AND {} = ${}", column, param),
        None => String::new(),
    }
}

pub(crate) fn select_one_sql<R: Resource>() -> String {
    format!(
        "SELECT {} FROM {} WHERE id = $1{}",
        R::SELECT_COLUMNS,
        R::TABLE,
        owner_filter::<R>(2)
    )
}

pub(crate) fn list_sql<R: Resource>() -> String {
    match R::OWNER_COLUMN {
        Some(column) => format!(
            "SELECT {} FROM {} WHERE {} = $1",
            R::SELECT_COLUMNS,
            R::TABLE,
            column
        ),
        None => format!("SELECT {} FROM {}", R::SELECT_COLUMNS, R::TABLE),
    }
}

pub(crate) fn insert_sql<R: Resource>() -> String {
    let mut columns: Vec<&str> = <R::Fields as BindFields>::COLUMNS.to_vec();
    if let Some(owner) = R::OWNER_COLUMN {
        columns.push(owner);
    }

    format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING id",
        R::TABLE,
        columns.join(", "),
        placeholders(1, columns.len())
    )
}

pub(crate) fn update_sql<R: Resource>() -> String {
    let columns = <R::Changes as BindFields>::COLUMNS;
    let assignments = columns
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{} = ${}", column, i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let id_param = columns.len() + 1;

    format!(
        "UPDATE {} SET {} WHERE id = ${}{}",
        R::TABLE,
        assignments,
        id_param,
        owner_filter::<R>(id_param + 1)
    )
}

pub(crate) fn delete_sql<R: Resource>() -> String {
    format!("DELETE FROM {} WHERE id = $1{}", R::TABLE, owner_filter::<R>(2))
}
