//! Transaction entity
//!
//! Transactions are owned by a user and reference a merchant and a
//! category. Listing goes through keyset pagination.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::Postgres;
use uuid::Uuid;

use super::pagination::{keyset_predicate, Cursor, PageRequest};
use super::{BindFields, PgQuery, Repository, RepositoryError, Resource};

/// Stored transaction, as seen by its owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub merchant_id: Uuid,
    pub category_id: Uuid,
}

impl Transaction {
    /// Cursor selecting the rows after this one
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.date, self.id)
    }
}

/// Transaction fields supplied on create and update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub amount: Decimal,
    pub date: NaiveDate,
    pub merchant_id: Uuid,
    pub category_id: Uuid,
}

impl BindFields for TransactionInput {
    const COLUMNS: &'static [&'static str] =
        &["amount", "\"date\"", "merchant_id", "category_id"];

    fn bind<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.amount)
            .bind(self.date)
            .bind(self.merchant_id)
            .bind(self.category_id)
    }
}

pub struct Transactions;

impl Resource for Transactions {
    const NAME: &'static str = "transaction";
    const TABLE: &'static str = "\"transaction\"";
    const SELECT_COLUMNS: &'static str = "id, amount, \"date\", merchant_id, category_id";
    const OWNER_COLUMN: Option<&'static str> = Some("user_id");

    type Row = Transaction;
    type Fields = TransactionInput;
    type Changes = TransactionInput;

    fn assemble(id: Uuid, fields: TransactionInput) -> Transaction {
        Transaction {
            id,
            amount: fields.amount,
            date: fields.date,
            merchant_id: fields.merchant_id,
            category_id: fields.category_id,
        }
    }
}

pub(crate) fn page_sql(with_cursor: bool) -> String {
    let mut sql = format!(
        "SELECT {} FROM {} WHERE user_id = $1",
        Transactions::SELECT_COLUMNS,
        Transactions::TABLE
    );
    let limit_param = if with_cursor {
        sql.push_str(" AND ");
        sql.push_str(&keyset_predicate(2));
        4
    } else {
        2
    };
    sql.push_str(&format!(
        " ORDER BY \"date\" DESC, id DESC LIMIT ${}",
        limit_param
    ));
    sql
}

impl Repository<Transactions> {
    /// One page of the owner's transactions, newest `(date, id)` first
    pub async fn list_page(
        &self,
        owner: Uuid,
        page: &PageRequest,
    ) -> Result<Vec<Transaction>, RepositoryError> {
        let sql = page_sql(page.cursor.is_some());
        let mut query = sqlx::query_as::<Postgres, Transaction>(&sql).bind(owner);
        if let Some(cursor) = page.cursor {
            query = query.bind(cursor.date).bind(cursor.id);
        }

        Ok(query.bind(page.limit).fetch_all(self.pool()).await?)
    }
}
