//! Budget entity
//!
//! Budgets are owned by a user and reference a category. Only the amount
//! can change after creation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BindFields, PgQuery, Resource};

/// Stored budget, as seen by its owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Budget {
    pub id: Uuid,
    pub amount: Decimal,
    pub category_id: Uuid,
}

/// Budget fields supplied on create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetInput {
    pub amount: Decimal,
    pub category_id: Uuid,
}

impl BindFields for BudgetInput {
    const COLUMNS: &'static [&'static str] = &["amount", "category_id"];

    fn bind<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(self.amount).bind(self.category_id)
    }
}

/// Budget fields supplied on update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetAmount {
    pub amount: Decimal,
}

impl BindFields for BudgetAmount {
    const COLUMNS: &'static [&'static str] = &["amount"];

    fn bind<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(self.amount)
    }
}

pub struct Budgets;

impl Resource for Budgets {
    const NAME: &'static str = "budget";
    const TABLE: &'static str = "budget";
    const SELECT_COLUMNS: &'static str = "id, amount, category_id";
    const OWNER_COLUMN: Option<&'static str> = Some("user_id");

    type Row = Budget;
    type Fields = BudgetInput;
    type Changes = BudgetAmount;

    fn assemble(id: Uuid, fields: BudgetInput) -> Budget {
        Budget {
            id,
            amount: fields.amount,
            category_id: fields.category_id,
        }
    }
}
