//! Merchant entity

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BindFields, PgQuery, Resource};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Merchant {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantInput {
    pub name: String,
}

impl MerchantInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl BindFields for MerchantInput {
    const COLUMNS: &'static [&'static str] = &["name"];

    fn bind<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(self.name.clone())
    }
}

/// Globally shared merchants, unique by name
pub struct Merchants;

impl Resource for Merchants {
    const NAME: &'static str = "merchant";
    const TABLE: &'static str = "merchant";
    const SELECT_COLUMNS: &'static str = "id, name";
    const OWNER_COLUMN: Option<&'static str> = None;

    type Row = Merchant;
    type Fields = MerchantInput;
    type Changes = MerchantInput;

    fn assemble(id: Uuid, fields: MerchantInput) -> Merchant {
        Merchant { id, name: fields.name }
    }
}
