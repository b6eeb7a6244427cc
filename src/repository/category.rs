//! Category entity

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BindFields, PgQuery, Resource};

/// Stored category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
}

/// Category fields supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInput {
    pub name: String,
}

impl CategoryInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl BindFields for CategoryInput {
    const COLUMNS: &'static [&'static str] = &["name"];

    fn bind<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(self.name.clone())
    }
}

/// Globally shared categories, unique by name
pub struct Categories;

impl Resource for Categories {
    const NAME: &'static str = "category";
    const TABLE: &'static str = "category";
    const SELECT_COLUMNS: &'static str = "id, name";
    const OWNER_COLUMN: Option<&'static str> = None;

    type Row = Category;
    type Fields = CategoryInput;
    type Changes = CategoryInput;

    fn assemble(id: Uuid, fields: CategoryInput) -> Category {
        Category { id, name: fields.name }
    }
}
