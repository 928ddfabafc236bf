//! Resolution of the optional list constraints into a SQL predicate and ordering.
//!
//! Every fragment is appended to a [QueryBuilder] with bound parameters; column
//! names only ever come from the closed [SortField] mapping.
use std::str::FromStr;

use sqlx::{QueryBuilder, Sqlite};

use crate::{
    error::{AppError, AppResult},
    expenses::dto::ListQuery,
};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Id,
    Name,
    Price,
    #[default]
    CreatedAt,
}

impl SortField {
    pub fn column(self) -> &'static str {
        match self {
            SortField::Id => "e.id",
            SortField::Name => "e.name",
            SortField::Price => "e.price",
            SortField::CreatedAt => "e.created_at",
        }
    }
}

impl FromStr for SortField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(SortField::Id),
            "name" => Ok(SortField::Name),
            "price" => Ok(SortField::Price),
            "created_at" => Ok(SortField::CreatedAt),
            other => Err(AppError::InvalidSortField(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(AppError::invalid("order", "Order must be either asc or desc")),
        }
    }
}

/// Conjunctive, individually optional constraints over one owner's expenses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub filter: ExpenseFilter,
    pub sort_by: SortField,
    pub order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            filter: ExpenseFilter::default(),
            sort_by: SortField::default(),
            order: SortOrder::default(),
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl TryFrom<ListQuery> for ListParams {
    type Error = AppError;

    fn try_from(q: ListQuery) -> AppResult<Self> {
        let sort_by = q
            .sort_by
            .as_deref()
            .map(str::parse::<SortField>)
            .transpose()?
            .unwrap_or_default();
        let order = q
            .order
            .as_deref()
            .map(str::parse::<SortOrder>)
            .transpose()?
            .unwrap_or_default();

        let limit = q.limit.unwrap_or(DEFAULT_LIMIT);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(AppError::invalid(
                "limit",
                format!("Limit must be between 1 and {MAX_LIMIT}"),
            ));
        }
        let offset = q.offset.unwrap_or(0);
        if offset < 0 {
            return Err(AppError::invalid("offset", "Offset must not be negative"));
        }

        if q.min_price.is_some_and(|p| p < 0) {
            return Err(AppError::invalid("min_price", "Price must not be negative"));
        }
        if q.max_price.is_some_and(|p| p < 0) {
            return Err(AppError::invalid("max_price", "Price must not be negative"));
        }
        if q.category_id.is_some_and(|id| id < 1) {
            return Err(AppError::invalid("category_id", "Category id must be positive"));
        }
        if q.category_name.as_deref().is_some_and(|n| n.is_empty()) {
            return Err(AppError::invalid(
                "category_name",
                "Category name must not be empty",
            ));
        }

        Ok(ListParams {
            filter: ExpenseFilter {
                min_price: q.min_price,
                max_price: q.max_price,
                category_id: q.category_id,
                category_name: q.category_name,
            },
            sort_by,
            order,
            limit,
            offset,
        })
    }
}

/// Append the owner-scoped WHERE clause. Expects `expenses e` joined with `categories c`.
pub(crate) fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, owner_id: i64, filter: &ExpenseFilter) {
    qb.push(" WHERE e.user_id = ").push_bind(owner_id);
    if let Some(min) = filter.min_price {
        qb.push(" AND e.price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND e.price <= ").push_bind(max);
    }
    if let Some(category_id) = filter.category_id {
        qb.push(" AND e.category_id = ").push_bind(category_id);
    }
    if let Some(name) = &filter.category_name {
        qb.push(" AND c.name = ").push_bind(name.clone());
    }
}

/// ORDER BY the requested column, then by id in the same direction so equal keys page stably.
pub(crate) fn push_ordering(qb: &mut QueryBuilder<'_, Sqlite>, sort_by: SortField, order: SortOrder) {
    let dir = order.keyword();
    qb.push(format_args!(" ORDER BY {} {dir}", sort_by.column()));
    if sort_by != SortField::Id {
        qb.push(format_args!(", e.id {dir}"));
    }
}

pub(crate) fn push_page(qb: &mut QueryBuilder<'_, Sqlite>, limit: i64, offset: i64) {
    qb.push(" LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);
}
