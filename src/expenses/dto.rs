use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    categories::dto::Category,
    db::to_storable_utc,
    error::{AppError, AppResult},
};

/// Raw query string of `GET /expenses`. Resolved into [super::filter::ListParams].
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    pub name: String,
    pub category_id: i64,
    pub price: i64,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

/// Partial update. Absent fields stay unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateExpenseRequest {
    pub name: Option<String>,
    pub category_id: Option<i64>,
    pub price: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Expense {
    pub id: i64,
    pub name: String,
    pub price: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub category: Category,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// A create request that passed validation.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub name: String,
    pub category_id: i64,
    pub price: i64,
    pub created_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Default)]
pub struct ExpensePatch {
    pub name: Option<String>,
    pub category_id: Option<i64>,
    pub price: Option<i64>,
}

impl ExpensePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.category_id.is_none() && self.price.is_none()
    }
}

fn checked_name(raw: &str) -> AppResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::invalid("name", "Name must not be empty"));
    }
    Ok(name.to_owned())
}

fn checked_price(price: i64) -> AppResult<i64> {
    if price < 0 {
        return Err(AppError::invalid("price", "Price must not be negative"));
    }
    Ok(price)
}

fn checked_created_at(at: OffsetDateTime) -> AppResult<OffsetDateTime> {
    to_storable_utc(at).ok_or_else(|| {
        AppError::invalid("created_at", "Timestamp must fall between years 0000 and 9999 in UTC")
    })
}

impl TryFrom<CreateExpenseRequest> for NewExpense {
    type Error = AppError;

    fn try_from(req: CreateExpenseRequest) -> AppResult<Self> {
        Ok(NewExpense {
            name: checked_name(&req.name)?,
            category_id: req.category_id,
            price: checked_price(req.price)?,
            created_at: req.created_at.map(checked_created_at).transpose()?,
        })
    }
}

impl TryFrom<UpdateExpenseRequest> for ExpensePatch {
    type Error = AppError;

    fn try_from(req: UpdateExpenseRequest) -> AppResult<Self> {
        Ok(ExpensePatch {
            name: req.name.as_deref().map(checked_name).transpose()?,
            category_id: req.category_id,
            price: req.price.map(checked_price).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_is_trimmed_and_checked() {
        let req: CreateExpenseRequest = serde_json::from_str(
            r#"{"name":"  Lunch ","category_id":2,"price":1250,"created_at":"2024-03-01T12:00:00+01:00"}"#,
        )
        .unwrap();
        let new = NewExpense::try_from(req).unwrap();
        assert_eq!(new.name, "Lunch");
        assert_eq!(new.created_at.unwrap().unix_timestamp(), 1_709_290_800);
        assert!(new.created_at.unwrap().offset().is_utc());

        let req: CreateExpenseRequest =
            serde_json::from_str(r#"{"name":"x","category_id":2,"price":-1}"#).unwrap();
        assert!(matches!(
            NewExpense::try_from(req),
            Err(AppError::Validation { field: Some("price"), .. })
        ));
    }

    #[test]
    fn created_at_must_stay_within_four_digit_utc_years() {
        for raw in ["9999-12-31T23:30:00-01:00", "0000-01-01T00:30:00+01:00"] {
            let req: CreateExpenseRequest = serde_json::from_str(&format!(
                r#"{{"name":"x","category_id":1,"price":1,"created_at":"{raw}"}}"#
            ))
            .unwrap();
            assert!(
                matches!(
                    NewExpense::try_from(req),
                    Err(AppError::Validation { field: Some("created_at"), .. })
                ),
                "{raw} accepted"
            );
        }

        let req: CreateExpenseRequest = serde_json::from_str(
            r#"{"name":"x","category_id":1,"price":1,"created_at":"9999-12-31T23:30:00+01:00"}"#,
        )
        .unwrap();
        let new = NewExpense::try_from(req).unwrap();
        assert_eq!(new.created_at.unwrap().hour(), 22);
    }

    #[test]
    fn patch_keeps_absent_fields_absent() {
        let patch = ExpensePatch::try_from(UpdateExpenseRequest {
            price: Some(10),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(patch.price, Some(10));
        assert!(patch.name.is_none() && patch.category_id.is_none());
        assert!(ExpensePatch::try_from(UpdateExpenseRequest::default()).unwrap().is_empty());

        let blank = UpdateExpenseRequest {
            name: Some(" ".into()),
            ..Default::default()
        };
        assert!(matches!(
            ExpensePatch::try_from(blank),
            Err(AppError::Validation { field: Some("name"), .. })
        ));
    }
}
