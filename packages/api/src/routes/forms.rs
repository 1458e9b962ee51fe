//! Form and query field parsing.
//!
//! Forms are deserialized into structs of plain `String`s so a missing field
//! and a blank one are handled the same way; the helpers here turn them into
//! typed values or [`AppError::InvalidForm`].

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;

use crate::error::AppError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// `?id=` on view routes, `id` on write forms that need nothing else.
#[derive(Debug, Default, Deserialize)]
pub struct IdParam {
    #[serde(default)]
    pub id: String,
}

impl IdParam {
    pub fn parse(&self) -> Result<i32, AppError> {
        parse_id(&self.id)
    }
}

/// Trimmed, non-blank text.
pub fn required(value: &str, field: &'static str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::InvalidForm(field));
    }
    Ok(value.to_string())
}

pub fn optional(value: &str) -> String {
    value.trim().to_string()
}

pub fn parse_id(value: &str) -> Result<i32, AppError> {
    parse_number(value, "id")
}

pub fn parse_number<T: FromStr>(value: &str, field: &'static str) -> Result<T, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::InvalidForm(field))
}

/// A finite amount of money.
pub fn parse_amount(value: &str) -> Result<f64, AppError> {
    let amount: f64 = parse_number(value, "amount")?;
    if !amount.is_finite() {
        return Err(AppError::InvalidForm("amount"));
    }
    Ok(amount)
}

/// `YYYY-MM-DD`
pub fn parse_date(value: &str, field: &'static str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| AppError::InvalidForm(field))
}

/// Like [`parse_date`], but blank means no date.
pub fn parse_optional_date(value: &str, field: &'static str) -> Result<Option<NaiveDate>, AppError> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    parse_date(value, field).map(Some)
}

/// RFC 3339, or a bare `YYYY-MM-DD` meaning midnight UTC.
pub fn parse_deadline(value: &str) -> Result<DateTime<Utc>, AppError> {
    let value = value.trim();
    if let Ok(deadline) = DateTime::parse_from_rfc3339(value) {
        return Ok(deadline.with_timezone(&Utc));
    }
    parse_date(value, "deadline").map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

/// A single `local@domain` address.
pub fn parse_email(value: &str) -> Result<String, AppError> {
    let value = value.trim();
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(AppError::InvalidForm("email"));
    }
    Ok(value.to_string())
}
