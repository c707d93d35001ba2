use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum DiscountType {
    Percent,
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percent => "percent",
            DiscountType::Fixed => "fixed",
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscountType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "percent" => Ok(DiscountType::Percent),
            "fixed" => Ok(DiscountType::Fixed),
            other => Err(AppError::Validation(format!(
                "discountType must be 'percent' or 'fixed', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: i64,
    #[serde(rename = "owner")]
    pub owner_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub code: String,
    pub image_url: Option<String>,
    /// PNG data URL of the redemption link, fixed at issuance.
    pub qr: String,
    pub expiry_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub redeemed: bool,
}

impl Coupon {
    /// A coupon without an expiry never lapses.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date.map_or(true, |expiry| expiry > now)
    }
}

/// Caller-supplied attributes for a new coupon.
#[derive(Debug, Clone)]
pub struct NewCoupon {
    pub title: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub expiry_date: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
}

impl NewCoupon {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_title(&self.title)?;
        validate_discount(self.discount_type, self.discount_value)
    }
}

/// Fields an owner may change after issuance. Anything else is rejected
/// before it reaches the store.
///
/// `description` and `expiry_date` are doubly optional: `Some(None)` clears
/// the stored value, `None` leaves it alone.
#[derive(Debug, Clone, Default)]
pub struct CouponPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<f64>,
    pub expiry_date: Option<Option<DateTime<Utc>>>,
    pub image_url: Option<String>,
}

impl CouponPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.discount_type.is_none()
            && self.discount_value.is_none()
            && self.expiry_date.is_none()
            && self.image_url.is_none()
    }

    /// Merges the patch into `coupon` and checks the result still holds.
    pub fn apply_to(self, coupon: &mut Coupon) -> Result<(), AppError> {
        if let Some(title) = self.title {
            coupon.title = title;
        }
        if let Some(description) = self.description {
            coupon.description = description;
        }
        if let Some(discount_type) = self.discount_type {
            coupon.discount_type = discount_type;
        }
        if let Some(discount_value) = self.discount_value {
            coupon.discount_value = discount_value;
        }
        if let Some(expiry_date) = self.expiry_date {
            coupon.expiry_date = expiry_date;
        }
        if let Some(image_url) = self.image_url {
            coupon.image_url = Some(image_url);
        }

        validate_title(&coupon.title)?;
        validate_discount(coupon.discount_type, coupon.discount_value)
    }
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CouponStats {
    pub total: usize,
    pub active: usize,
    pub expired: usize,
    pub percent: usize,
    pub fixed: usize,
}

impl CouponStats {
    pub fn collect(coupons: &[Coupon], now: DateTime<Utc>) -> Self {
        coupons.iter().fold(Self::default(), |mut stats, coupon| {
            stats.total += 1;
            if coupon.is_active_at(now) {
                stats.active += 1;
            } else {
                stats.expired += 1;
            }
            match coupon.discount_type {
                DiscountType::Percent => stats.percent += 1,
                DiscountType::Fixed => stats.fixed += 1,
            }
            stats
        })
    }
}

fn validate_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::Validation("title is required".to_string()));
    }
    Ok(())
}

pub fn validate_discount(discount_type: DiscountType, value: f64) -> Result<(), AppError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AppError::Validation(
            "discountValue must be a positive number".to_string(),
        ));
    }
    if discount_type == DiscountType::Percent && value > 100.0 {
        return Err(AppError::Validation(
            "percent discountValue cannot exceed 100".to_string(),
        ));
    }
    Ok(())
}

pub fn parse_discount_value(raw: &str) -> Result<f64, AppError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| AppError::Validation(format!("discountValue '{}' is not a number", raw)))
}

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` (midnight UTC).
/// Dates in the past are allowed.
pub fn parse_expiry(raw: &str) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AppError::Validation(format!("expiryDate '{}' is not a valid date", raw)))
}
