use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::coupon::{Coupon, CouponPatch, CouponStats, NewCoupon},
};

/// Inserts an issued coupon. A taken `code` yields [`AppError::DuplicateCode`]
/// so the issuer can retry with a fresh one.
pub async fn create(
    pool: &SqlitePool,
    owner_id: i64,
    new: &NewCoupon,
    code: &str,
    qr: &str,
) -> Result<Coupon, AppError> {
    sqlx::query_as::<_, Coupon>(
        "INSERT INTO coupons (owner_id, title, description, discount_type, discount_value,
                code, image_url, qr, expiry_date, created_at, redeemed)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
            RETURNING *",
    )
    .bind(owner_id)
    .bind(new.title.trim())
    .bind(new.description.as_deref())
    .bind(new.discount_type)
    .bind(new.discount_value)
    .bind(code)
    .bind(new.image_url.as_deref())
    .bind(qr)
    .bind(new.expiry_date)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if super::is_unique_violation(&e) {
            AppError::DuplicateCode
        } else {
            AppError::Sqlx(e)
        }
    })
}

/// All coupons of one owner, newest first. Unbounded.
pub async fn list_by_owner(pool: &SqlitePool, owner_id: i64) -> Result<Vec<Coupon>, sqlx::Error> {
    sqlx::query_as::<_, Coupon>(
        "SELECT * FROM coupons WHERE owner_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await
}

/// Public lookup, no ownership check.
pub async fn get_by_code(pool: &SqlitePool, code: &str) -> Result<Option<Coupon>, sqlx::Error> {
    sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = ?")
        .bind(code)
        .fetch_optional(pool)
        .await
}

pub async fn get_for_owner(
    pool: &SqlitePool,
    id: i64,
    owner_id: i64,
) -> Result<Option<Coupon>, sqlx::Error> {
    sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE id = ? AND owner_id = ?")
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await
}

/// Applies `patch` to a coupon owned by `owner_id`. Code, QR, owner,
/// creation time and the redeemed flag are never touched.
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    owner_id: i64,
    patch: CouponPatch,
) -> Result<Coupon, AppError> {
    let mut tx = pool.begin().await?;

    let mut coupon =
        sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("Coupon"))?;

    patch.apply_to(&mut coupon)?;

    let updated = sqlx::query_as::<_, Coupon>(
        "UPDATE coupons
            SET title = ?, description = ?, discount_type = ?, discount_value = ?,
                expiry_date = ?, image_url = ?
            WHERE id = ? AND owner_id = ?
            RETURNING *",
    )
    .bind(coupon.title.trim())
    .bind(coupon.description.as_deref())
    .bind(coupon.discount_type)
    .bind(coupon.discount_value)
    .bind(coupon.expiry_date)
    .bind(coupon.image_url.as_deref())
    .bind(id)
    .bind(owner_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(updated)
}

/// Deleting a missing or foreign coupon is reported as not found.
pub async fn delete(pool: &SqlitePool, id: i64, owner_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM coupons WHERE id = ? AND owner_id = ?")
        .bind(id)
        .bind(owner_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Coupon"));
    }
    Ok(())
}

pub async fn stats_for_owner(
    pool: &SqlitePool,
    owner_id: i64,
    now: DateTime<Utc>,
) -> Result<CouponStats, sqlx::Error> {
    let coupons = list_by_owner(pool, owner_id).await?;
    Ok(CouponStats::collect(&coupons, now))
}
