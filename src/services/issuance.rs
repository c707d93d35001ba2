use sqlx::SqlitePool;

use crate::{
    db,
    error::AppError,
    models::coupon::{Coupon, NewCoupon},
    services::{code, qr},
};

/// A code collision is regenerated this many times before giving up.
const COLLISION_RETRIES: usize = 1;

/// Validates `new`, mints a code and QR for it and stores the coupon under
/// `owner_id`.
pub async fn issue(
    pool: &SqlitePool,
    base_url: &str,
    owner_id: i64,
    new: NewCoupon,
) -> Result<Coupon, AppError> {
    issue_with(pool, base_url, owner_id, new, code::generate_code).await
}

async fn issue_with<F>(
    pool: &SqlitePool,
    base_url: &str,
    owner_id: i64,
    new: NewCoupon,
    mut next_code: F,
) -> Result<Coupon, AppError>
where
    F: FnMut() -> String,
{
    new.validate()?;

    let mut attempt = 0;
    loop {
        let code = next_code();
        let qr = qr::render_data_url(&qr::redemption_url(base_url, &code))?;

        match db::coupons::create(pool, owner_id, &new, &code, &qr).await {
            Ok(coupon) => {
                tracing::info!(owner_id, code = %coupon.code, "Issued coupon {}", coupon.id);
                return Ok(coupon);
            }
            Err(AppError::DuplicateCode) if attempt < COLLISION_RETRIES => {
                tracing::warn!(owner_id, "Coupon code collision, regenerating");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
