use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::{
    auth::AuthUser,
    db,
    error::AppError,
    models::coupon::{
        parse_discount_value, parse_expiry, Coupon, CouponPatch, CouponStats, DiscountType,
        NewCoupon,
    },
    services::issuance,
    AppState,
};

/// Raw multipart fields shared by create and update.
#[derive(Default)]
struct CouponForm {
    title: Option<String>,
    description: Option<String>,
    discount_type: Option<String>,
    discount_value: Option<String>,
    expiry_date: Option<String>,
    image: Option<(Option<String>, Bytes)>,
}

impl CouponForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = CouponForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "title" => form.title = Some(field.text().await?),
                "description" => form.description = Some(field.text().await?),
                "discountType" => form.discount_type = Some(field.text().await?),
                "discountValue" => form.discount_value = Some(field.text().await?),
                "expiryDate" => form.expiry_date = Some(field.text().await?),
                "image" => {
                    let file_name = field.file_name().map(str::to_string);
                    let bytes = field.bytes().await?;
                    // Browsers send an empty part when no file was picked.
                    if !bytes.is_empty() {
                        form.image = Some((file_name, bytes));
                    }
                }
                other => {
                    return Err(AppError::Validation(format!(
                        "unexpected field '{}'",
                        other
                    )))
                }
            }
        }

        Ok(form)
    }

    fn to_new_coupon(&self) -> Result<NewCoupon, AppError> {
        let title = self
            .title
            .clone()
            .ok_or_else(|| AppError::Validation("title is required".to_string()))?;
        let discount_type = self
            .discount_type
            .as_deref()
            .ok_or_else(|| AppError::Validation("discountType is required".to_string()))?
            .parse::<DiscountType>()?;
        let discount_value = self
            .discount_value
            .as_deref()
            .map(parse_discount_value)
            .transpose()?
            .ok_or_else(|| AppError::Validation("discountValue is required".to_string()))?;

        let new = NewCoupon {
            title,
            description: non_empty(self.description.as_deref()),
            discount_type,
            discount_value,
            expiry_date: non_empty(self.expiry_date.as_deref())
                .map(|raw| parse_expiry(&raw))
                .transpose()?,
            image_url: None,
        };
        new.validate()?;
        Ok(new)
    }

    fn to_patch(&self) -> Result<CouponPatch, AppError> {
        Ok(CouponPatch {
            title: self.title.clone(),
            description: self
                .description
                .as_deref()
                .map(|raw| non_empty(Some(raw))),
            discount_type: self
                .discount_type
                .as_deref()
                .map(str::parse::<DiscountType>)
                .transpose()?,
            discount_value: self
                .discount_value
                .as_deref()
                .map(parse_discount_value)
                .transpose()?,
            expiry_date: self
                .expiry_date
                .as_deref()
                .map(|raw| non_empty(Some(raw)).map(|raw| parse_expiry(&raw)).transpose())
                .transpose()?,
            image_url: None,
        })
    }

    async fn store_image(&self, state: &AppState) -> Result<Option<String>, AppError> {
        match &self.image {
            Some((file_name, bytes)) => state
                .images
                .save(file_name.as_deref(), bytes)
                .await
                .map(Some),
            None => Ok(None),
        }
    }
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub async fn create_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Coupon>), AppError> {
    let form = CouponForm::read(multipart).await?;
    let mut new = form.to_new_coupon()?;
    let stored_image = form.store_image(&state).await?;
    new.image_url = stored_image.clone();

    match issuance::issue(&state.db, &state.config.base_url, user.id, new).await {
        Ok(coupon) => Ok((StatusCode::CREATED, Json(coupon))),
        Err(e) => {
            if let Some(reference) = stored_image {
                state.images.remove(&reference).await;
            }
            Err(e)
        }
    }
}

pub async fn list_coupons(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Coupon>>, AppError> {
    let coupons = db::coupons::list_by_owner(&state.db, user.id).await?;
    Ok(Json(coupons))
}

pub async fn coupon_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<CouponStats>, AppError> {
    let stats = db::coupons::stats_for_owner(&state.db, user.id, Utc::now()).await?;
    Ok(Json(stats))
}

pub async fn get_coupon_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Coupon>, AppError> {
    db::coupons::get_for_owner(&state.db, id, user.id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Coupon"))
}

/// Public: anyone holding the code (or the QR link) may view the coupon.
pub async fn get_coupon_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Coupon>, AppError> {
    db::coupons::get_by_code(&state.db, &code)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Coupon"))
}

pub async fn update_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<Coupon>, AppError> {
    let form = CouponForm::read(multipart).await?;
    let mut patch = form.to_patch()?;
    if patch.is_empty() && form.image.is_none() {
        return Err(AppError::Validation("no fields to update".to_string()));
    }

    // Ownership and the merged fields are checked before anything touches disk.
    let mut preview = db::coupons::get_for_owner(&state.db, id, user.id)
        .await?
        .ok_or(AppError::NotFound("Coupon"))?;
    patch.clone().apply_to(&mut preview)?;

    let stored_image = form.store_image(&state).await?;
    patch.image_url = stored_image.clone();

    match db::coupons::update(&state.db, id, user.id, patch).await {
        Ok(coupon) => {
            tracing::info!(owner_id = user.id, "Updated coupon {}", coupon.id);
            Ok(Json(coupon))
        }
        Err(e) => {
            if let Some(reference) = stored_image {
                state.images.remove(&reference).await;
            }
            Err(e)
        }
    }
}

pub async fn delete_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    db::coupons::delete(&state.db, id, user.id).await?;
    tracing::info!(owner_id = user.id, "Deleted coupon {}", id);
    Ok(Json(json!({ "message": "Coupon deleted successfully" })))
}
