pub mod auth;
pub mod coupons;
