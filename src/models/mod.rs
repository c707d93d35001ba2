pub mod coupon;
pub mod user;
