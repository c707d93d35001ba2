pub mod code;
pub mod images;
pub mod issuance;
pub mod qr;
