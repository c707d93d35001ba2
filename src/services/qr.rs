use std::io::Cursor;

use base64::{engine::general_purpose, Engine as _};
use image::Luma;
use qrcode::QrCode;

use crate::error::AppError;

const QR_SIZE: u32 = 300;

/// The link a customer lands on when scanning a coupon.
pub fn redemption_url(base_url: &str, code: &str) -> String {
    format!("{}/coupon/{}", base_url.trim_end_matches('/'), code)
}

/// Renders `url` as a PNG QR code and returns it as a `data:` URL, so the
/// payload can be shown without a second fetch.
pub fn render_data_url(url: &str) -> Result<String, AppError> {
    let qr = QrCode::new(url.as_bytes()).map_err(|e| AppError::Qr(e.to_string()))?;

    let qr_image = qr
        .render::<Luma<u8>>()
        .min_dimensions(QR_SIZE, QR_SIZE)
        .build();

    let mut buffer = Cursor::new(Vec::new());
    qr_image
        .write_to(&mut buffer, image::ImageFormat::Png)
        .map_err(|e| AppError::Qr(e.to_string()))?;

    let encoded = general_purpose::STANDARD.encode(buffer.into_inner());
    Ok(format!("data:image/png;base64,{}", encoded))
}

#[cfg(test)]
pub(crate) fn decode_data_url(data_url: &str) -> String {
    let encoded = data_url
        .strip_prefix("data:image/png;base64,")
        .expect("png data url");
    let png = general_purpose::STANDARD.decode(encoded).expect("valid base64");
    let gray = image::load_from_memory(&png).expect("valid png").to_luma8();

    let (width, height) = (gray.width() as usize, gray.height() as usize);
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| {
        gray.get_pixel(x as u32, y as u32).0[0]
    });
    let grids = prepared.detect_grids();
    assert_eq!(grids.len(), 1, "expected exactly one QR code");
    let (_meta, content) = grids[0].decode().expect("decodable QR");
    content
}
