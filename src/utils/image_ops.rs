use crate::core::errors::DecodeError;
use crate::core::types::PixelGrid;

/// Decodes encoded image bytes (JPEG/PNG) into a BGR pixel grid.
///
/// The decoder normalizes whatever the source format was to RGB first, then
/// reorders channels to the BGR layout the inference engine expects.
/// Fails with [`DecodeError`] if the bytes are not a valid image.
pub fn decode_image(bytes: &[u8]) -> Result<PixelGrid, DecodeError> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut data = Vec::with_capacity(width as usize * height as usize * 3);
    for pixel in rgb.pixels() {
        let [r, g, b] = pixel.0;
        data.extend_from_slice(&[b, g, r]);
    }

    Ok(PixelGrid {
        width,
        height,
        data,
    })
}
