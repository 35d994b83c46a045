//! Camera image transform and JPEG encoding
//!
//! Turns a raw sensor buffer into the compact portrait JPEG the page draws
//! behind its content: colour conversion to sRGB, 90° rotation, centre crop
//! to the viewport aspect, fixed 0.5x downscale, encode.

use image::{
    codecs::jpeg::JpegEncoder,
    imageops::{self, FilterType},
    ExtendedColorType, ImageEncoder, RgbImage,
};

use super::shared_state::EncodedFrame;
use crate::config::compression::{DOWNSCALE_FACTOR, JPEG_QUALITY};
use crate::error::EncodeError;
use crate::tracking::{CameraImage, PixelFormat};

/// Region of the rotated image kept by the centre crop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Centre crop of a `width`x`height` image to `target_aspect` (width / height)
///
/// Wider images lose columns, taller images lose rows; the result always
/// fills the viewport.
pub fn center_crop(width: u32, height: u32, target_aspect: f64) -> CropRect {
    let image_aspect = width as f64 / height as f64;
    if image_aspect > target_aspect {
        let crop_width = ((height as f64 * target_aspect).round() as u32).clamp(1, width);
        CropRect {
            x: (width - crop_width) / 2,
            y: 0,
            width: crop_width,
            height,
        }
    } else {
        let crop_height = ((width as f64 / target_aspect).round() as u32).clamp(1, height);
        CropRect {
            x: 0,
            y: (height - crop_height) / 2,
            width,
            height: crop_height,
        }
    }
}

/// Output size after the fixed downscale
pub fn downscaled(width: u32, height: u32) -> (u32, u32) {
    (
        (width / DOWNSCALE_FACTOR).max(1),
        (height / DOWNSCALE_FACTOR).max(1),
    )
}

/// Reusable encoder owned by the session bridge
#[derive(Debug, Clone)]
pub struct FrameEncoder {
    quality: u8,
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(JPEG_QUALITY)
    }
}

impl FrameEncoder {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    /// Rotate, crop, downscale and encode `image` for a viewport of `target_aspect`
    pub fn transform(
        &self,
        image: &CameraImage,
        target_aspect: f64,
    ) -> Result<EncodedFrame, EncodeError> {
        let portrait = self.prepare(image, target_aspect)?;
        let (width, height) = portrait.dimensions();

        let mut jpeg_data = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg_data, self.quality).write_image(
            portrait.as_raw(),
            width,
            height,
            ExtendedColorType::Rgb8,
        )?;

        Ok(EncodedFrame::new(jpeg_data, width, height))
    }

    /// Everything but the final encode
    fn prepare(&self, image: &CameraImage, target_aspect: f64) -> Result<RgbImage, EncodeError> {
        if image.width == 0 || image.height == 0 {
            return Err(EncodeError::EmptySource {
                width: image.width,
                height: image.height,
            });
        }
        if !target_aspect.is_finite() || target_aspect <= 0.0 {
            return Err(EncodeError::InvalidAspect(target_aspect));
        }

        let rgb = to_srgb(image)?;
        // Sensor buffers arrive landscape; the display is portrait.
        let rotated = imageops::rotate90(&rgb);

        let crop = center_crop(rotated.width(), rotated.height(), target_aspect);
        let cropped =
            imageops::crop_imm(&rotated, crop.x, crop.y, crop.width, crop.height).to_image();

        let (width, height) = downscaled(crop.width, crop.height);
        Ok(imageops::resize(&cropped, width, height, FilterType::Triangle))
    }
}

/// Convert a camera buffer to packed 8-bit sRGB, dropping row padding
///
/// The colour space is fixed here rather than inferred from the buffer;
/// NV12 uses the full-range BT.601 matrix.
fn to_srgb(image: &CameraImage) -> Result<RgbImage, EncodeError> {
    let width = image.width as usize;
    let height = image.height as usize;
    let stride = image.bytes_per_row;
    let mut rgb = Vec::with_capacity(width * height * 3);

    match image.format {
        PixelFormat::Rgba8 | PixelFormat::Bgra8 => {
            let row_bytes = width * 4;
            check_layout(image, row_bytes, stride * (height - 1) + row_bytes)?;

            for row in image.data.chunks(stride).take(height) {
                for px in row[..row_bytes].chunks_exact(4) {
                    match image.format {
                        PixelFormat::Bgra8 => rgb.extend_from_slice(&[px[2], px[1], px[0]]),
                        _ => rgb.extend_from_slice(&px[..3]),
                    }
                }
            }
        }
        PixelFormat::Nv12 => {
            if width % 2 != 0 || height % 2 != 0 {
                return Err(EncodeError::OddChromaGeometry {
                    width: image.width,
                    height: image.height,
                });
            }
            let luma_bytes = stride * height;
            check_layout(image, width, luma_bytes + stride * (height / 2 - 1) + width)?;

            let (luma, chroma) = image.data.split_at(luma_bytes);
            for y in 0..height {
                let luma_row = &luma[y * stride..y * stride + width];
                let chroma_row = &chroma[(y / 2) * stride..(y / 2) * stride + width];
                for (x, &l) in luma_row.iter().enumerate() {
                    let pair = x & !1;
                    rgb.extend_from_slice(&ycbcr_to_rgb(l, chroma_row[pair], chroma_row[pair + 1]));
                }
            }
        }
    }

    let expected = width * height * 3;
    RgbImage::from_raw(image.width, image.height, rgb).ok_or(EncodeError::BufferTooSmall {
        expected,
        actual: image.data.len(),
    })
}

fn check_layout(image: &CameraImage, row_bytes: usize, needed: usize) -> Result<(), EncodeError> {
    if image.bytes_per_row < row_bytes {
        return Err(EncodeError::StrideTooSmall {
            bytes_per_row: image.bytes_per_row,
            width: image.width,
        });
    }
    if image.data.len() < needed {
        return Err(EncodeError::BufferTooSmall {
            expected: needed,
            actual: image.data.len(),
        });
    }
    Ok(())
}

fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> [u8; 3] {
    let y = y as f32;
    let cb = cb as f32 - 128.0;
    let cr = cr as f32 - 128.0;
    let clamp = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    [
        clamp(y + 1.402 * cr),
        clamp(y - 0.344_136 * cb - 0.714_136 * cr),
        clamp(y + 1.772 * cb),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn solid_rgba(width: u32, height: u32, px: [u8; 4]) -> CameraImage {
        let data = px.repeat((width * height) as usize);
        CameraImage::packed(width, height, PixelFormat::Rgba8, data)
    }

    fn decode(frame: &EncodedFrame) -> RgbImage {
        image::load_from_memory(frame.data()).unwrap().to_rgb8()
    }

    fn close(a: [u8; 3], b: [u8; 3]) -> bool {
        a.iter().zip(b).all(|(x, y)| (*x as i16 - y as i16).abs() <= 12)
    }

    #[test]
    fn test_landscape_720p_to_portrait_viewport() {
        let encoder = FrameEncoder::default();
        let image = CameraImage::packed(1280, 720, PixelFormat::Nv12, vec![128; 1280 * 720 * 3 / 2]);

        assert_eq!(
            center_crop(720, 1280, 0.5625),
            CropRect {
                x: 0,
                y: 0,
                width: 720,
                height: 1280
            }
        );

        let frame = encoder.transform(&image, 0.5625).unwrap();
        assert_eq!((frame.width(), frame.height()), (360, 640));
        assert_eq!(decode(&frame).dimensions(), (360, 640));
    }

    #[test]
    fn test_crop_square_viewport_keeps_width() {
        let crop = center_crop(720, 1280, 1.0);
        assert_eq!(crop.width, 720);
        assert_eq!(crop.height, 720);
        assert_eq!(crop.y, 280);
        assert_eq!(downscaled(crop.width, crop.height), (360, 360));
    }

    #[test]
    fn test_crop_narrow_viewport_keeps_height() {
        let crop = center_crop(720, 1280, 0.25);
        assert_eq!((crop.x, crop.width, crop.height), (200, 320, 1280));
    }

    #[test]
    fn test_zero_sized_source_fails() {
        let encoder = FrameEncoder::default();
        let image = CameraImage::packed(0, 720, PixelFormat::Rgba8, Vec::new());
        assert!(matches!(
            encoder.transform(&image, 0.5),
            Err(EncodeError::EmptySource { .. })
        ));
    }

    #[test]
    fn test_zero_viewport_fails() {
        let encoder = FrameEncoder::default();
        let image = solid_rgba(8, 4, [0, 0, 0, 255]);
        assert!(matches!(
            encoder.transform(&image, 0.0),
            Err(EncodeError::InvalidAspect(_))
        ));
        assert!(matches!(
            encoder.transform(&image, f64::NAN),
            Err(EncodeError::InvalidAspect(_))
        ));
    }

    #[test]
    fn test_short_buffer_fails() {
        let encoder = FrameEncoder::default();
        let image = CameraImage::packed(8, 4, PixelFormat::Rgba8, vec![0; 20]);
        assert!(matches!(
            encoder.transform(&image, 0.5),
            Err(EncodeError::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn test_odd_nv12_fails() {
        let encoder = FrameEncoder::default();
        let image = CameraImage::packed(7, 4, PixelFormat::Nv12, vec![0; 64]);
        assert!(matches!(
            encoder.transform(&image, 0.5),
            Err(EncodeError::OddChromaGeometry { .. })
        ));
    }

    #[test]
    fn test_row_padding_is_skipped() {
        // 4x2 RGBA rows padded to 32 bytes with garbage
        let mut data = Vec::new();
        for _ in 0..2 {
            data.extend_from_slice(&[10, 20, 30, 255].repeat(4));
            data.extend_from_slice(&[0xEE; 16]);
        }
        let image = CameraImage {
            width: 4,
            height: 2,
            bytes_per_row: 32,
            format: PixelFormat::Rgba8,
            data,
        };
        let rgb = to_srgb(&image).unwrap();
        assert!(rgb.pixels().all(|p| p.0 == [10, 20, 30]));
    }

    #[test]
    fn test_bgra_is_swizzled() {
        let encoder = FrameEncoder::default();
        let image = CameraImage::packed(
            32,
            16,
            PixelFormat::Bgra8,
            [255, 0, 0, 255].repeat(32 * 16),
        );
        let frame = encoder.transform(&image, 0.5).unwrap();
        let decoded = decode(&frame);
        assert!(close(decoded.get_pixel(4, 4).0, [0, 0, 255]));
    }

    #[test]
    fn test_neutral_nv12_is_gray() {
        assert_eq!(ycbcr_to_rgb(128, 128, 128), [128, 128, 128]);
        assert_eq!(ycbcr_to_rgb(0, 128, 128), [0, 0, 0]);
        assert_eq!(ycbcr_to_rgb(255, 128, 128), [255, 255, 255]);
        // pure red in full-range BT.601
        assert!(close(ycbcr_to_rgb(76, 85, 255), [255, 0, 0]));
    }

    #[test]
    fn test_rotation_is_clockwise() {
        // Left half red, right half blue. After a clockwise quarter turn the
        // left edge becomes the top edge.
        let (width, height) = (16u32, 8u32);
        let mut data = Vec::new();
        for _ in 0..height {
            for x in 0..width {
                let px = if x < width / 2 {
                    [255, 0, 0, 255]
                } else {
                    [0, 0, 255, 255]
                };
                data.extend_from_slice(&px);
            }
        }
        let image = CameraImage::packed(width, height, PixelFormat::Rgba8, data);
        let portrait = FrameEncoder::default().prepare(&image, 0.5).unwrap();
        assert_eq!(portrait.dimensions(), (4, 8));
        assert!(close(portrait.get_pixel(0, 0).0, [255, 0, 0]));
        assert!(close(portrait.get_pixel(3, 7).0, [0, 0, 255]));
    }

    proptest! {
        #[test]
        fn test_crop_matches_target_aspect(
            width in 1u32..4000,
            height in 1u32..4000,
            target in 0.1f64..10.0,
        ) {
            let crop = center_crop(width, height, target);
            prop_assert!(crop.width <= width && crop.height <= height);
            prop_assert!(crop.x + crop.width <= width && crop.y + crop.height <= height);
            if crop.width < width {
                prop_assert_eq!(crop.height, height);
                prop_assert!((crop.width as f64 - height as f64 * target).abs() <= 1.0);
            }
            if crop.height < height {
                prop_assert_eq!(crop.width, width);
                prop_assert!((crop.height as f64 - width as f64 / target).abs() <= 1.0);
            }
        }

        #[test]
        fn test_transform_dimensions(
            half_width in 1u32..40,
            half_height in 1u32..40,
            target in 0.2f64..5.0,
        ) {
            let (width, height) = (half_width * 2, half_height * 2);
            let image = CameraImage::packed(width, height, PixelFormat::Nv12, vec![90; (width * height * 3 / 2) as usize]);
            let frame = FrameEncoder::default().transform(&image, target).unwrap();

            // rotated dimensions are (height, width)
            let crop = center_crop(height, width, target);
            prop_assert_eq!(frame.width(), (crop.width / 2).max(1));
            prop_assert_eq!(frame.height(), (crop.height / 2).max(1));
        }
    }
}
