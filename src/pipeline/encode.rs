//! Image encoding: declared JPEG/PNG bytes → [`EmbeddedImage`] for an image
//! XObject.
//!
//! Images are decoded strictly as their declared format; there is no
//! sniffing. JPEGs are normalised to baseline RGB JPEG (so CMYK and
//! grayscale sources display correctly under `/DeviceRGB`), PNGs become raw
//! RGB samples plus a soft mask when they carry alpha.

use crate::pipeline::document::{EmbeddedImage, ImageEncoding};
use crate::pipeline::input::ImageFormat;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

const JPEG_QUALITY: u8 = 92;

/// Decode `bytes` as `format` and prepare it for embedding.
pub fn encode_image(bytes: &[u8], format: ImageFormat) -> Result<EmbeddedImage, image::ImageError> {
    let img = image::load_from_memory_with_format(bytes, format.codec())?;
    let (width, height) = (img.width(), img.height());

    let encoding = match format {
        ImageFormat::Jpeg => ImageEncoding::Jpeg(reencode_jpeg(&img)?),
        ImageFormat::Png => split_alpha(&img),
    };
    debug!(width, height, ?format, "encoded image");

    Ok(EmbeddedImage {
        width,
        height,
        encoding,
    })
}

fn reencode_jpeg(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY).encode_image(&rgb)?;
    Ok(buf)
}

fn split_alpha(img: &DynamicImage) -> ImageEncoding {
    if !img.color().has_alpha() {
        return ImageEncoding::Rgb {
            samples: img.to_rgb8().into_raw(),
            alpha: None,
        };
    }
    let rgba = img.to_rgba8();
    let pixels = rgba.as_raw().len() / 4;
    let mut samples = Vec::with_capacity(pixels * 3);
    let mut alpha = Vec::with_capacity(pixels);
    for px in rgba.as_raw().chunks_exact(4) {
        samples.extend_from_slice(&px[..3]);
        alpha.push(px[3]);
    }
    ImageEncoding::Rgb {
        samples,
        alpha: Some(alpha),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(img: DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .expect("encode png");
        buf
    }

    #[test]
    fn opaque_png_has_no_mask() {
        let bytes = png_bytes(DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, Rgb([1, 2, 3]))));
        let img = encode_image(&bytes, ImageFormat::Png).expect("decode");
        assert_eq!((img.width, img.height), (4, 3));
        match img.encoding {
            ImageEncoding::Rgb { samples, alpha } => {
                assert_eq!(samples.len(), 4 * 3 * 3);
                assert!(alpha.is_none());
            }
            other => panic!("unexpected encoding {other:?}"),
        }
    }

    #[test]
    fn transparent_png_gets_a_mask() {
        let bytes = png_bytes(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            2,
            2,
            Rgba([10, 20, 30, 40]),
        )));
        match encode_image(&bytes, ImageFormat::Png).expect("decode").encoding {
            ImageEncoding::Rgb { samples, alpha } => {
                assert_eq!(&samples[..3], &[10, 20, 30]);
                assert_eq!(alpha, Some(vec![40; 4]));
            }
            other => panic!("unexpected encoding {other:?}"),
        }
    }

    #[test]
    fn jpeg_is_reencoded_as_jpeg() {
        let mut src = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([200, 10, 10])))
            .write_to(&mut Cursor::new(&mut src), image::ImageFormat::Jpeg)
            .expect("encode jpeg");
        let img = encode_image(&src, ImageFormat::Jpeg).expect("decode");
        match img.encoding {
            ImageEncoding::Jpeg(bytes) => assert_eq!(&bytes[..2], &[0xFF, 0xD8]),
            other => panic!("unexpected encoding {other:?}"),
        }
    }

    #[test]
    fn declared_type_is_trusted() {
        let png = png_bytes(DynamicImage::ImageRgb8(RgbImage::new(2, 2)));
        assert!(encode_image(&png, ImageFormat::Jpeg).is_err());
        assert!(encode_image(b"not an image", ImageFormat::Png).is_err());
    }
}
