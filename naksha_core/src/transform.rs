use crate::error::ClassifierError;
use image::{
    error::{ParameterError, ParameterErrorKind},
    imageops::{self, FilterType},
    DynamicImage, ImageError, RgbImage,
};
use ndarray::{Array, Ix4};
use std::{io::Cursor, path::Path};

pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Shorter-side resize, centre crop, `[0, 1]` scaling and per-channel
/// normalisation into a `[1, 3, crop, crop]` NCHW tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTransform {
    resize: u32,
    crop: u32,
    mean: [f32; 3],
    std: [f32; 3],
}

impl ImageTransform {
    /// `crop` is clamped to `resize`, the shorter side after resizing.
    pub fn new(resize: u32, crop: u32, mean: [f32; 3], std: [f32; 3]) -> Self {
        Self {
            resize,
            crop: crop.min(resize),
            mean,
            std,
        }
    }

    /// Resize 256, crop 224, ImageNet mean/std.
    pub fn imagenet() -> Self {
        Self::new(256, 224, IMAGENET_MEAN, IMAGENET_STD)
    }

    /// Transform used by YOLO classification exports: the shorter side is
    /// resized straight to the input size and pixels are only scaled.
    pub fn yolo_classify(input_size: u32) -> Self {
        Self::new(input_size, input_size, [0.0; 3], [1.0; 3])
    }

    pub fn with_normalization(mut self, mean: [f32; 3], std: [f32; 3]) -> Self {
        self.mean = mean;
        self.std = std;
        self
    }

    pub fn decode(image_data: &[u8]) -> Result<DynamicImage, ClassifierError> {
        let image_reader = image::ImageReader::new(Cursor::new(image_data))
            .with_guessed_format()
            .map_err(ImageError::IoError)?;

        Ok(image_reader.decode()?)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<DynamicImage, ClassifierError> {
        Ok(image::open(path)?)
    }

    pub fn apply(&self, image: &DynamicImage) -> Result<Array<f32, Ix4>, ClassifierError> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Err(ClassifierError::Decode(ImageError::Parameter(
                ParameterError::from_kind(ParameterErrorKind::DimensionMismatch),
            )));
        }

        let (new_width, new_height) = shorter_side_size(width, height, self.resize);
        let resized = if (new_width, new_height) == (width, height) {
            rgb
        } else {
            imageops::resize(&rgb, new_width, new_height, FilterType::Triangle)
        };

        let cropped = center_crop(&resized, self.crop);

        let size = self.crop as usize;
        let mut input = Array::zeros((1, 3, size, size));
        for (x, y, pixel) in cropped.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                let value = pixel.0[c] as f32 / 255.0;
                input[[0, c, y, x]] = (value - self.mean[c]) / self.std[c];
            }
        }

        Ok(input)
    }
}

/// Output size when the shorter side becomes `size`. The longer side is
/// truncated, not rounded.
pub fn shorter_side_size(width: u32, height: u32, size: u32) -> (u32, u32) {
    if width <= height {
        let long = (size as u64 * height as u64 / width as u64) as u32;
        (size, long)
    } else {
        let long = (size as u64 * width as u64 / height as u64) as u32;
        (long, size)
    }
}

/// Offsets round half to even.
fn center_crop(image: &RgbImage, crop: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let left = ((width.saturating_sub(crop)) as f32 / 2.0).round_ties_even() as u32;
    let top = ((height.saturating_sub(crop)) as f32 / 2.0).round_ties_even() as u32;

    imageops::crop_imm(image, left, top, crop, crop).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn encode_png(img: &RgbImage) -> Vec<u8> {
        let mut image_data: Vec<u8> = Vec::new();
        let mut cursor = Cursor::new(&mut image_data);
        img.write_to(&mut cursor, image::ImageFormat::Png).unwrap();
        image_data
    }

    #[test]
    fn test_shorter_side_size() {
        assert_eq!(shorter_side_size(640, 480, 256), (341, 256));
        assert_eq!(shorter_side_size(480, 640, 256), (256, 341));
        assert_eq!(shorter_side_size(300, 300, 256), (256, 256));
        assert_eq!(shorter_side_size(224, 224, 256), (256, 256));
    }

    #[test]
    fn test_center_crop_rounds_half_to_even() {
        let img = ImageBuffer::from_fn(5, 4, |x, _| Rgb([x as u8, 0, 0]));
        let cropped = center_crop(&img, 2);

        // (5 - 2) / 2 = 1.5 rounds to 2, (4 - 2) / 2 = 1
        assert_eq!(cropped.dimensions(), (2, 2));
        assert_eq!(cropped.get_pixel(0, 0).0[0], 2);
    }

    #[test]
    fn test_imagenet_transform_shape() {
        let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(640, 480, Rgb([255, 0, 0]));
        let image = DynamicImage::ImageRgb8(img);

        let input = ImageTransform::imagenet().apply(&image).unwrap();

        assert_eq!(input.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn test_black_image_normalizes_to_negative_mean_over_std() {
        let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(224, 224, Rgb([0, 0, 0]));
        let image = DynamicImage::ImageRgb8(img);

        let input = ImageTransform::imagenet().apply(&image).unwrap();

        for c in 0..3 {
            let expected = -IMAGENET_MEAN[c] / IMAGENET_STD[c];
            assert!((input[[0, c, 0, 0]] - expected).abs() < 1e-6);
            assert!((input[[0, c, 223, 223]] - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_yolo_classify_scales_to_unit_range() {
        let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(100, 100, Rgb([255, 0, 51]));
        let image = DynamicImage::ImageRgb8(img);

        let input = ImageTransform::yolo_classify(64).apply(&image).unwrap();

        assert_eq!(input.shape(), &[1, 3, 64, 64]);
        assert!((input[[0, 0, 10, 10]] - 1.0).abs() < 1e-6);
        assert!(input[[0, 1, 10, 10]].abs() < 1e-6);
        assert!((input[[0, 2, 10, 10]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_decode_png_bytes() {
        let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(100, 80, Rgb([255, 0, 0]));
        let image = ImageTransform::decode(&encode_png(&img)).unwrap();

        assert_eq!((image.width(), image.height()), (100, 80));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = ImageTransform::decode(b"definitely not an image");

        assert!(matches!(result, Err(ClassifierError::Decode(_))));
    }

    #[test]
    fn test_open_missing_file() {
        let result = ImageTransform::open("/nonexistent/naksha/photo.jpg");

        assert!(matches!(result, Err(ClassifierError::Decode(_))));
    }
}
