use image::{Rgb, RgbImage};
use ndarray::prelude::*;

use crate::errors::{PersonSegError, Result};

/// Sentinel color painted over person pixels.
pub const PERSON_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

/// Paints [`PERSON_COLOR`] over every flagged pixel of `image`, in place.
/// Unflagged pixels keep the resized original RGB.
///
/// The grid must be 1:1 with the image: the model's output grid matches its
/// input grid pixel-for-pixel.
pub fn paint_person_pixels(image: &mut RgbImage, is_person: ArrayView2<'_, bool>) -> Result<()> {
    let (height, width) = is_person.dim();
    if (width, height) != (image.width() as usize, image.height() as usize) {
        return Err(PersonSegError::Validation {
            field: "mask dimensions".to_string(),
            reason: format!(
                "mask is {}x{} but image is {}x{}",
                width,
                height,
                image.width(),
                image.height()
            ),
        });
    }

    for ((y, x), &person) in is_person.indexed_iter() {
        if person {
            image.put_pixel(x as u32, y as u32, PERSON_COLOR);
        }
    }

    Ok(())
}
