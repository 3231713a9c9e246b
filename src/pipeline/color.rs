use anyhow::{Result, anyhow};
use rayon::prelude::*;

use crate::{
    messages::{Header, Image, LINK_FRAME_ID},
    types::{Bgr, ColorFrame},
};

pub const RGB8: &str = "rgb8";

/// Copies a native BGR frame out into an interleaved RGB image.
pub fn assemble_color(frame: &ColorFrame<'_>) -> Result<Image> {
    let pixels = frame.width as usize * frame.height as usize;
    if frame.data.len() < pixels {
        return Err(anyhow!(
            "color buffer too small: got {}, expected {}",
            frame.data.len(),
            pixels
        ));
    }

    Ok(Image {
        header: Header::new(frame.timestamp, LINK_FRAME_ID),
        width: frame.width,
        height: frame.height,
        encoding: RGB8,
        is_bigendian: false,
        step: 3 * frame.width,
        data: bgr_to_rgb(&frame.data[..pixels]),
    })
}

fn bgr_to_rgb(src: &[Bgr]) -> Vec<u8> {
    let mut rgb = vec![0u8; src.len() * 3];
    rgb.par_chunks_mut(3)
        .zip(src.par_iter())
        .for_each(|(dst, px)| {
            dst[0] = px.red;
            dst[1] = px.green;
            dst[2] = px.blue;
        });
    rgb
}
