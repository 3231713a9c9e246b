use anyhow::{Result, anyhow};
use rayon::prelude::*;

use super::projection::{ProjectionModel, reconstruct};
use crate::{
    messages::{Header, LINK_FRAME_ID, PointCloud2, PointField, PointFieldType},
    types::DepthFrame,
};

/// x, y, z plus one padding float.
pub const POINT_STEP: u32 = 16;

fn xyz_fields() -> Vec<PointField> {
    ["x", "y", "z"]
        .into_iter()
        .enumerate()
        .map(|(i, name)| PointField {
            name,
            offset: i as u32 * PointFieldType::Float32.size(),
            datatype: PointFieldType::Float32,
            count: 1,
        })
        .collect()
}

/// Reconstructs every pixel of a depth frame, in raster order.
///
/// No sample is skipped, so the cloud is never dense.
pub fn assemble_depth(frame: &DepthFrame<'_>, projection: &ProjectionModel) -> Result<PointCloud2> {
    let width = frame.width as usize;
    let pixels = width * frame.height as usize;
    if frame.data.len() < pixels {
        return Err(anyhow!(
            "depth buffer too small: got {}, expected {}",
            frame.data.len(),
            pixels
        ));
    }

    let mut data = vec![0u8; pixels * POINT_STEP as usize];
    data.par_chunks_mut(POINT_STEP as usize)
        .zip(frame.data[..pixels].par_iter())
        .enumerate()
        .for_each(|(i, (record, &depth))| {
            let (row, col) = (i / width, i % width);
            let point = reconstruct(col as u32, row as u32, depth, projection);
            for (dst, value) in record.chunks_exact_mut(4).zip(point) {
                dst.copy_from_slice(&value.to_le_bytes());
            }
        });

    Ok(PointCloud2 {
        header: Header::new(frame.timestamp, LINK_FRAME_ID),
        width: frame.width,
        height: frame.height,
        fields: xyz_fields(),
        is_bigendian: false,
        point_step: POINT_STEP,
        row_step: POINT_STEP * frame.width,
        data,
        is_dense: false,
    })
}
