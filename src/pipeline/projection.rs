use crate::types::Vector3;

const MM_PER_M: f32 = 1000.0;

/// Pinhole projection of the depth sensor, valid for one session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectionModel {
    pub width: u32,
    pub height: u32,
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

impl ProjectionModel {
    /// Square-pixel model centred on the image from a horizontal field of view.
    pub fn from_hfov(width: u32, height: u32, hfov_rad: f32) -> Self {
        let fx = (width as f32 / 2.0) / (hfov_rad / 2.0).tan();
        Self {
            width,
            height,
            fx,
            fy: fx,
            cx: width as f32 / 2.0,
            cy: height as f32 / 2.0,
        }
    }

    /// Native real-world coordinates in millimeters: x right, y up, z forward.
    pub fn proj_to_real(&self, col: u32, row: u32, depth_mm: u16) -> Vector3 {
        let z = depth_mm as f32;
        Vector3 {
            x: (col as f32 - self.cx) * z / self.fx,
            y: (self.cy - row as f32) * z / self.fy,
            z,
        }
    }
}

/// Optical frame (mm) to robot frame (m): forward→X, left→Y, up→Z.
pub fn to_robot_frame(native: Vector3) -> [f32; 3] {
    [
        native.z / MM_PER_M,
        -native.x / MM_PER_M,
        native.y / MM_PER_M,
    ]
}

/// Reconstructs one pixel. Total over all depth values: a zero ("no return")
/// sample lands on the projection's zero-depth limit instead of being skipped.
pub fn reconstruct(col: u32, row: u32, depth_mm: u16, projection: &ProjectionModel) -> [f32; 3] {
    to_robot_frame(projection.proj_to_real(col, row, depth_mm))
}
