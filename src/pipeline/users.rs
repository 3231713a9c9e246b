use crate::{
    messages::{Header, LINK_FRAME_ID, Point, RegionOfInterest, UserData, UserDataArray},
    types::{BoundingBox, User, UserFrame, Vector3},
};

pub fn assemble_users(frame: &UserFrame<'_>) -> UserDataArray {
    UserDataArray {
        header: Header::new(frame.timestamp, LINK_FRAME_ID),
        users: frame
            .users
            .iter()
            .map(|user| user_data(user, frame.width, frame.height))
            .collect(),
    }
}

fn user_data(user: &User, width: u32, height: u32) -> UserData {
    UserData {
        id: user.id,
        real: point(user.real),
        proj: point(user.proj),
        bbox: pixel_region(&user.bbox, width, height),
        occlusion: user.occlusion,
    }
}

fn point(v: Vector3) -> Point {
    Point {
        x: f64::from(v.x),
        y: f64::from(v.y),
        z: f64::from(v.z),
    }
}

/// Normalized box to pixel offset and size. Values truncate toward zero and
/// saturate at zero for boxes that poke past the frame edge.
fn pixel_region(bbox: &BoundingBox, width: u32, height: u32) -> RegionOfInterest {
    let (w, h) = (width as f32, height as f32);
    RegionOfInterest {
        x_offset: (bbox.left * w) as u32,
        y_offset: (bbox.top * h) as u32,
        width: ((bbox.right - bbox.left) * w) as u32,
        height: ((bbox.bottom - bbox.top) * h) as u32,
    }
}
