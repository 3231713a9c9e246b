use std::time::SystemTime;

pub const LINK_FRAME_ID: &str = "nuitrack_link";

#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    pub stamp: SystemTime,
    pub frame_id: String,
}

impl Header {
    pub fn new(stamp: SystemTime, frame_id: &str) -> Self {
        Self {
            stamp,
            frame_id: frame_id.to_string(),
        }
    }
}

/// Interleaved 8-bit image.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    pub header: Header,
    pub width: u32,
    pub height: u32,
    pub encoding: &'static str,
    pub is_bigendian: bool,
    /// Row length in bytes.
    pub step: u32,
    pub data: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointFieldType {
    Float32,
}

impl PointFieldType {
    pub fn size(self) -> u32 {
        match self {
            PointFieldType::Float32 => 4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PointField {
    pub name: &'static str,
    pub offset: u32,
    pub datatype: PointFieldType,
    pub count: u32,
}

/// Structured point collection. Points are stored little-endian, one
/// `point_step`-sized record per point, in raster order.
#[derive(Clone, Debug, PartialEq)]
pub struct PointCloud2 {
    pub header: Header,
    pub width: u32,
    pub height: u32,
    pub fields: Vec<PointField>,
    pub is_bigendian: bool,
    pub point_step: u32,
    pub row_step: u32,
    pub data: Vec<u8>,
    pub is_dense: bool,
}

impl PointCloud2 {
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Reads back the `x`, `y`, `z` fields of point `index`.
    #[cfg(test)]
    pub fn point(&self, index: usize) -> Option<[f32; 3]> {
        let step = self.point_step as usize;
        let record = self.data.get(index * step..(index + 1) * step)?;
        let mut xyz = [0.0f32; 3];
        for (slot, name) in xyz.iter_mut().zip(["x", "y", "z"]) {
            let field = self.fields.iter().find(|f| f.name == name)?;
            let offset = field.offset as usize;
            let bytes: [u8; 4] = record.get(offset..offset + 4)?.try_into().ok()?;
            *slot = f32::from_le_bytes(bytes);
        }
        Some(xyz)
    }

    #[cfg(test)]
    pub fn points(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        (0..self.len()).filter_map(|index| self.point(index))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    #[cfg(test)]
    pub fn norm(&self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pose {
    pub position: Point,
    pub orientation: Quaternion,
}

/// Pixel-space region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegionOfInterest {
    pub x_offset: u32,
    pub y_offset: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UserData {
    pub id: i32,
    pub real: Point,
    pub proj: Point,
    pub bbox: RegionOfInterest,
    pub occlusion: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UserDataArray {
    pub header: Header,
    pub users: Vec<UserData>,
}

/// One skeleton; `joints`, `confidences` and `joint_poses` are parallel.
#[derive(Clone, Debug, PartialEq)]
pub struct SkeletonData {
    pub id: i32,
    pub joints: Vec<&'static str>,
    pub confidences: Vec<f32>,
    pub joint_poses: Vec<Pose>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SkeletonDataArray {
    pub header: Header,
    pub skeletons: Vec<SkeletonData>,
}

/// Presence change: the user that triggered it and the roster afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventUserUpdate {
    pub key_id: i32,
    pub user_ids: Vec<i32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    ColorImage,
    DepthPoints,
    Skeletons,
    Users,
    PersonAppeared,
    PersonDisappeared,
}

impl Topic {
    pub const ALL: [Topic; 6] = [
        Topic::ColorImage,
        Topic::DepthPoints,
        Topic::Skeletons,
        Topic::Users,
        Topic::PersonAppeared,
        Topic::PersonDisappeared,
    ];

    /// Publisher queue depth for the topic.
    pub fn queue_depth(self) -> usize {
        match self {
            Topic::ColorImage | Topic::DepthPoints | Topic::Skeletons => 1,
            Topic::Users | Topic::PersonAppeared | Topic::PersonDisappeared => 10,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    ColorImage(Image),
    DepthPoints(PointCloud2),
    Skeletons(SkeletonDataArray),
    Users(UserDataArray),
    PersonAppeared(EventUserUpdate),
    PersonDisappeared(EventUserUpdate),
}

impl Message {
    pub fn topic(&self) -> Topic {
        match self {
            Message::ColorImage(_) => Topic::ColorImage,
            Message::DepthPoints(_) => Topic::DepthPoints,
            Message::Skeletons(_) => Topic::Skeletons,
            Message::Users(_) => Topic::Users,
            Message::PersonAppeared(_) => Topic::PersonAppeared,
            Message::PersonDisappeared(_) => Topic::PersonDisappeared,
        }
    }

    /// One-line description for logs.
    pub fn summary(&self) -> String {
        match self {
            Message::ColorImage(img) => {
                format!("image {}x{} {}", img.width, img.height, img.encoding)
            }
            Message::DepthPoints(cloud) => {
                format!(
                    "cloud {}x{} ({} points) in {}",
                    cloud.width,
                    cloud.height,
                    cloud.len(),
                    cloud.header.frame_id
                )
            }
            Message::Skeletons(msg) => {
                let ids: Vec<i32> = msg.skeletons.iter().map(|s| s.id).collect();
                format!("skeletons {ids:?}")
            }
            Message::Users(msg) => {
                let ids: Vec<i32> = msg.users.iter().map(|u| u.id).collect();
                format!("users {ids:?}")
            }
            Message::PersonAppeared(evt) => {
                format!("user {} appeared, roster {:?}", evt.key_id, evt.user_ids)
            }
            Message::PersonDisappeared(evt) => {
                format!("user {} disappeared, roster {:?}", evt.key_id, evt.user_ids)
            }
        }
    }
}
