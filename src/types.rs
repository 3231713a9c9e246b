use std::time::SystemTime;

/// Position in the tracking engine's native real-world frame, millimeters.
///
/// Native axes: x to the sensor's right, y up, z along the optical axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// One color sample in the engine's native channel order.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Bgr {
    pub blue: u8,
    pub green: u8,
    pub red: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputMode {
    pub xres: u32,
    pub yres: u32,
    pub fps: u32,
}

/// Color frame as delivered to a callback. `data` is only valid for the
/// duration of that callback.
#[derive(Clone, Copy, Debug)]
pub struct ColorFrame<'a> {
    pub width: u32,
    pub height: u32,
    pub data: &'a [Bgr],
    pub timestamp: SystemTime,
}

/// Depth frame in millimeters, row-major. Zero means "no return".
#[derive(Clone, Copy, Debug)]
pub struct DepthFrame<'a> {
    pub width: u32,
    pub height: u32,
    pub data: &'a [u16],
    pub timestamp: SystemTime,
}

/// Normalized bounding box, all edges in [0, 1].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct User {
    pub id: i32,
    pub real: Vector3,
    /// Projective centroid, x/y normalized to [0, 1], z in millimeters.
    pub proj: Vector3,
    pub bbox: BoundingBox,
    pub occlusion: f32,
}

#[derive(Clone, Copy, Debug)]
pub struct UserFrame<'a> {
    pub width: u32,
    pub height: u32,
    pub users: &'a [User],
    pub timestamp: SystemTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JointType {
    Head,
    Neck,
    Torso,
    Waist,
    LeftCollar,
    LeftShoulder,
    LeftElbow,
    LeftWrist,
    LeftHand,
    RightCollar,
    RightShoulder,
    RightElbow,
    RightWrist,
    RightHand,
    LeftHip,
    LeftKnee,
    LeftAnkle,
    RightHip,
    RightKnee,
    RightAnkle,
}

pub const JOINT_COUNT: usize = 20;

impl JointType {
    /// Declaration order. Every per-joint output follows it.
    pub const ALL: [JointType; JOINT_COUNT] = [
        JointType::Head,
        JointType::Neck,
        JointType::Torso,
        JointType::Waist,
        JointType::LeftCollar,
        JointType::LeftShoulder,
        JointType::LeftElbow,
        JointType::LeftWrist,
        JointType::LeftHand,
        JointType::RightCollar,
        JointType::RightShoulder,
        JointType::RightElbow,
        JointType::RightWrist,
        JointType::RightHand,
        JointType::LeftHip,
        JointType::LeftKnee,
        JointType::LeftAnkle,
        JointType::RightHip,
        JointType::RightKnee,
        JointType::RightAnkle,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            JointType::Head => "joint_head",
            JointType::Neck => "joint_neck",
            JointType::Torso => "joint_torso",
            JointType::Waist => "joint_waist",
            JointType::LeftCollar => "joint_left_collar",
            JointType::LeftShoulder => "joint_left_shoulder",
            JointType::LeftElbow => "joint_left_elbow",
            JointType::LeftWrist => "joint_left_wrist",
            JointType::LeftHand => "joint_left_hand",
            JointType::RightCollar => "joint_right_collar",
            JointType::RightShoulder => "joint_right_shoulder",
            JointType::RightElbow => "joint_right_elbow",
            JointType::RightWrist => "joint_right_wrist",
            JointType::RightHand => "joint_right_hand",
            JointType::LeftHip => "joint_left_hip",
            JointType::LeftKnee => "joint_left_knee",
            JointType::LeftAnkle => "joint_left_ankle",
            JointType::RightHip => "joint_right_hip",
            JointType::RightKnee => "joint_right_knee",
            JointType::RightAnkle => "joint_right_ankle",
        }
    }
}

pub const IDENTITY_ORIENTATION: [f32; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Joint {
    pub confidence: f32,
    pub real: Vector3,
    /// Row-major 3x3 rotation matrix.
    pub orient: [f32; 9],
}

impl Default for Joint {
    fn default() -> Self {
        Self {
            confidence: 0.0,
            real: Vector3::default(),
            orient: IDENTITY_ORIENTATION,
        }
    }
}

/// Tracked skeleton; `joints` is indexed by [`JointType::index`].
#[derive(Clone, Debug, PartialEq)]
pub struct Skeleton {
    pub id: i32,
    pub joints: [Joint; JOINT_COUNT],
}

impl Skeleton {
    pub fn joint(&self, joint: JointType) -> &Joint {
        &self.joints[joint.index()]
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SkeletonFrame<'a> {
    pub skeletons: &'a [Skeleton],
    pub timestamp: SystemTime,
}
