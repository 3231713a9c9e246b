use super::orientation::rotation_to_quaternion;
use crate::{
    messages::{Header, LINK_FRAME_ID, Point, Pose, SkeletonData, SkeletonDataArray},
    types::{Joint, JointType, Skeleton, SkeletonFrame},
};

/// One message per update carrying every tracked skeleton.
pub fn assemble_skeletons(frame: &SkeletonFrame<'_>) -> SkeletonDataArray {
    SkeletonDataArray {
        header: Header::new(frame.timestamp, LINK_FRAME_ID),
        skeletons: frame.skeletons.iter().map(skeleton_data).collect(),
    }
}

fn skeleton_data(skeleton: &Skeleton) -> SkeletonData {
    let mut data = SkeletonData {
        id: skeleton.id,
        joints: Vec::with_capacity(JointType::ALL.len()),
        confidences: Vec::with_capacity(JointType::ALL.len()),
        joint_poses: Vec::with_capacity(JointType::ALL.len()),
    };

    for joint_type in JointType::ALL {
        let joint = skeleton.joint(joint_type);
        data.joints.push(joint_type.name());
        data.confidences.push(joint.confidence);
        data.joint_poses.push(joint_pose(joint));
    }

    data
}

/// Position is passed through untouched; only the orientation is converted.
fn joint_pose(joint: &Joint) -> Pose {
    Pose {
        position: Point {
            x: f64::from(joint.real.x),
            y: f64::from(joint.real.y),
            z: f64::from(joint.real.z),
        },
        orientation: rotation_to_quaternion(&joint.orient),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{JOINT_COUNT, Vector3};
    use std::collections::HashSet;
    use std::time::SystemTime;

    fn skeleton(id: i32) -> Skeleton {
        let mut joints = [Joint::default(); JOINT_COUNT];
        for (i, joint) in joints.iter_mut().enumerate() {
            joint.confidence = i as f32 / JOINT_COUNT as f32;
            joint.real = Vector3::new(i as f32, -(i as f32), 1000.0 + i as f32);
        }
        Skeleton { id, joints }
    }

    #[test]
    fn test_single_skeleton_has_all_joints_in_declared_order() {
        let skeletons = [skeleton(3)];
        let frame = SkeletonFrame {
            skeletons: &skeletons,
            timestamp: SystemTime::now(),
        };

        let msg = assemble_skeletons(&frame);
        assert_eq!(msg.skeletons.len(), 1);

        let data = &msg.skeletons[0];
        assert_eq!(data.id, 3);
        assert_eq!(data.joints.len(), 20);
        assert_eq!(data.confidences.len(), 20);
        assert_eq!(data.joint_poses.len(), 20);

        let expected: Vec<&str> = JointType::ALL.iter().map(|j| j.name()).collect();
        assert_eq!(data.joints, expected);
        let unique: HashSet<&str> = data.joints.iter().copied().collect();
        assert_eq!(unique.len(), 20);
        assert_eq!(data.joints[0], "joint_head");
        assert_eq!(data.joints[19], "joint_right_ankle");
    }

    #[test]
    fn test_joint_values_follow_joint_index() {
        let skeletons = [skeleton(1)];
        let frame = SkeletonFrame {
            skeletons: &skeletons,
            timestamp: SystemTime::now(),
        };

        let data = &assemble_skeletons(&frame).skeletons[0];
        let knee = JointType::LeftKnee.index();
        assert_eq!(data.confidences[knee], knee as f32 / 20.0);
        assert_eq!(data.joint_poses[knee].position.x, knee as f64);
        assert_eq!(data.joint_poses[knee].position.z, 1000.0 + knee as f64);
        assert_eq!(data.joint_poses[knee].orientation.w, 1.0);
    }

    #[test]
    fn test_empty_update_still_publishes() {
        let frame = SkeletonFrame {
            skeletons: &[],
            timestamp: SystemTime::now(),
        };
        let msg = assemble_skeletons(&frame);
        assert!(msg.skeletons.is_empty());
        assert_eq!(msg.header.frame_id, "nuitrack_link");
    }
}
