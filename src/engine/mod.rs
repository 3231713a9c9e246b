//! Capability surface of the body-tracking engine.
//!
//! The engine is driven synchronously: [`TrackingEngine::update`] delivers every
//! callback that is due for one subsystem to the given [`FrameHandler`] before
//! it returns. Frame data handed to a callback borrows engine memory and must be
//! copied out before the callback returns.

#[cfg(test)]
pub mod scripted;
#[cfg(feature = "engine-sim")]
pub mod sim;

use crate::{
    error::EngineError,
    pipeline::projection::ProjectionModel,
    types::{ColorFrame, DepthFrame, OutputMode, SkeletonFrame, UserFrame},
};

/// Engine settings applied once per session start, identically on every reset.
pub const VENDOR_SETTINGS: &[(&str, &str)] = &[
    // AI skeletonization
    ("Skeletonization.Type", "CNN_HPE"),
    // Only track the primary user
    ("Skeletonization.ActiveUsers", "1"),
    ("Realsense2Module.Depth.Preset", "3"),
    ("Realsense2Module.Depth.RawWidth", "848"),
    ("Realsense2Module.Depth.RawHeight", "480"),
    ("Realsense2Module.Depth.ProcessWidth", "848"),
    ("Realsense2Module.Depth.ProcessHeight", "480"),
    ("Realsense2Module.Depth.LaserPower", "1.0"),
    ("Realsense2Module.Depth.FPS", "15"),
    ("Realsense2Module.RGB.RawWidth", "848"),
    ("Realsense2Module.RGB.RawHeight", "480"),
    ("Realsense2Module.RGB.ProcessWidth", "848"),
    ("Realsense2Module.RGB.ProcessHeight", "480"),
    ("Realsense2Module.RGB.FPS", "15"),
    ("DepthProvider.Depth2ColorRegistration", "true"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Color,
    Depth,
    User,
    Skeleton,
}

impl Subsystem {
    /// Advance order within one tick; it fixes callback order, nothing else.
    pub const TICK_ORDER: [Subsystem; 4] = [
        Subsystem::Color,
        Subsystem::Depth,
        Subsystem::User,
        Subsystem::Skeleton,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Subsystem::Color => "color",
            Subsystem::Depth => "depth",
            Subsystem::User => "user",
            Subsystem::Skeleton => "skeleton",
        }
    }
}

/// What the engine reports once its sensor and tracker handles exist.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SensorInfo {
    pub color_mode: OutputMode,
    pub depth_mode: OutputMode,
    pub projection: ProjectionModel,
}

/// Callbacks fired from inside [`TrackingEngine::update`].
pub trait FrameHandler {
    fn on_color_frame(&mut self, frame: &ColorFrame<'_>);
    fn on_depth_frame(&mut self, frame: &DepthFrame<'_>, projection: &ProjectionModel);
    fn on_user_frame(&mut self, frame: &UserFrame<'_>);
    fn on_skeletons(&mut self, frame: &SkeletonFrame<'_>);
    fn on_new_user(&mut self, id: i32);
    fn on_lost_user(&mut self, id: i32);
}

pub trait TrackingEngine: Send + 'static {
    fn label(&self) -> &'static str;

    fn init(&mut self) -> Result<(), EngineError>;

    fn set_config_value(&mut self, key: &str, value: &str) -> Result<(), EngineError>;

    /// Creates the color, depth, user and skeleton handles.
    fn create_sensors(&mut self) -> Result<SensorInfo, EngineError>;

    fn run(&mut self) -> Result<(), EngineError>;

    /// Advances one subsystem, firing its due callbacks on `handler`.
    fn update(
        &mut self,
        subsystem: Subsystem,
        handler: &mut dyn FrameHandler,
    ) -> Result<(), EngineError>;

    /// Drops every handle and shuts the engine down.
    fn release(&mut self) -> Result<(), EngineError>;
}
