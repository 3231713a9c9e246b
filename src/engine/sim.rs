//! Synthetic engine so the bridge can run without a sensor.

use std::{collections::HashMap, f32::consts::PI, time::SystemTime};

use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{FrameHandler, SensorInfo, Subsystem, TrackingEngine};
use crate::{
    config::SimConfig,
    error::EngineError,
    pipeline::projection::ProjectionModel,
    types::{
        Bgr, BoundingBox, ColorFrame, DepthFrame, JOINT_COUNT, Joint, JointType, OutputMode,
        Skeleton, SkeletonFrame, User, UserFrame, Vector3,
    },
};

const DEPTH_HFOV_DEG: f32 = 87.0;
const WALL_DEPTH_MM: u16 = 3000;
const PRESENCE_CYCLE: u64 = 300;
const USER_TORSO_WIDTH_MM: f32 = 450.0;
const USER_HEIGHT_MM: f32 = 1700.0;

/// (tick within cycle it appears, tick it is lost, id, lateral offset mm)
const PRESENCE_SCHEDULE: &[(u64, u64, i32, f32)] = &[(30, 240, 1, -400.0), (120, 270, 2, 600.0)];

/// Joint offsets from the user's centroid, native frame (mm).
const JOINT_OFFSETS: [(JointType, [f32; 3]); JOINT_COUNT] = [
    (JointType::Head, [0.0, 700.0, 0.0]),
    (JointType::Neck, [0.0, 550.0, 0.0]),
    (JointType::Torso, [0.0, 250.0, 0.0]),
    (JointType::Waist, [0.0, 0.0, 0.0]),
    (JointType::LeftCollar, [-80.0, 500.0, 0.0]),
    (JointType::LeftShoulder, [-200.0, 480.0, 0.0]),
    (JointType::LeftElbow, [-250.0, 200.0, 0.0]),
    (JointType::LeftWrist, [-270.0, -50.0, 0.0]),
    (JointType::LeftHand, [-275.0, -120.0, 0.0]),
    (JointType::RightCollar, [80.0, 500.0, 0.0]),
    (JointType::RightShoulder, [200.0, 480.0, 0.0]),
    (JointType::RightElbow, [250.0, 200.0, 0.0]),
    (JointType::RightWrist, [270.0, -50.0, 0.0]),
    (JointType::RightHand, [275.0, -120.0, 0.0]),
    (JointType::LeftHip, [-120.0, -50.0, 0.0]),
    (JointType::LeftKnee, [-120.0, -480.0, 0.0]),
    (JointType::LeftAnkle, [-120.0, -900.0, 0.0]),
    (JointType::RightHip, [120.0, -50.0, 0.0]),
    (JointType::RightKnee, [120.0, -480.0, 0.0]),
    (JointType::RightAnkle, [120.0, -900.0, 0.0]),
];

#[derive(Clone, Copy, Debug)]
struct SimUser {
    id: i32,
    offset_mm: f32,
    depth_mm: f32,
}

#[derive(Debug, Default)]
struct Sensors {
    color_mode: Option<OutputMode>,
    depth_mode: Option<OutputMode>,
    projection: Option<ProjectionModel>,
}

pub struct SimEngine {
    config: SimConfig,
    initialized: bool,
    running: bool,
    settings: HashMap<String, String>,
    sensors: Sensors,
    tick: u64,
    users: Vec<SimUser>,
    rng: StdRng,
    color: Vec<Bgr>,
    depth: Vec<u16>,
}

impl SimEngine {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            initialized: false,
            running: false,
            settings: HashMap::new(),
            sensors: Sensors::default(),
            tick: 0,
            users: Vec::new(),
            rng: StdRng::seed_from_u64(0x5eed),
            color: Vec::new(),
            depth: Vec::new(),
        }
    }

    fn setting<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T, EngineError> {
        match self.settings.get(key) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|_| EngineError::InvalidConfig {
                key: key.to_string(),
                value: value.clone(),
            }),
        }
    }

    fn output_mode(&self, module: &str) -> Result<OutputMode, EngineError> {
        let xres = self.setting(&format!("Realsense2Module.{module}.ProcessWidth"), 640u32)?;
        let yres = self.setting(&format!("Realsense2Module.{module}.ProcessHeight"), 480u32)?;
        let fps = self.setting(&format!("Realsense2Module.{module}.FPS"), 30u32)?;
        if xres == 0 || yres == 0 {
            return Err(EngineError::InvalidConfig {
                key: format!("Realsense2Module.{module}.ProcessWidth"),
                value: format!("{xres}x{yres}"),
            });
        }
        Ok(OutputMode { xres, yres, fps })
    }

    fn active_user_cap(&self) -> Result<usize, EngineError> {
        self.setting("Skeletonization.ActiveUsers", 6usize)
    }

    fn require_running(&self) -> Result<(), EngineError> {
        if self.running {
            Ok(())
        } else {
            Err(EngineError::NotInitialized)
        }
    }

    fn phase(&self) -> f32 {
        self.tick as f32 / 30.0
    }

    fn lateral(&self, user: &SimUser) -> f32 {
        user.offset_mm + (self.phase() * 0.7 + user.id as f32).sin() * 150.0
    }

    fn update_color(&mut self, handler: &mut dyn FrameHandler) -> Result<(), EngineError> {
        let mode = self.sensors.color_mode.ok_or(EngineError::NotInitialized)?;
        let (w, h) = (mode.xres as usize, mode.yres as usize);
        let shade = (self.tick % 256) as u8;
        self.color.resize(w * h, Bgr::default());
        for (i, px) in self.color.iter_mut().enumerate() {
            let (row, col) = (i / w, i % w);
            *px = Bgr {
                blue: (col * 255 / w.max(1)) as u8,
                green: (row * 255 / h.max(1)) as u8,
                red: shade,
            };
        }

        handler.on_color_frame(&ColorFrame {
            width: mode.xres,
            height: mode.yres,
            data: &self.color,
            timestamp: SystemTime::now(),
        });
        Ok(())
    }

    fn update_depth(&mut self, handler: &mut dyn FrameHandler) -> Result<(), EngineError> {
        let mode = self.sensors.depth_mode.ok_or(EngineError::NotInitialized)?;
        let projection = self.sensors.projection.ok_or(EngineError::NotInitialized)?;
        let (w, h) = (mode.xres as usize, mode.yres as usize);

        // Person silhouettes as (col range, row range, depth) in pixel space.
        let silhouettes: Vec<(f32, f32, f32, f32, u16)> = self
            .users
            .iter()
            .map(|user| {
                let depth = user.depth_mm;
                let center_col = projection.cx + self.lateral(user) * projection.fx / depth;
                let half_w = USER_TORSO_WIDTH_MM / 2.0 * projection.fx / depth;
                let half_h = USER_HEIGHT_MM / 2.0 * projection.fy / depth;
                (
                    center_col - half_w,
                    center_col + half_w,
                    projection.cy - half_h,
                    projection.cy + half_h,
                    depth as u16,
                )
            })
            .collect();

        let noise = self.config.depth_noise_mm;
        self.depth.resize(w * h, 0);
        for (i, sample) in self.depth.iter_mut().enumerate() {
            let (row, col) = ((i / w) as f32, i % w);
            if col == 0 {
                // Left edge never returns, as with a real stereo baseline.
                *sample = 0;
                continue;
            }
            let col = col as f32;
            let mut depth = silhouettes
                .iter()
                .filter(|(l, r, t, b, _)| col >= *l && col <= *r && row >= *t && row <= *b)
                .map(|s| s.4)
                .min()
                .unwrap_or(WALL_DEPTH_MM);
            if noise > 0.0 {
                let jitter = self.rng.random_range(-noise..=noise);
                depth = (depth as f32 + jitter).max(1.0) as u16;
            }
            *sample = depth;
        }

        handler.on_depth_frame(
            &DepthFrame {
                width: mode.xres,
                height: mode.yres,
                data: &self.depth,
                timestamp: SystemTime::now(),
            },
            &projection,
        );
        Ok(())
    }

    fn update_users(&mut self, handler: &mut dyn FrameHandler) -> Result<(), EngineError> {
        let mode = self.sensors.depth_mode.ok_or(EngineError::NotInitialized)?;
        let projection = self.sensors.projection.ok_or(EngineError::NotInitialized)?;
        let cycle = self.tick % PRESENCE_CYCLE;

        for &(appear_at, lost_at, id, offset_mm) in PRESENCE_SCHEDULE {
            if cycle == appear_at {
                self.users.push(SimUser {
                    id,
                    offset_mm,
                    depth_mm: 1800.0 + id as f32 * 300.0,
                });
                handler.on_new_user(id);
            } else if cycle == lost_at {
                self.users.retain(|user| user.id != id);
                handler.on_lost_user(id);
            }
        }

        let (w, h) = (mode.xres as f32, mode.yres as f32);
        let users: Vec<User> = self
            .users
            .iter()
            .map(|user| {
                let real = Vector3::new(self.lateral(user), 0.0, user.depth_mm);
                let center_col = projection.cx + real.x * projection.fx / real.z;
                let half_w = USER_TORSO_WIDTH_MM / 2.0 * projection.fx / real.z;
                let half_h = USER_HEIGHT_MM / 2.0 * projection.fy / real.z;
                User {
                    id: user.id,
                    real,
                    proj: Vector3::new(center_col / w, projection.cy / h, real.z),
                    bbox: BoundingBox {
                        left: ((center_col - half_w) / w).clamp(0.0, 1.0),
                        top: ((projection.cy - half_h) / h).clamp(0.0, 1.0),
                        right: ((center_col + half_w) / w).clamp(0.0, 1.0),
                        bottom: ((projection.cy + half_h) / h).clamp(0.0, 1.0),
                    },
                    occlusion: 0.0,
                }
            })
            .collect();

        handler.on_user_frame(&UserFrame {
            width: mode.xres,
            height: mode.yres,
            users: &users,
            timestamp: SystemTime::now(),
        });
        Ok(())
    }

    fn update_skeletons(&mut self, handler: &mut dyn FrameHandler) -> Result<(), EngineError> {
        let cap = self.active_user_cap()?;
        let yaw = (self.phase() * 0.5).sin() * PI / 4.0;
        let (s, c) = yaw.sin_cos();
        // Rotation about the vertical (native y) axis.
        let orient = [c, 0.0, s, 0.0, 1.0, 0.0, -s, 0.0, c];

        let skeletons: Vec<Skeleton> = self
            .users
            .iter()
            .take(cap)
            .map(|user| {
                let center = Vector3::new(self.lateral(user), 0.0, user.depth_mm);
                let mut joints = [Joint::default(); JOINT_COUNT];
                for (joint_type, [dx, dy, dz]) in JOINT_OFFSETS {
                    joints[joint_type.index()] = Joint {
                        confidence: 0.9,
                        real: Vector3::new(
                            center.x + c * dx + s * dz,
                            center.y + dy,
                            center.z - s * dx + c * dz,
                        ),
                        orient,
                    };
                }
                Skeleton {
                    id: user.id,
                    joints,
                }
            })
            .collect();

        handler.on_skeletons(&SkeletonFrame {
            skeletons: &skeletons,
            timestamp: SystemTime::now(),
        });
        Ok(())
    }
}

impl TrackingEngine for SimEngine {
    fn label(&self) -> &'static str {
        "sim"
    }

    fn init(&mut self) -> Result<(), EngineError> {
        self.initialized = true;
        Ok(())
    }

    fn set_config_value(&mut self, key: &str, value: &str) -> Result<(), EngineError> {
        if !self.initialized {
            return Err(EngineError::NotInitialized);
        }
        self.settings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn create_sensors(&mut self) -> Result<SensorInfo, EngineError> {
        if !self.initialized {
            return Err(EngineError::NotInitialized);
        }
        let color_mode = self.output_mode("RGB")?;
        let depth_mode = self.output_mode("Depth")?;
        self.active_user_cap()?;
        let projection = ProjectionModel::from_hfov(
            depth_mode.xres,
            depth_mode.yres,
            DEPTH_HFOV_DEG.to_radians(),
        );

        self.sensors = Sensors {
            color_mode: Some(color_mode),
            depth_mode: Some(depth_mode),
            projection: Some(projection),
        };
        Ok(SensorInfo {
            color_mode,
            depth_mode,
            projection,
        })
    }

    fn run(&mut self) -> Result<(), EngineError> {
        if self.sensors.projection.is_none() {
            return Err(EngineError::internal(
                "Exception",
                "run requested before sensors were created",
            ));
        }
        self.running = true;
        Ok(())
    }

    fn update(
        &mut self,
        subsystem: Subsystem,
        handler: &mut dyn FrameHandler,
    ) -> Result<(), EngineError> {
        self.require_running()?;
        match subsystem {
            Subsystem::Color => {
                self.tick += 1;
                let every = self.config.license_fault_every;
                if every > 0 && self.tick % every == 0 {
                    return Err(EngineError::LicenseNotAcquired);
                }
                self.update_color(handler)
            }
            Subsystem::Depth => self.update_depth(handler),
            Subsystem::User => self.update_users(handler),
            Subsystem::Skeleton => self.update_skeletons(handler),
        }
    }

    fn release(&mut self) -> Result<(), EngineError> {
        self.initialized = false;
        self.running = false;
        self.settings.clear();
        self.sensors = Sensors::default();
        self.users.clear();
        self.tick = 0;
        self.color = Vec::new();
        self.depth = Vec::new();
        Ok(())
    }
}
