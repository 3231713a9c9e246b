//! Scripted engine for unit tests: records every call and replays queued
//! callbacks or faults per subsystem.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::SystemTime,
};

use super::{FrameHandler, SensorInfo, Subsystem, TrackingEngine};
use crate::{
    error::EngineError,
    pipeline::projection::ProjectionModel,
    types::{Bgr, ColorFrame, DepthFrame, OutputMode, Skeleton, SkeletonFrame, User, UserFrame},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineCall {
    Init,
    SetConfig(String, String),
    CreateSensors,
    Run,
    Update(Subsystem),
    Release,
}

#[derive(Clone, Debug)]
pub enum ScriptedEvent {
    Color { width: u32, height: u32, data: Vec<Bgr> },
    Depth { width: u32, height: u32, data: Vec<u16> },
    Users { width: u32, height: u32, users: Vec<User> },
    Skeletons(Vec<Skeleton>),
    NewUser(i32),
    LostUser(i32),
}

#[derive(Clone, Debug)]
enum Step {
    Events(Vec<ScriptedEvent>),
    Fail(EngineError),
}

pub const SCRIPTED_PROJECTION: ProjectionModel = ProjectionModel {
    width: 4,
    height: 2,
    fx: 2.0,
    fy: 2.0,
    cx: 2.0,
    cy: 1.0,
};

#[derive(Default)]
pub struct ScriptedEngine {
    calls: Arc<Mutex<Vec<EngineCall>>>,
    steps: HashMap<Subsystem, VecDeque<Step>>,
    fail_init: Option<EngineError>,
    fail_run: Option<EngineError>,
    fail_release: Option<EngineError>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared call log, readable after the engine has been moved.
    pub fn calls(&self) -> Arc<Mutex<Vec<EngineCall>>> {
        Arc::clone(&self.calls)
    }

    pub fn push_events(&mut self, subsystem: Subsystem, events: Vec<ScriptedEvent>) {
        self.steps
            .entry(subsystem)
            .or_default()
            .push_back(Step::Events(events));
    }

    pub fn push_fault(&mut self, subsystem: Subsystem, err: EngineError) {
        self.steps
            .entry(subsystem)
            .or_default()
            .push_back(Step::Fail(err));
    }

    pub fn fail_init(&mut self, err: EngineError) {
        self.fail_init = Some(err);
    }

    pub fn fail_run(&mut self, err: EngineError) {
        self.fail_run = Some(err);
    }

    pub fn fail_release(&mut self, err: EngineError) {
        self.fail_release = Some(err);
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl TrackingEngine for ScriptedEngine {
    fn label(&self) -> &'static str {
        "scripted"
    }

    fn init(&mut self) -> Result<(), EngineError> {
        self.record(EngineCall::Init);
        self.fail_init.take().map_or(Ok(()), Err)
    }

    fn set_config_value(&mut self, key: &str, value: &str) -> Result<(), EngineError> {
        self.record(EngineCall::SetConfig(key.to_string(), value.to_string()));
        Ok(())
    }

    fn create_sensors(&mut self) -> Result<SensorInfo, EngineError> {
        self.record(EngineCall::CreateSensors);
        let mode = OutputMode {
            xres: SCRIPTED_PROJECTION.width,
            yres: SCRIPTED_PROJECTION.height,
            fps: 30,
        };
        Ok(SensorInfo {
            color_mode: mode,
            depth_mode: mode,
            projection: SCRIPTED_PROJECTION,
        })
    }

    fn run(&mut self) -> Result<(), EngineError> {
        self.record(EngineCall::Run);
        self.fail_run.take().map_or(Ok(()), Err)
    }

    fn update(
        &mut self,
        subsystem: Subsystem,
        handler: &mut dyn FrameHandler,
    ) -> Result<(), EngineError> {
        self.record(EngineCall::Update(subsystem));
        let step = self.steps.get_mut(&subsystem).and_then(VecDeque::pop_front);
        let events = match step {
            None => return Ok(()),
            Some(Step::Fail(err)) => return Err(err),
            Some(Step::Events(events)) => events,
        };

        let timestamp = SystemTime::now();
        for event in &events {
            match event {
                ScriptedEvent::Color {
                    width,
                    height,
                    data,
                } => handler.on_color_frame(&ColorFrame {
                    width: *width,
                    height: *height,
                    data,
                    timestamp,
                }),
                ScriptedEvent::Depth {
                    width,
                    height,
                    data,
                } => handler.on_depth_frame(
                    &DepthFrame {
                        width: *width,
                        height: *height,
                        data,
                        timestamp,
                    },
                    &SCRIPTED_PROJECTION,
                ),
                ScriptedEvent::Users {
                    width,
                    height,
                    users,
                } => handler.on_user_frame(&UserFrame {
                    width: *width,
                    height: *height,
                    users,
                    timestamp,
                }),
                ScriptedEvent::Skeletons(skeletons) => handler.on_skeletons(&SkeletonFrame {
                    skeletons,
                    timestamp,
                }),
                ScriptedEvent::NewUser(id) => handler.on_new_user(*id),
                ScriptedEvent::LostUser(id) => handler.on_lost_user(*id),
            }
        }
        Ok(())
    }

    fn release(&mut self) -> Result<(), EngineError> {
        self.record(EngineCall::Release);
        self.fail_release.take().map_or(Ok(()), Err)
    }
}

/// Handler that only counts callbacks.
#[derive(Debug, Default)]
pub struct CountingHandler {
    pub callbacks: usize,
}

impl FrameHandler for CountingHandler {
    fn on_color_frame(&mut self, _frame: &ColorFrame<'_>) {
        self.callbacks += 1;
    }

    fn on_depth_frame(&mut self, _frame: &DepthFrame<'_>, _projection: &ProjectionModel) {
        self.callbacks += 1;
    }

    fn on_user_frame(&mut self, _frame: &UserFrame<'_>) {
        self.callbacks += 1;
    }

    fn on_skeletons(&mut self, _frame: &SkeletonFrame<'_>) {
        self.callbacks += 1;
    }

    fn on_new_user(&mut self, _id: i32) {
        self.callbacks += 1;
    }

    fn on_lost_user(&mut self, _id: i32) {
        self.callbacks += 1;
    }
}
