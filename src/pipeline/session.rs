//! Session lifecycle: bring-up, reset and teardown of the tracking engine.
//!
//! A session is either fully up (engine running, sensor handles live, timer
//! armed) or fully down. The timer is always disarmed before the engine is
//! released and re-armed only after the new handles are live.

use std::{
    thread,
    time::{Duration, Instant},
};

use crate::{
    engine::{FrameHandler, Subsystem, TrackingEngine, VENDOR_SETTINGS},
    error::{BridgeError, EngineError, Result, Stage},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Running,
    Resetting,
    Terminated,
}

/// Fixed-period deadline timer.
#[derive(Debug)]
pub struct TickTimer {
    period: Duration,
    next_deadline: Option<Instant>,
}

impl TickTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_deadline: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.next_deadline.is_some()
    }

    pub fn arm(&mut self) {
        self.next_deadline = Some(Instant::now() + self.period);
    }

    pub fn disarm(&mut self) {
        self.next_deadline = None;
    }

    /// Blocks until the next deadline. Returns `false` if the timer is not armed.
    ///
    /// A tick that overran by a full period restarts the schedule from now
    /// rather than firing a burst of late ticks.
    pub fn wait(&mut self) -> bool {
        let Some(deadline) = self.next_deadline else {
            return false;
        };

        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        }

        let now = Instant::now();
        let mut next = deadline + self.period;
        if next <= now {
            next = now + self.period;
        }
        self.next_deadline = Some(next);
        true
    }
}

pub struct Session<E: TrackingEngine> {
    engine: E,
    state: SessionState,
    timer: TickTimer,
}

impl<E: TrackingEngine> Session<E> {
    pub fn new(engine: E, period: Duration) -> Self {
        Self {
            engine,
            state: SessionState::Uninitialized,
            timer: TickTimer::new(period),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn timer(&self) -> &TickTimer {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut TickTimer {
        &mut self.timer
    }

    /// `Uninitialized → Running`. Every engine fault here is fatal.
    pub fn start(&mut self) -> Result<()> {
        self.expect_state(SessionState::Uninitialized, "start")?;
        self.bring_up()?;
        log::info!("{} session running", self.engine.label());
        Ok(())
    }

    /// `Running → Resetting → Running`: full teardown, then a fresh bring-up
    /// with the same settings.
    pub fn reset(&mut self) -> Result<()> {
        self.expect_state(SessionState::Running, "reset")?;
        self.state = SessionState::Resetting;

        self.timer.disarm();
        if let Err(err) = self.engine.release() {
            self.state = SessionState::Terminated;
            return Err(BridgeError::engine(Stage::Release)(err));
        }

        self.bring_up()?;
        log::info!("{} session reset", self.engine.label());
        Ok(())
    }

    /// Advances one subsystem. Engine faults are returned untouched so the
    /// caller can decide between reset and abort.
    pub fn update(
        &mut self,
        subsystem: Subsystem,
        handler: &mut dyn FrameHandler,
    ) -> std::result::Result<(), SessionFault> {
        if self.state != SessionState::Running {
            return Err(SessionFault::State(BridgeError::InvalidTransition {
                from: self.state,
                op: "update",
            }));
        }
        self.engine
            .update(subsystem, handler)
            .map_err(SessionFault::Engine)
    }

    /// `→ Terminated`. Stops the timer, then releases the engine.
    pub fn shutdown(&mut self) -> Result<()> {
        match self.state {
            SessionState::Terminated => return Ok(()),
            SessionState::Uninitialized => {
                self.state = SessionState::Terminated;
                return Ok(());
            }
            SessionState::Running | SessionState::Resetting => {}
        }

        self.timer.disarm();
        self.state = SessionState::Terminated;
        self.engine
            .release()
            .map_err(BridgeError::engine(Stage::Release))?;
        log::info!("{} session released", self.engine.label());
        Ok(())
    }

    fn bring_up(&mut self) -> Result<()> {
        match self.try_bring_up() {
            Ok(()) => {
                self.state = SessionState::Running;
                self.timer.arm();
                Ok(())
            }
            Err(err) => {
                // Leave nothing half-built behind.
                if let Err(release_err) = self.engine.release() {
                    log::warn!("release after failed bring-up also failed: {release_err}");
                }
                self.timer.disarm();
                self.state = SessionState::Terminated;
                Err(err)
            }
        }
    }

    fn try_bring_up(&mut self) -> Result<()> {
        self.engine.init().map_err(BridgeError::engine(Stage::Init))?;

        for (key, value) in VENDOR_SETTINGS {
            self.engine
                .set_config_value(key, value)
                .map_err(BridgeError::engine(Stage::Configure))?;
        }
        log::debug!("applied {} engine settings", VENDOR_SETTINGS.len());

        let sensors = self
            .engine
            .create_sensors()
            .map_err(BridgeError::engine(Stage::CreateSensors))?;
        log::info!(
            "color {}x{}@{}, depth {}x{}@{}",
            sensors.color_mode.xres,
            sensors.color_mode.yres,
            sensors.color_mode.fps,
            sensors.depth_mode.xres,
            sensors.depth_mode.yres,
            sensors.depth_mode.fps
        );
        // The engine hands its projection to every depth callback.
        log::debug!("depth projection {:?}", sensors.projection);

        self.engine.run().map_err(BridgeError::engine(Stage::Run))?;
        Ok(())
    }

    fn expect_state(&self, expected: SessionState, op: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(BridgeError::InvalidTransition {
                from: self.state,
                op,
            })
        }
    }
}

/// Why a subsystem update did not complete.
#[derive(Debug)]
pub enum SessionFault {
    Engine(EngineError),
    State(BridgeError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::scripted::{EngineCall, ScriptedEngine};

    const PERIOD: Duration = Duration::from_millis(5);

    #[test]
    fn test_start_applies_settings_then_runs_and_arms_timer() {
        let engine = ScriptedEngine::new();
        let calls = engine.calls();
        let mut session = Session::new(engine, PERIOD);
        assert!(!session.timer().is_armed());

        session.start().unwrap();
        assert_eq!(session.state(), SessionState::Running);
        assert!(session.timer().is_armed());

        let calls = calls.lock().unwrap();
        assert_eq!(calls.first(), Some(&EngineCall::Init));
        let settings = calls
            .iter()
            .filter(|c| matches!(c, EngineCall::SetConfig(..)))
            .count();
        assert_eq!(settings, VENDOR_SETTINGS.len());
        assert_eq!(&calls[calls.len() - 2..], &[EngineCall::CreateSensors, EngineCall::Run]);
    }

    #[test]
    fn test_failed_start_leaves_nothing_running() {
        let mut engine = ScriptedEngine::new();
        engine.fail_run(EngineError::internal("Exception", "no device"));
        let calls = engine.calls();
        let mut session = Session::new(engine, PERIOD);

        let err = session.start().unwrap_err();
        assert!(matches!(err, BridgeError::Engine { stage: Stage::Run, .. }));
        assert_eq!(session.state(), SessionState::Terminated);
        assert!(!session.timer().is_armed());
        assert_eq!(calls.lock().unwrap().last(), Some(&EngineCall::Release));
    }

    #[test]
    fn test_license_fault_at_startup_is_fatal() {
        let mut engine = ScriptedEngine::new();
        engine.fail_init(EngineError::LicenseNotAcquired);
        let mut session = Session::new(engine, PERIOD);
        assert!(session.start().is_err());
        assert_eq!(session.state(), SessionState::Terminated);
    }

    #[test]
    fn test_reset_reapplies_identical_settings() {
        let engine = ScriptedEngine::new();
        let calls = engine.calls();
        let mut session = Session::new(engine, PERIOD);
        session.start().unwrap();
        let first_start: Vec<EngineCall> = calls.lock().unwrap().clone();
        calls.lock().unwrap().clear();

        session.reset().unwrap();
        assert_eq!(session.state(), SessionState::Running);
        assert!(session.timer().is_armed());

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0], EngineCall::Release);
        assert_eq!(&calls[1..], first_start.as_slice());
    }

    #[test]
    fn test_reset_requires_running_session() {
        let mut session = Session::new(ScriptedEngine::new(), PERIOD);
        let err = session.reset().unwrap_err();
        assert!(matches!(
            err,
            BridgeError::InvalidTransition {
                from: SessionState::Uninitialized,
                ..
            }
        ));
    }

    #[test]
    fn test_shutdown_stops_timer_before_release() {
        let mut engine = ScriptedEngine::new();
        engine.fail_release(EngineError::internal("Exception", "release failed"));
        let calls = engine.calls();
        let mut session = Session::new(engine, PERIOD);
        session.start().unwrap();

        // Release fails, yet the timer was already stopped.
        assert!(session.shutdown().is_err());
        assert!(!session.timer().is_armed());
        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(calls.lock().unwrap().last(), Some(&EngineCall::Release));

        // Idempotent once terminated.
        assert!(session.shutdown().is_ok());
    }

    #[test]
    fn test_update_outside_running_is_rejected() {
        let mut session = Session::new(ScriptedEngine::new(), PERIOD);
        let mut sink = crate::engine::scripted::CountingHandler::default();
        assert!(matches!(
            session.update(Subsystem::Color, &mut sink),
            Err(SessionFault::State(_))
        ));
    }

    #[test]
    fn test_timer_wait_and_disarm() {
        let mut timer = TickTimer::new(Duration::from_millis(2));
        assert!(!timer.wait());

        let start = Instant::now();
        timer.arm();
        assert!(timer.wait());
        assert!(timer.wait());
        assert!(start.elapsed() >= Duration::from_millis(4));

        timer.disarm();
        assert!(!timer.is_armed());
        assert!(!timer.wait());
    }
}
