use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use super::{
    color::assemble_color,
    depth::assemble_depth,
    presence::{PresenceChange, PresenceEvent, PresenceTracker},
    projection::ProjectionModel,
    session::{Session, SessionFault, SessionState},
    skeleton::assemble_skeletons,
    users::assemble_users,
};
use crate::{
    engine::{FrameHandler, Subsystem, TrackingEngine},
    error::{BridgeError, FaultKind, Result, Stage},
    messages::Message,
    publisher::Publisher,
    types::{ColorFrame, DepthFrame, SkeletonFrame, UserFrame},
};

/// Receives engine callbacks, assembles messages and hands them to the
/// publisher. Owns the presence roster.
pub struct FrameSink<P: Publisher> {
    tracker: PresenceTracker,
    publisher: P,
    callbacks: usize,
}

impl<P: Publisher> FrameSink<P> {
    fn new(publisher: P) -> Self {
        Self {
            tracker: PresenceTracker::new(),
            publisher,
            callbacks: 0,
        }
    }

    fn publish_presence(&self, event: PresenceEvent) {
        let message = match event.change {
            PresenceChange::Appeared => Message::PersonAppeared(event.update),
            PresenceChange::Disappeared => Message::PersonDisappeared(event.update),
        };
        self.publisher.publish(message);
    }
}

impl<P: Publisher> FrameHandler for FrameSink<P> {
    fn on_color_frame(&mut self, frame: &ColorFrame<'_>) {
        self.callbacks += 1;
        match assemble_color(frame) {
            Ok(image) => self.publisher.publish(Message::ColorImage(image)),
            Err(err) => log::warn!("dropping color frame: {err:?}"),
        }
    }

    fn on_depth_frame(&mut self, frame: &DepthFrame<'_>, projection: &ProjectionModel) {
        self.callbacks += 1;
        match assemble_depth(frame, projection) {
            Ok(cloud) => self.publisher.publish(Message::DepthPoints(cloud)),
            Err(err) => log::warn!("dropping depth frame: {err:?}"),
        }
    }

    fn on_user_frame(&mut self, frame: &UserFrame<'_>) {
        self.callbacks += 1;
        self.publisher.publish(Message::Users(assemble_users(frame)));
    }

    fn on_skeletons(&mut self, frame: &SkeletonFrame<'_>) {
        self.callbacks += 1;
        self.publisher
            .publish(Message::Skeletons(assemble_skeletons(frame)));
    }

    fn on_new_user(&mut self, id: i32) {
        self.callbacks += 1;
        let event = self.tracker.on_appear(id);
        log::info!("user {id} appeared, tracking {:?}", event.update.user_ids);
        self.publish_presence(event);
    }

    fn on_lost_user(&mut self, id: i32) {
        self.callbacks += 1;
        match self.tracker.on_disappear(id) {
            Some(event) => {
                log::info!("user {id} lost, tracking {:?}", event.update.user_ids);
                self.publish_presence(event);
            }
            None => log::debug!("ignoring loss of untracked user {id}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Advanced,
    /// A recoverable fault interrupted the tick and the session was rebuilt.
    Reset,
}

pub struct Bridge<E: TrackingEngine, P: Publisher> {
    session: Session<E>,
    sink: FrameSink<P>,
    consecutive_resets: u32,
}

impl<E: TrackingEngine, P: Publisher> Bridge<E, P> {
    pub fn new(engine: E, publisher: P, period: Duration) -> Self {
        Self {
            session: Session::new(engine, period),
            sink: FrameSink::new(publisher),
            consecutive_resets: 0,
        }
    }

    #[cfg(test)]
    pub fn session(&self) -> &Session<E> {
        &self.session
    }

    pub fn roster(&self) -> &[i32] {
        self.sink.tracker.roster()
    }

    pub fn start(&mut self) -> Result<()> {
        self.sink.tracker.clear();
        self.session.start()
    }

    /// Advances color, depth, user and skeleton in order. A license fault
    /// rebuilds the session and ends the tick early; any other fault is
    /// returned for the caller to abort on.
    ///
    /// Repeated license faults reset on every tick; there is no backoff.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        self.sink.callbacks = 0;

        for subsystem in Subsystem::TICK_ORDER {
            match self.session.update(subsystem, &mut self.sink) {
                Ok(()) => {}
                Err(SessionFault::State(err)) => return Err(err),
                Err(SessionFault::Engine(err)) if err.kind() == FaultKind::Recoverable => {
                    self.consecutive_resets += 1;
                    log::warn!(
                        "resetting session after {} update fault: {err} ({} in a row)",
                        subsystem.label(),
                        self.consecutive_resets
                    );
                    self.reset()?;
                    return Ok(TickOutcome::Reset);
                }
                Err(SessionFault::Engine(err)) => {
                    return Err(BridgeError::engine(Stage::Update(subsystem))(err));
                }
            }
        }

        self.consecutive_resets = 0;
        log::trace!("tick delivered {} callbacks", self.sink.callbacks);
        Ok(TickOutcome::Advanced)
    }

    pub fn reset(&mut self) -> Result<()> {
        self.sink.tracker.clear();
        self.session.reset()
    }

    pub fn shutdown(&mut self) -> Result<()> {
        self.session.shutdown()
    }

    /// Ticks at the session timer's rate until `stop` is raised or a fatal
    /// fault occurs. The session is shut down either way, including after a
    /// panic inside a tick.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<()> {
        if self.session.state() == SessionState::Uninitialized {
            self.start()?;
        }
        log::info!(
            "update loop running every {:?}",
            self.session.timer().period()
        );

        let ticked = panic::catch_unwind(AssertUnwindSafe(|| self.tick_until_stopped(stop)));
        let result = match ticked {
            Ok(result) => result,
            Err(_) => {
                log::error!("update loop panicked");
                Err(BridgeError::Panicked)
            }
        };

        log::debug!("tracking {:?} at shutdown", self.roster());
        match (result, self.shutdown()) {
            (Err(err), Err(shutdown_err)) => {
                log::warn!("shutdown after failure also failed: {shutdown_err}");
                Err(err)
            }
            (Err(err), Ok(())) | (Ok(()), Err(err)) => Err(err),
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    fn tick_until_stopped(&mut self, stop: &AtomicBool) -> Result<()> {
        loop {
            if stop.load(Ordering::Relaxed) {
                return Ok(());
            }
            if !self.session.timer_mut().wait() {
                return Ok(());
            }
            if let Err(err) = self.tick() {
                log::error!("tracking update failed: {err}");
                return Err(err);
            }
        }
    }
}

/// Handle to a bridge running on its own thread.
#[derive(Debug)]
pub struct UpdateLoop {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<Result<()>>>,
}

impl UpdateLoop {
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Signals the loop to stop and waits for it to release the engine.
    pub fn stop(mut self) -> Result<()> {
        self.stop.store(true, Ordering::SeqCst);
        self.join_inner()
    }

    fn join_inner(&mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                log::error!("update loop thread panicked");
                Err(BridgeError::Panicked)
            }),
            None => Ok(()),
        }
    }
}

impl Drop for UpdateLoop {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.join_inner();
    }
}

/// Starts the bridge on a dedicated thread. Startup faults are reported
/// before the thread is spawned.
pub fn start_update_loop<E: TrackingEngine, P: Publisher>(
    mut bridge: Bridge<E, P>,
) -> Result<UpdateLoop> {
    bridge.start()?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    let handle = thread::Builder::new()
        .name("update-loop".into())
        .spawn(move || bridge.run(&stop_flag))
        .map_err(|err| BridgeError::Spawn(err.to_string()))?;

    Ok(UpdateLoop {
        stop,
        handle: Some(handle),
    })
}
