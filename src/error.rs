use std::fmt;

use crate::engine::Subsystem;
use crate::pipeline::session::SessionState;

pub type Result<T> = std::result::Result<T, BridgeError>;

/// How the update loop must react to an engine fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultKind {
    /// Engine still usable; recovered by a full session reset.
    Recoverable,
    /// Engine state undefined; the bridge must stop.
    Fatal,
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("license not acquired")]
    LicenseNotAcquired,

    #[error("engine not initialized")]
    NotInitialized,

    #[error("invalid config value {value:?} for {key}")]
    InvalidConfig { key: String, value: String },

    #[error("{kind}: {message}")]
    Internal { kind: String, message: String },
}

impl EngineError {
    pub fn internal(kind: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Internal {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> FaultKind {
        match self {
            EngineError::LicenseNotAcquired => FaultKind::Recoverable,
            EngineError::NotInitialized
            | EngineError::InvalidConfig { .. }
            | EngineError::Internal { .. } => FaultKind::Fatal,
        }
    }
}

/// Where in the session lifecycle an engine fault was raised.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Init,
    Configure,
    CreateSensors,
    Run,
    Update(Subsystem),
    Release,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Init => f.write_str("init"),
            Stage::Configure => f.write_str("configure"),
            Stage::CreateSensors => f.write_str("create sensors"),
            Stage::Run => f.write_str("run"),
            Stage::Update(subsystem) => write!(f, "update {}", subsystem.label()),
            Stage::Release => f.write_str("release"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("tracking engine fault during {stage}: {source}")]
    Engine {
        stage: Stage,
        #[source]
        source: EngineError,
    },

    #[error("cannot {op} a session that is {from:?}")]
    InvalidTransition {
        from: SessionState,
        op: &'static str,
    },

    #[error("failed to spawn update loop: {0}")]
    Spawn(String),

    #[error("update loop panicked")]
    Panicked,
}

impl BridgeError {
    pub fn engine(stage: Stage) -> impl FnOnce(EngineError) -> BridgeError {
        move |source| BridgeError::Engine { stage, source }
    }

    /// Fault kind of the underlying engine error, if any.
    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            BridgeError::Engine { source, .. } => Some(source.kind()),
            BridgeError::InvalidTransition { .. }
            | BridgeError::Spawn(_)
            | BridgeError::Panicked => None,
        }
    }
}
