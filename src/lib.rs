pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod messages;
pub mod microphone;
pub mod navigation;
pub mod orchestrator;
pub mod persona;
pub mod session;
pub mod tools;

pub use config::RouletteConfig;
pub use engine::{Engine, EngineError, LoopbackEngine, SessionHandle, SessionId};
pub use error::{Result, RouletteError};
pub use events::SessionEvent;
pub use messages::{Message, MessageId, ToolCall};
pub use microphone::{MicrophonePhase, MicrophoneState, ToggleOutcome};
pub use navigation::{Direction, NavigationRequest, NavigationState, RejectReason, TransitionOutcome};
pub use orchestrator::SessionOrchestrator;
pub use persona::{FileDirectory, Persona, PersonaCatalog, PersonaDirectory, PersonaDraft};
