//! Shared fixtures for the integration tests

#![allow(dead_code)]

use crossbeam_channel::Receiver;
use persona_roulette::{
    LoopbackEngine, Persona, PersonaCatalog, RouletteConfig, SessionEvent, SessionOrchestrator,
};
use std::sync::Arc;

pub type Orchestrator = SessionOrchestrator<LoopbackEngine>;

pub struct Fixture {
    pub engine: Arc<LoopbackEngine>,
    pub orchestrator: Orchestrator,
    pub events: Receiver<SessionEvent>,
}

impl Fixture {
    pub fn new(personas: Vec<Persona>) -> Self {
        Self::with_engine(LoopbackEngine::new(), personas)
    }

    pub fn with_engine(engine: LoopbackEngine, personas: Vec<Persona>) -> Self {
        let engine = Arc::new(engine);
        let catalog = PersonaCatalog::new(personas).expect("valid catalog");
        let (orchestrator, events) =
            SessionOrchestrator::new(Arc::clone(&engine), catalog, RouletteConfig::default())
                .expect("orchestrator");
        Self {
            engine,
            orchestrator,
            events,
        }
    }

    /// Fixture with `count` personas, session already started
    pub async fn started(count: usize) -> Self {
        let fixture = Self::new(cast(count));
        fixture.orchestrator.start().await.expect("start");
        fixture.drain();
        fixture
    }

    pub fn index(&self) -> usize {
        self.orchestrator.navigation_state().current_index
    }

    pub fn drain(&self) -> Vec<SessionEvent> {
        self.events.try_iter().collect()
    }

    /// Persona ids of every connect attempt, in order
    pub fn connected_personas(&self) -> Vec<String> {
        self.engine
            .connect_attempts()
            .into_iter()
            .map(|config| config.persona_id)
            .collect()
    }
}

pub fn cast(count: usize) -> Vec<Persona> {
    (0..count)
        .map(|i| Persona::new(format!("p{}", i), format!("Persona {}", i)))
        .collect()
}
