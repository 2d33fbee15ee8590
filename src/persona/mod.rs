//! Personas and the ordered catalog navigation cycles through

pub mod directory;

pub use directory::{FileDirectory, PersonaDirectory, PersonaDraft};

use crate::error::{Result, RouletteError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A selectable conversational identity
///
/// Owned by the external catalog; the core only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, rename = "voice", skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    /// Scenario/tool definition specific to this persona
    #[serde(default, rename = "scenario", skip_serializing_if = "Option::is_none")]
    pub scenario_id: Option<String>,
}

impl Persona {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            image_url: None,
            voice_id: None,
            scenario_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = Some(voice_id.into());
        self
    }

    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn with_scenario(mut self, scenario_id: impl Into<String>) -> Self {
        self.scenario_id = Some(scenario_id.into());
        self
    }
}

/// Ordered sequence of personas
///
/// Insertion order defines navigation order. Ids are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonaCatalog {
    personas: Vec<Persona>,
}

impl PersonaCatalog {
    /// Build a catalog, rejecting duplicate ids
    pub fn new(personas: Vec<Persona>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(personas.len());
        for persona in &personas {
            if !seen.insert(persona.id.as_str()) {
                return Err(RouletteError::CatalogError(format!(
                    "duplicate persona id: {}",
                    persona.id
                )));
            }
        }
        Ok(Self { personas })
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Persona> {
        self.personas.get(index)
    }

    pub fn as_slice(&self) -> &[Persona] {
        &self.personas
    }

    pub fn iter(&self) -> impl Iterator<Item = &Persona> {
        self.personas.iter()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.personas.iter().position(|p| p.id == id)
    }

    /// Whether navigation between personas is meaningful
    pub fn is_navigable(&self) -> bool {
        self.personas.len() > 1
    }
}
