//! Session configuration and the builder that derives it from a persona

use crate::config::RouletteConfig;
use crate::error::{Result, RouletteError};
use crate::persona::Persona;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Behavioral flags sent with every session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionFlags {
    /// Keep the conversation on the engine side
    pub save_messages: bool,
    /// Allow the user to talk over the persona
    pub interruptable: bool,
    /// Keep listening while the persona speaks
    pub parallel_listening: bool,
    /// Stream partial transcripts into the message sequence
    pub stream_transcript: bool,
    /// Speak replies aloud
    pub speech_synthesis_enabled: bool,
    /// Opening line spoken when the session starts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_message: Option<String>,
}

impl Default for SessionFlags {
    fn default() -> Self {
        Self {
            save_messages: true,
            interruptable: true,
            parallel_listening: true,
            stream_transcript: true,
            speech_synthesis_enabled: true,
            answer_message: None,
        }
    }
}

/// Everything the engine needs to open a session for one persona
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub llm_id: String,
    pub persona_id: String,
    pub voice_override: String,
    pub scenario_id: String,
    /// Scenario tool first, navigation tool second, no duplicates
    pub tool_definitions: Vec<String>,
    pub flags: SessionFlags,
}

impl SessionConfig {
    /// Engine wire payload for this configuration
    pub fn to_payload(&self) -> Value {
        let mut output = json!({
            "stream_transcript": self.flags.stream_transcript,
            "speech_synthesis_enabled": self.flags.speech_synthesis_enabled,
        });
        if let Some(answer) = &self.flags.answer_message {
            output["answer_message"] = Value::String(answer.clone());
        }

        json!({
            "general": {
                "save_messages": self.flags.save_messages,
            },
            "input": {
                "interruptable": self.flags.interruptable,
                "parallel_listening": self.flags.parallel_listening,
            },
            "generative": {
                "llm": self.llm_id,
                "persona": self.persona_id,
                "voice_override": self.voice_override,
                "scenario": self.scenario_id,
                "tool_definitions": self.tool_definitions,
            },
            "output": output,
        })
    }
}

/// Pure mapping from a persona to its `SessionConfig`
///
/// Defaults are injected once at construction; `build` never touches
/// anything but its arguments.
#[derive(Clone, Debug)]
pub struct SessionConfigBuilder {
    llm_id: String,
    default_voice_id: String,
    default_scenario_id: String,
    navigation_tool_id: String,
    flags: SessionFlags,
}

impl SessionConfigBuilder {
    pub fn new(config: &RouletteConfig) -> Self {
        Self {
            llm_id: config.llm_id.trim().to_string(),
            default_voice_id: config.default_voice_id.trim().to_string(),
            default_scenario_id: config.default_scenario_id.trim().to_string(),
            navigation_tool_id: config.navigation_tool_id.trim().to_string(),
            flags: config.flags.clone(),
        }
    }

    /// Build the configuration for `persona`
    ///
    /// Fails only when the persona id is blank.
    pub fn build(&self, persona: &Persona) -> Result<SessionConfig> {
        let persona_id = persona.id.trim();
        if persona_id.is_empty() {
            return Err(RouletteError::InvalidPersona(format!(
                "persona {:?} has a blank id",
                persona.name
            )));
        }

        let voice_override = non_blank(persona.voice_id.as_deref())
            .unwrap_or(&self.default_voice_id)
            .to_string();
        let scenario_id = non_blank(persona.scenario_id.as_deref())
            .unwrap_or(&self.default_scenario_id)
            .to_string();

        let mut tool_definitions = vec![scenario_id.clone()];
        if self.navigation_tool_id != scenario_id {
            tool_definitions.push(self.navigation_tool_id.clone());
        }

        Ok(SessionConfig {
            llm_id: self.llm_id.clone(),
            persona_id: persona_id.to_string(),
            voice_override,
            scenario_id,
            tool_definitions,
            flags: self.flags.clone(),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
