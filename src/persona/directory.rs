//! Persona directory: the external catalog personas are fetched from
//!
//! The core only consumes `list_personas`; `create_persona` exists for the
//! front ends that let users add companions.

use super::Persona;
use crate::error::{Result, RouletteError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Fields supplied when creating a persona
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonaDraft {
    pub name: String,
    pub description: String,
    pub voice_id: Option<String>,
    pub image_url: Option<String>,
}

/// Source of the ordered persona list
#[async_trait]
pub trait PersonaDirectory: Send + Sync {
    /// Fetch all personas in navigation order
    async fn list_personas(&self) -> Result<Vec<Persona>>;

    /// Create a persona and return it with its assigned id
    async fn create_persona(&self, draft: PersonaDraft) -> Result<Persona>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersonaFile {
    #[serde(default)]
    personas: Vec<Persona>,
}

/// Persona directory backed by a TOML file of `[[personas]]` tables
pub struct FileDirectory {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_file(&self) -> Result<PersonaFile> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(PersonaFile::default());
        }

        let content = tokio::fs::read_to_string(&self.path).await?;
        toml::from_str(&content).map_err(|e| {
            RouletteError::CatalogError(format!("{}: {}", self.path.display(), e))
        })
    }
}

#[async_trait]
impl PersonaDirectory for FileDirectory {
    async fn list_personas(&self) -> Result<Vec<Persona>> {
        let file = self.read_file().await?;
        debug!("Loaded {} personas from {}", file.personas.len(), self.path.display());
        Ok(file.personas)
    }

    async fn create_persona(&self, draft: PersonaDraft) -> Result<Persona> {
        if draft.name.trim().is_empty() {
            return Err(RouletteError::InvalidPersona("name must not be blank".to_string()));
        }

        let _guard = self.write_lock.lock().await;
        let mut file = self.read_file().await?;

        let persona = Persona {
            id: Uuid::new_v4().to_string(),
            name: draft.name.trim().to_string(),
            description: draft.description,
            image_url: draft.image_url.filter(|url| !url.trim().is_empty()),
            voice_id: draft.voice_id.filter(|voice| !voice.trim().is_empty()),
            scenario_id: None,
        };
        file.personas.push(persona.clone());

        let content = toml::to_string_pretty(&file)
            .map_err(|e| RouletteError::CatalogError(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, content).await?;

        info!("Created persona {} ({})", persona.name, persona.id);
        Ok(persona)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let directory = FileDirectory::new(dir.path().join("personas.toml"));
        assert!(directory.list_personas().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_reads_tables_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("personas.toml");
        std::fs::write(
            &path,
            r#"
[[personas]]
id = "p1"
name = "Marlowe"
description = "A tired detective"
voice = "voice-1"

[[personas]]
id = "p2"
name = "Juniper"
"#,
        )
        .unwrap();

        let personas = FileDirectory::new(&path).list_personas().await.unwrap();
        assert_eq!(personas.len(), 2);
        assert_eq!(personas[0].id, "p1");
        assert_eq!(personas[0].voice_id.as_deref(), Some("voice-1"));
        assert_eq!(personas[1].name, "Juniper");
        assert!(personas[1].voice_id.is_none());
    }

    #[tokio::test]
    async fn test_create_appends_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("personas.toml");
        let directory = FileDirectory::new(&path);

        let created = directory
            .create_persona(PersonaDraft {
                name: "  Wren ".to_string(),
                description: "Birdwatcher".to_string(),
                voice_id: Some(String::new()),
                image_url: None,
            })
            .await
            .unwrap();

        assert_eq!(created.name, "Wren");
        assert!(created.voice_id.is_none(), "blank voice is dropped");
        assert!(Uuid::parse_str(&created.id).is_ok());

        let reread = FileDirectory::new(&path).list_personas().await.unwrap();
        assert_eq!(reread, vec![created]);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let dir = tempfile::tempdir().unwrap();
        let directory = FileDirectory::new(dir.path().join("personas.toml"));
        let err = directory
            .create_persona(PersonaDraft::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RouletteError::InvalidPersona(_)));
    }
}
