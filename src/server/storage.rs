//! Server-side recipe storage.
//!
//! All recipes live in one YAML file in the data directory:
//! ```text
//! <DATA_DIR>/
//!   recipes.yaml
//!   backup/
//!     recipes-incompatible-<date>.yaml
//! ```
//!
//! A file that cannot be parsed is copied to `backup/` and replaced by an
//! empty database.

use recipe_sync_core::models::now_millis;
use recipe_sync_core::remote::wire::{BackendRecipe, RecipeRequest};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Errors that can occur reading or writing the recipes file.
#[derive(Debug)]
pub enum ServerStorageError {
    /// I/O error reading or writing a file.
    IoError(PathBuf, io::Error),
    /// Error serializing the recipes file.
    SerializeError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ServerStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerStorageError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            ServerStorageError::SerializeError(path, e) => {
                write!(f, "Failed to write {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ServerStorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerStorageError::IoError(_, e) => Some(e),
            ServerStorageError::SerializeError(_, e) => Some(e),
        }
    }
}

/// Why a create or delete request was refused.
#[derive(Debug)]
pub enum Rejection {
    /// The requested id is already taken.
    Exists(i64),
    EmptyTitle,
    /// No id can follow this one.
    IdOutOfRange(i64),
    NotFound(i64),
    /// The recipe belongs to another user.
    NotOwner(i64),
    Storage(ServerStorageError),
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Exists(id) => write!(f, "Recipe with id {} exists!", id),
            Rejection::EmptyTitle => write!(f, "Recipe title can't be empty"),
            Rejection::IdOutOfRange(id) => write!(f, "Recipe id {} is out of range", id),
            Rejection::NotFound(id) => write!(f, "There is no recipe with id {}", id),
            Rejection::NotOwner(id) => write!(
                f,
                "Recipe {} does not belong to you, you can't delete it!",
                id
            ),
            Rejection::Storage(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Rejection {}

impl From<ServerStorageError> for Rejection {
    fn from(e: ServerStorageError) -> Self {
        Rejection::Storage(e)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RecipesFile {
    #[serde(default)]
    recipes: Vec<BackendRecipe>,
}

/// Recipes of every user, mirrored to a YAML file on each change.
#[derive(Debug)]
pub struct RecipeDatabase {
    path: PathBuf,
    recipes: Vec<BackendRecipe>,
    next_id: i64,
}

impl RecipeDatabase {
    /// Opens the database file, creating it when missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ServerStorageError> {
        let path = path.into();

        let recipes = match fs::read_to_string(&path) {
            Ok(contents) => match serde_yaml::from_str::<Option<RecipesFile>>(&contents) {
                Ok(file) => file.unwrap_or_default().recipes,
                Err(e) => {
                    tracing::warn!(
                        "Recipes file {} cannot be validated ({}); starting a new one",
                        path.display(),
                        e
                    );
                    backup_incompatible(&path)?;
                    Vec::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(ServerStorageError::IoError(path, e)),
        };

        let next_id = recipes.iter().map(|r| r.id).max().map_or(1, |max| max.saturating_add(1));
        let db = Self {
            path,
            recipes,
            next_id,
        };
        db.write(&db.recipes)?;

        tracing::info!(
            "Loaded {} recipe(s) from {}",
            db.recipes.len(),
            db.path.display()
        );
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recipes owned by `user`, or everyone's when `all` is set.
    pub fn list(&self, user: &str, all: bool) -> Vec<BackendRecipe> {
        self.recipes
            .iter()
            .filter(|r| all || r.user.as_deref() == Some(user))
            .cloned()
            .collect()
    }

    pub fn create(
        &mut self,
        user: &str,
        request: RecipeRequest,
    ) -> Result<BackendRecipe, Rejection> {
        let id = match request.id {
            Some(id) if self.recipes.iter().any(|r| r.id == id) => {
                return Err(Rejection::Exists(id));
            }
            Some(id) => id,
            None => self.next_id,
        };
        if request.title.trim().is_empty() {
            return Err(Rejection::EmptyTitle);
        }
        let following = id.checked_add(1).ok_or(Rejection::IdOutOfRange(id))?;

        let recipe = BackendRecipe {
            id,
            title: request.title,
            body: request.body,
            timestamp: request.timestamp.unwrap_or_else(now_millis),
            user: Some(user.to_string()),
        };
        let mut recipes = self.recipes.clone();
        recipes.push(recipe.clone());
        self.write(&recipes)?;
        self.recipes = recipes;
        self.next_id = self.next_id.max(following);

        tracing::info!("User {} created recipe {}", user, id);
        Ok(recipe)
    }

    pub fn delete(&mut self, user: &str, id: i64) -> Result<BackendRecipe, Rejection> {
        let index = self
            .recipes
            .iter()
            .position(|r| r.id == id)
            .ok_or(Rejection::NotFound(id))?;
        if self.recipes[index].user.as_deref() != Some(user) {
            return Err(Rejection::NotOwner(id));
        }

        let mut recipes = self.recipes.clone();
        let removed = recipes.remove(index);
        self.write(&recipes)?;
        self.recipes = recipes;

        tracing::info!("User {} deleted recipe {}", user, id);
        Ok(removed)
    }

    /// Writes `recipes` atomically using temp file + rename. In-memory state
    /// is only replaced after this succeeds.
    fn write(&self, recipes: &[BackendRecipe]) -> Result<(), ServerStorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ServerStorageError::IoError(parent.to_path_buf(), e))?;
        }

        let file = RecipesFile {
            recipes: recipes.to_vec(),
        };
        let yaml = serde_yaml::to_string(&file)
            .map_err(|e| ServerStorageError::SerializeError(self.path.clone(), e))?;

        let temp_path = self.path.with_extension("yaml.tmp");
        let mut temp = File::create(&temp_path)
            .map_err(|e| ServerStorageError::IoError(temp_path.clone(), e))?;
        temp.write_all(yaml.as_bytes())
            .map_err(|e| ServerStorageError::IoError(temp_path.clone(), e))?;
        temp.sync_all()
            .map_err(|e| ServerStorageError::IoError(temp_path.clone(), e))?;

        fs::rename(&temp_path, &self.path)
            .map_err(|e| ServerStorageError::IoError(self.path.clone(), e))
    }
}

fn backup_incompatible(path: &Path) -> Result<(), ServerStorageError> {
    let backup_dir = path
        .parent()
        .map(|p| p.join("backup"))
        .unwrap_or_else(|| PathBuf::from("backup"));
    fs::create_dir_all(&backup_dir)
        .map_err(|e| ServerStorageError::IoError(backup_dir.clone(), e))?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "recipes".to_string());
    let date = chrono::Local::now().format("%Y-%m-%d-%H-%M");
    let backup_path = backup_dir.join(format!("{}-incompatible-{}.yaml", stem, date));

    fs::copy(path, &backup_path)
        .map_err(|e| ServerStorageError::IoError(backup_path.clone(), e))?;
    tracing::warn!("Backed up incompatible file to {}", backup_path.display());
    Ok(())
}
