//! User profile: the store of saved bags and the list description update.

use crate::bags::{BagProducer, BagSourceError, SavedBag, SavedBags};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Bag does not exist: {0}")]
    BagDoesNotExist(String),

    #[error("Failed to access profile {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid profile: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Profile {path} lists bag {name} more than once")]
    DuplicateBag { path: PathBuf, name: String },
}

/// Where saved bags live
pub trait BagStore: Send + Sync {
    /// Snapshot of every saved bag, keyed by name
    fn saved_bags(&self) -> Result<SavedBags, ProfileError>;

    fn update_bag_description(&self, name: &str, description: &str) -> Result<(), ProfileError>;

    /// Lazy producer over this store for [`crate::PathQueryBuilder::build`]
    fn producer(&self) -> BagProducer<'_> {
        BagProducer::new(move || self.saved_bags().map_err(BagSourceError::from))
    }
}

/// Bag store held in memory, optionally backed by a JSON file
#[derive(Debug, Default)]
pub struct InMemoryProfile {
    bags: RwLock<SavedBags>,
}

impl InMemoryProfile {
    pub fn new(bags: impl IntoIterator<Item = SavedBag>) -> Self {
        Self {
            bags: RwLock::new(bags.into_iter().map(|b| (b.name.clone(), b)).collect()),
        }
    }

    /// Load a profile from a JSON array of saved bags
    pub async fn load(path: &Path) -> Result<Self, ProfileError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ProfileError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let bags: Vec<SavedBag> = serde_json::from_str(&content)?;
        if let Some(name) = first_repeated_name(&bags) {
            return Err(ProfileError::DuplicateBag {
                path: path.to_path_buf(),
                name,
            });
        }
        debug!("Loaded {} saved bag(s) from {}", bags.len(), path.display());
        Ok(Self::new(bags))
    }

    /// Write the profile back as a JSON array, sorted by bag name
    pub async fn save(&self, path: &Path) -> Result<(), ProfileError> {
        let content = serde_json::to_string_pretty(&self.sorted())?;
        tokio::fs::write(path, content)
            .await
            .map_err(|source| ProfileError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        info!("Saved profile to {}", path.display());
        Ok(())
    }

    /// All bags sorted by name
    pub fn sorted(&self) -> Vec<SavedBag> {
        let mut bags: Vec<SavedBag> = self.bags.read().values().cloned().collect();
        bags.sort_by(|a, b| a.name.cmp(&b.name));
        bags
    }
}

fn first_repeated_name(bags: &[SavedBag]) -> Option<String> {
    let mut seen = HashSet::new();
    bags.iter()
        .find(|b| !seen.insert(b.name.as_str()))
        .map(|b| b.name.clone())
}

impl BagStore for InMemoryProfile {
    fn saved_bags(&self) -> Result<SavedBags, ProfileError> {
        Ok(self.bags.read().clone())
    }

    fn update_bag_description(&self, name: &str, description: &str) -> Result<(), ProfileError> {
        let mut bags = self.bags.write();
        let bag = bags
            .get_mut(name)
            .ok_or_else(|| ProfileError::BagDoesNotExist(name.to_string()))?;
        bag.description = Some(description.to_string());
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum ListUpdateError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("The list {0} does not belong to the user")]
    NotOwned(String),

    #[error(transparent)]
    Store(#[from] ProfileError),
}

/// Result of a successful description update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListSummary {
    #[serde(rename = "listName")]
    pub name: String,
    #[serde(rename = "listDescription")]
    pub description: String,
}

/// Change the description of one of the user's lists
pub fn update_list_description(
    store: &dyn BagStore,
    name: &str,
    description: &str,
) -> Result<ListSummary, ListUpdateError> {
    if name.trim().is_empty() {
        return Err(ListUpdateError::MissingParameter("name"));
    }
    if description.trim().is_empty() {
        return Err(ListUpdateError::MissingParameter("description"));
    }

    match store.update_bag_description(name, description) {
        Ok(()) => Ok(ListSummary {
            name: name.to_string(),
            description: description.to_string(),
        }),
        Err(ProfileError::BagDoesNotExist(_)) => Err(ListUpdateError::NotOwned(name.to_string())),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bags::BagState;

    fn profile() -> InMemoryProfile {
        InMemoryProfile::new(vec![
            SavedBag::new("favourites", BagState::Current),
            SavedBag::new("old", BagState::ToUpgrade),
        ])
    }

    #[test]
    fn test_update_description() {
        let profile = profile();
        let summary = update_list_description(&profile, "favourites", "My genes").unwrap();
        assert_eq!(summary.name, "favourites");
        assert_eq!(summary.description, "My genes");
        let bags = profile.saved_bags().unwrap();
        assert_eq!(bags["favourites"].description.as_deref(), Some("My genes"));
    }

    #[test]
    fn test_update_unknown_list() {
        let err = update_list_description(&profile(), "nope", "x").unwrap_err();
        assert_eq!(err.to_string(), "The list nope does not belong to the user");
    }

    #[test]
    fn test_update_requires_parameters() {
        assert!(matches!(
            update_list_description(&profile(), "", "x"),
            Err(ListUpdateError::MissingParameter("name"))
        ));
        assert!(matches!(
            update_list_description(&profile(), "old", "  "),
            Err(ListUpdateError::MissingParameter("description"))
        ));
    }

    #[test]
    fn test_store_producer() {
        let profile = profile();
        let producer = profile.producer();
        assert!(!producer.was_invoked());
        assert_eq!(producer.produce().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_load_and_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        tokio::fs::write(
            &path,
            r#"[{"name": "setB", "state": "current", "size": 3},
                {"name": "setA", "state": "not-current", "description": "old genes"}]"#,
        )
        .await
        .unwrap();

        let profile = InMemoryProfile::load(&path).await.unwrap();
        profile.update_bag_description("setB", "new genes").unwrap();
        profile.save(&path).await.unwrap();

        let reloaded = InMemoryProfile::load(&path).await.unwrap();
        let names: Vec<_> = reloaded.sorted().into_iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["setA", "setB"]);
        assert_eq!(
            reloaded.saved_bags().unwrap()["setB"].description.as_deref(),
            Some("new genes")
        );
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = InMemoryProfile::load(Path::new("/no/such/profile.json")).await;
        assert!(matches!(result, Err(ProfileError::Io { .. })));
    }

    #[tokio::test]
    async fn test_load_rejects_repeated_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        tokio::fs::write(
            &path,
            r#"[{"name": "setA", "state": "current"},
                {"name": "setB", "state": "current"},
                {"name": "setA", "state": "to-upgrade"}]"#,
        )
        .await
        .unwrap();

        let result = InMemoryProfile::load(&path).await;
        assert!(matches!(
            result,
            Err(ProfileError::DuplicateBag { ref name, .. }) if name == "setA"
        ));
    }
}
