//! Saved bags and the check of a query's bag references.

use crate::profile::ProfileError;
use crate::query::PathQuery;
use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

/// Saved bags keyed by name
pub type SavedBags = HashMap<String, SavedBag>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BagSourceError {
    #[error("Unknown bag state: {0}")]
    UnknownState(String),

    #[error("Saved bags are unavailable: {0}")]
    Unavailable(String),
}

impl From<ProfileError> for BagSourceError {
    fn from(e: ProfileError) -> Self {
        BagSourceError::Unavailable(e.to_string())
    }
}

/// Lifecycle state of a saved bag. Only `Current` bags can be queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum BagState {
    Current,
    NotCurrent,
    ToUpgrade,
    Upgrading,
}

impl BagState {
    pub fn as_str(self) -> &'static str {
        match self {
            BagState::Current => "CURRENT",
            BagState::NotCurrent => "NOT_CURRENT",
            BagState::ToUpgrade => "TO_UPGRADE",
            BagState::Upgrading => "UPGRADING",
        }
    }

    pub fn is_current(self) -> bool {
        self == BagState::Current
    }
}

impl FromStr for BagState {
    type Err = BagSourceError;

    /// Case-insensitive, `-` and `_` interchangeable
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "CURRENT" => Ok(BagState::Current),
            "NOT_CURRENT" => Ok(BagState::NotCurrent),
            "TO_UPGRADE" => Ok(BagState::ToUpgrade),
            "UPGRADING" => Ok(BagState::Upgrading),
            _ => Err(BagSourceError::UnknownState(s.to_string())),
        }
    }
}

impl TryFrom<String> for BagState {
    type Error = BagSourceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for BagState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A saved bag as seen by the query builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedBag {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub state: BagState,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub bag_type: Option<String>,
    #[serde(default)]
    pub size: usize,
}

impl SavedBag {
    pub fn new(name: impl Into<String>, state: BagState) -> Self {
        Self {
            name: name.into(),
            description: None,
            state,
            bag_type: None,
            size: 0,
        }
    }
}

type BagSource<'a> = Box<dyn FnOnce() -> Result<SavedBags, BagSourceError> + Send + 'a>;

/// Deferred, memoised source of saved bags.
///
/// The wrapped closure runs at most once, on first [`produce`](Self::produce).
/// Later calls return the remembered result.
pub struct BagProducer<'a> {
    source: RefCell<Option<BagSource<'a>>>,
    result: OnceCell<Result<SavedBags, BagSourceError>>,
}

impl<'a> BagProducer<'a> {
    pub fn new<F>(source: F) -> Self
    where
        F: FnOnce() -> Result<SavedBags, BagSourceError> + Send + 'a,
    {
        Self {
            source: RefCell::new(Some(Box::new(source))),
            result: OnceCell::new(),
        }
    }

    /// Producer over a fixed snapshot
    pub fn from_bags(bags: impl IntoIterator<Item = SavedBag>) -> Self {
        let bags: SavedBags = bags.into_iter().map(|b| (b.name.clone(), b)).collect();
        Self::new(move || Ok(bags))
    }

    pub fn produce(&self) -> Result<&SavedBags, BagSourceError> {
        let result = self.result.get_or_init(|| match self.source.borrow_mut().take() {
            Some(source) => {
                debug!("Fetching saved bags");
                source()
            }
            None => Err(BagSourceError::Unavailable(
                "bag source was already consumed".to_string(),
            )),
        });
        result.as_ref().map_err(Clone::clone)
    }

    /// Whether the source has been called
    pub fn was_invoked(&self) -> bool {
        self.result.get().is_some()
    }
}

impl fmt::Debug for BagProducer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BagProducer")
            .field("invoked", &self.was_invoked())
            .finish()
    }
}

/// Bag references of a query that cannot be used
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BagCheck {
    pub missing: BTreeSet<String>,
    pub stale: BTreeSet<String>,
}

impl BagCheck {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.stale.is_empty()
    }
}

/// Sort the query's bag names into missing and stale.
///
/// The producer is only called when the query names at least one bag.
pub fn check_bags(query: &PathQuery, producer: &BagProducer<'_>) -> Result<BagCheck, BagSourceError> {
    let names = query.bag_names();
    let mut check = BagCheck::default();
    if names.is_empty() {
        return Ok(check);
    }

    let bags = producer.produce()?;
    for name in names {
        match bags.get(&name) {
            None => {
                check.missing.insert(name);
            }
            Some(bag) if !bag.state.is_current() => {
                warn!("Bag {} is in state {}", name, bag.state);
                check.stale.insert(name);
            }
            Some(_) => {}
        }
    }
    Ok(check)
}
