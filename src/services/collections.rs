//! Shelf to collection resolution

use std::{collections::HashMap, sync::Arc};

use indexmap::IndexSet;

use crate::{
    error::AppResult,
    models::{CollectionRef, NewCollection},
    normalize::lookup_reading_status,
    repository::LibraryStore,
};

pub const DEFAULT_COLLECTION_ICON: &str = "bookmark";

const COLLECTION_COLORS: &[&str] = &[
    "#EF4444", "#F97316", "#F59E0B", "#84CC16", "#10B981", "#06B6D4", "#3B82F6", "#6366F1", "#8B5CF6",
    "#EC4899",
];

/// Stable color for a collection name, independent of case
pub fn default_color(name: &str) -> &'static str {
    let hash = name
        .to_lowercase()
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
    COLLECTION_COLORS[hash as usize % COLLECTION_COLORS.len()]
}

/// Collections resolved for one row
#[derive(Debug, Default)]
pub struct ResolvedShelves {
    pub collections: Vec<CollectionRef>,
    /// Names of collections created while resolving this row
    pub created: Vec<String>,
}

/// Maps shelf names to the user's collections, creating the missing ones.
///
/// One resolver lives for one import run and caches what it has already
/// looked up or created. Every successful create is also kept in a run-level
/// set, so names survive a row that fails after its collections were made.
pub struct CollectionResolver {
    store: Arc<dyn LibraryStore>,
    user_id: i64,
    cache: HashMap<String, CollectionRef>,
    created: IndexSet<String>,
}

impl CollectionResolver {
    pub fn new(store: Arc<dyn LibraryStore>, user_id: i64) -> Self {
        Self {
            store,
            user_id,
            cache: HashMap::new(),
            created: IndexSet::new(),
        }
    }

    /// Names created since the last call, in creation order
    pub fn take_created(&mut self) -> Vec<String> {
        self.created.drain(..).collect()
    }

    pub async fn resolve(&mut self, shelves: &[String], create_collections: bool) -> AppResult<ResolvedShelves> {
        let mut resolved = ResolvedShelves::default();
        if !create_collections {
            return Ok(resolved);
        }

        for shelf in shelves {
            let name = shelf.trim();
            // Status shelves are carried by the reading status
            if name.is_empty() || lookup_reading_status(name).is_some() {
                continue;
            }
            let key = name.to_lowercase();
            if let Some(cached) = self.cache.get(&key) {
                if !resolved.collections.contains(cached) {
                    resolved.collections.push(cached.clone());
                }
                continue;
            }

            let collection = match self.store.find_collection_by_name(self.user_id, name).await? {
                Some(existing) => CollectionRef::from(existing),
                None => {
                    let created = self
                        .store
                        .create_collection(
                            self.user_id,
                            &NewCollection {
                                name: name.to_string(),
                                icon: DEFAULT_COLLECTION_ICON.to_string(),
                                color: default_color(name).to_string(),
                            },
                        )
                        .await?;
                    tracing::debug!(collection = %created.name, id = created.id, "Created collection");
                    resolved.created.push(created.name.clone());
                    self.created.insert(created.name.clone());
                    CollectionRef::from(created)
                }
            };
            self.cache.insert(key, collection.clone());
            resolved.collections.push(collection);
        }

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::Collection;
    use crate::repository::MockLibraryStore;
    use chrono::Utc;

    fn collection(id: i64, name: &str) -> Collection {
        Collection {
            id,
            user_id: 1,
            name: name.to_string(),
            icon: DEFAULT_COLLECTION_ICON.to_string(),
            color: default_color(name).to_string(),
            created_at: Utc::now(),
        }
    }

    fn shelves(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_disabled_is_noop() {
        let mut store = MockLibraryStore::new();
        store.expect_find_collection_by_name().never();
        store.expect_create_collection().never();

        let mut resolver = CollectionResolver::new(Arc::new(store), 1);
        let resolved = resolver.resolve(&shelves(&["fantasy"]), false).await.unwrap();
        assert!(resolved.collections.is_empty());
    }

    #[tokio::test]
    async fn test_creates_missing_and_reuses_existing() {
        let mut store = MockLibraryStore::new();
        store
            .expect_find_collection_by_name()
            .times(2)
            .returning(|_, name| {
                if name.eq_ignore_ascii_case("favorites") {
                    Ok(Some(collection(4, "Favorites")))
                } else {
                    Ok(None)
                }
            });
        store
            .expect_create_collection()
            .times(1)
            .returning(|_, new| Ok(collection(7, &new.name)));

        let mut resolver = CollectionResolver::new(Arc::new(store), 1);
        let first = resolver
            .resolve(&shelves(&["fantasy", "favorites", "to-read"]), true)
            .await
            .unwrap();
        assert_eq!(first.created, vec!["fantasy".to_string()]);
        assert_eq!(first.collections.len(), 2);

        // Second row hits the cache only
        let second = resolver.resolve(&shelves(&["Fantasy"]), true).await.unwrap();
        assert!(second.created.is_empty());
        assert_eq!(second.collections[0].id, 7);
        assert_eq!(resolver.take_created(), vec!["fantasy".to_string()]);
        assert!(resolver.take_created().is_empty());
    }

    #[tokio::test]
    async fn test_created_names_survive_a_failed_shelf() {
        let mut store = MockLibraryStore::new();
        store.expect_find_collection_by_name().returning(|_, _| Ok(None));
        store.expect_create_collection().returning(|_, new| {
            if new.name == "broken" {
                Err(AppError::Conflict("collection name taken".to_string()))
            } else {
                Ok(collection(7, &new.name))
            }
        });

        let mut resolver = CollectionResolver::new(Arc::new(store), 1);
        let failed = resolver.resolve(&shelves(&["fantasy", "broken"]), true).await;
        assert!(failed.is_err());
        assert_eq!(resolver.take_created(), vec!["fantasy".to_string()]);
    }

    #[test]
    fn test_default_color_is_stable() {
        assert_eq!(default_color("Fantasy"), default_color("fantasy"));
        assert!(COLLECTION_COLORS.contains(&default_color("sci-fi")));
    }
}
