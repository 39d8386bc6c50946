//! # Document Repository
//!
//! Generic CRUD over one collection.
//!
//! ## Operation Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DocRepository<T>::find(&ListOptions)                                  │
//! │       │                                                                 │
//! │       ├── field_map ──► filter document   (fields: ignored)            │
//! │       ├── order_by  ──► sort document     (id → _id, ASC 1, DESC -1)   │
//! │       │                                                                 │
//! │       ├── take_session()                                               │
//! │       ├── count_documents(filter)         ──► total                    │
//! │       ├── find(filter).sort.skip.limit    ──► items                    │
//! │       └── session dropped on return                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ids are hex ObjectId strings at this API; malformed ones are rejected with
//! [`DocError::InvalidId`] before any I/O.

use dbutil_core::{Entity, FieldMap, ListOptions, NamingStrategy, Page};
use mongodb::bson::{doc, Bson};
use mongodb::Collection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::convert::{filter_document, FindPlan};
use crate::error::{parse_object_id, DocError, DocResult};
use crate::pool::DocStore;

/// Generic repository over one collection.
///
/// ## Example
/// ```rust,ignore
/// let notes = DocRepository::<Note>::new(&store, "note");
///
/// let id = notes.insert(&note).await?;
/// let again = notes.find_one(&id).await?;        // Option<Note>
/// let page = notes.find(&ListOptions::new(1, 20).desc(None)).await?;
/// ```
pub struct DocRepository<T>
where
    T: Send + Sync,
{
    store: DocStore,
    name: String,
    collection: Collection<T>,
}

impl<T> DocRepository<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + Unpin,
{
    /// Creates a repository over the named collection.
    pub fn new(store: &DocStore, collection: &str) -> Self {
        DocRepository {
            store: store.clone(),
            name: collection.to_string(),
            collection: store.collection(collection),
        }
    }

    /// Creates a repository named after the entity (singular, snake_case).
    pub fn for_entity(store: &DocStore) -> Self
    where
        T: Entity,
    {
        Self::new(store, &T::table_name(&NamingStrategy::default()))
    }

    pub fn collection_name(&self) -> &str {
        &self.name
    }

    /// First document matching the equality filter, or `None`.
    pub async fn query(&self, fields: &FieldMap) -> DocResult<Option<T>> {
        let filter = filter_document(fields)?;
        let mut session = self.store.take_session().await?;

        debug!(collection = %self.name, filter = %filter, "Querying document");
        Ok(self.collection.find_one(filter).session(&mut session).await?)
    }

    /// One page of documents plus the total matching count.
    ///
    /// Skips `(page - 1) * limit` documents.
    pub async fn find(&self, options: &ListOptions) -> DocResult<Page<T>> {
        if !options.fields.is_empty() {
            debug!(
                collection = %self.name,
                fields = options.fields.len(),
                "Compound fields are not supported by the document store, ignoring"
            );
        }

        let FindPlan {
            filter,
            sort,
            skip,
            limit,
        } = FindPlan::from_options(options)?;
        let mut session = self.store.take_session().await?;

        debug!(
            collection = %self.name,
            filter = %filter,
            skip,
            limit,
            "Finding documents"
        );

        let total = self
            .collection
            .count_documents(filter.clone())
            .session(&mut session)
            .await?;

        let mut find = self.collection.find(filter).skip(skip).limit(limit);
        if let Some(sort) = sort {
            find = find.sort(sort);
        }

        let mut cursor = find.session(&mut session).await?;
        let mut items = Vec::new();
        while let Some(document) = cursor.next(&mut session).await {
            items.push(document?);
        }

        Ok(Page::new(items, total, options))
    }

    /// Inserts one document and returns its id.
    ///
    /// ObjectIds come back as hex; any other `_id` type as its string form.
    pub async fn insert(&self, entity: &T) -> DocResult<String> {
        let mut session = self.store.take_session().await?;

        let result = self.collection.insert_one(entity).session(&mut session).await?;
        let id = match result.inserted_id {
            Bson::ObjectId(oid) => oid.to_hex(),
            Bson::String(s) => s,
            other => other.to_string(),
        };

        debug!(collection = %self.name, id = %id, "Inserted document");
        Ok(id)
    }

    /// Looks a document up by hex ObjectId.
    pub async fn find_one(&self, id: &str) -> DocResult<Option<T>> {
        let oid = parse_object_id(id)?;
        let mut session = self.store.take_session().await?;

        debug!(collection = %self.name, id = %id, "Finding document by id");
        Ok(self
            .collection
            .find_one(doc! { "_id": oid })
            .session(&mut session)
            .await?)
    }

    /// Replaces the first document matching `selector` with `entity`.
    ///
    /// Returns the matched count (0 or 1). An empty selector is refused.
    pub async fn update(&self, selector: &FieldMap, entity: &T) -> DocResult<u64> {
        if selector.is_empty() {
            return Err(DocError::MissingSelector {
                collection: self.name.clone(),
            });
        }

        let filter = filter_document(selector)?;
        let mut session = self.store.take_session().await?;

        debug!(collection = %self.name, filter = %filter, "Replacing document");
        let result = self
            .collection
            .replace_one(filter, entity)
            .session(&mut session)
            .await?;
        Ok(result.matched_count)
    }

    /// Removes a document by hex ObjectId; returns the deleted count.
    pub async fn delete(&self, id: &str) -> DocResult<u64> {
        let oid = parse_object_id(id)?;
        let mut session = self.store.take_session().await?;

        debug!(collection = %self.name, id = %id, "Deleting document");
        let result = self
            .collection
            .delete_one(doc! { "_id": oid })
            .session(&mut session)
            .await?;
        Ok(result.deleted_count)
    }
}

// =============================================================================
// Integration Tests
// =============================================================================
// Need a live server: set DBUTIL_TEST_MONGO_URL (e.g. mongodb://localhost:27017).
// Each test works in its own throwaway database.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::MongoConfig;
    use dbutil_core::entity::{Column, ColumnType};
    use dbutil_core::Value;
    use mongodb::bson::oid::ObjectId;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
        id: Option<ObjectId>,
        title: String,
        stars: i64,
    }

    impl Note {
        fn new(title: &str, stars: i64) -> Self {
            Note {
                id: None,
                title: title.to_string(),
                stars,
            }
        }
    }

    impl Entity for Note {
        const NAME: &'static str = "StickyNote";

        fn columns() -> &'static [Column] {
            const COLUMNS: &[Column] = &[
                Column::new("_id", ColumnType::Text).primary_key(),
                Column::new("title", ColumnType::Text),
                Column::new("stars", ColumnType::Integer),
            ];
            COLUMNS
        }

        fn values(&self) -> Vec<Value> {
            vec![
                self.id.map(|id| id.to_hex()).into(),
                self.title.as_str().into(),
                self.stars.into(),
            ]
        }
    }

    async fn live_store() -> Option<DocStore> {
        let Ok(uri) = std::env::var("DBUTIL_TEST_MONGO_URL") else {
            eprintln!("DBUTIL_TEST_MONGO_URL not set, skipping");
            return None;
        };
        let database = format!("dbutil_test_{}", uuid::Uuid::new_v4().simple());
        Some(DocStore::connect(MongoConfig::new(uri, database)).await.unwrap())
    }

    async fn teardown(store: DocStore) {
        store.database().drop().await.unwrap();
        store.close().await;
    }

    #[tokio::test]
    async fn test_insert_find_one_delete() {
        let Some(store) = live_store().await else { return };
        let notes = DocRepository::<Note>::for_entity(&store);
        assert_eq!(notes.collection_name(), "sticky_note");

        let id = notes.insert(&Note::new("pool sizing", 3)).await.unwrap();
        let found = notes.find_one(&id).await.unwrap().unwrap();
        assert_eq!(found.title, "pool sizing");
        assert_eq!(found.id.map(|oid| oid.to_hex()), Some(id.clone()));

        assert_eq!(notes.delete(&id).await.unwrap(), 1);
        assert_eq!(notes.delete(&id).await.unwrap(), 0);
        assert!(notes.find_one(&id).await.unwrap().is_none());

        teardown(store).await;
    }

    #[tokio::test]
    async fn test_query_and_update() {
        let Some(store) = live_store().await else { return };
        let notes = DocRepository::<Note>::new(&store, "note");
        notes.insert(&Note::new("vacuum", 1)).await.unwrap();

        let mut selector = FieldMap::new();
        selector.insert("title".into(), "vacuum".into());
        let mut found = notes.query(&selector).await.unwrap().unwrap();
        assert_eq!(found.stars, 1);

        found.stars = 9;
        assert_eq!(notes.update(&selector, &found).await.unwrap(), 1);
        assert_eq!(notes.query(&selector).await.unwrap().unwrap().stars, 9);

        let mut missing = FieldMap::new();
        missing.insert("title".into(), "nothing".into());
        assert!(notes.query(&missing).await.unwrap().is_none());
        assert_eq!(notes.update(&missing, &found).await.unwrap(), 0);

        let err = notes.update(&FieldMap::new(), &found).await.unwrap_err();
        assert!(matches!(err, DocError::MissingSelector { .. }));

        teardown(store).await;
    }

    #[tokio::test]
    async fn test_find_pages_and_sorts() {
        let Some(store) = live_store().await else { return };
        let notes = DocRepository::<Note>::new(&store, "note");
        for stars in 1..=7 {
            notes.insert(&Note::new("n", stars)).await.unwrap();
        }

        let page = notes
            .find(&ListOptions::new(2, 3).desc(Some("stars")))
            .await
            .unwrap();
        assert_eq!(page.total, 7);
        let stars: Vec<i64> = page.items.iter().map(|n| n.stars).collect();
        assert_eq!(stars, vec![4, 3, 2]);

        let filtered = notes
            .find(&ListOptions::new(1, 10).filter("stars", 5).with_fields(vec!["stars > ?".into(), 0.into()]))
            .await
            .unwrap();
        assert_eq!(filtered.total, 1);

        teardown(store).await;
    }

    #[tokio::test]
    async fn test_malformed_ids_rejected() {
        let Some(store) = live_store().await else { return };
        let notes = DocRepository::<Note>::new(&store, "note");

        assert!(matches!(notes.find_one("nope").await, Err(DocError::InvalidId { .. })));
        assert!(matches!(notes.delete("nope").await, Err(DocError::InvalidId { .. })));

        teardown(store).await;
    }
}
