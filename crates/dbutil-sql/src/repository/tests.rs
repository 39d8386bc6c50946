use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dbutil_core::entity::{Column, ColumnType};
use dbutil_core::{Entity, FieldMap, ListOptions, SearchOptions, Value};
use sqlx::SqlitePool;

use super::{Record, Repository};
use crate::error::{DbError, DbResult};
use crate::migrations::Schema;
use crate::pool::{Database, DbConfig};

// =============================================================================
// Fixtures
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
struct Account {
    id: i64,
    owner: String,
    balance: i64,
    active: bool,
    #[sqlx(skip)]
    entries: Vec<Entry>,
}

impl Account {
    fn new(owner: &str, balance: i64) -> Self {
        Account {
            owner: owner.to_string(),
            balance,
            active: true,
            ..Account::default()
        }
    }
}

impl Entity for Account {
    const NAME: &'static str = "Account";

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("id", ColumnType::Integer).primary_key().auto_increment(),
            Column::new("owner", ColumnType::Text),
            Column::new("balance", ColumnType::Integer),
            Column::new("active", ColumnType::Boolean),
        ];
        COLUMNS
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            self.owner.as_str().into(),
            self.balance.into(),
            self.active.into(),
        ]
    }
}

#[async_trait]
impl Record for Account {
    async fn preload(&mut self, relation: &str, pool: &SqlitePool) -> DbResult<()> {
        match relation {
            "entries" => {
                self.entries = sqlx::query_as("SELECT * FROM entry WHERE account_id = ?1 ORDER BY id")
                    .bind(self.id)
                    .fetch_all(pool)
                    .await?;
                Ok(())
            }
            other => Err(DbError::unknown_relation(Self::NAME, other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
struct Entry {
    id: i64,
    account_id: i64,
    amount: i64,
}

impl Entity for Entry {
    const NAME: &'static str = "Entry";

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("id", ColumnType::Integer).primary_key().auto_increment(),
            Column::new("account_id", ColumnType::Integer),
            Column::new("amount", ColumnType::Integer),
        ];
        COLUMNS
    }

    fn values(&self) -> Vec<Value> {
        vec![self.id.into(), self.account_id.into(), self.amount.into()]
    }
}

impl Record for Entry {}

#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
struct Stamp {
    id: i64,
    label: Option<String>,
}

impl Entity for Stamp {
    const NAME: &'static str = "Stamp";

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("id", ColumnType::Integer).primary_key().auto_increment(),
            Column::new("label", ColumnType::Text).nullable(),
        ];
        COLUMNS
    }

    fn values(&self) -> Vec<Value> {
        vec![self.id.into(), self.label.as_deref().into()]
    }
}

impl Record for Stamp {}

async fn setup() -> Database {
    let db = Database::connect(DbConfig::in_memory()).await.unwrap();
    db.migrate(&Schema::new().register::<Account>().register::<Entry>())
        .await
        .unwrap();
    db
}

async fn seed(db: &Database, rows: &[(&str, i64)]) -> Vec<i64> {
    let repo = db.repository::<Account>();
    let mut ids = Vec::with_capacity(rows.len());
    for (owner, balance) in rows {
        ids.push(repo.create(&Account::new(owner, *balance)).await.unwrap());
    }
    ids
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn test_create_then_first() {
    let db = setup().await;
    let ids = seed(&db, &[("ann", 10)]).await;

    let found = db
        .repository::<Account>()
        .with_option("id", ids[0])
        .first()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(found.id, ids[0]);
    assert_eq!(found.owner, "ann");
    assert_eq!(found.balance, 10);
    assert!(found.active);
}

#[tokio::test]
async fn test_not_found_is_empty() {
    let db = setup().await;
    seed(&db, &[("ann", 10)]).await;

    let repo = db.repository::<Account>().with_option("owner", "nobody");
    assert!(repo.first().await.unwrap().is_none());
    assert!(repo.find().await.unwrap().is_empty());
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_find_respects_order() {
    let db = setup().await;
    seed(&db, &[("ann", 10), ("bob", 30), ("cat", 20)]).await;

    let repo = db.repository::<Account>().with_order_by("balance DESC");
    let owners: Vec<String> = repo.find().await.unwrap().into_iter().map(|a| a.owner).collect();
    assert_eq!(owners, vec!["bob", "cat", "ann"]);

    let top = repo.first().await.unwrap().unwrap();
    assert_eq!(top.owner, "bob");
}

#[tokio::test]
async fn test_options_can_change_between_calls() {
    let db = setup().await;
    seed(&db, &[("ann", 10), ("ann", 20), ("bob", 30)]).await;

    let repo = db.repository::<Account>();
    assert_eq!(repo.count().await.unwrap(), 3);

    repo.set_option("owner", "ann").await;
    assert_eq!(repo.count().await.unwrap(), 2);

    let mut fields = FieldMap::new();
    fields.insert("owner".into(), "bob".into());
    repo.set_options(fields).await;
    assert_eq!(repo.count().await.unwrap(), 1);
    assert_eq!(repo.options().await.fields.len(), 1);
}

#[tokio::test]
async fn test_per_call_options() {
    let db = setup().await;
    seed(&db, &[("ann", 10), ("bob", 30)]).await;

    let repo = db.repository::<Account>().with_option("owner", "ann");
    let bob = SearchOptions::default().with("owner", "bob");

    assert_eq!(repo.count_with(&bob).await.unwrap(), 1);
    assert_eq!(repo.find_with(&bob).await.unwrap()[0].balance, 30);
    assert_eq!(repo.first_with(&bob).await.unwrap().unwrap().owner, "bob");
    assert_eq!(repo.first().await.unwrap().unwrap().owner, "ann");
}

#[tokio::test]
async fn test_null_option_matches_null_column() {
    let db = setup().await;
    seed(&db, &[("ann", 10)]).await;

    let repo = db
        .repository::<Account>()
        .with_option("owner", Value::Null);
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_find_by_page() {
    let db = setup().await;
    let rows: Vec<(&str, i64)> = (1..=12).map(|i| (if i % 3 == 0 { "bob" } else { "ann" }, i)).collect();
    seed(&db, &rows).await;
    let repo = db.repository::<Account>();

    let page = repo.find_by_page(&ListOptions::new(2, 5).asc(None)).await.unwrap();
    assert_eq!(page.total, 12);
    assert_eq!(page.items.len(), 5);
    assert_eq!(page.items[0].balance, 6);
    assert_eq!(page.total_pages(), 3);
    assert!(page.has_next());

    let last = repo.find_by_page(&ListOptions::new(3, 5).asc(None)).await.unwrap();
    assert_eq!(last.items.len(), 2);
    assert!(!last.has_next());
}

#[tokio::test]
async fn test_find_by_page_total_counts_filtered_rows() {
    let db = setup().await;
    let rows: Vec<(&str, i64)> = (1..=12).map(|i| (if i % 3 == 0 { "bob" } else { "ann" }, i)).collect();
    seed(&db, &rows).await;
    let repo = db.repository::<Account>();

    let opts = ListOptions::new(1, 2)
        .filter("owner", "ann")
        .with_fields(vec!["balance > ?".into(), 4.into()])
        .desc(Some("balance"));
    let page = repo.find_by_page(&opts).await.unwrap();

    // ann rows above 4: 5, 7, 8, 10, 11
    assert_eq!(page.total, 5);
    let balances: Vec<i64> = page.items.iter().map(|a| a.balance).collect();
    assert_eq!(balances, vec![11, 10]);
}

#[tokio::test]
async fn test_find_by_page_combines_compound_fields() {
    let db = setup().await;
    seed(&db, &[("ann", 5), ("ann", 50), ("bob", 50)]).await;
    let repo = db.repository::<Account>();

    let opts = ListOptions::new(1, 10).with_fields(vec![
        "owner".into(),
        "ann".into(),
        "balance >= ?".into(),
        10.into(),
    ]);
    let page = repo.find_by_page(&opts).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].balance, 50);
}

#[tokio::test]
async fn test_find_by_page_null_field_matches_null_column() {
    let db = setup().await;
    db.migrate(&Schema::new().register::<Stamp>()).await.unwrap();
    let stamps = db.repository::<Stamp>();
    stamps.create(&Stamp::default()).await.unwrap();
    stamps
        .create(&Stamp {
            label: Some("draft".into()),
            ..Stamp::default()
        })
        .await
        .unwrap();

    let unlabeled = db.repository::<Stamp>().with_option("label", Value::Null);
    assert_eq!(unlabeled.count().await.unwrap(), 1);

    let opts = ListOptions::new(1, 10).with_fields(vec!["label".into(), Value::Null]);
    let page = stamps.find_by_page(&opts).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].label, None);
}

#[tokio::test]
async fn test_list_uses_page_as_offset() {
    let db = setup().await;
    let rows: Vec<(&str, i64)> = (1..=10).map(|i| ("ann", i)).collect();
    seed(&db, &rows).await;
    let repo = db.repository::<Account>();

    let opts = ListOptions::new(3, 2).asc(None);
    let listed: Vec<i64> = repo.list(&opts).await.unwrap().iter().map(|a| a.balance).collect();
    let paged: Vec<i64> = repo
        .find_by_page(&opts)
        .await
        .unwrap()
        .items
        .iter()
        .map(|a| a.balance)
        .collect();

    assert_eq!(listed, vec![4, 5]);
    assert_eq!(paged, vec![5, 6]);
}

#[tokio::test]
async fn test_list_ignores_compound_fields() {
    let db = setup().await;
    seed(&db, &[("ann", 1), ("ann", 2), ("ann", 3)]).await;

    // page 1 still skips one row
    let opts = ListOptions::new(1, 10).with_fields(vec!["balance > ?".into(), 100.into()]);
    let rows = db.repository::<Account>().list(&opts).await.unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_find_by_raw() {
    let db = setup().await;
    seed(&db, &[("ann", 10), ("bob", 20)]).await;
    let repo = db.repository::<Account>();

    let rows = repo
        .find_by_raw("SELECT * FROM account WHERE balance > 15")
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].owner, "bob");

    let none = repo
        .find_by_raw("SELECT * FROM account WHERE balance > 1000")
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_unsafe_options_are_rejected() {
    let db = setup().await;
    let repo = db.repository::<Account>().with_option("owner = owner; --", 1);
    assert!(matches!(repo.find().await, Err(DbError::Options(_))));

    let bad_order = ListOptions::new(1, 10).asc(Some("id; DROP TABLE account"));
    assert!(matches!(
        db.repository::<Account>().find_by_page(&bad_order).await,
        Err(DbError::Options(_))
    ));
}

// =============================================================================
// Writes
// =============================================================================

#[tokio::test]
async fn test_delete_requires_conditions() {
    let db = setup().await;
    seed(&db, &[("ann", 10), ("bob", 20)]).await;

    let err = db.repository::<Account>().delete().await.unwrap_err();
    assert!(matches!(err, DbError::MissingWhereConditions { .. }));
    assert_eq!(db.repository::<Account>().count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_delete_with_options() {
    let db = setup().await;
    seed(&db, &[("ann", 10), ("ann", 11), ("bob", 20)]).await;

    let removed = db
        .repository::<Account>()
        .with_option("owner", "ann")
        .delete()
        .await
        .unwrap();
    assert_eq!(removed, 2);
    assert_eq!(db.repository::<Account>().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_delete_by_kv() {
    let db = setup().await;
    let ids = seed(&db, &[("ann", 10), ("bob", 20)]).await;
    let repo = db.repository::<Account>();

    assert_eq!(repo.delete_by_kv("id", ids[1]).await.unwrap(), 1);
    assert_eq!(repo.delete_by_kv("id", ids[1]).await.unwrap(), 0);
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_update() {
    let db = setup().await;
    let ids = seed(&db, &[("ann", 10)]).await;
    let repo = db.repository::<Account>().with_option("id", ids[0]);

    let mut attrs = FieldMap::new();
    attrs.insert("balance".into(), 99.into());
    attrs.insert("active".into(), false.into());
    assert_eq!(repo.update("id", ids[0], &attrs).await.unwrap(), 1);

    let account = repo.first().await.unwrap().unwrap();
    assert_eq!(account.balance, 99);
    assert!(!account.active);

    assert_eq!(repo.update("id", ids[0], &FieldMap::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_expr_increments_column() {
    let db = setup().await;
    let ids = seed(&db, &[("ann", 10)]).await;
    let repo = db.repository::<Account>().with_option("id", ids[0]);

    assert_eq!(repo.expr("id", ids[0], "balance", "balance + ?", 25).await.unwrap(), 1);
    assert_eq!(repo.expr("id", ids[0], "balance", "balance - ?", 5).await.unwrap(), 1);
    assert_eq!(repo.first().await.unwrap().unwrap().balance, 30);
}

#[tokio::test]
async fn test_expr_rejects_unknown_identifiers() {
    let db = setup().await;
    let ids = seed(&db, &[("ann", 10)]).await;
    let repo = db.repository::<Account>();

    let err = repo
        .expr("id", ids[0], "balance", "(SELECT 1) + ?", 1)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Options(_)));

    let err = repo
        .expr("id", ids[0], "balance", "balance + ? ; DELETE FROM account", 1)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Options(_)));
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_duplicate_key_surfaces_error() {
    let db = setup().await;
    let ids = seed(&db, &[("ann", 10)]).await;

    let mut dup = Account::new("bob", 1);
    dup.id = ids[0];
    let err = db.repository::<Account>().create(&dup).await.unwrap_err();
    assert!(err.is_unique_violation());
}

// =============================================================================
// Transactions
// =============================================================================

#[tokio::test]
async fn test_tx_commit() {
    let db = setup().await;
    let repo = db.repository::<Account>();

    let mut tx = db.begin().await.unwrap();
    let id = repo.tx_create(&Account::new("ann", 10), Some(&mut tx)).await.unwrap();
    let mut attrs = FieldMap::new();
    attrs.insert("balance".into(), 40.into());
    repo.tx_update("id", id, &attrs, Some(&mut tx)).await.unwrap();
    repo.tx_expr("id", id, "balance", "balance * ?", 2, Some(&mut tx))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let account = repo.first().await.unwrap().unwrap();
    assert_eq!(account.balance, 80);
}

#[tokio::test]
async fn test_tx_rollback() {
    let db = setup().await;
    seed(&db, &[("bob", 5)]).await;
    let repo = db.repository::<Account>().with_option("owner", "bob");

    let mut tx = db.begin().await.unwrap();
    repo.tx_create(&Account::new("ann", 10), Some(&mut tx)).await.unwrap();
    assert_eq!(repo.tx_delete(Some(&mut tx)).await.unwrap(), 1);
    tx.rollback().await.unwrap();

    assert_eq!(db.repository::<Account>().count().await.unwrap(), 1);
    assert_eq!(repo.count().await.unwrap(), 1);
}

// =============================================================================
// Preload
// =============================================================================

#[tokio::test]
async fn test_preload_relation() {
    let db = setup().await;
    let ids = seed(&db, &[("ann", 10)]).await;
    let entries = db.repository::<Entry>();
    for amount in [3, 4] {
        entries
            .create(&Entry {
                account_id: ids[0],
                amount,
                ..Entry::default()
            })
            .await
            .unwrap();
    }

    let account = db
        .repository::<Account>()
        .with_option("id", ids[0])
        .with_preload("entries")
        .first()
        .await
        .unwrap()
        .unwrap();
    let amounts: Vec<i64> = account.entries.iter().map(|e| e.amount).collect();
    assert_eq!(amounts, vec![3, 4]);
}

#[tokio::test]
async fn test_unknown_preload_relation() {
    let db = setup().await;
    seed(&db, &[("ann", 10)]).await;

    let err = db
        .repository::<Account>()
        .with_preload("owners")
        .first()
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::UnknownRelation { .. }));
}

#[tokio::test]
async fn test_table_override() {
    let db = setup().await;
    sqlx::query("CREATE TABLE account_archive AS SELECT * FROM account WHERE 0")
        .execute(db.pool())
        .await
        .unwrap();

    let archive = Repository::<Account>::new(&db).with_table("account_archive");
    archive.create(&Account::new("old", 1)).await.unwrap();

    assert_eq!(archive.table(), "account_archive");
    assert_eq!(archive.count().await.unwrap(), 1);
    assert_eq!(db.repository::<Account>().count().await.unwrap(), 0);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_repository_serializes_operations() {
    let db = setup().await;
    seed(&db, &[("ann", 1), ("bob", 2), ("cat", 3)]).await;
    let repo = Arc::new(db.repository::<Account>());

    // The in-memory pool has a single connection; holding it in a
    // transaction parks the next query while it owns the repository lock.
    let tx = db.begin().await.unwrap();

    let reader = {
        let repo = Arc::clone(&repo);
        tokio::spawn(async move { repo.find().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!reader.is_finished());

    let writer = {
        let repo = Arc::clone(&repo);
        tokio::spawn(async move { repo.set_option("owner", "nobody").await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!writer.is_finished());
    assert!(tokio::time::timeout(Duration::from_millis(50), repo.options())
        .await
        .is_err());

    tx.rollback().await.unwrap();

    // The read ran with the options it locked, before the queued write.
    let rows = reader.await.unwrap().unwrap();
    assert_eq!(rows.len(), 3);
    writer.await.unwrap();

    assert_eq!(repo.options().await.fields.get("owner"), Some(&Value::from("nobody")));
    assert_eq!(repo.count().await.unwrap(), 0);
}
