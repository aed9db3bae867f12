//! End-to-end checks of the document ⇄ table mapping.

use std::path::PathBuf;
use std::time::Duration;

use futures::future::join_all;
use nutribase_core::{BotanicalInformation, FoodDocument, FoodId, NutrientEntry, StoredFood};
use nutribase_db::{
    resolve_nutrient, schema, transaction, AggregationStrategy, Database, DbConfig, DbError,
};

const SEED_FOODS: &str = include_str!("../seed/foods.json");

const STRATEGIES: [AggregationStrategy; 2] = [AggregationStrategy::Joined, AggregationStrategy::FanOut];

async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

async fn rows_for(db: &Database, table: &str, food_id: FoodId) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE food_id = ?1"))
        .bind(food_id)
        .fetch_one(db.pool())
        .await
        .unwrap()
}

async fn total_rows(db: &Database, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db.pool())
        .await
        .unwrap()
}

async fn abort_on(db: &Database, table: &str, column: &str, value: &str) {
    sqlx::query(&format!(
        "CREATE TRIGGER abort_{table} BEFORE INSERT ON {table} \
         WHEN NEW.{column} = '{value}' BEGIN SELECT RAISE(ABORT, 'rejected {value}'); END"
    ))
    .execute(db.pool())
    .await
    .unwrap();
}

async fn read(db: &Database, strategy: AggregationStrategy, id: FoodId) -> StoredFood {
    db.aggregator_with(strategy).get(id).await.unwrap().unwrap()
}

fn seed_documents() -> Vec<FoodDocument> {
    serde_json::from_str(SEED_FOODS).unwrap()
}

/// A food with at least one row in every dependent table.
fn full_document() -> FoodDocument {
    FoodDocument {
        category: Some("Fruit".into()),
        description: Some("Stone fruit".into()),
        serving_size: Some("1 fruit".into()),
        calories: Some(59.0),
        glycemic_index: Some(42.0),
        organic: Some(true),
        allergens: Some("None known".into()),
        environmental_impact: Some("Moderate".into()),
        image_reference: Some("peach.png".into()),
        cultural_significance: Some("Longevity symbol".into()),
        varieties: vec!["Donut".into(), "Yellow".into()],
        storage_tips: vec!["Ripen at room temperature".into(), "Then refrigerate".into()],
        usage_tips: vec!["Blanch to peel".into(), "Grill halves".into(), "Eat fresh".into()],
        common_uses: vec!["Cobbler".into()],
        pairings: vec!["Basil".into(), "Burrata".into()],
        seasonality: vec!["Summer".into()],
        health_benefits: vec!["Vitamin A".into()],
        nutrients: vec![
            NutrientEntry::new("Vitamin C", 10.0, "mg"),
            NutrientEntry::new("Sugar", 13.0, "g"),
        ],
        history: Some("Originated in China".into()),
        pesticides: Some("High residue".into()),
        botanical_information: Some(BotanicalInformation {
            family: Some("Rosaceae".into()),
            genus: Some("Prunus".into()),
            species: Some("persica".into()),
        }),
        ..FoodDocument::named("Peach")
    }
}

// =============================================================================
// Round trip
// =============================================================================

#[tokio::test]
async fn apple_scenario() {
    let db = memory_db().await;
    let apple: FoodDocument = serde_json::from_str(
        r#"{
            "name": "Apple",
            "category": "Fruit",
            "servingSize": "1 medium",
            "calories": 95,
            "nutrients": [{"name": "Fiber", "amount": 4, "unit": "g"}],
            "varieties": ["Gala", "Fuji"],
            "usageTips": [],
            "commonUses": ["snack"]
        }"#,
    )
    .unwrap();

    assert!(db.nutrients().get_by_name("Fiber").await.unwrap().is_none());
    let id = db.foods().insert(&apple).await.unwrap();
    assert_eq!(db.nutrients().count().await.unwrap(), 1);

    for strategy in STRATEGIES {
        let food = read(&db, strategy, id).await;
        let mut varieties = food.document.varieties.clone();
        varieties.sort();
        assert_eq!(varieties, vec!["Fuji", "Gala"]);
        assert!(food.document.usage_tips.is_empty());
        assert_eq!(food.document.nutrients, vec![NutrientEntry::new("Fiber", 4.0, "g")]);

        let json = serde_json::to_value(&food).unwrap();
        assert_eq!(json["servingSize"], "1 medium");
        assert_eq!(json["nutrients"][0]["amount"], 4.0);
    }

    // "Fiber" now exists: a second food reuses it
    let pear = FoodDocument {
        nutrients: vec![NutrientEntry::new("Fiber", 5.5, "g")],
        ..FoodDocument::named("Pear")
    };
    db.foods().insert(&pear).await.unwrap();
    assert_eq!(db.nutrients().count().await.unwrap(), 1);
}

#[tokio::test]
async fn round_trip_up_to_order_and_duplicates() {
    let db = memory_db().await;
    let mut doc = full_document();
    doc.varieties.push("Donut".into());
    doc.pairings.reverse();

    let id = db.foods().insert(&doc).await.unwrap();

    for strategy in STRATEGIES {
        let food = read(&db, strategy, id).await;
        assert_eq!(food.id, id);
        assert_eq!(food.document, doc.clone().canonicalize(), "{strategy}");
    }
}

#[tokio::test]
async fn strategies_agree_on_seed_data() {
    let db = memory_db().await;
    let outcome = db.foods().insert_batch(&seed_documents()).await.unwrap();
    assert_eq!(outcome.food_ids.len(), 3);

    let joined = db.aggregator_with(AggregationStrategy::Joined).aggregate_all().await.unwrap();
    let fan_out = db.aggregator_with(AggregationStrategy::FanOut).aggregate_all().await.unwrap();

    assert_eq!(joined, fan_out);
    assert_eq!(
        serde_json::to_string(&joined).unwrap(),
        serde_json::to_string(&fan_out).unwrap()
    );

    let ids: Vec<FoodId> = joined.iter().map(|f| f.id).collect();
    assert_eq!(ids, outcome.food_ids);
    for (stored, original) in joined.iter().zip(seed_documents()) {
        assert_eq!(stored.document, original.canonicalize());
    }
}

// =============================================================================
// Lookup resolver
// =============================================================================

#[tokio::test]
async fn resolve_is_idempotent_within_one_transaction() {
    let db = memory_db().await;

    let mut tx = transaction::begin(db.pool()).await.unwrap();
    let first = resolve_nutrient(&mut tx, "Magnesium", Some("mg")).await.unwrap();
    let second = resolve_nutrient(&mut tx, "Magnesium", Some("mg")).await.unwrap();
    transaction::finish(tx, Ok(())).await.unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.id, second.id);
    assert_eq!(total_rows(&db, "nutrients").await, 1);
}

#[tokio::test]
async fn shared_nutrient_stays_unique_across_foods() {
    let db = memory_db().await;
    db.foods().insert_batch(&seed_documents()).await.unwrap();

    // Fiber, Vitamin C, Potassium, Iron, Vitamin K, Protein
    assert_eq!(db.nutrients().count().await.unwrap(), 6);

    let duplicates: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM (SELECT name FROM nutrients GROUP BY name HAVING COUNT(*) > 1)",
    )
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(duplicates, 0);
}

#[tokio::test]
async fn concurrent_writers_share_one_nutrient_row() {
    let path: PathBuf = std::env::temp_dir().join(format!(
        "nutribase-concurrent-{}.db",
        std::process::id()
    ));
    let cleanup = |path: &PathBuf| {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    };
    cleanup(&path);

    let db = Database::new(DbConfig::new(&path).max_connections(4)).await.unwrap();

    let writes = (0..4).map(|i| {
        let db = db.clone();
        async move {
            let doc = FoodDocument {
                nutrients: vec![NutrientEntry::new("Calcium", i as f64, "mg")],
                ..FoodDocument::named(format!("Food {i}"))
            };
            db.foods().insert(&doc).await
        }
    });
    for result in join_all(writes).await {
        result.unwrap();
    }

    assert_eq!(db.foods().count().await.unwrap(), 4);
    assert_eq!(db.nutrients().count().await.unwrap(), 1);

    db.close().await;
    cleanup(&path);
}

#[tokio::test]
async fn concurrent_resolves_of_one_name_agree() {
    let path: PathBuf = std::env::temp_dir().join(format!(
        "nutribase-resolve-{}.db",
        std::process::id()
    ));
    let cleanup = |path: &PathBuf| {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    };
    cleanup(&path);

    let db = Database::new(DbConfig::new(&path).max_connections(8)).await.unwrap();

    for round in 0..10 {
        let name = format!("Nutrient {round}");
        let resolves = (0..8).map(|_| {
            let db = db.clone();
            let name = name.clone();
            async move { db.nutrients().resolve(&name, Some("mg")).await }
        });

        let resolved: Vec<_> = join_all(resolves)
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();

        assert!(resolved.iter().all(|r| r.id == resolved[0].id), "{name}");
        assert_eq!(resolved.iter().filter(|r| r.created).count(), 1, "{name}");
    }

    assert_eq!(db.nutrients().count().await.unwrap(), 10);

    db.close().await;
    cleanup(&path);
}

// =============================================================================
// Aggregation
// =============================================================================

#[tokio::test]
async fn join_fan_out_is_deduplicated() {
    let db = memory_db().await;
    let doc = full_document();
    assert_eq!(doc.usage_tips.len(), 3);
    assert_eq!(doc.storage_tips.len(), 2);

    let id = db.foods().insert(&doc).await.unwrap();
    let food = read(&db, AggregationStrategy::Joined, id).await.document;

    assert_eq!(food.usage_tips.len(), 3);
    assert_eq!(food.storage_tips.len(), 2);
    assert_eq!(food.varieties.len(), 2);
    assert_eq!(food.pairings.len(), 2);
    assert_eq!(food.nutrients.len(), 2);
    for tip in &food.usage_tips {
        assert!(doc.usage_tips.contains(tip));
    }
    for tip in &food.storage_tips {
        assert!(doc.storage_tips.contains(tip));
    }
}

#[tokio::test]
async fn absent_categories_are_empty_not_null() {
    let db = memory_db().await;
    let doc = FoodDocument {
        pairings: vec![],
        ..full_document()
    };
    let lonely = db.foods().insert(&doc).await.unwrap();
    let bare = db.foods().insert(&FoodDocument::named("Water")).await.unwrap();

    for strategy in STRATEGIES {
        let food = serde_json::to_value(read(&db, strategy, lonely).await).unwrap();
        assert_eq!(food["pairings"], serde_json::json!([]));

        let food = serde_json::to_value(read(&db, strategy, bare).await).unwrap();
        assert_eq!(food["varieties"], serde_json::json!([]));
        assert_eq!(food["nutrients"], serde_json::json!([]));
        assert!(food["history"].is_null());
        assert!(food["botanicalInformation"].is_null());
    }
}

#[tokio::test]
async fn sub_query_failure_fails_the_whole_call() {
    let db = memory_db().await;
    db.foods().insert_batch(&seed_documents()).await.unwrap();
    sqlx::query("DROP TABLE seasonality").execute(db.pool()).await.unwrap();

    for strategy in STRATEGIES {
        assert!(db.aggregator_with(strategy).aggregate_all().await.is_err());
    }
}

// =============================================================================
// Atomicity
// =============================================================================

#[tokio::test]
async fn failed_child_insert_leaves_no_trace() {
    let db = memory_db().await;
    // Rows before health_benefits: parent, varieties, storage / usage tips,
    // common uses, pairings, seasonality
    abort_on(&db, "health_benefits", "benefit", "Vitamin A").await;

    let err = db.foods().insert(&full_document()).await.unwrap_err();
    assert!(matches!(err, DbError::QueryFailed(ref m) if m.contains("rejected")));

    assert_eq!(total_rows(&db, "foods").await, 0);
    for table in schema::dependent_tables() {
        assert_eq!(total_rows(&db, table).await, 0, "{table}");
    }
    assert_eq!(total_rows(&db, "nutrients").await, 0);
}

#[tokio::test]
async fn failed_nutrient_link_undoes_created_nutrients() {
    let db = memory_db().await;
    db.nutrients().resolve("Sugar", Some("g")).await.unwrap();
    sqlx::query(
        "CREATE TRIGGER abort_link BEFORE INSERT ON food_nutrients \
         WHEN (SELECT name FROM nutrients WHERE nutrient_id = NEW.nutrient_id) = 'Sugar' \
         BEGIN SELECT RAISE(ABORT, 'rejected link'); END",
    )
    .execute(db.pool())
    .await
    .unwrap();

    // Vitamin C is created and linked first, then the Sugar link aborts
    assert!(db.foods().insert(&full_document()).await.is_err());

    assert_eq!(total_rows(&db, "foods").await, 0);
    assert_eq!(total_rows(&db, "food_nutrients").await, 0);
    assert!(db.nutrients().get_by_name("Vitamin C").await.unwrap().is_none());
    assert!(db.nutrients().get_by_name("Sugar").await.unwrap().is_some());
}

#[tokio::test]
async fn failing_batch_member_rolls_back_the_batch() {
    let db = memory_db().await;
    let existing = db.foods().insert(&FoodDocument::named("Rice")).await.unwrap();
    abort_on(&db, "common_uses", "use_case", "Dal").await;

    let err = db.foods().insert_batch(&seed_documents()).await.unwrap_err();
    assert!(!err.is_invalid_input());

    let foods = db.aggregator().aggregate_all().await.unwrap();
    assert_eq!(foods.len(), 1);
    assert_eq!(foods[0].id, existing);
    assert_eq!(total_rows(&db, "nutrients").await, 0);
}

#[tokio::test]
async fn invalid_batch_member_is_reported_by_index() {
    let db = memory_db().await;
    let mut docs = seed_documents();
    docs[1].nutrients.push(NutrientEntry {
        name: " ".into(),
        amount: None,
        unit: None,
    });

    match db.foods().insert_batch(&docs).await {
        Err(DbError::InvalidInput(nutribase_core::CoreError::InvalidDocument { index, .. })) => {
            assert_eq!(index, 1)
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(db.foods().count().await.unwrap(), 0);
}

#[tokio::test]
async fn connection_is_released_after_failures() {
    // One connection: any leak would make the next acquire time out
    let db = memory_db().await;
    abort_on(&db, "pairings", "pairing", "Basil").await;

    for _ in 0..3 {
        assert!(db.foods().insert(&full_document()).await.is_err());
    }
    assert!(db.foods().insert(&FoodDocument::named("Bread")).await.is_ok());
    assert!(db.health_check().await);
}

// =============================================================================
// Cascade
// =============================================================================

#[tokio::test]
async fn cascade_clears_every_dependent_table() {
    let db = memory_db().await;
    let id = db.foods().insert(&full_document()).await.unwrap();
    let other = db.foods().insert(&full_document()).await.unwrap();

    for table in schema::dependent_tables() {
        assert!(rows_for(&db, table, id).await > 0, "{table} not populated");
    }

    let outcome = db.foods().delete(id).await.unwrap();
    assert!(outcome.food_deleted);
    assert_eq!(outcome.dependent_rows, full_document().dependent_row_count() as u64);

    for table in schema::dependent_tables() {
        assert_eq!(rows_for(&db, table, id).await, 0, "{table}");
    }
    assert_eq!(rows_for(&db, schema::FOODS, id).await, 0);

    for strategy in STRATEGIES {
        assert!(db.aggregator_with(strategy).get(id).await.unwrap().is_none());
        assert!(db.aggregator_with(strategy).get(other).await.unwrap().is_some());
    }
}

#[tokio::test]
async fn deleting_twice_is_a_no_op() {
    let db = memory_db().await;
    let id = db.foods().insert(&full_document()).await.unwrap();

    assert!(db.foods().delete(id).await.unwrap().food_deleted);

    let again = db.foods().delete(id).await.unwrap();
    assert!(!again.food_deleted);
    assert_eq!(again.dependent_rows, 0);
}

#[tokio::test]
async fn dependent_rows_require_an_existing_food() {
    let db = memory_db().await;

    let err = sqlx::query("INSERT INTO pairings (food_id, pairing) VALUES (999, 'Salt')")
        .execute(db.pool())
        .await
        .map_err(DbError::from)
        .unwrap_err();

    assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
}

#[tokio::test]
async fn fractional_amounts_survive_both_strategies() {
    let db = memory_db().await;
    let amount = 0.1 + 0.2;
    let doc = FoodDocument {
        nutrients: vec![
            NutrientEntry::new("Fiber", amount, "g"),
            NutrientEntry::new("Iron", 1.0 / 3.0, "mg"),
            NutrientEntry::new("Selenium", 1.5e-7, "g"),
        ],
        ..FoodDocument::named("Oats")
    };
    let id = db.foods().insert(&doc).await.unwrap();

    let joined = read(&db, AggregationStrategy::Joined, id).await;
    let fan_out = read(&db, AggregationStrategy::FanOut, id).await;

    assert_eq!(joined.document.nutrients[0].amount, Some(amount));
    assert_eq!(joined, fan_out);
    assert_eq!(joined.document, doc.canonicalize());
}

#[tokio::test]
async fn padded_names_round_trip_canonically() {
    let db = memory_db().await;
    let doc = FoodDocument {
        nutrients: vec![NutrientEntry::new(" Fiber", 2.4, "g")],
        ..FoodDocument::named("Apple ")
    };
    let id = db.foods().insert(&doc).await.unwrap();

    for strategy in STRATEGIES {
        let stored = read(&db, strategy, id).await;
        assert_eq!(stored.document, doc.clone().canonicalize(), "{strategy}");
        assert_eq!(stored.document.name, "Apple");
        assert_eq!(stored.document.nutrients[0].name, "Fiber");
    }
}

#[tokio::test]
async fn fan_out_over_many_foods_stays_within_the_pool() {
    let db = Database::new(DbConfig::in_memory().connect_timeout(Duration::from_millis(500)))
        .await
        .unwrap();
    let docs: Vec<FoodDocument> = (0..1500)
        .map(|i| FoodDocument::named(format!("Food {i}")))
        .collect();
    let ids = db.foods().insert_batch(&docs).await.unwrap().food_ids;

    let foods = db
        .aggregator_with(AggregationStrategy::FanOut)
        .aggregate_all()
        .await
        .unwrap();

    assert_eq!(foods.len(), ids.len());
    assert!(foods.iter().map(|f| f.id).eq(ids.iter().copied()));
}
