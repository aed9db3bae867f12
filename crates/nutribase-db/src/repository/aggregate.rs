//! # Document Aggregator
//!
//! The read path: reassembling stored rows into nested documents.
//!
//! ## Strategies
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  JOINED (default)                                                       │
//! │                                                                         │
//! │  foods ⟕ food_nutrients ⟕ nutrients ⟕ <7 child tables> ⟕ <3 singletons>│
//! │       GROUP BY food_id                                                  │
//! │       json_group_array(DISTINCT ...) per list   ← join fan-out removed  │
//! │       MAX(...) per singleton                                            │
//! │  One statement, one row per food.                                       │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │  FAN-OUT                                                                │
//! │                                                                         │
//! │  SELECT * FROM foods                                                    │
//! │       │                                                                 │
//! │       ├── food 1 ─┬─ varieties ─┐                                       │
//! │       │           ├─ ...        ├─ try_join! (all sub-queries at once)  │
//! │       │           └─ botanical ─┘                                       │
//! │       ├── food 2 ─ ...              buffered (max_connections foods)    │
//! │       └── ...                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both strategies return documents in canonical form (see
//! [`FoodDocument::canonicalize`]) ordered by food identifier, so their
//! outputs compare equal. A failing sub-query fails the whole call; no
//! partial documents are returned.

use std::fmt;
use std::str::FromStr;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::config::ConfigError;
use crate::error::{DbError, DbResult};
use crate::schema::{self, ChildTable};
use nutribase_core::{
    BotanicalInformation, ChildFact, FoodDocument, FoodId, NutrientEntry, SingletonFact,
    StoredFood,
};

// =============================================================================
// Strategy
// =============================================================================

/// How the aggregator reads documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationStrategy {
    /// One grouped outer-join statement.
    #[default]
    Joined,

    /// One parent query, then concurrent per-food sub-queries.
    FanOut,
}

impl fmt::Display for AggregationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationStrategy::Joined => write!(f, "joined"),
            AggregationStrategy::FanOut => write!(f, "fan_out"),
        }
    }
}

impl FromStr for AggregationStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "joined" | "join" => Ok(AggregationStrategy::Joined),
            "fan_out" | "fan-out" | "fanout" => Ok(AggregationStrategy::FanOut),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

// =============================================================================
// Rows
// =============================================================================

/// Parent columns of a food.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FoodRow {
    food_id: FoodId,
    name: String,
    category: Option<String>,
    description: Option<String>,
    serving_size: Option<String>,
    calories: Option<f64>,
    glycemic_index: Option<f64>,
    organic: Option<bool>,
    allergens: Option<String>,
    environmental_impact: Option<String>,
    image_reference: Option<String>,
    cultural_significance: Option<String>,
}

impl FoodRow {
    fn into_document(self) -> (FoodId, FoodDocument) {
        let doc = FoodDocument {
            name: self.name,
            category: self.category,
            description: self.description,
            serving_size: self.serving_size,
            calories: self.calories,
            glycemic_index: self.glycemic_index,
            organic: self.organic,
            allergens: self.allergens,
            environmental_impact: self.environmental_impact,
            image_reference: self.image_reference,
            cultural_significance: self.cultural_significance,
            ..FoodDocument::default()
        };
        (self.food_id, doc)
    }
}

/// One row of the joined statement. List columns hold JSON arrays.
#[derive(Debug, sqlx::FromRow)]
struct JoinedFoodRow {
    #[sqlx(flatten)]
    food: FoodRow,
    varieties: String,
    storage_tips: String,
    usage_tips: String,
    common_uses: String,
    pairings: String,
    seasonality: String,
    health_benefits: String,
    nutrients: String,
    history: Option<String>,
    pesticides: Option<String>,
    botanical_information: String,
}

impl JoinedFoodRow {
    fn list_column(&self, fact: ChildFact) -> (&'static str, &str) {
        let raw = match fact {
            ChildFact::Varieties => &self.varieties,
            ChildFact::StorageTips => &self.storage_tips,
            ChildFact::UsageTips => &self.usage_tips,
            ChildFact::CommonUses => &self.common_uses,
            ChildFact::Pairings => &self.pairings,
            ChildFact::Seasonality => &self.seasonality,
            ChildFact::HealthBenefits => &self.health_benefits,
        };
        (fact.field_name(), raw.as_str())
    }

    fn into_stored(self) -> DbResult<StoredFood> {
        let mut lists = Vec::with_capacity(ChildFact::ALL.len());
        for fact in ChildFact::ALL {
            let (column, raw) = self.list_column(fact);
            let values: Vec<String> =
                serde_json::from_str(raw).map_err(|e| DbError::decode(column, e))?;
            lists.push((fact, values));
        }

        let nutrients: Vec<NutrientEntry> = decode_objects("nutrients", &self.nutrients)?;
        let botanical: Vec<BotanicalInformation> =
            decode_objects("botanicalInformation", &self.botanical_information)?;

        let (id, mut doc) = self.food.into_document();
        for (fact, values) in lists {
            *fact.values_mut(&mut doc) = values;
        }
        doc.nutrients = nutrients;
        doc.history = self.history;
        doc.pesticides = self.pesticides;
        doc.botanical_information = botanical.into_iter().next();

        Ok(StoredFood {
            id,
            document: doc.canonicalize(),
        })
    }
}

/// Decodes a JSON array of objects built with `json_object`.
///
/// `DISTINCT` drops the JSON subtype of aggregated values, so elements may
/// arrive as objects or as strings holding an object.
fn decode_objects<T: DeserializeOwned>(column: &str, raw: &str) -> DbResult<Vec<T>> {
    let elements: Vec<serde_json::Value> =
        serde_json::from_str(raw).map_err(|e| DbError::decode(column, e))?;

    elements
        .into_iter()
        .map(|element| match element {
            serde_json::Value::String(text) => serde_json::from_str(&text),
            other => serde_json::from_value(other),
        })
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| DbError::decode(column, e))
}

const FOOD_COLUMNS: &str = "food_id, name, category, description, serving_size, calories, \
     glycemic_index, organic, allergens, environmental_impact, image_reference, \
     cultural_significance";

/// `?1` is an optional food identifier; NULL selects every food.
///
/// `json_object` renders a REAL with 15 significant digits, so amounts are
/// printed with 17 to survive the trip through JSON unchanged.
const JOINED_QUERY: &str = r#"
    SELECT
        f.food_id, f.name, f.category, f.description, f.serving_size, f.calories,
        f.glycemic_index, f.organic, f.allergens, f.environmental_impact,
        f.image_reference, f.cultural_significance,
        json_group_array(DISTINCT fv.variety)  FILTER (WHERE fv.variety IS NOT NULL)  AS varieties,
        json_group_array(DISTINCT st.tip)      FILTER (WHERE st.tip IS NOT NULL)      AS storage_tips,
        json_group_array(DISTINCT ut.tip)      FILTER (WHERE ut.tip IS NOT NULL)      AS usage_tips,
        json_group_array(DISTINCT cu.use_case) FILTER (WHERE cu.use_case IS NOT NULL) AS common_uses,
        json_group_array(DISTINCT pr.pairing)  FILTER (WHERE pr.pairing IS NOT NULL)  AS pairings,
        json_group_array(DISTINCT se.season)   FILTER (WHERE se.season IS NOT NULL)   AS seasonality,
        json_group_array(DISTINCT hb.benefit)  FILTER (WHERE hb.benefit IS NOT NULL)  AS health_benefits,
        json_group_array(DISTINCT json_object(
                'name', n.name,
                'amount', json(CASE WHEN fnu.amount IS NULL THEN 'null'
                                    ELSE printf('%!.17g', fnu.amount) END),
                'unit', n.unit))
            FILTER (WHERE n.nutrient_id IS NOT NULL) AS nutrients,
        MAX(fh.history)     AS history,
        MAX(pe.information) AS pesticides,
        json_group_array(DISTINCT json_object('family', bi.family, 'genus', bi.genus, 'species', bi.species))
            FILTER (WHERE bi.food_id IS NOT NULL) AS botanical_information
    FROM foods f
    LEFT JOIN food_nutrients fnu        ON fnu.food_id = f.food_id
    LEFT JOIN nutrients n               ON n.nutrient_id = fnu.nutrient_id
    LEFT JOIN food_varieties fv         ON fv.food_id = f.food_id
    LEFT JOIN storage_tips st           ON st.food_id = f.food_id
    LEFT JOIN usage_tips ut             ON ut.food_id = f.food_id
    LEFT JOIN common_uses cu            ON cu.food_id = f.food_id
    LEFT JOIN pairings pr               ON pr.food_id = f.food_id
    LEFT JOIN seasonality se            ON se.food_id = f.food_id
    LEFT JOIN health_benefits hb        ON hb.food_id = f.food_id
    LEFT JOIN food_history fh           ON fh.food_id = f.food_id
    LEFT JOIN pesticides pe             ON pe.food_id = f.food_id
    LEFT JOIN botanical_information bi  ON bi.food_id = f.food_id
    WHERE ?1 IS NULL OR f.food_id = ?1
    GROUP BY f.food_id
    ORDER BY f.food_id
"#;

// =============================================================================
// Aggregator
// =============================================================================

/// Reads stored foods back as documents.
///
/// ## Usage
/// ```rust,ignore
/// let foods = db.aggregator().aggregate_all().await?;
/// let apple = db.aggregator().get(apple_id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct FoodAggregator {
    pool: SqlitePool,
    strategy: AggregationStrategy,
}

impl FoodAggregator {
    /// Creates an aggregator with an explicit strategy.
    pub fn new(pool: SqlitePool, strategy: AggregationStrategy) -> Self {
        FoodAggregator { pool, strategy }
    }

    /// Every stored food, ordered by identifier.
    ///
    /// An empty store yields an empty list.
    pub async fn aggregate_all(&self) -> DbResult<Vec<StoredFood>> {
        match self.strategy {
            AggregationStrategy::Joined => self.aggregate_joined().await,
            AggregationStrategy::FanOut => self.aggregate_fan_out().await,
        }
    }

    /// One food, or `None` when the identifier is unknown.
    pub async fn get(&self, food_id: FoodId) -> DbResult<Option<StoredFood>> {
        match self.strategy {
            AggregationStrategy::Joined => Ok(self.joined(Some(food_id)).await?.pop()),
            AggregationStrategy::FanOut => {
                let parent = sqlx::query_as::<_, FoodRow>(&format!(
                    "SELECT {FOOD_COLUMNS} FROM {} WHERE food_id = ?1",
                    schema::FOODS
                ))
                .bind(food_id)
                .fetch_optional(&self.pool)
                .await?;

                match parent {
                    Some(row) => Ok(Some(self.assemble(row).await?)),
                    None => Ok(None),
                }
            }
        }
    }

    /// Reads every food with the single grouped statement.
    pub async fn aggregate_joined(&self) -> DbResult<Vec<StoredFood>> {
        self.joined(None).await
    }

    async fn joined(&self, food_id: Option<FoodId>) -> DbResult<Vec<StoredFood>> {
        let rows = sqlx::query_as::<_, JoinedFoodRow>(JOINED_QUERY)
            .bind(food_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Joined aggregation returned rows");

        rows.into_iter().map(JoinedFoodRow::into_stored).collect()
    }

    /// Reads parents first, then every food's facts concurrently.
    pub async fn aggregate_fan_out(&self) -> DbResult<Vec<StoredFood>> {
        let parents = sqlx::query_as::<_, FoodRow>(&format!(
            "SELECT {FOOD_COLUMNS} FROM {} ORDER BY food_id",
            schema::FOODS
        ))
        .fetch_all(&self.pool)
        .await?;

        // One food per pooled connection in flight; each food still issues
        // its sub-queries concurrently.
        let in_flight = self.pool.options().get_max_connections().max(1) as usize;
        debug!(count = parents.len(), in_flight, "Fan-out aggregation over parents");

        stream::iter(parents)
            .map(|row| self.assemble(row))
            .buffered(in_flight)
            .try_collect()
            .await
    }

    /// Runs every sub-query of one food concurrently and builds its document.
    async fn assemble(&self, row: FoodRow) -> DbResult<StoredFood> {
        let (id, mut doc) = row.into_document();

        let (
            varieties,
            storage_tips,
            usage_tips,
            common_uses,
            pairings,
            seasonality,
            health_benefits,
            nutrients,
            history,
            pesticides,
            botanical,
        ) = tokio::try_join!(
            self.child_values(ChildFact::Varieties, id),
            self.child_values(ChildFact::StorageTips, id),
            self.child_values(ChildFact::UsageTips, id),
            self.child_values(ChildFact::CommonUses, id),
            self.child_values(ChildFact::Pairings, id),
            self.child_values(ChildFact::Seasonality, id),
            self.child_values(ChildFact::HealthBenefits, id),
            self.nutrients_of(id),
            self.text_singleton(SingletonFact::History, "history", id),
            self.text_singleton(SingletonFact::Pesticides, "information", id),
            self.botanical_of(id),
        )?;

        doc.varieties = varieties;
        doc.storage_tips = storage_tips;
        doc.usage_tips = usage_tips;
        doc.common_uses = common_uses;
        doc.pairings = pairings;
        doc.seasonality = seasonality;
        doc.health_benefits = health_benefits;
        doc.nutrients = nutrients;
        doc.history = history;
        doc.pesticides = pesticides;
        doc.botanical_information = botanical;

        Ok(StoredFood {
            id,
            document: doc.canonicalize(),
        })
    }

    async fn child_values(&self, fact: ChildFact, food_id: FoodId) -> DbResult<Vec<String>> {
        let ChildTable { table, column } = schema::child_table(fact);
        let values = sqlx::query_scalar::<_, String>(&format!(
            "SELECT DISTINCT {column} FROM {table} WHERE food_id = ?1 ORDER BY {column}"
        ))
        .bind(food_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(values)
    }

    async fn nutrients_of(&self, food_id: FoodId) -> DbResult<Vec<NutrientEntry>> {
        let nutrients = sqlx::query_as::<_, NutrientEntry>(
            r#"
            SELECT n.name, fnu.amount, n.unit
            FROM food_nutrients fnu
            JOIN nutrients n ON n.nutrient_id = fnu.nutrient_id
            WHERE fnu.food_id = ?1
            ORDER BY n.name
            "#,
        )
        .bind(food_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(nutrients)
    }

    async fn text_singleton(
        &self,
        fact: SingletonFact,
        column: &str,
        food_id: FoodId,
    ) -> DbResult<Option<String>> {
        let table = schema::singleton_table(fact);
        let value = sqlx::query_scalar::<_, String>(&format!(
            "SELECT {column} FROM {table} WHERE food_id = ?1"
        ))
        .bind(food_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    async fn botanical_of(&self, food_id: FoodId) -> DbResult<Option<BotanicalInformation>> {
        let table = schema::singleton_table(SingletonFact::BotanicalInformation);
        let info = sqlx::query_as::<_, BotanicalInformation>(&format!(
            "SELECT family, genus, species FROM {table} WHERE food_id = ?1"
        ))
        .bind(food_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(info)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
