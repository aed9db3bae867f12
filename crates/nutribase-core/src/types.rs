//! # Domain Types
//!
//! The nested food document and the catalogue of facts hanging off it.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Document Shape                                  │
//! │                                                                         │
//! │  ┌─────────────────────┐                                               │
//! │  │    FoodDocument     │   parent attributes (name, category, ...)     │
//! │  │  ─────────────────  │                                               │
//! │  │  ChildFact lists    │──► varieties, storageTips, usageTips,         │
//! │  │                     │    commonUses, pairings, seasonality,         │
//! │  │                     │    healthBenefits          (0..n each)        │
//! │  │  SingletonFacts     │──► history, pesticides,                       │
//! │  │                     │    botanicalInformation    (0..1 each)        │
//! │  │  nutrients          │──► NutrientEntry { name, amount, unit }       │
//! │  └─────────────────────┘         │                                     │
//! │                                  ▼                                     │
//! │                     shared Nutrient lookup row (by name)               │
//! │                                                                         │
//! │  StoredFood = { id } + FoodDocument   (what the read path returns)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Keys
//! Documents use camelCase keys. The snake_case spellings that older
//! clients send (`glycemic_index`, `image_reference`, ...) are accepted as
//! aliases on input; output is always camelCase.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Generated identifier of a food (parent) row.
pub type FoodId = i64;

/// Generated identifier of a shared nutrient row.
pub type NutrientId = i64;

// =============================================================================
// Nutrient Entry
// =============================================================================

/// One nutrient line of a document: "this food contains `amount` `unit` of
/// `name`".
///
/// Only `name` is required. On the write path it is the natural key used to
/// find or create the shared nutrient row; `unit` is only recorded when the
/// nutrient is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct NutrientEntry {
    pub name: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

impl NutrientEntry {
    /// Creates an entry with amount and unit.
    pub fn new(name: impl Into<String>, amount: f64, unit: impl Into<String>) -> Self {
        NutrientEntry {
            name: name.into(),
            amount: Some(amount),
            unit: Some(unit.into()),
        }
    }

    /// Total order used for canonical document form.
    fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| match (self.amount, other.amount) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                (a, b) => a.is_some().cmp(&b.is_some()),
            })
            .then_with(|| self.unit.cmp(&other.unit))
    }
}

/// A row of the shared nutrient lookup table.
///
/// Created on first use by name and shared by every food that mentions it.
/// `unit` is whatever the first document to mention the nutrient said.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Nutrient {
    #[ts(type = "number")]
    pub id: NutrientId,
    pub name: String,
    pub unit: Option<String>,
}

// =============================================================================
// Botanical Information
// =============================================================================

/// Botanical classification of a food. Stored as a singleton fact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BotanicalInformation {
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub genus: Option<String>,
    #[serde(default)]
    pub species: Option<String>,
}

impl BotanicalInformation {
    /// True when no rank is filled in. An empty classification is not stored.
    pub fn is_empty(&self) -> bool {
        self.family.is_none() && self.genus.is_none() && self.species.is_none()
    }
}

// =============================================================================
// Food Document
// =============================================================================

/// A food item with all of its facts, as exchanged with clients.
///
/// This is the input of the decomposition (write) path and, wrapped in
/// [`StoredFood`], the output of the aggregation (read) path. List fields
/// default to empty when absent; singleton facts default to `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FoodDocument {
    /// Display name. Required.
    pub name: String,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Free text such as "1 medium" or "100 g".
    #[serde(default, alias = "serving_size")]
    pub serving_size: Option<String>,

    #[serde(default)]
    pub calories: Option<f64>,

    #[serde(default, alias = "glycemic_index")]
    pub glycemic_index: Option<f64>,

    #[serde(default)]
    pub organic: Option<bool>,

    #[serde(default)]
    pub allergens: Option<String>,

    #[serde(default, alias = "environmental_impact")]
    pub environmental_impact: Option<String>,

    #[serde(default, alias = "image_reference")]
    pub image_reference: Option<String>,

    #[serde(default, alias = "cultural_significance")]
    pub cultural_significance: Option<String>,

    #[serde(default)]
    pub varieties: Vec<String>,

    #[serde(default, alias = "storage_tips")]
    pub storage_tips: Vec<String>,

    #[serde(default, alias = "usage_tips")]
    pub usage_tips: Vec<String>,

    #[serde(default, alias = "common_uses")]
    pub common_uses: Vec<String>,

    #[serde(default)]
    pub pairings: Vec<String>,

    #[serde(default)]
    pub seasonality: Vec<String>,

    #[serde(default, alias = "health_benefits")]
    pub health_benefits: Vec<String>,

    #[serde(default)]
    pub nutrients: Vec<NutrientEntry>,

    #[serde(default)]
    pub history: Option<String>,

    /// Pesticide information.
    #[serde(default, alias = "pesticides_info")]
    pub pesticides: Option<String>,

    #[serde(default, alias = "botanical_information")]
    pub botanical_information: Option<BotanicalInformation>,
}

impl FoodDocument {
    /// Creates a document with just a name.
    pub fn named(name: impl Into<String>) -> Self {
        FoodDocument {
            name: name.into(),
            ..FoodDocument::default()
        }
    }

    /// Returns the document in canonical form: the food name and nutrient
    /// names trimmed (they are stored trimmed), every child list sorted with
    /// duplicates removed, nutrients sorted by name, and an empty botanical
    /// classification collapsed to `None`.
    ///
    /// The read path returns canonical documents, so a round trip compares
    /// equal to `original.canonicalize()`.
    pub fn canonicalize(mut self) -> Self {
        trim_in_place(&mut self.name);
        for entry in &mut self.nutrients {
            trim_in_place(&mut entry.name);
        }

        for fact in ChildFact::ALL {
            let values = fact.values_mut(&mut self);
            values.sort();
            values.dedup();
        }

        self.nutrients.sort_by(NutrientEntry::canonical_cmp);
        self.nutrients
            .dedup_by(|a, b| a.canonical_cmp(b) == Ordering::Equal);

        if self
            .botanical_information
            .as_ref()
            .is_some_and(BotanicalInformation::is_empty)
        {
            self.botanical_information = None;
        }

        self
    }

    /// Number of child rows (child facts, singleton facts, nutrient links)
    /// a decomposition of this document writes besides the parent row.
    pub fn dependent_row_count(&self) -> usize {
        let children: usize = ChildFact::ALL
            .iter()
            .map(|fact| fact.values(self).len())
            .sum();
        let singletons = SingletonFact::ALL
            .iter()
            .filter(|fact| fact.is_present(self))
            .count();

        children + singletons + self.nutrients.len()
    }
}

fn trim_in_place(value: &mut String) {
    if value.trim().len() != value.len() {
        *value = value.trim().to_string();
    }
}

// =============================================================================
// Stored Food
// =============================================================================

/// A food as reconstructed by the read path: its identifier plus the
/// canonical document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StoredFood {
    #[ts(type = "number")]
    pub id: FoodId,

    #[serde(flatten)]
    pub document: FoodDocument,
}

// =============================================================================
// Child Facts
// =============================================================================

/// The one-to-many fact categories of a food. Each is a list of scalar
/// text values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildFact {
    Varieties,
    StorageTips,
    UsageTips,
    CommonUses,
    Pairings,
    Seasonality,
    HealthBenefits,
}

impl ChildFact {
    /// Every child category, in write order.
    pub const ALL: [ChildFact; 7] = [
        ChildFact::Varieties,
        ChildFact::StorageTips,
        ChildFact::UsageTips,
        ChildFact::CommonUses,
        ChildFact::Pairings,
        ChildFact::Seasonality,
        ChildFact::HealthBenefits,
    ];

    /// The document key of this category.
    pub fn field_name(&self) -> &'static str {
        match self {
            ChildFact::Varieties => "varieties",
            ChildFact::StorageTips => "storageTips",
            ChildFact::UsageTips => "usageTips",
            ChildFact::CommonUses => "commonUses",
            ChildFact::Pairings => "pairings",
            ChildFact::Seasonality => "seasonality",
            ChildFact::HealthBenefits => "healthBenefits",
        }
    }

    /// The values of this category in `doc`.
    pub fn values<'a>(&self, doc: &'a FoodDocument) -> &'a [String] {
        match self {
            ChildFact::Varieties => &doc.varieties,
            ChildFact::StorageTips => &doc.storage_tips,
            ChildFact::UsageTips => &doc.usage_tips,
            ChildFact::CommonUses => &doc.common_uses,
            ChildFact::Pairings => &doc.pairings,
            ChildFact::Seasonality => &doc.seasonality,
            ChildFact::HealthBenefits => &doc.health_benefits,
        }
    }

    /// Mutable access to the values of this category in `doc`.
    pub fn values_mut<'a>(&self, doc: &'a mut FoodDocument) -> &'a mut Vec<String> {
        match self {
            ChildFact::Varieties => &mut doc.varieties,
            ChildFact::StorageTips => &mut doc.storage_tips,
            ChildFact::UsageTips => &mut doc.usage_tips,
            ChildFact::CommonUses => &mut doc.common_uses,
            ChildFact::Pairings => &mut doc.pairings,
            ChildFact::Seasonality => &mut doc.seasonality,
            ChildFact::HealthBenefits => &mut doc.health_benefits,
        }
    }
}

impl fmt::Display for ChildFact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

// =============================================================================
// Singleton Facts
// =============================================================================

/// Fact categories holding at most one value per food. Absence is a valid
/// state, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SingletonFact {
    History,
    Pesticides,
    BotanicalInformation,
}

impl SingletonFact {
    pub const ALL: [SingletonFact; 3] = [
        SingletonFact::History,
        SingletonFact::Pesticides,
        SingletonFact::BotanicalInformation,
    ];

    /// The document key of this category.
    pub fn field_name(&self) -> &'static str {
        match self {
            SingletonFact::History => "history",
            SingletonFact::Pesticides => "pesticides",
            SingletonFact::BotanicalInformation => "botanicalInformation",
        }
    }

    /// Whether `doc` carries a value for this category that would be stored.
    pub fn is_present(&self, doc: &FoodDocument) -> bool {
        match self {
            SingletonFact::History => doc.history.is_some(),
            SingletonFact::Pesticides => doc.pesticides.is_some(),
            SingletonFact::BotanicalInformation => doc
                .botanical_information
                .as_ref()
                .is_some_and(|b| !b.is_empty()),
        }
    }
}

impl fmt::Display for SingletonFact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
