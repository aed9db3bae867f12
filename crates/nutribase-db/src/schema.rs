//! # Table Catalogue
//!
//! Where each fact category of a food lives in the relational schema.
//! The write path, both read strategies and the deletion cascade all
//! address tables through this module, so a new category is added here
//! once.
//!
//! ```text
//! ChildFact::Varieties       → food_varieties.variety
//! ChildFact::StorageTips     → storage_tips.tip
//! ChildFact::UsageTips       → usage_tips.tip
//! ChildFact::CommonUses      → common_uses.use_case
//! ChildFact::Pairings        → pairings.pairing
//! ChildFact::Seasonality     → seasonality.season
//! ChildFact::HealthBenefits  → health_benefits.benefit
//!
//! SingletonFact::History               → food_history.history
//! SingletonFact::Pesticides            → pesticides.information
//! SingletonFact::BotanicalInformation  → botanical_information.(family, genus, species)
//! ```

use nutribase_core::{ChildFact, SingletonFact};

/// The parent table.
pub const FOODS: &str = "foods";

/// Association rows between foods and the shared nutrient table.
pub const FOOD_NUTRIENTS: &str = "food_nutrients";

/// Table and value column of a one-to-many fact category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildTable {
    pub table: &'static str,
    pub column: &'static str,
}

/// Returns the table holding `fact`.
pub fn child_table(fact: ChildFact) -> ChildTable {
    let (table, column) = match fact {
        ChildFact::Varieties => ("food_varieties", "variety"),
        ChildFact::StorageTips => ("storage_tips", "tip"),
        ChildFact::UsageTips => ("usage_tips", "tip"),
        ChildFact::CommonUses => ("common_uses", "use_case"),
        ChildFact::Pairings => ("pairings", "pairing"),
        ChildFact::Seasonality => ("seasonality", "season"),
        ChildFact::HealthBenefits => ("health_benefits", "benefit"),
    };
    ChildTable { table, column }
}

/// Returns the table holding `fact`. Keyed by `food_id`.
pub fn singleton_table(fact: SingletonFact) -> &'static str {
    match fact {
        SingletonFact::History => "food_history",
        SingletonFact::Pesticides => "pesticides",
        SingletonFact::BotanicalInformation => "botanical_information",
    }
}

/// Every table with rows referencing a food, in the order the cascade
/// clears them. The parent table is not included.
pub fn dependent_tables() -> Vec<&'static str> {
    let mut tables: Vec<&'static str> = ChildFact::ALL
        .iter()
        .map(|fact| child_table(*fact).table)
        .collect();
    tables.extend(SingletonFact::ALL.iter().map(|fact| singleton_table(*fact)));
    tables.push(FOOD_NUTRIENTS);
    tables
}
