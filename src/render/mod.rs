//! Pure views over a [`crate::schema::MealPlan`].
//!
//! * [`text`]: the plain-text report shown in the report panel
//! * [`table`]: the weekly-plan and notes tables, with TSV and Markdown
//!   output for pasting into spreadsheets or documents
//!
//! Nothing here performs I/O; rendering the same plan twice gives the same
//! bytes. All user-visible wording comes from [`Labels`].

pub mod table;
pub mod text;

use crate::schema::MealKind;
use serde::{Deserialize, Serialize};

/// Wording used by the renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    pub day_prefix: &'static str,
    pub unspecified_day: &'static str,
    pub primary: &'static str,
    pub alternatives: &'static str,
    pub no_data: &'static str,
    pub notes: &'static str,
    pub invalid_data: &'static str,
    pub day_column: &'static str,
    pub notes_column: &'static str,
    meals: [&'static str; 5],
}

/// Which label set to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LabelLanguage {
    #[default]
    English,
    Italian,
}

impl Labels {
    pub const ENGLISH: Labels = Labels {
        day_prefix: "Day",
        unspecified_day: "Not specified",
        primary: "Primary",
        alternatives: "Alternatives",
        no_data: "no data",
        notes: "Notes",
        invalid_data: "Invalid or missing JSON data.",
        day_column: "Day",
        notes_column: "Notes",
        meals: ["Breakfast", "Morning snack", "Lunch", "Afternoon snack", "Dinner"],
    };

    pub const ITALIAN: Labels = Labels {
        day_prefix: "Giorno",
        unspecified_day: "Non specificato",
        primary: "Principale",
        alternatives: "Alternative",
        no_data: "Nessun dato",
        notes: "Note/Consigli",
        invalid_data: "Dati JSON non validi o mancanti.",
        day_column: "giorno",
        notes_column: "note/consigli",
        meals: ["Colazione", "Spuntino mattina", "Pranzo", "Spuntino pomeriggio", "Cena"],
    };

    pub fn for_language(lang: LabelLanguage) -> &'static Labels {
        match lang {
            LabelLanguage::English => &Self::ENGLISH,
            LabelLanguage::Italian => &Self::ITALIAN,
        }
    }

    /// Human-readable name of a meal.
    pub fn meal(&self, kind: MealKind) -> &'static str {
        let idx = MealKind::ALL
            .iter()
            .position(|k| *k == kind)
            .unwrap_or_default();
        self.meals[idx]
    }
}

impl Default for Labels {
    fn default() -> Self {
        Self::ENGLISH
    }
}
