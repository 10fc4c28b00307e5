//! The meal-plan schema shared by the extraction prompt and the renderers.
//!
//! The wire format mirrors the Italian diet sheets the pipeline reads: days
//! live under `giorni`, advice under `note/consigli`, and every day carries
//! the five meals `colazione`, `spuntino_mattina`, `pranzo`,
//! `spuntino_pomeriggio` and `cena`, each with `principale` and
//! `alternative` item lists.
//!
//! The language model is only *asked* to follow this shape, so the response
//! is converted with [`MealPlan::from_json`] rather than a bare
//! `serde_json::from_value`. That walk reports the JSON path of the first
//! violation and fills missing item fields with [`MISSING_VALUE`], which keeps
//! the renderers free of null handling.

use crate::config::SchemaValidation;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Placeholder used for a food name or quantity the source did not give.
pub const MISSING_VALUE: &str = "N/A";

/// Wire key of the day list.
pub const DAYS_KEY: &str = "giorni";
/// Wire key of a day's label.
pub const DAY_LABEL_KEY: &str = "giorno";
/// Wire key of the advisory notes.
pub const NOTES_KEY: &str = "note/consigli";
const PRIMARY_KEY: &str = "principale";
const ALTERNATIVE_KEY: &str = "alternative";
const NAME_KEY: &str = "alimento";
const QUANTITY_KEY: &str = "quantita";

/// A week (or any run of days) of meals plus free-text advice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealPlan {
    #[serde(rename = "giorni", default)]
    pub days: Vec<DayPlan>,
    #[serde(rename = "note/consigli", default)]
    pub notes: Vec<String>,
}

/// One day: a label and exactly five meal slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPlan {
    #[serde(rename = "giorno", default)]
    pub day: String,
    #[serde(rename = "colazione", default)]
    pub breakfast: MealSlot,
    #[serde(rename = "spuntino_mattina", default)]
    pub morning_snack: MealSlot,
    #[serde(rename = "pranzo", default)]
    pub lunch: MealSlot,
    #[serde(rename = "spuntino_pomeriggio", default)]
    pub afternoon_snack: MealSlot,
    #[serde(rename = "cena", default)]
    pub dinner: MealSlot,
}

/// Main items and their alternatives for one meal. Either list may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealSlot {
    #[serde(rename = "principale", default)]
    pub primary: Vec<FoodItem>,
    #[serde(rename = "alternative", default)]
    pub alternative: Vec<FoodItem>,
}

/// A food and its quantity, both kept as the source wrote them ("50g",
/// "1 vasetto", "q.b.").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodItem {
    #[serde(rename = "alimento")]
    pub name: String,
    #[serde(rename = "quantita")]
    pub quantity: String,
}

impl FoodItem {
    pub fn new(name: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.into(),
        }
    }
}

/// The five daily meals, in canonical display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MealKind {
    Breakfast,
    MorningSnack,
    Lunch,
    AfternoonSnack,
    Dinner,
}

impl MealKind {
    /// Every meal, breakfast first.
    pub const ALL: [MealKind; 5] = [
        MealKind::Breakfast,
        MealKind::MorningSnack,
        MealKind::Lunch,
        MealKind::AfternoonSnack,
        MealKind::Dinner,
    ];

    /// Key of this meal in the wire format.
    pub fn wire_key(self) -> &'static str {
        match self {
            MealKind::Breakfast => "colazione",
            MealKind::MorningSnack => "spuntino_mattina",
            MealKind::Lunch => "pranzo",
            MealKind::AfternoonSnack => "spuntino_pomeriggio",
            MealKind::Dinner => "cena",
        }
    }
}

impl DayPlan {
    /// An empty day with the given label.
    pub fn new(day: impl Into<String>) -> Self {
        Self {
            day: day.into(),
            ..Self::default()
        }
    }

    pub fn slot(&self, kind: MealKind) -> &MealSlot {
        match kind {
            MealKind::Breakfast => &self.breakfast,
            MealKind::MorningSnack => &self.morning_snack,
            MealKind::Lunch => &self.lunch,
            MealKind::AfternoonSnack => &self.afternoon_snack,
            MealKind::Dinner => &self.dinner,
        }
    }

    pub fn slot_mut(&mut self, kind: MealKind) -> &mut MealSlot {
        match kind {
            MealKind::Breakfast => &mut self.breakfast,
            MealKind::MorningSnack => &mut self.morning_snack,
            MealKind::Lunch => &mut self.lunch,
            MealKind::AfternoonSnack => &mut self.afternoon_snack,
            MealKind::Dinner => &mut self.dinner,
        }
    }
}

impl MealSlot {
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.alternative.is_empty()
    }
}

/// The shape embedded in the extraction prompt.
pub fn schema_template() -> Value {
    let item = json!([{ NAME_KEY: "string", QUANTITY_KEY: "string" }]);
    let slot = json!({ PRIMARY_KEY: item, ALTERNATIVE_KEY: item });

    let mut day = Map::new();
    day.insert(DAY_LABEL_KEY.to_string(), json!("string"));
    for kind in MealKind::ALL {
        day.insert(kind.wire_key().to_string(), slot.clone());
    }

    json!({
        DAYS_KEY: [Value::Object(day)],
        NOTES_KEY: ["string"],
    })
}

// ── Conversion from model output ────────────────────────────────────────

/// First place where a JSON value departs from the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Dotted path, e.g. `giorni[2].pranzo.principale`.
    pub path: String,
    pub expected: &'static str,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`: expected {}", self.path, self.expected)
    }
}

impl std::error::Error for SchemaViolation {}

impl MealPlan {
    /// Convert a parsed JSON value into a plan.
    ///
    /// A root without a `giorni` array is rejected in both modes. In
    /// [`SchemaValidation::Strict`] every day must be an object with a string
    /// label and all five meals, each meal an object with both lists, and
    /// every item an object. [`SchemaValidation::Lenient`] fills any gap with
    /// empty values instead. Missing item fields become [`MISSING_VALUE`] in
    /// both modes.
    pub fn from_json(value: &Value, mode: SchemaValidation) -> Result<Self, SchemaViolation> {
        let root = value.as_object().ok_or_else(|| violation("$", "a JSON object"))?;
        let days = root
            .get(DAYS_KEY)
            .and_then(Value::as_array)
            .ok_or_else(|| violation(DAYS_KEY, "an array of days"))?;

        let days = days
            .iter()
            .enumerate()
            .map(|(i, day)| convert_day(day, &format!("{DAYS_KEY}[{i}]"), mode))
            .collect::<Result<Vec<_>, _>>()?;

        let notes = convert_notes(root.get(NOTES_KEY), mode)?;

        Ok(MealPlan { days, notes })
    }
}

fn violation(path: impl Into<String>, expected: &'static str) -> SchemaViolation {
    SchemaViolation {
        path: path.into(),
        expected,
    }
}

fn convert_day(value: &Value, path: &str, mode: SchemaValidation) -> Result<DayPlan, SchemaViolation> {
    let Some(obj) = value.as_object() else {
        return match mode {
            SchemaValidation::Strict => Err(violation(path, "a day object")),
            SchemaValidation::Lenient => Ok(DayPlan::default()),
        };
    };

    let day = match obj.get(DAY_LABEL_KEY) {
        Some(Value::String(s)) => s.clone(),
        _ if mode == SchemaValidation::Strict => {
            return Err(violation(format!("{path}.{DAY_LABEL_KEY}"), "a string"));
        }
        Some(Value::Null) | None => String::new(),
        Some(other) => scalar_to_string(other),
    };

    let mut plan = DayPlan::new(day);
    for kind in MealKind::ALL {
        let slot_path = format!("{path}.{}", kind.wire_key());
        *plan.slot_mut(kind) = convert_slot(obj.get(kind.wire_key()), &slot_path, mode)?;
    }
    Ok(plan)
}

fn convert_slot(
    value: Option<&Value>,
    path: &str,
    mode: SchemaValidation,
) -> Result<MealSlot, SchemaViolation> {
    let obj = match value {
        Some(Value::Object(obj)) => obj,
        _ if mode == SchemaValidation::Strict => {
            return Err(violation(path, "a meal object with `principale` and `alternative`"));
        }
        _ => return Ok(MealSlot::default()),
    };

    Ok(MealSlot {
        primary: convert_items(obj.get(PRIMARY_KEY), &format!("{path}.{PRIMARY_KEY}"), mode)?,
        alternative: convert_items(
            obj.get(ALTERNATIVE_KEY),
            &format!("{path}.{ALTERNATIVE_KEY}"),
            mode,
        )?,
    })
}

fn convert_items(
    value: Option<&Value>,
    path: &str,
    mode: SchemaValidation,
) -> Result<Vec<FoodItem>, SchemaViolation> {
    let items = match value {
        Some(Value::Array(items)) => items,
        _ if mode == SchemaValidation::Strict => return Err(violation(path, "an array of items")),
        _ => return Ok(Vec::new()),
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| convert_item(item, &format!("{path}[{i}]"), mode))
        .collect()
}

fn convert_item(value: &Value, path: &str, mode: SchemaValidation) -> Result<FoodItem, SchemaViolation> {
    match value {
        Value::Object(obj) => Ok(FoodItem {
            name: item_field(obj.get(NAME_KEY), &format!("{path}.{NAME_KEY}"), mode)?,
            quantity: item_field(obj.get(QUANTITY_KEY), &format!("{path}.{QUANTITY_KEY}"), mode)?,
        }),
        _ if mode == SchemaValidation::Strict => Err(violation(path, "an item object")),
        // A bare "Yogurt greco" is still useful as a name.
        Value::String(s) => Ok(FoodItem::new(s.clone(), MISSING_VALUE)),
        _ => Ok(FoodItem::new(MISSING_VALUE, MISSING_VALUE)),
    }
}

fn item_field(value: Option<&Value>, path: &str, mode: SchemaValidation) -> Result<String, SchemaViolation> {
    match value {
        None | Some(Value::Null) => Ok(MISSING_VALUE.to_string()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(MISSING_VALUE.to_string()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(scalar_to_string(v)),
        Some(_) if mode == SchemaValidation::Strict => Err(violation(path, "a string")),
        // Objects and arrays are shown as compact JSON.
        Some(other) => Ok(other.to_string()),
    }
}

fn convert_notes(value: Option<&Value>, mode: SchemaValidation) -> Result<Vec<String>, SchemaViolation> {
    let notes = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(notes)) => notes,
        Some(_) if mode == SchemaValidation::Strict => {
            return Err(violation(NOTES_KEY, "an array of strings"));
        }
        Some(Value::String(s)) => return Ok(vec![s.clone()]),
        Some(_) => return Ok(Vec::new()),
    };

    notes
        .iter()
        .enumerate()
        .filter_map(|(i, note)| match note {
            Value::String(s) => Some(Ok(s.clone())),
            _ if mode == SchemaValidation::Strict => {
                Some(Err(violation(format!("{NOTES_KEY}[{i}]"), "a string")))
            }
            Value::Null => None,
            other => Some(Ok(scalar_to_string(other))),
        })
        .collect()
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_slot() -> Value {
        json!({ "principale": [], "alternative": [] })
    }

    fn full_day(label: &str) -> Value {
        json!({
            "giorno": label,
            "colazione": { "principale": [{ "alimento": "Avena", "quantita": "50g" }], "alternative": [] },
            "spuntino_mattina": empty_slot(),
            "pranzo": empty_slot(),
            "spuntino_pomeriggio": empty_slot(),
            "cena": empty_slot(),
        })
    }

    #[test]
    fn template_has_every_meal_key() {
        let t = schema_template();
        let day = &t["giorni"][0];
        assert_eq!(day["giorno"], "string");
        for kind in MealKind::ALL {
            assert!(day[kind.wire_key()]["principale"].is_array(), "{}", kind.wire_key());
            assert!(day[kind.wire_key()]["alternative"].is_array(), "{}", kind.wire_key());
        }
        assert_eq!(t["note/consigli"], json!(["string"]));
    }

    #[test]
    fn strict_accepts_complete_plan() {
        let v = json!({ "giorni": [full_day("Lunedì")], "note/consigli": ["Bere 2L di acqua"] });
        let plan = MealPlan::from_json(&v, SchemaValidation::Strict).unwrap();
        assert_eq!(plan.days.len(), 1);
        assert_eq!(plan.days[0].day, "Lunedì");
        assert_eq!(plan.days[0].breakfast.primary, vec![FoodItem::new("Avena", "50g")]);
        assert!(plan.days[0].dinner.is_empty());
        assert_eq!(plan.notes, vec!["Bere 2L di acqua".to_string()]);
    }

    #[test]
    fn strict_rejects_missing_meal_key() {
        let mut day = full_day("Martedì");
        day.as_object_mut().unwrap().remove("pranzo");
        let v = json!({ "giorni": [full_day("Lunedì"), day] });
        let err = MealPlan::from_json(&v, SchemaValidation::Strict).unwrap_err();
        assert_eq!(err.path, "giorni[1].pranzo");
    }

    #[test]
    fn strict_rejects_null_list() {
        let mut day = full_day("Lunedì");
        day["cena"]["alternative"] = Value::Null;
        let v = json!({ "giorni": [day] });
        let err = MealPlan::from_json(&v, SchemaValidation::Strict).unwrap_err();
        assert_eq!(err.path, "giorni[0].cena.alternative");
        assert!(err.to_string().contains("an array of items"));
    }

    #[test]
    fn lenient_fills_missing_pieces() {
        let v = json!({
            "giorni": [{ "giorno": "Mercoledì", "pranzo": { "principale": [{ "alimento": "Pasta" }] } }]
        });
        let plan = MealPlan::from_json(&v, SchemaValidation::Lenient).unwrap();
        let day = &plan.days[0];
        assert_eq!(day.lunch.primary, vec![FoodItem::new("Pasta", MISSING_VALUE)]);
        assert!(day.lunch.alternative.is_empty());
        assert!(day.breakfast.is_empty());
        assert!(plan.notes.is_empty());
    }

    #[test]
    fn nested_item_field_is_kept_as_json_when_lenient() {
        let v = json!({
            "giorni": [{
                "giorno": "Lunedì",
                "pranzo": { "principale": [{ "alimento": { "nome": "Pasta" }, "quantita": "80g" }] }
            }]
        });
        let plan = MealPlan::from_json(&v, SchemaValidation::Lenient).unwrap();
        assert_eq!(
            plan.days[0].lunch.primary,
            vec![FoodItem::new(r#"{"nome":"Pasta"}"#, "80g")]
        );

        let err = MealPlan::from_json(&v, SchemaValidation::Strict).unwrap_err();
        assert_eq!(err.path, "giorni[0].pranzo.principale[0].alimento");
    }

    #[test]
    fn missing_item_fields_become_placeholder_in_strict_mode() {
        let mut day = full_day("Giovedì");
        day["cena"]["principale"] = json!([{ "alimento": null, "quantita": 120 }]);
        let plan = MealPlan::from_json(&json!({ "giorni": [day] }), SchemaValidation::Strict).unwrap();
        assert_eq!(plan.days[0].dinner.primary, vec![FoodItem::new("N/A", "120")]);
    }

    #[test]
    fn root_without_days_is_rejected_in_both_modes() {
        let v = json!({ "note/consigli": [] });
        for mode in [SchemaValidation::Strict, SchemaValidation::Lenient] {
            let err = MealPlan::from_json(&v, mode).unwrap_err();
            assert_eq!(err.path, "giorni");
        }
        let err = MealPlan::from_json(&json!([1, 2]), SchemaValidation::Lenient).unwrap_err();
        assert_eq!(err.path, "$");
    }

    #[test]
    fn strict_rejects_non_string_note() {
        let v = json!({ "giorni": [], "note/consigli": ["ok", { "x": 1 }] });
        let err = MealPlan::from_json(&v, SchemaValidation::Strict).unwrap_err();
        assert_eq!(err.path, "note/consigli[1]");
    }

    #[test]
    fn serialises_back_to_wire_keys() {
        let mut day = DayPlan::new("Venerdì");
        day.lunch.alternative.push(FoodItem::new("Pasto libero", "-"));
        let plan = MealPlan { days: vec![day], notes: vec![] };
        let v = serde_json::to_value(&plan).unwrap();
        assert_eq!(v["giorni"][0]["pranzo"]["alternative"][0]["alimento"], "Pasto libero");
        assert!(v["giorni"][0]["spuntino_pomeriggio"]["principale"].as_array().unwrap().is_empty());
        assert!(v["note/consigli"].as_array().unwrap().is_empty());
    }
}
