//! Plain-text report of a meal plan.
//!
//! ```text
//! Day: Monday
//!
//! Breakfast:
//!   - Primary:
//!     • Oatmeal: 50g
//!
//! Morning snack:
//!   - Primary: no data
//! …
//!
//! ------------------------------
//!
//! Notes:
//! • Drink at least 2L of water
//! ```

use super::Labels;
use crate::config::SchemaValidation;
use crate::schema::{FoodItem, MealKind, MealPlan, DAYS_KEY};
use serde_json::Value;

const SEPARATOR_WIDTH: usize = 30;

/// Render a plan as a plain-text report.
pub fn render_text(plan: &MealPlan, labels: &Labels) -> String {
    let mut out: Vec<String> = Vec::new();

    for day in &plan.days {
        let day_name = if day.day.trim().is_empty() {
            labels.unspecified_day
        } else {
            day.day.as_str()
        };
        out.push(format!("{}: {}", labels.day_prefix, day_name));

        for kind in MealKind::ALL {
            let slot = day.slot(kind);
            out.push(format!("\n{}:", labels.meal(kind)));

            if slot.primary.is_empty() {
                out.push(format!("  - {}: {}", labels.primary, labels.no_data));
            } else {
                out.push(format!("  - {}:", labels.primary));
                push_items(&mut out, &slot.primary);
            }

            if !slot.alternative.is_empty() {
                out.push(format!("  - {}:", labels.alternatives));
                push_items(&mut out, &slot.alternative);
            }
        }

        out.push(format!("\n{}\n", "-".repeat(SEPARATOR_WIDTH)));
    }

    if !plan.notes.is_empty() {
        out.push(format!("{}:", labels.notes));
        for note in &plan.notes {
            out.push(format!("• {note}"));
        }
    }

    out.join("\n")
}

/// Render raw model JSON, tolerating absent or broken input.
///
/// `None`, or a value without a day list, yields `labels.invalid_data`
/// instead of an error. Anything else is converted leniently and rendered.
pub fn render_text_value(value: Option<&Value>, labels: &Labels) -> String {
    let Some(value) = value else {
        return labels.invalid_data.to_string();
    };
    if !value.get(DAYS_KEY).is_some_and(Value::is_array) {
        return labels.invalid_data.to_string();
    }
    match MealPlan::from_json(value, SchemaValidation::Lenient) {
        Ok(plan) => render_text(&plan, labels),
        Err(_) => labels.invalid_data.to_string(),
    }
}

fn push_items(out: &mut Vec<String>, items: &[FoodItem]) {
    for item in items {
        out.push(format!("    • {}: {}", item.name, item.quantity));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DayPlan;
    use serde_json::json;

    fn monday_oatmeal() -> MealPlan {
        let mut day = DayPlan::new("Monday");
        day.breakfast.primary.push(FoodItem::new("Oatmeal", "50g"));
        MealPlan {
            days: vec![day],
            notes: vec![],
        }
    }

    #[test]
    fn single_day_report() {
        let text = render_text(&monday_oatmeal(), &Labels::ENGLISH);
        let expected = concat!(
            "Day: Monday\n",
            "\n",
            "Breakfast:\n",
            "  - Primary:\n",
            "    • Oatmeal: 50g\n",
            "\n",
            "Morning snack:\n",
            "  - Primary: no data\n",
            "\n",
            "Lunch:\n",
            "  - Primary: no data\n",
            "\n",
            "Afternoon snack:\n",
            "  - Primary: no data\n",
            "\n",
            "Dinner:\n",
            "  - Primary: no data\n",
            "\n",
            "------------------------------\n",
        );
        assert_eq!(text, expected);
        assert_eq!(text.matches("no data").count(), 4);
    }

    #[test]
    fn alternatives_only_when_present() {
        let mut plan = monday_oatmeal();
        plan.days[0].lunch.alternative.push(FoodItem::new("Free meal", "-"));
        let text = render_text(&plan, &Labels::ENGLISH);
        assert_eq!(text.matches("  - Alternatives:").count(), 1);
        assert!(text.contains("Lunch:\n  - Primary: no data\n  - Alternatives:\n    • Free meal: -"));
    }

    #[test]
    fn notes_section_after_days() {
        let mut plan = monday_oatmeal();
        plan.notes = vec!["Drink water".into(), "Walk daily".into()];
        let text = render_text(&plan, &Labels::ENGLISH);
        assert!(text.ends_with("Notes:\n• Drink water\n• Walk daily"), "got: {text}");
    }

    #[test]
    fn no_notes_header_without_notes() {
        let text = render_text(&monday_oatmeal(), &Labels::ENGLISH);
        assert!(!text.contains("Notes:"));
    }

    #[test]
    fn rendering_is_idempotent() {
        let mut plan = monday_oatmeal();
        plan.days.push(DayPlan::new("Tuesday"));
        plan.notes.push("Sleep 8h".into());
        assert_eq!(render_text(&plan, &Labels::ENGLISH), render_text(&plan, &Labels::ENGLISH));
    }

    #[test]
    fn blank_day_label_uses_placeholder() {
        let plan = MealPlan {
            days: vec![DayPlan::new("")],
            notes: vec![],
        };
        assert!(render_text(&plan, &Labels::ITALIAN).starts_with("Giorno: Non specificato\n"));
    }

    #[test]
    fn italian_labels() {
        let text = render_text(&monday_oatmeal(), &Labels::ITALIAN);
        assert!(text.contains("Colazione:\n  - Principale:\n    • Oatmeal: 50g"));
        assert!(text.contains("Cena:\n  - Principale: Nessun dato"));
    }

    #[test]
    fn invalid_input_returns_diagnostic() {
        let l = &Labels::ENGLISH;
        assert_eq!(render_text_value(None, l), l.invalid_data);
        assert_eq!(render_text_value(Some(&Value::Null), l), l.invalid_data);
        assert_eq!(render_text_value(Some(&json!({ "days": [] })), l), l.invalid_data);
        assert_eq!(render_text_value(Some(&json!({ "giorni": "Lunedì" })), l), l.invalid_data);
    }

    #[test]
    fn raw_value_rendered_leniently() {
        let v = json!({ "giorni": [{ "giorno": "Monday", "colazione": { "principale": [{ "alimento": "Oatmeal", "quantita": "50g" }] } }] });
        assert_eq!(
            render_text_value(Some(&v), &Labels::ENGLISH),
            render_text(&monday_oatmeal(), &Labels::ENGLISH)
        );
    }

    #[test]
    fn absent_and_blank_day_labels_share_placeholder() {
        let absent = json!({ "giorni": [{ "pranzo": { "principale": [] } }] });
        let blank = json!({ "giorni": [{ "giorno": "  " }] });
        for v in [absent, blank] {
            let text = render_text_value(Some(&v), &Labels::ENGLISH);
            assert!(text.starts_with("Day: Not specified\n"), "got: {text}");
        }
    }

    #[test]
    fn odd_item_field_does_not_hide_the_week() {
        let v = json!({
            "giorni": [
                { "giorno": "Lunedì", "pranzo": { "principale": [{ "alimento": { "nome": "Pasta" }, "quantita": "80g" }] } },
                { "giorno": "Martedì" }
            ]
        });
        let text = render_text_value(Some(&v), &Labels::ENGLISH);
        assert_ne!(text, Labels::ENGLISH.invalid_data);
        assert!(text.contains(r#"    • {"nome":"Pasta"}: 80g"#), "got: {text}");
        assert!(text.contains("Day: Martedì"));
    }

    #[test]
    fn empty_plan_renders_empty_string() {
        assert_eq!(render_text(&MealPlan::default(), &Labels::ENGLISH), "");
    }
}
