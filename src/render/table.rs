//! Tabular projections of a meal plan.
//!
//! [`weekly_table`] gives one row per day and one column per meal;
//! [`notes_table`] gives one row per note. Both keep the input order.
//! [`Table::to_tsv`] is meant for pasting into Excel or Google Sheets,
//! [`Table::to_markdown`] for documents and terminals.

use super::Labels;
use crate::schema::{FoodItem, MealKind, MealPlan};
use serde::Serialize;

/// A header row plus string cells. Every row has `headers.len()` cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Day label column followed by the five meals in canonical order.
pub fn weekly_table(plan: &MealPlan, labels: &Labels) -> Table {
    let mut headers = Vec::with_capacity(1 + MealKind::ALL.len());
    headers.push(labels.day_column.to_string());
    headers.extend(MealKind::ALL.iter().map(|k| labels.meal(*k).to_string()));

    let rows = plan
        .days
        .iter()
        .map(|day| {
            let mut row = Vec::with_capacity(headers.len());
            row.push(day.day.clone());
            for kind in MealKind::ALL {
                let slot = day.slot(kind);
                row.push(meal_cell(&slot.primary, &slot.alternative, labels));
            }
            row
        })
        .collect();

    Table { headers, rows }
}

/// One single-column row per note.
pub fn notes_table(plan: &MealPlan, labels: &Labels) -> Table {
    Table {
        headers: vec![labels.notes_column.to_string()],
        rows: plan.notes.iter().map(|n| vec![n.clone()]).collect(),
    }
}

/// `name (quantity)` per primary item, one per line, then a single
/// `Alternatives: a (q), b (q)` line when there are alternatives.
fn meal_cell(primary: &[FoodItem], alternative: &[FoodItem], labels: &Labels) -> String {
    let mut lines: Vec<String> = primary.iter().map(item_text).collect();
    if !alternative.is_empty() {
        let alts: Vec<String> = alternative.iter().map(item_text).collect();
        lines.push(format!("{}: {}", labels.alternatives, alts.join(", ")));
    }
    lines.join("\n")
}

fn item_text(item: &FoodItem) -> String {
    format!("{} ({})", item.name, item.quantity)
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column named `header`, if any.
    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Tab-separated values. Cells holding a tab, newline or quote are
    /// wrapped in double quotes with inner quotes doubled, which is what
    /// spreadsheet paste expects for multi-line cells.
    pub fn to_tsv(&self) -> String {
        let mut out = String::new();
        for row in std::iter::once(&self.headers).chain(self.rows.iter()) {
            let line: Vec<String> = row.iter().map(|c| tsv_cell(c)).collect();
            out.push_str(&line.join("\t"));
            out.push('\n');
        }
        out
    }

    /// GitHub-flavoured Markdown table; line breaks become `<br>`.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&markdown_row(&self.headers));
        out.push_str(&markdown_row(
            &self.headers.iter().map(|_| "---".to_string()).collect::<Vec<_>>(),
        ));
        for row in &self.rows {
            out.push_str(&markdown_row(row));
        }
        out
    }
}

fn tsv_cell(cell: &str) -> String {
    if cell.contains(['\t', '\n', '"']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

fn markdown_row(cells: &[String]) -> String {
    let cells: Vec<String> = cells
        .iter()
        .map(|c| c.replace('|', "\\|").replace('\n', "<br>"))
        .collect();
    format!("| {} |\n", cells.join(" | "))
}
