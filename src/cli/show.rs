use super::ui;
use crate::core::detect::AppendInstruction;
use crate::core::history::RateHistory;
use comfy_table::Cell;

fn percent_change(previous: f64, current: f64) -> Option<f64> {
    (previous != 0.0).then(|| (current - previous) / previous * 100.0)
}

/// Renders every series of `history` as one table, oldest sample first.
pub fn history_table(title: &str, history: &RateHistory) -> String {
    let mut output = format!("{}\n\n", ui::style_text(title, ui::StyleType::Title));

    if history.is_empty() {
        output.push_str(&ui::style_text("No samples recorded.", ui::StyleType::Subtle));
        return output;
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Recorded at (UTC)"),
        ui::header_cell("Rate"),
        ui::header_cell("Change"),
    ]);

    for (currency, series) in history.iter() {
        let mut previous: Option<f64> = None;
        for sample in series {
            let change = previous
                .and_then(|p| percent_change(p, sample.value))
                .map_or_else(ui::na_cell, ui::change_cell);
            table.add_row(vec![
                Cell::new(currency.code()),
                Cell::new(sample.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
                ui::rate_cell(sample.value),
                change,
            ]);
            previous = Some(sample.value);
        }
    }

    output.push_str(&table.to_string());
    output
}

/// Summary of one sampling cycle.
pub fn recorded_changes(instructions: &[AppendInstruction]) -> String {
    if instructions.is_empty() {
        return ui::style_text("No change in the currency rates.", ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Recorded at (UTC)"),
        ui::header_cell("Rate"),
    ]);
    for instruction in instructions {
        table.add_row(vec![
            Cell::new(instruction.currency.code()),
            Cell::new(
                instruction
                    .sample
                    .timestamp
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
            ),
            ui::rate_cell(instruction.sample.value),
        ]);
    }
    format!("Recorded {} change(s)\n\n{table}", instructions.len())
}
