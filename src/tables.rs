use average::Mean;
use chrono::{DateTime, Local, Utc};
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::core::{AmountDetails, Contract, HourlyTariff};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

pub fn build_contracts_table(contracts: &[Contract]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["ID", "Relation", "Proposition", "Status", "Type", "Address", "City"]);
    for contract in contracts {
        table.add_row(vec![
            Cell::new(contract.id),
            Cell::new(contract.relation_id).add_attribute(Attribute::Dim),
            Cell::new(&contract.proposition_type),
            Cell::new(&contract.contract_status),
            Cell::new(&contract.contract_type).fg(if contract.is_dynamic() {
                Color::Green
            } else {
                Color::DarkYellow
            }),
            Cell::new(&contract.supply_address),
            Cell::new(format!(
                "{} {}",
                contract.supply_address.zip_code, contract.supply_address.city
            )),
        ]);
    }
    table
}

pub fn build_tariffs_table(tariffs: &[HourlyTariff], now: DateTime<Utc>) -> Table {
    let mean = mean_total(tariffs);
    let mut table = new_table();
    table.set_header(vec!["Date", "Start", "End", "Total", "Tax", "Surcharge", "Commodity"]);
    for tariff in tariffs {
        let from = tariff.period.from.with_timezone(&Local);
        let to = tariff.period.to.with_timezone(&Local);
        let mut row = vec![
            Cell::new(from.format("%b %d")).add_attribute(Attribute::Dim),
            Cell::new(from.format("%H:%M")),
            Cell::new(to.format("%H:%M")).add_attribute(Attribute::Dim),
            amount_cell(&tariff.total).fg(if tariff.total.gross >= mean {
                Color::Red
            } else {
                Color::Green
            }),
            amount_cell(&tariff.tax),
            amount_cell(&tariff.surcharge),
            amount_cell(&tariff.commodity),
        ];
        if tariff.is_current(now) {
            row = row.into_iter().map(|cell| cell.add_attribute(Attribute::Bold)).collect();
        }
        table.add_row(row);
    }
    table
}

/// Mean total gross price, zero when there are no tariffs.
fn mean_total(tariffs: &[HourlyTariff]) -> f64 {
    let estimate: Mean = tariffs.iter().map(|tariff| tariff.total.gross).collect();
    if estimate.is_empty() { 0.0 } else { estimate.mean() }
}

fn amount_cell(amount: &AmountDetails) -> Cell {
    Cell::new(format!("{:.4}", amount.gross)).set_alignment(CellAlignment::Right)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::core::tariff::tests::tariff;

    #[test]
    fn test_mean_total() {
        let tariffs = [
            tariff("2024-01-01T10:00:00Z", "2024-01-01T10:59:59Z", 0.20),
            tariff("2024-01-01T11:00:00Z", "2024-01-01T11:59:59Z", 0.30),
            tariff("2024-01-01T12:00:00Z", "2024-01-01T12:59:59Z", -0.05),
        ];
        assert_abs_diff_eq!(mean_total(&tariffs), 0.15, epsilon = 1e-9);
        assert_abs_diff_eq!(mean_total(&[]), 0.0);
    }

    #[test]
    fn test_build_tariffs_table() {
        let tariffs = [
            tariff("2024-01-01T10:00:00Z", "2024-01-01T10:59:59Z", 0.20),
            tariff("2024-01-01T11:00:00Z", "2024-01-01T11:59:59Z", 0.30),
        ];
        let table = build_tariffs_table(&tariffs, "2024-01-01T11:30:00Z".parse().unwrap());
        assert_eq!(table.row_count(), 2);
    }
}
