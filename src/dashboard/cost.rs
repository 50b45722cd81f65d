//! Reagent cost aggregation.
//!
//! A plate's cost is `Σ quantity × unit_cost` over its reagent mappings.
//! Plates with no mappings are reported with a zero total.

use crate::db::{DbExperiment, ExperimentCostRow, PlateCostRow};
use platelab_schema::{
    CostDashboard, CostLine, CumulativeCostPoint, ExperimentCost, PlateCostSummary,
    ReagentCostShare,
};
use std::collections::{BTreeMap, HashMap};

fn cost_line(row: &PlateCostRow) -> Option<CostLine> {
    let (Some(reagent_id), Some(quantity)) = (row.reagent_id, row.quantity) else {
        return None;
    };
    let unit_cost = row.unit_cost.unwrap_or(0.0);
    Some(CostLine {
        reagent_id,
        reagent_name: row.reagent_name.clone().unwrap_or_default(),
        unit: row.unit.clone().unwrap_or_default(),
        quantity,
        unit_cost,
        cost: quantity * unit_cost,
    })
}

/// Folds joined cost rows into per-plate totals, a per-reagent breakdown and a
/// cumulative series ordered by plate creation time.
pub fn summarize(rows: &[PlateCostRow]) -> CostDashboard {
    let mut plates: Vec<PlateCostSummary> = Vec::new();
    let mut slots: HashMap<i64, usize> = HashMap::new();
    let mut reagents: BTreeMap<i64, ReagentCostShare> = BTreeMap::new();

    for row in rows {
        let slot = *slots.entry(row.plate_id).or_insert_with(|| {
            plates.push(PlateCostSummary {
                plate_id: row.plate_id,
                label: row.plate_label.clone(),
                created_at: row.plate_created_at,
                total_cost: 0.0,
                lines: Vec::new(),
            });
            plates.len() - 1
        });

        let Some(line) = cost_line(row) else {
            continue;
        };

        let share = reagents
            .entry(line.reagent_id)
            .or_insert_with(|| ReagentCostShare {
                reagent_id: line.reagent_id,
                reagent_name: line.reagent_name.clone(),
                quantity: 0.0,
                cost: 0.0,
                share: 0.0,
            });
        share.quantity += line.quantity;
        share.cost += line.cost;

        let plate = &mut plates[slot];
        plate.total_cost += line.cost;
        plate.lines.push(line);
    }

    plates.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then(a.plate_id.cmp(&b.plate_id))
    });

    let mut running = 0.0;
    let cumulative = plates
        .iter()
        .map(|p| {
            running += p.total_cost;
            CumulativeCostPoint {
                at: p.created_at,
                plate_id: p.plate_id,
                plate_label: p.label.clone(),
                cumulative_cost: running,
            }
        })
        .collect();
    let grand_total = running;

    let mut reagents: Vec<ReagentCostShare> = reagents.into_values().collect();
    if grand_total > 0.0 {
        for r in &mut reagents {
            r.share = r.cost / grand_total;
        }
    }
    reagents.sort_by(|a, b| {
        b.cost
            .total_cmp(&a.cost)
            .then_with(|| a.reagent_name.cmp(&b.reagent_name))
    });

    CostDashboard {
        grand_total,
        plates,
        reagents,
        cumulative,
    }
}

/// Prices every reagent amount on an experiment sheet.
pub fn experiment_cost(experiment: &DbExperiment, rows: &[ExperimentCostRow]) -> ExperimentCost {
    let lines: Vec<CostLine> = rows
        .iter()
        .map(|r| CostLine {
            reagent_id: r.reagent_id,
            reagent_name: r.reagent_name.clone(),
            unit: r.unit.clone(),
            quantity: r.value,
            unit_cost: r.unit_cost,
            cost: r.value * r.unit_cost,
        })
        .collect();
    ExperimentCost {
        experiment_id: experiment.id,
        number: experiment.number,
        cell_concentration: experiment.cell_concentration,
        dilution: experiment.dilution,
        total_cost: lines.iter().map(|l| l.cost).sum(),
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 25, hour, 0, 0).unwrap()
    }

    fn row(
        plate_id: i64,
        created: DateTime<Utc>,
        reagent: Option<(i64, &str, f64, f64)>,
    ) -> PlateCostRow {
        PlateCostRow {
            plate_id,
            plate_label: format!("plate_{plate_id}"),
            plate_created_at: created,
            reagent_id: reagent.map(|r| r.0),
            reagent_name: reagent.map(|r| r.1.to_string()),
            unit: reagent.map(|_| "mL".to_string()),
            quantity: reagent.map(|r| r.2),
            unit_cost: reagent.map(|r| r.3),
        }
    }

    #[test]
    fn plate_total_is_sum_of_quantity_times_unit_cost() {
        let rows = vec![
            row(1, at(9), Some((10, "A", 3.0, 2.0))),
            row(1, at(9), Some((11, "B", 1.0, 5.0))),
        ];
        let dash = summarize(&rows);
        assert_eq!(dash.plates.len(), 1);
        assert_eq!(dash.plates[0].total_cost, 11.0);
        assert_eq!(dash.plates[0].lines.len(), 2);
        assert_eq!(dash.plates[0].lines[0].cost, 6.0);
        assert_eq!(dash.grand_total, 11.0);
    }

    #[test]
    fn empty_plates_are_kept_with_zero_cost() {
        let rows = vec![row(2, at(8), None), row(1, at(9), Some((10, "A", 2.0, 1.5)))];
        let dash = summarize(&rows);
        let totals: Vec<(i64, f64)> = dash.plates.iter().map(|p| (p.plate_id, p.total_cost)).collect();
        assert_eq!(totals, vec![(2, 0.0), (1, 3.0)]);
        assert!(dash.plates[0].lines.is_empty());
    }

    #[test]
    fn cumulative_series_follows_creation_time() {
        let rows = vec![
            row(3, at(12), Some((10, "A", 1.0, 4.0))),
            row(1, at(9), Some((10, "A", 1.0, 1.0))),
            row(2, at(10), Some((11, "B", 2.0, 1.0))),
        ];
        let dash = summarize(&rows);
        let series: Vec<(i64, f64)> = dash
            .cumulative
            .iter()
            .map(|p| (p.plate_id, p.cumulative_cost))
            .collect();
        assert_eq!(series, vec![(1, 1.0), (2, 3.0), (3, 7.0)]);
    }

    #[test]
    fn reagent_breakdown_spans_plates_and_shares_sum_to_one() {
        let rows = vec![
            row(1, at(9), Some((10, "A", 3.0, 2.0))),
            row(1, at(9), Some((11, "B", 1.0, 5.0))),
            row(2, at(10), Some((10, "A", 1.0, 2.0))),
        ];
        let dash = summarize(&rows);
        assert_eq!(dash.grand_total, 13.0);

        let a = dash.reagents.iter().find(|r| r.reagent_id == 10).unwrap();
        assert_eq!(a.quantity, 4.0);
        assert_eq!(a.cost, 8.0);
        assert_eq!(dash.reagents[0].reagent_id, 10, "highest spend first");

        let total_share: f64 = dash.reagents.iter().map(|r| r.share).sum();
        assert!((total_share - 1.0).abs() < 1e-12);
    }

    #[test]
    fn experiment_total_prices_each_sheet_line() {
        let experiment = DbExperiment {
            id: 4,
            number: 1,
            cell_concentration: 1e6,
            dilution: 10.0,
            created_at: at(9),
        };
        let line = |id: i64, name: &str, value: f64, unit_cost: f64| ExperimentCostRow {
            reagent_value_id: id,
            reagent_id: id + 100,
            reagent_name: name.to_string(),
            unit: "g".to_string(),
            value,
            unit_cost,
        };
        let cost = experiment_cost(
            &experiment,
            &[line(1, "Glucose", 2.5, 0.12), line(2, "Agar", 4.0, 0.5)],
        );
        assert_eq!(cost.number, 1);
        assert_eq!(cost.lines.len(), 2);
        assert!((cost.total_cost - 2.3).abs() < 1e-12);
        assert_eq!(experiment_cost(&experiment, &[]).total_cost, 0.0);
    }

    #[test]
    fn no_rows_gives_empty_dashboard() {
        assert_eq!(summarize(&[]), CostDashboard::default());
    }
}
