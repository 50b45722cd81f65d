use crate::db::{DbCellGrowth, DbPlate};
use crate::ingest::Well;
use platelab_schema::{GrowthChart, GrowthPoint, GrowthSeries};
use std::collections::BTreeMap;

/// Splits a plate's growth rows into one ascending series per well.
///
/// Wells are ordered by row letter, then numeric column (`A2` before `A10`).
pub fn growth_chart(plate: &DbPlate, rows: &[DbCellGrowth]) -> GrowthChart {
    let mut by_well: BTreeMap<(&str, i64), Vec<GrowthPoint>> = BTreeMap::new();
    for r in rows {
        by_well
            .entry((r.row_id.as_str(), r.column_id))
            .or_default()
            .push(GrowthPoint {
                time_index: r.time_index,
                cell_density: r.cell_density,
            });
    }

    let series = by_well
        .into_iter()
        .map(|((row_id, column_id), mut points)| {
            // stable: equal time indexes keep insertion order
            points.sort_by_key(|p| p.time_index);
            // rows predating well validation keep their raw name
            let well = Well::from_columns(row_id, column_id)
                .map_or_else(|_| format!("{row_id}{column_id}"), |w| w.to_string());
            GrowthSeries { well, points }
        })
        .collect();

    GrowthChart {
        plate_id: plate.id,
        plate_label: plate.label.clone(),
        series,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn growth(id: i64, well: (&str, i64), time_index: i64, cell_density: f64) -> DbCellGrowth {
        DbCellGrowth {
            id,
            plate_id: 1,
            row_id: well.0.to_string(),
            column_id: well.1,
            time_index,
            cell_density,
            measured_at: Utc::now(),
        }
    }

    #[test]
    fn groups_by_well_in_ascending_time() {
        let plate = DbPlate {
            id: 1,
            label: "plate_1".to_string(),
            well_count: 96,
            description: None,
            created_at: Utc::now(),
        };
        let rows = vec![
            growth(1, ("A", 10), 60, 0.3),
            growth(2, ("A", 2), 120, 0.5),
            growth(3, ("A", 2), 0, 0.1),
            growth(4, ("B", 1), 0, 0.2),
            growth(5, ("A", 2), 60, 0.2),
        ];
        let chart = growth_chart(&plate, &rows);

        let wells: Vec<&str> = chart.series.iter().map(|s| s.well.as_str()).collect();
        assert_eq!(wells, ["A2", "A10", "B1"]);

        let a2: Vec<i64> = chart.series[0].points.iter().map(|p| p.time_index).collect();
        assert_eq!(a2, [0, 60, 120]);
        assert_eq!(chart.plate_label, "plate_1");
    }

    #[test]
    fn well_names_are_normalized_through_well() {
        let plate = DbPlate {
            id: 1,
            label: "plate_1".to_string(),
            well_count: 96,
            description: None,
            created_at: Utc::now(),
        };
        let rows = vec![growth(1, ("c", 7), 0, 0.1), growth(2, ("ZZ", 3), 0, 0.2)];
        let chart = growth_chart(&plate, &rows);
        let wells: Vec<&str> = chart.series.iter().map(|s| s.well.as_str()).collect();
        assert_eq!(wells, ["ZZ3", "C7"]);
    }
}
