use platelab::db::{PlateCreate, PlateReagentCreate};
use platelab::ingest;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(tag: &str, ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    std::env::temp_dir().join(format!(
        "platelab-seed-{tag}-{}-{}.{ext}",
        std::process::id(),
        nanos
    ))
}

fn default_seed_csv() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data/default_reagents.csv")
}

#[tokio::test]
async fn importing_the_default_list_twice_does_not_duplicate() {
    let db_path = temp_path("twice", "sqlite");
    let db = platelab::db::spawn(&format!("sqlite:{}", db_path.display()), true)
        .await
        .unwrap();
    let seed = default_seed_csv();

    let first = ingest::import_seed_file(&db, &seed).await.unwrap();
    assert!(first.inserted > 0);
    assert_eq!(first.updated, 0);
    assert!(first.skipped.is_empty(), "{:?}", first.skipped);

    let after_first = db.list_reagents().await.unwrap();
    assert_eq!(after_first.len() as u64, first.inserted);

    let second = ingest::import_seed_file(&db, &seed).await.unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.updated, first.inserted);

    let after_second = db.list_reagents().await.unwrap();
    assert_eq!(after_second.len(), after_first.len());
    let ids = |rows: &[platelab::db::DbReagent]| rows.iter().map(|r| r.id).collect::<Vec<_>>();
    assert_eq!(ids(&after_first), ids(&after_second), "ids survive a re-import");

    let water = after_second.iter().find(|r| r.name == "Water").unwrap();
    assert_eq!(water.concentration, 0.0, "NULL concentration reads as zero");
}

#[tokio::test]
async fn reimport_updates_costs_and_keeps_mappings_valid() {
    let db_path = temp_path("update", "sqlite");
    let db = platelab::db::spawn(&format!("sqlite:{}", db_path.display()), true)
        .await
        .unwrap();

    let v1 = temp_path("v1", "csv");
    std::fs::write(
        &v1,
        "name,concentration,unit,unit_cost,description\nGlucose,1,M,0.10,Carbon source\n",
    )
    .unwrap();
    ingest::import_seed_file(&db, &v1).await.unwrap();
    let glucose = db.list_reagents().await.unwrap().remove(0);

    let plate = db
        .create_plate(PlateCreate {
            label: "plate_1".to_string(),
            well_count: None,
            description: None,
        })
        .await
        .unwrap();
    db.add_plate_reagent(PlateReagentCreate {
        plate_id: plate.id,
        well: "A1".parse().unwrap(),
        reagent_id: glucose.id,
        quantity: 10.0,
    })
    .await
    .unwrap();

    // columns reordered, no description, bad row alongside
    let v2 = temp_path("v2", "csv");
    std::fs::write(
        &v2,
        "Unit,Name,Unit_Cost,Concentration\nM,Glucose,0.25,2\nmL,Broken,abc,1\n",
    )
    .unwrap();
    let report = ingest::import_seed_file(&db, &v2).await.unwrap();
    assert_eq!((report.inserted, report.updated), (0, 1));
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].line, 3);

    let updated = db.get_reagent(glucose.id).await.unwrap();
    assert_eq!(updated.unit_cost, 0.25);
    assert_eq!(updated.concentration, 2.0);
    assert_eq!(updated.description.as_deref(), Some("Carbon source"));
    assert_eq!(db.list_plate_reagents(plate.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn missing_required_column_fails_the_import() {
    let db_path = temp_path("header", "sqlite");
    let db = platelab::db::spawn(&format!("sqlite:{}", db_path.display()), true)
        .await
        .unwrap();
    let csv = temp_path("no-unit", "csv");
    std::fs::write(&csv, "name,concentration\nGlucose,1\n").unwrap();

    let err = ingest::import_seed_file(&db, &csv).await.unwrap_err();
    assert!(matches!(err, platelab::PlatelabError::InvalidInput(_)));
    assert!(db.list_reagents().await.unwrap().is_empty());
}
