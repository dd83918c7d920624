use calcium_core::lookup::{CellCompartment, ProcessingMethod, RoiType};
use calcium_core::storage::models::*;
use calcium_core::storage::{Database, LookupTable};
use serde_json::json;
use tempfile::tempdir;

fn make_scan(db: &Database, scan_id: i64) {
    db.insert_scan(&Scan {
        scan_id,
        scan_path: format!("scans/scan_{}.tif", scan_id),
        description: String::new(),
    })
    .unwrap();
}

fn make_suite2p_paramset(db: &Database, paramset_idx: i64) -> i64 {
    let params_id = db.insert_suite2p_params(&json!({"tau": 1.25, "fs": 30.0})).unwrap();
    db.insert_param_set(&ParamSet {
        paramset_idx,
        paramset_desc: "suite2p defaults".to_string(),
        specialization: ParamSetSpecialization::Suite2p {
            suite2p_paramset_id: params_id,
        },
    })
    .unwrap();
    params_id
}

#[test]
fn test_schema_version_after_open() {
    let db = Database::open_in_memory().unwrap();
    assert_eq!(db.schema_version().unwrap(), 1);
}

#[test]
fn test_reopen_does_not_rerun_migrations() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("calcium.db");
    {
        let db = Database::open(path.to_str().unwrap()).unwrap();
        make_scan(&db, 1);
    }
    let db = Database::open(path.to_str().unwrap()).unwrap();
    assert_eq!(db.schema_version().unwrap(), 1);
    assert_eq!(db.count_rows("processing_method").unwrap(), 2);
    assert!(db.get_scan(1).unwrap().is_some());
}

#[test]
fn test_lookup_tables_match_enums() {
    let db = Database::open_in_memory().unwrap();

    let methods = db.lookup_values(LookupTable::ProcessingMethod).unwrap();
    let expected: Vec<String> = ProcessingMethod::ALL.iter().map(|m| m.to_string()).collect();
    assert_eq!(methods, expected);

    let compartments = db.lookup_values(LookupTable::CellCompartment).unwrap();
    let expected: Vec<String> = CellCompartment::ALL.iter().map(|c| c.to_string()).collect();
    assert_eq!(compartments, expected);

    let roi_types = db.lookup_values(LookupTable::RoiType).unwrap();
    let expected: Vec<String> = RoiType::ALL.iter().map(|r| r.to_string()).collect();
    assert_eq!(roi_types, expected);
}

#[test]
fn test_param_set_with_specialization() {
    let db = Database::open_in_memory().unwrap();
    let s2p_id = make_suite2p_paramset(&db, 0);

    let caiman_id = db.insert_caiman_params(&json!({"gSig": [4, 4]})).unwrap();
    db.insert_param_set(&ParamSet {
        paramset_idx: 0,
        paramset_desc: "caiman defaults".to_string(),
        specialization: ParamSetSpecialization::Caiman {
            caiman_paramset_id: caiman_id,
        },
    })
    .unwrap();

    let all = db.list_param_sets().unwrap();
    assert_eq!(all.len(), 2);

    let s2p = db.get_param_set(ProcessingMethod::Suite2p, 0).unwrap().unwrap();
    assert_eq!(s2p.method(), ProcessingMethod::Suite2p);
    assert_eq!(
        s2p.specialization,
        ParamSetSpecialization::Suite2p {
            suite2p_paramset_id: s2p_id
        }
    );
    let params = db.get_specialized_params(&s2p.specialization).unwrap().unwrap();
    assert_eq!(params["tau"], json!(1.25));

    let caiman = db.get_param_set(ProcessingMethod::Caiman, 0).unwrap().unwrap();
    assert_eq!(caiman.paramset_desc, "caiman defaults");
    assert!(db.get_param_set(ProcessingMethod::Caiman, 1).unwrap().is_none());
}

#[test]
fn test_specialization_must_match_method() {
    let db = Database::open_in_memory().unwrap();
    make_suite2p_paramset(&db, 0);
    let caiman_id = db.insert_caiman_params(&json!({})).unwrap();

    // A caiman specialization cannot point at a suite2p parameter set.
    let result = db.connection().execute(
        "INSERT INTO processing_paramset_caiman \
         (processing_method, paramset_idx, caiman_paramset_id) VALUES ('suite2p', 0, ?1)",
        rusqlite::params![caiman_id],
    );
    assert!(result.is_err());
}

#[test]
fn test_param_set_rolls_back_on_missing_params() {
    let db = Database::open_in_memory().unwrap();
    let result = db.insert_param_set(&ParamSet {
        paramset_idx: 3,
        paramset_desc: "dangling".to_string(),
        specialization: ParamSetSpecialization::Caiman {
            caiman_paramset_id: 999,
        },
    });
    assert!(result.is_err());
    assert_eq!(db.count_rows("processing_paramset").unwrap(), 0);
}

#[test]
fn test_task_requires_existing_param_set() {
    let db = Database::open_in_memory().unwrap();
    make_scan(&db, 1);
    let key = ProcessingTaskKey::generate(1);
    assert!(db
        .insert_processing_task(&key, ProcessingMethod::Suite2p, 0)
        .is_err());
    assert!(db.get_processing_task(&key).unwrap().is_none());
}

#[test]
fn test_duplicate_task_rejected_distinct_token_allowed() {
    let db = Database::open_in_memory().unwrap();
    make_scan(&db, 1);
    make_suite2p_paramset(&db, 0);

    let key = ProcessingTaskKey::generate(1);
    db.insert_processing_task(&key, ProcessingMethod::Suite2p, 0).unwrap();
    assert!(db
        .insert_processing_task(&key, ProcessingMethod::Suite2p, 0)
        .is_err());

    let other = ProcessingTaskKey::generate(1);
    db.insert_processing_task(&other, ProcessingMethod::Suite2p, 0).unwrap();
    assert_eq!(db.list_processing_tasks().unwrap().len(), 2);
}

#[test]
fn test_task_status_and_pending_list() {
    let db = Database::open_in_memory().unwrap();
    make_scan(&db, 1);
    make_suite2p_paramset(&db, 0);

    let done = ProcessingTaskKey::generate(1);
    let waiting = ProcessingTaskKey::generate(1);
    db.insert_processing_task(&done, ProcessingMethod::Suite2p, 0).unwrap();
    db.insert_processing_task(&waiting, ProcessingMethod::Suite2p, 0).unwrap();
    db.insert_processing(&done, "2024-05-01T12:00:00+00:00", &["s2p/F.npy".to_string()])
        .unwrap();

    assert_eq!(db.task_status(&done).unwrap(), Some(TaskStatus::Complete));
    assert_eq!(db.task_status(&waiting).unwrap(), Some(TaskStatus::Pending));
    assert_eq!(db.task_status(&ProcessingTaskKey::generate(1)).unwrap(), None);

    let pending = db.list_pending_tasks().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].key, waiting);

    let summaries = db.list_task_summaries().unwrap();
    let done_summary = summaries.iter().find(|s| s.task.key == done).unwrap();
    assert_eq!(done_summary.status(), TaskStatus::Complete);
    assert_eq!(done_summary.output_file_count, 1);
}

#[test]
fn test_processing_is_inserted_once() {
    let db = Database::open_in_memory().unwrap();
    make_scan(&db, 1);
    make_suite2p_paramset(&db, 0);
    let key = ProcessingTaskKey::generate(1);
    db.insert_processing_task(&key, ProcessingMethod::Suite2p, 0).unwrap();

    db.insert_processing(&key, "2024-05-01T12:00:00+00:00", &[]).unwrap();
    assert!(db
        .insert_processing(&key, "2024-05-02T12:00:00+00:00", &[])
        .is_err());

    let processing = db.get_processing(&key).unwrap().unwrap();
    assert_eq!(processing.processing_time, "2024-05-01T12:00:00+00:00");
    assert!(processing.output_files.is_empty());
}

#[test]
fn test_shared_physical_file_registered_once() {
    let db = Database::open_in_memory().unwrap();
    make_scan(&db, 1);
    make_suite2p_paramset(&db, 0);
    let a = ProcessingTaskKey::generate(1);
    let b = ProcessingTaskKey::generate(1);
    db.insert_processing_task(&a, ProcessingMethod::Suite2p, 0).unwrap();
    db.insert_processing_task(&b, ProcessingMethod::Suite2p, 0).unwrap();

    let files = vec!["shared/ops.npy".to_string()];
    db.insert_processing(&a, "2024-05-01T12:00:00+00:00", &files).unwrap();
    db.insert_processing(&b, "2024-05-01T12:05:00+00:00", &files).unwrap();

    assert_eq!(db.count_rows("physical_file").unwrap(), 1);
    assert_eq!(db.count_rows("processing_output_file").unwrap(), 2);
}

#[test]
fn test_delete_scan_cascades() {
    let db = Database::open_in_memory().unwrap();
    make_scan(&db, 1);
    make_scan(&db, 2);
    db.insert_scan_field(&ScanField {
        scan_id: 1,
        field_idx: 0,
        px_height: 8,
        px_width: 8,
    })
    .unwrap();
    db.insert_scan_channel(1, 0).unwrap();
    make_suite2p_paramset(&db, 0);

    let key = ProcessingTaskKey::generate(1);
    let kept = ProcessingTaskKey::generate(2);
    db.insert_processing_task(&key, ProcessingMethod::Suite2p, 0).unwrap();
    db.insert_processing_task(&kept, ProcessingMethod::Suite2p, 0).unwrap();
    db.insert_processing(&key, "2024-05-01T12:00:00+00:00", &["a.npy".to_string()])
        .unwrap();

    assert_eq!(db.delete_scan(1).unwrap(), 1);
    assert!(db.get_processing_task(&key).unwrap().is_none());
    assert_eq!(db.count_rows("processing").unwrap(), 0);
    assert_eq!(db.count_rows("processing_output_file").unwrap(), 0);
    assert_eq!(db.count_rows("scan_field").unwrap(), 0);
    assert!(db.get_processing_task(&kept).unwrap().is_some());
    // Physical files are not owned by a scan.
    assert_eq!(db.count_rows("physical_file").unwrap(), 1);
}

#[test]
fn test_scan_fields_and_channels() {
    let db = Database::open_in_memory().unwrap();
    make_scan(&db, 4);
    for field_idx in [1, 0] {
        db.insert_scan_field(&ScanField {
            scan_id: 4,
            field_idx,
            px_height: 512,
            px_width: 256,
        })
        .unwrap();
    }
    db.insert_scan_channel(4, 1).unwrap();
    db.insert_scan_channel(4, 0).unwrap();

    let fields = db.get_scan_fields(4).unwrap();
    assert_eq!(fields.iter().map(|f| f.field_idx).collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(db.get_scan_channels(4).unwrap(), vec![0, 1]);
}

#[test]
fn test_truncate_all_keeps_lookups() {
    let db = Database::open_in_memory().unwrap();
    make_scan(&db, 1);
    make_suite2p_paramset(&db, 0);
    let key = ProcessingTaskKey::generate(1);
    db.insert_processing_task(&key, ProcessingMethod::Suite2p, 0).unwrap();

    db.truncate_all().unwrap();

    assert_eq!(db.count_rows("scan").unwrap(), 0);
    assert_eq!(db.count_rows("processing_task").unwrap(), 0);
    assert_eq!(db.count_rows("processing_paramset").unwrap(), 0);
    assert_eq!(db.count_rows("roi_type").unwrap(), 6);
    assert_eq!(db.count_rows("cell_compartment").unwrap(), 3);
}

#[test]
fn test_param_set_with_params_is_atomic() {
    let db = Database::open_in_memory().unwrap();
    let created = db
        .insert_param_set_with_params(ProcessingMethod::Caiman, 0, "first", &json!({"p": 1}))
        .unwrap();
    assert_eq!(created.method(), ProcessingMethod::Caiman);
    assert_eq!(
        db.get_specialized_params(&created.specialization).unwrap(),
        Some(json!({"p": 1}))
    );

    // Reusing the index fails and leaves no orphaned parameter record.
    assert!(db
        .insert_param_set_with_params(ProcessingMethod::Caiman, 0, "again", &json!({"p": 2}))
        .is_err());
    assert_eq!(db.count_rows("caiman_paramset").unwrap(), 1);
    assert_eq!(db.count_rows("processing_paramset").unwrap(), 1);

    // The connection is usable after the rollback.
    db.insert_param_set_with_params(ProcessingMethod::Suite2p, 0, "s2p", &json!({}))
        .unwrap();
    assert_eq!(db.list_param_sets().unwrap().len(), 2);
}

#[test]
fn test_scan_with_layout_rolls_back_on_failure() {
    let db = Database::open_in_memory().unwrap();
    let scan = Scan {
        scan_id: 5,
        scan_path: "scans/scan_5.tif".to_string(),
        description: String::new(),
    };
    let fields = vec![ScanField {
        scan_id: 5,
        field_idx: 0,
        px_height: 16,
        px_width: 16,
    }];

    assert!(db.insert_scan_with_layout(&scan, &fields, &[0, 0]).is_err());
    assert!(db.get_scan(5).unwrap().is_none());
    assert_eq!(db.count_rows("scan_field").unwrap(), 0);
    assert_eq!(db.count_rows("scan_channel").unwrap(), 0);

    // A corrected retry succeeds.
    db.insert_scan_with_layout(&scan, &fields, &[0, 1]).unwrap();
    assert_eq!(db.get_scan_fields(5).unwrap(), fields);
    assert_eq!(db.get_scan_channels(5).unwrap(), vec![0, 1]);
}
