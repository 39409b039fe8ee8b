// ==========================================
// ConfigModel 集成测试
// ==========================================
// 测试目标: 单元格编辑、撤销/重做、派生、插值、列管理、保存通知
// ==========================================

mod helpers;

use helpers::*;
use pv_config_manager::catalog::StaticPvCatalog;
use pv_config_manager::config::ManagerSettings;
use pv_config_manager::domain::action::Action;
use pv_config_manager::domain::types::{DeriveFunc, Value, ValueType};
use pv_config_manager::model::{ConfigModel, ModelError, ModelEvent};
use pv_config_manager::service::client::ConfigurationFilter;
use pv_config_manager::service::error::{ConfigServiceError, INTERNAL_ERROR_STATUS};
use std::collections::BTreeMap;
use std::sync::Arc;

fn setup() -> (Arc<MockConfigService>, ConfigModel) {
    pv_config_manager::logging::init_test();
    let service = Arc::new(MockConfigService::new());
    let model = build_model(&numeric_catalog(), service.clone());
    (service, model)
}

// ==========================================
// 场景测试
// ==========================================

#[test]
fn test_scenario_derive_tune_column() {
    const QD_V: &str = "SI-Fam:PS-QD:Voltage-SP";
    const QF_V: &str = "SI-Fam:PS-QF:Voltage-SP";
    let catalog = StaticPvCatalog::new()
        .with_type(CONFIG_TYPE, [(QD_V, ValueType::Float), (QF_V, ValueType::Float)]);
    let service = Arc::new(MockConfigService::new());
    let mut model = build_model(&catalog, service);

    let values = BTreeMap::from([
        (QD_V.to_string(), Value::Float(10.0)),
        (QF_V.to_string(), Value::Float(20.0)),
    ]);
    model
        .new_configuration(0, "global_config", values)
        .expect("Failed to add configuration");

    let column = model
        .derive_configuration("tuned", 0, DeriveFunc::Tune, &[0.5, -0.5])
        .expect("Failed to derive configuration");

    assert_eq!(column, 1);
    assert_eq!(model.column_count(), 2);
    let tuned = model.configuration(1).unwrap();
    assert_eq!(tuned.name(), "tuned");
    assert_eq!(tuned.value(QD_V), Some(&Value::Float(10.5)));
    assert_eq!(tuned.value(QF_V), Some(&Value::Float(19.5)));
    // 基础列不变
    assert_eq!(model.configuration(0).unwrap().value(QD_V), Some(&Value::Float(10.0)));
}

#[test]
fn test_scenario_undo_restores_value() {
    let (service, mut model) = setup();
    let id = service.seed("cfg", CONFIG_TYPE, &items(1.0, 3.0, 5.0));
    model.load_configuration(0, &id).expect("Failed to load");
    let row = model.row_of(QD).unwrap();

    model.set_data(row, 0, Value::Float(2.0)).expect("Failed to set data");
    assert_eq!(model.data(row, 0).unwrap(), "2.000000");
    assert_eq!(model.header_data(0).unwrap(), "cfg*");

    assert!(model.undo().expect("Failed to undo"));

    assert_eq!(model.value(row, 0).unwrap(), &Value::Float(1.0));
    assert_eq!(model.redo_len(), 1);
    assert_eq!(model.undo_len(), 0);
    // 改回原值后不再有待保存内容
    assert_eq!(model.header_data(0).unwrap(), "cfg");
}

#[test]
fn test_scenario_clean_undo_after_close_keeps_same_named_sibling_entries() {
    let (_service, mut model) = setup();
    model.new_configuration(0, "cfg-A", values(1.0, 2.0, 3.0)).unwrap();
    model.new_configuration(1, "cfg-B", values(1.0, 2.0, 3.0)).unwrap();
    // 第二列改名后与第一列同名
    model.rename_configuration(1, "cfg-A").unwrap();

    let row = model.row_of(QF).unwrap();
    model.set_data(row, 0, Value::Float(7.0)).unwrap();
    model.set_data(row, 1, Value::Float(8.0)).unwrap();
    model.set_data(row, 0, Value::Float(9.0)).unwrap();
    assert!(model.undo().unwrap());
    assert_eq!(model.undo_len(), 2);
    assert_eq!(model.redo_len(), 1);

    let closed = model.close_configuration(0).expect("Failed to close");
    assert_eq!(model.configuration(0).unwrap().name(), closed.name());
    let removed = model.clean_undo_for(closed.key());

    assert_eq!(removed, 2);
    assert_eq!(model.redo_len(), 0);
    assert_eq!(model.undo_len(), 1);
    let remaining: Vec<&Action> = model.history().undo_entries().collect();
    assert_eq!(remaining[0].config_key(), model.configuration(0).unwrap().key());

    assert!(model.undo().unwrap());
    assert_eq!(model.value(row, 0).unwrap(), &Value::Float(2.0));
}

// ==========================================
// 撤销/重做
// ==========================================

#[test]
fn test_undo_redo_entries_are_inverse_pairs() {
    let (_service, mut model) = setup();
    model.new_configuration(0, "a", values(1.0, 2.0, 3.0)).unwrap();
    let row = model.row_of(QD).unwrap();

    model.set_data(row, 0, Value::Float(4.0)).unwrap();
    let pushed = model.history().undo_entries().next().cloned().unwrap();

    model.undo().unwrap();
    let redo = model.history().redo_entries().next().cloned().unwrap();
    assert_eq!(redo, pushed.inverse());

    model.redo().unwrap();
    let back = model.history().undo_entries().next().cloned().unwrap();
    assert_eq!(back, pushed);
    assert_eq!(model.value(row, 0).unwrap(), &Value::Float(4.0));
}

#[test]
fn test_undo_capacity_evicts_oldest() {
    let (_service, mut model) = setup();
    model.new_configuration(0, "a", values(0.0, 0.0, 0.0)).unwrap();
    let row = model.row_of(QD).unwrap();

    for n in 1..=76 {
        model.set_data(row, 0, Value::Float(n as f64)).unwrap();
    }
    assert_eq!(model.undo_len(), ManagerSettings::default().undo_capacity);

    let mut undone = 0;
    while model.undo().unwrap() {
        undone += 1;
    }
    assert_eq!(undone, 75);
    // 第一次修改已被淘汰,只能撤回到 1.0
    assert_eq!(model.value(row, 0).unwrap(), &Value::Float(1.0));
    assert_eq!(model.redo_len(), 75);
}

#[test]
fn test_set_data_keeps_redo_stack() {
    let (_service, mut model) = setup();
    model.new_configuration(0, "a", values(1.0, 2.0, 3.0)).unwrap();
    let row = model.row_of(QD).unwrap();

    model.set_data(row, 0, Value::Float(2.0)).unwrap();
    model.undo().unwrap();
    model.set_data(row, 0, Value::Float(5.0)).unwrap();

    assert_eq!(model.undo_len(), 1);
    assert_eq!(model.redo_len(), 1);
}

#[test]
fn test_set_same_value_still_records_action() {
    let (_service, mut model) = setup();
    model.new_configuration(0, "a", values(1.0, 2.0, 3.0)).unwrap();
    let row = model.row_of(QD).unwrap();

    model.set_data(row, 0, Value::Float(1.0)).unwrap();
    assert_eq!(model.undo_len(), 1);
}

#[test]
fn test_undo_for_closed_configuration_fails() {
    let (_service, mut model) = setup();
    model.new_configuration(0, "a", values(1.0, 2.0, 3.0)).unwrap();
    model.set_data(0, 0, Value::Float(9.0)).unwrap();
    let closed = model.close_configuration(0).unwrap();

    let result = model.undo();
    assert!(matches!(result, Err(ModelError::ConfigurationNotOpen(key)) if key == closed.key()));
}

#[test]
fn test_out_of_range_errors() {
    let (_service, mut model) = setup();
    model.new_configuration(0, "a", values(1.0, 2.0, 3.0)).unwrap();

    assert!(matches!(model.data(9, 0), Err(ModelError::RowOutOfRange { row: 9, count: 3 })));
    assert!(matches!(
        model.set_data(0, 4, Value::Float(1.0)),
        Err(ModelError::ColumnOutOfRange { column: 4, count: 1 })
    ));
    assert!(matches!(model.close_configuration(1), Err(ModelError::ColumnOutOfRange { .. })));
}

// ==========================================
// 派生与插值
// ==========================================

#[test]
fn test_derive_chromaticity_copies_values() {
    let (_service, mut model) = setup();
    model.new_configuration(0, "base", values(1.0, 2.0, 3.0)).unwrap();
    model.new_configuration(1, "other", values(0.0, 0.0, 0.0)).unwrap();

    let column = model
        .derive_configuration("chrom", 0, DeriveFunc::Chromaticity, &[])
        .unwrap();

    assert_eq!(column, 1);
    assert_eq!(model.configuration(1).unwrap().values(), model.configuration(0).unwrap().values());
    assert_eq!(model.configuration(2).unwrap().name(), "other");
}

#[test]
fn test_interpolate_mean_inserted_after_rightmost() {
    let (_service, mut model) = setup();
    model.new_configuration(0, "a", values(1.0, 3.0, 10.0)).unwrap();
    model.new_configuration(1, "x", values(0.0, 0.0, 0.0)).unwrap();
    model.new_configuration(2, "b", values(2.0, 5.0, 20.0)).unwrap();

    let column = model.interpolate_selection("mid", &[2, 0]).unwrap();

    assert_eq!(column, 3);
    let mid = model.configuration(3).unwrap();
    assert_eq!(mid.value(QD), Some(&Value::Float(1.5)));
    assert_eq!(mid.value(QF), Some(&Value::Float(4.0)));
    assert_eq!(mid.value(DIPOLE), Some(&Value::Float(15.0)));
    assert!(mid.is_new());
}

#[test]
fn test_interpolate_rejects_non_numeric_before_mutation() {
    let service = Arc::new(MockConfigService::new());
    let mut model = build_model(&mixed_catalog(), service.clone());
    model.new_configuration(0, "a", values(1.0, 3.0, 10.0)).unwrap();
    model.new_configuration(1, "b", values(2.0, 5.0, 20.0)).unwrap();
    let observer = Arc::new(RecordingObserver::new());
    model.subscribe(observer.clone());

    let result = model.interpolate_configuration("mid", 0, 1);

    assert!(matches!(
        result,
        Err(ModelError::NonNumericInterpolation { ref pv, value_type: ValueType::Bool }) if pv == QF_STATE
    ));
    assert_eq!(model.column_count(), 2);
    assert!(observer.events().is_empty());
    assert!(service.calls().is_empty());
}

#[test]
fn test_interpolate_selection_requires_two_columns() {
    let (_service, mut model) = setup();
    model.new_configuration(0, "a", values(1.0, 3.0, 10.0)).unwrap();
    model.new_configuration(1, "b", values(2.0, 5.0, 20.0)).unwrap();

    assert!(matches!(
        model.interpolate_selection("mid", &[0, 1, 1]),
        Err(ModelError::InvalidColumnSelection(3))
    ));
    assert!(matches!(
        model.interpolate_selection("mid", &[]),
        Err(ModelError::InvalidColumnSelection(0))
    ));
}

// ==========================================
// 列管理
// ==========================================

#[test]
fn test_add_configuration_positions_and_defaults() {
    let service = Arc::new(MockConfigService::new());
    let mut model = build_model(&mixed_catalog(), service);
    let observer = Arc::new(RecordingObserver::new());
    model.subscribe(observer.clone());

    assert_eq!(model.add_configuration(5, None, None, None).unwrap(), 0);
    assert_eq!(model.add_configuration(0, None, Some("first"), None).unwrap(), 0);

    assert_eq!(model.header_data(0).unwrap(), "first*");
    assert_eq!(model.header_data(1).unwrap(), "new_configuration*");
    let row = model.row_of(QF_STATE).unwrap();
    assert_eq!(model.data(row, 1).unwrap(), "false");
    assert_eq!(model.data(model.row_of(QD).unwrap(), 1).unwrap(), "0.000000");

    assert_eq!(
        observer.events(),
        vec![
            ModelEvent::ColumnInserted { column: 0 },
            ModelEvent::ColumnInserted { column: 0 },
        ]
    );
}

#[test]
fn test_load_errors() {
    let (service, mut model) = setup();
    let other = service.seed("ring", "bo_config", &[]);

    assert!(matches!(model.load_configuration(0, "missing"), Err(ModelError::NotFound(_))));
    assert!(matches!(
        model.load_configuration(0, &other),
        Err(ModelError::ConfigTypeMismatch { .. })
    ));

    service.fail("get_pv_configuration_by_id", INTERNAL_ERROR_STATUS);
    let result = model.add_configuration(0, Some(&other), None, None);
    assert!(matches!(
        result,
        Err(ModelError::Service(ConfigServiceError::Status { code: 500, .. }))
    ));
    assert_eq!(model.column_count(), 0);
}

#[test]
fn test_missing_value_and_insert_on_save() {
    let (service, mut model) = setup();
    let id = service.seed("partial", CONFIG_TYPE, &[(QD, Value::Float(1.0)), (QF, Value::Float(2.0))]);
    model.load_configuration(0, &id).unwrap();
    let row = model.row_of(DIPOLE).unwrap();

    assert!(matches!(model.data(row, 0), Err(ModelError::MissingValue { .. })));

    model.set_data(row, 0, Value::Float(4.0)).unwrap();
    let action = model.history().undo_entries().next().cloned().unwrap();
    assert!(matches!(action, Action::SetValue { old: None, .. }));

    assert!(model.save_configuration(0).unwrap());
    assert_eq!(service.stored_value(&id, DIPOLE), Some(Value::Float(4.0)));
    assert_eq!(service.call_count("update_pv_configuration_item"), 0);
    assert_eq!(service.call_count("insert_pv_configuration_items"), 1);
}

#[test]
fn test_undo_restores_missing_value() {
    let (service, mut model) = setup();
    let id = service.seed("partial", CONFIG_TYPE, &[(QD, Value::Float(1.0)), (QF, Value::Float(2.0))]);
    model.load_configuration(0, &id).unwrap();
    let row = model.row_of(DIPOLE).unwrap();

    model.set_data(row, 0, Value::Float(4.0)).unwrap();
    assert_eq!(model.header_data(0).unwrap(), "partial*");
    assert!(model.undo().unwrap());

    assert!(matches!(model.data(row, 0), Err(ModelError::MissingValue { .. })));
    assert!(!model.configuration(0).unwrap().is_dirty());
    assert_eq!(model.header_data(0).unwrap(), "partial");

    assert!(!model.save_configuration(0).unwrap());
    assert_eq!(service.stored_value(&id, DIPOLE), None);
    assert_eq!(service.call_count("insert_pv_configuration_items"), 0);

    assert!(model.redo().unwrap());
    assert_eq!(model.value(row, 0).unwrap(), &Value::Float(4.0));
    assert!(model.configuration(0).unwrap().is_dirty());
}

#[test]
fn test_lookup_by_old_name_until_saved() {
    let (service, mut model) = setup();
    let id = service.seed("before", CONFIG_TYPE, &items(1.0, 2.0, 3.0));
    model.load_configuration(0, &id).unwrap();

    model.rename_configuration(0, "after").unwrap();
    assert_eq!(model.get_configuration_column("before"), Some(0));
    assert_eq!(model.get_configuration_column("after"), Some(0));
    assert_eq!(model.header_data(0).unwrap(), "after*");

    model.save_configuration(0).unwrap();
    assert_eq!(model.get_configuration_column("before"), None);
    assert_eq!(service.stored_name(&id).as_deref(), Some("after"));
}

// ==========================================
// 保存
// ==========================================

#[test]
fn test_save_notifies_and_clears_marker() {
    let (service, mut model) = setup();
    model.new_configuration(0, "fresh", values(1.0, 2.0, 3.0)).unwrap();
    let observer = Arc::new(RecordingObserver::new());
    model.subscribe(observer.clone());

    assert!(model.save_configuration(0).expect("Failed to save"));

    assert_eq!(
        observer.events(),
        vec![
            ModelEvent::ColumnRangeChanged { column: 0, first_row: 0, last_row: 2 },
            ModelEvent::HeaderChanged { column: 0 },
        ]
    );
    assert_eq!(model.header_data(0).unwrap(), "fresh");
    assert_eq!(service.record_count(), 1);

    observer.clear();
    assert!(!model.save_configuration(0).unwrap());
    assert_eq!(observer.events().len(), 2);
    assert_eq!(service.call_count("insert_pv_configuration"), 1);
}

#[test]
fn test_save_failure_reported() {
    let (service, mut model) = setup();
    model.new_configuration(0, "fresh", values(1.0, 2.0, 3.0)).unwrap();
    service.fail("insert_pv_configuration", INTERNAL_ERROR_STATUS);

    let result = model.save_configuration(0);

    assert!(matches!(result, Err(ModelError::Service(_))));
    assert!(model.configuration(0).unwrap().is_new());
    assert_eq!(model.header_data(0).unwrap(), "fresh*");
}

#[test]
fn test_list_and_delete_pass_through() {
    let (service, model) = setup();
    let a = service.seed("a", CONFIG_TYPE, &[]);
    service.seed("b", "bo_config", &[]);

    let listed = model.list_configurations(&ConfigurationFilter::by_type(CONFIG_TYPE)).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, a);

    model.delete_configuration(&a).unwrap();
    assert_eq!(service.record_count(), 1);
    assert!(matches!(
        model.delete_configuration(&a),
        Err(ModelError::Service(ref e)) if e.is_not_found()
    ));
}
