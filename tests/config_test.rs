// ==========================================
// ConfigManager 集成测试
// ==========================================
// 测试目标: 验证分配配置读取与回退行为
// ==========================================


use jury_assign::config::{config_keys, AssignConfigReader, ConfigManager, DEFAULT_SELECTOR_EPSILON};
use jury_assign::domain::types::ReassignMode;
use jury_assign::engine::AssignmentEngine;
use rand::Rng;
use std::sync::Arc;
use test_helpers::{create_test_db, open_shared_connection, seed_round};

#[test]
fn test_config_manager_creation() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");

    let config_manager = ConfigManager::new(&db_path);
    assert!(
        config_manager.is_ok(),
        "ConfigManager should be created successfully"
    );
}

#[test]
fn test_defaults_when_unset() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    let config = config_manager.load_assign_config().unwrap();
    assert_eq!(config.selector_epsilon, DEFAULT_SELECTOR_EPSILON);
    assert_eq!(config.reassign_mode, ReassignMode::InPlace);
    assert_eq!(config.rng_seed, None);
}

#[test]
fn test_configured_values_are_read() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    config_manager
        .set_global_config_value(config_keys::SELECTOR_EPSILON, "0.05")
        .unwrap();
    config_manager
        .set_global_config_value(config_keys::REASSIGN_MODE, "cancel_and_recreate")
        .unwrap();
    config_manager
        .set_global_config_value(config_keys::RNG_SEED, "12345")
        .unwrap();

    assert_eq!(config_manager.get_selector_epsilon().unwrap(), 0.05);
    assert_eq!(
        config_manager.get_reassign_mode().unwrap(),
        ReassignMode::CancelAndRecreate
    );
    assert_eq!(config_manager.get_rng_seed().unwrap(), Some(12345));
}

#[test]
fn test_invalid_values_fall_back() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    config_manager
        .set_global_config_value(config_keys::SELECTOR_EPSILON, "-1")
        .unwrap();
    config_manager
        .set_global_config_value(config_keys::REASSIGN_MODE, "SOMETIMES")
        .unwrap();
    config_manager
        .set_global_config_value(config_keys::RNG_SEED, "not-a-number")
        .unwrap();

    let config = config_manager.load_assign_config().unwrap();
    assert_eq!(config.selector_epsilon, DEFAULT_SELECTOR_EPSILON);
    assert_eq!(config.reassign_mode, ReassignMode::InPlace);
    assert_eq!(config.rng_seed, None);
}

#[test]
fn test_set_overwrites_existing_value() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    config_manager
        .set_global_config_value(config_keys::RNG_SEED, "1")
        .unwrap();
    config_manager
        .set_global_config_value(config_keys::RNG_SEED, "2")
        .unwrap();

    assert_eq!(
        config_manager
            .get_global_config_value(config_keys::RNG_SEED)
            .unwrap()
            .as_deref(),
        Some("2")
    );
}

#[test]
fn test_config_snapshot_is_json() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    config_manager
        .set_global_config_value(config_keys::REASSIGN_MODE, "IN_PLACE")
        .unwrap();

    let snapshot = config_manager.get_config_snapshot().unwrap();
    let value: serde_json::Value = serde_json::from_str(&snapshot).unwrap();
    assert_eq!(value[config_keys::REASSIGN_MODE], "IN_PLACE");
}

#[test]
fn test_engine_uses_shared_connection_config() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_shared_connection(&db_path);
    let fixture = {
        let guard = conn.lock().unwrap();
        seed_round(&guard, 1, 2, 4).unwrap()
    };

    let config_manager =
        Arc::new(ConfigManager::from_connection(conn.clone()).expect("Failed to create ConfigManager"));
    config_manager
        .set_global_config_value(config_keys::RNG_SEED, "77")
        .unwrap();

    let engine = AssignmentEngine::new(conn.clone(), config_manager);
    let mut first = engine.make_rng().unwrap();
    let mut second = engine.make_rng().unwrap();
    assert_eq!(first.random::<u64>(), second.random::<u64>());

    let tasks = engine.initial_assign(fixture.round_id).unwrap();
    assert_eq!(tasks.len(), 4);
}
