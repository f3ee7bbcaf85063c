// ==========================================
// 评审分配系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 提供建表入口，供测试与上层系统初始化使用
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
///
/// 其他进程持有写锁时，IMMEDIATE 事务在此时间内排队等待。
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_scope (
    scope_id TEXT PRIMARY KEY,
    scope_type TEXT NOT NULL,
    scope_key TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(scope_type, scope_key)
);

INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
VALUES ('global', 'GLOBAL', 'global');

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS jurors (
    juror_id INTEGER PRIMARY KEY,
    username TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS entries (
    entry_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS rounds (
    round_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    quorum INTEGER NOT NULL CHECK (quorum >= 1),
    status TEXT NOT NULL,
    open_date TEXT,
    close_date TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS round_jurors (
    round_id INTEGER NOT NULL REFERENCES rounds(round_id),
    juror_id INTEGER NOT NULL REFERENCES jurors(juror_id),
    is_active INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (round_id, juror_id)
);

CREATE TABLE IF NOT EXISTS round_entries (
    round_id INTEGER NOT NULL REFERENCES rounds(round_id),
    entry_id INTEGER NOT NULL REFERENCES entries(entry_id),
    dq_reason TEXT,
    PRIMARY KEY (round_id, entry_id)
);

CREATE TABLE IF NOT EXISTS tasks (
    task_id INTEGER PRIMARY KEY AUTOINCREMENT,
    round_id INTEGER NOT NULL REFERENCES rounds(round_id),
    entry_id INTEGER NOT NULL REFERENCES entries(entry_id),
    juror_id INTEGER NOT NULL REFERENCES jurors(juror_id),
    create_date TEXT NOT NULL,
    complete_date TEXT,
    cancel_date TEXT,
    CHECK (complete_date IS NULL OR cancel_date IS NULL)
);

CREATE INDEX IF NOT EXISTS idx_tasks_round ON tasks(round_id);
CREATE INDEX IF NOT EXISTS idx_tasks_round_juror ON tasks(round_id, juror_id);

CREATE TABLE IF NOT EXISTS ratings (
    rating_id INTEGER PRIMARY KEY AUTOINCREMENT,
    round_id INTEGER NOT NULL REFERENCES rounds(round_id),
    entry_id INTEGER NOT NULL REFERENCES entries(entry_id),
    juror_id INTEGER NOT NULL REFERENCES jurors(juror_id),
    task_id INTEGER NOT NULL REFERENCES tasks(task_id),
    value REAL NOT NULL,
    create_date TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ratings_round ON ratings(round_id);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表（幂等），并登记当前 schema_version
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), None);

        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_task_cannot_be_both_completed_and_cancelled() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        ensure_schema(&conn).unwrap();

        conn.execute_batch(
            r#"
            INSERT INTO jurors (juror_id, username) VALUES (1, 'j1');
            INSERT INTO entries (entry_id, name) VALUES (1, 'e1');
            INSERT INTO rounds (round_id, name, quorum, status, created_at)
            VALUES (1, 'r1', 1, 'PAUSED', '2026-01-01 00:00:00');
            "#,
        )
        .unwrap();

        let result = conn.execute(
            r#"INSERT INTO tasks (round_id, entry_id, juror_id, create_date, complete_date, cancel_date)
               VALUES (1, 1, 1, '2026-01-01 00:00:00', '2026-01-02 00:00:00', '2026-01-02 00:00:00')"#,
            [],
        );
        assert!(result.is_err());
    }
}
