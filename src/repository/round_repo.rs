// ==========================================
// 评审分配系统 - 轮次数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 约束: 借用调用方的连接/事务，由调用方决定提交边界
// ==========================================

use crate::domain::entry::{Entry, Juror};
use crate::domain::round::{Round, RoundJuror};
use crate::domain::types::{EntryId, JurorId, RoundId, RoundStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const ROUND_SELECT_SQL: &str = r#"
    SELECT round_id, name, quorum, status, open_date, close_date, created_at
    FROM rounds
"#;

// ==========================================
// RoundRepository - 轮次仓储
// ==========================================
/// 轮次仓储
/// 职责: rounds / round_jurors / round_entries 以及评委、作品主数据的读写
pub struct RoundRepository<'c> {
    conn: &'c Connection,
}

impl<'c> RoundRepository<'c> {
    /// 基于连接（或事务）创建仓储
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    // ==========================================
    // 主数据
    // ==========================================

    /// 创建评委
    pub fn create_juror(&self, username: &str) -> RepositoryResult<JurorId> {
        self.conn
            .execute("INSERT INTO jurors (username) VALUES (?1)", params![username])?;
        Ok(JurorId(self.conn.last_insert_rowid()))
    }

    /// 创建作品
    pub fn create_entry(&self, name: &str) -> RepositoryResult<EntryId> {
        self.conn
            .execute("INSERT INTO entries (name) VALUES (?1)", params![name])?;
        Ok(EntryId(self.conn.last_insert_rowid()))
    }

    /// 按 ID 批量查询评委（不存在的 ID 不返回）
    pub fn find_jurors(&self, juror_ids: &[JurorId]) -> RepositoryResult<Vec<Juror>> {
        if juror_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; juror_ids.len()].join(", ");
        let sql = format!(
            "SELECT juror_id, username FROM jurors WHERE juror_id IN ({}) ORDER BY juror_id",
            placeholders
        );
        let values: Vec<Value> = juror_ids.iter().map(|id| Value::Integer(id.0)).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let jurors = stmt
            .query_map(params_from_iter(values), map_juror_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(jurors)
    }

    // ==========================================
    // 轮次
    // ==========================================

    /// 创建轮次（初始状态 PAUSED）
    pub fn create_round(&self, name: &str, quorum: u32) -> RepositoryResult<RoundId> {
        if quorum == 0 {
            return Err(RepositoryError::FieldValueError {
                field: "quorum".to_string(),
                message: "quorum 必须 >= 1".to_string(),
            });
        }

        self.conn.execute(
            r#"INSERT INTO rounds (name, quorum, status, created_at)
               VALUES (?1, ?2, ?3, ?4)"#,
            params![
                name,
                quorum,
                RoundStatus::Paused.to_db_str(),
                Utc::now().naive_utc(),
            ],
        )?;
        Ok(RoundId(self.conn.last_insert_rowid()))
    }

    /// 按主键查询
    pub fn find_round(&self, round_id: RoundId) -> RepositoryResult<Option<Round>> {
        let sql = format!("{} WHERE round_id = ?1", ROUND_SELECT_SQL);
        let round = self
            .conn
            .query_row(&sql, params![round_id], map_round_row)
            .optional()?;
        Ok(round)
    }

    /// 按主键查询，不存在时返回 NotFound
    pub fn get_round(&self, round_id: RoundId) -> RepositoryResult<Round> {
        self.find_round(round_id)?
            .ok_or_else(|| RepositoryError::not_found("Round", round_id))
    }

    /// 更新轮次状态
    pub fn update_status(&self, round_id: RoundId, status: RoundStatus) -> RepositoryResult<()> {
        let affected = self.conn.execute(
            "UPDATE rounds SET status = ?2 WHERE round_id = ?1",
            params![round_id, status.to_db_str()],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Round", round_id));
        }
        Ok(())
    }

    /// 标记轮次已开放（写入 open_date 并置为 ACTIVE）
    pub fn mark_opened(&self, round_id: RoundId, open_date: NaiveDateTime) -> RepositoryResult<()> {
        let affected = self.conn.execute(
            r#"UPDATE rounds SET open_date = ?2, status = ?3
               WHERE round_id = ?1 AND open_date IS NULL"#,
            params![round_id, open_date, RoundStatus::Active.to_db_str()],
        )?;
        if affected == 0 {
            return Err(RepositoryError::InvalidStateTransition {
                from: "OPENED".to_string(),
                to: RoundStatus::Active.to_string(),
            });
        }
        Ok(())
    }

    // ==========================================
    // 评委名单
    // ==========================================

    /// 加入评委（已存在则重新激活）
    pub fn add_round_juror(&self, round_id: RoundId, juror_id: JurorId) -> RepositoryResult<()> {
        self.conn.execute(
            r#"INSERT INTO round_jurors (round_id, juror_id, is_active) VALUES (?1, ?2, 1)
               ON CONFLICT(round_id, juror_id) DO UPDATE SET is_active = 1"#,
            params![round_id, juror_id],
        )?;
        Ok(())
    }

    /// 以新名单覆盖当前激活名单
    ///
    /// - 名单内: 缺失的补录，已有的置 is_active=1
    /// - 名单外: 保留记录，置 is_active=0
    pub fn set_active_roster(&self, round_id: RoundId, roster: &[JurorId]) -> RepositoryResult<()> {
        self.conn.execute(
            "UPDATE round_jurors SET is_active = 0 WHERE round_id = ?1",
            params![round_id],
        )?;
        for juror_id in roster {
            self.add_round_juror(round_id, *juror_id)?;
        }
        Ok(())
    }

    /// 查询轮次全部评委记录（含已停用）
    pub fn list_round_jurors(&self, round_id: RoundId) -> RepositoryResult<Vec<RoundJuror>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT round_id, juror_id, is_active
               FROM round_jurors
               WHERE round_id = ?1
               ORDER BY juror_id"#,
        )?;
        let jurors = stmt
            .query_map(params![round_id], |row| {
                Ok(RoundJuror {
                    round_id: row.get(0)?,
                    juror_id: row.get(1)?,
                    is_active: row.get::<_, i64>(2)? != 0,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(jurors)
    }

    /// 查询轮次激活评委
    pub fn list_active_jurors(&self, round_id: RoundId) -> RepositoryResult<Vec<Juror>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT j.juror_id, j.username
               FROM round_jurors rj
               JOIN jurors j ON j.juror_id = rj.juror_id
               WHERE rj.round_id = ?1 AND rj.is_active = 1
               ORDER BY j.juror_id"#,
        )?;
        let jurors = stmt
            .query_map(params![round_id], map_juror_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(jurors)
    }

    // ==========================================
    // 轮次作品
    // ==========================================

    /// 作品加入轮次（重复加入忽略）
    pub fn add_round_entry(&self, round_id: RoundId, entry_id: EntryId) -> RepositoryResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO round_entries (round_id, entry_id) VALUES (?1, ?2)",
            params![round_id, entry_id],
        )?;
        Ok(())
    }

    /// 取消作品资格
    pub fn disqualify_entry(
        &self,
        round_id: RoundId,
        entry_id: EntryId,
        reason: &str,
    ) -> RepositoryResult<()> {
        let affected = self.conn.execute(
            "UPDATE round_entries SET dq_reason = ?3 WHERE round_id = ?1 AND entry_id = ?2",
            params![round_id, entry_id, reason],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("RoundEntry", entry_id));
        }
        Ok(())
    }

    /// 查询轮次有效作品（排除已取消资格）
    pub fn list_entries(&self, round_id: RoundId) -> RepositoryResult<Vec<Entry>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT e.entry_id, e.name
               FROM round_entries re
               JOIN entries e ON e.entry_id = re.entry_id
               WHERE re.round_id = ?1 AND re.dq_reason IS NULL
               ORDER BY e.entry_id"#,
        )?;
        let entries = stmt
            .query_map(params![round_id], |row| {
                Ok(Entry {
                    entry_id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// 轮次作品总数（含已取消资格）
    pub fn count_round_entries(&self, round_id: RoundId) -> RepositoryResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM round_entries WHERE round_id = ?1",
            params![round_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn map_juror_row(row: &Row<'_>) -> rusqlite::Result<Juror> {
    Ok(Juror {
        juror_id: row.get(0)?,
        username: row.get(1)?,
    })
}

fn map_round_row(row: &Row<'_>) -> rusqlite::Result<Round> {
    let status_raw: String = row.get(3)?;
    let status = RoundStatus::from_db_str(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("未知的轮次状态: {}", status_raw).into(),
        )
    })?;

    Ok(Round {
        round_id: row.get(0)?,
        name: row.get(1)?,
        quorum: row.get(2)?,
        status,
        open_date: row.get(4)?,
        close_date: row.get(5)?,
        created_at: row.get(6)?,
    })
}
