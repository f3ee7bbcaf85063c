// ==========================================
// 评审分配系统 - 评审任务仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 状态迁移只作用于未完成且未取消的任务（SQL 条件守卫）
// ==========================================

use crate::domain::task::{ReviewPair, RoundTaskCounts, Task};
use crate::domain::types::{EntryId, JurorId, RoundId, TaskId};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;

const TASK_SELECT_SQL: &str = r#"
    SELECT task_id, round_id, entry_id, juror_id, create_date, complete_date, cancel_date
    FROM tasks
"#;

const OPEN_GUARD_SQL: &str = "complete_date IS NULL AND cancel_date IS NULL";

// ==========================================
// TaskRepository - 评审任务仓储
// ==========================================
pub struct TaskRepository<'c> {
    conn: &'c Connection,
}

impl<'c> TaskRepository<'c> {
    /// 基于连接（或事务）创建仓储
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 按主键查询
    pub fn find_task(&self, task_id: TaskId) -> RepositoryResult<Option<Task>> {
        let sql = format!("{} WHERE task_id = ?1", TASK_SELECT_SQL);
        let task = self
            .conn
            .query_row(&sql, params![task_id], map_task_row)
            .optional()?;
        Ok(task)
    }

    /// 按主键查询，不存在时返回 NotFound
    pub fn get_task(&self, task_id: TaskId) -> RepositoryResult<Task> {
        self.find_task(task_id)?
            .ok_or_else(|| RepositoryError::not_found("Task", task_id))
    }

    /// 查询轮次全部任务（含已完成/已取消），按创建顺序
    pub fn list_tasks(&self, round_id: RoundId) -> RepositoryResult<Vec<Task>> {
        let sql = format!(
            "{} WHERE round_id = ?1 ORDER BY create_date ASC, task_id ASC",
            TASK_SELECT_SQL
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(params![round_id], map_task_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// 查询轮次已完成评审的 (作品, 评委) 配对
    ///
    /// 来源: ratings 历史 + 已完成任务；与评委当前是否在名单内无关
    pub fn list_completed_review_pairs(
        &self,
        round_id: RoundId,
    ) -> RepositoryResult<HashSet<ReviewPair>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT entry_id, juror_id FROM ratings WHERE round_id = ?1
               UNION
               SELECT entry_id, juror_id FROM tasks
               WHERE round_id = ?1 AND complete_date IS NOT NULL"#,
        )?;
        let pairs = stmt
            .query_map(params![round_id], |row| {
                Ok(ReviewPair::new(row.get(0)?, row.get(1)?))
            })?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(pairs)
    }

    /// 轮次任务统计
    pub fn round_task_counts(&self, round_id: RoundId) -> RepositoryResult<RoundTaskCounts> {
        let (total_round_entries, total_tasks, total_open_tasks): (i64, i64, i64) =
            self.conn.query_row(
                r#"SELECT
                       (SELECT COUNT(*) FROM round_entries WHERE round_id = ?1),
                       (SELECT COUNT(*) FROM tasks
                        WHERE round_id = ?1 AND cancel_date IS NULL),
                       (SELECT COUNT(*) FROM tasks
                        WHERE round_id = ?1 AND cancel_date IS NULL AND complete_date IS NULL)"#,
                params![round_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

        let percent_tasks_open = if total_tasks > 0 {
            let raw = 100.0 * total_open_tasks as f64 / total_tasks as f64;
            (raw * 1000.0).round() / 1000.0
        } else {
            0.0
        };

        Ok(RoundTaskCounts {
            total_round_entries: total_round_entries as usize,
            total_tasks: total_tasks as usize,
            total_open_tasks: total_open_tasks as usize,
            percent_tasks_open,
        })
    }

    // ==========================================
    // 写入
    // ==========================================

    /// 创建任务
    pub fn create_task(
        &self,
        round_id: RoundId,
        entry_id: EntryId,
        juror_id: JurorId,
        created_at: NaiveDateTime,
    ) -> RepositoryResult<Task> {
        self.conn.execute(
            r#"INSERT INTO tasks (round_id, entry_id, juror_id, create_date)
               VALUES (?1, ?2, ?3, ?4)"#,
            params![round_id, entry_id, juror_id, created_at],
        )?;

        Ok(Task {
            task_id: TaskId(self.conn.last_insert_rowid()),
            round_id,
            entry_id,
            juror_id,
            created_at,
            completed_at: None,
            cancelled_at: None,
        })
    }

    /// 取消任务（仅未完成且未取消的任务）
    pub fn cancel_task(&self, task_id: TaskId, cancelled_at: NaiveDateTime) -> RepositoryResult<()> {
        let sql = format!(
            "UPDATE tasks SET cancel_date = ?2 WHERE task_id = ?1 AND {}",
            OPEN_GUARD_SQL
        );
        let affected = self.conn.execute(&sql, params![task_id, cancelled_at])?;
        self.ensure_transition(task_id, affected, "CANCELLED")
    }

    /// 将未完成任务改派给新评委
    pub fn reassign_task(&self, task_id: TaskId, new_juror: JurorId) -> RepositoryResult<()> {
        let sql = format!(
            "UPDATE tasks SET juror_id = ?2 WHERE task_id = ?1 AND {}",
            OPEN_GUARD_SQL
        );
        let affected = self.conn.execute(&sql, params![task_id, new_juror])?;
        self.ensure_transition(task_id, affected, "REASSIGNED")
    }

    /// 提交评审: 写入评分记录并标记任务完成
    ///
    /// 说明: 评审提交路径属于外部系统，此处提供最小实现
    pub fn complete_task(
        &self,
        task_id: TaskId,
        value: f64,
        completed_at: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let sql = format!(
            "UPDATE tasks SET complete_date = ?2 WHERE task_id = ?1 AND {}",
            OPEN_GUARD_SQL
        );
        let affected = self.conn.execute(&sql, params![task_id, completed_at])?;
        self.ensure_transition(task_id, affected, "COMPLETED")?;

        let task = self.get_task(task_id)?;
        self.conn.execute(
            r#"INSERT INTO ratings (round_id, entry_id, juror_id, task_id, value, create_date)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                task.round_id,
                task.entry_id,
                task.juror_id,
                task.task_id,
                value,
                completed_at,
            ],
        )?;
        Ok(())
    }

    /// 守卫未命中时区分“不存在”与“状态不允许”
    fn ensure_transition(&self, task_id: TaskId, affected: usize, to: &str) -> RepositoryResult<()> {
        if affected > 0 {
            return Ok(());
        }
        let task = self.get_task(task_id)?;
        Err(RepositoryError::InvalidStateTransition {
            from: task.state().to_string(),
            to: to.to_string(),
        })
    }
}

fn map_task_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        task_id: row.get(0)?,
        round_id: row.get(1)?,
        entry_id: row.get(2)?,
        juror_id: row.get(3)?,
        created_at: row.get(4)?,
        completed_at: row.get(5)?,
        cancelled_at: row.get(6)?,
    })
}
