// ==========================================
// 评审分配系统 - 评审任务领域模型
// ==========================================
// 红线: 同一 (作品, 评委) 最多一个未取消任务
// 红线: 完成与取消互斥，且各自只能发生一次
// ==========================================

use crate::domain::types::{EntryId, JurorId, RoundId, TaskId, TaskState};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Task - 评审任务
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub round_id: RoundId,
    pub entry_id: EntryId,
    pub juror_id: JurorId,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
    pub cancelled_at: Option<NaiveDateTime>,
}

impl Task {
    pub fn state(&self) -> TaskState {
        if self.cancelled_at.is_some() {
            TaskState::Cancelled
        } else if self.completed_at.is_some() {
            TaskState::Completed
        } else {
            TaskState::Open
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == TaskState::Open
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled_at.is_some()
    }

    /// (作品, 评委) 配对
    pub fn pair(&self) -> ReviewPair {
        ReviewPair {
            entry_id: self.entry_id,
            juror_id: self.juror_id,
        }
    }
}

/// (作品, 评委) 配对；用于已完成评审历史与重复检查
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReviewPair {
    pub entry_id: EntryId,
    pub juror_id: JurorId,
}

impl ReviewPair {
    pub fn new(entry_id: EntryId, juror_id: JurorId) -> Self {
        Self { entry_id, juror_id }
    }
}

/// 轮次任务统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTaskCounts {
    pub total_round_entries: usize,
    pub total_tasks: usize,      // 未取消任务数
    pub total_open_tasks: usize, // 未完成且未取消
    pub percent_tasks_open: f64, // 保留 3 位小数
}
