// ==========================================
// 评审分配系统 - 分配引擎错误类型
// ==========================================
// 红线: 任何错误都意味着整个工作单元回滚，不存在部分提交
// ==========================================

use crate::domain::types::{EntryId, RoundId};
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 分配引擎错误类型
#[derive(Error, Debug)]
pub enum AssignError {
    /// 前置条件不满足（可由调用方修正后重试）
    #[error("无效操作: {0}")]
    InvalidAction(String),

    /// 初始分配: 评委供给序列先于需求序列耗尽
    #[error("调度不可行: 第 {position} 个需求位置没有可用评委 (round={round_id})")]
    SupplyExhausted { round_id: RoundId, position: usize },

    /// 重平衡: 某作品已无可接收的评委
    #[error("调度不可行: {entry_id} 没有可分配的评委")]
    NoEligibleJuror { entry_id: EntryId },

    /// 加权选择: 候选集合为空
    #[error("调度不可行: 候选评委集合为空")]
    EmptyCandidateSet,

    /// 防御性不变量检查失败
    #[error("内部错误: {0}")]
    Internal(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl AssignError {
    /// 是否属于调度不可行（致命，不重试）
    pub fn is_scheduling_impossible(&self) -> bool {
        matches!(
            self,
            AssignError::SupplyExhausted { .. }
                | AssignError::NoEligibleJuror { .. }
                | AssignError::EmptyCandidateSet
        )
    }

    /// 是否值得调用方稍后重试（仅存储层锁竞争）
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AssignError::Repository(RepositoryError::Busy(_))
                | AssignError::Repository(RepositoryError::LockError(_))
        )
    }
}

/// Result 类型别名
pub type AssignResult<T> = Result<T, AssignError>;
