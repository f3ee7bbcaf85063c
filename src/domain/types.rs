// ==========================================
// 评审分配系统 - 领域类型定义
// ==========================================
// 职责: 强类型 ID、轮次状态、任务状态、重分配方式
// ==========================================

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 强类型 ID
// ==========================================
// 数据库中均为 INTEGER 主键
macro_rules! define_id {
    ($name:ident, $label:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// 实体名（用于错误信息）
            pub const ENTITY: &'static str = $label;

            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $label, self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.0))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                i64::column_result(value).map(Self)
            }
        }
    };
}

define_id!(EntryId, "entry");
define_id!(JurorId, "juror");
define_id!(RoundId, "round");
define_id!(TaskId, "task");

// ==========================================
// 轮次状态 (Round Status)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundStatus {
    Paused,    // 暂停（新建轮次的初始状态）
    Active,    // 进行中
    Cancelled, // 已取消
    Finalized, // 已定稿
}

impl RoundStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            RoundStatus::Paused => "PAUSED",
            RoundStatus::Active => "ACTIVE",
            RoundStatus::Cancelled => "CANCELLED",
            RoundStatus::Finalized => "FINALIZED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PAUSED" => Some(RoundStatus::Paused),
            "ACTIVE" => Some(RoundStatus::Active),
            "CANCELLED" => Some(RoundStatus::Cancelled),
            "FINALIZED" => Some(RoundStatus::Finalized),
            _ => None,
        }
    }

    /// 是否允许调整评委名单并重分配
    pub fn allows_rebalance(&self) -> bool {
        matches!(self, RoundStatus::Paused | RoundStatus::Active)
    }
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 任务状态 (Task State)
// ==========================================
// 由 complete_date / cancel_date 推导，不单独落库
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Open,      // 待评审
    Completed, // 已完成
    Cancelled, // 已取消
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Open => write!(f, "OPEN"),
            TaskState::Completed => write!(f, "COMPLETED"),
            TaskState::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

// ==========================================
// 重分配方式 (Reassign Mode)
// ==========================================
// 配置键: assign.reassign_mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReassignMode {
    /// 直接改写未完成任务的评委
    #[default]
    InPlace,
    /// 取消原任务，再为新评委创建任务（保留原持有人记录）
    CancelAndRecreate,
}

impl ReassignMode {
    pub fn from_config_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "IN_PLACE" => Some(ReassignMode::InPlace),
            "CANCEL_AND_RECREATE" => Some(ReassignMode::CancelAndRecreate),
            _ => None,
        }
    }
}

impl fmt::Display for ReassignMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReassignMode::InPlace => write!(f, "IN_PLACE"),
            ReassignMode::CancelAndRecreate => write!(f, "CANCEL_AND_RECREATE"),
        }
    }
}
