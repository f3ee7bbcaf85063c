// ==========================================
// 评审分配系统 - 轮次领域模型
// ==========================================

use crate::domain::types::{JurorId, RoundId, RoundStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Round - 评审轮次
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub round_id: RoundId,
    pub name: String,
    pub quorum: u32,                       // 每个作品需要的独立评审数
    pub status: RoundStatus,
    pub open_date: Option<NaiveDateTime>,  // 首次分配时间
    pub close_date: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl Round {
    /// 是否已经完成过初始分配
    pub fn is_opened(&self) -> bool {
        self.open_date.is_some()
    }
}

// ==========================================
// RoundJuror - 轮次评委名单
// ==========================================
// 评委被移出时只置 is_active=false，不删除记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundJuror {
    pub round_id: RoundId,
    pub juror_id: JurorId,
    pub is_active: bool,
}
