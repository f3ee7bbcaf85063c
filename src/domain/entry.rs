// ==========================================
// 评审分配系统 - 作品与评委
// ==========================================

use crate::domain::types::{EntryId, JurorId};
use serde::{Deserialize, Serialize};

/// 待评审作品（创建后不可变）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub entry_id: EntryId,
    pub name: String,
}

/// 评委
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Juror {
    pub juror_id: JurorId,
    pub username: String,
}
