// ==========================================
// 评审分配系统 - 分配配置读取 Trait
// ==========================================
// 职责: 定义分配引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::ReassignMode;
use crate::repository::error::RepositoryResult;
use serde::{Deserialize, Serialize};

/// 权重下限默认值
pub const DEFAULT_SELECTOR_EPSILON: f64 = 0.001;

// ==========================================
// AssignConfig - 单次调用使用的配置快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignConfig {
    pub selector_epsilon: f64,
    pub reassign_mode: ReassignMode,
    pub rng_seed: Option<u64>,
}

impl Default for AssignConfig {
    fn default() -> Self {
        Self {
            selector_epsilon: DEFAULT_SELECTOR_EPSILON,
            reassign_mode: ReassignMode::default(),
            rng_seed: None,
        }
    }
}

// ==========================================
// AssignConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
pub trait AssignConfigReader: Send + Sync {
    /// 加权选择的权重下限
    ///
    /// # 默认值
    /// - 0.001（必须 > 0）
    fn get_selector_epsilon(&self) -> RepositoryResult<f64>;

    /// 重平衡时的改派方式
    ///
    /// # 默认值
    /// - IN_PLACE
    fn get_reassign_mode(&self) -> RepositoryResult<ReassignMode>;

    /// 随机数种子（未配置时使用系统熵）
    fn get_rng_seed(&self) -> RepositoryResult<Option<u64>>;

    /// 一次性读取全部分配配置
    fn load_assign_config(&self) -> RepositoryResult<AssignConfig> {
        Ok(AssignConfig {
            selector_epsilon: self.get_selector_epsilon()?,
            reassign_mode: self.get_reassign_mode()?,
            rng_seed: self.get_rng_seed()?,
        })
    }
}

/// 固定配置（无数据库场景、测试场景）
impl AssignConfigReader for AssignConfig {
    fn get_selector_epsilon(&self) -> RepositoryResult<f64> {
        Ok(self.selector_epsilon)
    }

    fn get_reassign_mode(&self) -> RepositoryResult<ReassignMode> {
        Ok(self.reassign_mode)
    }

    fn get_rng_seed(&self) -> RepositoryResult<Option<u64>> {
        Ok(self.rng_seed)
    }
}
