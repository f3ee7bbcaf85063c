// ==========================================
// 评审分配系统 - 配置层
// ==========================================
// 职责: 分配引擎配置读取
// 存储: config_kv 表
// ==========================================

pub mod assign_config_trait;
pub mod config_manager;

// 重导出核心配置管理器
pub use assign_config_trait::{AssignConfig, AssignConfigReader, DEFAULT_SELECTOR_EPSILON};
pub use config_manager::{config_keys, ConfigManager};
