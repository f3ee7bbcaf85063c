// ==========================================
// 评审分配系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 评委与作品的评审任务分配 (初始分配 + 名单变更后重平衡)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 分配规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{EntryId, JurorId, ReassignMode, RoundId, RoundStatus, TaskId, TaskState};

// 领域实体
pub use domain::{Entry, Juror, ReviewPair, Round, RoundJuror, RoundTaskCounts, Task};

// 引擎
pub use engine::{
    AssignError, AssignResult, AssignmentEngine, EligibilityTracker, InitialAssignmentGenerator,
    RebalanceSummary, Rebalancer, WeightedSelector,
};

// 配置
pub use config::{AssignConfig, AssignConfigReader, ConfigManager};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 数据库版本
pub const DB_VERSION: &str = "v1";
