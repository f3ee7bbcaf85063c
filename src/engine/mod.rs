// ==========================================
// 评审分配系统 - 引擎层
// ==========================================
// 职责: 评审任务的分配规则, 不拼 SQL
// 红线: 已完成评审永久排除, 任何失败整体回滚
// ==========================================

pub mod assignment;
pub mod eligibility;
pub mod error;
pub mod initial_assign;
pub mod rebalance;
pub mod selector;

// 重导出核心引擎
pub use assignment::AssignmentEngine;
pub use eligibility::EligibilityTracker;
pub use error::{AssignError, AssignResult};
pub use initial_assign::InitialAssignmentGenerator;
pub use rebalance::{RebalancePlan, RebalanceSummary, Rebalancer, TaskMove};
pub use selector::WeightedSelector;
