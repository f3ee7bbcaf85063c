// ==========================================
// 评审分配系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体与类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod entry;
pub mod round;
pub mod task;
pub mod types;

// 重导出核心类型
pub use entry::{Entry, Juror};
pub use round::{Round, RoundJuror};
pub use task::{ReviewPair, RoundTaskCounts, Task};
pub use types::{EntryId, JurorId, ReassignMode, RoundId, RoundStatus, TaskId, TaskState};
