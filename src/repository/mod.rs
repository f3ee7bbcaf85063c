// ==========================================
// 评审分配系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约束: 仓储借用调用方的连接或事务, 不自行提交
// ==========================================

pub mod error;
pub mod round_repo;
pub mod task_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use round_repo::RoundRepository;
pub use task_repo::TaskRepository;
