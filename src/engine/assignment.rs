// ==========================================
// 评审分配系统 - 分配引擎门面
// ==========================================
// 职责: 以单个数据库事务为单位执行初始分配与重平衡
// 红线: 任一步骤失败整体回滚, 不存在部分提交
// 红线: 同一轮次的写操作通过 IMMEDIATE 事务串行化
// ==========================================
// 流程:
//   InitialAssign: 校验状态 -> 生成配对 -> 写任务 -> 标记开放 -> 提交
//   Rebalance:     校验状态/名单 -> 计算方案 -> 改派 -> 更新名单 -> 提交
// ==========================================

use crate::config::assign_config_trait::AssignConfigReader;
use crate::domain::task::{RoundTaskCounts, Task};
use crate::domain::types::{JurorId, ReassignMode, RoundId, RoundStatus};
use crate::engine::error::{AssignError, AssignResult};
use crate::engine::initial_assign::InitialAssignmentGenerator;
use crate::engine::rebalance::{RebalancePlan, RebalanceSummary, Rebalancer};
use crate::engine::selector::WeightedSelector;
use crate::repository::error::RepositoryError;
use crate::repository::round_repo::RoundRepository;
use crate::repository::task_repo::TaskRepository;
use chrono::{NaiveDateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::instrument;

// ==========================================
// AssignmentEngine - 分配引擎
// ==========================================
pub struct AssignmentEngine<C>
where
    C: AssignConfigReader,
{
    conn: Arc<Mutex<Connection>>,
    config: Arc<C>,
    generator: InitialAssignmentGenerator,
}

impl<C> AssignmentEngine<C>
where
    C: AssignConfigReader,
{
    /// 创建分配引擎
    ///
    /// # 参数
    /// - conn: 共享数据库连接
    /// - config: 分配配置读取器
    pub fn new(conn: Arc<Mutex<Connection>>, config: Arc<C>) -> Self {
        Self {
            conn,
            config,
            generator: InitialAssignmentGenerator::new(),
        }
    }

    fn get_conn(&self) -> AssignResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()).into())
    }

    fn begin_immediate(conn: &mut Connection) -> AssignResult<Transaction<'_>> {
        conn.transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::from(e).into())
    }

    /// 按配置构造随机源: 配置了种子则可复现, 否则使用系统熵
    pub fn make_rng(&self) -> AssignResult<StdRng> {
        let rng = match self.config.get_rng_seed()? {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(rng)
    }

    // ==========================================
    // InitialAssign
    // ==========================================

    /// 首次开放轮次并生成全部评审任务（随机源取自配置）
    pub fn initial_assign(&self, round_id: RoundId) -> AssignResult<Vec<Task>> {
        let mut rng = self.make_rng()?;
        self.initial_assign_with_rng(round_id, &mut rng)
    }

    /// 首次开放轮次并生成全部评审任务
    ///
    /// # 前置条件
    /// - 轮次存在, 状态为 PAUSED 且从未开放
    /// - 激活评委数 >= quorum
    ///
    /// # 返回
    /// - 新建的任务列表
    #[instrument(skip(self, rng), fields(round_id = %round_id))]
    pub fn initial_assign_with_rng<R>(
        &self,
        round_id: RoundId,
        rng: &mut R,
    ) -> AssignResult<Vec<Task>>
    where
        R: Rng + ?Sized,
    {
        let mut conn = self.get_conn()?;
        let tx = Self::begin_immediate(&mut conn)?;

        let tasks = {
            let round_repo = RoundRepository::new(&tx);
            let task_repo = TaskRepository::new(&tx);

            // === 步骤 1: 状态校验 ===
            let round = round_repo.get_round(round_id)?;
            if round.status != RoundStatus::Paused || round.is_opened() {
                return Err(reject(format!(
                    "{} 当前状态为 {}{}, 不能执行初始分配",
                    round_id,
                    round.status,
                    if round.is_opened() { " (已开放过)" } else { "" }
                )));
            }

            // === 步骤 2: 生成配对 ===
            let jurors: Vec<JurorId> = round_repo
                .list_active_jurors(round_id)?
                .into_iter()
                .map(|j| j.juror_id)
                .collect();
            let entries: Vec<_> = round_repo
                .list_entries(round_id)?
                .into_iter()
                .map(|e| e.entry_id)
                .collect();

            let pairs = self
                .generator
                .generate(round_id, round.quorum, &jurors, &entries, rng)?;

            // === 步骤 3: 写入任务并开放轮次 ===
            let now = Utc::now().naive_utc();
            let mut tasks = Vec::with_capacity(pairs.len());
            for pair in &pairs {
                tasks.push(task_repo.create_task(round_id, pair.entry_id, pair.juror_id, now)?);
            }
            round_repo.mark_opened(round_id, now)?;
            tasks
        };

        tx.commit().map_err(RepositoryError::from)?;

        tracing::info!(
            round_id = %round_id,
            tasks = tasks.len(),
            "初始分配完成, 轮次已开放"
        );
        Ok(tasks)
    }

    // ==========================================
    // Rebalance
    // ==========================================

    /// 以新评委名单重新分配未完成任务（随机源取自配置）
    pub fn rebalance(
        &self,
        round_id: RoundId,
        new_jurors: &[JurorId],
    ) -> AssignResult<RebalanceSummary> {
        let mut rng = self.make_rng()?;
        self.rebalance_with_rng(round_id, new_jurors, &mut rng)
    }

    /// 以新评委名单重新分配未完成任务
    ///
    /// # 前置条件
    /// - 轮次存在, 状态为 PAUSED 或 ACTIVE
    /// - 新名单非空, 评委均存在, 人数 >= quorum, 且与当前激活名单不同
    ///
    /// # 说明
    /// - 名单中的重复评委会被去重
    /// - 已完成任务保持不动; 已评审过某作品的评委不会再收到该作品
    #[instrument(skip(self, new_jurors, rng), fields(
        round_id = %round_id,
        new_jurors_count = new_jurors.len()
    ))]
    pub fn rebalance_with_rng<R>(
        &self,
        round_id: RoundId,
        new_jurors: &[JurorId],
        rng: &mut R,
    ) -> AssignResult<RebalanceSummary>
    where
        R: Rng + ?Sized,
    {
        // 配置读取在加锁之前完成（配置管理器可能共享同一连接）
        let config = self.config.load_assign_config()?;
        let selector = WeightedSelector::new(config.selector_epsilon)?;
        let roster = dedupe_roster(new_jurors);

        let mut conn = self.get_conn()?;
        let tx = Self::begin_immediate(&mut conn)?;

        let summary = {
            let round_repo = RoundRepository::new(&tx);
            let task_repo = TaskRepository::new(&tx);

            // === 步骤 1: 状态与名单校验 ===
            let round = round_repo.get_round(round_id)?;
            if !round.status.allows_rebalance() {
                return Err(reject(format!(
                    "{} 当前状态为 {}, 不能重平衡",
                    round_id, round.status
                )));
            }
            if roster.is_empty() {
                return Err(reject(
                    "新评委名单不能为空".to_string(),
                ));
            }

            let known = round_repo.find_jurors(&roster)?;
            if known.len() != roster.len() {
                let known_ids: HashSet<JurorId> = known.iter().map(|j| j.juror_id).collect();
                let unknown: Vec<String> = roster
                    .iter()
                    .filter(|id| !known_ids.contains(id))
                    .map(|id| id.to_string())
                    .collect();
                return Err(reject(format!(
                    "新名单包含不存在的评委: {}",
                    unknown.join(", ")
                )));
            }

            if roster.len() < round.quorum as usize {
                return Err(reject(format!(
                    "{} 需要至少 {} 位评委, 新名单只有 {} 位",
                    round_id,
                    round.quorum,
                    roster.len()
                )));
            }

            let mut current: Vec<JurorId> = round_repo
                .list_active_jurors(round_id)?
                .into_iter()
                .map(|j| j.juror_id)
                .collect();
            current.sort_unstable();
            let mut proposed = roster.clone();
            proposed.sort_unstable();
            if current == proposed {
                return Err(reject(format!(
                    "{} 的评委名单没有变化",
                    round_id
                )));
            }

            // === 步骤 2: 计算方案 ===
            let tasks = task_repo.list_tasks(round_id)?;
            let completed = task_repo.list_completed_review_pairs(round_id)?;
            let plan = Rebalancer::new(selector).plan(
                round_id,
                round.quorum,
                &roster,
                &tasks,
                &completed,
                rng,
            )?;

            // === 步骤 3: 应用方案并更新名单 ===
            apply_plan(
                &task_repo,
                round_id,
                &plan,
                config.reassign_mode,
                Utc::now().naive_utc(),
            )?;
            round_repo.set_active_roster(round_id, &roster)?;

            plan.summary
        };

        tx.commit().map_err(RepositoryError::from)?;

        tracing::info!(
            round_id = %round_id,
            incomplete = summary.incomplete_task_count,
            reassigned = summary.reassigned_task_count,
            mean = summary.task_count_mean,
            "重平衡完成"
        );
        Ok(summary)
    }

    // ==========================================
    // 统计
    // ==========================================

    /// 轮次任务统计
    pub fn round_task_counts(&self, round_id: RoundId) -> AssignResult<RoundTaskCounts> {
        let conn = self.get_conn()?;
        RoundRepository::new(&conn).get_round(round_id)?;
        Ok(TaskRepository::new(&conn).round_task_counts(round_id)?)
    }
}

/// 记录并构造被拒绝的操作
fn reject(message: String) -> AssignError {
    tracing::warn!(reason = %message, "操作被拒绝");
    AssignError::InvalidAction(message)
}

/// 保持首次出现顺序去重
fn dedupe_roster(jurors: &[JurorId]) -> Vec<JurorId> {
    let mut seen = HashSet::with_capacity(jurors.len());
    jurors
        .iter()
        .copied()
        .filter(|juror_id| seen.insert(*juror_id))
        .collect()
}

fn apply_plan(
    task_repo: &TaskRepository<'_>,
    round_id: RoundId,
    plan: &RebalancePlan,
    mode: ReassignMode,
    now: NaiveDateTime,
) -> AssignResult<()> {
    for task_move in &plan.moves {
        match mode {
            ReassignMode::InPlace => {
                task_repo.reassign_task(task_move.task_id, task_move.to_juror)?;
            }
            ReassignMode::CancelAndRecreate => {
                if task_move.from_juror == task_move.to_juror {
                    continue;
                }
                task_repo.cancel_task(task_move.task_id, now)?;
                task_repo.create_task(round_id, task_move.entry_id, task_move.to_juror, now)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_roster_keeps_first_occurrence() {
        let roster = dedupe_roster(&[JurorId(3), JurorId(1), JurorId(3), JurorId(2), JurorId(1)]);
        assert_eq!(roster, vec![JurorId(3), JurorId(1), JurorId(2)]);
    }

    #[test]
    fn test_dedupe_roster_empty() {
        assert!(dedupe_roster(&[]).is_empty());
    }
}
