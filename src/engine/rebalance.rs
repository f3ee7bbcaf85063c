// ==========================================
// 评审分配系统 - 重平衡引擎
// ==========================================
// 红线: 已完成任务不动; 已评审过的作品不得再分给同一评委
// 红线: 只搬动未完成任务, 不新增也不减少任务总量
// ==========================================
// 职责: 评委名单变化后重新分配未完成任务
// 输入: 新名单 + 轮次全部任务 + 已完成评审历史
// 输出: RebalancePlan (改派清单 + 汇总), 不直接写库
// ==========================================

use crate::domain::task::{ReviewPair, Task};
use crate::domain::types::{EntryId, JurorId, RoundId, TaskId};
use crate::engine::eligibility::EligibilityTracker;
use crate::engine::error::{AssignError, AssignResult};
use crate::engine::selector::WeightedSelector;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::instrument;

/// 单个任务的改派
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMove {
    pub task_id: TaskId,
    pub entry_id: EntryId,
    pub from_juror: JurorId,
    pub to_juror: JurorId,
}

/// 重平衡汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceSummary {
    /// 参与重平衡的未完成任务数
    pub incomplete_task_count: usize,
    /// 进入改派队列的任务数
    pub reassigned_task_count: usize,
    /// 新名单中每位评委的未完成任务数
    pub task_count_map: BTreeMap<JurorId, usize>,
    /// 新名单人均未完成任务数
    pub task_count_mean: f64,
}

/// 重平衡计划
#[derive(Debug, Clone)]
pub struct RebalancePlan {
    pub target_workload: usize,
    /// 原地保留的未完成任务
    pub kept: Vec<TaskId>,
    /// 需要改派的任务（按处理顺序）
    pub moves: Vec<TaskMove>,
    pub summary: RebalanceSummary,
}

// ==========================================
// Rebalancer - 重平衡引擎
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct Rebalancer {
    selector: WeightedSelector,
}

impl Rebalancer {
    pub fn new(selector: WeightedSelector) -> Self {
        Self { selector }
    }

    /// 计算重平衡方案
    ///
    /// # 参数
    /// - round_id: 轮次（用于日志）
    /// - quorum: 轮次 quorum，新名单人数不得少于它
    /// - new_jurors: 新评委名单（不可重复）
    /// - tasks: 轮次全部任务（按创建顺序）
    /// - completed: 已完成评审的 (作品, 评委) 历史
    /// - rng: 随机源
    ///
    /// # 错误
    /// - InvalidAction: 名单为空 / 少于 quorum / 有重复评委
    /// - NoEligibleJuror: 某作品的待分配任务已无可接收评委
    #[instrument(skip(self, new_jurors, tasks, completed, rng), fields(
        round_id = %round_id,
        new_jurors_count = new_jurors.len(),
        tasks_count = tasks.len()
    ))]
    pub fn plan<R>(
        &self,
        round_id: RoundId,
        quorum: u32,
        new_jurors: &[JurorId],
        tasks: &[Task],
        completed: &HashSet<ReviewPair>,
        rng: &mut R,
    ) -> AssignResult<RebalancePlan>
    where
        R: Rng + ?Sized,
    {
        // === 步骤 1: 前置条件 ===
        let panel: BTreeSet<JurorId> = new_jurors.iter().copied().collect();
        if panel.len() != new_jurors.len() {
            return Err(AssignError::InvalidAction(
                "新评委名单包含重复评委".to_string(),
            ));
        }
        if panel.is_empty() || panel.len() < quorum as usize {
            return Err(AssignError::InvalidAction(format!(
                "{} 需要至少 {} 位评委才能满足 quorum, 新名单只有 {} 位",
                round_id,
                quorum,
                panel.len()
            )));
        }

        // === 步骤 2: 资格表 (已完成评审永久排除) ===
        let mut tracker = EligibilityTracker::from_completed(completed);
        for task in tasks.iter().filter(|t| t.is_completed()) {
            tracker.exclude(task.entry_id, task.juror_id);
        }

        // === 步骤 3: 未完成任务按持有人分组 (保持创建顺序) ===
        let open_tasks: Vec<&Task> = tasks.iter().filter(|t| t.is_open()).collect();
        let mut work_map: BTreeMap<JurorId, Vec<&Task>> = BTreeMap::new();
        for task in &open_tasks {
            work_map.entry(task.juror_id).or_default().push(task);
        }

        // === 步骤 4: 目标负载与负载表 (新名单全员显式初始化) ===
        let target_workload = open_tasks.len() / panel.len() + 1;
        let target: BTreeMap<JurorId, usize> =
            panel.iter().map(|juror_id| (*juror_id, target_workload)).collect();
        let mut workload: BTreeMap<JurorId, usize> =
            panel.iter().map(|juror_id| (*juror_id, 0)).collect();

        // === 步骤 5: 保留 / 入队 ===
        let mut kept = Vec::new();
        let mut queue: Vec<&Task> = Vec::new();
        for (juror_id, held) in work_map {
            let Some(load) = workload.get_mut(&juror_id) else {
                // 已移出名单: 全部改派
                queue.extend(held);
                continue;
            };

            for task in held {
                // 同一作品重复持有时只保留第一份
                if *load < target_workload && tracker.exclude(task.entry_id, juror_id) {
                    *load += 1;
                    kept.push(task.task_id);
                } else {
                    queue.push(task);
                }
            }
        }

        // === 步骤 6: 逐个改派 (队尾先出) ===
        let reassigned_task_count = queue.len();
        let panel_list: Vec<JurorId> = panel.iter().copied().collect();
        let mut moves = Vec::with_capacity(reassigned_task_count);

        while let Some(task) = queue.pop() {
            let eligible = tracker.eligible_among(task.entry_id, &panel_list);
            if eligible.is_empty() {
                tracing::warn!(
                    round_id = %round_id,
                    entry_id = %task.entry_id,
                    task_id = %task.task_id,
                    "作品已无可分配评委"
                );
                return Err(AssignError::NoEligibleJuror {
                    entry_id: task.entry_id,
                });
            }

            let chosen = self
                .selector
                .choose_juror(&eligible, &target, &workload, rng)?;
            tracker.exclude(task.entry_id, chosen);
            let load = workload.get_mut(&chosen).ok_or_else(|| {
                AssignError::Internal(format!("{} 不在新名单负载表中", chosen))
            })?;
            *load += 1;

            tracing::debug!(
                task_id = %task.task_id,
                entry_id = %task.entry_id,
                from = %task.juror_id,
                to = %chosen,
                "任务改派"
            );
            moves.push(TaskMove {
                task_id: task.task_id,
                entry_id: task.entry_id,
                from_juror: task.juror_id,
                to_juror: chosen,
            });
        }

        // === 步骤 7: 汇总 ===
        let total_open: usize = workload.values().sum();
        if total_open != open_tasks.len() {
            return Err(AssignError::Internal(format!(
                "重平衡前后未完成任务数不一致: {} -> {}",
                open_tasks.len(),
                total_open
            )));
        }
        let task_count_mean = total_open as f64 / workload.len() as f64;

        Ok(RebalancePlan {
            target_workload,
            kept,
            moves,
            summary: RebalanceSummary {
                incomplete_task_count: open_tasks.len(),
                reassigned_task_count,
                task_count_map: workload,
                task_count_mean,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    // ==========================================
    // 测试辅助函数
    // ==========================================

    struct TaskBuilder {
        next_id: i64,
        tasks: Vec<Task>,
    }

    impl TaskBuilder {
        fn new() -> Self {
            Self {
                next_id: 1,
                tasks: Vec::new(),
            }
        }

        fn push(&mut self, entry: i64, juror: i64, completed: bool) -> TaskId {
            let created_at = NaiveDate::from_ymd_opt(2026, 3, 1)
                .unwrap()
                .and_hms_opt(0, 0, self.next_id as u32 % 60)
                .unwrap();
            let task_id = TaskId(self.next_id);
            self.tasks.push(Task {
                task_id,
                round_id: RoundId(1),
                entry_id: EntryId(entry),
                juror_id: JurorId(juror),
                created_at,
                completed_at: completed.then_some(created_at),
                cancelled_at: None,
            });
            self.next_id += 1;
            task_id
        }

        fn open(&mut self, entry: i64, juror: i64) -> TaskId {
            self.push(entry, juror, false)
        }

        fn done(&mut self, entry: i64, juror: i64) -> TaskId {
            self.push(entry, juror, true)
        }
    }

    fn jurors(ids: &[i64]) -> Vec<JurorId> {
        ids.iter().map(|id| JurorId(*id)).collect()
    }

    fn completed_pairs(tasks: &[Task]) -> HashSet<ReviewPair> {
        tasks.iter().filter(|t| t.is_completed()).map(|t| t.pair()).collect()
    }

    /// 应用计划后每个 (作品, 评委) 的未完成任务
    fn resulting_open_pairs(tasks: &[Task], plan: &RebalancePlan) -> Vec<ReviewPair> {
        let moved: BTreeMap<TaskId, JurorId> =
            plan.moves.iter().map(|m| (m.task_id, m.to_juror)).collect();
        tasks
            .iter()
            .filter(|t| t.is_open())
            .map(|t| {
                let juror = moved.get(&t.task_id).copied().unwrap_or(t.juror_id);
                ReviewPair::new(t.entry_id, juror)
            })
            .collect()
    }

    // ==========================================
    // 正常案例
    // ==========================================

    #[test]
    fn test_removed_juror_work_is_redistributed() {
        let mut b = TaskBuilder::new();
        // 评委 1 持有 3 个未完成 + 1 个已完成
        b.done(1, 1);
        b.open(2, 1);
        b.open(3, 1);
        b.open(4, 1);
        b.open(1, 2);
        b.open(2, 3);

        let tasks = b.tasks;
        let completed = completed_pairs(&tasks);
        let rebalancer = Rebalancer::default();
        let mut rng = StdRng::seed_from_u64(11);

        let plan = rebalancer
            .plan(RoundId(1), 2, &jurors(&[2, 3, 4]), &tasks, &completed, &mut rng)
            .unwrap();

        assert_eq!(plan.summary.incomplete_task_count, 5);
        assert!(plan.summary.reassigned_task_count >= 3);
        assert!(plan.moves.iter().all(|m| m.to_juror != JurorId(1)));
        assert_eq!(plan.kept.len() + plan.moves.len(), 5);
        assert_eq!(plan.summary.task_count_map.values().sum::<usize>(), 5);
        assert!(!plan.summary.task_count_map.contains_key(&JurorId(1)));
    }

    #[test]
    fn test_completed_history_is_never_reassigned() {
        let mut b = TaskBuilder::new();
        // 评委 2 已评过作品 1; 评委 1 持有作品 1 的未完成任务
        b.done(1, 2);
        b.open(1, 1);

        let tasks = b.tasks;
        let completed = completed_pairs(&tasks);
        let rebalancer = Rebalancer::default();

        for seed in 0..30 {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = rebalancer
                .plan(RoundId(1), 1, &jurors(&[2, 3]), &tasks, &completed, &mut rng)
                .unwrap();
            assert_eq!(plan.moves.len(), 1);
            assert_eq!(plan.moves[0].to_juror, JurorId(3), "seed={}", seed);
        }
    }

    #[test]
    fn test_rating_history_outside_tasks_is_respected() {
        let mut b = TaskBuilder::new();
        b.open(7, 1);
        let tasks = b.tasks;

        // 评委 2 曾在任务表之外留下评分记录
        let mut completed = HashSet::new();
        completed.insert(ReviewPair::new(EntryId(7), JurorId(2)));

        let rebalancer = Rebalancer::default();
        let mut rng = StdRng::seed_from_u64(5);
        let plan = rebalancer
            .plan(RoundId(1), 1, &jurors(&[2, 3]), &tasks, &completed, &mut rng)
            .unwrap();
        assert_eq!(plan.moves[0].to_juror, JurorId(3));
    }

    #[test]
    fn test_excess_work_beyond_target_is_moved() {
        let mut b = TaskBuilder::new();
        // 评委 1 独占 6 个未完成任务, 新增评委 2、3
        for entry in 1..=6 {
            b.open(entry, 1);
        }
        let tasks = b.tasks;
        let completed = completed_pairs(&tasks);
        let rebalancer = Rebalancer::default();
        let mut rng = StdRng::seed_from_u64(3);

        let plan = rebalancer
            .plan(RoundId(1), 1, &jurors(&[1, 2, 3]), &tasks, &completed, &mut rng)
            .unwrap();

        // target = 6 / 3 + 1 = 3
        assert_eq!(plan.target_workload, 3);
        assert_eq!(plan.kept.len(), 3);
        assert_eq!(plan.summary.reassigned_task_count, 3);
        // 保留的是创建顺序最早的 3 个
        assert_eq!(plan.kept, vec![TaskId(1), TaskId(2), TaskId(3)]);
        assert_eq!(plan.summary.task_count_mean, 2.0);
    }

    #[test]
    fn test_no_duplicate_open_pairs_after_plan() {
        let mut b = TaskBuilder::new();
        // 每个作品 2 份, 评委 1、2 全部持有; 评委 1 退出, 评委 3、4 加入
        for entry in 1..=8 {
            b.open(entry, 1);
            b.open(entry, 2);
        }
        let tasks = b.tasks;
        let completed = completed_pairs(&tasks);
        let rebalancer = Rebalancer::default();

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = rebalancer
                .plan(RoundId(1), 2, &jurors(&[2, 3, 4]), &tasks, &completed, &mut rng)
                .unwrap();
            let pairs = resulting_open_pairs(&tasks, &plan);
            let unique: HashSet<ReviewPair> = pairs.iter().copied().collect();
            assert_eq!(unique.len(), pairs.len(), "seed={}", seed);
        }
    }

    #[test]
    fn test_duplicate_holding_is_split() {
        let mut b = TaskBuilder::new();
        b.open(1, 1);
        b.open(1, 1);
        let tasks = b.tasks;
        let completed = completed_pairs(&tasks);
        let rebalancer = Rebalancer::default();
        let mut rng = StdRng::seed_from_u64(8);

        let plan = rebalancer
            .plan(RoundId(1), 1, &jurors(&[1, 2]), &tasks, &completed, &mut rng)
            .unwrap();

        assert_eq!(plan.kept, vec![TaskId(1)]);
        assert_eq!(plan.moves.len(), 1);
        assert_eq!(plan.moves[0].to_juror, JurorId(2));
    }

    #[test]
    fn test_cancelled_tasks_are_ignored() {
        let mut b = TaskBuilder::new();
        b.open(1, 1);
        b.tasks[0].cancelled_at = Some(b.tasks[0].created_at);
        b.open(2, 1);

        let tasks = b.tasks;
        let rebalancer = Rebalancer::default();
        let mut rng = StdRng::seed_from_u64(8);
        let plan = rebalancer
            .plan(RoundId(1), 1, &jurors(&[2]), &tasks, &HashSet::new(), &mut rng)
            .unwrap();

        assert_eq!(plan.summary.incomplete_task_count, 1);
        assert_eq!(plan.moves.len(), 1);
        assert_eq!(plan.moves[0].task_id, TaskId(2));
    }

    #[test]
    fn test_workload_converges_for_large_rounds() {
        let mut b = TaskBuilder::new();
        // 300 个作品, quorum 2, 原评委 1..=4 均分
        for entry in 1..=300 {
            let first = (entry % 4) + 1;
            let second = ((entry + 1) % 4) + 1;
            b.open(entry, first);
            b.open(entry, second);
        }
        let tasks = b.tasks;
        let completed = completed_pairs(&tasks);
        let rebalancer = Rebalancer::default();
        let mut rng = StdRng::seed_from_u64(2026);

        let plan = rebalancer
            .plan(
                RoundId(1),
                2,
                &jurors(&[2, 3, 4, 5, 6, 7]),
                &tasks,
                &completed,
                &mut rng,
            )
            .unwrap();

        let loads: Vec<usize> = plan.summary.task_count_map.values().copied().collect();
        let max = *loads.iter().max().unwrap();
        let min = *loads.iter().min().unwrap();
        // target = 600 / 6 + 1 = 101
        assert_eq!(plan.target_workload, 101);
        assert!(max <= plan.target_workload + 1, "loads={:?}", loads);
        assert!(max - min <= 10, "loads={:?}", loads);
    }

    // ==========================================
    // 异常案例
    // ==========================================

    #[test]
    fn test_roster_below_quorum_is_invalid() {
        let rebalancer = Rebalancer::default();
        let mut rng = StdRng::seed_from_u64(1);
        let result = rebalancer.plan(RoundId(1), 3, &jurors(&[1, 2]), &[], &HashSet::new(), &mut rng);
        assert!(matches!(result, Err(AssignError::InvalidAction(_))));
    }

    #[test]
    fn test_duplicate_roster_member_is_invalid() {
        let rebalancer = Rebalancer::default();
        let mut rng = StdRng::seed_from_u64(1);
        let result = rebalancer.plan(RoundId(1), 1, &jurors(&[1, 1]), &[], &HashSet::new(), &mut rng);
        assert!(matches!(result, Err(AssignError::InvalidAction(_))));
    }

    #[test]
    fn test_exhausted_eligibility_is_fatal() {
        let mut b = TaskBuilder::new();
        // 唯一的新评委 2 已评过作品 1
        b.done(1, 2);
        b.open(1, 1);
        let tasks = b.tasks;
        let completed = completed_pairs(&tasks);
        let rebalancer = Rebalancer::default();
        let mut rng = StdRng::seed_from_u64(1);

        let result = rebalancer.plan(RoundId(1), 1, &jurors(&[2]), &tasks, &completed, &mut rng);
        assert!(matches!(
            result,
            Err(AssignError::NoEligibleJuror { entry_id: EntryId(1) })
        ));
    }
}
