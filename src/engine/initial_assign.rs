// ==========================================
// 评审分配系统 - 初始分配生成器
// ==========================================
// 红线: 每个作品恰好 quorum 个不同评委
// ==========================================
// 职责: 轮次首次开放时生成全部评审配对
// 输入: 激活评委 + 有效作品 + quorum
// 输出: (作品, 评委) 配对列表（不直接写库）
// ==========================================
// 算法: 需求序列(打乱后的作品重复 quorum 次) 与
//       供给序列(打乱后的评委各重复 per_juror 次) 逐位配对
// 无重复性: quorum <= 评委数 => per_juror <= 作品数,
//           每位评委覆盖的连续需求位置不超过一轮作品, 因而互不相同
// ==========================================

use crate::domain::task::ReviewPair;
use crate::domain::types::{EntryId, JurorId, RoundId};
use crate::engine::error::{AssignError, AssignResult};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use tracing::instrument;

// ==========================================
// InitialAssignmentGenerator - 初始分配生成器
// ==========================================
#[derive(Debug, Default)]
pub struct InitialAssignmentGenerator {
    // 无状态引擎，不需要注入依赖
}

impl InitialAssignmentGenerator {
    pub fn new() -> Self {
        Self {}
    }

    /// 每位评委本轮最多承担的任务数: ceil(作品数 * quorum / 评委数)
    pub fn per_juror_quota(entry_count: usize, quorum: usize, juror_count: usize) -> usize {
        if juror_count == 0 {
            return 0;
        }
        (entry_count * quorum).div_ceil(juror_count)
    }

    /// 生成初始分配
    ///
    /// # 参数
    /// - round_id: 轮次（用于日志与错误信息）
    /// - quorum: 每个作品所需评审数
    /// - jurors: 激活评委
    /// - entries: 有效作品
    /// - rng: 随机源（测试中传入固定种子）
    ///
    /// # 错误
    /// - InvalidAction: 无激活评委 / quorum 为 0 / quorum 超过评委数
    /// - SupplyExhausted: 供给先于需求耗尽（配额计算缺陷）
    /// - Internal: 产生了重复配对
    #[instrument(skip(self, jurors, entries, rng), fields(
        round_id = %round_id,
        jurors_count = jurors.len(),
        entries_count = entries.len()
    ))]
    pub fn generate<R>(
        &self,
        round_id: RoundId,
        quorum: u32,
        jurors: &[JurorId],
        entries: &[EntryId],
        rng: &mut R,
    ) -> AssignResult<Vec<ReviewPair>>
    where
        R: Rng + ?Sized,
    {
        // === 步骤 1: 前置条件 ===
        if jurors.is_empty() {
            return Err(AssignError::InvalidAction(format!(
                "{} 没有激活评委",
                round_id
            )));
        }
        if quorum == 0 {
            return Err(AssignError::InvalidAction(format!(
                "{} 的 quorum 必须 >= 1",
                round_id
            )));
        }
        let quorum = quorum as usize;
        if quorum > jurors.len() {
            return Err(AssignError::InvalidAction(format!(
                "{} 需要至少 {} 位激活评委才能满足 quorum, 当前只有 {} 位",
                round_id,
                quorum,
                jurors.len()
            )));
        }

        // === 步骤 2: 打乱评委与作品 ===
        let mut shuffled_jurors = jurors.to_vec();
        shuffled_jurors.shuffle(rng);
        let mut shuffled_entries = entries.to_vec();
        shuffled_entries.shuffle(rng);

        // === 步骤 3: 构造需求/供给序列并配对 ===
        let per_juror =
            Self::per_juror_quota(shuffled_entries.len(), quorum, shuffled_jurors.len());
        let demand_len = shuffled_entries.len() * quorum;
        let demand = shuffled_entries.iter().copied().cycle().take(demand_len);
        let supply = shuffled_jurors
            .iter()
            .flat_map(|juror_id| std::iter::repeat(*juror_id).take(per_juror));

        let pairs = zip_demand_supply(round_id, demand, supply)?;

        tracing::debug!(
            round_id = %round_id,
            per_juror,
            pairs = pairs.len(),
            "初始分配配对完成"
        );
        Ok(pairs)
    }
}

/// 需求与供给逐位配对，需求耗尽即停止
fn zip_demand_supply<D, S>(round_id: RoundId, demand: D, supply: S) -> AssignResult<Vec<ReviewPair>>
where
    D: Iterator<Item = EntryId>,
    S: Iterator<Item = JurorId>,
{
    let mut supply = supply;
    let mut seen = HashSet::new();
    let mut pairs = Vec::with_capacity(demand.size_hint().0);

    for (position, entry_id) in demand.enumerate() {
        let juror_id = supply
            .next()
            .ok_or(AssignError::SupplyExhausted { round_id, position })?;

        let pair = ReviewPair::new(entry_id, juror_id);
        if !seen.insert(pair) {
            return Err(AssignError::Internal(format!(
                "初始分配产生重复配对: {} / {}",
                entry_id, juror_id
            )));
        }
        pairs.push(pair);
    }

    Ok(pairs)
}
