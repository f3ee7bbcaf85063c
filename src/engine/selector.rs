// ==========================================
// 评审分配系统 - 加权评委选择
// ==========================================
// 职责: 在可分配评委中随机选择一人，偏向负载最低者
// 权重: max(target - current, epsilon)
// 实现: 累积权重表 + 均匀采样 + 二分查找
// ==========================================

use crate::config::DEFAULT_SELECTOR_EPSILON;
use crate::domain::types::JurorId;
use crate::engine::error::{AssignError, AssignResult};
use rand::Rng;
use std::collections::BTreeMap;

// ==========================================
// WeightedSelector - 加权选择器
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct WeightedSelector {
    epsilon: f64,
}

impl Default for WeightedSelector {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_SELECTOR_EPSILON,
        }
    }
}

impl WeightedSelector {
    /// # 参数
    /// - epsilon: 权重下限，已达标评委仍保有极小概率，避免全员饱和时无人可选
    pub fn new(epsilon: f64) -> AssignResult<Self> {
        if !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(AssignError::InvalidAction(format!(
                "权重下限必须为正数, 实际为 {}",
                epsilon
            )));
        }
        Ok(Self { epsilon })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// 单个评委的权重
    pub fn weight(&self, target: usize, current: usize) -> f64 {
        let gap = target as f64 - current as f64;
        gap.max(self.epsilon)
    }

    /// 从可分配评委中选择一人
    ///
    /// # 参数
    /// - eligible: 已排除不可分配评委后的候选集合
    /// - target: 评委 -> 目标负载
    /// - current: 评委 -> 当前负载
    ///
    /// # 错误
    /// - EmptyCandidateSet: 候选为空
    /// - Internal: 候选评委缺少负载记录
    pub fn choose_juror<R>(
        &self,
        eligible: &[JurorId],
        target: &BTreeMap<JurorId, usize>,
        current: &BTreeMap<JurorId, usize>,
        rng: &mut R,
    ) -> AssignResult<JurorId>
    where
        R: Rng + ?Sized,
    {
        if eligible.is_empty() {
            return Err(AssignError::EmptyCandidateSet);
        }

        let mut cumulative = Vec::with_capacity(eligible.len());
        let mut total = 0.0_f64;
        for juror_id in eligible {
            let target_load = *target.get(juror_id).ok_or_else(|| {
                AssignError::Internal(format!("{} 缺少目标负载", juror_id))
            })?;
            let current_load = *current.get(juror_id).ok_or_else(|| {
                AssignError::Internal(format!("{} 缺少当前负载", juror_id))
            })?;
            total += self.weight(target_load, current_load);
            cumulative.push(total);
        }

        let draw = rng.random_range(0.0..total);
        let index = cumulative.partition_point(|&edge| edge <= draw);

        // 浮点边界保护: draw 理论上 < total
        Ok(eligible[index.min(eligible.len() - 1)])
    }
}
