// ==========================================
// 评审分配系统 - 评委资格跟踪
// ==========================================
// 红线: 评委不得重复评审同一作品
// ==========================================
// 职责: 按作品记录“不得再分配”的评委集合
// 来源: 已完成评审历史 + 当前持有的未完成任务
// ==========================================

use crate::domain::task::ReviewPair;
use crate::domain::types::{EntryId, JurorId};
use std::collections::{HashMap, HashSet};

// ==========================================
// EligibilityTracker - 资格跟踪器
// ==========================================
// 单次调用内构建，随新分配增量更新
#[derive(Debug, Clone, Default)]
pub struct EligibilityTracker {
    ineligible: HashMap<EntryId, HashSet<JurorId>>,
}

impl EligibilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以已完成评审历史初始化
    pub fn from_completed<'a, I>(completed: I) -> Self
    where
        I: IntoIterator<Item = &'a ReviewPair>,
    {
        let mut tracker = Self::new();
        for pair in completed {
            tracker.exclude(pair.entry_id, pair.juror_id);
        }
        tracker
    }

    /// 标记评委不得再获得该作品
    ///
    /// # 返回
    /// - true: 新增排除
    /// - false: 该评委此前已被排除
    pub fn exclude(&mut self, entry_id: EntryId, juror_id: JurorId) -> bool {
        self.ineligible.entry(entry_id).or_default().insert(juror_id)
    }

    /// 评委是否仍可获得该作品
    pub fn is_eligible(&self, entry_id: EntryId, juror_id: JurorId) -> bool {
        self.ineligible
            .get(&entry_id)
            .map_or(true, |jurors| !jurors.contains(&juror_id))
    }

    /// 作品的不可分配评委集合
    pub fn ineligible_jurors(&self, entry_id: EntryId) -> HashSet<JurorId> {
        self.ineligible.get(&entry_id).cloned().unwrap_or_default()
    }

    /// 从候选名单中筛出可获得该作品的评委（保持名单顺序）
    pub fn eligible_among(&self, entry_id: EntryId, candidates: &[JurorId]) -> Vec<JurorId> {
        candidates
            .iter()
            .copied()
            .filter(|juror_id| self.is_eligible(entry_id, *juror_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_history_excludes_juror() {
        let history = vec![
            ReviewPair::new(EntryId(1), JurorId(10)),
            ReviewPair::new(EntryId(2), JurorId(11)),
        ];
        let tracker = EligibilityTracker::from_completed(&history);

        assert!(!tracker.is_eligible(EntryId(1), JurorId(10)));
        assert!(tracker.is_eligible(EntryId(1), JurorId(11)));
        assert!(!tracker.is_eligible(EntryId(2), JurorId(11)));
        assert!(tracker.is_eligible(EntryId(3), JurorId(10)));
    }

    #[test]
    fn test_exclude_reports_duplicates() {
        let mut tracker = EligibilityTracker::new();
        assert!(tracker.exclude(EntryId(1), JurorId(1)));
        assert!(!tracker.exclude(EntryId(1), JurorId(1)));
        assert_eq!(tracker.ineligible_jurors(EntryId(1)).len(), 1);
        assert!(tracker.ineligible_jurors(EntryId(9)).is_empty());
    }

    #[test]
    fn test_eligible_among_keeps_order() {
        let mut tracker = EligibilityTracker::new();
        tracker.exclude(EntryId(5), JurorId(2));

        let panel = vec![JurorId(3), JurorId(2), JurorId(1)];
        assert_eq!(
            tracker.eligible_among(EntryId(5), &panel),
            vec![JurorId(3), JurorId(1)]
        );
    }
}
