//! 主播列表筛选
//!
//! 每个维度取默认值（空字符串或 "all"）时不产生约束。
//! 语言、分类是多值维度：主播任意一个取值命中任意一个选中值即可（两边都是 OR）。
//! 结果按在线状态稳定排序：online → in_session → 其他。

use crate::app::models::Broadcaster;
use serde::{Deserialize, Serialize};

/// "全部" 的取值
pub const ALL: &str = "all";

/// 筛选状态
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcasterFilter {
    pub gender: String,
    pub country: String,
    pub language: Vec<String>,
    pub ethnicity: String,
    pub category: Vec<String>,
    pub goal: String,
    /// 按展示名称模糊搜索
    pub search: String,
}

fn single_active(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty() && !value.eq_ignore_ascii_case(ALL)).then_some(value)
}

/// 空白取值直接忽略；剩余为空或包含 "all" 时不产生约束
fn multi_active(values: &[String]) -> Option<Vec<&str>> {
    let wanted: Vec<&str> = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect();
    if wanted.is_empty() || wanted.iter().any(|v| v.eq_ignore_ascii_case(ALL)) {
        return None;
    }
    Some(wanted)
}

fn any_overlap(have: &[String], wanted: &[&str]) -> bool {
    have.iter()
        .any(|h| wanted.iter().any(|w| h.trim().eq_ignore_ascii_case(w)))
}

impl BroadcasterFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gender(mut self, gender: &str) -> Self {
        self.gender = gender.to_string();
        self
    }

    pub fn country(mut self, country: &str) -> Self {
        self.country = country.to_string();
        self
    }

    pub fn languages<S: AsRef<str>>(mut self, languages: &[S]) -> Self {
        self.language = languages.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    pub fn ethnicity(mut self, ethnicity: &str) -> Self {
        self.ethnicity = ethnicity.to_string();
        self
    }

    pub fn categories<S: AsRef<str>>(mut self, categories: &[S]) -> Self {
        self.category = categories.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    pub fn goal(mut self, goal: &str) -> Self {
        self.goal = goal.to_string();
        self
    }

    pub fn search(mut self, search: &str) -> Self {
        self.search = search.to_string();
        self
    }

    /// 是否所有维度都处于默认值
    pub fn is_default(&self) -> bool {
        single_active(&self.gender).is_none()
            && single_active(&self.country).is_none()
            && multi_active(&self.language).is_none()
            && single_active(&self.ethnicity).is_none()
            && multi_active(&self.category).is_none()
            && single_active(&self.goal).is_none()
            && single_active(&self.search).is_none()
    }

    /// 重置全部维度
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// 单个主播是否满足全部生效维度
    pub fn matches(&self, b: &Broadcaster) -> bool {
        let eq = |wanted: Option<&str>, have: &str| {
            wanted.map_or(true, |w| have.trim().eq_ignore_ascii_case(w))
        };

        eq(single_active(&self.gender), &b.gender)
            && eq(single_active(&self.country), &b.country)
            && eq(single_active(&self.ethnicity), &b.ethnicity)
            && multi_active(&self.language).map_or(true, |w| any_overlap(&b.languages, &w))
            && multi_active(&self.category).map_or(true, |w| any_overlap(&b.categories, &w))
            && single_active(&self.goal)
                .map_or(true, |w| b.goals.iter().any(|g| g.trim().eq_ignore_ascii_case(w)))
            && single_active(&self.search).map_or(true, |s| {
                b.name().to_lowercase().contains(&s.to_lowercase())
            })
    }

    /// 筛选并按在线状态排序
    pub fn apply(&self, list: impl IntoIterator<Item = Broadcaster>) -> Vec<Broadcaster> {
        let mut result: Vec<Broadcaster> =
            list.into_iter().filter(|b| self.matches(b)).collect();
        sort_by_status(&mut result);
        result
    }
}

/// 按状态权重稳定排序
pub fn sort_by_status(list: &mut [Broadcaster]) {
    list.sort_by_key(|b| b.status.rank());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::UserStatus;

    fn broadcaster(id: &str, gender: &str, status: UserStatus) -> Broadcaster {
        Broadcaster {
            id: id.to_string(),
            display_name: format!("B{}", id),
            gender: gender.to_string(),
            status,
            broadcaster_approved: true,
            ..Default::default()
        }
    }

    fn ids(list: &[Broadcaster]) -> Vec<&str> {
        list.iter().map(|b| b.id.as_str()).collect()
    }

    #[test]
    fn default_filter_only_sorts() {
        let list = vec![
            broadcaster("1", "male", UserStatus::Offline),
            broadcaster("2", "female", UserStatus::InSession),
            broadcaster("3", "male", UserStatus::Online),
            broadcaster("4", "female", UserStatus::Live),
            broadcaster("5", "female", UserStatus::Online),
        ];
        let filter = BroadcasterFilter::new().gender(ALL).categories(&["all"]);
        assert!(filter.is_default());
        let result = filter.apply(list);
        assert_eq!(ids(&result), vec!["3", "5", "2", "1", "4"]);
    }

    #[test]
    fn status_order_is_monotonic() {
        let statuses = [
            UserStatus::Live,
            UserStatus::Online,
            UserStatus::Offline,
            UserStatus::InSession,
            UserStatus::Other,
            UserStatus::Online,
        ];
        let list = statuses
            .iter()
            .enumerate()
            .map(|(i, s)| broadcaster(&i.to_string(), "", *s))
            .collect::<Vec<_>>();
        let result = BroadcasterFilter::new().apply(list);
        assert!(result
            .windows(2)
            .all(|w| w[0].status.rank() <= w[1].status.rank()));
        // 同一权重内保持原始顺序
        assert_eq!(ids(&result)[..2], ["1", "5"]);
    }

    #[test]
    fn gender_filter_over_online_pool() {
        let list = (0..25)
            .map(|i| {
                let gender = if i % 3 == 0 { "female" } else { "male" };
                broadcaster(&i.to_string(), gender, UserStatus::Online)
            })
            .collect::<Vec<_>>();
        let filter = BroadcasterFilter {
            gender: "female".to_string(),
            country: String::new(),
            category: vec!["all".to_string()],
            ..Default::default()
        };
        let result = filter.apply(list);
        assert_eq!(result.len(), 9);
        assert!(result.iter().all(|b| b.gender == "female"));
        assert!(result.iter().all(|b| b.status == UserStatus::Online));
        assert_eq!(result[0].id, "0");
    }

    #[test]
    fn multi_value_dimensions_use_or_on_both_sides() {
        let mut a = broadcaster("a", "female", UserStatus::Online);
        a.languages = vec!["English".to_string(), "Spanish".to_string()];
        a.categories = vec!["music".to_string()];
        let mut b = broadcaster("b", "female", UserStatus::Online);
        b.languages = vec!["French".to_string()];
        b.categories = vec!["gaming".to_string(), "chat".to_string()];

        let by_language = BroadcasterFilter::new().languages(&["spanish", "German"]);
        assert_eq!(ids(&by_language.apply(vec![a.clone(), b.clone()])), vec!["a"]);

        let by_category = BroadcasterFilter::new().categories(&["chat", "music"]);
        assert_eq!(
            ids(&by_category.apply(vec![a.clone(), b.clone()])),
            vec!["a", "b"]
        );

        let none = BroadcasterFilter::new().languages(&["Japanese"]);
        assert!(none.apply(vec![a, b]).is_empty());
    }

    #[test]
    fn blank_entries_do_not_widen_the_filter() {
        let mut gamer = broadcaster("a", "female", UserStatus::Online);
        gamer.categories = vec!["gaming".to_string()];

        let filter = BroadcasterFilter::new().categories(&["music", ""]);
        assert!(!filter.is_default());
        assert!(filter.apply(vec![gamer.clone()]).is_empty());

        let blanks = BroadcasterFilter::new().categories(&["", "  "]);
        assert!(blanks.is_default());
        assert_eq!(ids(&blanks.apply(vec![gamer.clone()])), vec!["a"]);

        let with_all = BroadcasterFilter::new().languages(&["all", "es"]);
        assert!(with_all.is_default());
        assert_eq!(ids(&with_all.apply(vec![gamer])), vec!["a"]);
    }

    #[test]
    fn combined_dimensions_are_anded() {
        let mut a = broadcaster("a", "female", UserStatus::Online);
        a.country = "BR".to_string();
        a.goals = vec!["friendship".to_string()];
        let mut b = broadcaster("b", "female", UserStatus::Online);
        b.country = "US".to_string();
        b.goals = vec!["friendship".to_string()];

        let filter = BroadcasterFilter::new()
            .gender("Female")
            .country("br")
            .goal("friendship");
        assert_eq!(ids(&filter.apply(vec![a, b])), vec!["a"]);
    }

    #[test]
    fn search_matches_display_name() {
        let list = vec![
            broadcaster("1", "", UserStatus::Online),
            broadcaster("12", "", UserStatus::Online),
        ];
        let filter = BroadcasterFilter::new().search("b12");
        assert_eq!(ids(&filter.apply(list)), vec!["12"]);
    }

    #[test]
    fn empty_result_is_valid() {
        let mut filter = BroadcasterFilter::new().ethnicity("latina");
        assert!(filter.apply(Vec::new()).is_empty());
        filter.reset();
        assert!(filter.is_default());
    }
}
