//! 朴素检索记忆：按词重叠打分
//!
//! 不做向量、不建索引；查询时把查询与每条记录切成小写词集合，交集最大的记录胜出（并列取最早写入的）。

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// 检索库中的一条记录（磁盘格式为 {"text": "..."}）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RagRecord {
    pub text: String,
}

impl RagRecord {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// 将文本切分为小写词集合
fn tokenize_lower(s: &str) -> HashSet<String> {
    s.split_whitespace().map(|w| w.to_lowercase()).collect()
}

/// 返回得分最高且大于 0 的记录文本
pub fn best_match<'a>(records: &'a [RagRecord], query: &str) -> Option<&'a str> {
    let query_tokens = tokenize_lower(query);
    if query_tokens.is_empty() {
        return None;
    }
    let mut best: Option<&'a str> = None;
    let mut best_score = 0;
    for record in records {
        // 相似度：查询词与记录词的交集大小
        let score = query_tokens
            .intersection(&tokenize_lower(&record.text))
            .count();
        if score > best_score {
            best = Some(record.text.as_str());
            best_score = score;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_match_prefers_highest_overlap() {
        let records = vec![
            RagRecord::new("my favorite color is blue"),
            RagRecord::new("the server password rotates monthly"),
            RagRecord::new("favorite food is ramen"),
        ];
        assert_eq!(
            best_match(&records, "what is my favorite color"),
            Some("my favorite color is blue")
        );
    }

    #[test]
    fn test_ties_keep_earliest_record() {
        let records = vec![RagRecord::new("alpha beta"), RagRecord::new("beta alpha")];
        assert_eq!(best_match(&records, "alpha"), Some("alpha beta"));
    }

    #[test]
    fn test_no_overlap_returns_none() {
        let records = vec![RagRecord::new("nothing relevant here")];
        assert_eq!(best_match(&records, "weather tomorrow"), None);
        assert_eq!(best_match(&records, "   "), None);
    }

    #[test]
    fn test_overlap_is_case_insensitive() {
        let records = vec![RagRecord::new("blue sky today")];
        assert_eq!(best_match(&records, "Blue SKY"), Some("blue sky today"));
    }
}
