//! Keyword stage of the priority classifier
//!
//! Matching runs against the lowercased message text. `critical` keywords
//! are lowercased too (case-insensitive match); `high` and `normal`
//! keywords are used verbatim, so a keyword with capitals can never match
//! the lowercased text. That asymmetry is kept on purpose.

use serde::{Deserialize, Serialize};

use super::priority::{Classification, Priority};

pub const DEFAULT_REASON: &str = "default classification";

/// Per-account keyword rules, ordered within each tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityKeywords {
    #[serde(default)]
    pub critical: Vec<String>,
    #[serde(default)]
    pub high: Vec<String>,
    #[serde(default)]
    pub normal: Vec<String>,
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Default for PriorityKeywords {
    fn default() -> Self {
        Self {
            critical: owned(&[
                "버그", "에러", "error", "장애", "다운", "down", "긴급", "urgent", "ASAP", "급해", "지금",
                "당장", "안됨", "안돼", "작동안함",
            ]),
            high: owned(&[
                // review / confirmation
                "확인", "체크", "리뷰", "review", "승인", "approve", "피드백", "feedback", "?", "질문",
                "어떻게", "왜", "언제",
                // dates and deadlines
                "오늘", "내일", "이번주", "금주", "다음주", "이번달", "마감", "deadline", "기한", "due",
                "~까지", "까지", "by", "until", "before", "시까지", "시간", "time", "분까지", "일까지",
                "오전", "오후", "AM", "PM", "am", "pm", "주말", "평일", "월요일", "화요일", "수요일",
                "목요일", "금요일", "monday", "tuesday", "wednesday", "thursday", "friday", "EOD", "eod",
                "COB", "cob",
            ]),
            normal: owned(&["공유", "참고", "FYI", "알려", "업데이트", "update", "공지"]),
        }
    }
}

impl PriorityKeywords {
    pub fn tier(&self, priority: Priority) -> Option<&Vec<String>> {
        match priority {
            Priority::Critical => Some(&self.critical),
            Priority::High => Some(&self.high),
            Priority::Normal => Some(&self.normal),
            Priority::Low => None,
        }
    }

    pub fn tier_mut(&mut self, priority: Priority) -> Option<&mut Vec<String>> {
        match priority {
            Priority::Critical => Some(&mut self.critical),
            Priority::High => Some(&mut self.high),
            Priority::Normal => Some(&mut self.normal),
            Priority::Low => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.critical.is_empty() && self.high.is_empty() && self.normal.is_empty()
    }

    /// First matching keyword wins, tiers are tried critical -> high -> normal
    pub fn classify(&self, text: &str) -> Classification {
        let lowered = text.to_lowercase();

        if let Some(keyword) = self
            .critical
            .iter()
            .find(|k| !k.is_empty() && lowered.contains(&k.to_lowercase()))
        {
            return Classification::new(Priority::Critical, format!("keyword match: {}", keyword));
        }

        for (priority, keywords) in [(Priority::High, &self.high), (Priority::Normal, &self.normal)] {
            if let Some(keyword) = keywords
                .iter()
                .find(|k| !k.is_empty() && lowered.contains(k.as_str()))
            {
                return Classification::new(priority, format!("keyword match: {}", keyword));
            }
        }

        Classification::new(Priority::Normal, DEFAULT_REASON)
    }
}
