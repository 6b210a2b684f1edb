//! Trigger expressions that suggest a second opinion would help.
//!
//! Matching is a case-insensitive regex search anywhere in the text. The
//! tables are compiled once and never mutated.

use std::fmt;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::Serialize;

const UNCERTAINTY_PATTERNS: &[&str] = &[
    // English
    r"\bI'm not sure\b",
    r"\bI think\b",
    r"\bpossibly\b",
    r"\bprobably\b",
    r"\bmight be\b",
    r"\bcould be\b",
    r"\bI believe\b",
    r"\bIt seems\b",
    r"\bappears to be\b",
    r"\buncertain\b",
    r"\bI would guess\b",
    r"\blikely\b",
    r"\bperhaps\b",
    r"\bmaybe\b",
    r"\bI assume\b",
    // Korean
    r"잘 모르겠",
    r"확실하지 않",
    r"확신이 없",
    r"아마도",
    r"어쩌면",
    r"생각해보니",
    r"것 같",
    r"인 듯",
    r"추측",
    r"예상",
    // Errors and problems, Korean
    r"에러",
    r"오류",
    r"문제",
    r"버그",
    r"안 돼",
    r"안돼",
    r"실패",
    r"작동하지 않",
    r"작동 안",
    r"동작하지 않",
    r"동작 안",
    r"안 되",
    r"막혔",
    r"해결",
    r"고장",
    r"이상해",
    r"이상하",
    // Errors and problems, English
    r"\berror\b",
    r"\bbug\b",
    r"\bissue\b",
    r"\bproblem\b",
    r"\bfailed\b",
    r"\bfailing\b",
    r"\bnot working\b",
    r"\bdoesn't work\b",
    r"\bbroken\b",
    r"\bstuck\b",
    r"\btrouble\b",
    r"\bwrong\b",
];

const COMPLEX_DECISION_PATTERNS: &[&str] = &[
    // English
    r"\bmultiple approaches\b",
    r"\bseveral options\b",
    r"\btrade-offs?\b",
    r"\bconsider(?:ing)?\b",
    r"\balternatives?\b",
    r"\bpros and cons\b",
    r"\bweigh(?:ing)? the options\b",
    r"\bchoice between\b",
    r"\bdecision\b",
    // Korean
    r"어떤 게 좋",
    r"뭐가 나은",
    r"어느 것",
    r"선택",
    r"결정",
    r"고민",
    r"여러 방법",
    r"여러 가지",
    r"장단점",
    r"비교",
    r"vs",
    r"대",
    r"중에",
    // Requests for help, Korean
    r"도와줘",
    r"도움",
    r"해줘",
    r"알려줘",
    r"가르쳐",
    r"설명해",
    r"방법",
    r"어떻게",
    r"왜",
    r"뭔가",
    // Requests for help, English
    r"\bhelp\b",
    r"\bassist\b",
    r"\bguide\b",
    r"\bshow me\b",
    r"\btell me\b",
    r"\bexplain\b",
    r"\bhow to\b",
    r"\bwhat should\b",
    r"\bwhy\b",
];

const CRITICAL_OPERATION_PATTERNS: &[&str] = &[
    r"\bproduction\b",
    r"\bdatabase migration\b",
    r"\bsecurity\b",
    r"\bauthentication\b",
    r"\bencryption\b",
    r"\bAPI key\b",
    r"\bcredentials?\b",
    r"\bperformance\s+critical\b",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerCategory {
    Uncertainty,
    ComplexDecision,
    CriticalOperation,
}

impl TriggerCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerCategory::Uncertainty => "uncertainty",
            TriggerCategory::ComplexDecision => "complex_decision",
            TriggerCategory::CriticalOperation => "critical_operation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerMatch {
    pub category: TriggerCategory,
    pub pattern: &'static str,
}

impl fmt::Display for TriggerMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category.as_str(), self.pattern)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TriggerReport {
    pub triggered: bool,
    pub matches: Vec<TriggerMatch>,
}

struct CompiledPattern {
    source: &'static str,
    regex: Regex,
}

/// The three ordered trigger sets, compiled.
pub struct PatternTable {
    sets: Vec<(TriggerCategory, Vec<CompiledPattern>)>,
}

static PATTERN_TABLE: LazyLock<PatternTable> = LazyLock::new(PatternTable::compile);

impl PatternTable {
    fn compile() -> Self {
        let build = |patterns: &[&'static str]| {
            patterns
                .iter()
                .filter_map(|&source| {
                    match RegexBuilder::new(source).case_insensitive(true).build() {
                        Ok(regex) => Some(CompiledPattern { source, regex }),
                        Err(e) => {
                            tracing::error!(
                                pattern = source,
                                error = %e,
                                "skipping trigger pattern"
                            );
                            None
                        }
                    }
                })
                .collect::<Vec<_>>()
        };
        Self {
            sets: vec![
                (TriggerCategory::Uncertainty, build(UNCERTAINTY_PATTERNS)),
                (
                    TriggerCategory::ComplexDecision,
                    build(COMPLEX_DECISION_PATTERNS),
                ),
                (
                    TriggerCategory::CriticalOperation,
                    build(CRITICAL_OPERATION_PATTERNS),
                ),
            ],
        }
    }

    pub fn global() -> &'static PatternTable {
        &PATTERN_TABLE
    }

    pub fn len(&self) -> usize {
        self.sets.iter().map(|(_, p)| p.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every category/pattern pair present in `text`, in table order.
    pub fn scan(&self, text: &str) -> TriggerReport {
        if text.trim().is_empty() {
            return TriggerReport::default();
        }
        let matches: Vec<TriggerMatch> = self
            .sets
            .iter()
            .flat_map(|(category, patterns)| {
                patterns
                    .iter()
                    .filter(|p| p.regex.is_match(text))
                    .map(|p| TriggerMatch {
                        category: *category,
                        pattern: p.source,
                    })
            })
            .collect();
        if !matches.is_empty() {
            tracing::debug!(count = matches.len(), "trigger patterns detected");
        }
        TriggerReport {
            triggered: !matches.is_empty(),
            matches,
        }
    }
}

/// Scans `text` against the global trigger tables.
pub fn detect_triggers(text: &str) -> TriggerReport {
    PatternTable::global().scan(text)
}
