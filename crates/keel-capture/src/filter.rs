//! Relevance filter for the recall path.
//!
//! Decides whether an incoming user message is worth a memory lookup. The
//! rules are evaluated in a fixed order:
//!
//! 1. empty text is skipped;
//! 2. a casual opener (greeting, thanks, acknowledgement, farewell, yes/no,
//!    laughter or emoji, "how are you") is skipped regardless of length;
//! 3. short text (under 40 characters) with no `?` and no memory keyword is
//!    skipped;
//! 4. everything else is considered.

use std::sync::OnceLock;

use keel_types::BeforeResponseEvent;
use regex::RegexSet;

/// Text shorter than this (in characters) needs a signal to be considered.
pub const SHORT_TEXT_CHARS: usize = 40;

/// Case-insensitive substrings that mark decision, commitment, status or
/// scheduling talk.
pub const MEMORY_KEYWORDS: &[&str] = &[
    "decide",
    "decision",
    "decided",
    "approved",
    "approve",
    "agreed",
    "committed",
    "commitment",
    "deadline",
    "due date",
    "meeting",
    "recap",
    "priorit",
    "remember",
    "previously",
    "last time",
    "earlier",
    "status",
    "schedule",
    "budget",
    "plan",
    "roadmap",
    "milestone",
    "owner",
    "assigned",
    "discussed",
    "follow up",
    "follow-up",
    "action item",
    "blocker",
];

/// Kinds of casual opener, in pattern order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasualKind {
    Greeting,
    Thanks,
    Acknowledgement,
    Farewell,
    YesNo,
    Laughter,
    SmallTalk,
}

// Index i of CASUAL_PATTERNS maps to CASUAL_KINDS[i].
const CASUAL_PATTERNS: &[&str] = &[
    r"(?i)^\s*(hi|hey|hello|hiya|howdy|yo|sup|good\s+(morning|afternoon|evening))\b",
    r"(?i)^\s*(thanks|thank\s+you|thx|ty|cheers)\b",
    r"(?i)^\s*(ok|okay|k|kk|sure|got\s+it|cool|nice|great|awesome|perfect|sounds\s+good|alright|noted|np|no\s+worries)\b",
    r"(?i)^\s*(bye|goodbye|see\s+you|see\s+ya|later|cya|good\s+night|gn)\b",
    r"(?i)^\s*(yes|no|yep|yup|nope|yeah|nah)\b",
    r"(?i)^\s*((lol|lmao|rofl|ha(ha)+|he(he)+)\b|\p{Extended_Pictographic})",
    r"(?i)^\s*(how\s+are\s+you|how\s+are\s+u|how's\s+it\s+going|how\s+is\s+it\s+going)\b",
];

const CASUAL_KINDS: &[CasualKind] = &[
    CasualKind::Greeting,
    CasualKind::Thanks,
    CasualKind::Acknowledgement,
    CasualKind::Farewell,
    CasualKind::YesNo,
    CasualKind::Laughter,
    CasualKind::SmallTalk,
];

/// Why a message was not worth a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No text at all.
    Empty,
    /// Opens with casual filler.
    Casual(CasualKind),
    /// Short, with no question mark and no memory keyword.
    ShortWithoutSignal,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Empty => write!(f, "empty"),
            SkipReason::Casual(kind) => write!(f, "casual ({kind:?})"),
            SkipReason::ShortWithoutSignal => write!(f, "short without question or keyword"),
        }
    }
}

/// Verdict of the relevance filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relevance {
    /// Worth a memory lookup.
    Consider,
    /// Not worth a lookup.
    Skip(SkipReason),
}

impl Relevance {
    /// Whether memory should be consulted.
    pub fn should_consult(self) -> bool {
        matches!(self, Relevance::Consider)
    }
}

/// Prioritized rule list classifying casual chat. Pure and deterministic.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    casual: RegexSet,
}

impl RelevanceFilter {
    /// Compile the filter.
    pub fn new() -> Self {
        let casual = RegexSet::new(CASUAL_PATTERNS).expect("casual patterns are valid regexes");
        Self { casual }
    }

    /// Process-wide compiled filter.
    pub fn global() -> &'static Self {
        static FILTER: OnceLock<RelevanceFilter> = OnceLock::new();
        FILTER.get_or_init(RelevanceFilter::new)
    }

    /// Classify a candidate text.
    pub fn classify(&self, text: &str) -> Relevance {
        let text = text.trim();
        if text.is_empty() {
            return Relevance::Skip(SkipReason::Empty);
        }

        if let Some(index) = self.casual.matches(text).iter().next() {
            return Relevance::Skip(SkipReason::Casual(CASUAL_KINDS[index]));
        }

        if text.chars().count() < SHORT_TEXT_CHARS && !text.contains('?') && !has_keyword(text) {
            return Relevance::Skip(SkipReason::ShortWithoutSignal);
        }

        Relevance::Consider
    }
}

impl Default for RelevanceFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the text contains any memory keyword (case-insensitive).
pub fn has_keyword(text: &str) -> bool {
    let lowered = text.to_lowercase();
    MEMORY_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

/// Whether a candidate text is worth a memory lookup.
pub fn should_consult_memory(text: &str) -> bool {
    RelevanceFilter::global().classify(text).should_consult()
}

/// Pick the text the recall path should evaluate.
///
/// Prefers the most recent user message in the event's message list; falls
/// back to the flat prompt only when no message list was sent.
pub fn select_recall_text(event: &BeforeResponseEvent) -> Option<String> {
    match &event.messages {
        Some(_) => event.last_user_text(),
        None => event
            .prompt
            .as_ref()
            .filter(|p| !p.trim().is_empty())
            .cloned(),
    }
}
