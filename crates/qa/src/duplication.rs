use crate::config::DuplicationConfig;
use haqei_narrative::{similarity, NarrativeEntry, Stages};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    First,
    Second,
    Final,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::First => "first",
            Stage::Second => "second",
            Stage::Final => "final",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DuplicationIssue {
    /// The headline just restates the final stage
    HeadlineRepeatsFinal { similarity: f64 },
    /// Two stages say nearly the same thing
    StagesOverlap { a: Stage, b: Stage, similarity: f64 },
    ShortHeadline { chars: usize, min: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicationFinding {
    pub key: String,
    /// Whether the checked text came from the easy variant
    pub easy: bool,
    #[serde(flatten)]
    pub issue: DuplicationIssue,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DuplicationReport {
    pub checked: usize,
    pub skipped_placeholders: usize,
    pub findings: Vec<DuplicationFinding>,
}

impl DuplicationReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Text the reader actually sees: the easy variant when there is one
fn displayed(entry: &NarrativeEntry) -> (&str, &Stages, bool) {
    match &entry.easy {
        Some(easy) => {
            let headline = if easy.headline.trim().is_empty() {
                entry.headline.as_str()
            } else {
                easy.headline.as_str()
            };
            let stages = easy
                .stages
                .as_ref()
                .filter(|stages| stages.is_complete())
                .unwrap_or(&entry.stages);
            (headline, stages, true)
        }
        None => (entry.headline.as_str(), &entry.stages, false),
    }
}

/// Check every non-placeholder entry for repeated text and short headlines
pub fn check_duplication<'a>(
    entries: impl IntoIterator<Item = (&'a str, &'a NarrativeEntry)>,
    config: &DuplicationConfig,
) -> DuplicationReport {
    let mut report = DuplicationReport::default();
    let threshold = config.similarity_threshold;

    for (key, entry) in entries {
        if entry.placeholder {
            report.skipped_placeholders += 1;
            continue;
        }
        report.checked += 1;

        let (headline, stages, easy) = displayed(entry);
        let mut push = |issue| {
            report.findings.push(DuplicationFinding {
                key: key.to_string(),
                easy,
                issue,
            });
        };

        let score = similarity(headline, &stages.last);
        if score >= threshold {
            push(DuplicationIssue::HeadlineRepeatsFinal { similarity: score });
        }

        let pairs = [
            (Stage::First, &stages.first, Stage::Second, &stages.second),
            (Stage::First, &stages.first, Stage::Final, &stages.last),
            (Stage::Second, &stages.second, Stage::Final, &stages.last),
        ];
        for (a, text_a, b, text_b) in pairs {
            let score = similarity(text_a, text_b);
            if score >= threshold {
                push(DuplicationIssue::StagesOverlap {
                    a,
                    b,
                    similarity: score,
                });
            }
        }

        let chars = headline.trim().chars().count();
        if chars < config.min_headline_chars {
            push(DuplicationIssue::ShortHeadline {
                chars,
                min: config.min_headline_chars,
            });
        }
    }

    if !report.is_clean() {
        log::info!(
            "Duplication check flagged {} issues in {} entries",
            report.findings.len(),
            report.checked
        );
    }
    report
}
