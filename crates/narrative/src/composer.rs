use crate::base_table::BaseTable;
use crate::error::Result;
use crate::text::as_clause;
use haqei_iching::{Action, HexagramTable, LineRef, PathSignature, PathWalker, Step};
use serde::Serialize;
use std::sync::Arc;

const ORDINALS: [&str; 3] = ["まず、", "続いて、", "最後に、"];
const CLOSING: &str = "この流れを踏まえ、一歩ずつ次の行動を選んでいきましょう。";
/// Marker shown wherever content could not be composed
pub const PLACEHOLDER_TEXT: &str = "（内容準備中）";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComposerOptions {
    /// Use `summary_plain` when a row has one
    pub prefer_plain: bool,
}

/// One step of a composed narrative, with the names it was rendered from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedStep {
    #[serde(flatten)]
    pub step: Step,
    pub hexagram_name: String,
    pub line_name: String,
    pub keyword: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedNarrative {
    pub start: LineRef,
    pub signature: PathSignature,
    pub steps: Vec<ComposedStep>,
    pub sentences: Vec<String>,
    pub closing: String,
    /// Set when the text is a placeholder rather than composed content
    pub placeholder: bool,
}

impl ComposedNarrative {
    /// Sentences followed by the closing, joined without separators
    #[must_use]
    pub fn text(&self) -> String {
        let mut text = self.sentences.concat();
        text.push_str(&self.closing);
        text
    }
}

/// Builds a three-sentence narrative from the base table along a walked path
#[derive(Debug, Clone)]
pub struct NarrativeComposer {
    base: Arc<BaseTable>,
    walker: PathWalker,
    options: ComposerOptions,
}

impl NarrativeComposer {
    #[must_use]
    pub fn new(base: Arc<BaseTable>, walker: PathWalker, options: ComposerOptions) -> Self {
        Self {
            base,
            walker,
            options,
        }
    }

    #[must_use]
    pub fn base(&self) -> &BaseTable {
        &self.base
    }

    #[must_use]
    pub fn walker(&self) -> &PathWalker {
        &self.walker
    }

    /// Walk the path and render one sentence per step.
    ///
    /// Fails with `MissingData` if any step lands on a line the base table lacks.
    pub fn compose(&self, start: LineRef, signature: PathSignature) -> Result<ComposedNarrative> {
        let hexagrams = HexagramTable::king_wen();
        let steps = self.walker.walk(start, signature);

        let mut composed = Vec::with_capacity(steps.len());
        let mut sentences = Vec::with_capacity(steps.len());
        for (idx, step) in steps.iter().enumerate() {
            let row = self.base.require(step.line_ref())?;
            let keyword = row.top_keyword().map(str::to_string);

            let mut sentence = format!(
                "{}{}て{}の{}に至り、",
                ORDINALS[idx],
                verb(step.action),
                row.hexagram_name,
                row.line_name
            );
            if let Some(kw) = &keyword {
                sentence.push_str(&format!("「{kw}」を手がかりに"));
            }
            sentence.push_str(&as_clause(row.summary_text(self.options.prefer_plain)));
            sentence.push('。');
            sentences.push(sentence);

            composed.push(ComposedStep {
                step: *step,
                hexagram_name: hexagrams.name(step.hexagram).to_string(),
                line_name: row.line_name.clone(),
                keyword,
            });
        }

        Ok(ComposedNarrative {
            start,
            signature,
            steps: composed,
            sentences,
            closing: CLOSING.to_string(),
            placeholder: false,
        })
    }

    /// Like [`compose`](Self::compose), but degrades to a marked placeholder
    /// and logs the integrity problem instead of returning it
    #[must_use]
    pub fn compose_or_placeholder(&self, start: LineRef, signature: PathSignature) -> ComposedNarrative {
        match self.compose(start, signature) {
            Ok(narrative) => narrative,
            Err(e) => {
                log::warn!("Composing {start} {signature} failed, using placeholder: {e}");
                self.placeholder(start, signature)
            }
        }
    }

    fn placeholder(&self, start: LineRef, signature: PathSignature) -> ComposedNarrative {
        let hexagrams = HexagramTable::king_wen();
        let steps = self
            .walker
            .walk(start, signature)
            .iter()
            .map(|step| ComposedStep {
                step: *step,
                hexagram_name: hexagrams.name(step.hexagram).to_string(),
                line_name: step.line_ref().yao_label(hexagrams),
                keyword: None,
            })
            .collect();

        ComposedNarrative {
            start,
            signature,
            steps,
            sentences: vec![PLACEHOLDER_TEXT.to_string()],
            closing: String::new(),
            placeholder: true,
        }
    }
}

fn verb(action: Action) -> &'static str {
    match action {
        Action::Advance => "テーマを深め",
        Action::Transform => "視点を転換し",
    }
}
