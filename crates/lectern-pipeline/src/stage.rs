//! Analysis stages: prompts, artifact names, dependencies, and
//! chunk-combination policies.

use serde::{Deserialize, Serialize};

/// One discrete analysis task producing one named artifact per session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    /// 6-10 line summary for administrators.
    ExecutiveSummary,
    /// Teaching-and-learning analysis for curriculum developers.
    PedagogicalAnalysis,
    /// 3-5 breakthrough moments with quoted exchanges.
    AhaMoments,
    /// Speaker statistics plus a qualitative engagement analysis.
    EngagementMetrics,
    /// Single-paragraph condensation of the executive summary.
    ConciseSummary,
}

/// How per-chunk partial results are combined for a stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CombinePolicy {
    /// Concatenate partials, then ask the provider to merge them into one
    /// coherent output. Concatenation is kept if the merge call fails.
    Reduce,
    /// Concatenate partial lists; no extra call.
    Concatenate,
}

/// Fixed execution order. ConciseSummary runs last because it consumes the
/// executive summary, not the raw transcript.
pub const ORDERED: [AnalysisStage; 5] = [
    AnalysisStage::ExecutiveSummary,
    AnalysisStage::PedagogicalAnalysis,
    AnalysisStage::AhaMoments,
    AnalysisStage::EngagementMetrics,
    AnalysisStage::ConciseSummary,
];

impl AnalysisStage {
    /// Artifact file name for this stage.
    pub fn artifact_name(self) -> &'static str {
        match self {
            Self::ExecutiveSummary => "executive_summary.md",
            Self::PedagogicalAnalysis => "pedagogical_analysis.md",
            Self::AhaMoments => "aha_moments.md",
            Self::EngagementMetrics => "engagement_metrics.json",
            Self::ConciseSummary => "concise_summary.md",
        }
    }

    /// The stage whose artifact this stage consumes, if any.
    pub fn dependency(self) -> Option<AnalysisStage> {
        match self {
            Self::ConciseSummary => Some(Self::ExecutiveSummary),
            _ => None,
        }
    }

    /// Chunk-combination policy for this stage.
    pub fn combine_policy(self) -> CombinePolicy {
        match self {
            Self::ExecutiveSummary | Self::PedagogicalAnalysis | Self::ConciseSummary => {
                CombinePolicy::Reduce
            }
            Self::AhaMoments | Self::EngagementMetrics => CombinePolicy::Concatenate,
        }
    }

    /// Stable lowercase name for logs and reports.
    pub fn name(self) -> &'static str {
        match self {
            Self::ExecutiveSummary => "executive_summary",
            Self::PedagogicalAnalysis => "pedagogical_analysis",
            Self::AhaMoments => "aha_moments",
            Self::EngagementMetrics => "engagement_metrics",
            Self::ConciseSummary => "concise_summary",
        }
    }

    /// Build the full prompt for this stage from its input text
    /// (transcript, stats summary, or executive summary per stage).
    pub fn build_prompt(self, input: &str) -> String {
        match self {
            Self::ExecutiveSummary => format!(
                "You're analyzing a transcript from an educational session.\n\
                 Create a concise 6-10 line executive summary highlighting:\n\
                 1. Main topics covered\n\
                 2. Key teaching approaches used\n\
                 3. Overall participant engagement\n\
                 4. Notable outcomes or decisions\n\
                 5. Areas of potential follow-up\n\n\
                 Format this summary for school administrators who need a quick overview.\n\n\
                 Transcript:\n{input}"
            ),
            Self::PedagogicalAnalysis => format!(
                "Analyze this educational session transcript from a teaching and learning perspective.\n\
                 In approximately 1.5 pages:\n\
                 1. Identify the teaching strategies and methodologies employed\n\
                 2. Evaluate the effectiveness of content delivery and knowledge building\n\
                 3. Assess the scaffolding of concepts and learning progression\n\
                 4. Note examples of effective questioning and discussion facilitation\n\
                 5. Suggest potential improvements or alternative approaches\n\n\
                 This analysis will be used by curriculum developers and instructional coaches.\n\n\
                 Transcript:\n{input}"
            ),
            Self::AhaMoments => format!(
                "Identify 3-5 \"AHA moments\" in this educational session transcript.\n\
                 For each moment:\n\
                 1. Quote the relevant exchange\n\
                 2. Explain why this represents a breakthrough in understanding\n\
                 3. Note the teaching technique that facilitated this insight\n\
                 4. Suggest how similar moments could be cultivated in future sessions\n\n\
                 Transcript:\n{input}"
            ),
            Self::EngagementMetrics => format!(
                "You are analyzing the engagement patterns in an educational session.\n\
                 Based on the following speaker statistics, provide a brief qualitative\n\
                 analysis of engagement patterns.\n\n\
                 Speaker Statistics (top participants by speaking time):\n{input}\n\n\
                 In your analysis, please address:\n\
                 1. The balance of participation among speakers\n\
                 2. Any notable patterns in engagement\n\
                 3. Suggestions for improving engagement in future sessions\n\n\
                 Keep your analysis concise (about 200-300 words) and focused on engagement patterns."
            ),
            Self::ConciseSummary => format!(
                "You are tasked with creating an extremely concise summary of an\n\
                 educational session for school leaders.\n\n\
                 The summary must be:\n\
                 1. EXACTLY 6-10 lines (not bullet points)\n\
                 2. Written as a single paragraph\n\
                 3. Focused on the key topics, approaches, and outcomes\n\
                 4. Clear and direct without academic jargon\n\n\
                 Here is the longer executive summary that needs to be condensed:\n\n{input}\n\n\
                 Create ONLY the concise 6-10 line paragraph summary with no additional\n\
                 text, explanations, or headers."
            ),
        }
    }

    /// Build the prompt for one chunk of an oversized input. The preamble
    /// keeps narrative context across sequentially processed chunks.
    pub fn build_chunk_prompt(self, index: usize, total: usize, chunk_text: &str) -> String {
        let part = index + 1;
        let preamble = format!(
            "The input below is part {part} of {total} of a longer document. \
             Analyze this part on its own; partial results will be combined afterwards.\n\n"
        );
        format!("{preamble}{}", self.build_prompt(chunk_text))
    }

    /// Build the reduce prompt that merges per-chunk partial results.
    pub fn build_reduce_prompt(self, partials: &str) -> String {
        format!(
            "The following are partial results produced from consecutive parts of one\n\
             longer educational-session document. Merge them into a single coherent\n\
             output of the same kind, removing duplication and keeping chronology.\n\n\
             Partial results:\n\n{partials}"
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
