//! System instruction variants.

use std::fmt;
use std::str::FromStr;

/// Placeholder replaced by the requested output language.
const LANGUAGE_PLACEHOLDER: &str = "ENGLISH";

const POSITION_INSTRUCTION: &str = "You are ChessAgine, a strong chess assistant. \
Reason about the position concretely: king safety, piece activity, pawn structure \
and forcing moves (checks, captures, threats) before anything else. \
Only ever propose moves that appear in the legal move list you are given. \
Respond in ENGLISH.";

const PUZZLE_INSTRUCTION: &str = "You are ChessAgine, a chess puzzle coach. \
Look for the forcing sequence the position contains and verify every move against \
the legal move list before answering. Respond in ENGLISH.";

const ANNOTATION_INSTRUCTION: &str = "You are ChessAgine, a chess annotator. \
Comment on the played moves, naming the plans and the tactical ideas for both sides. \
Respond in ENGLISH.";

const BENCH_NO_COMMENTARY_INSTRUCTION: &str = "You are a chess player";

/// Selects the system instruction used for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstructionMode {
    /// General position analysis.
    #[default]
    Position,
    Puzzle,
    Annotation,
    /// Benchmark play with position commentary in the prompt.
    Bench,
    /// Benchmark play from FEN and legal moves only.
    BenchNoCommentary,
}

impl InstructionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstructionMode::Position => "position",
            InstructionMode::Puzzle => "puzzle",
            InstructionMode::Annotation => "annotation",
            InstructionMode::Bench => "bench",
            InstructionMode::BenchNoCommentary => "bench-no-ccp",
        }
    }
}

impl fmt::Display for InstructionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstructionMode {
    type Err = std::convert::Infallible;

    /// Unknown tags fall back to [`InstructionMode::Position`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "puzzle" => InstructionMode::Puzzle,
            "annotation" => InstructionMode::Annotation,
            "bench" => InstructionMode::Bench,
            "bench-no-ccp" => InstructionMode::BenchNoCommentary,
            _ => InstructionMode::Position,
        })
    }
}

/// Returns the system instruction for `mode`, answering in `language`.
pub fn system_instruction(mode: InstructionMode, language: &str) -> String {
    let template = match mode {
        InstructionMode::Puzzle => PUZZLE_INSTRUCTION,
        InstructionMode::Annotation => ANNOTATION_INSTRUCTION,
        InstructionMode::BenchNoCommentary => BENCH_NO_COMMENTARY_INSTRUCTION,
        InstructionMode::Position | InstructionMode::Bench => POSITION_INSTRUCTION,
    };
    let language = if language.trim().is_empty() {
        "English"
    } else {
        language
    };
    template.replace(LANGUAGE_PLACEHOLDER, language)
}
