//! Obtaining one move from the side to move.

use std::fmt;
use std::time::{Duration, Instant};

use agent_llm::{LanguageModel, ModelError, ModelSettings};
use engine_analysis::format::{best_move_san, format_evaluation, format_principal_variation};
use engine_analysis::{EngineError, EngineStrength, Evaluator};
use thiserror::Error;

use crate::board::ChessGame;
use crate::prompt::build_prompt;
use crate::reconcile::{clean_response, MatchRule, MovePolicy, ResolutionFailure};

/// Who is asked for the next move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mover {
    Agent,
    Engine,
}

impl fmt::Display for Mover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mover::Agent => f.write_str("Agent"),
            Mover::Engine => f.write_str("Stockfish"),
        }
    }
}

/// A failed turn.
#[derive(Error, Debug)]
pub enum TurnError {
    /// The agent did not answer within the turn timeout.
    #[error("Agent response timeout after {} seconds", .0.as_secs())]
    Timeout(Duration),
    /// The model call failed.
    #[error("Agent error: {0}")]
    Agent(#[from] ModelError),
    /// The engine failed or its best move could not be used.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    /// The candidate did not resolve to a legal move.
    #[error("{mover} produced an invalid move: {failure}")]
    InvalidMove {
        mover: Mover,
        failure: ResolutionFailure,
    },
}

impl TurnError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TurnError::Timeout(_))
    }
}

/// A move accepted by the reconciler, not yet applied to the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedMove {
    /// Legal move in SAN.
    pub san: String,
    /// Cleaned candidate text the move was resolved from.
    pub candidate: String,
    pub rule: MatchRule,
}

/// Per-turn settings.
#[derive(Debug, Clone)]
pub struct TurnOptions {
    pub agent_timeout: Duration,
    pub depth: u32,
    pub strength: EngineStrength,
    /// Include position commentary in agent prompts.
    pub commentary: bool,
}

/// Asks the agent or the engine for a move and reconciles it.
pub struct TurnDriver<M, E> {
    model: M,
    engine: E,
    policy: Box<dyn MovePolicy>,
    settings: ModelSettings,
    options: TurnOptions,
}

impl<M: LanguageModel, E: Evaluator> TurnDriver<M, E> {
    pub fn new(
        model: M,
        engine: E,
        policy: Box<dyn MovePolicy>,
        settings: ModelSettings,
        options: TurnOptions,
    ) -> Self {
        Self {
            model,
            engine,
            policy,
            settings,
            options,
        }
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn options(&self) -> &TurnOptions {
        &self.options
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Obtains a legal move for the side to move. The game is not modified.
    pub async fn take_turn(
        &mut self,
        game: &ChessGame,
        mover: Mover,
    ) -> Result<AcceptedMove, TurnError> {
        let raw = match mover {
            Mover::Agent => self.agent_candidate(game).await?,
            Mover::Engine => self.engine_candidate(game).await?,
        };
        let candidate = clean_response(&raw);
        tracing::info!("{} move: \"{}\"", mover, candidate);

        let legal = game.legal_moves();
        let resolution = self
            .policy
            .resolve(&candidate, &legal)
            .map_err(|failure| TurnError::InvalidMove { mover, failure })?;
        if resolution.rule != MatchRule::Exact {
            tracing::info!(
                "Corrected \"{}\" to {} ({} match)",
                candidate,
                resolution.mv,
                resolution.rule
            );
        }

        Ok(AcceptedMove {
            san: resolution.mv,
            candidate,
            rule: resolution.rule,
        })
    }

    async fn agent_candidate(&self, game: &ChessGame) -> Result<String, TurnError> {
        let prompt = build_prompt(game, game.turn(), self.options.commentary);
        tracing::info!(
            "{} thinking... ({})",
            self.settings.model,
            if self.options.commentary { "with commentary" } else { "no commentary" }
        );

        let started = Instant::now();
        let timeout = self.options.agent_timeout;
        let response = tokio::time::timeout(timeout, self.model.generate(&prompt, &self.settings))
            .await
            .map_err(|_| TurnError::Timeout(timeout))??;
        tracing::debug!("Agent answered in {:.2}s", started.elapsed().as_secs_f64());
        Ok(response)
    }

    async fn engine_candidate(&mut self, game: &ChessGame) -> Result<String, TurnError> {
        let fen = game.fen();
        let eval = self
            .engine
            .evaluate(&fen, self.options.depth, self.options.strength)
            .await?;

        if let Some(line) = eval.top_line() {
            tracing::info!("Stockfish eval: {} (depth {})", format_evaluation(line), line.depth);
            tracing::info!("Best line: {}", format_principal_variation(&line.pv, &fen));
        }

        let san = best_move_san(&fen, &eval)
            .map_err(|e| EngineError::InvalidResponse(e.to_string()))?;
        Ok(san)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::reconcile::FuzzyMatch;
    use agent_llm::Provider;
    use async_trait::async_trait;
    use engine_analysis::{Evaluation, LineEval, PositionEval};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// One scripted model reply.
    #[derive(Debug, Clone)]
    pub(crate) enum Reply {
        Text(String),
        Fail,
        /// Never answers; trips the turn timeout.
        Hang,
    }

    /// Model that replays a script, then repeats its last entry.
    #[derive(Debug)]
    pub(crate) struct ScriptedModel {
        replies: Mutex<VecDeque<Reply>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        pub(crate) fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn text(moves: &[&str]) -> Self {
            Self::new(moves.iter().map(|m| Reply::Text(m.to_string())).collect())
        }

        pub(crate) fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn generate(&self, prompt: &str, _settings: &ModelSettings) -> Result<String, ModelError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let reply = {
                let mut replies = self.replies.lock().unwrap();
                if replies.len() > 1 {
                    replies.pop_front()
                } else {
                    replies.front().cloned()
                }
            };
            match reply {
                Some(Reply::Text(text)) => Ok(text),
                Some(Reply::Hang) => {
                    std::future::pending::<()>().await;
                    Err(ModelError::EmptyResponse)
                }
                Some(Reply::Fail) | None => Err(ModelError::EmptyResponse),
            }
        }
    }

    /// Model that plays the first legal move listed in the prompt.
    #[derive(Debug, Default)]
    pub(crate) struct FirstLegalModel;

    #[async_trait]
    impl LanguageModel for FirstLegalModel {
        async fn generate(&self, prompt: &str, _settings: &ModelSettings) -> Result<String, ModelError> {
            prompt
                .lines()
                .skip_while(|l| *l != "### Legal moves:")
                .nth(1)
                .and_then(|line| line.split(',').next())
                .map(str::to_string)
                .ok_or(ModelError::EmptyResponse)
        }
    }

    /// Engine that answers with the first legal move in UCI notation.
    #[derive(Debug, Default)]
    pub(crate) struct FirstLegalEngine {
        pub(crate) new_games: u32,
        pub(crate) fail_new_game: bool,
        pub(crate) fail_evaluate: bool,
    }

    #[async_trait]
    impl Evaluator for FirstLegalEngine {
        async fn new_game(&mut self) -> Result<(), EngineError> {
            if self.fail_new_game {
                return Err(EngineError::Closed);
            }
            self.new_games += 1;
            Ok(())
        }

        async fn evaluate(
            &mut self,
            fen: &str,
            depth: u32,
            _strength: EngineStrength,
        ) -> Result<PositionEval, EngineError> {
            use shakmaty::uci::UciMove;
            use shakmaty::{CastlingMode, Position};

            if self.fail_evaluate {
                return Err(EngineError::InvalidResponse("scripted failure".to_string()));
            }
            let game = ChessGame::from_fen(fen)
                .map_err(|e| EngineError::InvalidResponse(e.to_string()))?;
            let best = game
                .position()
                .legal_moves()
                .first()
                .map(|m| UciMove::from_move(m, CastlingMode::Standard).to_string());
            Ok(PositionEval {
                lines: best
                    .iter()
                    .map(|mv| LineEval {
                        multipv: 1,
                        depth,
                        evaluation: Evaluation::Centipawns(0),
                        pv: vec![mv.clone()],
                    })
                    .collect(),
                best_move: best,
            })
        }
    }

    pub(crate) fn settings() -> ModelSettings {
        ModelSettings::new(Provider::Google, "test-model", "key")
    }

    pub(crate) fn options() -> TurnOptions {
        TurnOptions {
            agent_timeout: Duration::from_millis(50),
            depth: 1,
            strength: EngineStrength::SkillLevel(0),
            commentary: false,
        }
    }

    fn driver<M: LanguageModel>(model: M) -> TurnDriver<M, FirstLegalEngine> {
        TurnDriver::new(
            model,
            FirstLegalEngine::default(),
            Box::new(FuzzyMatch),
            settings(),
            options(),
        )
    }

    #[tokio::test]
    async fn test_agent_bold_move_is_resolved() {
        let mut driver = driver(ScriptedModel::text(&["**Nf3**"]));
        let game = ChessGame::new();
        let accepted = driver.take_turn(&game, Mover::Agent).await.unwrap();
        assert_eq!(accepted.san, "Nf3");
        assert_eq!(accepted.candidate, "Nf3");
        assert_eq!(game.ply_count(), 0);
    }

    #[tokio::test]
    async fn test_agent_commentary_after_move() {
        let mut driver = driver(ScriptedModel::text(&["e4\nbecause it controls the centre"]));
        let accepted = driver.take_turn(&ChessGame::new(), Mover::Agent).await.unwrap();
        assert_eq!(accepted.san, "e4");
        assert_eq!(accepted.rule, MatchRule::Exact);
    }

    #[tokio::test]
    async fn test_agent_timeout() {
        let mut driver = driver(ScriptedModel::new(vec![Reply::Hang]));
        let err = driver.take_turn(&ChessGame::new(), Mover::Agent).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().starts_with("Agent response timeout"));
    }

    #[tokio::test]
    async fn test_agent_failure_is_agent_error() {
        let mut driver = driver(ScriptedModel::new(vec![Reply::Fail]));
        let err = driver.take_turn(&ChessGame::new(), Mover::Agent).await.unwrap_err();
        assert!(matches!(err, TurnError::Agent(_)));
        assert!(!err.is_timeout());
    }

    #[tokio::test]
    async fn test_agent_illegal_move() {
        let mut driver = driver(ScriptedModel::text(&["Qxf7#"]));
        let err = driver.take_turn(&ChessGame::new(), Mover::Agent).await.unwrap_err();
        match err {
            TurnError::InvalidMove { mover, failure } => {
                assert_eq!(mover, Mover::Agent);
                assert_eq!(failure.candidate, "Qxf7#");
                assert_eq!(failure.legal.len(), 20);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_engine_move_in_san() {
        let mut driver = driver(ScriptedModel::text(&["unused"]));
        let game = ChessGame::new();
        let accepted = driver.take_turn(&game, Mover::Engine).await.unwrap();
        assert!(game.legal_moves().contains(&accepted.san));
    }

    #[tokio::test]
    async fn test_engine_failure_is_engine_error() {
        let mut driver = driver(ScriptedModel::text(&["unused"]));
        driver.engine_mut().fail_evaluate = true;
        let err = driver.take_turn(&ChessGame::new(), Mover::Engine).await.unwrap_err();
        assert!(matches!(err, TurnError::Engine(_)));
    }

    #[tokio::test]
    async fn test_commentary_reaches_prompt() {
        let model = ScriptedModel::text(&["e4"]);
        let mut driver = TurnDriver::new(
            model,
            FirstLegalEngine::default(),
            Box::new(FuzzyMatch),
            settings(),
            TurnOptions {
                commentary: true,
                ..options()
            },
        );
        driver.take_turn(&ChessGame::new(), Mover::Agent).await.unwrap();
        let prompts = driver.model.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Tactical notes:"));
    }
}
