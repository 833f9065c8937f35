//! Agent prompt construction.

use crate::board::{ChessGame, Side};
use crate::commentary;

/// Builds the move request sent to the agent playing `agent_color`.
///
/// With `commentary` set, the position summary and tactical notes from
/// [`commentary::describe`] sit between the header and the legal moves.
pub fn build_prompt(game: &ChessGame, agent_color: Side, commentary: bool) -> String {
    let mut prompt = format!(
        "You are playing a chess game. Current position FEN: {}\nYou are playing as {}.\n\n",
        game.fen(),
        agent_color
    );
    if commentary {
        prompt.push_str(&commentary::describe(game));
        prompt.push('\n');
    }
    prompt.push_str("### Legal moves:\n");
    prompt.push_str(&game.legal_moves().join(","));
    prompt.push_str("\n\nReturn ONLY the best LEGAL move in standard algebraic notation (SAN) format.\n");
    prompt.push_str("Do not include any explanation, analysis, or additional text. Just the move.");
    prompt
}
