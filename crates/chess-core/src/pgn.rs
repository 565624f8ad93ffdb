//! PGN parsing utilities: lightweight regex-based parser.
//!
//! Only the first game of a multi-game file is read. Movetext tokens are kept
//! as written (minus move numbers, NAGs and annotation glyphs) so that a
//! malformed move survives parsing and can be reported against its own ply.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::game_data::{GameData, GameMetadata};

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[(\w+)\s+"([^"]*)"\]"#).expect("header regex"));
static VARIATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^()]*\)").expect("variation regex"));
static NAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\d+").expect("nag regex"));
static MOVE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.+").expect("move number regex"));

const RESULTS: [&str; 4] = ["1-0", "0-1", "1/2-1/2", "*"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PgnError {
    #[error("PGN is empty")]
    Empty,

    #[error("no moves found in PGN")]
    NoMoves,

    #[error("unterminated comment in movetext")]
    UnterminatedComment,

    #[error("unbalanced variation parentheses in movetext")]
    UnbalancedVariation,

    #[error("invalid FEN header: {0}")]
    InvalidFen(String),
}

/// Parse a PGN string into a GameData struct.
pub fn parse_pgn(pgn: &str) -> Result<GameData, PgnError> {
    if pgn.trim().is_empty() {
        return Err(PgnError::Empty);
    }
    let (tags, movetext) = first_game(pgn);

    let mut metadata = GameMetadata {
        white: "Unknown".to_string(),
        black: "Unknown".to_string(),
        result: "*".to_string(),
        ..GameMetadata::default()
    };

    for cap in HEADER_RE.captures_iter(tags) {
        let key = &cap[1];
        let value = cap[2].to_string();
        match key {
            "White" => metadata.white = value,
            "Black" => metadata.black = value,
            "Result" => metadata.result = value,
            "Event" => metadata.event = Some(value),
            "Site" => metadata.site = Some(value),
            "Date" => metadata.date = Some(value),
            "Round" => metadata.round = Some(value),
            "ECO" => metadata.eco = Some(value),
            "TimeControl" => metadata.time_control = Some(value),
            "FEN" => metadata.fen = Some(value),
            _ => {}
        }
    }

    let (moves, result) = extract_moves(movetext)?;
    if moves.is_empty() {
        return Err(PgnError::NoMoves);
    }
    if metadata.result == "*" {
        if let Some(result) = result {
            metadata.result = result;
        }
    }

    Ok(GameData { metadata, moves })
}

/// Split the first game into its tag section and its movetext. A tag line
/// after movetext starts the next game, unless it sits inside a brace comment.
fn first_game(pgn: &str) -> (&str, &str) {
    let mut movetext_start = None;
    let mut in_comment = false;
    let mut offset = 0;
    for line in pgn.split_inclusive('\n') {
        let trimmed = line.trim_start();
        match movetext_start {
            None if trimmed.starts_with('[') => {}
            None if trimmed.trim().is_empty() => {}
            None => movetext_start = Some(offset),
            Some(start) if !in_comment && trimmed.starts_with('[') => {
                return (&pgn[..start], &pgn[start..offset]);
            }
            Some(_) => {}
        }
        if movetext_start.is_some() {
            in_comment = comment_open_after(line, in_comment);
        }
        offset += line.len();
    }
    match movetext_start {
        Some(start) => (&pgn[..start], &pgn[start..]),
        None => (pgn, ""),
    }
}

/// Whether a brace comment is still open at the end of `line`.
fn comment_open_after(line: &str, mut in_comment: bool) -> bool {
    for c in line.chars() {
        match (in_comment, c) {
            (true, '}') => in_comment = false,
            (false, '{') => in_comment = true,
            // Rest-of-line comment: braces after it mean nothing
            (false, ';') => break,
            _ => {}
        }
    }
    in_comment
}

/// Replace `{...}` and `;` comments with whitespace. Inside a brace comment `;`
/// is ordinary text, and inside a `;` comment braces are.
fn strip_comments(movetext: &str) -> Result<String, PgnError> {
    let mut out = String::with_capacity(movetext.len());
    let mut chars = movetext.chars();
    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if !chars.by_ref().any(|c| c == '}') {
                    return Err(PgnError::UnterminatedComment);
                }
                out.push(' ');
            }
            '}' => return Err(PgnError::UnterminatedComment),
            ';' => {
                let _ = chars.by_ref().find(|&c| c == '\n');
                out.push('\n');
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

/// Extract movetext tokens (after removing comments and variations).
/// Returns the tokens and the termination marker, if one was found.
fn extract_moves(movetext: &str) -> Result<(Vec<String>, Option<String>), PgnError> {
    let mut movetext = strip_comments(movetext)?;
    // Variations nest, so peel off the innermost ones until none remain
    loop {
        let peeled = VARIATION_RE.replace_all(&movetext, " ").into_owned();
        if peeled == movetext {
            break;
        }
        movetext = peeled;
    }
    if movetext.contains('(') || movetext.contains(')') {
        return Err(PgnError::UnbalancedVariation);
    }

    let movetext = NAG_RE.replace_all(&movetext, " ");

    let mut moves = Vec::new();
    for raw in movetext.split_whitespace() {
        if RESULTS.contains(&raw) {
            return Ok((moves, Some(raw.to_string())));
        }
        let token = MOVE_NUMBER_RE.replace(raw, "");
        let token = token.trim_end_matches(['!', '?']);
        if token.is_empty() {
            continue;
        }
        moves.push(normalize_castling(token));
    }

    Ok((moves, None))
}

/// Some exporters write castling with zeros.
fn normalize_castling(token: &str) -> String {
    if let Some(rest) = token.strip_prefix("0-0-0") {
        format!("O-O-O{rest}")
    } else if let Some(rest) = token.strip_prefix("0-0") {
        format!("O-O{rest}")
    } else {
        token.to_string()
    }
}
