// THEORY:
// Solving is somebody else's job. The `SolverGateway` trait is the seam: it takes
// the 54-letter facelet string and either returns a move sequence or says the
// configuration cannot be solved. Callers must handle both; there is no catch-all.
//
// `CommandSolver` runs an external two-phase solver program (by default the
// `kociemba` command-line tool) with the facelet string as its last argument and
// reads the moves from stdout. Strings that break the input contract are rejected
// before anything is spawned, and the solved state is answered directly with an
// empty sequence.

use crate::core_modules::notation::is_well_formed;
use crate::error::{Result, ScanError};
use serde::Serialize;
use std::fmt;
use std::process::Command;
use std::str::FromStr;
use tracing::{debug, warn};

/// Facelet string of a solved cube.
pub const SOLVED_NOTATION: &str = "UUUUUUUUURRRRRRRRRFFFFFFFFFDDDDDDDDDLLLLLLLLLBBBBBBBBB";

/// A move sequence in standard notation, e.g. `R U R' U2`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Solution {
    pub moves: Vec<String>,
}

impl Solution {
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.moves.join(" "))
    }
}

fn is_move(token: &str) -> bool {
    let mut chars = token.chars();
    let face_ok = matches!(chars.next(), Some('U' | 'R' | 'F' | 'D' | 'L' | 'B'));
    let suffix: String = chars.collect();
    face_ok && matches!(suffix.as_str(), "" | "'" | "2" | "2'")
}

impl FromStr for Solution {
    type Err = ScanError;

    fn from_str(text: &str) -> Result<Self> {
        let moves: Vec<String> = text.split_whitespace().map(str::to_owned).collect();
        if let Some(bad) = moves.iter().find(|token| !is_move(token)) {
            return Err(ScanError::UnsolvableConfiguration(format!(
                "solver returned an unrecognised move `{bad}`"
            )));
        }
        Ok(Solution { moves })
    }
}

/// The external solving engine.
pub trait SolverGateway {
    /// Solves a 54-letter facelet string over `URFDLB`.
    fn solve(&self, facelets: &str) -> Result<Solution>;
}

impl<F> SolverGateway for F
where
    F: Fn(&str) -> Result<Solution>,
{
    fn solve(&self, facelets: &str) -> Result<Solution> {
        self(facelets)
    }
}

/// Runs an external solver program per request.
#[derive(Debug, Clone)]
pub struct CommandSolver {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for CommandSolver {
    fn default() -> Self {
        Self {
            command: "kociemba".to_string(),
            args: Vec::new(),
        }
    }
}

impl CommandSolver {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

impl SolverGateway for CommandSolver {
    fn solve(&self, facelets: &str) -> Result<Solution> {
        if !is_well_formed(facelets) {
            return Err(ScanError::UnsolvableConfiguration(
                "facelet string must hold 54 letters, nine of each face".to_string(),
            ));
        }
        if facelets == SOLVED_NOTATION {
            return Ok(Solution::default());
        }

        debug!(command = %self.command, %facelets, "invoking solver");
        let output = Command::new(&self.command)
            .args(&self.args)
            .arg(facelets)
            .output()
            .map_err(|e| ScanError::SolverUnavailable(format!("{}: {e}", self.command)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        if !output.status.success() || stdout.starts_with("Error") {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or(stdout)
                .trim()
                .to_string();
            warn!(status = ?output.status.code(), %reason, "solver rejected cube");
            return Err(ScanError::UnsolvableConfiguration(if reason.is_empty() {
                "solver rejected the facelet string".to_string()
            } else {
                reason
            }));
        }

        stdout.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solved_state_needs_no_moves() {
        let solver = CommandSolver::new("definitely-not-installed-solver", Vec::new());
        assert_eq!(solver.solve(SOLVED_NOTATION), Ok(Solution::default()));
    }

    #[test]
    fn malformed_strings_are_rejected_before_spawning() {
        let solver = CommandSolver::new("definitely-not-installed-solver", Vec::new());
        assert!(matches!(
            solver.solve("UUU"),
            Err(ScanError::UnsolvableConfiguration(_))
        ));
    }

    #[test]
    fn missing_program_is_unavailable() {
        let solver = CommandSolver::new("definitely-not-installed-solver", Vec::new());
        let scrambled = "DRLUUBFBRBLURRLRUBLRDDFDLFUFUFFDBRDUBRUFLLFDDBFLUBLRBD";
        assert!(matches!(
            solver.solve(scrambled),
            Err(ScanError::SolverUnavailable(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn stdout_moves_are_parsed() {
        // `echo` prints its arguments, so the configured args become the "solution".
        let solver = CommandSolver::new("sh", vec!["-c".into(), "echo R U2 \"F'\"".into()]);
        let scrambled = "DRLUUBFBRBLURRLRUBLRDDFDLFUFUFFDBRDUBRUFLLFDDBFLUBLRBD";
        let solution = solver.solve(scrambled).unwrap();
        assert_eq!(solution.moves, vec!["R", "U2", "F'"]);
        assert_eq!(solution.to_string(), "R U2 F'");
    }

    #[cfg(unix)]
    #[test]
    fn failing_program_is_unsolvable() {
        let solver = CommandSolver::new(
            "sh",
            vec!["-c".into(), "echo 'Error: corner twist' >&2; exit 1".into()],
        );
        let scrambled = "DRLUUBFBRBLURRLRUBLRDDFDLFUFUFFDBRDUBRUFLLFDDBFLUBLRBD";
        assert_eq!(
            solver.solve(scrambled),
            Err(ScanError::UnsolvableConfiguration("Error: corner twist".into()))
        );
    }

    #[test]
    fn parsing_rejects_garbage() {
        assert_eq!("".parse::<Solution>(), Ok(Solution::default()));
        assert!("R U x".parse::<Solution>().is_err());
        assert_eq!("R2' D".parse::<Solution>().unwrap().len(), 2);
    }
}
