// THEORY:
// The `ScanSession` is the state machine behind the guided scan. The user shows the
// cube faces in one fixed order (Up, Right, Front, Down, Left, Back, the order the
// solving engine expects), and the session behaves like a stack over that order:
//
// - `commit_face` pushes the next face. A reading with any `Unknown` cell is
//   rejected as a whole; a failed scan never partially commits.
// - `undo_last_face` pops the most recent face. There is no arbitrary deletion, so
//   the captured faces are always exactly a prefix of the scan order.
// - `reset` drops everything and returns to the initial state.
//
// States: `Scanning(k)` with k faces captured (k = 0..5) and `Complete` (k = 6).
// `Complete` only stops forward progress; undo and reset still apply from it.

use crate::core_modules::color_classifier::ColorCode;
use crate::core_modules::face_grid::{CENTER_INDEX, FACELETS, FaceReading};
use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;

/// One of the six cube faces, in solver order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PositionLabel {
    Up,
    Right,
    Front,
    Down,
    Left,
    Back,
}

impl PositionLabel {
    /// Notation letter consumed by the solver.
    pub fn letter(self) -> char {
        match self {
            PositionLabel::Up => 'U',
            PositionLabel::Right => 'R',
            PositionLabel::Front => 'F',
            PositionLabel::Down => 'D',
            PositionLabel::Left => 'L',
            PositionLabel::Back => 'B',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        FACES_ORDER.into_iter().find(|label| label.letter() == letter)
    }

    pub fn name(self) -> &'static str {
        match self {
            PositionLabel::Up => "Up",
            PositionLabel::Right => "Right",
            PositionLabel::Front => "Front",
            PositionLabel::Down => "Down",
            PositionLabel::Left => "Left",
            PositionLabel::Back => "Back",
        }
    }
}

impl fmt::Display for PositionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The fixed scan order.
pub const FACES_ORDER: [PositionLabel; 6] = [
    PositionLabel::Up,
    PositionLabel::Right,
    PositionLabel::Front,
    PositionLabel::Down,
    PositionLabel::Left,
    PositionLabel::Back,
];

/// Nine classified facelets of a committed face. Never contains `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Face([ColorCode; FACELETS]);

impl Face {
    pub fn colors(&self) -> &[ColorCode; FACELETS] {
        &self.0
    }

    pub fn center(&self) -> ColorCode {
        self.0[CENTER_INDEX]
    }
}

impl TryFrom<FaceReading> for Face {
    type Error = ScanError;

    fn try_from(reading: FaceReading) -> Result<Self> {
        let cells: Vec<usize> = reading
            .iter()
            .enumerate()
            .filter(|(_, code)| !code.is_known())
            .map(|(index, _)| index)
            .collect();
        if cells.is_empty() {
            Ok(Face(reading))
        } else {
            Err(ScanError::UnknownColorDetected { cells })
        }
    }
}

impl TryFrom<&[ColorCode]> for Face {
    type Error = ScanError;

    /// Anything other than nine readings counts as all cells unreadable.
    fn try_from(codes: &[ColorCode]) -> Result<Self> {
        let reading: FaceReading = codes
            .try_into()
            .map_err(|_| ScanError::UnknownColorDetected {
                cells: (0..FACELETS).collect(),
            })?;
        Face::try_from(reading)
    }
}

/// Coarse session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// `k` faces captured, waiting for face `k + 1`.
    Scanning(usize),
    Complete,
}

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommittedFace {
    pub label: PositionLabel,
    pub face: Face,
    /// The session index after the commit.
    pub next_index: usize,
}

/// Result of a successful undo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemovedFace {
    pub label: PositionLabel,
    pub face: Face,
    pub next_index: usize,
}

/// Fixed-order stack of captured faces for one user's scan.
#[derive(Debug, Clone, Default)]
pub struct ScanSession {
    current_index: usize,
    captured: BTreeMap<PositionLabel, Face>,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn is_complete(&self) -> bool {
        self.current_index == FACES_ORDER.len()
    }

    pub fn state(&self) -> SessionState {
        if self.is_complete() {
            SessionState::Complete
        } else {
            SessionState::Scanning(self.current_index)
        }
    }

    /// The face the user should show next, if any.
    pub fn next_label(&self) -> Option<PositionLabel> {
        FACES_ORDER.get(self.current_index).copied()
    }

    pub fn face(&self, label: PositionLabel) -> Option<&Face> {
        self.captured.get(&label)
    }

    /// Captured faces in scan order.
    pub fn faces(&self) -> impl Iterator<Item = (PositionLabel, &Face)> {
        FACES_ORDER[..self.current_index]
            .iter()
            .filter_map(|label| self.captured.get(label).map(|face| (*label, face)))
    }

    pub fn commit_face(&mut self, codes: &[ColorCode]) -> Result<CommittedFace> {
        let Some(label) = self.next_label() else {
            return Err(ScanError::SessionComplete);
        };
        let face = Face::try_from(codes)?;

        self.captured.insert(label, face);
        self.current_index += 1;
        info!(face = %label, next_index = self.current_index, "face committed");

        Ok(CommittedFace {
            label,
            face,
            next_index: self.current_index,
        })
    }

    pub fn undo_last_face(&mut self) -> Result<RemovedFace> {
        if self.current_index == 0 {
            return Err(ScanError::NothingToUndo);
        }

        let label = FACES_ORDER[self.current_index - 1];
        let face = self
            .captured
            .remove(&label)
            .ok_or(ScanError::NothingToUndo)?;
        self.current_index -= 1;
        info!(face = %label, next_index = self.current_index, "face removed");

        Ok(RemovedFace {
            label,
            face,
            next_index: self.current_index,
        })
    }

    pub fn reset(&mut self) {
        self.current_index = 0;
        self.captured.clear();
        info!("scan session reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::color_classifier::ColorCode::*;

    fn uniform(code: ColorCode) -> [ColorCode; 9] {
        [code; 9]
    }

    fn assert_prefix(session: &ScanSession, n: usize) {
        assert_eq!(session.current_index(), n);
        let labels: Vec<PositionLabel> = session.faces().map(|(label, _)| label).collect();
        assert_eq!(labels, FACES_ORDER[..n].to_vec());
        for label in &FACES_ORDER[n..] {
            assert!(session.face(*label).is_none(), "{label} should not be captured");
        }
    }

    #[test]
    fn commits_fill_the_scan_order_as_a_prefix() {
        let mut session = ScanSession::new();
        assert_eq!(session.state(), SessionState::Scanning(0));
        for (n, code) in ColorCode::STICKERS.iter().enumerate() {
            let committed = session.commit_face(&uniform(*code)).unwrap();
            assert_eq!(committed.label, FACES_ORDER[n]);
            assert_eq!(committed.next_index, n + 1);
            assert_prefix(&session, n + 1);
        }
        assert!(session.is_complete());
        assert_eq!(session.state(), SessionState::Complete);
        assert_eq!(session.next_label(), None);
    }

    #[test]
    fn commit_after_completion_reports_complete() {
        let mut session = ScanSession::new();
        for code in ColorCode::STICKERS {
            session.commit_face(&uniform(code)).unwrap();
        }
        assert_eq!(session.commit_face(&uniform(White)), Err(ScanError::SessionComplete));
        assert_prefix(&session, 6);
    }

    #[test]
    fn unknown_reading_is_rejected_atomically() {
        let mut session = ScanSession::new();
        session.commit_face(&uniform(White)).unwrap();

        let mut reading = uniform(Red);
        reading[3] = Unknown;
        reading[7] = Unknown;
        assert_eq!(
            session.commit_face(&reading),
            Err(ScanError::UnknownColorDetected { cells: vec![3, 7] })
        );
        assert_prefix(&session, 1);
        assert_eq!(session.face(PositionLabel::Up).unwrap().colors(), &uniform(White));
    }

    #[test]
    fn short_readings_are_rejected() {
        let mut session = ScanSession::new();
        assert!(matches!(
            session.commit_face(&[White; 4]),
            Err(ScanError::UnknownColorDetected { .. })
        ));
        assert_prefix(&session, 0);
    }

    #[test]
    fn undo_pops_the_latest_face() {
        let mut session = ScanSession::new();
        for code in [White, Red, Green] {
            session.commit_face(&uniform(code)).unwrap();
        }
        let removed = session.undo_last_face().unwrap();
        assert_eq!(removed.label, PositionLabel::Front);
        assert_eq!(removed.face.center(), Green);
        assert_eq!(removed.next_index, 2);
        assert_prefix(&session, 2);

        let committed = session.commit_face(&uniform(Blue)).unwrap();
        assert_eq!(committed.label, PositionLabel::Front);
    }

    #[test]
    fn undo_from_complete_reopens_the_last_face() {
        let mut session = ScanSession::new();
        for code in ColorCode::STICKERS {
            session.commit_face(&uniform(code)).unwrap();
        }
        assert_eq!(session.undo_last_face().unwrap().label, PositionLabel::Back);
        assert_eq!(session.state(), SessionState::Scanning(5));
        assert_eq!(session.next_label(), Some(PositionLabel::Back));
    }

    #[test]
    fn undo_on_empty_session_changes_nothing() {
        let mut session = ScanSession::new();
        assert_eq!(session.undo_last_face(), Err(ScanError::NothingToUndo));
        assert_prefix(&session, 0);
    }

    #[test]
    fn reset_from_any_state() {
        for commits in 0..=6 {
            let mut session = ScanSession::new();
            for code in ColorCode::STICKERS.iter().take(commits) {
                session.commit_face(&uniform(*code)).unwrap();
            }
            session.reset();
            assert_prefix(&session, 0);
            assert_eq!(session.state(), SessionState::Scanning(0));
        }
    }

    #[test]
    fn labels_round_trip_through_letters() {
        for label in FACES_ORDER {
            assert_eq!(PositionLabel::from_letter(label.letter()), Some(label));
        }
        assert_eq!(PositionLabel::from_letter('X'), None);
    }
}
