// THEORY:
// The solving engine does not speak colors; it speaks positions. A facelet string
// like "UUUUUUUUURRR..." says "this sticker belongs to the Up face", whatever color
// the Up face happens to be on this particular cube. The translator bridges the two:
//
// 1.  **Anchor on centers**: a center sticker never moves, so the center color of
//     each scanned face names that face. The six centers define a bijection
//     color -> position (`CenterMap`). Two faces with the same center color mean the
//     capture is wrong, and nothing downstream can repair it.
// 2.  **Concatenate in solver order**: the nine facelets of each face, faces in
//     Up, Right, Front, Down, Left, Back order.
// 3.  **Remap**: every color goes through the `CenterMap`, giving 54 position letters.
//
// A valid cube carries nine stickers of each color, so a well-formed capture yields
// every letter exactly nine times.

use crate::core_modules::color_classifier::ColorCode;
use crate::core_modules::scan_session::{FACES_ORDER, PositionLabel, ScanSession};
use crate::core_modules::solver::{Solution, SolverGateway};
use crate::error::{Result, ScanError};
use serde::Serialize;
use serde::ser::SerializeMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Length of a full facelet string.
pub const NOTATION_LENGTH: usize = 54;

/// Bijection from center color to face position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CenterMap {
    entries: [(ColorCode, PositionLabel); 6],
}

impl CenterMap {
    /// Builds the map from the six captured centers.
    pub fn from_session(session: &ScanSession) -> Result<Self> {
        if !session.is_complete() {
            return Err(ScanError::SessionIncomplete {
                captured: session.current_index(),
            });
        }

        let mut entries = Vec::with_capacity(FACES_ORDER.len());
        for (label, face) in session.faces() {
            let color = face.center();
            if let Some((_, first)) = entries.iter().find(|(seen, _)| *seen == color) {
                return Err(ScanError::DuplicateCenterColor {
                    color,
                    first: *first,
                    second: label,
                });
            }
            entries.push((color, label));
        }

        let entries: [(ColorCode, PositionLabel); 6] =
            entries
                .try_into()
                .map_err(|partial: Vec<_>| ScanError::SessionIncomplete {
                    captured: partial.len(),
                })?;
        Ok(Self { entries })
    }

    pub fn position_of(&self, color: ColorCode) -> Option<PositionLabel> {
        self.entries
            .iter()
            .find(|(center, _)| *center == color)
            .map(|(_, label)| *label)
    }

    pub fn color_of(&self, label: PositionLabel) -> Option<ColorCode> {
        self.entries
            .iter()
            .find(|(_, position)| *position == label)
            .map(|(color, _)| *color)
    }

    /// Entries in scan order.
    pub fn iter(&self) -> impl Iterator<Item = (ColorCode, PositionLabel)> + '_ {
        self.entries.iter().copied()
    }
}

impl Serialize for CenterMap {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (color, label) in &self.entries {
            map.serialize_entry(&color.letter().to_string(), &label.letter().to_string())?;
        }
        map.end()
    }
}

/// A 54-letter facelet string over `URFDLB`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotationString(String);

impl NotationString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Occurrences of each face letter, in scan order.
    pub fn letter_counts(&self) -> [(PositionLabel, usize); 6] {
        FACES_ORDER.map(|label| {
            let letter = label.letter();
            (label, self.0.chars().filter(|c| *c == letter).count())
        })
    }

    /// True when the string meets the solver's input contract: 54 letters, nine each.
    pub fn is_well_formed(&self) -> bool {
        is_well_formed(&self.0)
    }
}

impl fmt::Display for NotationString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NotationString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Checks the solver input contract on a raw facelet string.
pub fn is_well_formed(facelets: &str) -> bool {
    facelets.chars().count() == NOTATION_LENGTH
        && facelets.chars().all(|c| PositionLabel::from_letter(c).is_some())
        && FACES_ORDER
            .iter()
            .all(|label| facelets.chars().filter(|c| *c == label.letter()).count() == 9)
}

/// A translated capture.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub notation: NotationString,
    pub center_map: CenterMap,
}

/// Translates a complete session into solver notation.
pub fn translate(session: &ScanSession) -> Result<Translation> {
    let center_map = CenterMap::from_session(session)?;

    let mut notation = String::with_capacity(NOTATION_LENGTH);
    for (label, face) in session.faces() {
        for (index, color) in face.colors().iter().enumerate() {
            let position = center_map.position_of(*color).ok_or_else(|| {
                warn!(face = %label, index, %color, "facelet color has no matching center");
                ScanError::UnknownColorDetected { cells: vec![index] }
            })?;
            notation.push(position.letter());
        }
    }

    let notation = NotationString(notation);
    debug!(%notation, "translated facelet string");
    Ok(Translation {
        notation,
        center_map,
    })
}

/// A solved capture: the moves plus the color map they were derived with.
#[derive(Debug, Clone, PartialEq)]
pub struct SolvedCube {
    pub solution: Solution,
    pub translation: Translation,
}

/// Translates the session and hands the notation to the solver. The solver is only
/// called when translation succeeds.
pub fn translate_and_solve<G>(session: &ScanSession, solver: &G) -> Result<SolvedCube>
where
    G: SolverGateway + ?Sized,
{
    let translation = translate(session)?;
    let solution = solver.solve(translation.notation.as_str())?;
    info!(moves = solution.len(), "cube solved");
    Ok(SolvedCube {
        solution,
        translation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::color_classifier::ColorCode::*;
    use std::cell::Cell;

    const SOLVED_COLORS: [ColorCode; 6] = [White, Red, Green, Yellow, Orange, Blue];

    fn session_from(faces: &[[ColorCode; 9]; 6]) -> ScanSession {
        let mut session = ScanSession::new();
        for face in faces {
            session.commit_face(face).unwrap();
        }
        session
    }

    fn solved_session() -> ScanSession {
        session_from(&SOLVED_COLORS.map(|c| [c; 9]))
    }

    /// Scrambled stickers: every face keeps its center, the other 48 stickers are
    /// dealt out round-robin so each color still appears nine times in total.
    fn scrambled_session() -> ScanSession {
        let mut pool: Vec<ColorCode> = SOLVED_COLORS
            .iter()
            .flat_map(|c| std::iter::repeat_n(*c, 8))
            .collect();
        // Deterministic shuffle: stride through the pool with a step coprime to 48.
        let shuffled: Vec<ColorCode> = (0..48).map(|i| pool[(i * 7) % 48]).collect();
        pool = shuffled;

        let mut faces = [[White; 9]; 6];
        let mut next = pool.into_iter();
        for (face, center) in faces.iter_mut().zip(SOLVED_COLORS) {
            for (index, slot) in face.iter_mut().enumerate() {
                *slot = if index == 4 {
                    center
                } else {
                    next.next().unwrap()
                };
            }
        }
        session_from(&faces)
    }

    struct CountingSolver {
        calls: Cell<usize>,
    }

    impl SolverGateway for CountingSolver {
        fn solve(&self, _facelets: &str) -> Result<Solution> {
            self.calls.set(self.calls.get() + 1);
            Ok(Solution::default())
        }
    }

    #[test]
    fn solved_cube_translates_to_blocks_of_face_letters() {
        let translation = translate(&solved_session()).unwrap();
        assert_eq!(
            translation.notation.as_str(),
            "UUUUUUUUURRRRRRRRRFFFFFFFFFDDDDDDDDDLLLLLLLLLBBBBBBBBB"
        );
        assert_eq!(translation.center_map.position_of(Yellow), Some(PositionLabel::Down));
        assert_eq!(translation.center_map.color_of(PositionLabel::Back), Some(Blue));
    }

    #[test]
    fn scrambled_capture_keeps_nine_of_each_letter() {
        let translation = translate(&scrambled_session()).unwrap();
        let notation = &translation.notation;
        assert_eq!(notation.as_str().len(), NOTATION_LENGTH);
        assert!(notation.is_well_formed());
        for (label, count) in notation.letter_counts() {
            assert_eq!(count, 9, "{label}");
        }
        // Centers always map onto their own face.
        for (face_index, label) in FACES_ORDER.iter().enumerate() {
            let center = notation.as_str().chars().nth(face_index * 9 + 4).unwrap();
            assert_eq!(center, label.letter());
        }
    }

    #[test]
    fn mapping_follows_centers_not_fixed_colors() {
        // Same cube held with yellow on top and white at the bottom.
        let colors = [Yellow, Red, Green, White, Orange, Blue];
        let session = session_from(&colors.map(|c| [c; 9]));
        let translation = translate(&session).unwrap();
        assert_eq!(&translation.notation.as_str()[..9], "UUUUUUUUU");
        assert_eq!(&translation.notation.as_str()[27..36], "DDDDDDDDD");
        assert_eq!(translation.center_map.position_of(White), Some(PositionLabel::Down));
    }

    #[test]
    fn incomplete_session_is_rejected() {
        let mut session = solved_session();
        session.undo_last_face().unwrap();
        assert_eq!(
            translate(&session),
            Err(ScanError::SessionIncomplete { captured: 5 })
        );
    }

    #[test]
    fn duplicate_centers_never_reach_the_solver() {
        let colors = [White, Red, Green, Yellow, Red, Blue];
        let session = session_from(&colors.map(|c| [c; 9]));
        let solver = CountingSolver {
            calls: Cell::new(0),
        };
        assert_eq!(
            translate_and_solve(&session, &solver),
            Err(ScanError::DuplicateCenterColor {
                color: Red,
                first: PositionLabel::Right,
                second: PositionLabel::Left,
            })
        );
        assert_eq!(solver.calls.get(), 0);
    }

    #[test]
    fn solver_rejection_propagates() {
        let solver = |_: &str| -> Result<Solution> {
            Err(ScanError::UnsolvableConfiguration("corner twist".into()))
        };
        assert_eq!(
            translate_and_solve(&scrambled_session(), &solver),
            Err(ScanError::UnsolvableConfiguration("corner twist".into()))
        );
    }

    #[test]
    fn solved_capture_reaches_the_solver_once() {
        let solver = CountingSolver {
            calls: Cell::new(0),
        };
        let solved = translate_and_solve(&solved_session(), &solver).unwrap();
        assert!(solved.solution.is_empty());
        assert_eq!(solver.calls.get(), 1);
    }

    #[test]
    fn well_formed_check() {
        assert!(is_well_formed(
            "UUUUUUUUURRRRRRRRRFFFFFFFFFDDDDDDDDDLLLLLLLLLBBBBBBBBB"
        ));
        assert!(!is_well_formed("UUUU"));
        assert!(!is_well_formed(
            "UUUUUUUUUURRRRRRRRFFFFFFFFFDDDDDDDDDLLLLLLLLLBBBBBBBBB"
        ));
        assert!(!is_well_formed(
            "XUUUUUUUURRRRRRRRRFFFFFFFFFDDDDDDDDDLLLLLLLLLBBBBBBBBB"
        ));
    }

    #[test]
    fn center_map_lists_centers_in_scan_order() {
        let translation = translate(&solved_session()).unwrap();
        let pairs: Vec<(char, char)> = translation
            .center_map
            .iter()
            .map(|(color, label)| (color.letter(), label.letter()))
            .collect();
        assert_eq!(
            pairs,
            vec![('W', 'U'), ('R', 'R'), ('G', 'F'), ('Y', 'D'), ('O', 'L'), ('B', 'B')]
        );
    }
}
