//! Minimal SMIRKS inspection: formal charge of a mapped atom.
//!
//! This is not a SMARTS engine. The preprocessing passes only need to know
//! whether the atom tagged `:1` in a vdW pattern carries a formal charge, so
//! the scan understands exactly that much: top-level bracket atoms, their map
//! labels, and their charge primitives. Recursive `$(...)` environments are
//! skipped wholesale.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SmirksError {
    #[error("Unbalanced brackets in pattern '{0}'")]
    Unbalanced(String),

    #[error("No atom tagged :{map_index} in pattern '{pattern}'")]
    MappedAtomNotFound { pattern: String, map_index: u32 },
}

/// Returns the formal charge of the atom tagged `:<map_index>`.
///
/// Charge primitives follow SMARTS: `+`, `-`, `+2`, `++`, `--3`, ... with an
/// unspecified charge meaning zero. When a bracket expression states several
/// charges the last one wins.
pub fn mapped_atom_formal_charge(pattern: &str, map_index: u32) -> Result<i32, SmirksError> {
    for body in bracket_atoms(pattern)? {
        if atom_map(body) == Some(map_index) {
            return Ok(formal_charge(body));
        }
    }
    Err(SmirksError::MappedAtomNotFound {
        pattern: pattern.to_string(),
        map_index,
    })
}

/// Splits a pattern into the bodies of its top-level bracket atoms.
///
/// Brackets nested inside recursive environments stay part of the enclosing
/// body; `bracket_atoms("[#6$([#7][#8]):1]")` yields one body.
fn bracket_atoms(pattern: &str) -> Result<Vec<&str>, SmirksError> {
    let mut bodies = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (index, c) in pattern.char_indices() {
        match c {
            '[' => {
                if depth == 0 {
                    start = index + 1;
                }
                depth += 1;
            }
            ']' => {
                if depth == 0 {
                    return Err(SmirksError::Unbalanced(pattern.to_string()));
                }
                depth -= 1;
                if depth == 0 {
                    bodies.push(&pattern[start..index]);
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(SmirksError::Unbalanced(pattern.to_string()));
    }
    Ok(bodies)
}

/// The atom-map label of a bracket body, ignoring recursive environments.
fn atom_map(body: &str) -> Option<u32> {
    let chars: Vec<char> = body.chars().collect();
    let mut depth = 0usize;
    let mut map = None;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ':' if depth == 0 => {
                let mut digits = String::new();
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_ascii_digit() {
                    digits.push(chars[j]);
                    j += 1;
                }
                if !digits.is_empty() {
                    map = digits.parse().ok();
                }
                i = j;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    map
}

/// The formal charge stated by a bracket body, ignoring recursive
/// environments. Unspecified means zero.
fn formal_charge(body: &str) -> i32 {
    let chars: Vec<char> = body.chars().collect();
    let mut depth = 0usize;
    let mut charge = 0i32;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '+' | '-' if depth == 0 => {
                let sign = if c == '+' { 1 } else { -1 };
                let mut run = 1i32;
                let mut j = i + 1;
                while j < chars.len() && chars[j] == c {
                    run += 1;
                    j += 1;
                }
                let mut digits = String::new();
                while j < chars.len() && chars[j].is_ascii_digit() {
                    digits.push(chars[j]);
                    j += 1;
                }
                let magnitude = if digits.is_empty() {
                    run
                } else {
                    digits.parse().unwrap_or(0)
                };
                charge = sign * magnitude;
                i = j;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    charge
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_atoms_have_zero_charge() {
        assert_eq!(mapped_atom_formal_charge("[#16:1]", 1), Ok(0));
        assert_eq!(mapped_atom_formal_charge("[#1:1]-[#6X4]", 1), Ok(0));
        assert_eq!(mapped_atom_formal_charge("[#8X2H0+0:1]", 1), Ok(0));
    }

    #[test]
    fn cations_and_anions_are_detected() {
        assert_eq!(mapped_atom_formal_charge("[#3+1:1]", 1), Ok(1));
        assert_eq!(mapped_atom_formal_charge("[#11+1:1]", 1), Ok(1));
        assert_eq!(mapped_atom_formal_charge("[#9X0-1:1]", 1), Ok(-1));
        assert_eq!(mapped_atom_formal_charge("[#53X0-1:1]", 1), Ok(-1));
    }

    #[test]
    fn repeated_signs_accumulate() {
        assert_eq!(mapped_atom_formal_charge("[#30++:1]", 1), Ok(2));
        assert_eq!(mapped_atom_formal_charge("[#8--:1]", 1), Ok(-2));
    }

    #[test]
    fn explicit_magnitudes_override_the_run() {
        assert_eq!(mapped_atom_formal_charge("[#20+2:1]", 1), Ok(2));
        assert_eq!(mapped_atom_formal_charge("[#15-3:1]", 1), Ok(-3));
    }

    #[test]
    fn the_requested_map_index_selects_the_atom() {
        assert_eq!(mapped_atom_formal_charge("[#1:1]-[#7+1:2]", 2), Ok(1));
        assert_eq!(mapped_atom_formal_charge("[#1:1]-[#7+1:2]", 1), Ok(0));
    }

    #[test]
    fn recursive_environments_are_ignored() {
        // the charge and the map label inside $() belong to another atom
        assert_eq!(
            mapped_atom_formal_charge("[#6$([#7+1][#8]):1]", 1),
            Ok(0)
        );
        let result = mapped_atom_formal_charge("[#6$([#7:1])]", 1);
        assert_eq!(
            result,
            Err(SmirksError::MappedAtomNotFound {
                pattern: "[#6$([#7:1])]".to_string(),
                map_index: 1,
            })
        );
    }

    #[test]
    fn hydrogen_counts_are_not_charges() {
        assert_eq!(mapped_atom_formal_charge("[#8X2H1+0:1]", 1), Ok(0));
        assert_eq!(mapped_atom_formal_charge("[#7X3H2:1]", 1), Ok(0));
    }

    #[test]
    fn missing_mapped_atom_is_an_error() {
        let result = mapped_atom_formal_charge("[#6]", 1);
        assert_eq!(
            result,
            Err(SmirksError::MappedAtomNotFound {
                pattern: "[#6]".to_string(),
                map_index: 1,
            })
        );
    }

    #[test]
    fn unbalanced_brackets_are_an_error() {
        assert_eq!(
            bracket_atoms("[#6:1"),
            Err(SmirksError::Unbalanced("[#6:1".to_string()))
        );
        assert_eq!(
            bracket_atoms("#6:1]"),
            Err(SmirksError::Unbalanced("#6:1]".to_string()))
        );
    }

    #[test]
    fn bracket_bodies_keep_recursive_brackets_inline() {
        let bodies = bracket_atoms("[#6$([#7][#8]):1]~[#1:2]").unwrap();
        assert_eq!(bodies, vec!["#6$([#7][#8]):1", "#1:2"]);
    }
}
