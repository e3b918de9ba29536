//! Line-oriented command scripts replayed against a session.
//!
//! Each non-empty line that does not start with `#` holds one action:
//!
//! ```text
//! build <definition> <column>,<row> [<column>,<row> ...]
//! place <definition> <column> <row>
//! hover <definition> <column> <row>
//! upgrade <tower> <definition>
//! sell <tower>
//! undo
//! start
//! leak <enemy>
//! enemies <count>
//! ```

use std::num::ParseIntError;

use thiserror::Error;
use tower_defence_core::{CellCoord, Command, DefinitionId, EnemyId, TowerId};

/// Single step of a script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ScriptAction {
    /// Command forwarded to the world unchanged.
    Command(Command),
    /// Footprint placement routed through the builder system.
    Place {
        /// Definition to preview.
        definition: DefinitionId,
        /// Anchor of the footprint.
        anchor: CellCoord,
        /// Whether the placement is confirmed or only hovered.
        confirm: bool,
    },
}

/// Errors raised while parsing a script line.
#[derive(Debug, Error)]
pub(crate) enum ScriptError {
    /// The verb is not recognised.
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    /// The action received the wrong number of arguments.
    #[error("`{action}` expects {expected}")]
    Arity {
        /// Action being parsed.
        action: &'static str,
        /// Human readable argument shape.
        expected: &'static str,
    },
    /// A numeric argument could not be parsed.
    #[error("invalid number `{value}`")]
    InvalidNumber {
        /// Offending token.
        value: String,
        /// Underlying parse failure.
        #[source]
        source: ParseIntError,
    },
    /// A cell argument was not written as `column,row`.
    #[error("invalid cell `{0}`, expected `column,row`")]
    InvalidCell(String),
}

/// Parses every line of `source`, pairing each action with its 1-based line number.
pub(crate) fn parse(source: &str) -> Result<Vec<(usize, ScriptAction)>, (usize, ScriptError)> {
    let mut actions = Vec::new();
    for (index, line) in source.lines().enumerate() {
        let line_number = index + 1;
        if let Some(action) = parse_line(line).map_err(|error| (line_number, error))? {
            actions.push((line_number, action));
        }
    }
    Ok(actions)
}

/// Parses a single line. Blank lines and comments yield `None`.
pub(crate) fn parse_line(line: &str) -> Result<Option<ScriptAction>, ScriptError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let mut tokens = trimmed.split_whitespace();
    let Some(verb) = tokens.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = tokens.collect();

    let action = match verb {
        "build" => {
            let (definition, cells) = match args.split_first() {
                Some((definition, cells)) if !cells.is_empty() => (definition, cells),
                _ => {
                    return Err(ScriptError::Arity {
                        action: "build",
                        expected: "a definition and at least one cell",
                    })
                }
            };
            let cells = cells
                .iter()
                .map(|cell| parse_cell(cell))
                .collect::<Result<Vec<_>, _>>()?;
            ScriptAction::Command(Command::Build {
                definition: DefinitionId::new(number(definition)?),
                cells,
            })
        }
        "place" | "hover" => match args.as_slice() {
            [definition, column, row] => ScriptAction::Place {
                definition: DefinitionId::new(number(definition)?),
                anchor: CellCoord::new(number(column)?, number(row)?),
                confirm: verb == "place",
            },
            _ => {
                return Err(ScriptError::Arity {
                    action: if verb == "place" { "place" } else { "hover" },
                    expected: "<definition> <column> <row>",
                })
            }
        },
        "upgrade" => match args.as_slice() {
            [tower, definition] => ScriptAction::Command(Command::Upgrade {
                tower: TowerId::new(number(tower)?),
                definition: DefinitionId::new(number(definition)?),
            }),
            _ => {
                return Err(ScriptError::Arity {
                    action: "upgrade",
                    expected: "<tower> <definition>",
                })
            }
        },
        "sell" => ScriptAction::Command(Command::Sell {
            tower: TowerId::new(single(&args, "sell", "<tower>")?),
        }),
        "leak" => ScriptAction::Command(Command::EnemyLeaked {
            enemy: EnemyId::new(single(&args, "leak", "<enemy>")?),
        }),
        "enemies" => ScriptAction::Command(Command::LiveEnemyCountChanged {
            count: single(&args, "enemies", "<count>")?,
        }),
        "undo" => {
            none(&args, "undo")?;
            ScriptAction::Command(Command::RemoveLast)
        }
        "start" => {
            none(&args, "start")?;
            ScriptAction::Command(Command::StartWave)
        }
        other => return Err(ScriptError::UnknownAction(other.to_owned())),
    };
    Ok(Some(action))
}

fn number(value: &str) -> Result<u32, ScriptError> {
    value
        .parse::<u32>()
        .map_err(|source| ScriptError::InvalidNumber {
            value: value.to_owned(),
            source,
        })
}

fn single(args: &[&str], action: &'static str, expected: &'static str) -> Result<u32, ScriptError> {
    match args {
        [value] => number(value),
        _ => Err(ScriptError::Arity { action, expected }),
    }
}

fn none(args: &[&str], action: &'static str) -> Result<(), ScriptError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(ScriptError::Arity {
            action,
            expected: "no arguments",
        })
    }
}

fn parse_cell(value: &str) -> Result<CellCoord, ScriptError> {
    let (column, row) = value
        .split_once(',')
        .ok_or_else(|| ScriptError::InvalidCell(value.to_owned()))?;
    Ok(CellCoord::new(number(column.trim())?, number(row.trim())?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        assert_eq!(parse_line("   ").expect("blank"), None);
        assert_eq!(parse_line("# note").expect("comment"), None);
    }

    #[test]
    fn build_collects_every_cell() {
        let action = parse_line("build 3 1,2 2,2").expect("valid build");
        assert_eq!(
            action,
            Some(ScriptAction::Command(Command::Build {
                definition: DefinitionId::new(3),
                cells: vec![CellCoord::new(1, 2), CellCoord::new(2, 2)],
            }))
        );
    }

    #[test]
    fn hover_is_an_unconfirmed_place() {
        assert_eq!(
            parse_line("hover 1 4 0").expect("valid hover"),
            Some(ScriptAction::Place {
                definition: DefinitionId::new(1),
                anchor: CellCoord::new(4, 0),
                confirm: false,
            })
        );
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert!(matches!(
            parse_line("explode"),
            Err(ScriptError::UnknownAction(_))
        ));
        assert!(matches!(
            parse_line("sell"),
            Err(ScriptError::Arity { action: "sell", .. })
        ));
        assert!(matches!(
            parse_line("build 1 3-4"),
            Err(ScriptError::InvalidCell(_))
        ));
        assert!(matches!(
            parse_line("enemies -1"),
            Err(ScriptError::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse_line("build 2"),
            Err(ScriptError::Arity { action: "build", .. })
        ));
        assert!(matches!(
            parse_line("start now"),
            Err(ScriptError::Arity { action: "start", .. })
        ));
    }

    #[test]
    fn parse_reports_line_numbers() {
        let error = parse("start\n\nsell x").expect_err("bad tower id");
        assert_eq!(error.0, 3);
    }

    #[test]
    fn demo_script_parses() {
        let actions = parse(include_str!("../assets/demo.script")).expect("demo script");
        assert_eq!(actions.len(), 10);
        assert_eq!(
            actions.first().map(|(line, _)| *line),
            Some(2),
            "leading comment is skipped"
        );
    }
}
