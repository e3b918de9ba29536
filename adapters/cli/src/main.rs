#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that replays scripted tower defence sessions.

mod config;
mod observer;
mod script;

use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use observer::LoggingObserver;
use script::ScriptAction;
use tower_defence_core::{dispatch, CellCoord, Command, DefinitionId, Event, TransactionError};
use tower_defence_system_builder::{Builder, BuilderInput, PlacementPreview};
use tower_defence_world::{self as world, query, World};

/// Replays a command script against a tower defence session.
#[derive(Debug, Parser)]
#[command(name = "tower-defence", version)]
struct Cli {
    /// Session configuration in TOML format. The built-in session is used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Script to replay. Standard input is read when omitted.
    #[arg(long)]
    script: Option<PathBuf>,
    /// Abort on the first rejected transaction instead of logging it.
    #[arg(long)]
    strict: bool,
}

/// Entry point for the tower defence command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;
    let source = read_script(cli.script.as_deref())?;
    let actions = script::parse(&source).map_err(|(line, error)| {
        anyhow::Error::new(error).context(format!("invalid script line {line}"))
    })?;

    let world = World::new(config).context("session config rejected")?;
    let mut runner = Runner::new(world);
    runner.announce();

    for (line, action) in actions {
        if let Err(error) = runner.run(action) {
            if cli.strict {
                return Err(anyhow::Error::new(error).context(format!("script line {line}")));
            }
            tracing::warn!(line, %error, "transaction rejected");
        }
    }

    runner.report();
    Ok(())
}

fn read_script(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display())),
        None => {
            let mut source = String::new();
            let _ = io::stdin()
                .read_to_string(&mut source)
                .context("failed to read script from stdin")?;
            Ok(source)
        }
    }
}

struct Runner {
    world: World,
    builder: Builder,
    observer: LoggingObserver,
    recent: Vec<Event>,
}

impl Runner {
    fn new(world: World) -> Self {
        Self {
            world,
            builder: Builder::new(),
            observer: LoggingObserver::default(),
            recent: Vec::new(),
        }
    }

    fn announce(&mut self) {
        let mut events = Vec::new();
        self.world.announce(&mut events);
        self.publish(events);
    }

    fn run(&mut self, action: ScriptAction) -> Result<(), TransactionError> {
        match action {
            ScriptAction::Command(command) => self.apply(command),
            ScriptAction::Place {
                definition,
                anchor,
                confirm,
            } => {
                for command in self.place(definition, anchor, confirm)? {
                    self.apply(command)?;
                }
                Ok(())
            }
        }
    }

    fn apply(&mut self, command: Command) -> Result<(), TransactionError> {
        let mut events = Vec::new();
        let result = world::apply(&mut self.world, command, &mut events);
        self.publish(events);
        result
    }

    /// Routes a hovered or confirmed placement through the builder system.
    ///
    /// A confirmed placement the builder declines is still forwarded as a
    /// build request so the session reports its own reason.
    fn place(
        &mut self,
        definition: DefinitionId,
        anchor: CellCoord,
        confirm: bool,
    ) -> Result<Vec<Command>, TransactionError> {
        let world = &self.world;
        let entry = query::definition(world, definition)
            .ok_or(TransactionError::UnknownDefinitionId(definition))?;
        let preview = PlacementPreview::evaluate(
            entry,
            anchor,
            query::grid_dimensions(world),
            query::can_afford(world, entry.price),
            |cell| query::is_free(world, cell),
        );

        let recent = std::mem::take(&mut self.recent);
        let mut commands = Vec::new();
        self.builder.handle(
            &recent,
            Some(preview),
            BuilderInput {
                confirm_action: confirm,
                cursor_cell: Some(anchor),
                ..BuilderInput::default()
            },
            |cell| query::tower_at(world, cell),
            &mut commands,
        );
        let forwarded = commands
            .iter()
            .any(|command| matches!(command, Command::Build { .. }));
        if confirm && !forwarded {
            commands.push(Command::Build {
                definition,
                cells: entry.footprint_at(anchor).unwrap_or_default(),
            });
        }
        Ok(commands)
    }

    fn publish(&mut self, events: Vec<Event>) {
        dispatch(&events, &mut self.observer);
        self.recent.extend(events);
    }

    fn report(&self) {
        let wave = query::wave(&self.world);
        println!("state: {:?}", query::state(&self.world));
        println!("money: {}", query::money(&self.world));
        println!(
            "lives: {}/{}",
            query::lives(&self.world),
            query::max_lives(&self.world)
        );
        println!("wave: {}/{}", wave.current + 1, wave.total);
        println!("towers: {}", query::towers(&self.world).len());
        if let Some(outcome) = self.observer.outcome() {
            println!("outcome: {outcome:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_defence_core::{EnemyId, SessionOutcome, SessionState};

    fn runner() -> Runner {
        let config = config::load(None).expect("embedded session config");
        let mut runner = Runner::new(World::new(config).expect("valid session"));
        runner.announce();
        runner
    }

    fn lose(runner: &mut Runner) {
        runner.run(ScriptAction::Command(Command::StartWave)).expect("start wave");
        for enemy in 0..query::max_lives(&runner.world) {
            runner
                .run(ScriptAction::Command(Command::EnemyLeaked {
                    enemy: EnemyId::new(enemy),
                }))
                .expect("leak");
        }
        assert_eq!(query::state(&runner.world), SessionState::Lost);
    }

    #[test]
    fn unknown_definition_keeps_pending_events_for_builder() {
        let mut runner = runner();
        lose(&mut runner);

        let unknown = runner.run(ScriptAction::Place {
            definition: DefinitionId::new(99),
            anchor: CellCoord::new(2, 2),
            confirm: false,
        });
        assert_eq!(
            unknown,
            Err(TransactionError::UnknownDefinitionId(DefinitionId::new(99)))
        );

        let commands = runner
            .place(DefinitionId::new(1), CellCoord::new(2, 2), false)
            .expect("known definition");
        assert!(commands.is_empty(), "builder stops once the session ended");
    }

    #[test]
    fn rejected_placement_reports_session_reason() {
        let mut runner = runner();
        lose(&mut runner);

        let result = runner.run(ScriptAction::Place {
            definition: DefinitionId::new(1),
            anchor: CellCoord::new(2, 2),
            confirm: true,
        });

        assert_eq!(
            result,
            Err(TransactionError::SessionEnded {
                outcome: SessionOutcome::Lost
            })
        );
    }

    #[test]
    fn rejected_placement_leaves_session_unchanged() {
        let mut runner = runner();
        runner
            .run(ScriptAction::Place {
                definition: DefinitionId::new(1),
                anchor: CellCoord::new(0, 0),
                confirm: true,
            })
            .expect("first placement");

        let result = runner.run(ScriptAction::Place {
            definition: DefinitionId::new(1),
            anchor: CellCoord::new(0, 0),
            confirm: true,
        });

        assert_eq!(result, Err(TransactionError::CellsUnavailable));
        assert_eq!(query::money(&runner.world), 60);
        assert_eq!(query::towers(&runner.world).len(), 1);
    }
}
