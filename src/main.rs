//! Robo Run headless runner
//!
//! Plays the levels in order with scripted input and logs every shell
//! callback. Useful for soak-testing generation and for reproducing a seed.
//!
//! Usage: `robo-run [THEME|THEME.json] [SEED] [STEPS_PER_LEVEL]`

use robo_run::sim::{EventLog, Facing, GameEvent, GamePhase, GameWorld, TickInput};
use robo_run::{GameError, Theme, ThemeParams};

/// Scripted input: pace left and right, hopping regularly
fn scripted_input(step: u64) -> TickInput {
    let walk = match (step / 90) % 3 {
        0 => Some(Facing::Right),
        1 => Some(Facing::Left),
        _ => None,
    };
    TickInput {
        walk,
        jump: step % 40 == 0,
    }
}

fn load_params(arg: Option<&str>) -> Result<ThemeParams, GameError> {
    match arg {
        Some(path) if path.ends_with(".json") => ThemeParams::from_file(path),
        Some(name) => Ok(ThemeParams::preset(Theme::from_str(name).unwrap_or_default())),
        None => Ok(ThemeParams::default()),
    }
}

fn play_level(params: ThemeParams, seed: u64, steps: u64) -> Result<GamePhase, GameError> {
    let theme = params.theme;
    let log = EventLog::new();
    let mut world = GameWorld::new(params, seed, Box::new(log.clone()))?;

    for step in 0..steps {
        world.step(&scripted_input(step));
        for event in log.drain() {
            match event {
                GameEvent::Sound(cue) => log::debug!("play {cue:?}"),
                other => log::info!("[{}] {other:?}", theme.as_str()),
            }
        }
        if world.phase() != GamePhase::Playing {
            break;
        }
    }

    let player = world.player();
    log::info!(
        "{} finished: {:?} after {} steps, altitude {:.1}, frontier {:.1}, health {}, stars {}, {} bodies",
        theme.as_str(),
        world.phase(),
        world.state().step_count,
        player.altitude(),
        world.frontier(),
        player.health,
        player.stars,
        world.physics().body_count()
    );
    let phase = world.phase();
    world.stop();
    Ok(phase)
}

fn run() -> Result<(), GameError> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut params = load_params(args.first().map(String::as_str))?;
    let seed = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(0x5EED);
    let steps = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(60 * 120);

    log::info!("Robo Run (headless) starting, seed {seed}");
    loop {
        let next = params.theme.next();
        match play_level(params, seed, steps)? {
            GamePhase::LevelComplete => match next {
                Some(theme) => params = ThemeParams::preset(theme),
                None => {
                    log::info!("All levels complete");
                    return Ok(());
                }
            },
            _ => return Ok(()),
        }
    }
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}
