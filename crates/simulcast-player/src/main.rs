//! Simulcast Player - terminal front-end for the disk display
//!
//! Runs the simulcast service, prints disk angles and wake countdowns, and
//! plays cues through the default output once audio is switched on.

mod console;

use std::path::PathBuf;

use anyhow::Context;
use crossbeam::channel::{never, Receiver};

use simulcast_core::assets::AssetCache;
use simulcast_core::audio::{get_output_devices, start_audio_output, AudioOutput};
use simulcast_core::config::{default_config_path, load_config, SimulcastConfig};
use simulcast_core::display::StatsSnapshot;
use simulcast_core::engine::{EventBus, Simulcast, SimulcastClient, SimulcastService};
use simulcast_core::fetch::FetchWorker;

use console::{Console, ConsoleCommand, HELP};

#[derive(Debug, Default, PartialEq)]
struct Args {
    config_path: Option<PathBuf>,
    no_audio: bool,
    stats: bool,
    list_devices: bool,
}

impl Args {
    fn parse(args: &[String]) -> Self {
        let config_path = args
            .iter()
            .position(|a| a == "--config")
            .and_then(|i| args.get(i + 1))
            .map(PathBuf::from);

        Self {
            config_path,
            no_audio: args.iter().any(|a| a == "--no-audio"),
            stats: args.iter().any(|a| a == "--stats"),
            list_devices: args.iter().any(|a| a == "--list-devices"),
        }
    }
}

/// Audio output state held on the main thread; the cpal stream is not `Send`
enum AudioState {
    Detached,
    Attached { _output: AudioOutput, enabled: bool },
    Unavailable,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = std::env::args().collect();
    let args = Args::parse(&args);

    if args.list_devices {
        let devices = get_output_devices().context("Failed to enumerate output devices")?;
        if devices.is_empty() {
            println!("No output devices found");
        }
        for device in devices {
            println!("{}", device);
        }
        return Ok(());
    }

    let config_path = args.config_path.clone().unwrap_or_else(default_config_path);
    let config: SimulcastConfig = load_config(&config_path);

    println!("Simulcast Player");
    println!("  Config:   {:?}", config_path);
    println!("  Endpoint: {}", config.endpoint.url);
    println!(
        "  Interval: {}s, chunk {}",
        config.timing.turn_interval_secs, config.timing.chunk_size
    );

    let cache = AssetCache::new(config.assets.store()).context("Failed to start cue loader")?;
    let engine = Simulcast::new(config.engine_settings(), cache);
    let worker = FetchWorker::spawn(Box::new(config.turn_source()))
        .context("Failed to start fetch worker")?;

    let bus = EventBus::default();
    let events = bus.subscribe();
    let mut handle =
        SimulcastService::spawn(engine, worker, bus.sender()).map_err(anyhow::Error::msg)?;
    let client = SimulcastClient::new(&handle);

    let commands = match console::spawn_stdin_reader() {
        Ok(rx) => rx,
        Err(e) => {
            log::warn!("No console input: {}", e);
            never()
        }
    };
    println!("{}", HELP);

    let mut audio = if args.no_audio {
        AudioState::Unavailable
    } else {
        AudioState::Detached
    };
    let result = run_loop(&client, &config, &events, commands, &mut audio, args.stats);

    log::info!("Shutting down");
    let _ = client.shutdown();
    handle.join();
    drop(audio);

    result
}

fn run_loop(
    client: &SimulcastClient,
    config: &SimulcastConfig,
    events: &Receiver<simulcast_core::engine::SimulcastEvent>,
    mut commands: Receiver<ConsoleCommand>,
    audio: &mut AudioState,
    show_stats: bool,
) -> anyhow::Result<()> {
    let mut console = Console::new(show_stats);

    loop {
        crossbeam::select! {
            recv(events) -> event => {
                let Ok(event) = event else {
                    log::warn!("Event bus closed");
                    return Ok(());
                };
                console.handle_event(&event, client);
            }
            recv(commands) -> cmd => {
                let Ok(cmd) = cmd else {
                    // End of input: keep running headless
                    commands = never();
                    continue;
                };
                match cmd {
                    ConsoleCommand::ToggleAudio => toggle_audio(client, config, audio)?,
                    ConsoleCommand::ToggleStats => {
                        if console.toggle_stats() {
                            let stats = client.get_stats().map_err(anyhow::Error::msg)?;
                            println!("{}", StatsSnapshot::from(&stats).render());
                        }
                    }
                    ConsoleCommand::GoOffline => client.set_online(false).map_err(anyhow::Error::msg)?,
                    ConsoleCommand::GoOnline => client.set_online(true).map_err(anyhow::Error::msg)?,
                    ConsoleCommand::Quit => return Ok(()),
                }
            }
        }
    }
}

fn toggle_audio(
    client: &SimulcastClient,
    config: &SimulcastConfig,
    audio: &mut AudioState,
) -> anyhow::Result<()> {
    match audio {
        AudioState::Unavailable => {
            println!("Audio output unavailable");
        }
        AudioState::Attached { enabled, .. } => {
            *enabled = !*enabled;
            client.set_audio_enabled(*enabled).map_err(anyhow::Error::msg)?;
        }
        AudioState::Detached => match start_audio_output(&config.audio) {
            Ok((output, session)) => {
                println!(
                    "  Audio:    {} @ {} Hz, {} frames ({:.1} ms)",
                    output.device_name(),
                    output.sample_rate(),
                    output.buffer_size(),
                    output.latency_ms()
                );
                client.attach_audio(Box::new(session)).map_err(anyhow::Error::msg)?;
                client.set_audio_enabled(true).map_err(anyhow::Error::msg)?;
                *audio = AudioState::Attached {
                    _output: output,
                    enabled: true,
                };
            }
            Err(e) => {
                log::warn!("Failed to start audio output: {}", e);
                println!("Continuing without audio");
                *audio = AudioState::Unavailable;
            }
        },
    }
    Ok(())
}
