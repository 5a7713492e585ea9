//! CLI command implementations

use anyhow::{bail, Context};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tandem_core::{
    Command, Message, PlaybackState, PlayerHooks, PlayerServer, ServerConfig, Transport,
    UdpTransport, VideoFrame,
};
use tandem_desktop::{check_gstreamer_installation, ControlAction, GstEngine};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::output::{format_output, format_record, RecordLine};

/// Receive poll period of `listen`
const LISTEN_POLL: Duration = Duration::from_millis(10);

/// Options of the `serve` command
pub struct ServeOptions {
    pub media: String,
    pub config: Option<PathBuf>,
    pub address: Option<String>,
    pub port: Option<u16>,
    pub heartbeat: Option<u32>,
    pub fps: u32,
    pub mute: bool,
    pub looping: bool,
    pub accept_commands: bool,
}

impl ServeOptions {
    /// Resolve the server configuration: file first, then flags
    fn server_config(&self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ServerConfig::default(),
        };

        if let Some(address) = &self.address {
            config.clock_address = address.clone();
        }
        if let Some(port) = self.port {
            config.clock_port = port;
        }
        if let Some(heartbeat) = self.heartbeat {
            config.heartbeat_frequency = heartbeat;
        }
        if self.accept_commands {
            config.accept_commands = true;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Hooks that report player activity through the log
struct LoggingHooks {
    format: String,
    frames: u64,
}

impl LoggingHooks {
    fn new(format: &str) -> Self {
        Self {
            format: format.to_string(),
            frames: 0,
        }
    }
}

impl PlayerHooks for LoggingHooks {
    fn on_state_changed(&mut self, old: PlaybackState, new: PlaybackState) {
        info!(from = %old, to = %new, "State changed");
    }

    fn on_duration_changed(&mut self, duration: f64) {
        info!(duration, "Duration changed");
    }

    fn on_end_of_stream(&mut self) {
        info!("End of stream");
    }

    fn on_error(&mut self, message: &str) {
        error!("Playback error: {}", message);
    }

    fn on_warning(&mut self, message: &str) {
        warn!("Playback warning: {}", message);
    }

    fn on_video_dimension_changed(&mut self, width: i32, height: i32) {
        info!("Video dimensions: {}x{}", width, height);
    }

    fn on_seek_done(&mut self) {
        debug!("Seek done");
    }

    fn on_clock_setup(&mut self) {
        info!("Network clock bound");
    }

    fn on_clock_clear(&mut self) {
        info!("Network clock released");
    }

    fn on_video_frame(&mut self, frame: VideoFrame<'_>) {
        self.frames += 1;
        if self.frames % 300 == 0 {
            debug!(frames = self.frames, bytes = frame.len(), "Frames delivered");
        }
    }

    fn on_message(&mut self, message: &str) {
        println!("{}", format_record(&RecordLine::parse(message), &self.format));
    }
}

/// Serve media until Ctrl-C, reading control keys from stdin
pub async fn serve(options: ServeOptions, format: &str) -> anyhow::Result<()> {
    let config = options.server_config()?;
    let engine = GstEngine::new()?;

    println!("Serving: {}", options.media);
    println!("  Clock: {}:{}", config.clock_address, config.clock_port);
    println!("  Group: {}:{}", config.multicast_address, config.multicast_port);
    println!("  Controls: p play/pause, s stop, r replay, t <s> seek, f/b step, +/- volume, m mute, l loop");

    let mut server: PlayerServer<GstEngine, LoggingHooks> =
        PlayerServer::new(engine, LoggingHooks::new(format), config);

    server.set_loop(options.looping);
    server
        .open(&options.media)
        .with_context(|| format!("Failed to open {}", options.media))?;
    server.set_mute(options.mute);
    server.play();

    let period = Duration::from_secs_f64(1.0 / f64::from(options.fps.max(1)));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => server.update(),
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match ControlAction::from_input(&line) {
                    Some(action) => {
                        debug!(?action, "Control");
                        action.apply(&mut server);
                    }
                    None if line.trim().is_empty() => {}
                    None => warn!(input = %line.trim(), "Unknown control"),
                },
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!("Stdin closed: {}", e);
                    stdin_open = false;
                }
            },
            _ = &mut shutdown => break,
        }
    }

    info!("Shutting down");
    server.close();
    Ok(())
}

/// Print every record seen on a group until Ctrl-C
pub async fn listen(group: &str, port: u16, format: &str) -> anyhow::Result<()> {
    let mut transport = UdpTransport::connect(group, port)
        .with_context(|| format!("Failed to join {}:{}", group, port))?;

    println!("Listening on {}:{}", group, port);

    let mut ticker = tokio::time::interval(LISTEN_POLL);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                while let Some(record) = transport.poll() {
                    println!("{}", format_record(&RecordLine::parse(&record), format));
                }
            }
            _ = &mut shutdown => break,
        }
    }

    Ok(())
}

/// Send one command record
pub fn send(command: &str, value: Option<&str>, group: &str, port: u16) -> anyhow::Result<()> {
    let command = parse_command(command, value)?;
    let record = Message::Command(command).encode();

    let mut transport = UdpTransport::connect(group, port)
        .with_context(|| format!("Failed to open {}:{}", group, port))?;
    transport.send(&record)?;

    println!("Sent {} to {}:{}", record, group, port);
    Ok(())
}

fn parse_command(name: &str, value: Option<&str>) -> anyhow::Result<Command> {
    let number = |what: &str| -> anyhow::Result<f64> {
        let raw = value.with_context(|| format!("{} requires a value", what))?;
        raw.parse()
            .with_context(|| format!("'{}' is not a number", raw))
    };

    let command = match name.to_lowercase().as_str() {
        "play" => Command::Play,
        "pause" => Command::Pause,
        "stop" => Command::Stop,
        "seek" => Command::Seek(number("seek")?),
        "volume" => Command::Volume(number("volume")?.clamp(0.0, 1.0)),
        "mute" => Command::Mute(match value.map(str::to_lowercase).as_deref() {
            None | Some("on") | Some("1") | Some("true") => true,
            Some("off") | Some("0") | Some("false") => false,
            Some(other) => bail!("mute takes on/off, got '{}'", other),
        }),
        other => bail!("Unknown command '{}'", other),
    };

    Ok(command)
}

#[derive(Debug, Serialize)]
struct CheckReport {
    tandem_version: &'static str,
    gstreamer_version: String,
    missing_elements: Vec<String>,
    complete: bool,
}

/// Report the GStreamer installation
pub fn check(format: &str) -> anyhow::Result<()> {
    let info = check_gstreamer_installation()?;

    if format == "json" {
        let report = CheckReport {
            tandem_version: tandem_core::VERSION,
            gstreamer_version: info.version.clone(),
            missing_elements: info.missing_elements.clone(),
            complete: info.is_complete(),
        };
        println!("{}", format_output(&report, format));
        return Ok(());
    }

    println!("GStreamer {}", info.version);
    if info.is_complete() {
        println!("  All required elements available");
    } else {
        println!("  Missing elements:");
        for element in &info.missing_elements {
            println!("    - {}", element);
        }
        std::process::exit(1);
    }

    Ok(())
}
