//! Playback controls for the desktop server

use tandem_core::{MediaEngine, PlaybackState, PlayerHooks, PlayerServer, Transport};

/// Seconds skipped by a forward/backward step
pub const SEEK_STEP: f64 = 10.0;

/// Volume change per step
pub const VOLUME_STEP: f64 = 0.1;

/// Keyboard/remote control handling
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlAction {
    PlayPause,
    Stop,
    Replay,
    SeekTo(f64),
    SeekForward(f64),
    SeekBackward(f64),
    VolumeUp,
    VolumeDown,
    Mute,
    ToggleLoop,
    Heartbeat,
}

impl ControlAction {
    /// Parse a console line: `p`, `s`, `r`, `f`, `b`, `+`, `-`, `m`, `l`,
    /// `h`, or `t <seconds>`
    pub fn from_input(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let key = parts.next()?;

        let action = match key {
            "p" | "play" | "pause" => Self::PlayPause,
            "s" | "stop" => Self::Stop,
            "r" | "replay" => Self::Replay,
            "f" => Self::SeekForward(parse_step(parts.next())?),
            "b" => Self::SeekBackward(parse_step(parts.next())?),
            "t" | "seek" => Self::SeekTo(parts.next()?.parse().ok()?),
            "+" => Self::VolumeUp,
            "-" => Self::VolumeDown,
            "m" | "mute" => Self::Mute,
            "l" | "loop" => Self::ToggleLoop,
            "h" | "heartbeat" => Self::Heartbeat,
            _ => return None,
        };

        Some(action)
    }

    /// Apply the action to a running server
    pub fn apply<E, H, T>(self, server: &mut PlayerServer<E, H, T>)
    where
        E: MediaEngine,
        H: PlayerHooks,
        T: Transport,
    {
        match self {
            Self::PlayPause => {
                if server.state() == PlaybackState::Playing {
                    server.pause();
                } else {
                    server.play();
                }
            }
            Self::Stop => server.stop(),
            Self::Replay => server.replay(),
            Self::SeekTo(time) => server.set_time(time),
            Self::SeekForward(step) => {
                let time = server.time() + step;
                server.set_time(time);
            }
            Self::SeekBackward(step) => {
                let time = server.time() - step;
                server.set_time(time);
            }
            Self::VolumeUp => {
                let volume = server.volume() + VOLUME_STEP;
                server.set_volume(volume);
            }
            Self::VolumeDown => {
                let volume = server.volume() - VOLUME_STEP;
                server.set_volume(volume);
            }
            Self::Mute => {
                let muted = server.is_muted();
                server.set_mute(!muted);
            }
            Self::ToggleLoop => {
                let looping = server.is_looping();
                server.set_loop(!looping);
            }
            Self::Heartbeat => server.dispatch_heartbeat(),
        }
    }
}

fn parse_step(raw: Option<&str>) -> Option<f64> {
    match raw {
        Some(raw) => raw.parse().ok(),
        None => Some(SEEK_STEP),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_input() {
        assert_eq!(ControlAction::from_input("p"), Some(ControlAction::PlayPause));
        assert_eq!(ControlAction::from_input("  t 42.5 "), Some(ControlAction::SeekTo(42.5)));
        assert_eq!(ControlAction::from_input("f"), Some(ControlAction::SeekForward(SEEK_STEP)));
        assert_eq!(ControlAction::from_input("b 3"), Some(ControlAction::SeekBackward(3.0)));
        assert_eq!(ControlAction::from_input("m"), Some(ControlAction::Mute));
    }

    #[test]
    fn test_rejects_unknown_input() {
        assert_eq!(ControlAction::from_input(""), None);
        assert_eq!(ControlAction::from_input("x"), None);
        assert_eq!(ControlAction::from_input("t"), None);
        assert_eq!(ControlAction::from_input("t soon"), None);
    }
}
