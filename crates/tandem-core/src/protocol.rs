//! Line-oriented text protocol spoken between synchronized players
//!
//! Every datagram carries one pipe-delimited record. Heartbeats are
//! broadcast periodically by a server:
//!
//! ```text
//! sh|t<time>|v<volume>|m<0|1>|s<state>|b<base_time_ns>
//! ```
//!
//! Command records drive a remote player's transport:
//!
//! ```text
//! cp            play
//! cz            pause
//! cs            stop
//! ct<time>      seek (seconds)
//! cv<volume>    volume in [0, 1]
//! cm<0|1>       mute
//! ```
//!
//! Decimal fields use the `%g` style of a default C++ output stream (six
//! significant digits, trailing zeros trimmed) so records compare equal
//! byte-for-byte with peers written in other languages.

use crate::{types::PlaybackState, Error, Result};
use serde::Serialize;
use std::fmt;

const FIELD_SEPARATOR: char = '|';
const HEARTBEAT_TAG: &str = "sh";

/// Periodic snapshot of the server's transport state
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeartbeatSnapshot {
    /// Playback position in seconds
    pub time: f64,
    /// Volume in [0, 1]
    pub volume: f64,
    /// Mute flag
    pub muted: bool,
    /// Pipeline state
    pub state: PlaybackState,
    /// Pipeline base time in nanoseconds of the shared clock
    pub base_time: u64,
}

impl HeartbeatSnapshot {
    /// Serialize to the wire record
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Parse a wire record. Fields must appear in wire order.
    pub fn parse(record: &str) -> Result<Self> {
        let mut fields = record.trim_end().split(FIELD_SEPARATOR);

        if fields.next() != Some(HEARTBEAT_TAG) {
            return Err(Error::protocol(format!("not a heartbeat: {record}")));
        }

        let time = parse_float(field(&mut fields, 't')?)?;
        let volume = parse_float(field(&mut fields, 'v')?)?;
        let muted = parse_flag(field(&mut fields, 'm')?)?;
        let ordinal: i32 = field(&mut fields, 's')?
            .parse()
            .map_err(|_| Error::protocol("state is not an integer"))?;
        let state = PlaybackState::from_ordinal(ordinal)
            .ok_or_else(|| Error::protocol(format!("unknown state ordinal {ordinal}")))?;
        let base_time = field(&mut fields, 'b')?
            .parse()
            .map_err(|_| Error::protocol("base time is not an integer"))?;

        if fields.next().is_some() {
            return Err(Error::protocol("trailing heartbeat fields"));
        }

        Ok(Self {
            time,
            volume,
            muted,
            state,
            base_time,
        })
    }
}

impl fmt::Display for HeartbeatSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{HEARTBEAT_TAG}|t{}|v{}|m{}|s{}|b{}",
            format_decimal(self.time),
            format_decimal(self.volume),
            u8::from(self.muted),
            self.state.ordinal(),
            self.base_time
        )
    }
}

/// Transport command sent to a remote player
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "command", content = "value", rename_all = "lowercase")]
pub enum Command {
    Play,
    Pause,
    Stop,
    Seek(f64),
    Volume(f64),
    Mute(bool),
}

impl Command {
    /// Serialize to the wire record
    pub fn encode(&self) -> String {
        self.to_string()
    }

    fn parse(record: &str) -> Result<Self> {
        let body = record
            .strip_prefix('c')
            .ok_or_else(|| Error::protocol(format!("not a command: {record}")))?;
        let mut chars = body.chars();
        let verb = chars
            .next()
            .ok_or_else(|| Error::protocol("empty command"))?;
        let arg = chars.as_str();

        let command = match verb {
            'p' => Command::Play,
            'z' => Command::Pause,
            's' => Command::Stop,
            't' => Command::Seek(parse_float(arg)?),
            'v' => Command::Volume(parse_float(arg)?),
            'm' => Command::Mute(parse_flag(arg)?),
            other => return Err(Error::protocol(format!("unknown command verb '{other}'"))),
        };

        let takes_arg = matches!(command, Command::Seek(_) | Command::Volume(_) | Command::Mute(_));
        if !takes_arg && !arg.is_empty() {
            return Err(Error::protocol(format!("unexpected argument in {record}")));
        }

        Ok(command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Play => f.write_str("cp"),
            Command::Pause => f.write_str("cz"),
            Command::Stop => f.write_str("cs"),
            Command::Seek(time) => write!(f, "ct{}", format_decimal(*time)),
            Command::Volume(volume) => write!(f, "cv{}", format_decimal(*volume)),
            Command::Mute(on) => write!(f, "cm{}", u8::from(*on)),
        }
    }
}

/// Any record a peer may receive
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Heartbeat(HeartbeatSnapshot),
    Command(Command),
}

impl Message {
    /// Parse a single datagram payload
    pub fn parse(payload: &str) -> Result<Self> {
        let record = payload.trim();

        if record.starts_with(HEARTBEAT_TAG) {
            HeartbeatSnapshot::parse(record).map(Message::Heartbeat)
        } else if record.starts_with('c') {
            Command::parse(record).map(Message::Command)
        } else {
            Err(Error::protocol(format!("unrecognized record: {record}")))
        }
    }

    /// Serialize to the wire record
    pub fn encode(&self) -> String {
        match self {
            Message::Heartbeat(heartbeat) => heartbeat.encode(),
            Message::Command(command) => command.encode(),
        }
    }
}

/// Format a float the way a default C++ `ostream` does (`%g`, precision 6).
pub fn format_decimal(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // Round to six significant digits first; the exponent after rounding picks the notation.
    let scientific = format!("{value:.5e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return value.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return value.to_string();
    };

    if !(-4..6).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
    } else {
        let decimals = (5 - exponent) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

fn field<'a>(fields: &mut impl Iterator<Item = &'a str>, tag: char) -> Result<&'a str> {
    let raw = fields
        .next()
        .ok_or_else(|| Error::protocol(format!("missing '{tag}' field")))?;
    raw.strip_prefix(tag)
        .ok_or_else(|| Error::protocol(format!("expected '{tag}' field, found '{raw}'")))
}

fn parse_float(raw: &str) -> Result<f64> {
    raw.parse()
        .map_err(|_| Error::protocol(format!("'{raw}' is not a number")))
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(Error::protocol(format!("'{other}' is not a 0/1 flag"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_heartbeat() -> HeartbeatSnapshot {
        HeartbeatSnapshot {
            time: 12.5,
            volume: 0.8,
            muted: false,
            state: PlaybackState::Paused,
            base_time: 1_000_000_000,
        }
    }

    #[test]
    fn test_heartbeat_exact_record() {
        assert_eq!(sample_heartbeat().encode(), "sh|t12.5|v0.8|m0|s3|b1000000000");
    }

    #[test]
    fn test_heartbeat_mute_is_a_plain_flag() {
        let muted = HeartbeatSnapshot {
            muted: true,
            state: PlaybackState::Playing,
            ..sample_heartbeat()
        };
        assert_eq!(muted.encode(), "sh|t12.5|v0.8|m1|s4|b1000000000");
    }

    #[test]
    fn test_heartbeat_parse() {
        let parsed = HeartbeatSnapshot::parse("sh|t12.5|v0.8|m0|s3|b1000000000").unwrap();
        assert_eq!(parsed, sample_heartbeat());
    }

    #[test]
    fn test_heartbeat_rejects_reordered_fields() {
        assert!(HeartbeatSnapshot::parse("sh|v0.8|t12.5|m0|s3|b1").is_err());
        assert!(HeartbeatSnapshot::parse("sh|t1|v1|m2|s3|b1").is_err());
        assert!(HeartbeatSnapshot::parse("sh|t1|v1|m0|s3|b1|x").is_err());
    }

    #[test]
    fn test_format_decimal_matches_stream_output() {
        assert_eq!(format_decimal(12.5), "12.5");
        assert_eq!(format_decimal(0.8), "0.8");
        assert_eq!(format_decimal(1.0), "1");
        assert_eq!(format_decimal(100.0), "100");
        assert_eq!(format_decimal(0.0), "0");
        assert_eq!(format_decimal(3.14159265), "3.14159");
        assert_eq!(format_decimal(123456.7), "123457");
        assert_eq!(format_decimal(1234567.0), "1.23457e+06");
        assert_eq!(format_decimal(0.0001), "0.0001");
        assert_eq!(format_decimal(0.00001), "1e-05");
        assert_eq!(format_decimal(-2.25), "-2.25");
        assert_eq!(format_decimal(999999.5), "1e+06");
    }

    #[test]
    fn test_command_records() {
        assert_eq!(Command::Play.encode(), "cp");
        assert_eq!(Command::Seek(42.25).encode(), "ct42.25");
        assert_eq!(Command::Mute(true).encode(), "cm1");

        assert_eq!(Message::parse("cz").unwrap(), Message::Command(Command::Pause));
        assert_eq!(Message::parse("cv0.5\n").unwrap(), Message::Command(Command::Volume(0.5)));
        assert!(Message::parse("cq").is_err());
        assert!(Message::parse("cpx").is_err());
        assert!(Message::parse("ct").is_err());
    }

    #[test]
    fn test_message_dispatch() {
        match Message::parse("sh|t0|v1|m1|s4|b0").unwrap() {
            Message::Heartbeat(heartbeat) => {
                assert!(heartbeat.muted);
                assert_eq!(heartbeat.state, PlaybackState::Playing);
            }
            other => panic!("expected heartbeat, got {other:?}"),
        }
        assert!(Message::parse("hello").is_err());
    }
}
