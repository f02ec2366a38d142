use std::path::PathBuf;
use std::str::FromStr;

use crate::core::chord::ChordSelection;

/// Commands sent from control surfaces to the application loop
#[derive(Debug, Clone, PartialEq)]
pub enum SynthMessage {
    Play(String),
    Stop(String),
    KeyDown(char),
    KeyUp(char),
    PlayChord(usize),
    StopChord(usize),
    SelectChord(usize, ChordSelection), // (slot, selection)
    SetAmplitude(f32),
    SetDecay(f32),
    SetDuration(f32),
    SetRelease(f32),
    ShiftOctave(bool), // true = up
    LoadScore(PathBuf),
    StartPlayback,
    StopPlayback,
    Status,
    Panic,
    SaveSettings,
    Quit,
}

/// Console help text, one line per command
pub const COMMAND_HELP: &str = "\
play <note>            start a note, e.g. play C#4
stop <note>            release a note
key <k> / unkey <k>    press / release a mapped computer key
chord <n> / unchord <n> play / release chord slot n
select <n> <root> <quality>  set chord slot n, e.g. select 0 A3 minor
amp|decay|dur|release <value>  set a synthesis parameter
octave +|-             shift the octave window
load <path>            load a JSON score
start / halt           start / stop score playback
status                 show window, parameters and sounding notes
panic                  release every note
save                   write settings
quit                   exit";

impl FromStr for SynthMessage {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words
            .next()
            .ok_or_else(|| "empty command".to_string())?
            .to_ascii_lowercase();
        let rest: Vec<&str> = words.collect();

        let arg = |i: usize| {
            rest.get(i)
                .copied()
                .ok_or_else(|| format!("{}: missing argument", command))
        };
        let number = |i: usize| {
            let raw = arg(i)?;
            raw.parse::<f32>()
                .map_err(|_| format!("{}: not a number: {}", command, raw))
        };
        let slot = |i: usize| {
            let raw = arg(i)?;
            raw.parse::<usize>()
                .map_err(|_| format!("{}: not a slot index: {}", command, raw))
        };
        let key = |i: usize| {
            let raw = arg(i)?;
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                _ => Err(format!("{}: expected a single key, got {}", command, raw)),
            }
        };

        let message = match command.as_str() {
            "play" => SynthMessage::Play(arg(0)?.to_string()),
            "stop" => SynthMessage::Stop(arg(0)?.to_string()),
            "key" => SynthMessage::KeyDown(key(0)?),
            "unkey" => SynthMessage::KeyUp(key(0)?),
            "chord" => SynthMessage::PlayChord(slot(0)?),
            "unchord" => SynthMessage::StopChord(slot(0)?),
            "select" => {
                let selection = format!("{} {}", arg(1)?, arg(2)?)
                    .parse()
                    .map_err(|e| format!("select: {}", e))?;
                SynthMessage::SelectChord(slot(0)?, selection)
            }
            "amp" | "amplitude" => SynthMessage::SetAmplitude(number(0)?),
            "decay" => SynthMessage::SetDecay(number(0)?),
            "dur" | "duration" => SynthMessage::SetDuration(number(0)?),
            "release" => SynthMessage::SetRelease(number(0)?),
            "octave" => match arg(0)? {
                "+" | "up" => SynthMessage::ShiftOctave(true),
                "-" | "down" => SynthMessage::ShiftOctave(false),
                other => return Err(format!("octave: expected + or -, got {}", other)),
            },
            "load" => SynthMessage::LoadScore(PathBuf::from(rest.join(" "))),
            "start" => SynthMessage::StartPlayback,
            "halt" => SynthMessage::StopPlayback,
            "status" => SynthMessage::Status,
            "panic" => SynthMessage::Panic,
            "save" => SynthMessage::SaveSettings,
            "quit" | "exit" => SynthMessage::Quit,
            other => return Err(format!("unknown command: {}", other)),
        };

        if matches!(message, SynthMessage::LoadScore(ref p) if p.as_os_str().is_empty()) {
            return Err("load: missing argument".to_string());
        }
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!("play C#4".parse::<SynthMessage>(), Ok(SynthMessage::Play("C#4".into())));
        assert_eq!("STOP A4".parse::<SynthMessage>(), Ok(SynthMessage::Stop("A4".into())));
        assert_eq!("key ö".parse::<SynthMessage>(), Ok(SynthMessage::KeyDown('ö')));
        assert_eq!("unchord 3".parse::<SynthMessage>(), Ok(SynthMessage::StopChord(3)));
        assert_eq!("amp 0.3".parse::<SynthMessage>(), Ok(SynthMessage::SetAmplitude(0.3)));
        assert_eq!("octave -".parse::<SynthMessage>(), Ok(SynthMessage::ShiftOctave(false)));
        assert_eq!(
            "load my scores/song.json".parse::<SynthMessage>(),
            Ok(SynthMessage::LoadScore(PathBuf::from("my scores/song.json")))
        );
        assert_eq!("halt".parse::<SynthMessage>(), Ok(SynthMessage::StopPlayback));
    }

    #[test]
    fn test_parse_select() {
        let parsed: SynthMessage = "select 2 A3 minor".parse().unwrap();
        assert_eq!(
            parsed,
            SynthMessage::SelectChord(2, "A3 minor".parse().unwrap())
        );
        assert!("select 2 A3 sus".parse::<SynthMessage>().is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<SynthMessage>().is_err());
        assert!("play".parse::<SynthMessage>().is_err());
        assert!("load".parse::<SynthMessage>().is_err());
        assert!("amp loud".parse::<SynthMessage>().is_err());
        assert!("key ab".parse::<SynthMessage>().is_err());
        assert!("octave sideways".parse::<SynthMessage>().is_err());
        assert!("dance".parse::<SynthMessage>().is_err());
    }
}
