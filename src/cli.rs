//! Command line parsing.
//!
//! `-n`/`--new` splits the command line into segments, one per tone. Every
//! segment is parsed with the same clap command; the device and verbosity
//! options may appear in any of them.

use crate::config::BeepConfig;
use crate::error::{BeepError, Result};
use crate::tone::{StdinMode, ToneChain, ToneParams, MAX_COUNT, MAX_FREQ};
use clap::{crate_version, Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;

/// Validated command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub chain: ToneChain,
    pub device: Option<PathBuf>,
}

/// Per-tone options as given; `None` means "not given".
#[derive(Debug, Clone, Default, PartialEq)]
struct ToneArgs {
    frequencies: Vec<u32>,
    length_ms: Option<u32>,
    repeat_count: Option<u32>,
    delay_ms: Option<u32>,
    end_delay: Option<bool>,
    stdin_mode: StdinMode,
}

/// Parsed command line, before config defaults are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    tones: Vec<ToneArgs>,
    device: Option<PathBuf>,
    pub verbosity: u8,
}

fn parse_frequency(s: &str) -> std::result::Result<u32, String> {
    let freq: f32 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{s}' is not a frequency"))?;
    if !(0.0..=MAX_FREQ).contains(&freq) {
        return Err(format!("frequency must be between 0 and {MAX_FREQ} Hz"));
    }
    Ok((freq + 0.5) as u32)
}

fn parse_count(s: &str) -> std::result::Result<u32, String> {
    let value: u32 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{s}' is not a non-negative integer"))?;
    if value > MAX_COUNT {
        return Err(format!("must not exceed {MAX_COUNT}"));
    }
    Ok(value)
}

/// The clap command for one tone segment.
pub fn command() -> Command {
    Command::new("beep")
        .version(crate_version!())
        .about("Beep the PC speaker any number of ways")
        .after_help("Use -n/--new to start a new beep with its own options.")
        .args_override_self(true)
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .short('V')
                .short_alias('v')
                .long("version")
                .action(ArgAction::Version)
                .help("Print version"),
        )
        .arg(
            Arg::new("frequency")
                .short('f')
                .value_name("FREQ")
                .value_parser(parse_frequency)
                .action(ArgAction::Append)
                .help("Tone frequency in Hz (0 to 20000)"),
        )
        .arg(
            Arg::new("length")
                .short('l')
                .value_name("LEN")
                .value_parser(parse_count)
                .help("Tone length in ms"),
        )
        .arg(
            Arg::new("reps")
                .short('r')
                .value_name("REPS")
                .value_parser(parse_count)
                .help("Number of repetitions"),
        )
        .arg(
            Arg::new("delay")
                .short('d')
                .value_name("DELAY")
                .value_parser(parse_count)
                .overrides_with("end-delay")
                .help("Delay between repetitions in ms"),
        )
        .arg(
            Arg::new("end-delay")
                .short('D')
                .value_name("DELAY")
                .value_parser(parse_count)
                .overrides_with("delay")
                .help("Delay between and after repetitions in ms"),
        )
        .arg(
            Arg::new("stdin-line")
                .short('s')
                .action(ArgAction::SetTrue)
                .overrides_with("stdin-char")
                .help("Beep after each line of stdin, echoing it"),
        )
        .arg(
            Arg::new("stdin-char")
                .short('c')
                .action(ArgAction::SetTrue)
                .overrides_with("stdin-line")
                .help("Beep after each character of stdin, echoing it"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .visible_alias("debug")
                .action(ArgAction::Count)
                .help("Log more; repeat for debug output"),
        )
        .arg(
            Arg::new("device")
                .short('e')
                .long("device")
                .value_name("DEVICE")
                .value_parser(clap::value_parser!(PathBuf))
                .action(ArgAction::Append)
                .help("Use DEVICE instead of detecting one"),
        )
}

fn tone_args(matches: &ArgMatches) -> ToneArgs {
    let (delay_ms, end_delay) = match (
        matches.get_one::<u32>("delay"),
        matches.get_one::<u32>("end-delay"),
    ) {
        (_, Some(&delay)) => (Some(delay), Some(true)),
        (Some(&delay), None) => (Some(delay), Some(false)),
        (None, None) => (None, None),
    };

    let stdin_mode = if matches.get_flag("stdin-line") {
        StdinMode::PerLine
    } else if matches.get_flag("stdin-char") {
        StdinMode::PerChar
    } else {
        StdinMode::None
    };

    ToneArgs {
        frequencies: matches
            .get_many::<u32>("frequency")
            .map(|values| values.copied().collect())
            .unwrap_or_default(),
        length_ms: matches.get_one::<u32>("length").copied(),
        repeat_count: matches.get_one::<u32>("reps").copied(),
        delay_ms,
        end_delay,
        stdin_mode,
    }
}

/// Short options that take a value, attached or as the next argument.
const TAKES_VALUE: &[char] = &['f', 'l', 'r', 'd', 'D', 'e'];

/// Splits `args` (without the program name) at every `-n`/`--new`.
///
/// Short flags are scanned the way getopt does, so `-n` also counts inside
/// a bundle (`-sn`, `-nf 880`) but never inside an option value.
fn segments(args: Vec<OsString>) -> Vec<Vec<OsString>> {
    let mut segments: Vec<Vec<OsString>> = vec![Vec::new()];
    let mut value_next = false;

    for arg in args {
        let text = match arg.to_str() {
            Some(text) if !value_next => text,
            _ => {
                value_next = false;
                push(&mut segments, arg);
                continue;
            }
        };

        if text == "--new" {
            segments.push(Vec::new());
            continue;
        }
        if text.starts_with("--") || !text.starts_with('-') || text == "-" {
            value_next = text == "--device";
            push(&mut segments, arg);
            continue;
        }

        let mut flags = String::new();
        for (i, c) in text.char_indices().skip(1) {
            if c == 'n' {
                if !flags.is_empty() {
                    push(&mut segments, format!("-{flags}").into());
                    flags.clear();
                }
                segments.push(Vec::new());
            } else if TAKES_VALUE.contains(&c) {
                let rest = &text[i + c.len_utf8()..];
                value_next = rest.is_empty();
                push(&mut segments, format!("-{flags}{c}{rest}").into());
                flags.clear();
                break;
            } else {
                flags.push(c);
            }
        }
        if !flags.is_empty() {
            push(&mut segments, format!("-{flags}").into());
        }
    }
    segments
}

fn push(segments: &mut [Vec<OsString>], arg: OsString) {
    if let Some(current) = segments.last_mut() {
        current.push(arg);
    }
}

impl Args {
    /// Parses a full command line including the program name.
    pub fn parse_from<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let mut args = args.into_iter().map(Into::into);
        let bin = args.next().unwrap_or_else(|| OsString::from("beep"));

        let mut parsed = Args::default();
        let mut devices = Vec::new();
        for segment in segments(args.collect()) {
            let matches =
                command().try_get_matches_from(std::iter::once(bin.clone()).chain(segment))?;

            parsed.tones.push(tone_args(&matches));
            parsed.verbosity = parsed.verbosity.saturating_add(matches.get_count("verbose"));
            if let Some(values) = matches.get_many::<PathBuf>("device") {
                devices.extend(values.cloned());
            }
        }

        if devices.len() > 1 {
            return Err(BeepError::Usage(
                "You cannot give the --device parameter more than once.".into(),
            ));
        }
        parsed.device = devices.pop();
        Ok(parsed)
    }

    /// Fills in unset values from `config` and produces the tone chain.
    pub fn resolve(self, config: &BeepConfig) -> Options {
        let chain = self
            .tones
            .into_iter()
            .map(|tone| {
                if tone.frequencies.len() > 1 {
                    log::warn!("multiple -f values given, only last one is used.");
                }
                let frequency_hz = match tone.frequencies.last() {
                    Some(&freq) if freq != 0 => freq,
                    _ => config.frequency(),
                };
                ToneParams {
                    frequency_hz,
                    length_ms: tone.length_ms.unwrap_or(config.length_ms),
                    repeat_count: tone.repeat_count.unwrap_or(config.repetitions),
                    delay_ms: tone.delay_ms.unwrap_or(config.delay_ms),
                    end_delay: tone.end_delay.unwrap_or(config.end_delay),
                    stdin_mode: tone.stdin_mode,
                }
            })
            .collect();

        Options {
            chain,
            device: self.device.or_else(|| config.device.clone()),
        }
    }
}
