//! Playback of tone chains on an opened driver.

use crate::drivers::ToneDriver;
use crate::error::Result;
use crate::sleep::Sleeper;
use crate::tone::{StdinMode, ToneChain, ToneParams};
use std::io::{BufRead, Read, Write};

/// Longest stretch of input echoed and beeped for at once.
const MAX_CHUNK: u64 = 4095;

/// Plays tone records on one driver.
///
/// The player owns the driver. Whatever way playback ends, the tone is
/// switched off and the driver closed exactly once before returning.
pub struct Player<S: Sleeper> {
    driver: Box<dyn ToneDriver>,
    sleeper: S,
}

impl<S: Sleeper> Player<S> {
    pub fn new(driver: Box<dyn ToneDriver>, sleeper: S) -> Self {
        Self { driver, sleeper }
    }

    /// Plays every record of `chain` in order, consuming it.
    ///
    /// `input` and `output` are only touched by records in a stdin trigger
    /// mode.
    pub fn play_chain<R, W>(mut self, chain: ToneChain, input: &mut R, output: &mut W) -> Result<()>
    where
        R: BufRead,
        W: Write,
    {
        let result = self.play_all(chain, input, output);

        self.driver.end_tone();
        self.driver.close();
        if let Err(e) = &result {
            log::debug!("playback stopped: {}", e);
        }
        result
    }

    fn play_all<R, W>(&mut self, chain: ToneChain, input: &mut R, output: &mut W) -> Result<()>
    where
        R: BufRead,
        W: Write,
    {
        for params in chain {
            match params.stdin_mode {
                StdinMode::None => self.play_beep(&params)?,
                StdinMode::PerLine | StdinMode::PerChar => {
                    self.play_from_input(&params, input, output)?
                }
            }
            // `params` is dropped here, before the next record starts.
        }
        Ok(())
    }

    /// Beeps once per line or character read from `input`, echoing it first.
    fn play_from_input<R, W>(&mut self, params: &ToneParams, input: &mut R, output: &mut W) -> Result<()>
    where
        R: BufRead,
        W: Write,
    {
        let mut line = Vec::new();
        loop {
            line.clear();
            // Longer lines arrive in several chunks, one beep each.
            if (&mut *input).take(MAX_CHUNK).read_until(b'\n', &mut line)? == 0 {
                return Ok(());
            }

            match params.stdin_mode {
                StdinMode::PerChar => {
                    for byte in &line {
                        output.write_all(std::slice::from_ref(byte))?;
                        output.flush()?;
                        self.play_beep(params)?;
                    }
                }
                _ => {
                    output.write_all(&line)?;
                    output.flush()?;
                    self.play_beep(params)?;
                }
            }
        }
    }

    /// One full repeat sequence of `params`.
    fn play_beep(&mut self, params: &ToneParams) -> Result<()> {
        log::info!(
            "{} times {} ms beeps ({} ms delay between, {} ms delay after) @ {} Hz",
            params.repeat_count,
            params.length_ms,
            params.delay_ms,
            if params.end_delay { params.delay_ms } else { 0 },
            params.frequency_hz
        );

        for i in 0..params.repeat_count {
            self.driver.begin_tone(params.driver_frequency());
            self.sleeper.sleep_ms(params.length_ms)?;
            self.driver.end_tone();
            if params.delay_after(i) {
                self.sleeper.sleep_ms(params.delay_ms)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::testing::{Call, CallLog, StubDriver};
    use crate::error::BeepError;
    use std::io::{self, Cursor};
    use std::path::PathBuf;

    /// Records waits; optionally reports a signal on the n-th wait.
    struct StubSleeper {
        log: CallLog,
        interrupt_on: Option<usize>,
        waits: usize,
    }

    impl Sleeper for StubSleeper {
        fn sleep_ms(&mut self, ms: u32) -> Result<()> {
            self.log.lock().push(Call::Wait(ms));
            self.waits += 1;
            if self.interrupt_on == Some(self.waits) {
                return Err(BeepError::Interrupted);
            }
            Ok(())
        }
    }

    /// Echo sink that records into the same call log.
    struct EchoLog(CallLog);

    impl Write for EchoLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().push(Call::Echo(buf.to_vec()));
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn player(log: &CallLog, interrupt_on: Option<usize>) -> Player<StubSleeper> {
        let driver = StubDriver {
            name: "stub",
            path: PathBuf::from("/dev/stub"),
            log: log.clone(),
        };
        let sleeper = StubSleeper {
            log: log.clone(),
            interrupt_on,
            waits: 0,
        };
        Player::new(Box::new(driver), sleeper)
    }

    fn tone(freq: u32, len: u32, reps: u32, delay: u32, end_delay: bool) -> ToneParams {
        ToneParams {
            frequency_hz: freq,
            length_ms: len,
            repeat_count: reps,
            delay_ms: delay,
            end_delay,
            stdin_mode: StdinMode::None,
        }
    }

    fn play(log: &CallLog, chain: ToneChain, input: &str) -> Result<()> {
        let mut input = Cursor::new(input.as_bytes().to_vec());
        let mut output = EchoLog(log.clone());
        player(log, None).play_chain(chain, &mut input, &mut output)
    }

    fn count(log: &CallLog, pred: impl Fn(&Call) -> bool) -> usize {
        log.lock().iter().filter(|c| pred(c)).count()
    }

    #[test]
    fn single_beep_has_no_trailing_delay() {
        let log = CallLog::default();
        play(&log, vec![tone(440, 200, 1, 100, false)], "").unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                Call::Begin("stub", 440),
                Call::Wait(200),
                Call::End("stub"),
                Call::End("stub"),
                Call::Close("stub"),
            ]
        );
    }

    #[test]
    fn repeats_wait_between_but_not_after() {
        let log = CallLog::default();
        play(&log, vec![tone(1000, 50, 4, 20, false)], "").unwrap();

        assert_eq!(count(&log, |c| matches!(c, Call::Begin(..))), 4);
        assert_eq!(count(&log, |c| *c == Call::Wait(50)), 4);
        assert_eq!(count(&log, |c| *c == Call::Wait(20)), 3);
    }

    #[test]
    fn end_delay_waits_after_last_repeat() {
        let log = CallLog::default();
        play(&log, vec![tone(1000, 50, 4, 20, true)], "").unwrap();

        assert_eq!(count(&log, |c| *c == Call::Wait(20)), 4);
        let calls = log.lock();
        let n = calls.len();
        assert_eq!(calls[n - 3], Call::Wait(20));
        assert_eq!(calls[n - 1], Call::Close("stub"));
    }

    #[test]
    fn zero_repeats_play_nothing() {
        let log = CallLog::default();
        play(&log, vec![tone(440, 200, 0, 100, true)], "").unwrap();

        assert_eq!(*log.lock(), vec![Call::End("stub"), Call::Close("stub")]);
    }

    #[test]
    fn chain_plays_each_record_once_in_order() {
        let log = CallLog::default();
        let chain = vec![
            tone(100, 10, 1, 0, false),
            tone(200, 20, 1, 0, false),
            tone(300, 30, 1, 0, false),
        ];
        play(&log, chain, "").unwrap();

        let begins: Vec<_> = log
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Begin(_, f) => Some(*f),
                _ => None,
            })
            .collect();
        assert_eq!(begins, vec![100, 200, 300]);
        assert_eq!(count(&log, |c| matches!(c, Call::Close(_))), 1);
    }

    #[test]
    fn interrupt_during_tone_stops_and_closes_once() {
        let log = CallLog::default();
        let mut input = Cursor::new(Vec::new());
        let mut output = Vec::new();
        let result = player(&log, Some(1)).play_chain(
            vec![tone(440, 200, 3, 100, false), tone(880, 200, 1, 0, false)],
            &mut input,
            &mut output,
        );

        assert!(matches!(result, Err(BeepError::Interrupted)));
        assert_eq!(
            *log.lock(),
            vec![
                Call::Begin("stub", 440),
                Call::Wait(200),
                Call::End("stub"),
                Call::Close("stub"),
            ]
        );
    }

    #[test]
    fn interrupt_during_delay_still_closes() {
        let log = CallLog::default();
        let mut input = Cursor::new(Vec::new());
        let mut output = Vec::new();
        let result = player(&log, Some(2)).play_chain(
            vec![tone(440, 200, 3, 100, false)],
            &mut input,
            &mut output,
        );

        assert!(matches!(result, Err(BeepError::Interrupted)));
        assert_eq!(count(&log, |c| matches!(c, Call::Begin(..))), 1);
        assert_eq!(count(&log, |c| matches!(c, Call::Close(_))), 1);
        assert_eq!(log.lock().last(), Some(&Call::Close("stub")));
    }

    #[test]
    fn per_line_mode_echoes_then_beeps_for_each_line() {
        let log = CallLog::default();
        let mut params = tone(440, 200, 2, 100, false);
        params.stdin_mode = StdinMode::PerLine;
        play(&log, vec![params], "first\nsecond\n").unwrap();

        let calls = log.lock();
        let sequence = [
            Call::Begin("stub", 440),
            Call::Wait(200),
            Call::End("stub"),
            Call::Wait(100),
            Call::Begin("stub", 440),
            Call::Wait(200),
            Call::End("stub"),
        ];
        assert_eq!(calls[0], Call::Echo(b"first\n".to_vec()));
        assert_eq!(calls[1..8], sequence);
        assert_eq!(calls[8], Call::Echo(b"second\n".to_vec()));
        assert_eq!(calls[9..16], sequence);
        assert_eq!(calls[16..], [Call::End("stub"), Call::Close("stub")]);
    }

    #[test]
    fn per_line_mode_handles_missing_final_newline() {
        let log = CallLog::default();
        let mut params = tone(440, 10, 1, 0, false);
        params.stdin_mode = StdinMode::PerLine;
        play(&log, vec![params], "a\nb").unwrap();

        assert_eq!(count(&log, |c| matches!(c, Call::Begin(..))), 2);
        assert!(log.lock().contains(&Call::Echo(b"b".to_vec())));
    }

    #[test]
    fn per_line_mode_splits_overlong_lines() {
        let log = CallLog::default();
        let mut params = tone(440, 10, 1, 0, false);
        params.stdin_mode = StdinMode::PerLine;
        play(&log, vec![params], &"x".repeat(5000)).unwrap();

        let echoed: Vec<usize> = log
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Echo(bytes) => Some(bytes.len()),
                _ => None,
            })
            .collect();
        assert_eq!(echoed, vec![4095, 905]);
        assert_eq!(count(&log, |c| matches!(c, Call::Begin(..))), 2);
    }

    #[test]
    fn per_char_mode_beeps_for_every_byte() {
        let log = CallLog::default();
        let mut params = tone(440, 10, 1, 0, false);
        params.stdin_mode = StdinMode::PerChar;
        play(&log, vec![params], "ab\n").unwrap();

        let echoes: Vec<_> = log
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Echo(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(echoes, vec![b"a".to_vec(), b"b".to_vec(), b"\n".to_vec()]);
        assert_eq!(count(&log, |c| matches!(c, Call::Begin(..))), 3);
    }

    #[test]
    fn empty_input_plays_nothing_then_moves_on() {
        let log = CallLog::default();
        let mut params = tone(440, 10, 1, 0, false);
        params.stdin_mode = StdinMode::PerLine;
        play(&log, vec![params, tone(880, 10, 1, 0, false)], "").unwrap();

        assert_eq!(count(&log, |c| *c == Call::Begin("stub", 880)), 1);
        assert_eq!(count(&log, |c| matches!(c, Call::Begin(..))), 1);
    }
}
