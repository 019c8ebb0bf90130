//! Line driven control of a [`Sequencer`], one command per line.

use crate::sequencer::{PlaybackBackend, Sequencer};
use anyhow::Result;
use std::io::{BufRead, Write};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionCommand {
    Next,
    Skip,
    Previous,
    Favorite,
    Never,
    Pause,
    Seek(f64),
    Status,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseCommandError {
    #[error("Unknown command '{0}'. Try: next, skip, prev, fav, never, pause, seek <ratio>, status, quit")]
    Unknown(String),
    #[error("seek needs a ratio between 0 and 1")]
    MissingRatio,
    #[error("'{0}' is not a number")]
    BadRatio(String),
}

impl FromStr for SessionCommand {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default().to_lowercase();
        Ok(match command.as_str() {
            "next" | "n" => Self::Next,
            "skip" | "s" => Self::Skip,
            "prev" | "previous" | "p" => Self::Previous,
            "fav" | "favorite" | "f" => Self::Favorite,
            "never" => Self::Never,
            "pause" | "play" => Self::Pause,
            "status" | "" => Self::Status,
            "quit" | "exit" | "q" => Self::Quit,
            "seek" => {
                let ratio = words.next().ok_or(ParseCommandError::MissingRatio)?;
                let ratio = ratio
                    .parse()
                    .map_err(|_| ParseCommandError::BadRatio(ratio.to_string()))?;
                Self::Seek(ratio)
            }
            _ => return Err(ParseCommandError::Unknown(command)),
        })
    }
}

/// Run commands from `input` until `quit` or end of input, reporting to
/// `out` after each one.
///
/// # Errors
///
/// Engine errors end the session; so do failures writing to `out`.
pub fn run<B, R, W>(sequencer: &mut Sequencer<B>, input: R, out: &mut W) -> Result<()>
where
    B: PlaybackBackend,
    R: BufRead,
    W: Write,
{
    write_status(sequencer, out)?;
    for line in input.lines() {
        let line = line?;
        let command = match line.parse::<SessionCommand>() {
            Ok(command) => command,
            Err(e) => {
                writeln!(out, "{e}")?;
                continue;
            }
        };
        log::debug!("Session command {command:?}");

        match command {
            SessionCommand::Next => sequencer.play_next()?,
            SessionCommand::Skip => sequencer.skip_next()?,
            SessionCommand::Previous => {
                if !sequencer.previous()? {
                    writeln!(out, "Nothing to go back to")?;
                }
            }
            SessionCommand::Favorite => sequencer.favorite_current()?,
            SessionCommand::Never => sequencer.never_play_current()?,
            SessionCommand::Pause => sequencer.play_pause()?,
            SessionCommand::Seek(ratio) => sequencer.seek(ratio),
            SessionCommand::Status => {}
            SessionCommand::Quit => break,
        }
        write_status(sequencer, out)?;
    }
    Ok(())
}

fn write_status<B: PlaybackBackend, W: Write>(sequencer: &Sequencer<B>, out: &mut W) -> Result<()> {
    let title = |track: Option<&crate::source::Track>| {
        track.map_or_else(|| "-".to_string(), crate::source::Track::title)
    };
    writeln!(
        out,
        "{} [{:.0}%]  previous: {}  next: {}",
        title(sequencer.current_track()),
        sequencer.current_progress_ratio() * 100.0,
        title(sequencer.previous_track()),
        title(sequencer.next_track()),
    )?;
    Ok(())
}
