//! Line-oriented console over a `KapplangApp`
//!
//! Reads one command per line and writes results as JSON. Used by the
//! `kapplang` binary on stdin/stdout; any `BufRead`/`Write` pair works.
//!
//! ```text
//! new              create a stack and select it
//! use <id>         select an existing stack
//! <integer>        push a literal (zero + succ/pred...)
//! <kapp>           dispatch a grounded kapp
//! stack            print the selected stack
//! log [start]      print the event log from a global position
//! counts [start]   print kapp counts from a global position
//! ```

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use thiserror::Error;
use uuid::Uuid;

use crate::app::KapplangApp;
use crate::error::KappError;
use crate::event_store::EventStore;

/// Why a single console command failed. Processing continues with the next line.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Kapp(#[from] KappError),

    #[error("no stack selected (use `new` or `use <id>`)")]
    NoStack,

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

type CommandResult = Result<Vec<String>, CommandError>;

/// Console that drives one app from a reader and reports to a writer
pub struct Console<S: EventStore, R, W> {
    app: KapplangApp<S>,
    reader: R,
    writer: W,
    current: Option<Uuid>,
}

impl<S: EventStore, R: BufRead, W: Write> Console<S, R, W> {
    pub fn new(app: KapplangApp<S>, reader: R, writer: W) -> Self {
        Self {
            app,
            reader,
            writer,
            current: None,
        }
    }

    pub fn app(&self) -> &KapplangApp<S> {
        &self.app
    }

    /// The stack commands currently apply to
    pub fn current_stack(&self) -> Option<Uuid> {
        self.current
    }

    /// Process lines until the reader is exhausted
    pub fn run(&mut self) -> io::Result<()> {
        let mut line = String::new();
        while self.reader.read_line(&mut line)? > 0 {
            let trimmed = line.trim();
            if !trimmed.is_empty() && !trimmed.starts_with('#') {
                self.handle_line(trimmed)?;
            }
            line.clear();
        }
        self.writer.flush()
    }

    fn handle_line(&mut self, line: &str) -> io::Result<()> {
        match self.execute(line) {
            Ok(output) => {
                for out in output {
                    writeln!(self.writer, "{}", out)?;
                }
            }
            Err(e) => writeln!(self.writer, "error: {}", e)?,
        }
        self.writer.flush()
    }

    fn execute(&mut self, line: &str) -> CommandResult {
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let arg = parts.next();
        if parts.next().is_some() {
            return Err(CommandError::Usage("one argument at most"));
        }

        match (command, arg) {
            ("new", None) => {
                let stack_id = self.app.create_stack()?;
                self.current = Some(stack_id);
                Ok(vec![stack_id.to_string()])
            }
            ("use", Some(id)) => {
                let stack_id: Uuid = id
                    .parse()
                    .map_err(|_| CommandError::Usage("use <stack id>"))?;
                let items = self.app.get_stack(stack_id)?;
                self.current = Some(stack_id);
                Ok(vec![serde_json::to_string(&items)?])
            }
            ("stack", None) => self.print_stack(),
            ("log", start) => {
                let start = parse_start(start, "log [start]")?;
                self.app
                    .get_event_log(start)?
                    .iter()
                    .map(|entry| serde_json::to_string(entry).map_err(CommandError::from))
                    .collect()
            }
            ("counts", start) => {
                let start = parse_start(start, "counts [start]")?;
                let counts: BTreeMap<String, usize> =
                    self.app.get_kapp_counts(start)?.into_iter().collect();
                Ok(vec![serde_json::to_string(&counts)?])
            }
            ("use", None) => Err(CommandError::Usage("use <stack id>")),
            (word, None) => {
                let stack_id = self.current.ok_or(CommandError::NoStack)?;
                match word.parse::<i64>() {
                    Ok(value) => self.app.push(stack_id, value)?,
                    Err(_) => self.app.dispatch(stack_id, word)?,
                };
                self.print_stack()
            }
            (_, Some(_)) => Err(CommandError::Usage("<kapp> and <integer> take no argument")),
        }
    }

    fn print_stack(&self) -> CommandResult {
        let stack_id = self.current.ok_or(CommandError::NoStack)?;
        let items = self.app.get_stack(stack_id)?;
        Ok(vec![serde_json::to_string(&items)?])
    }
}

fn parse_start(arg: Option<&str>, usage: &'static str) -> Result<u64, CommandError> {
    match arg {
        None => Ok(1),
        Some(text) => text.parse().map_err(|_| CommandError::Usage(usage)),
    }
}
