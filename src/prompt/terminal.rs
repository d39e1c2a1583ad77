// Interactive answers on the controlling terminal
//
// Each field is asked as `description (default) `. Invalid answers print the
// field's message and the same field is asked again. Hidden fields are read in
// raw mode without echo. Esc, Ctrl-C, Ctrl-D or end of input cancel.

use super::AnswerSource;
use crate::error::{Result, SetupError};
use crate::models::fields::{Answers, FieldDescriptor};
use crate::utils::validation::resolve_answer;
use async_trait::async_trait;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{self, BufRead, Write};

#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalAnswers;

#[async_trait]
impl AnswerSource for TerminalAnswers {
    async fn collect(&self, fields: &[FieldDescriptor]) -> Result<Option<Answers>> {
        let fields = fields.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut input = StdinInput;
            let mut out = io::stdout();
            prompt_fields(&fields, &mut input, &mut out)
        })
        .await
        .map_err(|e| SetupError::Aborted(format!("prompt task failed: {}", e)))?
    }
}

/// One line of operator input; `None` when the operator cancelled.
pub trait LineInput {
    fn read_answer(&mut self, hidden: bool) -> io::Result<Option<String>>;
}

struct StdinInput;

impl LineInput for StdinInput {
    fn read_answer(&mut self, hidden: bool) -> io::Result<Option<String>> {
        if hidden {
            return read_hidden();
        }
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

fn read_hidden() -> io::Result<Option<String>> {
    terminal::enable_raw_mode()?;
    let result = read_hidden_raw();
    terminal::disable_raw_mode()?;
    // raw mode swallowed the operator's newline
    println!();
    result
}

fn read_hidden_raw() -> io::Result<Option<String>> {
    let mut value = String::new();
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind == KeyEventKind::Release {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(Some(value)),
            KeyCode::Esc => return Ok(None),
            KeyCode::Char('c') | KeyCode::Char('d')
                if key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                return Ok(None)
            }
            KeyCode::Char(c) => value.push(c),
            KeyCode::Backspace => {
                value.pop();
            }
            _ => {}
        }
    }
}

fn terminal_abort(e: io::Error) -> SetupError {
    SetupError::Aborted(format!("terminal unavailable: {}", e))
}

/// Ask every field in order, re-asking until each answer validates.
pub fn prompt_fields(
    fields: &[FieldDescriptor],
    input: &mut dyn LineInput,
    out: &mut dyn Write,
) -> Result<Option<Answers>> {
    let mut answers = Answers::new();

    for field in fields {
        loop {
            let prompt = match field.default.as_deref() {
                Some(d) if !field.hidden => format!("{} ({}) ", field.description, d),
                _ => format!("{} ", field.description),
            };
            write!(out, "{}", prompt).map_err(terminal_abort)?;
            out.flush().map_err(terminal_abort)?;

            let Some(raw) = input.read_answer(field.hidden).map_err(terminal_abort)? else {
                writeln!(out).map_err(terminal_abort)?;
                return Ok(None);
            };

            match resolve_answer(field, Some(&raw)) {
                Ok(value) => {
                    answers.insert(field.name, value);
                    break;
                }
                Err(SetupError::ValidationFailed { message, .. }) => {
                    writeln!(out, "  {}", message).map_err(terminal_abort)?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    Ok(Some(answers))
}
