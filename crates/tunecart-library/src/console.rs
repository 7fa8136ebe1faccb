//! Primitiva de preguntas interactivas.
//!
//! Cada bucle interactivo es "leer, validar, repetir hasta que sea válido":
//! un texto de pregunta y un validador que devuelve el valor o el mensaje a
//! mostrar antes de volver a preguntar.

use std::io::{BufRead, Write};

use crate::error::{LibraryError, Result};

pub trait Console {
    /// Muestra una línea de texto.
    fn say(&mut self, text: &str) -> Result<()>;

    /// Pregunta y devuelve la línea leída, sin el salto de línea final.
    fn ask(&mut self, prompt: &str) -> Result<String>;
}

/// Repite `prompt` hasta que `validate` acepte la respuesta.
pub fn ask_until<T, F>(console: &mut dyn Console, prompt: &str, mut validate: F) -> Result<T>
where
    F: FnMut(&str) -> std::result::Result<T, String>,
{
    loop {
        let answer = console.ask(prompt)?;
        match validate(&answer) {
            Ok(value) => return Ok(value),
            Err(msg) => console.say(&msg)?,
        }
    }
}

/// Respuesta no vacía (recortada).
pub fn ask_non_blank(console: &mut dyn Console, prompt: &str) -> Result<String> {
    ask_until(console, prompt, |answer| {
        let answer = answer.trim();
        if answer.is_empty() {
            Err("A value is required.".to_string())
        } else {
            Ok(answer.to_string())
        }
    })
}

/// Pregunta `[y/n]` hasta obtener una de las dos.
pub fn confirm(console: &mut dyn Console, prompt: &str) -> Result<bool> {
    ask_until(console, prompt, |answer| match answer.trim().to_ascii_lowercase().as_str() {
        "y" => Ok(true),
        "n" => Ok(false),
        _ => Err("Please answer y or n.".to_string()),
    })
}

/// Consola sobre cualquier par lector/escritor (stdin redirigido, tests).
pub struct LineConsole<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LineConsole<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Console for LineConsole<R, W> {
    fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{text}")?;
        Ok(())
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}: ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(LibraryError::InputClosed);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}
