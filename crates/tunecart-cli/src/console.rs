use std::io::{self, BufReader, IsTerminal, Stdin, Stdout, Write};

use dialoguer::{Input, theme::ColorfulTheme};
use tunecart_library::{Console, LibraryError, LineConsole, Result};

/// Consola interactiva con `dialoguer` cuando stdin es un terminal.
pub struct TermConsole {
    theme: ColorfulTheme,
}

impl TermConsole {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Console for TermConsole {
    fn say(&mut self, text: &str) -> Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{text}")?;
        Ok(())
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        let prompt = match prompt.strip_prefix('\n') {
            Some(rest) => {
                self.say("")?;
                rest
            }
            None => prompt,
        };

        Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| LibraryError::Io(io::Error::other(e)))
    }
}

pub type PipedConsole = LineConsole<BufReader<Stdin>, Stdout>;

/// `dialoguer` en un terminal; lectura de líneas si la entrada viene de un pipe.
pub fn stdio_console() -> Box<dyn Console> {
    if io::stdin().is_terminal() {
        Box::new(TermConsole::new())
    } else {
        let piped: PipedConsole = LineConsole::new(BufReader::new(io::stdin()), io::stdout());
        Box::new(piped)
    }
}
