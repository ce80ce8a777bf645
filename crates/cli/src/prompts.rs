use anyhow::{Result, bail};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Password};
use std::io::{self, IsTerminal, Write};

use artisan_lib::input::InputProvider;
use artisan_lib::manifest::{Key, Secret, Var};

pub fn confirm(message: &str, force: bool) -> Result<bool> {
  if force {
    return Ok(true);
  }

  if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
    bail!("Cannot prompt for confirmation in non-interactive mode. Use --force to proceed.");
  }

  write!(io::stderr(), "{} [y/N] ", message)?;
  io::stderr().flush()?;

  let mut input = String::new();
  io::stdin().read_line(&mut input)?;

  Ok(matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// Asks for missing function inputs on the terminal.
///
/// Secrets and private keys are read without echo. A prompt that cannot be
/// shown (no terminal) leaves the input unresolved.
#[derive(Default)]
pub struct TerminalPrompt {
  theme: ColorfulTheme,
}

impl TerminalPrompt {
  fn text(&self, name: &str, description: Option<&str>) -> Option<String> {
    Input::<String>::with_theme(&self.theme)
      .with_prompt(label(name, description))
      .allow_empty(true)
      .interact_text()
      .ok()
  }

  fn hidden(&self, name: &str, description: Option<&str>) -> Option<String> {
    Password::with_theme(&self.theme)
      .with_prompt(label(name, description))
      .allow_empty_password(true)
      .interact()
      .ok()
  }
}

fn label(name: &str, description: Option<&str>) -> String {
  match description {
    Some(d) if !d.is_empty() => format!("{name} ({d})"),
    _ => name.to_string(),
  }
}

impl InputProvider for TerminalPrompt {
  fn var(&self, var: &Var) -> Option<String> {
    self.text(&var.name, var.description.as_deref())
  }

  fn secret(&self, secret: &Secret) -> Option<String> {
    self.hidden(&secret.name, secret.description.as_deref())
  }

  fn key(&self, key: &Key) -> Option<String> {
    if key.private {
      self.hidden(&key.name, key.description.as_deref())
    } else {
      self.text(&key.name, key.description.as_deref())
    }
  }
}
