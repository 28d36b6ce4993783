//! Interactive confirmation on the terminal.

use std::io::{self, BufRead, IsTerminal, Write};

use dialoguer::{theme::ColorfulTheme, Confirm};
use tracing::warn;

fn use_dialoguer() -> bool {
    io::stdin().is_terminal() && io::stderr().is_terminal()
}

/// Ask a yes/no question that defaults to no.
///
/// Uses an interactive prompt on a terminal and a plain line read from stdin
/// otherwise. Anything but an explicit yes, including end of input, is no.
pub fn confirm(label: &str) -> bool {
    if use_dialoguer() {
        let theme = ColorfulTheme::default();
        return match Confirm::with_theme(&theme)
            .with_prompt(label)
            .default(false)
            .interact()
        {
            Ok(confirmed) => confirmed,
            Err(e) => {
                warn!("prompt failed: {}", e);
                false
            }
        };
    }

    eprint!("{}", plain_prompt(label));
    let _ = io::stderr().flush();

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => is_yes(&answer),
        Err(_) => false,
    }
}

fn plain_prompt(label: &str) -> String {
    format!("{} Default [no]: ", label)
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
