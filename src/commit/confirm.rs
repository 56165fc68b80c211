//! Interactive yes/no confirmation.

use dialoguer::Confirm;
use tracing::debug;

/// Asks the user to approve an action.
///
/// Anything other than an explicit "yes" must come back as `false`.
#[cfg_attr(test, mockall::automock)]
pub trait Confirmer {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Terminal prompt that defaults to "no".
pub struct DialoguerConfirmer;

impl Confirmer for DialoguerConfirmer {
    fn confirm(&self, prompt: &str) -> bool {
        match Confirm::new().with_prompt(prompt).default(false).interact() {
            Ok(answer) => answer,
            Err(e) => {
                // No terminal, or the prompt was interrupted
                debug!("Confirmation prompt failed: {}", e);
                false
            }
        }
    }
}
