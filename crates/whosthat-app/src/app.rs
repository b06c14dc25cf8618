// Application event loop.
//
// Owns the RoundController and multiplexes two inputs with tokio::select!:
// completions from the controller's background work, and commands from the
// presentation layer. After every applied change a fresh snapshot is pushed
// to presentation.

use tokio::sync::mpsc;
use tracing::{debug, info};
use whosthat_core::protocol::{UiUpdate, UserCommand};

use crate::round::{RoundController, RoundEvent};

/// Run the event loop until `Quit` arrives or the command channel closes.
///
/// `event_rx` must be the receiving half of the channel whose sender was
/// handed to `controller`.
pub async fn run(
    mut event_rx: mpsc::Receiver<RoundEvent>,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut controller: RoundController,
) -> anyhow::Result<()> {
    info!("Round event loop started");

    // Presentation gets the starting state (best score, any round already
    // in flight) before the first event.
    push_snapshot(&controller, &ui_tx).await;

    loop {
        tokio::select! {
            // --- Round events ---
            event = event_rx.recv() => {
                match event {
                    Some(event) => {
                        if controller.handle_event(event) {
                            push_snapshot(&controller, &ui_tx).await;
                        }
                    }
                    None => {
                        info!("Round event channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        handle_user_command(&mut controller, cmd, &ui_tx).await;
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }
        }
    }

    // Cleanup
    controller.cancel_pending();
    info!("Round event loop exiting");
    Ok(())
}

async fn handle_user_command(
    controller: &mut RoundController,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match cmd {
        UserCommand::Start => {
            controller.start();
        }
        UserCommand::UpdateGuess(text) => {
            controller.update_guess_input(text);
        }
        UserCommand::SubmitGuess(guess) => {
            let outcome = match guess {
                Some(text) => controller.submit_guess(&text),
                None => controller.submit_current_guess(),
            };
            debug!(?outcome, "Guess evaluated");
            let _ = ui_tx.send(UiUpdate::GuessEvaluated(outcome)).await;
        }
        UserCommand::Quit => {
            // Handled by the loop before dispatch.
        }
    }
    push_snapshot(controller, ui_tx).await;
}

async fn push_snapshot(controller: &RoundController, ui_tx: &mpsc::Sender<UiUpdate>) {
    let update = UiUpdate::Snapshot(Box::new(controller.snapshot()));
    let _ = ui_tx.send(update).await;
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
