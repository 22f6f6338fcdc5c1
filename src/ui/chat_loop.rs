//! Interactive chat loop.
//!
//! Reads questions and slash commands line by line from stdin while channel
//! events stream answers into the terminal.

use std::error::Error;
use std::future::Future;
use std::io::{self, Write};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::commands::{execute, process_input, CommandResult};
use crate::core::app::App;
use crate::core::channel::ChannelEventReceiver;
use crate::ui::terminal::TerminalView;

pub async fn run_chat(
    mut app: App<TerminalView>,
    events: ChannelEventReceiver,
) -> Result<(), Box<dyn Error>> {
    let input = BufReader::new(tokio::io::stdin());
    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            debug!(error = %err, "could not listen for interrupt");
            std::future::pending::<()>().await;
        }
    };
    drive(&mut app, events, input, shutdown).await?;
    app.view_mut().notice("");
    Ok(())
}

/// Runs until `/quit`, end of input or `shutdown` completes.
pub(crate) async fn drive<W, R, F>(
    app: &mut App<TerminalView<W>>,
    mut events: ChannelEventReceiver,
    input: R,
    shutdown: F,
) -> io::Result<()>
where
    W: Write,
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    let mut lines = input.lines();
    tokio::pin!(shutdown);
    app.view_mut().prompt();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("input closed");
                    break;
                };
                let result = process_input(&line);
                if result == CommandResult::Quit {
                    break;
                }
                if let Some(feedback) = execute(app, result) {
                    app.view_mut().notice(&feedback);
                }
                app.view_mut().prompt();
            }
            Some((id, event)) = events.recv() => {
                app.handle_channel_event(id, event);
            }
            () = &mut shutdown => break,
        }
    }
    Ok(())
}
