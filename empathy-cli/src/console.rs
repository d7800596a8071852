//! Console front-end: one dispatcher turn per line typed

use empathy_core::{Dispatcher, TurnResult};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;

fn is_exit(line: &str) -> bool {
    line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}

/// Run the chat loop until `exit`, `quit` or end of input.
///
/// With an emoji stream the decorated reply is shown, otherwise the plain one.
pub async fn run<R, W>(
    dispatcher: &Dispatcher,
    input: R,
    output: &mut W,
    mut emoji: Option<mpsc::UnboundedReceiver<String>>,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output
        .write_all(b"Chat started. Type 'exit' or 'quit' to leave.\n")
        .await?;
    let mut lines = input.lines();

    loop {
        output.write_all(b"You: ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if is_exit(line) {
            break;
        }

        let text = match dispatcher.turn(line).await {
            TurnResult::Completed { reply, classification, .. } => {
                debug!("Turn completed as {}", classification.tag);
                let decorated = emoji.as_mut().and_then(|rx| {
                    let mut last = None;
                    while let Ok(text) = rx.try_recv() {
                        last = Some(text);
                    }
                    last
                });
                decorated.unwrap_or(reply)
            }
            TurnResult::Failed { error } => format!("Sorry, I couldn't answer that ({})", error),
        };
        output.write_all(format!("Bot: {}\n", text).as_bytes()).await?;
    }

    output.write_all(b"\nGoodbye!\n").await?;
    output.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_words() {
        assert!(is_exit("exit"));
        assert!(is_exit("QUIT"));
        assert!(!is_exit("exit now"));
    }
}
