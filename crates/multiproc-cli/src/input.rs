use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

/// Forwards every non-blank line of `reader` into `tx`.
///
/// Returns the number of lines forwarded. Stops early, without error, once
/// the pool has gone away and the receiving side is closed. Dropping `tx` on
/// return is what signals end of input to the workers.
pub async fn feed_lines<R>(reader: R, tx: mpsc::Sender<String>) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut sent = 0;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if tx.send(line).await.is_err() {
            tracing::debug!("Pool stopped accepting input after {} lines", sent);
            break;
        }
        sent += 1;
    }

    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn skips_blank_lines() {
        let (tx, mut rx) = mpsc::channel(8);
        let input: &[u8] = b"a\n\n  \nb\r\nc";

        let sent = feed_lines(input, tx).await.unwrap();

        assert_eq!(sent, 3);
        assert_eq!(rx.recv().await.as_deref(), Some("a"));
        assert_eq!(rx.recv().await.as_deref(), Some("b"));
        assert_eq!(rx.recv().await.as_deref(), Some("c"));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn stops_when_the_pool_is_gone() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        let input: &[u8] = b"a\nb\n";

        assert_eq!(feed_lines(input, tx).await.unwrap(), 0);
    }
}
