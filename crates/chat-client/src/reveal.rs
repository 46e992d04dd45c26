use std::io::{self, Write};
use std::time::Duration;

/// Progressively longer prefixes of `text`, one per space-separated token.
///
/// Every frame but the last ends with the separating space; the last frame is
/// `text` itself. Each frame is a prefix of the next.
pub fn reveal_frames(text: &str) -> Vec<String> {
    let tokens: Vec<&str> = text.split(' ').collect();
    let last = tokens.len().saturating_sub(1);

    let mut frames = Vec::with_capacity(tokens.len());
    let mut current = String::with_capacity(text.len());
    for (index, token) in tokens.into_iter().enumerate() {
        current.push_str(token);
        if index < last {
            current.push(' ');
        }
        frames.push(current.clone());
    }
    frames
}

/// Writes `text` frame by frame, emitting only the newly visible suffix of each
/// frame and pausing `delay` between frames.
pub async fn reveal<W: Write>(out: &mut W, text: &str, delay: Duration) -> io::Result<()> {
    let mut shown = 0;
    for frame in reveal_frames(text) {
        out.write_all(frame[shown..].as_bytes())?;
        out.flush()?;
        shown = frame.len();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
    Ok(())
}
