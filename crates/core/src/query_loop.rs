use crate::embeddings::Embedder;
use crate::orchestrator::ChatPdf;
use crate::traits::{LanguageModel, VectorIndex};
use crate::PipelineError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const QUESTION_PROMPT: &str = "ChatPDF: What would you like to know?\nYour question: ";
pub const QUIT_COMMAND: &str = "quit";
pub const FAREWELL: &str = "Goodbye!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Quit,
    EndOfInput,
}

/// Line-oriented question loop: one question per line until `quit`.
pub struct QueryLoop<'a, E, L, I>
where
    E: Embedder,
    L: LanguageModel,
    I: VectorIndex,
{
    chat: &'a ChatPdf<E, L, I>,
}

impl<'a, E, L, I> QueryLoop<'a, E, L, I>
where
    E: Embedder,
    L: LanguageModel,
    I: VectorIndex,
{
    pub fn new(chat: &'a ChatPdf<E, L, I>) -> Self {
        Self { chat }
    }

    /// Runs until `quit` or end of input. Any failure while answering ends
    /// the loop with that error.
    pub async fn run<R, W>(&self, mut input: R, output: &mut W) -> Result<LoopExit, PipelineError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = Vec::new();
        let mut turn = 0u64;

        loop {
            output.write_all(QUESTION_PROMPT.as_bytes()).await?;
            output.flush().await?;

            line.clear();
            if input.read_until(b'\n', &mut line).await? == 0 {
                tracing::info!(turns = turn, "input closed");
                return Ok(LoopExit::EndOfInput);
            }
            let question = decode_line(&line);

            if question == QUIT_COMMAND {
                output.write_all(format!("{FAREWELL}\n").as_bytes()).await?;
                output.flush().await?;
                return Ok(LoopExit::Quit);
            }

            turn += 1;
            tracing::debug!(turn, question = %question, "answering");

            let answer = self.chat.ask(&question).await?;
            output
                .write_all(format!("\nChatPDF: {}\n", answer.text).as_bytes())
                .await?;
            output.flush().await?;
        }
    }
}

/// Drops the line terminator and replaces invalid UTF-8 instead of failing.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
