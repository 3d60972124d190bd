const INSTRUCTION: &str = "Use the following pieces of context to answer the user's question. If you don't know the answer, just say that you don't know, don't try to make up an answer.----------------";

/// Fills the answer template with newline-joined context and the question.
pub fn build_prompt<S: AsRef<str>>(context_chunks: &[S], question: &str) -> String {
    let context = context_chunks
        .iter()
        .map(|chunk| chunk.as_ref())
        .collect::<Vec<_>>()
        .join("\n");
    render(&context, question)
}

fn render(context: &str, question: &str) -> String {
    format!("{INSTRUCTION}\nContext:{context}\nUser question:\n{question}")
}

/// Prompt builder with an optional context budget in characters.
///
/// Without a budget the full context is sent, however long. With one, whole
/// chunks are kept in rank order until the next chunk would exceed it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder {
    pub max_context_chars: Option<usize>,
}

impl PromptBuilder {
    pub fn new(max_context_chars: Option<usize>) -> Self {
        Self { max_context_chars }
    }

    pub fn build<S: AsRef<str>>(&self, context_chunks: &[S], question: &str) -> String {
        let total = context_chunks
            .iter()
            .map(|chunk| chunk.as_ref().chars().count() + 1)
            .sum::<usize>()
            .saturating_sub(1);

        let Some(budget) = self.max_context_chars else {
            if total > LARGE_CONTEXT_CHARS {
                tracing::warn!(
                    context_chars = total,
                    "prompt context is large and is sent untruncated"
                );
            }
            return build_prompt(context_chunks, question);
        };

        let mut kept: Vec<&str> = Vec::new();
        let mut used = 0usize;
        for chunk in context_chunks {
            let chunk = chunk.as_ref();
            let cost = chunk.chars().count() + usize::from(!kept.is_empty());
            if used + cost > budget {
                break;
            }
            used += cost;
            kept.push(chunk);
        }

        if kept.len() < context_chunks.len() {
            tracing::warn!(
                context_chars = total,
                budget,
                kept = kept.len(),
                dropped = context_chunks.len() - kept.len(),
                "truncated prompt context"
            );
        }

        build_prompt(&kept, question)
    }
}

const LARGE_CONTEXT_CHARS: usize = 30_000;
