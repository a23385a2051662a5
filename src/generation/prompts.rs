use crate::rag::{RetrievedChunk, RetrievedImage};

pub const MANUAL_REFUSAL: &str = "The manual does not contain this information.";

pub fn classification_prompt(query: &str) -> String {
    format!(
        "You are an AI assistant classifier. \
         Classify the following user query into one of three categories:\n\
         1. 'manual'  -> technical/manual question\n\
         2. 'casual'  -> friendly greeting or small talk\n\
         3. 'blocked' -> contains offensive or inappropriate content\n\n\
         User query: \"{query}\"\n\n\
         Respond ONLY with one word: manual, casual, or blocked."
    )
}

/// First pass: answer strictly from the excerpts.
pub fn draft_prompt(manual_title: &str, context: &str, query: &str) -> String {
    format!(
        "You are an assistant that must answer using ONLY the provided excerpts \
         from the {manual_title}. Do NOT use outside knowledge. \
         If the manual doesn't contain the answer, respond exactly: \
         '{MANUAL_REFUSAL}'\n\n\
         --- Manual Excerpts ---\n{context}\n\n\
         --- User Question ---\n{query}\n\n\
         Instructions:\n\
         - Summarize ALL relevant rules, cautions, and systems mentioned in the excerpts.\n\
         - Do not omit any details, even if they appear repetitive.\n\
         - Include page references for every point.\n\
         - If multiple items are listed across pages, present them as a structured list.\n\
         Answer:"
    )
}

/// Second pass: rewrite the draft without losing content.
pub fn polish_prompt(draft: &str) -> String {
    format!(
        "Rewrite the following draft answer into a polished, clear, and complete response. \
         Keep ALL technical details, page references, and image mentions intact. \
         Do not shorten or omit any points.\n\n\
         --- Draft Answer ---\n{draft}\n\n\
         Final polished answer:"
    )
}

/// Page-tagged excerpts followed by one reference line per image.
pub fn assemble_context(chunks: &[RetrievedChunk], images: &[RetrievedImage]) -> String {
    let text_part = chunks
        .iter()
        .map(|chunk| format!("[Page {}]\n{}", chunk.page, chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n");

    if images.is_empty() {
        return text_part;
    }

    let image_part = images
        .iter()
        .map(|image| {
            format!(
                "[Image {} on Page {}] (see {})",
                image.id, image.page, image.path
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("{text_part}\n\n{image_part}")
}
