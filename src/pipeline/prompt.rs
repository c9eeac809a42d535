//! Prompt assembly.
//!
//! Builds the single instruction block sent to the completion model. Each
//! section sits between distinct tags so the model cannot mistake one
//! section's content for another, and the embedded directives tell it not
//! to reference the sections themselves or invent answers the context does
//! not support.

/// Strips apostrophes, which would otherwise corrupt string-templated
/// query text further downstream.
pub fn strip_apostrophes(text: &str) -> String {
    text.replace('\'', "")
}

/// Assembles the final prompt. Pure: identical inputs yield identical
/// output. With neither context nor history the framing degrades to a
/// plain question/answer prompt.
pub fn assemble(context: &str, history: &[String], question: &str) -> String {
    let has_context = !context.trim().is_empty();
    let has_history = !history.is_empty();

    if !has_context && !has_history {
        return format!("Question:\n{}\nAnswer:", question);
    }

    let mut prompt = String::from("You are an expert chat assistant");
    if has_context {
        prompt.push_str(
            " that extracts information from the CONTEXT provided between <context> and </context> tags",
        );
    }
    prompt.push_str(".\n");

    if has_history {
        prompt.push_str(
            "You offer a chat experience considering the information included in the CHAT HISTORY provided between <chat_history> and </chat_history> tags.\n",
        );
    }

    prompt.push_str(
        "When answering the question contained between <question> and </question> tags be concise and do not hallucinate.\n\
         If you don't have the information just say so.\n",
    );
    if has_context {
        prompt.push_str("Do not mention the CONTEXT used in your answer.\n");
    }
    if has_history {
        prompt.push_str("Do not mention the CHAT HISTORY used in your answer.\n");
    }
    prompt.push('\n');

    if has_history {
        prompt.push_str("<chat_history>\n");
        prompt.push_str(&history.join("\n"));
        prompt.push_str("\n</chat_history>\n");
    }
    if has_context {
        prompt.push_str("<context>\n");
        prompt.push_str(context);
        prompt.push_str("\n</context>\n");
    }
    prompt.push_str("<question>\n");
    prompt.push_str(question);
    prompt.push_str("\n</question>\nAnswer:");

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembly_is_idempotent() {
        let history = vec!["earlier question".to_string(), "earlier answer".to_string()];
        let a = assemble("some context", &history, "and now?");
        let b = assemble("some context", &history, "and now?");
        assert_eq!(a, b);
    }

    #[test]
    fn all_sections_present_with_context_and_history() {
        let history = vec!["hi".to_string()];
        let prompt = assemble("ctx text", &history, "what now?");

        assert!(prompt.contains("<chat_history>\nhi\n</chat_history>"));
        assert!(prompt.contains("<context>\nctx text\n</context>"));
        assert!(prompt.contains("<question>\nwhat now?\n</question>"));
        assert!(prompt.ends_with("Answer:"));
        assert!(prompt.contains("do not hallucinate"));
        assert!(prompt.contains("Do not mention the CONTEXT"));
        assert!(prompt.contains("Do not mention the CHAT HISTORY"));
    }

    #[test]
    fn no_history_section_when_history_is_empty() {
        let prompt = assemble("ctx", &[], "q?");
        assert!(!prompt.contains("<chat_history>"));
        assert!(!prompt.contains("CHAT HISTORY"));
        assert!(prompt.contains("<context>"));
    }

    #[test]
    fn empty_context_omits_the_context_section() {
        let history = vec!["earlier".to_string()];
        let prompt = assemble("", &history, "q?");
        assert!(!prompt.contains("<context>"));
        assert!(prompt.contains("<chat_history>"));
    }

    #[test]
    fn degrades_to_plain_question_answer() {
        let prompt = assemble("", &[], "What is the warranty period?");
        assert_eq!(prompt, "Question:\nWhat is the warranty period?\nAnswer:");
    }

    #[test]
    fn apostrophes_are_stripped() {
        assert_eq!(strip_apostrophes("it's the bike's chain"), "its the bikes chain");
    }
}
