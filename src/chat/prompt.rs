use crate::models::RetrievedPassage;

/// Wrap the retrieved passages, in ranking order, in the answer instruction.
/// The query is embedded verbatim.
pub fn build_prompt(query: &str, passages: &[RetrievedPassage]) -> String {
    let instruction =
        format!("Use the following passages to provide an answer to the query: \"{query}\"");

    if passages.is_empty() {
        return instruction;
    }

    let context = passages
        .iter()
        .map(|p| p.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{instruction}\n\n{context}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(content: &str) -> RetrievedPassage {
        RetrievedPassage {
            content: content.into(),
            title: String::new(),
            url: String::new(),
            date: String::new(),
        }
    }

    #[test]
    fn test_prompt_joins_passages_with_blank_line() {
        let prompt = build_prompt(
            "benefits of exercise",
            &[passage("Running helps."), passage("So does lifting.")],
        );
        assert_eq!(
            prompt,
            "Use the following passages to provide an answer to the query: \"benefits of exercise\"\n\n\
             Running helps.\n\nSo does lifting."
        );
    }

    #[test]
    fn test_prompt_keeps_passage_order() {
        let prompt = build_prompt("q", &[passage("b"), passage("a")]);
        assert!(prompt.ends_with("b\n\na"));
    }

    #[test]
    fn test_prompt_without_passages() {
        let prompt = build_prompt("anything", &[]);
        assert_eq!(
            prompt,
            "Use the following passages to provide an answer to the query: \"anything\""
        );
    }

    #[test]
    fn test_query_embedded_verbatim() {
        let prompt = build_prompt("  \"quoted\" 函数 ", &[]);
        assert!(prompt.contains("\"  \"quoted\" 函数 \""));
    }
}
