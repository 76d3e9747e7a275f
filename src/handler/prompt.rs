//! Prompt rendering for the Claude text-completion API.

use crate::types::Passage;

const PERSONA: &str = "あなたは株式会社OPTEMOのサービスの情報や社内規則やメンバー情報などを説明するチャットbotです。";

const INSTRUCTIONS: &str = "以下の情報を参考にして、社内のメンバーからの質問に答えてください。\
与えられたデータの中に質問に対する答えがない場合、もしくはわからない場合、不確かな情報は決して答えないでください。\
わからない場合は正直に「わかりませんでした」と答えてください。\
また、一度Assistantの応答が終わった場合、その後新たな質問などは出力せずに終了してください。";

/// Renders the prompt. Passages are embedded as a JSON array; no length
/// limit is applied here.
pub fn build_prompt(question: &str, passages: &[Passage]) -> String {
    let context = serde_json::to_string_pretty(passages).unwrap_or_else(|_| "[]".to_string());

    format!(
        "\n\nSystem: {PERSONA}\n{INSTRUCTIONS}\n\n{context}\n\nHuman: {question}\n\nAssistant:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_context_and_question() {
        let passages = vec![Passage {
            content: "OPTEMO is a consultancy.".to_string(),
            document_uri: "https://docs.example.com/about".to_string(),
        }];

        let prompt = build_prompt("what is OPTEMO?", &passages);

        assert!(prompt.starts_with("\n\nSystem: "));
        assert!(prompt.contains("わかりませんでした"));
        assert!(prompt.contains(r#""Content": "OPTEMO is a consultancy.""#));
        assert!(prompt.contains(r#""DocumentURI": "https://docs.example.com/about""#));
        assert!(prompt.ends_with("\n\nHuman: what is OPTEMO?\n\nAssistant:"));
    }

    #[test]
    fn test_prompt_without_context() {
        let prompt = build_prompt("", &[]);

        assert!(prompt.contains("\n\n[]\n\n"));
        assert!(prompt.ends_with("\n\nHuman: \n\nAssistant:"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        assert_eq!(build_prompt("q", &[]), build_prompt("q", &[]));
    }
}
