use crate::types::Passage;
use async_trait::async_trait;
use aws_sdk_kendra::operation::retrieve::builders::RetrieveFluentBuilder;
use aws_sdk_kendra::types::{AttributeFilter, DocumentAttribute, DocumentAttributeValue};
use tracing::{debug, warn};

const LANGUAGE_CODE_KEY: &str = "_language_code";

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("invalid retrieve request: {0}")]
    Request(#[from] aws_sdk_kendra::error::BuildError),
    #[error("kendra retrieve failed: {0}")]
    Query(#[from] aws_sdk_kendra::Error),
}

/// Source of passages relevant to a question, in relevance order.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentRetriever: Send + Sync {
    async fn retrieve(&self, question: &str) -> Result<Vec<Passage>, RetrievalError>;
}

pub struct KendraRetriever {
    client: aws_sdk_kendra::Client,
    index_id: String,
    language_code: String,
    page_size: usize,
}

impl KendraRetriever {
    pub fn new(
        client: aws_sdk_kendra::Client,
        index_id: String,
        language_code: String,
        page_size: usize,
    ) -> Self {
        Self {
            client,
            index_id,
            language_code,
            page_size,
        }
    }

    fn language_filter(&self) -> Result<AttributeFilter, RetrievalError> {
        let attribute = DocumentAttribute::builder()
            .key(LANGUAGE_CODE_KEY)
            .value(
                DocumentAttributeValue::builder()
                    .string_value(&self.language_code)
                    .build(),
            )
            .build()?;

        Ok(AttributeFilter::builder().equals_to(attribute).build())
    }

    /// Kendra returns 10 items unless asked for more.
    fn request(&self, question: &str) -> Result<RetrieveFluentBuilder, RetrievalError> {
        Ok(self
            .client
            .retrieve()
            .index_id(&self.index_id)
            .query_text(question)
            .page_size(i32::try_from(self.page_size).unwrap_or(i32::MAX))
            .attribute_filter(self.language_filter()?))
    }
}

#[async_trait]
impl DocumentRetriever for KendraRetriever {
    async fn retrieve(&self, question: &str) -> Result<Vec<Passage>, RetrievalError> {
        let response = self
            .request(question)?
            .send()
            .await
            .map_err(aws_sdk_kendra::Error::from)?;

        debug!(items = response.result_items().len(), "kendra retrieve response");

        Ok(response
            .result_items()
            .iter()
            .map(|item| Passage {
                content: item.content().unwrap_or_default().to_string(),
                document_uri: item.document_uri().unwrap_or_default().to_string(),
            })
            .collect())
    }
}

/// Fetches at most `limit` passages, keeping the retriever's order. Any
/// retrieval failure is logged and treated as "no context".
pub async fn fetch_context(
    retriever: &dyn DocumentRetriever,
    question: &str,
    limit: usize,
) -> Vec<Passage> {
    match retriever.retrieve(question).await {
        Ok(mut passages) => {
            passages.truncate(limit);
            passages
        }
        Err(e) => {
            warn!(error = %e, "error querying kendra, continuing without context");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_kendra::config::{BehaviorVersion, Region};

    fn retriever(language_code: &str, page_size: usize) -> KendraRetriever {
        let conf = aws_sdk_kendra::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("ap-northeast-1"))
            .build();

        KendraRetriever::new(
            aws_sdk_kendra::Client::from_conf(conf),
            "idx-1".to_string(),
            language_code.to_string(),
            page_size,
        )
    }

    #[test]
    fn test_language_filter() {
        let filter = retriever("ja", 5).language_filter().unwrap();
        let attribute = filter.equals_to().unwrap();

        assert_eq!(attribute.key(), "_language_code");
        assert_eq!(attribute.value().and_then(|v| v.string_value()), Some("ja"));
    }

    #[test]
    fn test_request_carries_index_query_and_page_size() {
        let request = retriever("en", 20).request("what is OPTEMO?").unwrap();

        assert_eq!(request.get_index_id().as_deref(), Some("idx-1"));
        assert_eq!(request.get_query_text().as_deref(), Some("what is OPTEMO?"));
        assert_eq!(*request.get_page_size(), Some(20));

        let language = request
            .get_attribute_filter()
            .as_ref()
            .and_then(|f| f.equals_to())
            .and_then(|a| a.value())
            .and_then(|v| v.string_value());
        assert_eq!(language, Some("en"));
    }

    fn passage(n: usize) -> Passage {
        Passage {
            content: format!("content {n}"),
            document_uri: format!("https://docs.example.com/{n}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_context_truncates_in_order() {
        let mut retriever = MockDocumentRetriever::new();
        retriever
            .expect_retrieve()
            .withf(|q| q == "what is OPTEMO?")
            .times(1)
            .returning(|_| Ok((0..8).map(passage).collect()));

        let passages = fetch_context(&retriever, "what is OPTEMO?", 5).await;

        assert_eq!(passages, (0..5).map(passage).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_fetch_context_keeps_short_results() {
        let mut retriever = MockDocumentRetriever::new();
        retriever
            .expect_retrieve()
            .returning(|_| Ok(vec![passage(1), passage(2)]));

        let passages = fetch_context(&retriever, "q", 5).await;

        assert_eq!(passages, vec![passage(1), passage(2)]);
    }

    #[tokio::test]
    async fn test_fetch_context_failure_is_empty() {
        let mut retriever = MockDocumentRetriever::new();
        retriever.expect_retrieve().returning(|_| {
            let err = DocumentAttribute::builder().build().unwrap_err();
            Err(RetrievalError::Request(err))
        });

        assert!(fetch_context(&retriever, "q", 5).await.is_empty());
    }
}
