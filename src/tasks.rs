//! The four-stage task pipeline: search, detect, rate, save.
//!
//! Each stage takes a [`Message`], adds to it, writes it under the key of
//! the next stage (`"detect:<hashslug>"` after search, and so on), and
//! returns it. Stages never fail: a store or archive failure is logged and
//! the message is still handed on, so `run` always produces a final message.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};

use serapis_search::text;
use serapis_search::{SearchAggregator, Sentence, StructuredDocument};

use crate::annotate::{
    DefinitionCueClassifier, FleschScorer, PatternMatcher, ReadabilityScorer, RuleMatcher,
    SentenceClassifier,
};
use crate::config::SerapisConfig;
use crate::error::{Result, SerapisError};
use crate::message::{Message, Stage};
use crate::store::{self, MessageStore, ResultArchive};

/// Source of aggregated search results for the search stage.
#[async_trait]
pub trait TermSearch: Send + Sync {
    /// Never fails; an unusable search yields no documents.
    async fn search_all(&self, term: &str) -> Vec<StructuredDocument>;
}

#[async_trait]
impl TermSearch for SearchAggregator {
    async fn search_all(&self, term: &str) -> Vec<StructuredDocument> {
        SearchAggregator::search_all(self, term).await
    }
}

/// Assigns a rating to each sentence in the rate stage.
pub trait SentenceRater: Send + Sync {
    fn rate(&self, sentence: &Sentence, term: &str) -> i32;
}

/// Rates every sentence 0.
///
/// Stands in until a real rating model exists; replace it through
/// [`TaskPipeline::with_rater`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderRater;

impl SentenceRater for PlaceholderRater {
    fn rate(&self, _sentence: &Sentence, _term: &str) -> i32 {
        0
    }
}

/// The search → detect → rate → save pipeline.
#[derive(Clone)]
pub struct TaskPipeline {
    search: Arc<dyn TermSearch>,
    store: Arc<dyn MessageStore>,
    archive: Arc<dyn ResultArchive>,
    classifier: Arc<dyn SentenceClassifier>,
    readability: Arc<dyn ReadabilityScorer>,
    matcher: Arc<dyn PatternMatcher>,
    rater: Arc<dyn SentenceRater>,
}

impl TaskPipeline {
    /// Pipeline with the default annotators and pattern rules.
    ///
    /// # Errors
    ///
    /// Returns an error if a default pattern rule fails to compile.
    pub fn new(
        search: Arc<dyn TermSearch>,
        store: Arc<dyn MessageStore>,
        archive: Arc<dyn ResultArchive>,
    ) -> Result<Self> {
        let rules = crate::config::AnnotateConfig::default().patterns;
        Ok(Self {
            search,
            store,
            archive,
            classifier: Arc::new(DefinitionCueClassifier),
            readability: Arc::new(FleschScorer),
            matcher: Arc::new(RuleMatcher::new(&rules)?),
            rater: Arc::new(PlaceholderRater),
        })
    }

    /// Build the full pipeline described by `config`: HTTP search providers,
    /// the configured message store and result archive, and the configured
    /// pattern rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a backend cannot
    /// be constructed.
    pub fn from_config(config: &SerapisConfig) -> Result<Self> {
        config.validate()?;
        let search = Arc::new(SearchAggregator::from_config(config.search.clone())?);
        let store = store::message_store(&config.storage)?;
        let archive = store::result_archive(&config.storage)?;
        let matcher = Arc::new(RuleMatcher::new(&config.annotate.patterns)?);
        Ok(Self::new(search, store, archive)?.with_matcher(matcher))
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn SentenceClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_readability(mut self, readability: Arc<dyn ReadabilityScorer>) -> Self {
        self.readability = readability;
        self
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn PatternMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_rater(mut self, rater: Arc<dyn SentenceRater>) -> Self {
        self.rater = rater;
        self
    }

    /// Run all four stages on `seed`.
    pub async fn run(&self, seed: Message) -> Message {
        let message = self.search(seed).await;
        let message = self.detect(message).await;
        let message = self.rate(message).await;
        self.save(message).await
    }

    /// Run a single stage.
    pub async fn run_stage(&self, stage: Stage, message: Message) -> Message {
        match stage {
            Stage::Search => self.search(message).await,
            Stage::Detect => self.detect(message).await,
            Stage::Rate => self.rate(message).await,
            Stage::Save => self.save(message).await,
        }
    }

    /// Run `stage` on the message stored under its input key,
    /// `"<stage>:<hashslug>"`.
    ///
    /// # Errors
    ///
    /// Returns [`SerapisError::Pipeline`] if nothing is stored under the key,
    /// or the store's error if it cannot be read.
    pub async fn run_stored(&self, stage: Stage, hashslug: &str) -> Result<Message> {
        let key = format!("{stage}:{hashslug}");
        let message = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| SerapisError::Pipeline(format!("no message stored under '{key}'")))?;
        tracing::debug!(key = %key, "resuming from stored message");
        Ok(self.run_stage(stage, message).await)
    }

    /// Attach aggregated search results and the crawl date.
    pub async fn search(&self, mut message: Message) -> Message {
        message.ensure_hashslug();
        let urls = self.search.search_all(&message.word).await;
        tracing::info!(
            word = %message.word,
            hashslug = %message.hashslug,
            urls = urls.len(),
            "search stage found urls"
        );
        message.urls = Some(urls);
        message.crawl_date = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
        self.write(Stage::Detect, message).await
    }

    /// Segment, classify, score, and pattern-tag every url entry.
    pub async fn detect(&self, mut message: Message) -> Message {
        message.ensure_hashslug();
        if message.urls.is_none() {
            tracing::warn!(hashslug = %message.hashslug, "detect stage got a message without urls");
        }

        let word = message.word.clone();
        let mut sentences = 0;
        for document in message.documents_mut() {
            self.annotate_document(document, &word);
            sentences += document.sentences.as_ref().map_or(0, Vec::len);
        }

        tracing::info!(
            hashslug = %message.hashslug,
            urls = message.urls.as_ref().map_or(0, Vec::len),
            sentences,
            "detect stage annotated sentences"
        );
        self.write(Stage::Rate, message).await
    }

    /// Assign a rating to every sentence.
    pub async fn rate(&self, mut message: Message) -> Message {
        message.ensure_hashslug();
        let word = message.word.clone();
        let mut rated = 0;
        for document in message.documents_mut() {
            for sentence in document.sentences.iter_mut().flatten() {
                sentence.rating = Some(self.rater.rate(sentence, &word));
                rated += 1;
            }
        }
        tracing::info!(hashslug = %message.hashslug, rated, "rate stage rated sentences");
        self.write(Stage::Save, message).await
    }

    /// Hand the final message to the result archive. Terminal.
    pub async fn save(&self, mut message: Message) -> Message {
        message.ensure_hashslug();
        match self.archive.archive(&message).await {
            Ok(()) => tracing::info!(
                hashslug = %message.hashslug,
                urls = message.urls.as_ref().map_or(0, Vec::len),
                "save stage archived results"
            ),
            Err(err) => tracing::error!(
                hashslug = %message.hashslug,
                error = %err,
                "failed to archive results"
            ),
        }
        message
    }

    fn annotate_document(&self, document: &mut StructuredDocument, word: &str) {
        let body = document
            .doc
            .clone()
            .or_else(|| document.candidate.summary.clone())
            .unwrap_or_default();

        if document.sentences.is_none() {
            document.sentences = Some(
                text::split_sentences(&body)
                    .into_iter()
                    .map(Sentence::new)
                    .collect(),
            );
        }
        if document.variants.is_none() {
            document.variants = Some(text::find_variants(word, &body));
        }

        let variants = document.variants.clone().unwrap_or_default();
        for sentence in document.sentences.iter_mut().flatten() {
            if sentence.s_clean.is_empty() {
                sentence.s_clean = text::clean_sentence(&sentence.s);
            }
            sentence.frd = Some(self.classifier.classify(sentence, word, &variants));
            sentence.patterns = Some(self.matcher.matches(&sentence.s_clean));
        }

        let scored_text = if body.is_empty() {
            document
                .sentences
                .iter()
                .flatten()
                .map(|s| s.s.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            body
        };
        document.readability = Some(self.readability.score(&scored_text));
    }

    async fn write(&self, stage: Stage, message: Message) -> Message {
        let key = message.key(stage);
        match self.store.put(&key, &message).await {
            Ok(()) => tracing::info!(key = %key, "message written"),
            Err(err) => tracing::error!(key = %key, error = %err, "failed to write message"),
        }
        message
    }
}

impl std::fmt::Debug for TaskPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPipeline").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::error::SerapisError;
    use crate::store::MemoryStore;
    use serapis_search::{CandidateResult, Provider};

    struct NoResults;

    #[async_trait]
    impl TermSearch for NoResults {
        async fn search_all(&self, _term: &str) -> Vec<StructuredDocument> {
            Vec::new()
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl MessageStore for BrokenStore {
        async fn put(&self, key: &str, _message: &Message) -> Result<()> {
            Err(SerapisError::Storage(format!("cannot write {key}")))
        }

        async fn get(&self, _key: &str) -> Result<Option<Message>> {
            Err(SerapisError::Storage("offline".into()))
        }
    }

    struct BrokenArchive;

    #[async_trait]
    impl ResultArchive for BrokenArchive {
        async fn archive(&self, _message: &Message) -> Result<()> {
            Err(SerapisError::Storage("result bucket missing".into()))
        }
    }

    fn pipeline(store: Arc<dyn MessageStore>) -> TaskPipeline {
        let archive = Arc::new(store::StoreArchive::new(Arc::new(MemoryStore::new())));
        TaskPipeline::new(Arc::new(NoResults), store, archive).unwrap()
    }

    #[tokio::test]
    async fn stages_survive_store_failures() {
        let pipeline = TaskPipeline::new(
            Arc::new(NoResults),
            Arc::new(BrokenStore),
            Arc::new(BrokenArchive),
        )
        .unwrap();

        let message = pipeline.run(Message::new("dither")).await;
        assert_eq!(message.word, "dither");
        assert_eq!(message.urls, Some(Vec::new()));
        assert!(message.crawl_date.is_some());
    }

    #[tokio::test]
    async fn detect_segments_summary_when_unenriched() {
        let store = Arc::new(MemoryStore::new());
        let mut message = Message::new("dither");
        message.urls = Some(vec![
            CandidateResult::new("https://a.example", "A", Provider::Google)
                .with_summary("To dither is to hesitate. People dither often.")
                .into(),
        ]);

        let message = pipeline(store.clone()).detect(message).await;
        let document = &message.urls.as_ref().unwrap()[0];
        let sentences = document.sentences.as_ref().unwrap();
        assert_eq!(sentences.len(), 2);
        assert!(sentences.iter().all(|s| s.frd.is_some() && s.patterns.is_some()));
        assert_eq!(document.variants.as_deref(), Some(&["dither".to_owned()][..]));
        assert!(document.readability.is_some());
        assert!(document.doc.is_none());
        assert_eq!(store.keys(), vec![message.key(Stage::Rate)]);
    }

    #[tokio::test]
    async fn detect_keeps_existing_sentences() {
        let store = Arc::new(MemoryStore::new());
        let mut message = Message::new("dither");
        message.urls = Some(vec![StructuredDocument::enriched(
            CandidateResult::new("https://b.example", "B", Provider::DuckDuckGo),
            "Dither means to hesitate. Second sentence here.".into(),
            vec![Sentence::new("Dither means to hesitate.")],
            vec!["dither".into()],
        )]);

        let message = pipeline(store).detect(message).await;
        let sentences = message.urls.unwrap()[0].sentences.clone().unwrap();
        assert_eq!(sentences.len(), 1);
        assert_eq!(sentences[0].patterns.as_deref(), Some(&["means".to_owned()][..]));
    }

    #[tokio::test]
    async fn detect_without_urls_still_writes() {
        let store = Arc::new(MemoryStore::new());
        let message = pipeline(store.clone()).detect(Message::new("dither")).await;
        assert!(message.urls.is_none());
        assert_eq!(store.keys().len(), 1);
    }

    #[tokio::test]
    async fn rate_assigns_placeholder_zero() {
        let store = Arc::new(MemoryStore::new());
        let mut message = Message::new("dither");
        message.urls = Some(vec![StructuredDocument::enriched(
            CandidateResult::new("https://c.example", "C", Provider::Bing),
            "One. Two.".into(),
            vec![Sentence::new("One."), Sentence::new("Two.")],
            Vec::new(),
        )]);

        let message = pipeline(store.clone()).rate(message).await;
        let sentences = message.urls.unwrap()[0].sentences.clone().unwrap();
        assert!(sentences.iter().all(|s| s.rating == Some(0)));
        assert_eq!(store.keys()[0], format!("save:{}", crate::message::hashslug("dither")));
    }

    #[tokio::test]
    async fn custom_rater_replaces_placeholder() {
        struct Length;
        impl SentenceRater for Length {
            fn rate(&self, sentence: &Sentence, _term: &str) -> i32 {
                sentence.s.len() as i32
            }
        }

        let mut message = Message::new("dither");
        message.urls = Some(vec![StructuredDocument::enriched(
            CandidateResult::new("https://c.example", "C", Provider::Bing),
            "Four.".into(),
            vec![Sentence::new("Four.")],
            Vec::new(),
        )]);

        let message = pipeline(Arc::new(MemoryStore::new()))
            .with_rater(Arc::new(Length))
            .rate(message)
            .await;
        assert_eq!(message.urls.unwrap()[0].sentences.as_ref().unwrap()[0].rating, Some(5));
    }

    #[tokio::test]
    async fn save_returns_message_unchanged() {
        let store = Arc::new(MemoryStore::new());
        let message = Message::new("dither");
        let saved = pipeline(store.clone()).save(message.clone()).await;
        assert_eq!(saved, message);
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn run_stored_resumes_from_input_key() {
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline(store.clone());
        let searched = pipeline.search(Message::new("dither")).await;

        let detected = pipeline
            .run_stored(Stage::Detect, &searched.hashslug)
            .await
            .unwrap();
        assert_eq!(detected.hashslug, searched.hashslug);
        assert_eq!(
            store.keys(),
            vec![searched.key(Stage::Detect), searched.key(Stage::Rate)]
        );
    }

    #[tokio::test]
    async fn run_stored_reports_missing_and_unreadable_keys() {
        let err = pipeline(Arc::new(MemoryStore::new()))
            .run_stored(Stage::Rate, "dither:000000")
            .await
            .unwrap_err();
        assert!(matches!(err, SerapisError::Pipeline(_)));
        assert!(err.to_string().contains("rate:dither:000000"));

        let err = pipeline(Arc::new(BrokenStore))
            .run_stored(Stage::Rate, "dither:000000")
            .await
            .unwrap_err();
        assert!(matches!(err, SerapisError::Storage(_)));
    }

    #[tokio::test]
    async fn detect_keeps_foreign_fields_in_url_entries() {
        let store = Arc::new(MemoryStore::new());
        let input = serde_json::json!({
            "word": "dither",
            "hashslug": "dither:333333",
            "urls": [{
                "url": "https://a.example/",
                "title": null,
                "search_provider": "google",
                "summary": "To dither is to hesitate.",
                "features": {"pos": "verb"},
                "sentences": [{"s": "To dither is to hesitate.", "s_clean": null, "tag": "x"}]
            }]
        });
        let message = Message::from_json(&input.to_string()).unwrap();

        let detected = pipeline(store).detect(message).await;
        let output = serde_json::to_value(&detected).unwrap();
        let entry = &output["urls"][0];
        assert_eq!(entry["features"], serde_json::json!({"pos": "verb"}));
        assert_eq!(entry["title"], "");
        let sentence = &entry["sentences"][0];
        assert_eq!(sentence["tag"], "x");
        assert_eq!(sentence["s_clean"], "To dither is to hesitate.");
        assert!(sentence["frd"].is_number());
        assert!(entry["readability"].is_number());
    }

    #[tokio::test]
    async fn run_stage_dispatches() {
        let store = Arc::new(MemoryStore::new());
        let message = pipeline(store.clone())
            .run_stage(Stage::Search, Message::new("dither"))
            .await;
        assert_eq!(message.urls, Some(Vec::new()));
        assert_eq!(store.keys(), vec![message.key(Stage::Detect)]);
    }
}
