//! 评论情感分析模块

use crate::types::{Classification, ETLError, ETLResult, SentimentConfig, SentimentLabel};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// 没有评论或分类失败时使用的中性分数
pub const NEUTRAL_SCORE: f64 = 0.5;

/// 外部情感分类器接口（文本进，标签与置信度出）
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    /// 分类器名称，用于日志
    fn name(&self) -> &str;

    /// 批量分类，返回结果与输入一一对应
    async fn classify(&self, texts: &[String]) -> ETLResult<Vec<Classification>>;
}

/// 计算视频的情感比例：被判为正面的采样评论所占比例，取值 [0, 1]
///
/// 没有评论、分类器报错或返回数量不符时退化为 [`NEUTRAL_SCORE`]。
pub async fn sentiment_ratio(
    classifier: &dyn SentimentClassifier,
    comments: &[String],
    max_chars: usize,
) -> f64 {
    if comments.is_empty() {
        return NEUTRAL_SCORE;
    }

    let truncated: Vec<String> = comments
        .iter()
        .map(|c| c.chars().take(max_chars).collect())
        .collect();

    match classifier.classify(&truncated).await {
        Ok(results) if results.len() == comments.len() => {
            let positives = results
                .iter()
                .filter(|r| r.label == SentimentLabel::Positive)
                .count();
            positives as f64 / comments.len() as f64
        }
        Ok(results) => {
            tracing::warn!(
                "{} returned {} results for {} comments, using neutral score",
                classifier.name(),
                results.len(),
                comments.len()
            );
            NEUTRAL_SCORE
        }
        Err(e) => {
            tracing::warn!("Error analyzing sentiment with {}: {}", classifier.name(), e);
            NEUTRAL_SCORE
        }
    }
}

/// 本地词典分类器
pub struct LexiconClassifier {
    positive_words: HashMap<String, f64>,
    negative_words: HashMap<String, f64>,
}

impl LexiconClassifier {
    pub fn new() -> Self {
        let mut classifier = Self {
            positive_words: HashMap::new(),
            negative_words: HashMap::new(),
        };

        classifier.initialize_dictionaries();
        classifier
    }

    fn initialize_dictionaries(&mut self) {
        // 正面词汇（视频评论常见用语）
        let positive_words = vec![
            ("love", 2.0),
            ("loved", 2.0),
            ("amazing", 2.0),
            ("awesome", 2.0),
            ("excellent", 2.0),
            ("fantastic", 2.0),
            ("brilliant", 2.0),
            ("incredible", 2.0),
            ("perfect", 2.0),
            ("best", 1.5),
            ("great", 1.5),
            ("beautiful", 1.5),
            ("helpful", 1.5),
            ("thanks", 1.5),
            ("thank", 1.5),
            ("insightful", 1.5),
            ("informative", 1.5),
            ("inspiring", 1.5),
            ("enjoyed", 1.5),
            ("good", 1.0),
            ("nice", 1.0),
            ("cool", 1.0),
            ("fun", 1.0),
            ("funny", 1.0),
            ("interesting", 1.0),
            ("useful", 1.0),
            ("clear", 1.0),
            ("like", 0.5),
            ("wow", 1.0),
        ];

        // 负面词汇
        let negative_words = vec![
            ("hate", -2.0),
            ("awful", -2.0),
            ("terrible", -2.0),
            ("horrible", -2.0),
            ("worst", -2.0),
            ("garbage", -2.0),
            ("trash", -2.0),
            ("scam", -2.5),
            ("clickbait", -2.0),
            ("boring", -1.5),
            ("useless", -1.5),
            ("disappointing", -1.5),
            ("disappointed", -1.5),
            ("misleading", -1.5),
            ("annoying", -1.5),
            ("wrong", -1.0),
            ("bad", -1.0),
            ("poor", -1.0),
            ("waste", -1.5),
            ("stupid", -1.5),
            ("dislike", -1.0),
            ("confusing", -1.0),
            ("sad", -1.0),
            ("unsubscribe", -1.5),
            ("unsubscribed", -1.5),
        ];

        for (word, score) in positive_words {
            self.positive_words.insert(word.to_string(), score);
        }

        for (word, score) in negative_words {
            self.negative_words.insert(word.to_string(), score);
        }
    }

    /// 对单条文本打分
    pub fn classify_text(&self, text: &str) -> Classification {
        let text = text.to_lowercase();
        let words: Vec<&str> = text.split_whitespace().collect();

        let mut positive_score = 0.0;
        let mut negative_score = 0.0;

        for word in &words {
            let cleaned_word = word.trim_matches(|c: char| !c.is_alphanumeric());

            if let Some(&score) = self.positive_words.get(cleaned_word) {
                positive_score += score;
            }

            if let Some(&score) = self.negative_words.get(cleaned_word) {
                negative_score += score.abs();
            }
        }

        let total_words = words.len() as f64;
        let confidence = (0.5 + (positive_score - negative_score).abs() / total_words.max(1.0))
            .min(1.0);

        let label = if positive_score > negative_score {
            SentimentLabel::Positive
        } else {
            SentimentLabel::Negative
        };

        Classification {
            label,
            score: confidence,
        }
    }
}

impl Default for LexiconClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SentimentClassifier for LexiconClassifier {
    fn name(&self) -> &str {
        "lexicon"
    }

    async fn classify(&self, texts: &[String]) -> ETLResult<Vec<Classification>> {
        Ok(texts.iter().map(|t| self.classify_text(t)).collect())
    }
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

/// 推理服务对批量输入返回嵌套列表，对单条输入可能返回扁平列表
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

/// 远程推理端点分类器
pub struct RemoteClassifier {
    client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
}

impl RemoteClassifier {
    pub fn new(endpoint: String, api_token: Option<String>, timeout_secs: u64) -> ETLResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_token,
        })
    }

    pub fn from_config(config: &SentimentConfig) -> ETLResult<Option<Self>> {
        match &config.endpoint {
            Some(endpoint) => Ok(Some(Self::new(
                endpoint.clone(),
                config.api_token.clone(),
                config.request_timeout_secs,
            )?)),
            None => Ok(None),
        }
    }

    fn decode(response: InferenceResponse) -> ETLResult<Vec<Classification>> {
        let per_input: Vec<Vec<LabelScore>> = match response {
            InferenceResponse::Nested(items) => items,
            InferenceResponse::Flat(items) => items.into_iter().map(|item| vec![item]).collect(),
        };

        per_input
            .into_iter()
            .map(|candidates| {
                let best = candidates
                    .into_iter()
                    .max_by(|a, b| a.score.total_cmp(&b.score))
                    .ok_or_else(|| ETLError::Classifier("empty prediction".to_string()))?;

                let label = SentimentLabel::from_label(&best.label).ok_or_else(|| {
                    ETLError::Classifier(format!("unknown label {:?}", best.label))
                })?;

                Ok(Classification {
                    label,
                    score: best.score,
                })
            })
            .collect()
    }
}

#[async_trait]
impl SentimentClassifier for RemoteClassifier {
    fn name(&self) -> &str {
        &self.endpoint
    }

    async fn classify(&self, texts: &[String]) -> ETLResult<Vec<Classification>> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "inputs": texts }));

        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?.error_for_status()?;
        let body: InferenceResponse = response.json().await?;
        Self::decode(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingClassifier;

    #[async_trait]
    impl SentimentClassifier for FailingClassifier {
        fn name(&self) -> &str {
            "failing"
        }

        async fn classify(&self, _texts: &[String]) -> ETLResult<Vec<Classification>> {
            Err(ETLError::Classifier("model unavailable".to_string()))
        }
    }

    /// 记录收到的文本，并把包含 "good" 的判为正面
    struct RecordingClassifier {
        seen: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SentimentClassifier for RecordingClassifier {
        fn name(&self) -> &str {
            "recording"
        }

        async fn classify(&self, texts: &[String]) -> ETLResult<Vec<Classification>> {
            self.seen.lock().unwrap().extend(texts.iter().cloned());
            Ok(texts
                .iter()
                .map(|t| Classification {
                    label: if t.contains("good") {
                        SentimentLabel::Positive
                    } else {
                        SentimentLabel::Negative
                    },
                    score: 0.9,
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_empty_comments_are_neutral() {
        let classifier = LexiconClassifier::new();
        assert_eq!(sentiment_ratio(&classifier, &[], 512).await, NEUTRAL_SCORE);
        assert_eq!(sentiment_ratio(&FailingClassifier, &[], 512).await, NEUTRAL_SCORE);
    }

    #[tokio::test]
    async fn test_classifier_failure_falls_back() {
        let comments = vec!["great".to_string(), "awful".to_string()];
        assert_eq!(
            sentiment_ratio(&FailingClassifier, &comments, 512).await,
            NEUTRAL_SCORE
        );
    }

    #[tokio::test]
    async fn test_ratio_and_truncation() {
        let classifier = RecordingClassifier {
            seen: std::sync::Mutex::new(Vec::new()),
        };
        let long = format!("{}good", "x".repeat(600));
        let comments = vec![
            "good stuff".to_string(),
            "meh".to_string(),
            "good".to_string(),
            long,
        ];

        let ratio = sentiment_ratio(&classifier, &comments, 512).await;

        // 超长评论被截断后丢失了 "good"
        assert!((ratio - 0.5).abs() < 1e-12);
        let seen = classifier.seen.lock().unwrap();
        assert!(seen.iter().all(|t| t.chars().count() <= 512));
    }

    #[test]
    fn test_lexicon_labels() {
        let classifier = LexiconClassifier::new();
        assert_eq!(
            classifier.classify_text("Amazing video, thanks!").label,
            SentimentLabel::Positive
        );
        assert_eq!(
            classifier.classify_text("Boring clickbait, total waste of time").label,
            SentimentLabel::Negative
        );
    }

    #[test]
    fn test_decode_nested_and_flat() {
        let nested: InferenceResponse = serde_json::from_str(
            r#"[[{"label":"NEGATIVE","score":0.1},{"label":"POSITIVE","score":0.9}],
                [{"label":"NEGATIVE","score":0.8},{"label":"POSITIVE","score":0.2}]]"#,
        )
        .unwrap();
        let decoded = RemoteClassifier::decode(nested).unwrap();
        assert_eq!(decoded[0].label, SentimentLabel::Positive);
        assert_eq!(decoded[1].label, SentimentLabel::Negative);

        let flat: InferenceResponse =
            serde_json::from_str(r#"[{"label":"POSITIVE","score":0.99}]"#).unwrap();
        assert_eq!(RemoteClassifier::decode(flat).unwrap().len(), 1);
    }
}
