use std::time::Duration;

use serde::Deserialize;

const DEFAULT_API_URL: &str = "https://api.dictionaryapi.dev/api/v2/entries/en";
const PLACEHOLDER_DEFINITION: &str = "No definition available";

/// External word-information provider. Lookup failures never fail the caller:
/// the word is stored with a placeholder definition instead.
#[derive(Clone)]
pub struct DictionaryProvider {
    client: reqwest::Client,
    base_url: String,
    enabled: bool,
}

#[derive(Debug, Clone)]
pub struct WordInfo {
    pub definition: String,
    pub pronunciation: String,
    pub examples: Vec<String>,
}

impl WordInfo {
    pub fn placeholder() -> Self {
        Self {
            definition: PLACEHOLDER_DEFINITION.to_string(),
            pronunciation: String::new(),
            examples: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiEntry {
    #[serde(default)]
    phonetic: Option<String>,
    #[serde(default)]
    meanings: Vec<ApiMeaning>,
}

#[derive(Debug, Deserialize)]
struct ApiMeaning {
    #[serde(rename = "partOfSpeech", default)]
    part_of_speech: String,
    #[serde(default)]
    definitions: Vec<ApiDefinition>,
}

#[derive(Debug, Deserialize)]
struct ApiDefinition {
    #[serde(default)]
    definition: String,
    #[serde(default)]
    example: Option<String>,
}

impl DictionaryProvider {
    pub fn from_env() -> Self {
        let base_url = std::env::var("DICTIONARY_API_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let enabled = std::env::var("DICTIONARY_LOOKUP_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url,
            enabled,
        }
    }

    pub async fn lookup(&self, word: &str) -> WordInfo {
        if !self.enabled {
            return WordInfo::placeholder();
        }

        match self.fetch(word).await {
            Ok(info) => info,
            Err(err) => {
                tracing::warn!(word, error = %err, "dictionary lookup failed");
                WordInfo::placeholder()
            }
        }
    }

    async fn fetch(&self, word: &str) -> Result<WordInfo, reqwest::Error> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), word);
        let entries: Vec<ApiEntry> = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(summarize_entries(&entries))
    }
}

fn summarize_entries(entries: &[ApiEntry]) -> WordInfo {
    let Some(entry) = entries.first() else {
        return WordInfo::placeholder();
    };

    let mut definition_parts = Vec::new();
    let mut examples = Vec::new();

    for meaning in &entry.meanings {
        // at most two definitions per part of speech keeps the quiz option short
        for def in meaning.definitions.iter().take(2) {
            if def.definition.is_empty() {
                continue;
            }
            if meaning.part_of_speech.is_empty() {
                definition_parts.push(def.definition.clone());
            } else {
                definition_parts.push(format!("{}: {}", meaning.part_of_speech, def.definition));
            }
            if let Some(example) = def.example.as_deref() {
                if !example.is_empty() && examples.len() < 2 {
                    examples.push(example.to_string());
                }
            }
        }
    }

    if definition_parts.is_empty() {
        return WordInfo::placeholder();
    }

    WordInfo {
        definition: definition_parts.join("; "),
        pronunciation: entry.phonetic.clone().unwrap_or_default(),
        examples,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_limits_definitions_per_part() {
        let entries = vec![ApiEntry {
            phonetic: Some("/tɛst/".to_string()),
            meanings: vec![ApiMeaning {
                part_of_speech: "noun".to_string(),
                definitions: vec![
                    ApiDefinition {
                        definition: "first".to_string(),
                        example: Some("use it first".to_string()),
                    },
                    ApiDefinition {
                        definition: "second".to_string(),
                        example: None,
                    },
                    ApiDefinition {
                        definition: "third".to_string(),
                        example: None,
                    },
                ],
            }],
        }];

        let info = summarize_entries(&entries);
        assert_eq!(info.definition, "noun: first; noun: second");
        assert_eq!(info.pronunciation, "/tɛst/");
        assert_eq!(info.examples, vec!["use it first".to_string()]);
    }

    #[test]
    fn test_summarize_empty_is_placeholder() {
        let info = summarize_entries(&[]);
        assert_eq!(info.definition, PLACEHOLDER_DEFINITION);
    }
}
