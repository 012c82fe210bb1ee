//! Debug query logging for upstream completion requests and responses.
//!
//! When enabled via `dump_queries = true` in `[logging]` config, writes raw
//! JSON to `./logs/queries/{timestamp}-{provider}-{model}.{phase}.json`.
//! Failures are logged as warnings but never block the request.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::Value;
use tracing::warn;

const QUERY_DIR: &str = "./logs/queries";

/// Handle for a query dump session, pairing request and response files.
pub struct QueryDump {
    dir: PathBuf,
    stem: String,
}

impl QueryDump {
    /// Dump the request JSON and return a handle for the paired response.
    pub async fn request(provider: &str, model: &str, value: &Value) -> Option<Self> {
        Self::request_in(Path::new(QUERY_DIR), provider, model, value).await
    }

    async fn request_in(dir: &Path, provider: &str, model: &str, value: &Value) -> Option<Self> {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!("dump_queries: failed to create dir: {}", e);
            return None;
        }

        let timestamp = Utc::now().format("%Y%m%d-%H%M%S%.3f");
        let dump = Self {
            dir: dir.to_path_buf(),
            stem: format!("{}-{}-{}", timestamp, provider, sanitize(model)),
        };
        write_json(&dump.path("request"), value).await;
        Some(dump)
    }

    /// Dump the response JSON paired with the earlier request.
    pub async fn response(&self, value: &Value) {
        write_json(&self.path("response"), value).await;
    }

    fn path(&self, phase: &str) -> PathBuf {
        self.dir.join(format!("{}.{}.json", self.stem, phase))
    }
}

/// Make a model name safe for filenames (`Qwen/Qwen2.5` -> `Qwen_Qwen2.5`).
fn sanitize(model: &str) -> String {
    model
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

async fn write_json(path: &Path, value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(json_str) => {
            if let Err(e) = tokio::fs::write(path, json_str).await {
                warn!("dump_queries: failed to write {}: {}", path.display(), e);
            }
        }
        Err(e) => {
            warn!("dump_queries: failed to serialize: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_model() {
        assert_eq!(sanitize("Qwen/Qwen2.5-7B-Instruct"), "Qwen_Qwen2.5-7B-Instruct");
    }

    #[tokio::test]
    async fn test_request_and_response_share_stem() {
        let dir = tempfile::tempdir().unwrap();
        let dump = QueryDump::request_in(dir.path(), "siliconflow", "Qwen/Qwen2.5", &json!({"a": 1}))
            .await
            .unwrap();
        dump.response(&json!({"b": 2})).await;

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();

        assert_eq!(names.len(), 2);
        assert!(names[0].ends_with("-siliconflow-Qwen_Qwen2.5.request.json"));
        assert!(names[1].ends_with("-siliconflow-Qwen_Qwen2.5.response.json"));
    }
}
