use std::io::{BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::json;

use crate::model::record::{AnalysisSections, EngineKind, TranslationRecord};
use crate::parsers::sections::SectionReassembler;
use crate::parsers::sse::{self, SseLine};
use crate::services::error::EngineError;

pub struct AiConfig<'a> {
    pub base_url: &'a str,
    pub api_key: &'a str,
    pub model: &'a str,
    pub target_lang: &'a str,
}

const TIMEOUT_SECS: u64 = 60;

/// Backend local de fallback quando não há api_key configurada.
/// Devolve o registro já pronto.
const BACKEND_TRANSLATE_URL: &str = "http://localhost:8080/api/translate";

const TRANSLATE_TEMPERATURE: f64 = 0.3;
const ANALYZE_TEMPERATURE: f64 = 0.7;

const ANALYZE_SYSTEM_PROMPT: &str = "You are an expert English tutor helping Chinese learners. \
Analyze the given English sentence in three sections, each introduced by its bracket marker: \
[grammar] detailed grammar analysis in Chinese, \
[phrases] the key phrases worth memorizing, one per line, \
[tip] a creative mnemonic tip in Chinese. \
Write the markers exactly as shown, in lowercase, and nothing before the first marker. \
Do not use markdown formatting.";

/// Token de cancelamento para streams abandonados (ex.: usuário
/// navegou pra fora). Clonável; cancelar por qualquer cópia vale
/// para todas.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

fn client() -> Result<Client, EngineError> {
    Client::builder()
        .timeout(Duration::from_secs(TIMEOUT_SECS))
        .build()
        .map_err(|e| EngineError::Transport(e.to_string()))
}

fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// Tradução via engine de IA. Com api_key: chat-completion direto.
/// Sem api_key: delega pro backend local.
pub fn translate(text: &str, cfg: &AiConfig) -> Result<TranslationRecord, EngineError> {
    if cfg.api_key.trim().is_empty() {
        return translate_via_backend(text);
    }
    if cfg.base_url.trim().is_empty() {
        return Err(EngineError::Transport(
            "ai engine not configured: missing base_url".into(),
        ));
    }
    if cfg.model.trim().is_empty() {
        return Err(EngineError::Transport(
            "ai engine not configured: missing model".into(),
        ));
    }

    let body = json!({
        "model": cfg.model,
        "messages": [
            {
                "role": "system",
                "content": format!(
                    "You are a professional translator. Translate the user's text into {}. Reply with the translation only.",
                    cfg.target_lang
                )
            },
            { "role": "user", "content": text }
        ],
        "temperature": TRANSLATE_TEMPERATURE,
        "stream": false
    });

    let resp = client()?
        .post(completions_url(cfg.base_url))
        .bearer_auth(cfg.api_key)
        .json(&body)
        .send()
        .map_err(|e| EngineError::Transport(e.to_string()))?;

    let status = resp.status();

    // Lê como texto primeiro: não perde a mensagem de erro quando o
    // JSON falha.
    let body_text = resp
        .text()
        .map_err(|e| EngineError::Transport(e.to_string()))?;

    if !status.is_success() {
        return Err(EngineError::Transport(extract_error_message(
            status, &body_text,
        )));
    }

    let v: serde_json::Value = serde_json::from_str(&body_text)
        .map_err(|e| EngineError::MalformedUpstream(format!("invalid completion JSON: {e}")))?;

    let content = v
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| {
            EngineError::EmptyResponse("missing choices[0].message.content".into())
        })?;

    Ok(TranslationRecord {
        original: text.to_string(),
        translated: strip_fences(content).to_string(),
        phonetic: None,
        dictionary: None,
        definitions: None,
        examples: None,
        source: EngineKind::Ai,
    })
}

fn translate_via_backend(text: &str) -> Result<TranslationRecord, EngineError> {
    tracing::debug!("no api_key configured, using local backend");

    let resp = client()?
        .post(BACKEND_TRANSLATE_URL)
        .json(&json!({ "text": text }))
        .send()
        .map_err(|e| EngineError::Transport(e.to_string()))?;

    let status = resp.status();
    let body_text = resp
        .text()
        .map_err(|e| EngineError::Transport(e.to_string()))?;

    if !status.is_success() {
        return Err(EngineError::Transport(extract_error_message(
            status, &body_text,
        )));
    }

    let mut record: TranslationRecord = serde_json::from_str(&body_text)
        .map_err(|e| EngineError::MalformedUpstream(format!("invalid backend record: {e}")))?;

    record.source = EngineKind::Ai;
    if record.original.is_empty() {
        record.original = text.to_string();
    }

    Ok(record)
}

/// Análise gramatical via stream SSE. Os deltas são consumidos
/// conforme chegam (nada de bufferizar o stream inteiro) e as seções
/// voltam congeladas no fim do stream.
pub fn analyze(
    text: &str,
    cfg: &AiConfig,
    cancel: &CancelToken,
) -> Result<AnalysisSections, EngineError> {
    let body = json!({
        "model": cfg.model,
        "messages": [
            { "role": "system", "content": ANALYZE_SYSTEM_PROMPT },
            { "role": "user", "content": format!("Analyze: \"{text}\"") }
        ],
        "temperature": ANALYZE_TEMPERATURE,
        "stream": true
    });

    let resp = client()?
        .post(completions_url(cfg.base_url))
        .bearer_auth(cfg.api_key)
        .json(&body)
        .send()
        .map_err(|e| EngineError::Transport(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        let body_text = resp.text().unwrap_or_default();
        return Err(EngineError::Transport(extract_error_message(
            status, &body_text,
        )));
    }

    // Thread leitora manda as linhas cruas por canal. Derrubar o
    // receiver encerra a thread e solta o transporte — esse é todo o
    // cleanup de um stream abandonado.
    let (tx, rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        let reader = BufReader::new(resp);
        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => break,
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    consume_stream(rx, cancel)
}

/// Loop de consumo: SSE parse → reassembler, delta a delta. Canal
/// fechado sem `[DONE]` também congela as seções (conexão encerrada
/// conta como fim de stream).
fn consume_stream(
    rx: Receiver<String>,
    cancel: &CancelToken,
) -> Result<AnalysisSections, EngineError> {
    let mut reassembler = SectionReassembler::new();

    for line in rx {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        match sse::parse_line(&line) {
            SseLine::Delta(delta) => reassembler.push(&delta),
            SseLine::Done => break,
            SseLine::Ignored => {}
        }
    }

    Ok(reassembler.finish())
}

// Modelos às vezes embrulham a resposta em cerca de código.
fn strip_fences(content: &str) -> &str {
    let mut s = content.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Tenta o padrão comum { "error": { "message": ... } } ou
/// { "message": ... }; senão devolve um recorte do corpo cru.
fn extract_error_message(status: StatusCode, body_text: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body_text) {
        if let Some(msg) = v
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return format!("HTTP {}: {}", status.as_u16(), msg);
        }
        if let Some(msg) = v.get("message").and_then(|m| m.as_str()) {
            return format!("HTTP {}: {}", status.as_u16(), msg);
        }
    }

    let trimmed = body_text.trim();
    let mut snippet: String = trimmed.chars().take(400).collect();
    if snippet.len() < trimmed.len() {
        snippet.push_str("...");
    }

    format!("HTTP {}: {}", status.as_u16(), snippet)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta_line(content: &str) -> String {
        format!(r#"data: {{"choices":[{{"delta":{{"content":"{content}"}}}}]}}"#)
    }

    #[test]
    fn channel_fed_stream_yields_frozen_sections() {
        let (tx, rx) = mpsc::channel();
        tx.send(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#.to_string())
            .unwrap();
        tx.send(delta_line("[gram")).unwrap();
        tx.send(delta_line("mar]主语 + 谓语")).unwrap();
        tx.send(delta_line("[tip]谐音记忆")).unwrap();
        tx.send("data: [DONE]".to_string()).unwrap();
        drop(tx);

        let sections = consume_stream(rx, &CancelToken::new()).unwrap();
        assert_eq!(sections.grammar, "主语 + 谓语");
        assert_eq!(sections.tip, "谐音记忆");
        assert_eq!(sections.phrases, "");
    }

    #[test]
    fn channel_eof_without_done_still_freezes() {
        let (tx, rx) = mpsc::channel();
        tx.send(delta_line("[phrases]key phrase")).unwrap();
        drop(tx);

        let sections = consume_stream(rx, &CancelToken::new()).unwrap();
        assert_eq!(sections.phrases, "key phrase");
    }

    #[test]
    fn malformed_frames_do_not_abort_the_stream() {
        let (tx, rx) = mpsc::channel();
        tx.send(delta_line("[tip]a")).unwrap();
        tx.send("data: {broken".to_string()).unwrap();
        tx.send(delta_line("b")).unwrap();
        tx.send("data: [DONE]".to_string()).unwrap();
        drop(tx);

        let sections = consume_stream(rx, &CancelToken::new()).unwrap();
        assert_eq!(sections.tip, "ab");
    }

    #[test]
    fn cancelled_consumer_aborts_mid_stream() {
        let (tx, rx) = mpsc::channel();
        tx.send(delta_line("[tip]x")).unwrap();
        drop(tx);

        let cancel = CancelToken::new();
        cancel.cancel();

        let err = consume_stream(rx, &cancel).unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
    }

    #[test]
    fn strip_fences_unwraps_code_blocks() {
        assert_eq!(strip_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_fences("```\nplain\n```"), "plain");
        assert_eq!(strip_fences("  no fences  "), "no fences");
    }

    #[test]
    fn error_message_prefers_structured_body() {
        let body = r#"{"error":{"message":"invalid api key"}}"#;
        let msg = extract_error_message(StatusCode::UNAUTHORIZED, body);
        assert_eq!(msg, "HTTP 401: invalid api key");

        let body = r#"{"message":"quota exceeded"}"#;
        let msg = extract_error_message(StatusCode::TOO_MANY_REQUESTS, body);
        assert_eq!(msg, "HTTP 429: quota exceeded");
    }

    #[test]
    fn error_message_falls_back_to_raw_snippet() {
        let msg = extract_error_message(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(msg, "HTTP 502: upstream down");
    }
}
