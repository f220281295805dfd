use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;

use crate::model::record::TranslationRecord;
use crate::parsers::gtx;
use crate::services::error::EngineError;

// Endpoint público de tradução. API não documentada: o payload é
// posicional e pode mudar (o normalizador trata shape errado como
// skew de versão).
const TRANSLATE_API_URL: &str = "https://translate.googleapis.com/translate_a/single";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const TIMEOUT_SECS: u64 = 10;

pub struct GoogleConfig<'a> {
    pub source_lang: &'a str,
    pub target_lang: &'a str,
}

pub fn translate(text: &str, cfg: &GoogleConfig) -> Result<TranslationRecord, EngineError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(TIMEOUT_SECS))
        .build()
        .map_err(|e| EngineError::Transport(e.to_string()))?;

    tracing::debug!("translating {} chars via public endpoint", text.len());

    // dt repetido: t = tradução, bd = dicionário bilíngue,
    // rm = romanização, md = definições, ex = exemplos.
    let resp = client
        .get(TRANSLATE_API_URL)
        .header("User-Agent", USER_AGENT)
        .query(&[
            ("client", "gtx"),
            ("sl", cfg.source_lang),
            ("tl", cfg.target_lang),
            ("dt", "t"),
            ("dt", "bd"),
            ("dt", "rm"),
            ("dt", "md"),
            ("dt", "ex"),
            ("q", text),
        ])
        .send()
        .map_err(|e| EngineError::Transport(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(EngineError::Transport(format!(
            "translate API returned HTTP {}",
            status.as_u16()
        )));
    }

    let body = resp
        .text()
        .map_err(|e| EngineError::Transport(e.to_string()))?;

    let data: Value = serde_json::from_str(&body)
        .map_err(|e| EngineError::MalformedUpstream(format!("invalid translate JSON: {e}")))?;

    gtx::normalize(&data, text).map_err(EngineError::MalformedUpstream)
}
