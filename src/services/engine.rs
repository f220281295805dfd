use crate::model::record::{EngineKind, TranslationRecord};
use crate::services::error::EngineError;
use crate::services::{ai, google};

/// Seletor de engine com failover de um salto só: tenta o primário,
/// na falha tenta o outro uma vez, e se os dois falharem propaga uma
/// única falha agregada. Sem retry além disso.
pub fn translate(
    primary: EngineKind,
    text: &str,
    ai_cfg: &ai::AiConfig,
    google_cfg: &google::GoogleConfig,
) -> Result<TranslationRecord, EngineError> {
    run_with_fallback(
        primary,
        || ai::translate(text, ai_cfg),
        || google::translate(text, google_cfg),
    )
}

/// Política de failover isolada dos fetchers reais. O registro sai
/// etiquetado pelo engine que de fato respondeu.
pub fn run_with_fallback<A, G>(
    primary: EngineKind,
    ai: A,
    google: G,
) -> Result<TranslationRecord, EngineError>
where
    A: FnOnce() -> Result<TranslationRecord, EngineError>,
    G: FnOnce() -> Result<TranslationRecord, EngineError>,
{
    match primary {
        EngineKind::Ai => match ai() {
            Ok(record) => Ok(record),
            Err(ai_err) => {
                tracing::warn!("primary engine ai failed, trying google: {ai_err}");
                google().map_err(|google_err| EngineError::BothSourcesFailed {
                    ai: Box::new(ai_err),
                    google: Box::new(google_err),
                })
            }
        },
        EngineKind::Google => match google() {
            Ok(record) => Ok(record),
            Err(google_err) => {
                tracing::warn!("primary engine google failed, trying ai: {google_err}");
                ai().map_err(|ai_err| EngineError::BothSourcesFailed {
                    ai: Box::new(ai_err),
                    google: Box::new(google_err),
                })
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn record(source: EngineKind) -> TranslationRecord {
        TranslationRecord {
            original: "hello".to_string(),
            translated: "你好".to_string(),
            phonetic: None,
            dictionary: None,
            definitions: None,
            examples: None,
            source,
        }
    }

    #[test]
    fn failed_primary_falls_back_to_the_other_engine() {
        let result = run_with_fallback(
            EngineKind::Ai,
            || Err(EngineError::Transport("connection refused".into())),
            || Ok(record(EngineKind::Google)),
        )
        .unwrap();

        assert_eq!(result.source, EngineKind::Google);
    }

    #[test]
    fn successful_primary_never_touches_the_fallback() {
        let ai_called = Cell::new(false);

        let result = run_with_fallback(
            EngineKind::Google,
            || {
                ai_called.set(true);
                Ok(record(EngineKind::Ai))
            },
            || Ok(record(EngineKind::Google)),
        )
        .unwrap();

        assert_eq!(result.source, EngineKind::Google);
        assert!(!ai_called.get());
    }

    #[test]
    fn google_primary_failure_degrades_to_ai() {
        let result = run_with_fallback(
            EngineKind::Google,
            || Ok(record(EngineKind::Ai)),
            || Err(EngineError::Transport("HTTP 429".into())),
        )
        .unwrap();

        assert_eq!(result.source, EngineKind::Ai);
    }

    #[test]
    fn double_failure_aggregates_into_one_error() {
        let err = run_with_fallback(
            EngineKind::Ai,
            || Err(EngineError::Transport("dns failure".into())),
            || Err(EngineError::MalformedUpstream("not an array".into())),
        )
        .unwrap_err();

        match &err {
            EngineError::BothSourcesFailed { ai, google } => {
                assert!(matches!(**ai, EngineError::Transport(_)));
                assert!(matches!(**google, EngineError::MalformedUpstream(_)));
            }
            other => panic!("expected BothSourcesFailed, got {other}"),
        }

        // uma única mensagem com as duas causas
        let msg = err.to_string();
        assert!(msg.contains("dns failure"));
        assert!(msg.contains("not an array"));
    }
}
