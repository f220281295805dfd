use thiserror::Error;

/// Taxonomia de falhas dos engines de tradução/análise.
///
/// Frames SSE quebrados NÃO passam por aqui: são engolidos com log
/// no parser (frame ruim não é falha de stream).
#[derive(Error, Debug)]
pub enum EngineError {
    /// Rede fora ou status não-2xx.
    #[error("transport error: {0}")]
    Transport(String),

    /// JSON inválido (ou shape inválido) onde estrutura era
    /// obrigatória.
    #[error("malformed upstream response: {0}")]
    MalformedUpstream(String),

    /// Campo de conteúdo esperado ausente na resposta.
    #[error("empty upstream response: {0}")]
    EmptyResponse(String),

    /// Consumidor abandonou o stream via CancelToken.
    #[error("stream cancelled by consumer")]
    Cancelled,

    /// Falha agregada do failover: os dois engines falharam. Carrega
    /// a última falha de cada tentativa.
    #[error("both engines failed; ai: {ai}; google: {google}")]
    BothSourcesFailed {
        ai: Box<EngineError>,
        google: Box<EngineError>,
    },
}
