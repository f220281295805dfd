/// Normalização usada só como identidade de dedup — não altera o que
/// é exibido ou exportado.
pub fn normalize(text: &str) -> String {
    let s = text.trim().to_lowercase();
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
