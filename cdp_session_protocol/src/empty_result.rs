use serde::Deserialize;

/// Response payload for commands whose result carries nothing the core
/// needs (extra fields the browser sends are ignored by serde's default
/// struct deserialization).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmptyResult {}
