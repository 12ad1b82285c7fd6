use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("compile: {0}")]
    Compile(String),
    #[error("entry point `{0}` is not a function")]
    MissingEntryPoint(&'static str),
    #[error("runtime: {0}")]
    Runtime(String),
    #[error("binding `{name}`: {reason}")]
    Binding { name: String, reason: String },
}
