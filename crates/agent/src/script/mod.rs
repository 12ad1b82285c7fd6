//! Scripting seam used by the evaluator. The rule engine only sees these
//! traits; the Lua backend is one implementation.

mod error;
mod lua;

pub use error::ScriptError;
pub use lua::LuaEngine;

/// Name of the function every rule program must define.
pub const ENTRY_POINT: &str = "main";

/// Values crossing the script boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Nil,
    Integer(i64),
    Number(f64),
    Text(String),
    Other,
}

impl ScriptValue {
    /// Numeric reading of a value. Numeric strings count, fractions are
    /// truncated toward zero.
    pub fn as_code(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Number(n) if n.is_finite() => Some(n.trunc() as i64),
            Self::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|n| n.is_finite()).map(|n| n.trunc() as i64))
            }
            _ => None,
        }
    }

    /// String reading of a value; numbers are rendered as text.
    pub fn as_message(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Integer(i) => Some(i.to_string()),
            Self::Number(n) => Some(n.to_string()),
            Self::Nil | Self::Other => None,
        }
    }
}

pub trait ScriptEngine: Send + Sync {
    /// Loads a program and checks that it defines [`ENTRY_POINT`].
    fn compile(&self, source: &str) -> Result<Box<dyn CompiledProgram>, ScriptError>;
}

pub trait CompiledProgram: Send {
    fn bind(&mut self, name: &str, value: &ScriptValue) -> Result<(), ScriptError>;

    /// Calls the entry point with positional string arguments and returns its
    /// first two results.
    fn invoke(&mut self, args: &[String]) -> Result<(ScriptValue, ScriptValue), ScriptError>;
}
