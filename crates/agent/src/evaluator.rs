use std::fmt;

use crate::rule::Rule;
use crate::script::{CompiledProgram, ScriptEngine, ScriptError, ScriptValue};

/// Result code for an evaluation that produced nothing usable.
pub const RULE_ERROR: i32 = 255;

const CONSTANTS: [(&str, i64); 7] = [
    ("OK", 0),
    ("WARNING", 1),
    ("HIGH_WARNING", 1),
    ("CRITICAL", 2),
    ("HIGH_CRITICAL", 2),
    ("LOW_WARNING", -1),
    ("LOW_CRITICAL", -2),
];

/// Compiled program owned by a rule.
#[derive(Default)]
pub enum ProgramSlot {
    #[default]
    Pending,
    Ready(Box<dyn CompiledProgram>),
    /// Compilation failed; stays failed until the rule is replaced.
    Failed,
}

impl fmt::Debug for ProgramSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("Pending"),
            Self::Ready(_) => f.write_str("Ready"),
            Self::Failed => f.write_str("Failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub code: i32,
    pub message: Option<String>,
}

impl Evaluation {
    pub fn error() -> Self {
        Self {
            code: RULE_ERROR,
            message: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.code == RULE_ERROR
    }
}

/// Runs a rule's program against metric values.
///
/// The program is compiled on first use, then the severity constants and rule
/// variables are bound once. `NAME` and `INAME` are rebound before every call.
pub fn evaluate(
    engine: &dyn ScriptEngine,
    rule: &mut Rule,
    params: &[String],
    instance_name: &str,
    display_name: Option<&str>,
) -> Evaluation {
    if matches!(rule.program, ProgramSlot::Pending) {
        rule.program = match compile(engine, rule) {
            Ok(program) => ProgramSlot::Ready(program),
            Err(e) => {
                tracing::error!(rule = %rule.name, error = %e, "rule program failed to compile");
                ProgramSlot::Failed
            }
        };
    }

    let ProgramSlot::Ready(program) = &mut rule.program else {
        return Evaluation::error();
    };

    match invoke(program.as_mut(), params, instance_name, display_name) {
        Ok(evaluation) => evaluation,
        Err(e) => {
            tracing::warn!(rule = %rule.name, asset = %instance_name, error = %e, "rule evaluation failed");
            Evaluation::error()
        }
    }
}

fn compile(engine: &dyn ScriptEngine, rule: &Rule) -> Result<Box<dyn CompiledProgram>, ScriptError> {
    let mut program = engine.compile(&rule.evaluation)?;
    for (name, value) in CONSTANTS {
        program.bind(name, &ScriptValue::Integer(value))?;
    }
    for (name, value) in &rule.variables {
        program.bind(name, &ScriptValue::Text(value.clone()))?;
    }
    Ok(program)
}

fn invoke(
    program: &mut dyn CompiledProgram,
    params: &[String],
    instance_name: &str,
    display_name: Option<&str>,
) -> Result<Evaluation, ScriptError> {
    let name = display_name.unwrap_or(instance_name);
    program.bind("NAME", &ScriptValue::Text(name.to_string()))?;
    program.bind("INAME", &ScriptValue::Text(instance_name.to_string()))?;

    let (first, second) = program.invoke(params)?;
    Ok(interpret(&first, &second))
}

/// The second value is checked first; whichever is numeric is the code and
/// the other one is the message.
fn interpret(first: &ScriptValue, second: &ScriptValue) -> Evaluation {
    let (code, message) = if let Some(code) = second.as_code() {
        (code, first)
    } else if let Some(code) = first.as_code() {
        (code, second)
    } else {
        tracing::debug!(?first, ?second, "rule returned no numeric result");
        return Evaluation::error();
    };

    Evaluation {
        code: i32::try_from(code).unwrap_or(RULE_ERROR),
        message: message.as_message(),
    }
}
