use mlua::{Function, Lua, Value, Variadic};

use super::{CompiledProgram, ScriptEngine, ScriptError, ScriptValue, ENTRY_POINT};

/// Lua 5.4 backend. Every compiled program gets its own interpreter state.
#[derive(Debug, Default, Clone, Copy)]
pub struct LuaEngine;

impl ScriptEngine for LuaEngine {
    fn compile(&self, source: &str) -> Result<Box<dyn CompiledProgram>, ScriptError> {
        let lua = Lua::new();
        lua.load(source)
            .set_name("rule")
            .exec()
            .map_err(|e| ScriptError::Compile(e.to_string()))?;

        match lua.globals().get::<Value>(ENTRY_POINT) {
            Ok(Value::Function(_)) => Ok(Box::new(LuaProgram { lua })),
            _ => Err(ScriptError::MissingEntryPoint(ENTRY_POINT)),
        }
    }
}

struct LuaProgram {
    lua: Lua,
}

impl CompiledProgram for LuaProgram {
    fn bind(&mut self, name: &str, value: &ScriptValue) -> Result<(), ScriptError> {
        let binding = |e: mlua::Error| ScriptError::Binding {
            name: name.to_string(),
            reason: e.to_string(),
        };
        let value = match value {
            ScriptValue::Nil | ScriptValue::Other => Value::Nil,
            ScriptValue::Integer(i) => Value::Integer(*i),
            ScriptValue::Number(n) => Value::Number(*n),
            ScriptValue::Text(s) => Value::String(self.lua.create_string(s).map_err(binding)?),
        };
        self.lua.globals().set(name, value).map_err(binding)
    }

    fn invoke(&mut self, args: &[String]) -> Result<(ScriptValue, ScriptValue), ScriptError> {
        let entry: Function = self
            .lua
            .globals()
            .get(ENTRY_POINT)
            .map_err(|_| ScriptError::MissingEntryPoint(ENTRY_POINT))?;

        let args: Variadic<&str> = args.iter().map(String::as_str).collect();
        let (first, second) = entry
            .call::<(Value, Value)>(args)
            .map_err(|e| ScriptError::Runtime(e.to_string()))?;
        Ok((from_lua(&first), from_lua(&second)))
    }
}

fn from_lua(value: &Value) -> ScriptValue {
    match value {
        Value::Nil => ScriptValue::Nil,
        Value::Integer(i) => ScriptValue::Integer(*i),
        Value::Number(n) => ScriptValue::Number(*n),
        Value::String(s) => ScriptValue::Text(s.to_string_lossy().into()),
        _ => ScriptValue::Other,
    }
}
