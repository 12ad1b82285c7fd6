use std::path::PathBuf;

use thiserror::Error;

/// Commands accepted on the control channel, one frame per token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Term,
    Bind { endpoint: String, name: String },
    Producer { stream: String },
    Consumer { stream: String, pattern: String },
    LoadRules { dir: PathBuf },
    Verbose,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("empty command")]
    Empty,
    #[error("unknown command {0}")]
    Unknown(String),
    #[error("{command} needs {argument}")]
    Missing {
        command: &'static str,
        argument: &'static str,
    },
}

impl Command {
    pub fn parse(frames: &[String]) -> Result<Self, ControlError> {
        let (verb, args) = frames.split_first().ok_or(ControlError::Empty)?;
        let arg = |i: usize, command: &'static str, argument: &'static str| {
            args.get(i)
                .cloned()
                .ok_or(ControlError::Missing { command, argument })
        };

        match verb.as_str() {
            "TERM" | "$TERM" => Ok(Self::Term),
            "BIND" => Ok(Self::Bind {
                endpoint: arg(0, "BIND", "endpoint")?,
                name: arg(1, "BIND", "name")?,
            }),
            "PRODUCER" => Ok(Self::Producer {
                stream: arg(0, "PRODUCER", "stream")?,
            }),
            "CONSUMER" => Ok(Self::Consumer {
                stream: arg(0, "CONSUMER", "stream")?,
                pattern: arg(1, "CONSUMER", "pattern")?,
            }),
            "LOADRULES" => Ok(Self::LoadRules {
                dir: PathBuf::from(arg(0, "LOADRULES", "dir")?),
            }),
            "VERBOSE" => Ok(Self::Verbose),
            other => Err(ControlError::Unknown(other.to_string())),
        }
    }
}
