use serde::{Deserialize, Serialize};

pub const EMAIL: &str = "EMAIL";
pub const SMS: &str = "SMS";
pub const GPO_INTERACTION: &str = "GPO_INTERACTION";

/// Recommended action attached to a rule result and forwarded with alerts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ActionRepr", into = "ActionRepr")]
pub enum Action {
    Email,
    Sms,
    GpoInteraction { asset: String, mode: Option<String> },
    Other { name: String, asset: String, mode: Option<String> },
}

impl Action {
    /// Builds an action from its parts. Notification actions ignore asset and
    /// mode; device actions need an asset.
    pub fn from_parts(name: &str, asset: Option<&str>, mode: Option<&str>) -> Option<Self> {
        match name {
            EMAIL => Some(Self::Email),
            SMS => Some(Self::Sms),
            "" => None,
            _ => {
                let asset = asset?.to_string();
                let mode = mode.map(str::to_string);
                if name == GPO_INTERACTION {
                    Some(Self::GpoInteraction { asset, mode })
                } else {
                    Some(Self::Other {
                        name: name.to_string(),
                        asset,
                        mode,
                    })
                }
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Email => EMAIL,
            Self::Sms => SMS,
            Self::GpoInteraction { .. } => GPO_INTERACTION,
            Self::Other { name, .. } => name,
        }
    }

    pub fn asset(&self) -> Option<&str> {
        match self {
            Self::Email | Self::Sms => None,
            Self::GpoInteraction { asset, .. } | Self::Other { asset, .. } => Some(asset),
        }
    }

    pub fn mode(&self) -> Option<&str> {
        match self {
            Self::Email | Self::Sms => None,
            Self::GpoInteraction { mode, .. } | Self::Other { mode, .. } => mode.as_deref(),
        }
    }

    pub fn is_notification(&self) -> bool {
        matches!(self, Self::Email | Self::Sms)
    }

    /// Parses the legacy `NAME[:asset[:mode]]` form.
    pub fn from_colon_form(s: &str) -> Option<Self> {
        let mut parts = s.splitn(3, ':');
        let name = parts.next()?;
        let asset = parts.next();
        let mode = parts.next();
        Self::from_parts(name, asset, mode)
    }
}

#[derive(Serialize, Deserialize)]
struct ActionRepr {
    action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    asset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mode: Option<String>,
}

impl From<Action> for ActionRepr {
    fn from(a: Action) -> Self {
        Self {
            action: a.name().to_string(),
            asset: a.asset().map(str::to_string),
            mode: a.mode().map(str::to_string),
        }
    }
}

impl TryFrom<ActionRepr> for Action {
    type Error = String;

    fn try_from(r: ActionRepr) -> Result<Self, Self::Error> {
        Action::from_parts(&r.action, r.asset.as_deref(), r.mode.as_deref())
            .ok_or_else(|| format!("incomplete action '{}'", r.action))
    }
}
