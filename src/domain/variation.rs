use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_VARIATION: &str = "default";

/// One environment a project is rendered for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variation {
    pub name: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

impl Variation {
    pub fn new(name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
            variables: BTreeMap::new(),
        }
    }

    /// Variables visible to definition files: the declared ones plus
    /// `env` and `provider`.
    pub fn substitutions(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        vars.insert("env".to_string(), self.name.clone());
        vars.insert("provider".to_string(), self.provider.clone());
        vars.extend(self.variables.clone());
        vars
    }
}

impl Default for Variation {
    fn default() -> Self {
        Self::new(DEFAULT_VARIATION, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_variables_win() {
        let mut variation = Variation::new("prod", "aws");
        variation
            .variables
            .insert("env".to_string(), "production".to_string());
        let vars = variation.substitutions();
        assert_eq!(vars["env"], "production");
        assert_eq!(vars["provider"], "aws");
    }
}
