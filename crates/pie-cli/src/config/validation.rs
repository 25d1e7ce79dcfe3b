use crate::config::PieConfig;
use crate::error::{ConfigError, Result};
use std::collections::HashSet;

impl PieConfig {
    /// Validate configuration for logical consistency.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for pie in &self.pies {
            if pie.name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "pies[].name".to_string(),
                    value: format!("{:?}", pie.name),
                    hint: "Every pie needs the package name it is installed under".to_string(),
                }
                .into());
            }
            if !seen.insert(pie.name.as_str()) {
                return Err(ConfigError::DuplicatePie(pie.name.clone()).into());
            }
            if pie.path.is_absolute() {
                return Err(ConfigError::InvalidValue {
                    field: "pies[].path".to_string(),
                    value: pie.path.display().to_string(),
                    hint: "Pie paths are relative to the workspace root".to_string(),
                }
                .into());
            }
        }

        for pattern in &self.watch_ignore {
            if let Err(e) = regex::Regex::new(pattern) {
                return Err(ConfigError::InvalidValue {
                    field: "watchIgnore".to_string(),
                    value: pattern.clone(),
                    hint: format!("Not a valid regular expression: {}", e),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Validate and additionally require at least one pie.
    pub fn validate_for_build(&self) -> Result<()> {
        self.validate()?;
        if self.pies.is_empty() {
            return Err(ConfigError::MissingField {
                field: "pies".to_string(),
                hint: "Declare at least one pie, e.g. \"pies\": [{ \"name\": \"my-pie\", \"path\": \".\" }]"
                    .to_string(),
            }
            .into());
        }
        Ok(())
    }
}
