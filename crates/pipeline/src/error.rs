use std::fmt;

#[derive(Debug)]
pub enum PipelineError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty keyword list, duplicate sheet, etc.).
    ConfigValidation(String),
    /// None of the configured sheets produced a usable table.
    NoValidSheets { attempted: Vec<String> },
    /// A standalone table lacks one or more required canonical fields.
    MissingFields { sheet: String, fields: Vec<String> },
    /// A standalone table has no rows at all (not even a header).
    EmptyTable { sheet: String },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::NoValidSheets { attempted } => {
                if attempted.is_empty() {
                    write!(f, "no valid sheets: no sheets configured")
                } else {
                    write!(f, "no valid sheets among: {}", attempted.join(", "))
                }
            }
            Self::MissingFields { sheet, fields } => {
                write!(f, "sheet '{sheet}': missing required field(s): {}", fields.join(", "))
            }
            Self::EmptyTable { sheet } => write!(f, "sheet '{sheet}': table is empty"),
        }
    }
}

impl std::error::Error for PipelineError {}
