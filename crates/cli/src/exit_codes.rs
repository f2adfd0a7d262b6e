//! CLI Exit Code Registry
//!
//! Single source of truth for the exit codes of `gadai`. Scripts and the
//! scheduler that drives nightly runs branch on these.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage error (bad arguments, unsupported input)       |
//! | 3    | Invalid configuration                                |
//! | 4    | No usable sheet in the workbook                      |
//! | 5    | Standalone table lacks required fields               |
//! | 6    | I/O error reading input or writing reports           |
//! | 7    | Another run holds the output directory lock          |
//! | 8    | Persisted report missing or unreadable               |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant below
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Map it in `pipeline_exit_code` if it comes from the engine

use gadai_pipeline::PipelineError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unsupported input extension.
pub const EXIT_USAGE: u8 = 2;

/// Config file unreadable as TOML, or rejected by validation.
pub const EXIT_CONFIG: u8 = 3;

/// None of the configured sheets produced a usable table, or a standalone
/// table has no rows.
pub const EXIT_NO_VALID_SHEETS: u8 = 4;

/// `process` input lacks one or more required fields.
pub const EXIT_MISSING_FIELDS: u8 = 5;

/// Input unreadable or report write failed.
pub const EXIT_IO: u8 = 6;

/// `.gadai.lock` exists in the output directory.
pub const EXIT_LOCKED: u8 = 7;

/// A serving command found no (or a corrupt) persisted report.
pub const EXIT_REPORT_MISSING: u8 = 8;

/// Exit code for an engine error.
pub fn pipeline_exit_code(err: &PipelineError) -> u8 {
    match err {
        PipelineError::ConfigParse(_) | PipelineError::ConfigValidation(_) => EXIT_CONFIG,
        PipelineError::NoValidSheets { .. } | PipelineError::EmptyTable { .. } => {
            EXIT_NO_VALID_SHEETS
        }
        PipelineError::MissingFields { .. } => EXIT_MISSING_FIELDS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_CONFIG,
            EXIT_NO_VALID_SHEETS,
            EXIT_MISSING_FIELDS,
            EXIT_IO,
            EXIT_LOCKED,
            EXIT_REPORT_MISSING,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn pipeline_errors_map_to_registry() {
        assert_eq!(
            pipeline_exit_code(&PipelineError::ConfigParse("x".into())),
            EXIT_CONFIG
        );
        assert_eq!(
            pipeline_exit_code(&PipelineError::NoValidSheets { attempted: vec![] }),
            EXIT_NO_VALID_SHEETS
        );
        assert_eq!(
            pipeline_exit_code(&PipelineError::MissingFields {
                sheet: "s".into(),
                fields: vec!["outlet".into()],
            }),
            EXIT_MISSING_FIELDS
        );
    }
}
