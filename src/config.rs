use std::path::PathBuf;

pub const EXIT_SYNTAX_ERROR: u8 = 65;
pub const EXIT_RUNTIME_ERROR: u8 = 70;
pub const EXIT_IO_ERROR: u8 = 74;

// stored in the home directory, when there is one
pub const HISTORY_FILE_NAME: &str = ".lox_history";

/// How the driver runs a script or REPL session.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// JSON keyword respelling; `None` means the built-in spellings.
    pub keywords: Option<String>,
    pub dump_tokens: bool,
    pub print_ast: bool,
    pub rpn: bool,
    /// Show the source line and caret underline under each diagnostic.
    pub show_context: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            // set default values here, unless overridden via command-line
            keywords: None,
            dump_tokens: false,
            print_ast: false,
            rpn: false,
            show_context: true,
        }
    }
}

impl DriverConfig {
    pub fn history_path(&self) -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(HISTORY_FILE_NAME))
    }

    /// Process exit status for a finished file run.
    pub fn exit_status(had_syntax_error: bool, had_runtime_error: bool) -> u8 {
        if had_syntax_error {
            EXIT_SYNTAX_ERROR
        } else if had_runtime_error {
            EXIT_RUNTIME_ERROR
        } else {
            0
        }
    }
}
