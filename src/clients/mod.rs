pub mod gemini_cli;

pub use gemini_cli::GeminiCli;
