mod parsing;
mod settings;
mod types;

pub(crate) use types::{QuizSettings, SessionBackend, Settings};
