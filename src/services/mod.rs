pub(crate) mod answers;
pub(crate) mod conversation;
pub(crate) mod export;
pub(crate) mod grading;
pub(crate) mod role_policy;
pub(crate) mod telegram_bot;
