pub mod label;
pub mod question;
pub mod telegram;

pub use label::Label;
pub use question::{BankFolder, ExplainedQuestion, OptionSet, QuestionRecord, StoredQuestion};
pub use telegram::{ApiResponse, Chat, Document, Message, TelegramFile, Update, User};
