mod actions_menu;
mod command_input;
mod delete_confirm;
mod input;
mod key_result;
mod notifications;
mod search_input;
mod word_form;

pub use actions_menu::{ActionsMenu, WordAction};
pub use command_input::{CommandEvent, CommandInput};
pub use delete_confirm::DeleteConfirm;
pub use key_result::KeyResult;
pub use notifications::{Notifications, Notifier};
pub use search_input::{SearchEvent, SearchInput};
pub use word_form::{FormEvent, WordForm};
