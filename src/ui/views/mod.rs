mod word_detail;
mod word_list;

pub use word_detail::WordDetailView;
pub use word_list::WordListView;
