pub mod admin;
pub mod auth;
pub mod epub_delete;
pub mod epub_download;
pub mod epub_list;
pub mod epub_process;
