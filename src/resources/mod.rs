pub mod comment;

pub use comment::configure as comment_conf;
